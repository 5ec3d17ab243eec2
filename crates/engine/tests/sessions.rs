use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use engine::{
    Category, ContractorPatch, CustomerId, DocumentService, Engine, EngineError, ExpenseLedger,
    JobOutcome, JobState, JobStatus, LedgerStore, MemoryLedgerStore, Money, PollPolicy,
    PriceTier, QuickEstimateInput, ResultEngine, TrackingId, WageEntry, WagePatch,
};
use tokio::time;

fn customer(raw: &str) -> CustomerId {
    CustomerId::parse(raw).unwrap()
}

fn engine_with_store() -> (Engine, Arc<MemoryLedgerStore>) {
    let store = Arc::new(MemoryLedgerStore::new());
    let engine = Engine::builder().store(store.clone()).build();
    (engine, store)
}

/// Accepts fetches, rejects every save.
#[derive(Default)]
struct BrokenSaves {
    attempts: AtomicUsize,
}

#[async_trait]
impl LedgerStore for BrokenSaves {
    async fn fetch(&self, _customer: &CustomerId) -> ResultEngine<Option<ExpenseLedger>> {
        Ok(None)
    }

    async fn save(&self, _customer: &CustomerId, _ledger: &ExpenseLedger) -> ResultEngine<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::Store("503 service unavailable".to_string()))
    }
}

/// Rejects the first `failures` saves, then stores like `MemoryLedgerStore`.
struct FlakySaves {
    inner: MemoryLedgerStore,
    attempts: AtomicUsize,
    failures: usize,
}

impl FlakySaves {
    fn new(failures: usize) -> Self {
        Self {
            inner: MemoryLedgerStore::new(),
            attempts: AtomicUsize::new(0),
            failures,
        }
    }
}

#[async_trait]
impl LedgerStore for FlakySaves {
    async fn fetch(&self, customer: &CustomerId) -> ResultEngine<Option<ExpenseLedger>> {
        self.inner.fetch(customer).await
    }

    async fn save(&self, customer: &CustomerId, ledger: &ExpenseLedger) -> ResultEngine<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(EngineError::Store("502 bad gateway".to_string()));
        }
        self.inner.save(customer, ledger).await
    }
}

struct Unreachable;

#[async_trait]
impl LedgerStore for Unreachable {
    async fn fetch(&self, _customer: &CustomerId) -> ResultEngine<Option<ExpenseLedger>> {
        Err(EngineError::Store("connection refused".to_string()))
    }

    async fn save(&self, _customer: &CustomerId, _ledger: &ExpenseLedger) -> ResultEngine<()> {
        Err(EngineError::Store("connection refused".to_string()))
    }
}

/// Completes every job on the `done_at`-th status call.
struct Documents {
    submitted: AtomicUsize,
    polls: AtomicUsize,
    done_at: usize,
}

impl Documents {
    fn new(done_at: usize) -> Self {
        Self {
            submitted: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            done_at,
        }
    }
}

#[async_trait]
impl DocumentService for Documents {
    async fn submit(&self, _customer: &CustomerId) -> ResultEngine<TrackingId> {
        let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TrackingId::new(format!("job-{n}")))
    }

    async fn status(&self, _id: &TrackingId) -> ResultEngine<JobStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let done = n >= self.done_at;
        Ok(JobStatus {
            progress: if done { 100 } else { 50 },
            current_step: if done { "Done" } else { "Drafting narrative" }.to_string(),
            estimated_time_remaining: if done { "0 minutes" } else { "3 minutes" }.to_string(),
            state: if done {
                JobState::Completed
            } else {
                JobState::Pending
            },
        })
    }
}

#[tokio::test]
async fn scenario_wages_and_contractor_totals() {
    let (engine, _store) = engine_with_store();
    let alice = customer("alice@startup.io");

    let wage = engine.add_entry(&alice, Category::Wages).await.unwrap();
    engine
        .update_entry(
            &alice,
            &wage,
            WagePatch::default()
                .employee_name("Alice")
                .annual_salary(Money::from_dollars(100_000))
                .rd_percentage(50.0),
        )
        .await
        .unwrap();
    assert_eq!(
        engine.summary(&alice).await.unwrap().wages_total,
        Money::from_dollars(50_000)
    );

    let contractor = engine.add_entry(&alice, Category::Contractors).await.unwrap();
    engine
        .update_entry(
            &alice,
            &contractor,
            ContractorPatch::default().amount(Money::from_dollars(40_000)),
        )
        .await
        .unwrap();

    let summary = engine.summary(&alice).await.unwrap();
    assert_eq!(summary.contractors_total, Money::from_dollars(26_000));
    assert_eq!(summary.grand_total(), Money::from_dollars(76_000));

    let estimate = engine.estimate(&alice, 0).await.unwrap();
    assert_eq!(estimate.federal_credit, Money::from_dollars(4_940));
    assert_eq!(estimate.price_tier(), PriceTier::Basic);
}

#[tokio::test]
async fn customers_have_independent_ledgers() {
    let (engine, _store) = engine_with_store();
    let alice = customer("alice@startup.io");
    let bob = customer("bob@startup.io");

    engine.add_entry(&alice, Category::Supplies).await.unwrap();

    assert_eq!(engine.ledger(&alice).await.unwrap().len(), 1);
    assert!(engine.ledger(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn lookup_misses_are_silent() {
    let (engine, store) = engine_with_store();
    let alice = customer("alice@startup.io");
    engine.add_entry(&alice, Category::Wages).await.unwrap();
    engine.flush(&alice).await.unwrap();
    let before = engine.ledger(&alice).await.unwrap();

    let missing = "not-an-entry".parse().unwrap();
    assert!(
        !engine
            .update_entry(&alice, &missing, WagePatch::default().role("CTO"))
            .await
            .unwrap()
    );
    assert!(
        !engine
            .remove_entry(&alice, Category::Wages, &missing)
            .await
            .unwrap()
    );

    assert_eq!(engine.ledger(&alice).await.unwrap(), before);
    assert!(!engine.is_dirty(&alice).await);
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn session_starts_from_stored_snapshot() {
    let (engine, store) = engine_with_store();
    let alice = customer("alice@startup.io");

    let mut stored = ExpenseLedger::new();
    let mut wage = WageEntry::new("w-1".parse().unwrap());
    wage.employee_name = "Alice".to_string();
    wage.annual_salary = Money::from_dollars(90_000);
    wage.rd_percentage = 100.0;
    stored.insert(wage);
    store.put(alice.clone(), stored.clone()).await;

    assert_eq!(engine.ledger(&alice).await.unwrap(), stored);
    assert_eq!(
        engine.summary(&alice).await.unwrap().grand_total(),
        Money::from_dollars(90_000)
    );
}

#[tokio::test]
async fn unreachable_store_fails_the_session_instead_of_starting_empty() {
    let engine = Engine::builder().store(Arc::new(Unreachable)).build();
    let alice = customer("alice@startup.io");

    let err = engine.ledger(&alice).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_is_saved_once_after_quiet_window() {
    let (engine, store) = engine_with_store();
    let alice = customer("alice@startup.io");

    let id = engine.add_entry(&alice, Category::Wages).await.unwrap();
    for pct in [10.0, 20.0, 30.0] {
        engine
            .update_entry(&alice, &id, WagePatch::default().rd_percentage(pct))
            .await
            .unwrap();
        time::sleep(Duration::from_millis(500)).await;
    }

    assert_eq!(store.save_count(), 0);
    assert!(engine.is_dirty(&alice).await);

    time::sleep(Duration::from_secs(2)).await;

    assert_eq!(store.save_count(), 1);
    let saved = store.get(&alice).await.unwrap();
    assert_eq!(saved.wages()[0].rd_percentage, 30.0);
    assert!(!engine.is_dirty(&alice).await);
}

#[tokio::test(start_paused = true)]
async fn edits_spaced_beyond_quiet_window_are_saved_separately() {
    let (engine, store) = engine_with_store();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Supplies).await.unwrap();
    time::sleep(Duration::from_secs(3)).await;
    engine.add_entry(&alice, Category::Supplies).await.unwrap();
    time::sleep(Duration::from_secs(3)).await;

    assert_eq!(store.save_count(), 2);
    assert_eq!(store.get(&alice).await.unwrap().supplies().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_saves_keep_the_ledger_and_stay_dirty() {
    let store = Arc::new(BrokenSaves::default());
    let engine = Engine::builder().store(store.clone()).build();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::CloudSoftware).await.unwrap();
    time::sleep(Duration::from_secs(5)).await;

    assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(engine.ledger(&alice).await.unwrap().cloud_software().len(), 1);
    assert!(engine.is_dirty(&alice).await);
}

#[tokio::test]
async fn flush_saves_without_waiting() {
    let (engine, store) = engine_with_store();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Contractors).await.unwrap();
    engine.flush(&alice).await.unwrap();

    assert_eq!(store.save_count(), 1);
    assert_eq!(store.get(&alice).await.unwrap().contractors().len(), 1);

    // Nothing pending: a second flush doesn't write.
    engine.flush(&alice).await.unwrap();
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn reset_empties_the_ledger() {
    let (engine, store) = engine_with_store();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Wages).await.unwrap();
    engine.reset_ledger(&alice).await.unwrap();
    engine.flush_all().await;

    assert!(engine.ledger(&alice).await.unwrap().is_empty());
    assert!(store.get(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn calculator_matches_equivalent_ledger() {
    let (engine, _store) = engine_with_store();
    let alice = customer("alice@startup.io");

    let wage = engine.add_entry(&alice, Category::Wages).await.unwrap();
    engine
        .update_entry(
            &alice,
            &wage,
            WagePatch::default()
                .annual_salary(Money::from_dollars(300_000))
                .rd_percentage(60.0),
        )
        .await
        .unwrap();
    let contractor = engine.add_entry(&alice, Category::Contractors).await.unwrap();
    engine
        .update_entry(
            &alice,
            &contractor,
            ContractorPatch::default().amount(Money::from_dollars(50_000)),
        )
        .await
        .unwrap();

    let quick = engine.quick_estimate(&QuickEstimateInput {
        annual_wages: Money::from_dollars(300_000),
        wage_rd_percentage: 60.0,
        contractor_costs: Money::from_dollars(50_000),
        ..QuickEstimateInput::default()
    });

    assert_eq!(quick.summary, engine.summary(&alice).await.unwrap());
    assert_eq!(quick.estimate, engine.estimate(&alice, 0).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn document_job_is_tracked_until_completion() {
    let store = Arc::new(MemoryLedgerStore::new());
    let engine = Engine::builder()
        .store(store.clone())
        .documents(Arc::new(Documents::new(3)))
        .build();
    let alice = customer("alice@startup.io");
    engine.add_entry(&alice, Category::Wages).await.unwrap();

    let job = engine.submit_documents(&alice).await.unwrap();
    assert_eq!(job.outcome, JobOutcome::Running);
    // Ledger is saved before the service is asked to read it.
    assert_eq!(store.save_count(), 1);

    time::sleep(Duration::from_secs(6)).await;
    let running = engine.document_job(&alice, &job.tracking_id).unwrap();
    assert_eq!(running.outcome, JobOutcome::Running);
    assert_eq!(running.latest.map(|s| s.progress), Some(50));

    time::sleep(Duration::from_secs(10)).await;
    let done = engine.document_job(&alice, &job.tracking_id).unwrap();
    assert_eq!(done.outcome, JobOutcome::Completed);
    assert_eq!(done.latest.map(|s| s.state), Some(JobState::Completed));
}

#[tokio::test(start_paused = true)]
async fn document_job_is_abandoned_after_the_deadline() {
    let engine = Engine::builder()
        .documents(Arc::new(Documents::new(usize::MAX)))
        .poll_policy(PollPolicy {
            interval: Duration::from_secs(5),
            max_duration: Duration::from_secs(30),
        })
        .build();
    let alice = customer("alice@startup.io");

    let job = engine.submit_documents(&alice).await.unwrap();
    time::sleep(Duration::from_secs(31)).await;

    let job = engine.document_job(&alice, &job.tracking_id).unwrap();
    assert_eq!(job.outcome, JobOutcome::Abandoned);
}

#[tokio::test]
async fn document_jobs_are_private_to_their_customer() {
    let engine = Engine::builder()
        .documents(Arc::new(Documents::new(1)))
        .build();
    let alice = customer("alice@startup.io");
    let mallory = customer("mallory@elsewhere.io");

    let job = engine.submit_documents(&alice).await.unwrap();

    assert!(engine.document_job(&alice, &job.tracking_id).is_ok());
    assert_eq!(
        engine.document_job(&mallory, &job.tracking_id).unwrap_err(),
        EngineError::KeyNotFound(job.tracking_id.to_string())
    );
}

#[tokio::test]
async fn documents_need_a_service() {
    let (engine, _store) = engine_with_store();
    let err = engine
        .submit_documents(&customer("alice@startup.io"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DocumentService(_)));
}

#[tokio::test]
async fn flush_retries_a_snapshot_whose_save_failed() {
    let store = Arc::new(FlakySaves::new(1));
    let engine = Engine::builder().store(store.clone()).build();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Wages).await.unwrap();
    engine.flush(&alice).await.unwrap();
    assert!(engine.is_dirty(&alice).await);
    assert_eq!(store.inner.get(&alice).await, None);

    engine.flush(&alice).await.unwrap();
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert!(!engine.is_dirty(&alice).await);
    assert_eq!(store.inner.get(&alice).await.unwrap().wages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_flush_saves_after_a_failed_autosave() {
    let store = Arc::new(FlakySaves::new(1));
    let engine = Engine::builder().store(store.clone()).build();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Supplies).await.unwrap();
    time::sleep(Duration::from_secs(10)).await;
    // The failed snapshot waits for a flush instead of retrying on a timer.
    assert_eq!(store.attempts.load(Ordering::SeqCst), 1);

    engine.flush_all().await;
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.get(&alice).await.unwrap().supplies().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn newer_edit_replaces_a_failed_snapshot() {
    let store = Arc::new(FlakySaves::new(1));
    let engine = Engine::builder().store(store.clone()).build();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Wages).await.unwrap();
    time::sleep(Duration::from_secs(3)).await;
    engine.add_entry(&alice, Category::Wages).await.unwrap();
    time::sleep(Duration::from_secs(3)).await;

    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.get(&alice).await.unwrap().wages().len(), 2);
    assert!(!engine.is_dirty(&alice).await);
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_are_saved_and_closed() {
    let store = Arc::new(MemoryLedgerStore::new());
    let engine = Engine::builder()
        .store(store.clone())
        .session_ttl(Duration::from_secs(60))
        .build();
    let alice = customer("alice@startup.io");
    let bob = customer("bob@startup.io");

    engine.add_entry(&alice, Category::Wages).await.unwrap();
    time::sleep(Duration::from_secs(50)).await;
    engine.add_entry(&bob, Category::Wages).await.unwrap();
    time::sleep(Duration::from_secs(11)).await;

    assert_eq!(engine.evict_idle().await, 1);
    assert_eq!(engine.open_sessions().await, 1);
    assert!(!engine.is_dirty(&alice).await);

    // Reopening reads the saved snapshot back.
    assert_eq!(engine.ledger(&alice).await.unwrap().wages().len(), 1);
    assert_eq!(engine.open_sessions().await, 2);
}

#[tokio::test(start_paused = true)]
async fn unsaved_sessions_are_not_evicted() {
    let engine = Engine::builder()
        .store(Arc::new(BrokenSaves::default()))
        .session_ttl(Duration::from_secs(10))
        .build();
    let alice = customer("alice@startup.io");

    engine.add_entry(&alice, Category::Contractors).await.unwrap();
    time::sleep(Duration::from_secs(11)).await;

    assert_eq!(engine.evict_idle().await, 0);
    assert_eq!(engine.open_sessions().await, 1);
    assert_eq!(engine.ledger(&alice).await.unwrap().contractors().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweeper_closes_idle_sessions() {
    let engine = Arc::new(
        Engine::builder()
            .session_ttl(Duration::from_secs(30))
            .build(),
    );
    let alice = customer("alice@startup.io");
    engine.add_entry(&alice, Category::Wages).await.unwrap();

    let sweeper = engine.spawn_sweeper(Duration::from_secs(10));
    time::sleep(Duration::from_secs(25)).await;
    assert_eq!(engine.open_sessions().await, 1);

    time::sleep(Duration::from_secs(20)).await;
    assert_eq!(engine.open_sessions().await, 0);
    sweeper.abort();
}

#[tokio::test(start_paused = true)]
async fn finished_jobs_are_pruned_after_retention() {
    let engine = Engine::builder()
        .documents(Arc::new(Documents::new(1)))
        .job_retention(Duration::from_secs(60))
        .build();
    let alice = customer("alice@startup.io");

    let job = engine.submit_documents(&alice).await.unwrap();
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(engine.prune_jobs(), 0);
    assert_eq!(
        engine.document_job(&alice, &job.tracking_id).unwrap().outcome,
        JobOutcome::Completed
    );

    time::sleep(Duration::from_secs(31)).await;
    assert_eq!(engine.prune_jobs(), 1);
    assert_eq!(
        engine.document_job(&alice, &job.tracking_id).unwrap_err(),
        EngineError::KeyNotFound(job.tracking_id.to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn running_jobs_are_never_pruned() {
    let engine = Engine::builder()
        .documents(Arc::new(Documents::new(usize::MAX)))
        .job_retention(Duration::from_secs(60))
        .build();
    let alice = customer("alice@startup.io");

    let job = engine.submit_documents(&alice).await.unwrap();
    time::sleep(Duration::from_secs(120)).await;

    assert_eq!(engine.prune_jobs(), 0);
    assert_eq!(
        engine.document_job(&alice, &job.tracking_id).unwrap().outcome,
        JobOutcome::Running
    );
}
