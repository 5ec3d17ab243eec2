//! R&D tax credit engine.
//!
//! The [`Engine`] keeps one [`LedgerSession`] per customer, computes QRE
//! summaries and credit estimates from them, and tracks document-generation
//! jobs. Ledgers are loaded from and autosaved to a [`LedgerStore`]; documents
//! come from a [`DocumentService`]. Both collaborators are external.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError},
    time::Duration,
};

use chrono::Utc;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

pub use autosave::{Autosave, DEFAULT_QUIET_WINDOW};
pub use calculator::{QuickEstimate, QuickEstimateInput, quick_estimate};
pub use customer::CustomerId;
pub use documents::{
    DocumentJob, DocumentService, JobOutcome, JobState, JobStatus, PollOutcome, PollPolicy,
    TrackingId, poll_job,
};
pub use error::EngineError;
pub use ledger::{
    Category, CloudSoftwareEntry, CloudSoftwarePatch, ContractorEntry, ContractorPatch, Entry,
    EntryId, EntryPatch, ExpenseLedger, SupplyEntry, SupplyPatch, WageEntry, WagePatch,
};
pub use money::Money;
pub use pricing::{CreditEstimate, CreditRate, PriceTier, Quote};
pub use qre::{QreSummary, summarize};
pub use session::LedgerSession;
pub use store::{LedgerStore, MemoryLedgerStore};
pub use validation::{EntryIssue, Problem, Review};

mod autosave;
pub mod calculator;
mod customer;
pub mod documents;
mod error;
pub mod ledger;
mod money;
pub mod pricing;
pub mod qre;
mod session;
mod store;
pub mod validation;

pub type ResultEngine<T> = Result<T, EngineError>;

/// Idle time after which a clean session is closed.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// How long a completed or abandoned job stays queryable.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

struct SessionSlot {
    session: Arc<Mutex<LedgerSession>>,
    last_used: Instant,
}

struct TrackedJob {
    job: DocumentJob,
    /// Set once the poll loop ends.
    finished: Option<Instant>,
}

type Jobs = Arc<std::sync::Mutex<HashMap<TrackingId, TrackedJob>>>;

pub struct Engine {
    sessions: Mutex<HashMap<CustomerId, SessionSlot>>,
    store: Arc<dyn LedgerStore>,
    documents: Option<Arc<dyn DocumentService>>,
    jobs: Jobs,
    credit_rate: CreditRate,
    quiet_window: Duration,
    poll_policy: PollPolicy,
    session_ttl: Duration,
    job_retention: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("credit_rate", &self.credit_rate)
            .field("quiet_window", &self.quiet_window)
            .field("poll_policy", &self.poll_policy)
            .field("session_ttl", &self.session_ttl)
            .field("job_retention", &self.job_retention)
            .field("documents", &self.documents.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Rate used for every credit estimate.
    pub fn credit_rate(&self) -> CreditRate {
        self.credit_rate
    }

    /// Session of `customer`, opening it on first access. Marks it as used.
    async fn session(&self, customer: &CustomerId) -> ResultEngine<Arc<Mutex<LedgerSession>>> {
        if let Some(slot) = self.sessions.lock().await.get_mut(customer) {
            slot.last_used = Instant::now();
            return Ok(slot.session.clone());
        }

        // Opened without holding the registry lock; a concurrent opener may
        // win, in which case this session is dropped before any mutation.
        let opened =
            LedgerSession::open(customer.clone(), self.store.clone(), self.quiet_window).await?;
        let mut sessions = self.sessions.lock().await;
        let slot = sessions
            .entry(customer.clone())
            .or_insert_with(|| SessionSlot {
                session: Arc::new(Mutex::new(opened)),
                last_used: Instant::now(),
            });
        slot.last_used = Instant::now();
        Ok(slot.session.clone())
    }

    /// Number of sessions currently open.
    pub async fn open_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Snapshot of the customer's ledger.
    pub async fn ledger(&self, customer: &CustomerId) -> ResultEngine<ExpenseLedger> {
        let session = self.session(customer).await?;
        let session = session.lock().await;
        Ok(session.ledger().clone())
    }

    /// Append a zero-valued entry to `category`.
    pub async fn add_entry(
        &self,
        customer: &CustomerId,
        category: Category,
    ) -> ResultEngine<EntryId> {
        let session = self.session(customer).await?;
        let mut session = session.lock().await;
        Ok(session.add_entry(category))
    }

    /// Patch an entry. `Ok(false)` if the entry doesn't exist.
    pub async fn update_entry(
        &self,
        customer: &CustomerId,
        id: &EntryId,
        patch: impl Into<EntryPatch>,
    ) -> ResultEngine<bool> {
        let session = self.session(customer).await?;
        let mut session = session.lock().await;
        Ok(session.update_entry(id, patch))
    }

    /// Remove an entry. `Ok(false)` if the entry doesn't exist.
    pub async fn remove_entry(
        &self,
        customer: &CustomerId,
        category: Category,
        id: &EntryId,
    ) -> ResultEngine<bool> {
        let session = self.session(customer).await?;
        let mut session = session.lock().await;
        Ok(session.remove_entry(category, id))
    }

    /// Drop every entry of the customer's ledger.
    pub async fn reset_ledger(&self, customer: &CustomerId) -> ResultEngine<()> {
        let session = self.session(customer).await?;
        session.lock().await.reset();
        Ok(())
    }

    pub async fn summary(&self, customer: &CustomerId) -> ResultEngine<QreSummary> {
        let session = self.session(customer).await?;
        let session = session.lock().await;
        Ok(session.summary())
    }

    /// Credit estimate and price, with `additional_years` prior filing years.
    pub async fn estimate(
        &self,
        customer: &CustomerId,
        additional_years: u32,
    ) -> ResultEngine<CreditEstimate> {
        let summary = self.summary(customer).await?;
        Ok(pricing::estimate(&summary, self.credit_rate, additional_years))
    }

    pub async fn review(&self, customer: &CustomerId) -> ResultEngine<Review> {
        let session = self.session(customer).await?;
        let session = session.lock().await;
        Ok(validation::review(session.ledger()))
    }

    /// Public calculator, at the engine's credit rate.
    pub fn quick_estimate(&self, input: &QuickEstimateInput) -> QuickEstimate {
        calculator::quick_estimate(input, self.credit_rate)
    }

    /// `true` while the customer has changes that haven't been saved.
    pub async fn is_dirty(&self, customer: &CustomerId) -> bool {
        let session = self
            .sessions
            .lock()
            .await
            .get(customer)
            .map(|slot| slot.session.clone());
        match session {
            Some(session) => session.lock().await.is_dirty(),
            None => false,
        }
    }

    /// Save the customer's pending changes now.
    pub async fn flush(&self, customer: &CustomerId) -> ResultEngine<()> {
        let session = self.session(customer).await?;
        session.lock().await.flush().await;
        Ok(())
    }

    /// Save every open session's pending changes.
    pub async fn flush_all(&self) {
        let sessions: Vec<_> = self
            .sessions
            .lock()
            .await
            .values()
            .map(|slot| slot.session.clone())
            .collect();
        for session in sessions {
            session.lock().await.flush().await;
        }
    }

    /// Close sessions unused for longer than the session TTL.
    ///
    /// Pending changes are saved first; a session whose save fails stays
    /// open. Returns the number of sessions closed.
    pub async fn evict_idle(&self) -> usize {
        let idle: Vec<_> = {
            let now = Instant::now();
            self.sessions
                .lock()
                .await
                .iter()
                .filter(|(_, slot)| now.duration_since(slot.last_used) >= self.session_ttl)
                .map(|(customer, slot)| (customer.clone(), slot.session.clone()))
                .collect()
        };

        let mut evicted = 0;
        for (customer, session) in idle {
            let guard = session.lock().await;
            guard.flush().await;
            if guard.is_dirty() {
                tracing::warn!(%customer, "idle session kept open, pending changes not saved");
                continue;
            }

            let mut sessions = self.sessions.lock().await;
            // A request may have picked the session up while it was flushing.
            let still_idle = sessions.get(&customer).is_some_and(|slot| {
                Arc::ptr_eq(&slot.session, &session)
                    && Instant::now().duration_since(slot.last_used) >= self.session_ttl
            });
            if still_idle {
                sessions.remove(&customer);
                evicted += 1;
                tracing::debug!(%customer, "idle session closed");
            }
        }
        evicted
    }

    /// Forget jobs that finished longer than the retention period ago.
    /// Running jobs are kept. Returns the number of jobs dropped.
    pub fn prune_jobs(&self) -> usize {
        let now = Instant::now();
        let mut jobs = lock_jobs(&self.jobs);
        let before = jobs.len();
        jobs.retain(|_, tracked| {
            tracked
                .finished
                .is_none_or(|at| now.duration_since(at) < self.job_retention)
        });
        before - jobs.len()
    }

    /// Run [`Engine::evict_idle`] and [`Engine::prune_jobs`] every `every`.
    ///
    /// The task holds a weak reference and stops once the engine is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let engine = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                let sessions = engine.evict_idle().await;
                let jobs = engine.prune_jobs();
                if sessions > 0 || jobs > 0 {
                    tracing::info!(sessions, jobs, "sweep released idle state");
                }
            }
        })
    }

    /// Submit the customer's documents for generation and start tracking the
    /// job in the background.
    ///
    /// The ledger is saved first so the service reads the latest snapshot.
    pub async fn submit_documents(&self, customer: &CustomerId) -> ResultEngine<DocumentJob> {
        let Some(service) = self.documents.clone() else {
            return Err(EngineError::DocumentService(
                "document generation is not configured".to_string(),
            ));
        };

        self.flush(customer).await?;
        let tracking_id = service.submit(customer).await?;
        tracing::info!(%customer, %tracking_id, "document job submitted");

        let job = DocumentJob {
            tracking_id: tracking_id.clone(),
            customer: customer.clone(),
            submitted_at: Utc::now(),
            latest: None,
            outcome: JobOutcome::Running,
        };
        lock_jobs(&self.jobs).insert(
            tracking_id.clone(),
            TrackedJob {
                job: job.clone(),
                finished: None,
            },
        );

        let jobs = self.jobs.clone();
        let policy = self.poll_policy;
        tokio::spawn(async move {
            let outcome = poll_job(service.as_ref(), &tracking_id, policy, |status| {
                if let Some(tracked) = lock_jobs(&jobs).get_mut(&tracking_id) {
                    tracked.job.latest = Some(status.clone());
                }
            })
            .await;

            if let Some(tracked) = lock_jobs(&jobs).get_mut(&tracking_id) {
                tracked.job.outcome = match outcome {
                    PollOutcome::Completed(_) => JobOutcome::Completed,
                    PollOutcome::Abandoned { .. } => JobOutcome::Abandoned,
                };
                tracked.finished = Some(Instant::now());
            }
        });

        Ok(job)
    }

    /// A tracked job. Jobs of other customers, and jobs pruned after the
    /// retention period, are reported as not found.
    pub fn document_job(
        &self,
        customer: &CustomerId,
        tracking_id: &TrackingId,
    ) -> ResultEngine<DocumentJob> {
        lock_jobs(&self.jobs)
            .get(tracking_id)
            .map(|tracked| &tracked.job)
            .filter(|job| &job.customer == customer)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound(tracking_id.to_string()))
    }
}

fn lock_jobs(jobs: &Jobs) -> std::sync::MutexGuard<'_, HashMap<TrackingId, TrackedJob>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn LedgerStore>>,
    documents: Option<Arc<dyn DocumentService>>,
    credit_rate: Option<CreditRate>,
    quiet_window: Option<Duration>,
    poll_policy: Option<PollPolicy>,
    session_ttl: Option<Duration>,
    job_retention: Option<Duration>,
}

impl EngineBuilder {
    /// Record store for ledger snapshots. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn LedgerStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    /// Document-generation service. Without it, submissions fail.
    pub fn documents(mut self, documents: Arc<dyn DocumentService>) -> EngineBuilder {
        self.documents = Some(documents);
        self
    }

    pub fn credit_rate(mut self, rate: CreditRate) -> EngineBuilder {
        self.credit_rate = Some(rate);
        self
    }

    /// Autosave quiet window.
    pub fn quiet_window(mut self, window: Duration) -> EngineBuilder {
        self.quiet_window = Some(window);
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> EngineBuilder {
        self.poll_policy = Some(policy);
        self
    }

    /// Idle time after which [`Engine::evict_idle`] closes a session.
    pub fn session_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.session_ttl = Some(ttl);
        self
    }

    /// How long finished jobs stay queryable.
    pub fn job_retention(mut self, retention: Duration) -> EngineBuilder {
        self.job_retention = Some(retention);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            sessions: Mutex::new(HashMap::new()),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryLedgerStore::new())),
            documents: self.documents,
            jobs: Arc::default(),
            credit_rate: self.credit_rate.unwrap_or_default(),
            quiet_window: self.quiet_window.unwrap_or(DEFAULT_QUIET_WINDOW),
            poll_policy: self.poll_policy.unwrap_or_default(),
            session_ttl: self.session_ttl.unwrap_or(DEFAULT_SESSION_TTL),
            job_retention: self.job_retention.unwrap_or(DEFAULT_JOB_RETENTION),
        }
    }
}
