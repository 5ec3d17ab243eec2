//! Debounced background persistence.
//!
//! [`Autosave`] owns a background task with a single pending slot. Each
//! [`Autosave::schedule`] call replaces whatever snapshot is waiting and
//! restarts the quiet window; the snapshot is written only once the window
//! elapses with no newer one. A failed write is logged and its snapshot kept:
//! the next [`Autosave::flush`] retries it, a newer snapshot replaces it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{mpsc, oneshot},
    time,
};

use crate::{CustomerId, ledger::ExpenseLedger, store::LedgerStore};

/// Quiet window used when none is configured.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_secs(2);

enum Command {
    Schedule {
        generation: u64,
        snapshot: ExpenseLedger,
    },
    Flush(oneshot::Sender<()>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Schedule { generation, .. } => {
                f.debug_struct("Schedule").field("generation", generation).finish()
            }
            Command::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Handle to a customer's autosave task.
///
/// Dropping the handle stops the task after it writes any pending snapshot.
#[derive(Debug)]
pub struct Autosave {
    commands: mpsc::UnboundedSender<Command>,
    scheduled: u64,
    saved: Arc<AtomicU64>,
}

impl Autosave {
    /// Spawn the autosave task of `customer` on the current tokio runtime.
    pub fn spawn(
        customer: CustomerId,
        store: Arc<dyn LedgerStore>,
        quiet_window: Duration,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let saved = Arc::new(AtomicU64::new(0));
        tokio::spawn(run(customer, store, quiet_window, receiver, saved.clone()));
        Self {
            commands,
            scheduled: 0,
            saved,
        }
    }

    /// Queue `snapshot` for saving, superseding any pending one.
    pub fn schedule(&mut self, snapshot: ExpenseLedger) {
        self.scheduled += 1;
        let command = Command::Schedule {
            generation: self.scheduled,
            snapshot,
        };
        if self.commands.send(command).is_err() {
            tracing::error!("autosave task is gone, snapshot not queued");
        }
    }

    /// Write the pending snapshot now, if any, and wait for the attempt.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Flush(done)).is_err() {
            tracing::error!("autosave task is gone, nothing to flush");
            return;
        }
        let _ = wait.await;
    }

    /// `true` while the latest scheduled snapshot hasn't been written.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.saved.load(Ordering::Acquire) < self.scheduled
    }
}

async fn run(
    customer: CustomerId,
    store: Arc<dyn LedgerStore>,
    quiet_window: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    saved: Arc<AtomicU64>,
) {
    let mut pending: Option<(u64, ExpenseLedger)> = None;
    // The quiet window runs only for a freshly scheduled snapshot. A snapshot
    // whose save failed stays pending, unarmed, until a flush or a newer one.
    let mut armed = false;

    loop {
        let command = if armed {
            match time::timeout(quiet_window, commands.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    armed = false;
                    save_pending(&customer, store.as_ref(), &mut pending, &saved).await;
                    continue;
                }
            }
        } else {
            commands.recv().await
        };

        match command {
            Some(Command::Schedule {
                generation,
                snapshot,
            }) => {
                if pending.is_some() {
                    tracing::trace!(%customer, generation, "pending snapshot superseded");
                }
                pending = Some((generation, snapshot));
                armed = true;
            }
            Some(Command::Flush(done)) => {
                armed = false;
                save_pending(&customer, store.as_ref(), &mut pending, &saved).await;
                let _ = done.send(());
            }
            None => {
                save_pending(&customer, store.as_ref(), &mut pending, &saved).await;
                break;
            }
        }
    }

    tracing::debug!(%customer, "autosave task stopped");
}

/// Write the pending snapshot, if any. It stays pending when the write fails.
async fn save_pending(
    customer: &CustomerId,
    store: &dyn LedgerStore,
    pending: &mut Option<(u64, ExpenseLedger)>,
    saved: &AtomicU64,
) {
    let Some((generation, snapshot)) = pending.take() else {
        return;
    };
    match store.save(customer, &snapshot).await {
        Ok(()) => {
            saved.fetch_max(generation, Ordering::AcqRel);
            tracing::debug!(%customer, generation, entries = snapshot.len(), "ledger saved");
        }
        Err(err) => {
            tracing::warn!(%customer, generation, "ledger save failed: {err}");
            *pending = Some((generation, snapshot));
        }
    }
}
