//! Record store boundary.
//!
//! Ledgers live in an external record store; the engine only fetches a
//! snapshot when a session opens and pushes full snapshots back when the
//! autosave fires. [`MemoryLedgerStore`] keeps them in process (development
//! and tests).

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CustomerId, ResultEngine, ledger::ExpenseLedger};

/// Persistence collaborator for ledger snapshots.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch the snapshot of `customer`, `None` if nothing was ever saved.
    async fn fetch(&self, customer: &CustomerId) -> ResultEngine<Option<ExpenseLedger>>;

    /// Replace the snapshot of `customer`.
    async fn save(&self, customer: &CustomerId, ledger: &ExpenseLedger) -> ResultEngine<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    ledgers: RwLock<HashMap<CustomerId, ExpenseLedger>>,
    saves: AtomicUsize,
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer's snapshot.
    pub async fn put(&self, customer: CustomerId, ledger: ExpenseLedger) {
        self.ledgers.write().await.insert(customer, ledger);
    }

    /// Current snapshot of a customer, as last saved.
    pub async fn get(&self, customer: &CustomerId) -> Option<ExpenseLedger> {
        self.ledgers.read().await.get(customer).cloned()
    }

    /// Number of `save` calls received so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Acquire)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn fetch(&self, customer: &CustomerId) -> ResultEngine<Option<ExpenseLedger>> {
        Ok(self.get(customer).await)
    }

    async fn save(&self, customer: &CustomerId, ledger: &ExpenseLedger) -> ResultEngine<()> {
        self.ledgers
            .write()
            .await
            .insert(customer.clone(), ledger.clone());
        self.saves.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
