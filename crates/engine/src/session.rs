//! A customer's live ledger.
//!
//! The session is the single writer of its ledger. Every mutation that changes
//! something schedules an autosave of the full snapshot; lookup misses change
//! nothing and schedule nothing.

use std::{sync::Arc, time::Duration};

use crate::{
    CustomerId, ResultEngine,
    autosave::Autosave,
    ledger::{Category, EntryId, EntryPatch, ExpenseLedger},
    qre::{self, QreSummary},
    store::LedgerStore,
};

#[derive(Debug)]
pub struct LedgerSession {
    customer: CustomerId,
    ledger: ExpenseLedger,
    autosave: Autosave,
}

impl LedgerSession {
    /// Load the customer's snapshot from `store` and start autosaving.
    ///
    /// A customer with no snapshot starts with an empty ledger. A store error
    /// is returned as is: starting empty would overwrite the stored ledger on
    /// the next save.
    pub async fn open(
        customer: CustomerId,
        store: Arc<dyn LedgerStore>,
        quiet_window: Duration,
    ) -> ResultEngine<Self> {
        let ledger = store.fetch(&customer).await?.unwrap_or_default();
        tracing::debug!(%customer, entries = ledger.len(), "ledger session opened");
        let autosave = Autosave::spawn(customer.clone(), store, quiet_window);
        Ok(Self {
            customer,
            ledger,
            autosave,
        })
    }

    pub fn customer(&self) -> &CustomerId {
        &self.customer
    }

    pub fn ledger(&self) -> &ExpenseLedger {
        &self.ledger
    }

    pub fn add_entry(&mut self, category: Category) -> EntryId {
        let id = self.ledger.add_entry(category);
        self.touch();
        id
    }

    /// Returns `false` if the entry doesn't exist.
    pub fn update_entry(&mut self, id: &EntryId, patch: impl Into<EntryPatch>) -> bool {
        let patch = patch.into();
        let category = patch.category();
        let found = self.ledger.update_entry(id, patch);
        if found {
            self.touch();
        } else {
            tracing::debug!(customer = %self.customer, %category, %id, "update of unknown entry ignored");
        }
        found
    }

    /// Returns `false` if the entry doesn't exist.
    pub fn remove_entry(&mut self, category: Category, id: &EntryId) -> bool {
        let removed = self.ledger.remove_entry(category, id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Drops every entry.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.touch();
    }

    pub fn summary(&self) -> QreSummary {
        qre::summarize(&self.ledger)
    }

    /// `true` while a mutation hasn't reached the store.
    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    /// Save now instead of waiting for the quiet window.
    pub async fn flush(&self) {
        self.autosave.flush().await;
    }

    fn touch(&mut self) {
        self.autosave.schedule(self.ledger.clone());
    }
}
