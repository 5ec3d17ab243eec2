use api_types::ledger::LedgerSnapshot;
use async_trait::async_trait;
use engine::{CustomerId, EngineError, ExpenseLedger, LedgerStore, ResultEngine};
use reqwest::StatusCode;

use crate::{Endpoint, RemoteError, server_error};

/// Record store reached over HTTP.
///
/// `GET {base}/ledgers/{email}` returns the snapshot (404 when the customer
/// has none yet), `PUT` replaces it.
#[derive(Clone, Debug)]
pub struct HttpLedgerStore {
    endpoint: Endpoint,
}

impl HttpLedgerStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, token)?,
        })
    }

    pub async fn fetch_snapshot(
        &self,
        customer: &CustomerId,
    ) -> Result<Option<LedgerSnapshot>, RemoteError> {
        let url = self.endpoint.url(&["ledgers", customer.as_str()]);
        let resp = self
            .endpoint
            .authorize(self.endpoint.http.get(url))
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp.json().await?)),
            _ => Err(server_error(resp).await),
        }
    }

    pub async fn put_snapshot(
        &self,
        customer: &CustomerId,
        snapshot: &LedgerSnapshot,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint.url(&["ledgers", customer.as_str()]);
        let resp = self
            .endpoint
            .authorize(self.endpoint.http.put(url))
            .json(snapshot)
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }
        Err(server_error(resp).await)
    }
}

#[async_trait]
impl LedgerStore for HttpLedgerStore {
    async fn fetch(&self, customer: &CustomerId) -> ResultEngine<Option<ExpenseLedger>> {
        let snapshot = self
            .fetch_snapshot(customer)
            .await
            .map_err(|err| EngineError::Store(err.to_string()))?;
        Ok(snapshot.map(LedgerSnapshot::into_ledger))
    }

    async fn save(&self, customer: &CustomerId, ledger: &ExpenseLedger) -> ResultEngine<()> {
        self.put_snapshot(customer, &LedgerSnapshot::from(ledger))
            .await
            .map_err(|err| EngineError::Store(err.to_string()))
    }
}
