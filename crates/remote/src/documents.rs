use api_types::documents::{DocumentStatus, DocumentsSubmitted, SubmitDocuments};
use async_trait::async_trait;
use engine::{CustomerId, DocumentService, EngineError, JobStatus, ResultEngine, TrackingId};

use crate::{Endpoint, RemoteError, server_error};

/// Document-generation service reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpDocumentService {
    endpoint: Endpoint,
}

impl HttpDocumentService {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, token)?,
        })
    }

    async fn post_submit(&self, customer: &CustomerId) -> Result<DocumentsSubmitted, RemoteError> {
        let url = self.endpoint.url(&["documents"]);
        let resp = self
            .endpoint
            .authorize(self.endpoint.http.post(url))
            .json(&SubmitDocuments {
                customer_email: customer.to_string(),
            })
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }
        Err(server_error(resp).await)
    }

    async fn get_status(&self, id: &TrackingId) -> Result<DocumentStatus, RemoteError> {
        let url = self.endpoint.url(&["documents", id.as_str()]);
        let resp = self
            .endpoint
            .authorize(self.endpoint.http.get(url))
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }
        Err(server_error(resp).await)
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn submit(&self, customer: &CustomerId) -> ResultEngine<TrackingId> {
        let submitted = self
            .post_submit(customer)
            .await
            .map_err(|err| EngineError::DocumentService(err.to_string()))?;
        if submitted.tracking_id.trim().is_empty() {
            return Err(EngineError::DocumentService(
                "service returned an empty tracking id".to_string(),
            ));
        }
        Ok(TrackingId::new(submitted.tracking_id))
    }

    async fn status(&self, id: &TrackingId) -> ResultEngine<JobStatus> {
        let status = self.get_status(id).await.map_err(|err| {
            tracing::debug!(tracking_id = %id, "status request failed: {err}");
            EngineError::DocumentService(err.to_string())
        })?;
        Ok(status.into())
    }
}
