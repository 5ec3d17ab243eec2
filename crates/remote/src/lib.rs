//! HTTP clients for the engine's external collaborators: the record store
//! holding ledger snapshots and the document-generation service.

use api_types::ErrorBody;
use reqwest::{RequestBuilder, Response, StatusCode, Url};

pub use documents::HttpDocumentService;
pub use store::HttpLedgerStore;

mod documents;
mod store;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid base_url: {0}")]
    BaseUrl(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

/// Base URL plus optional bearer token, shared by both clients.
#[derive(Clone, Debug)]
struct Endpoint {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl Endpoint {
    fn new(base_url: &str, token: Option<String>) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url).map_err(|err| RemoteError::BaseUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::BaseUrl(format!("{base_url} cannot be a base")));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    /// `base_url` with `segments` appended, each one percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Turn a non-success response into `RemoteError::Server`.
async fn server_error(resp: Response) -> RemoteError {
    let status = resp.status();
    let message = match resp.json::<ErrorBody>().await {
        Ok(err) => err.error,
        Err(_) => "server error".to_string(),
    };
    RemoteError::Server { status, message }
}
