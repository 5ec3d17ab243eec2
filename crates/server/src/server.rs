use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
    typed_header::TypedHeaderRejection,
};

use std::{future::Future, net::SocketAddr, sync::Arc};

use crate::{calculator, documents, export, ledger, summary};
use engine::{CustomerId, Engine};

static CUSTOMER_HEADER: HeaderName = HeaderName::from_static("x-customer-email");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` for the customer forwarded by the gateway.
///
/// Customer requests must contain "x-customer-email" entry in the header,
/// holding the email the upstream access check was performed against.
#[derive(Debug)]
struct CustomerHeader(CustomerId);

impl Header for CustomerHeader {
    fn name() -> &'static HeaderName {
        &CUSTOMER_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let Ok(customer) = value.parse() else {
            return Err(AxumError::invalid());
        };

        Ok(CustomerHeader(customer))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(self.0.as_str()) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-customer-email header"),
        }
    }
}

async fn customer(
    header: Result<TypedHeader<CustomerHeader>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let TypedHeader(CustomerHeader(customer)) = header.map_err(|rejection| {
        tracing::debug!("customer header rejected: {rejection}");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(customer);
    Ok(next.run(request).await)
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: ServerState) -> Router {
    let customer_routes = Router::new()
        .route("/ledger", get(ledger::get))
        .route("/ledger/summary", get(summary::summary))
        .route("/ledger/estimate", get(summary::estimate))
        .route("/ledger/review", get(summary::review))
        .route("/ledger/export", get(export::csv))
        .route("/ledger/save", post(ledger::save))
        .route("/ledger/{category}", post(ledger::add))
        .route(
            "/ledger/{category}/{id}",
            patch(ledger::update).delete(ledger::remove),
        )
        .route("/documents", post(documents::submit))
        .route("/documents/{tracking_id}", get(documents::get))
        .route_layer(middleware::from_fn(customer));

    Router::new()
        .route("/health", get(health))
        .route("/calculator", post(calculator::estimate))
        .merge(customer_routes)
        .with_state(state)
}

pub async fn run(engine: Arc<Engine>, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener, std::future::pending()).await {
        tracing::error!("server failed: {err}");
    }
}

/// Serve until `shutdown` resolves, then let in-flight requests finish.
pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener, std::future::pending()).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
