use std::{net::SocketAddr, sync::Arc, time::Duration};

use engine::{CreditRate, Engine, LedgerStore, MemoryLedgerStore};
use remote::{HttpDocumentService, HttpLedgerStore};
use settings::{Settings, Store};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "rdcredit={level},server={level},engine={level},remote={level}",
            level = settings.app.level
        ))
        .init();

    let engine = Arc::new(build_engine(&settings)?);
    tracing::debug!(?engine, "engine ready");
    let sweeper = engine.spawn_sweeper(settings.retention.sweep_every());

    let addr: SocketAddr = format!("{}:{}", settings.server.bind, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine.clone(), listener, shutdown_signal()).await?;
    sweeper.abort();

    tracing::info!("saving pending ledgers before exit");
    engine.flush_all().await;

    Ok(())
}

fn build_engine(settings: &Settings) -> Result<Engine, Box<dyn std::error::Error + Send + Sync>> {
    let store: Arc<dyn LedgerStore> = match &settings.store {
        Store::Memory => {
            tracing::warn!("using the in-memory record store, ledgers are lost on restart");
            Arc::new(MemoryLedgerStore::new())
        }
        Store::Http { base_url, token } => {
            tracing::info!("Found record store at {base_url}");
            Arc::new(HttpLedgerStore::new(base_url, token.clone())?)
        }
    };

    let rate = CreditRate::try_from(settings.credit.rate)?;
    let mut builder = Engine::builder()
        .store(store)
        .credit_rate(rate)
        .quiet_window(Duration::from_millis(settings.autosave.quiet_ms))
        .poll_policy(settings.polling.policy())
        .session_ttl(Duration::from_secs(settings.retention.session_idle_secs))
        .job_retention(Duration::from_secs(settings.retention.job_secs));

    match &settings.documents {
        Some(documents) => {
            tracing::info!("Found document service at {}", documents.base_url);
            builder = builder.documents(Arc::new(HttpDocumentService::new(
                &documents.base_url,
                documents.token.clone(),
            )?));
        }
        None => tracing::warn!("no document service configured, submissions will fail"),
    }

    Ok(builder.build())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    }
}
