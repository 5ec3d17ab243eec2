//! Settings of the service. Configuration is read from `settings.toml`
//! (optional) and `RDCREDIT__*` environment variables, e.g.
//! `RDCREDIT__SERVER__PORT=8080` or `RDCREDIT__CREDIT__RATE=0.08`.
//!
//! See `settings.toml` for the configuration.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Where ledgers are loaded from and saved to.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Store {
    /// Process memory: ledgers are lost on restart.
    #[default]
    Memory,
    Http {
        base_url: String,
        token: Option<String>,
    },
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Documents {
    pub base_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Credit {
    pub rate: f64,
}

impl Default for Credit {
    fn default() -> Self {
        Self {
            rate: engine::CreditRate::DEFAULT.fraction(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Autosave {
    pub quiet_ms: u64,
}

impl Default for Autosave {
    fn default() -> Self {
        Self {
            quiet_ms: u64::try_from(engine::DEFAULT_QUIET_WINDOW.as_millis()).unwrap_or(2_000),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Polling {
    fn default() -> Self {
        let policy = engine::PollPolicy::default();
        Self {
            interval_secs: policy.interval.as_secs(),
            timeout_secs: policy.max_duration.as_secs(),
        }
    }
}

impl Polling {
    pub fn policy(&self) -> engine::PollPolicy {
        engine::PollPolicy {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            max_duration: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// How long idle state is kept in memory.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retention {
    pub session_idle_secs: u64,
    pub job_secs: u64,
    pub sweep_secs: u64,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            session_idle_secs: engine::DEFAULT_SESSION_TTL.as_secs(),
            job_secs: engine::DEFAULT_JOB_RETENTION.as_secs(),
            sweep_secs: 60,
        }
    }
}

impl Retention {
    pub fn sweep_every(&self) -> Duration {
        Duration::from_secs(self.sweep_secs.max(1))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub store: Store,
    pub documents: Option<Documents>,
    pub credit: Credit,
    pub autosave: Autosave,
    pub polling: Polling,
    pub retention: Retention,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("RDCREDIT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
