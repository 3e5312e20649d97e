use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub session: SessionConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the mediator backend, no trailing slash.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Job monitoring refresh cadence in seconds.
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Override for the session storage directory (defaults to the
    /// platform data dir).
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// When the backend is unreachable on an instant send, synthesize a
    /// clearly labeled demo result instead of failing.
    pub demo_fallback: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            backend: BackendConfig {
                base_url: env::var("SENDFLEET_BACKEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            poll: PollConfig {
                interval_secs: env::var("SENDFLEET_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            },
            session: SessionConfig {
                data_dir: env::var("SENDFLEET_DATA_DIR").ok().map(PathBuf::from),
            },
            dispatch: DispatchConfig {
                demo_fallback: env::var("SENDFLEET_DEMO_FALLBACK")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
            },
        })
    }
}
