use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("provider `{0}` is not installed")]
    ProviderUnavailable(String),
    #[error("provider exited with {status}: {stderr}")]
    ProviderFailed { status: ExitStatus, stderr: String },
    #[error("provider did not answer within {0:?}")]
    ProviderTimeout(Duration),
    #[error("failed to run provider: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the user config directory")]
    NoConfigDir,
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings file does not hold a JSON object")]
    NotAnObject,
}
