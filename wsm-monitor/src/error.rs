use thiserror::Error;

/// Errors surfaced by the monitoring layer
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ssc_client::SscError),

    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("monitor already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
