use thiserror::Error;

/// Errors that can occur during a network scan
#[derive(Debug, Error)]
pub enum ScanError {
    /// The base address pattern has no `x` placeholder to expand
    #[error("invalid address pattern: {0}")]
    InvalidPattern(String),
}

/// Type alias for results that can return a ScanError
pub type Result<T> = std::result::Result<T, ScanError>;
