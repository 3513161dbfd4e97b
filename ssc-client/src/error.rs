use thiserror::Error;

/// Errors produced by the SSC protocol client
///
/// These cover the full failure surface of a request/response exchange over
/// the connectionless transport: the association not being up, the device
/// staying silent, the transport breaking underneath us, an undecodable
/// payload, and structured errors the device itself reports.
#[derive(Debug, Error)]
pub enum SscError {
    /// The client has no active UDP association
    ///
    /// Requests fail fast with this error until `connect()` has completed.
    /// Callers are responsible for connect-then-retry.
    #[error("not connected to device")]
    NotConnected,

    /// The device did not answer within the response timeout
    ///
    /// The request is abandoned; a late datagram, if one ever arrives, is
    /// discarded by the next unrelated receive.
    #[error("response timeout")]
    Timeout,

    /// Transport-level failure (connection refused, host unreachable, ...)
    ///
    /// The client marks itself disconnected and schedules a reconnect; the
    /// failed send is not retried internally.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response datagram was not a decodable SSC document
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The device returned a structured `osc.error` response
    #[error("device error: code {0}")]
    Device(i64),
}

/// Type alias for results that can return an SscError
pub type Result<T> = std::result::Result<T, SscError>;
