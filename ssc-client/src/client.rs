//! The UDP protocol client
//!
//! One `SscClient` per device. The protocol is single-outstanding-request
//! per association, so correlation is purely temporal: send one datagram,
//! read the next one back. An internal exchange lock enforces that ordering
//! even when several composite queries run concurrently on one client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::Mutex as ExchangeMutex;
use uuid::Uuid;

use crate::error::{Result, SscError};

/// Fixed SSC control port
pub const DEFAULT_PORT: u16 = 45;

/// How long to wait for a response datagram before abandoning the request
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Backoff before re-establishing the association after a transport failure
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on a single SSC response document
const MAX_DATAGRAM: usize = 8192;

/// UDP client for one SSC device
///
/// Cheap to clone; clones share the association and the exchange lock.
#[derive(Debug, Clone)]
pub struct SscClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    device_ip: String,
    device_port: u16,
    /// Active association, if any. Cleared on disconnect and transport failure.
    socket: Mutex<Option<Arc<UdpSocket>>>,
    /// Serializes send-then-receive exchanges on the shared association.
    exchange: ExchangeMutex<()>,
    reconnect_pending: AtomicBool,
}

impl SscClient {
    /// Create a client for `device_ip` on the standard SSC port
    pub fn new(device_ip: impl Into<String>) -> Self {
        Self::with_port(device_ip, DEFAULT_PORT)
    }

    /// Create a client for a non-standard port
    pub fn with_port(device_ip: impl Into<String>, device_port: u16) -> Self {
        Self {
            inner: Arc::new(Inner {
                device_ip: device_ip.into(),
                device_port,
                socket: Mutex::new(None),
                exchange: ExchangeMutex::new(()),
                reconnect_pending: AtomicBool::new(false),
            }),
        }
    }

    /// IP address this client talks to
    pub fn device_ip(&self) -> &str {
        &self.inner.device_ip
    }

    /// Port this client talks to
    pub fn device_port(&self) -> u16 {
        self.inner.device_port
    }

    /// Establish the UDP association
    ///
    /// Until this completes, every send fails fast with
    /// [`SscError::NotConnected`].
    pub async fn connect(&self) -> Result<()> {
        let socket = Inner::open_socket(&self.inner.device_ip, self.inner.device_port).await?;
        tracing::debug!(
            ip = %self.inner.device_ip,
            port = self.inner.device_port,
            "udp association ready"
        );
        *self.inner.socket.lock() = Some(Arc::new(socket));
        Ok(())
    }

    /// Drop the association; pending exchanges fail, later sends return
    /// `NotConnected`
    pub fn disconnect(&self) {
        if self.inner.socket.lock().take().is_some() {
            tracing::debug!(ip = %self.inner.device_ip, "udp association closed");
        }
    }

    /// Whether an association is currently up
    pub fn is_connected(&self) -> bool {
        self.inner.socket.lock().is_some()
    }

    /// Send one request document and wait for the next inbound datagram
    ///
    /// An empty datagram with a clean completion is success with no payload;
    /// some commands legitimately produce no data. On timeout the request is
    /// abandoned and the late datagram, if any, is discarded by whichever
    /// exchange happens to read it next.
    pub async fn send_raw(&self, message: &str) -> Result<Vec<u8>> {
        let socket = self
            .inner
            .socket
            .lock()
            .clone()
            .ok_or(SscError::NotConnected)?;

        let _exchange = self.inner.exchange.lock().await;

        // Token is log-only bookkeeping; the wire payload never carries it.
        let token = request_token();
        tracing::debug!(ip = %self.inner.device_ip, %token, request = message, "ssc request");

        if let Err(e) = socket.send(message.as_bytes()).await {
            self.handle_transport_failure(&e);
            return Err(SscError::Transport(e.to_string()));
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        match tokio::time::timeout(RESPONSE_TIMEOUT, socket.recv(&mut buf)).await {
            Err(_) => {
                tracing::debug!(ip = %self.inner.device_ip, %token, "ssc response timeout");
                Err(SscError::Timeout)
            }
            Ok(Err(e)) => {
                tracing::debug!(ip = %self.inner.device_ip, %token, error = %e, "ssc transport error");
                self.handle_transport_failure(&e);
                Err(SscError::Transport(e.to_string()))
            }
            Ok(Ok(n)) => {
                buf.truncate(n);
                tracing::debug!(
                    ip = %self.inner.device_ip,
                    %token,
                    response = %String::from_utf8_lossy(&buf),
                    "ssc response"
                );
                Ok(buf)
            }
        }
    }

    /// Tear down the association and schedule one reconnect attempt after
    /// [`RECONNECT_DELAY`]
    fn handle_transport_failure(&self, error: &std::io::Error) {
        tracing::warn!(
            ip = %self.inner.device_ip,
            error = %error,
            "transport failure, reconnecting after delay"
        );
        self.inner.socket.lock().take();

        if self.inner.reconnect_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(RECONNECT_DELAY).await;
            match Inner::open_socket(&inner.device_ip, inner.device_port).await {
                Ok(socket) => {
                    let mut slot = inner.socket.lock();
                    // An explicit connect() may have beaten us to it.
                    if slot.is_none() {
                        *slot = Some(Arc::new(socket));
                        tracing::debug!(ip = %inner.device_ip, "udp association re-established");
                    }
                }
                Err(e) => {
                    tracing::warn!(ip = %inner.device_ip, error = %e, "reconnect attempt failed");
                }
            }
            inner.reconnect_pending.store(false, Ordering::SeqCst);
        });
    }
}

impl Inner {
    async fn open_socket(ip: &str, port: u16) -> Result<UdpSocket> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| SscError::Transport(format!("failed to bind socket: {e}")))?;
        socket
            .connect((ip, port))
            .await
            .map_err(|e| SscError::Transport(format!("failed to connect: {e}")))?;
        Ok(socket)
    }
}

fn request_token() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_connect_fails_fast() {
        let client = SscClient::new("192.0.2.1");
        let result = client.send_raw(r#"{"device":{"name":null}}"#).await;
        assert!(matches!(result, Err(SscError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_clears_association() {
        let client = SscClient::with_port("127.0.0.1", 45999);
        client.connect().await.unwrap();
        assert!(client.is_connected());

        client.disconnect();
        assert!(!client.is_connected());
        let result = client.send_raw(r#"{"device":{"name":null}}"#).await;
        assert!(matches!(result, Err(SscError::NotConnected)));
    }

    #[test]
    fn test_request_token_length() {
        let token = request_token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
