//! SSC protocol client for wireless-microphone hardware
//!
//! This crate speaks the SSC control protocol: newline-free UTF-8 JSON
//! documents exchanged as single UDP datagrams on port 45. A request is a
//! partial tree whose `null` leaves name the fields to report; the response
//! mirrors the same shape with values filled in, or carries an `osc.error`
//! array for structured failures.
//!
//! # Quick Start
//!
//! ```no_run
//! use ssc_client::{SscClient, request, SscResponse};
//!
//! # async fn example() -> ssc_client::Result<()> {
//! let client = SscClient::new("192.168.0.50");
//! client.connect().await?;
//!
//! let data = client.send_raw(&request::device_name()).await?;
//! let response = SscResponse::parse(&data)?;
//! println!("device: {:?}", response.device_name());
//! # Ok(())
//! # }
//! ```

mod client;
mod detect;
mod error;
pub mod request;
pub mod response;

pub use client::{SscClient, DEFAULT_PORT, RECONNECT_DELAY, RESPONSE_TIMEOUT};
pub use detect::{classify_device_name, detect_device_type, DeviceType};
pub use error::{Result, SscError};
pub use response::{BaysInfo, SscResponse};
