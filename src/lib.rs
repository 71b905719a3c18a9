//! # smtp2graph
//!
//! smtp2graph is a small SMTP listener that relays each received message
//! through the Microsoft Graph `sendMail` API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smtp2graph::{ChannelDelivery, SmtpServer};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), smtp2graph::SmtpError> {
//! let (delivery, mut rx) = ChannelDelivery::channel();
//! let server = SmtpServer::new(Arc::new(delivery));
//!
//! tokio::spawn(async move {
//!     while let Some(message) = rx.recv().await {
//!         println!("Received message from: {}", message.from);
//!     }
//! });
//!
//! server.start("127.0.0.1:2525").await
//! # }
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Acknowledged, no argument checks
//! - `MAIL FROM:<addr>` - Set the sender
//! - `RCPT TO:<addr>` - Add a recipient (duplicates are kept)
//! - `DATA` - Send headers and body, terminated by a lone `.`
//! - `QUIT` - Close the connection and relay the message
//!
//! Any other line is ignored without a reply.
//!
//! ## Message Handling
//!
//! Only the `Subject:` header, an `html` `Content-Type:` and
//! `Content-Transfer-Encoding: base64` are interpreted. Body lines are joined
//! without separators. A message is relayed once, on `QUIT`, and only if a
//! `DATA` transfer completed; the last transfer of a session wins.
//!
//! ## Notes
//!
//! - No authentication, TLS, queueing or retries.
//! - Delivery is fire-and-forget: failures are logged, not reported to the
//!   SMTP client.

pub mod config;
pub mod delivery;
mod smtp;

pub use config::{ConfigError, GraphCredentials, RelayConfig};
pub use delivery::{ChannelDelivery, DeliveryClient, DeliveryError, GraphClient, GraphEndpoints};
pub use smtp::{
    ContentKind, DataBlock, Envelope, Message, SmtpError, SmtpResponse, SmtpServer, SmtpSession,
    SmtpState, run_session,
};
