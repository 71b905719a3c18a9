//! Outbound delivery of finalized messages

mod graph;

pub use graph::{GraphClient, GraphEndpoints};

use crate::smtp::Message;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token request failed: {0}")]
    Token(String),

    #[error("Message rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Sender {0:?} cannot be used as a mailbox")]
    InvalidSender(String),

    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Delivery channel closed")]
    ChannelClosed,
}

/// Something that can send a finalized message onwards.
///
/// Implementations are shared by every connection and must tolerate
/// concurrent calls.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn send_message(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Hand a message to the client without waiting for the outcome.
///
/// The send runs on its own task; failures are logged and otherwise dropped.
pub fn submit(client: Arc<dyn DeliveryClient>, message: Message) {
    tokio::spawn(async move {
        tracing::info!(
            from = %message.from,
            recipients = message.to.len(),
            "Sending message"
        );
        match client.send_message(&message).await {
            Ok(()) => tracing::info!(from = %message.from, "Message delivered"),
            Err(e) => tracing::warn!(from = %message.from, error = %e, "Message delivery failed"),
        }
    });
}

/// Delivers messages into an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelDelivery {
    sender: mpsc::UnboundedSender<Message>,
}

impl ChannelDelivery {
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self { sender }
    }

    /// Create a client together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl DeliveryClient for ChannelDelivery {
    async fn send_message(&self, message: &Message) -> Result<(), DeliveryError> {
        self.sender
            .send(message.clone())
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}
