//! Finalized messages handed to the delivery client

use std::time::SystemTime;

/// How the message body should be presented by the receiving API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentKind {
    #[default]
    PlainText,
    Html,
}

/// An immutable snapshot of a session's envelope, ready for delivery
#[derive(Debug, Clone)]
pub struct Message {
    /// The sender's address from `MAIL FROM:`
    pub from: String,

    /// Recipient addresses in the order `RCPT TO:` supplied them
    pub to: Vec<String>,

    /// Value of the `Subject:` header, empty when none was sent
    pub subject: String,

    /// Decoded body text
    pub body: String,

    pub kind: ContentKind,

    /// When the message was finalized
    pub received_at: SystemTime,
}

impl Message {
    /// Create a new message stamped with the current time
    pub fn new(
        from: String,
        to: Vec<String>,
        subject: String,
        body: String,
        kind: ContentKind,
    ) -> Self {
        Self {
            from,
            to,
            subject,
            body,
            kind,
            received_at: SystemTime::now(),
        }
    }

    /// Check if this message is addressed to a specific recipient
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr == recipient)
    }

    /// Check if this message was sent from a specific sender
    pub fn is_from_sender(&self, sender: &str) -> bool {
        self.from == sender
    }

    /// Size of the decoded body in bytes
    pub fn body_size(&self) -> usize {
        self.body.len()
    }

    pub fn is_html(&self) -> bool {
        self.kind == ContentKind::Html
    }
}
