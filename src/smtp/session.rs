//! SMTP session state management

use crate::smtp::data::DataBlock;
use crate::smtp::message::{ContentKind, Message};

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Connection accepted, greeting not yet written
    Greeting,
    /// Reading and answering commands
    CommandLoop,
    /// Reading the header and body block after `DATA`
    DataTransfer,
    /// Terminal, after `QUIT` or a fault
    Closed,
}

/// Mutable per-connection accumulator of the message being relayed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub kind: ContentKind,
}

impl Envelope {
    /// Consume the envelope into an immutable message
    pub fn finalize(self) -> Message {
        Message::new(
            self.sender,
            self.recipients,
            self.subject,
            self.body,
            self.kind,
        )
    }
}

/// Manages the state and envelope for a single connection
#[derive(Debug)]
pub struct SmtpSession {
    /// Current state of the session
    pub state: SmtpState,
    pub envelope: Envelope,
    /// Number of DATA transfers that ran to their terminator
    pub transfers: usize,
}

impl SmtpSession {
    /// Create a new SMTP session
    pub fn new() -> Self {
        Self {
            state: SmtpState::Greeting,
            envelope: Envelope::default(),
            transfers: 0,
        }
    }

    /// Record that the greeting has been written
    pub fn greeted(&mut self) {
        self.state = SmtpState::CommandLoop;
    }

    /// Set the sender address, replacing any earlier one
    pub fn set_sender(&mut self, sender: String) {
        self.envelope.sender = sender;
    }

    /// Add a recipient address
    pub fn add_recipient(&mut self, recipient: String) {
        self.envelope.recipients.push(recipient);
    }

    /// Enter the data transfer sub-state
    pub fn start_data_mode(&mut self) {
        self.state = SmtpState::DataTransfer;
    }

    /// Store a decoded DATA block. A later transfer overwrites an earlier one.
    pub fn complete_transfer(&mut self, block: DataBlock) {
        self.envelope.kind = block.kind;
        self.envelope.subject = block.subject;
        self.envelope.body = block.body;
        self.transfers += 1;
        self.state = SmtpState::CommandLoop;
    }

    /// Mark the session closed
    pub fn close(&mut self) {
        self.state = SmtpState::Closed;
    }

    /// Whether at least one DATA transfer has completed
    pub fn has_transfer(&self) -> bool {
        self.transfers > 0
    }

    /// Close the session and take its message, if any transfer completed
    pub fn finish(mut self) -> Option<Message> {
        self.close();
        if self.has_transfer() {
            Some(self.envelope.finalize())
        } else {
            None
        }
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}
