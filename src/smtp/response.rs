//! SMTP response handling

/// A single reply line sent to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The SMTP reply code (e.g., 220, 250, 354)
    pub code: u16,
    /// The human-readable text following the code
    pub message: &'static str,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub const fn new(code: u16, message: &'static str) -> Self {
        Self { code, message }
    }

    /// Sent as soon as a connection is accepted (220)
    pub const fn greeting() -> Self {
        Self::new(220, "Who are you...?")
    }

    /// Reply to `HELO` and `EHLO` (250)
    pub const fn hello() -> Self {
        Self::new(250, "Whatchu want?")
    }

    /// Reply to `MAIL FROM:` (250)
    pub const fn sender_accepted() -> Self {
        Self::new(250, "You again?!")
    }

    /// Reply to `RCPT TO:` (250)
    pub const fn recipient_accepted() -> Self {
        Self::new(250, "Ok fine...")
    }

    /// Intermediate reply to `DATA` (354)
    pub const fn data_start() -> Self {
        Self::new(354, "And whats so important that you have to bother me...?")
    }

    /// Sent once the body terminator has been read (250)
    pub const fn data_accepted() -> Self {
        Self::new(250, "Oh yea, that was *very* important... SMH.")
    }

    /// Reply to `QUIT` (221)
    pub const fn quit() -> Self {
        Self::new(221, "Bye, don't talk to me...")
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        format!("{} {}\r\n", self.code, self.message)
    }
}
