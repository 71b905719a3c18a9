//! Error types for the SMTP listener

use thiserror::Error;

/// Faults that end a connection.
///
/// None of these are reported to the peer: the connection is dropped and the
/// envelope is discarded without delivery.
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Invalid base64 message body: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl SmtpError {
    /// Whether the peer simply went away, as opposed to a real fault
    pub fn is_disconnect(&self) -> bool {
        match self {
            SmtpError::ConnectionClosed => true,
            SmtpError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            SmtpError::Decode(_) => false,
        }
    }
}
