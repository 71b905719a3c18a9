//! SMTP listener: command loop, data decoding and session state

pub mod commands;
pub mod data;
pub mod error;
pub mod line;
pub mod message;
pub mod response;
pub mod server;
pub mod session;

pub use data::DataBlock;
pub use error::SmtpError;
pub use message::{ContentKind, Message};
pub use response::SmtpResponse;
pub use server::{SmtpServer, run_session};
pub use session::{Envelope, SmtpSession, SmtpState};
