//! SMTP listener and per-connection command loop

use crate::delivery::{self, DeliveryClient};
use crate::smtp::commands::{CommandOutcome, process_command};
use crate::smtp::data::read_data_block;
use crate::smtp::error::SmtpError;
use crate::smtp::line::read_line;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::Instrument;

/// Accepts SMTP connections and relays completed messages to a delivery client
#[derive(Clone)]
pub struct SmtpServer {
    delivery: Arc<dyn DeliveryClient>,
}

impl SmtpServer {
    /// Create a new SMTP server
    pub fn new(delivery: Arc<dyn DeliveryClient>) -> Self {
        Self { delivery }
    }

    /// Bind to `addr` and serve connections until the process ends
    pub async fn start<A: ToSocketAddrs>(&self, addr: A) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr).await?;
        self.start_with_listener(listener).await
    }

    /// Serve connections from an existing listener.
    ///
    /// Every connection runs on its own task; the accept loop never waits on
    /// one.
    pub async fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        tracing::info!(addr = %listener.local_addr()?, "SMTP listener started");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let delivery = Arc::clone(&self.delivery);
                    let span = tracing::info_span!("connection", %peer);
                    tokio::spawn(Self::handle_client(stream, delivery).instrument(span));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error accepting connection");
                }
            }
        }
    }

    /// Run one connection to completion, logging any fault
    async fn handle_client(stream: TcpStream, delivery: Arc<dyn DeliveryClient>) {
        tracing::info!("Accepting connection");

        match Self::serve(stream, delivery).await {
            Ok(()) => tracing::debug!("Connection finished"),
            Err(e) if e.is_disconnect() => {
                tracing::info!(error = %e, "Client disconnected before QUIT, nothing relayed");
            }
            Err(e) => tracing::warn!(error = %e, "Connection aborted, nothing relayed"),
        }
    }

    async fn serve(stream: TcpStream, delivery: Arc<dyn DeliveryClient>) -> Result<(), SmtpError> {
        stream.set_nodelay(true)?;
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut session = SmtpSession::new();
        run_session(&mut session, &mut reader, &mut writer).await?;

        if let Err(e) = writer.shutdown().await {
            tracing::debug!(error = %e, "Error closing connection");
        }

        match session.finish() {
            Some(message) => delivery::submit(delivery, message),
            None => tracing::info!("Session ended without a message"),
        }

        Ok(())
    }
}

/// Drive the command loop over one connection.
///
/// Returns once `QUIT` has been answered. Any read, write or decode fault
/// ends the loop with an error and no further response. The session is
/// `Closed` either way.
pub async fn run_session<R, W>(
    session: &mut SmtpSession,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), SmtpError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = command_loop(session, reader, writer).await;
    session.close();
    result
}

async fn command_loop<R, W>(
    session: &mut SmtpSession,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), SmtpError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();

    send_response(writer, &SmtpResponse::greeting()).await?;
    session.greeted();

    loop {
        let line = read_line(reader, &mut buffer).await?;
        tracing::debug!("=> {line}");

        match process_command(&line, session) {
            CommandOutcome::Reply(response) => send_response(writer, &response).await?,
            CommandOutcome::StartData => {
                send_response(writer, &SmtpResponse::data_start()).await?;
                let block = read_data_block(reader, &mut buffer).await?;
                session.complete_transfer(block);
                send_response(writer, &SmtpResponse::data_accepted()).await?;
            }
            CommandOutcome::Quit => {
                send_response(writer, &SmtpResponse::quit()).await?;
                return Ok(());
            }
            CommandOutcome::Ignored => {}
        }
    }
}

/// Send a response to the client
async fn send_response<W>(writer: &mut W, response: &SmtpResponse) -> Result<(), SmtpError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(response.format().as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::message::ContentKind;
    use crate::smtp::session::SmtpState;

    async fn run(input: &str) -> (SmtpSession, Result<(), SmtpError>, String) {
        let mut session = SmtpSession::new();
        let mut reader = BufReader::new(input.as_bytes());
        let mut output = Vec::new();
        let result = run_session(&mut session, &mut reader, &mut output).await;
        (session, result, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_complete_session_transcript() {
        let (session, result, output) = run(concat!(
            "EHLO x\r\n",
            "MAIL FROM:<a@x.com>\r\n",
            "RCPT TO:<b@y.com>\r\n",
            "DATA\r\n",
            "Subject: Hi\r\n",
            "\r\n",
            "Hello\r\n",
            ".\r\n",
            "QUIT\r\n",
        ))
        .await;

        assert_eq!(
            output,
            concat!(
                "220 Who are you...?\r\n",
                "250 Whatchu want?\r\n",
                "250 You again?!\r\n",
                "250 Ok fine...\r\n",
                "354 And whats so important that you have to bother me...?\r\n",
                "250 Oh yea, that was *very* important... SMH.\r\n",
                "221 Bye, don't talk to me...\r\n",
            )
        );

        assert!(result.is_ok());
        assert_eq!(session.state, SmtpState::Closed);
        let message = session.finish().unwrap();
        assert_eq!(message.from, "a@x.com");
        assert_eq!(message.to, vec!["b@y.com"]);
        assert_eq!(message.subject, "Hi");
        assert_eq!(message.body, "Hello");
        assert_eq!(message.kind, ContentKind::PlainText);
    }

    #[tokio::test]
    async fn test_unrecognized_lines_get_no_response() {
        let (session, result, output) = run("NOOP\r\nHELO a\r\nRSET\r\nQUIT\r\n").await;
        assert_eq!(
            output,
            "220 Who are you...?\r\n250 Whatchu want?\r\n221 Bye, don't talk to me...\r\n"
        );
        assert!(result.is_ok());
        assert!(session.finish().is_none());
    }

    #[tokio::test]
    async fn test_lines_after_quit_are_not_read() {
        let (_, result, output) = run("QUIT\r\nHELO a\r\n").await;
        assert_eq!(output, "220 Who are you...?\r\n221 Bye, don't talk to me...\r\n");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_eof_without_quit_is_a_fault() {
        let (session, result, output) = run("HELO a\r\nMAIL FROM:<a@x.com>\r\n").await;
        assert!(matches!(result, Err(SmtpError::ConnectionClosed)));
        assert!(output.ends_with("250 You again?!\r\n"));
        assert_eq!(session.state, SmtpState::Closed);
    }

    #[tokio::test]
    async fn test_decode_failure_sends_no_completion() {
        let (session, result, output) = run(concat!(
            "DATA\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "%%%\r\n",
            ".\r\n",
            "QUIT\r\n",
        ))
        .await;

        assert!(matches!(result, Err(SmtpError::Decode(_))));
        assert!(output.ends_with("354 And whats so important that you have to bother me...?\r\n"));
        assert_eq!(session.state, SmtpState::Closed);
        assert!(!session.has_transfer());
    }

    #[tokio::test]
    async fn test_multiple_transfers_last_wins() {
        let (session, result, _) = run(concat!(
            "MAIL FROM:<a@x.com>\r\n",
            "RCPT TO:<b@y.com>\r\n",
            "DATA\r\n",
            "Subject: First\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "one\r\n",
            ".\r\n",
            "DATA\r\n",
            "\r\n",
            "two\r\n",
            ".\r\n",
            "QUIT\r\n",
        ))
        .await;

        assert!(result.is_ok());
        assert_eq!(session.transfers, 2);
        let message = session.finish().unwrap();
        assert_eq!(message.subject, "");
        assert_eq!(message.body, "two");
        assert_eq!(message.kind, ContentKind::PlainText);
    }
}
