//! Classification and handling of SMTP command lines

use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

/// The commands this listener understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `HELO` or `EHLO`
    Hello,
    /// `MAIL FROM:`
    MailFrom,
    /// `RCPT TO:`
    RcptTo,
    Data,
    Quit,
}

impl Command {
    /// Classify a raw line by its case-sensitive prefix
    pub fn classify(line: &str) -> Option<Self> {
        if line.starts_with("HELO") || line.starts_with("EHLO") {
            Some(Self::Hello)
        } else if line.starts_with("MAIL FROM:") {
            Some(Self::MailFrom)
        } else if line.starts_with("RCPT TO:") {
            Some(Self::RcptTo)
        } else if line.starts_with("DATA") {
            Some(Self::Data)
        } else if line.starts_with("QUIT") {
            Some(Self::Quit)
        } else {
            None
        }
    }
}

/// What the connection loop has to do after a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Write the response and keep reading commands
    Reply(SmtpResponse),
    /// Write the 354 response and hand the stream to the data decoder
    StartData,
    /// Write the 221 response and end the session
    Quit,
    /// Unrecognized line; nothing is written
    Ignored,
}

/// Extract the text between the first `<` and the last `>` after it
pub fn extract_bracketed(line: &str) -> Option<&str> {
    let open = line.find('<')?;
    let rest = &line[open + 1..];
    let close = rest.rfind('>')?;
    Some(&rest[..close])
}

/// Apply one command line to the session
pub fn process_command(line: &str, session: &mut SmtpSession) -> CommandOutcome {
    let Some(command) = Command::classify(line) else {
        return CommandOutcome::Ignored;
    };

    match command {
        Command::Hello => CommandOutcome::Reply(SmtpResponse::hello()),
        Command::MailFrom => {
            let sender = extract_bracketed(line).unwrap_or_default();
            session.set_sender(sender.to_string());
            CommandOutcome::Reply(SmtpResponse::sender_accepted())
        }
        Command::RcptTo => {
            let recipient = extract_bracketed(line).unwrap_or_default();
            session.add_recipient(recipient.to_string());
            CommandOutcome::Reply(SmtpResponse::recipient_accepted())
        }
        Command::Data => {
            session.start_data_mode();
            CommandOutcome::StartData
        }
        Command::Quit => CommandOutcome::Quit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::session::{Envelope, SmtpState};

    fn greeted_session() -> SmtpSession {
        let mut session = SmtpSession::new();
        session.greeted();
        session
    }

    #[test]
    fn test_classify() {
        assert_eq!(Command::classify("HELO client.local"), Some(Command::Hello));
        assert_eq!(Command::classify("EHLO x"), Some(Command::Hello));
        assert_eq!(Command::classify("MAIL FROM:<a@x.com>"), Some(Command::MailFrom));
        assert_eq!(Command::classify("RCPT TO:<b@y.com>"), Some(Command::RcptTo));
        assert_eq!(Command::classify("DATA"), Some(Command::Data));
        assert_eq!(Command::classify("QUIT"), Some(Command::Quit));
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(Command::classify("helo client.local"), None);
        assert_eq!(Command::classify("mail from:<a@x.com>"), None);
        assert_eq!(Command::classify(" QUIT"), None);
        assert_eq!(Command::classify("MAIL <a@x.com>"), None);
    }

    #[test]
    fn test_extract_bracketed() {
        assert_eq!(extract_bracketed("MAIL FROM:<a@x.com>"), Some("a@x.com"));
        assert_eq!(extract_bracketed("MAIL FROM:<>"), Some(""));
        assert_eq!(extract_bracketed("MAIL FROM:a@x.com"), None);
        assert_eq!(extract_bracketed("MAIL FROM:<a@x.com"), None);
        assert_eq!(
            extract_bracketed("MAIL FROM:<a@x.com> SIZE=<10>"),
            Some("a@x.com> SIZE=<10")
        );
    }

    #[test]
    fn test_hello_command() {
        let mut session = greeted_session();
        let outcome = process_command("EHLO client.local", &mut session);
        assert_eq!(outcome, CommandOutcome::Reply(SmtpResponse::hello()));
        assert_eq!(session.envelope, Envelope::default());
    }

    #[test]
    fn test_mail_command() {
        let mut session = greeted_session();
        let outcome = process_command("MAIL FROM:<sender@example.com>", &mut session);
        assert_eq!(outcome, CommandOutcome::Reply(SmtpResponse::sender_accepted()));
        assert_eq!(session.envelope.sender, "sender@example.com");
    }

    #[test]
    fn test_mail_without_brackets_gives_empty_sender() {
        let mut session = greeted_session();
        session.set_sender("old@example.com".to_string());

        let outcome = process_command("MAIL FROM: sender@example.com", &mut session);
        assert_eq!(outcome, CommandOutcome::Reply(SmtpResponse::sender_accepted()));
        assert_eq!(session.envelope.sender, "");
        assert_eq!(session.state, SmtpState::CommandLoop);
    }

    #[test]
    fn test_rcpt_commands_accumulate() {
        let mut session = greeted_session();
        for line in [
            "RCPT TO:<one@example.com>",
            "RCPT TO:<two@example.com>",
            "RCPT TO:<one@example.com>",
            "RCPT TO:nobody",
        ] {
            let outcome = process_command(line, &mut session);
            assert_eq!(outcome, CommandOutcome::Reply(SmtpResponse::recipient_accepted()));
        }
        assert_eq!(
            session.envelope.recipients,
            vec!["one@example.com", "two@example.com", "one@example.com", ""]
        );
    }

    #[test]
    fn test_data_command() {
        let mut session = greeted_session();
        let outcome = process_command("DATA", &mut session);
        assert_eq!(outcome, CommandOutcome::StartData);
        assert_eq!(session.state, SmtpState::DataTransfer);
    }

    #[test]
    fn test_quit_command() {
        let mut session = greeted_session();
        assert_eq!(process_command("QUIT", &mut session), CommandOutcome::Quit);
    }

    #[test]
    fn test_unrecognized_command_leaves_state_unchanged() {
        let mut session = greeted_session();
        process_command("MAIL FROM:<a@x.com>", &mut session);
        process_command("RCPT TO:<b@y.com>", &mut session);
        let before = session.envelope.clone();

        for line in ["NOOP", "RSET", "VRFY b", "", "quit"] {
            assert_eq!(process_command(line, &mut session), CommandOutcome::Ignored);
        }

        assert_eq!(session.envelope, before);
        assert_eq!(session.state, SmtpState::CommandLoop);
        assert_eq!(session.transfers, 0);
    }
}
