//! Decoding of the header and body block sent after `DATA`

use crate::smtp::error::SmtpError;
use crate::smtp::line::read_line;
use crate::smtp::message::ContentKind;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::AsyncBufRead;

const SUBJECT_HEADER: &str = "Subject:";
const SUBJECT_VALUE_PREFIX: &str = "Subject: ";
const CONTENT_TYPE_HEADER: &str = "Content-Type:";
const BASE64_ENCODING_HEADER: &str = "Content-Transfer-Encoding: base64";

/// Result of one DATA transfer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBlock {
    pub kind: ContentKind,
    pub subject: String,
    pub body: String,
}

/// Return everything after the first occurrence of `prefix` in `line`
pub fn extract_header_value<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.find(prefix).map(|start| &line[start + prefix.len()..])
}

/// Header fields picked up before the blank separator line.
///
/// Only the subject, the content type and a base64 transfer encoding are
/// recognized; every other header is dropped.
#[derive(Debug, Default)]
struct HeaderScan {
    kind: ContentKind,
    subject: String,
    base64: bool,
}

impl HeaderScan {
    /// Apply one header line. Returns false once the blank line is reached.
    fn apply(&mut self, line: &str) -> bool {
        if line.starts_with(SUBJECT_HEADER) {
            if let Some(subject) = extract_header_value(line, SUBJECT_VALUE_PREFIX) {
                self.subject = subject.to_string();
            }
        } else if line.starts_with(CONTENT_TYPE_HEADER) {
            if line.contains("html") {
                self.kind = ContentKind::Html;
            }
        } else if line == BASE64_ENCODING_HEADER {
            self.base64 = true;
        } else if line.is_empty() {
            return false;
        }
        true
    }
}

/// Concatenates body lines until the lone-dot terminator
#[derive(Debug, Default)]
struct BodyAccumulator {
    body: String,
}

impl BodyAccumulator {
    /// Append one body line. Returns false on the terminator.
    fn push(&mut self, line: &str) -> bool {
        match line {
            "." => false,
            ".." => {
                self.body.push('.');
                true
            }
            _ => {
                self.body.push_str(line);
                true
            }
        }
    }

    fn finish(self, base64: bool) -> Result<String, SmtpError> {
        if !base64 {
            return Ok(self.body);
        }

        let decoded = BASE64.decode(self.body.as_bytes())?;
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}

/// Read a header block and a dot-terminated body from `reader`.
///
/// Lines are consumed in place, so the command loop resumes right after the
/// terminator.
pub async fn read_data_block<R>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<DataBlock, SmtpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HeaderScan::default();
    loop {
        let line = read_line(reader, buffer).await?;
        if !headers.apply(&line) {
            break;
        }
    }

    let mut body = BodyAccumulator::default();
    loop {
        let line = read_line(reader, buffer).await?;
        if !body.push(&line) {
            break;
        }
    }

    Ok(DataBlock {
        kind: headers.kind,
        subject: headers.subject,
        body: body.finish(headers.base64)?,
    })
}
