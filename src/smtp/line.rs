//! Line framing shared by the command loop and the data decoder

use crate::smtp::error::SmtpError;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read the next line, without its `\r\n` or `\n` terminator.
///
/// Invalid UTF-8 is replaced rather than rejected. A stream that ends before
/// a terminator, with or without a trailing fragment, ends the session.
pub async fn read_line<R>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<String, SmtpError>
where
    R: AsyncBufRead + Unpin,
{
    buffer.clear();

    let read = reader.read_until(b'\n', buffer).await?;
    if read == 0 || buffer.last() != Some(&b'\n') {
        return Err(SmtpError::ConnectionClosed);
    }

    buffer.pop();
    if buffer.last() == Some(&b'\r') {
        buffer.pop();
    }

    Ok(String::from_utf8_lossy(buffer).into_owned())
}
