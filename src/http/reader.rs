//! CRLF-terminated line reading bounded by a read deadline.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

/// Longest line accepted, CRLF included.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Why a line could not be completed.
#[derive(Debug, Error)]
pub enum LineErrorKind {
    #[error("end of stream")]
    Eof,
    #[error("read deadline exceeded")]
    TimedOut,
    #[error("line exceeds {} bytes", MAX_LINE_LENGTH)]
    TooLong,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// A failed line read, with whatever bytes arrived before the failure.
#[derive(Debug, Error)]
#[error("{kind} after {} bytes", .partial.len())]
pub struct LineError {
    #[source]
    pub kind: LineErrorKind,
    pub partial: Vec<u8>,
}

/// Reads the next `\r\n`-terminated line and returns it without the terminator.
///
/// A lone `\n` does not end a line; reading continues until the accumulated
/// bytes end in `\r\n`. Every read is bounded by `deadline`, which callers
/// share across all the lines of one request.
pub async fn read_line<R>(reader: &mut R, deadline: Instant) -> Result<Vec<u8>, LineError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let remaining = MAX_LINE_LENGTH.saturating_sub(line.len());
        if remaining == 0 {
            return Err(LineError {
                kind: LineErrorKind::TooLong,
                partial: line,
            });
        }

        let read = timeout_at(
            deadline,
            (&mut *reader).take(remaining as u64).read_until(b'\n', &mut line),
        )
        .await;

        let kind = match read {
            Ok(Ok(0)) => LineErrorKind::Eof,
            Ok(Ok(_)) => {
                if line.ends_with(b"\r\n") {
                    line.truncate(line.len() - 2);
                    return Ok(line);
                }
                continue;
            }
            Ok(Err(e)) => LineErrorKind::Io(e),
            Err(_) => LineErrorKind::TimedOut,
        };

        return Err(LineError {
            kind,
            partial: line,
        });
    }
}
