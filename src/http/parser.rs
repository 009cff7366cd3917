use std::collections::HashMap;
use std::io;

use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::time::Instant;

use crate::http::reader::{LineError, LineErrorKind, MAX_LINE_LENGTH, read_line};
use crate::http::request::{METHOD_GET, PROTOCOL_HTTP11, Request, canonical_header_name};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    InvalidRequestLine(String),
    #[error("unsupported method: {0:?}")]
    InvalidMethod(String),
    #[error("request target must start with '/': {0:?}")]
    InvalidUrl(String),
    #[error("unsupported protocol version: {0:?}")]
    InvalidVersion(String),
    #[error("malformed header line: {0:?}")]
    InvalidHeader(String),
    #[error("missing Host header")]
    MissingHost,
    #[error("line is not valid UTF-8")]
    NotUtf8,
    #[error("line exceeds {} bytes", MAX_LINE_LENGTH)]
    LineTooLong,
    #[error("connection closed mid-request (bytes received: {bytes_received})")]
    Closed { bytes_received: bool },
    #[error("read deadline exceeded (bytes received: {bytes_received})")]
    TimedOut { bytes_received: bool },
    #[error("i/o error while reading request: {source}")]
    Io {
        source: io::Error,
        bytes_received: bool,
    },
}

impl ParseError {
    /// Whether any byte of this request arrived before the failure.
    pub fn bytes_received(&self) -> bool {
        match self {
            ParseError::Closed { bytes_received }
            | ParseError::TimedOut { bytes_received }
            | ParseError::Io { bytes_received, .. } => *bytes_received,
            _ => true,
        }
    }

    /// Whether the peer sent something that violates the request grammar, as
    /// opposed to the stream failing underneath the parser.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            ParseError::Closed { .. } | ParseError::TimedOut { .. } | ParseError::Io { .. }
        )
    }
}

/// Reads one request: the request line, then header lines up to a blank line.
///
/// All reads share `deadline`. Nothing past the blank line is consumed, so
/// pipelined requests stay buffered in `reader` for the next call.
pub async fn read_request<R>(reader: &mut R, deadline: Instant) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let line = next_line(reader, deadline, false).await?;
    let (method, url, version) = parse_request_line(&line)?;

    let mut host = None;
    let mut close = false;
    let mut headers = HashMap::new();

    loop {
        let line = next_line(reader, deadline, true).await?;
        if line.is_empty() {
            break;
        }

        let (name, value) = parse_header_line(&line)?;
        match name.as_str() {
            "Host" => host = Some(value),
            "Connection" => close |= value == "close",
            _ => {
                headers.insert(name, value);
            }
        }
    }

    let host = host.ok_or(ParseError::MissingHost)?;

    Ok(Request {
        method,
        url,
        version,
        host,
        headers,
        close,
    })
}

async fn next_line<R>(reader: &mut R, deadline: Instant, started: bool) -> Result<String, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let bytes = read_line(reader, deadline).await.map_err(|LineError { kind, partial }| {
        let bytes_received = started || !partial.is_empty();
        match kind {
            LineErrorKind::Eof => ParseError::Closed { bytes_received },
            LineErrorKind::TimedOut => ParseError::TimedOut { bytes_received },
            LineErrorKind::TooLong => ParseError::LineTooLong,
            LineErrorKind::Io(source) => ParseError::Io {
                source,
                bytes_received,
            },
        }
    })?;

    String::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)
}

fn parse_request_line(line: &str) -> Result<(String, String, String), ParseError> {
    let mut parts = line.splitn(3, ' ');
    let (Some(method), Some(url), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::InvalidRequestLine(line.to_string()));
    };

    if method != METHOD_GET {
        return Err(ParseError::InvalidMethod(method.to_string()));
    }
    if !url.starts_with('/') {
        return Err(ParseError::InvalidUrl(url.to_string()));
    }
    if version != PROTOCOL_HTTP11 {
        return Err(ParseError::InvalidVersion(version.to_string()));
    }

    Ok((method.to_string(), url.to_string(), version.to_string()))
}

fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (key, value) = line
        .split_once(": ")
        .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

    Ok((canonical_header_name(key.trim()), value.trim().to_string()))
}
