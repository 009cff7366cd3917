use std::io;
use std::path::PathBuf;

use bytes::{BufMut, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Renders the status line, the sorted header block and the blank line that
/// ends it.
pub fn serialize_head(resp: &Response) -> BytesMut {
    let mut buf = BytesMut::with_capacity(256);

    // Status line
    buf.put_slice(resp.version.as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(resp.status.as_u16().to_string().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(resp.status.reason_phrase().as_bytes());
    buf.put_slice(b"\r\n");

    // BTreeMap iterates in ascending key order
    for (k, v) in &resp.headers {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    // Header/body separator
    buf.put_slice(b"\r\n");

    buf
}

pub struct ResponseWriter {
    head: BytesMut,
    body: Option<PathBuf>,
    body_len: u64,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            head: serialize_head(response),
            body: response.file_path.clone(),
            body_len: response
                .header("Content-Length")
                .and_then(|len| len.parse().ok())
                .unwrap_or(u64::MAX),
        }
    }

    /// Writes the head, then streams the body file if there is one.
    ///
    /// The body never runs past the advertised `Content-Length`, even if the
    /// file grew after it was resolved.
    ///
    /// Returns the number of bytes written. The first failure is returned as
    /// is; whatever was already written stays written.
    pub async fn write_to<W>(&mut self, stream: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = self.head.len() as u64;
        stream.write_all_buf(&mut self.head).await?;

        if let Some(path) = &self.body {
            let mut body = File::open(path).await?.take(self.body_len);
            written += tokio::io::copy(&mut body, stream).await?;
        }

        stream.flush().await?;
        Ok(written)
    }
}
