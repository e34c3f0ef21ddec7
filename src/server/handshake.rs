// Icecast source handshake
//
// The producer opens with an HTTP-like request:
//
//   SOURCE /mount HTTP/1.0\r\n
//   Authorization: Basic ...\r\n
//   Content-Type: audio/ogg\r\n
//   ice-name: ...\r\n
//   \r\n
//
// Only the SOURCE method is checked; credentials are not. The reply is a bare
// status line, after which the producer streams Ogg pages. Producers that use
// bare LF line endings, or that send only part of the head and then wait for
// the reply, are accepted too.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

pub const SOURCE_METHOD: &[u8; 6] = b"SOURCE";
pub const OK_RESPONSE: &[u8] = b"HTTP/1.0 200 OK\r\n\r\n";

/// End of the request head: the first `\r\n\r\n` or `\n\n`, with its length
fn head_end(buffer: &[u8]) -> Option<(usize, usize)> {
    (0..buffer.len()).find_map(|i| {
        let rest = &buffer[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

/// Parsed SOURCE request head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub mount: String,
    pub protocol: String,
    /// Header names are lowercased
    pub headers: Vec<(String, String)>,
}

/// Outcome of scanning the bytes received so far
#[derive(Debug, PartialEq, Eq)]
pub enum Scan {
    NeedMore,
    Complete { request: SourceRequest, consumed: usize },
}

impl SourceRequest {
    /// Parse the request head, without the terminating blank line
    pub fn parse(head: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(head);
        let mut lines = text.lines();

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        if parts.next() != Some("SOURCE") {
            return Err(Error::handshake(format!("unexpected request line {:?}", request_line)));
        }
        let mount = parts.next().unwrap_or("/").to_string();
        let protocol = parts.next().unwrap_or("HTTP/1.0").to_string();

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
            .collect();

        Ok(SourceRequest {
            mount,
            protocol,
            headers,
        })
    }

    /// First header value with the given name, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Check the bytes buffered so far against the SOURCE request format.
///
/// Fails as soon as the leading bytes cannot be a SOURCE request.
pub fn scan(buffer: &[u8], max_len: usize) -> Result<Scan> {
    let prefix = buffer.len().min(SOURCE_METHOD.len());
    if buffer[..prefix] != SOURCE_METHOD[..prefix] {
        return Err(Error::handshake("expected SOURCE request as part of Icecast protocol"));
    }

    if let Some((end, terminator)) = head_end(buffer) {
        let request = SourceRequest::parse(&buffer[..end])?;
        return Ok(Scan::Complete {
            request,
            consumed: end + terminator,
        });
    }

    if buffer.len() > max_len {
        return Err(Error::handshake(format!("SOURCE request exceeds {} bytes", max_len)));
    }
    Ok(Scan::NeedMore)
}

/// Read the SOURCE request and answer it.
///
/// Returns the request and any stream bytes that arrived after its head.
/// Once the bytes start with `SOURCE`, a producer that goes quiet for `idle`
/// before finishing the head is answered anyway, with what it sent taken as
/// the whole request.
pub async fn accept_source<S>(stream: &mut S, max_len: usize, idle: Duration) -> Result<(SourceRequest, Vec<u8>)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Scan::Complete { request, consumed } = scan(&buffer, max_len)? {
            reply_ok(stream).await?;
            return Ok((request, buffer.split_off(consumed)));
        }

        let n = if buffer.starts_with(SOURCE_METHOD) {
            let read = timeout(idle, stream.read(&mut chunk)).await;
            match read {
                Ok(read) => read?,
                Err(_) => {
                    debug!(len = buffer.len(), "SOURCE request head left open, answering anyway");
                    let request = SourceRequest::parse(&buffer)?;
                    reply_ok(stream).await?;
                    return Ok((request, Vec::new()));
                }
            }
        } else {
            stream.read(&mut chunk).await?
        };
        if n == 0 {
            return Err(Error::handshake("connection closed during SOURCE request"));
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

async fn reply_ok<S>(stream: &mut S) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(OK_RESPONSE).await?;
    stream.flush().await?;
    Ok(())
}
