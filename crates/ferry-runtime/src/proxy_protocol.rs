//! PROXY protocol (v1, text form) connection decorator.
//!
//! When enabled, every accepted connection is inspected for a
//! `PROXY TCP4|TCP6|UNKNOWN ...\r\n` preamble before HTTP parsing starts.
//! The preamble is consumed and its source address replaces the observed
//! peer. Connections that do not start with the signature are passed
//! through untouched.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

const SIGNATURE: &[u8] = b"PROXY ";
/// Longest legal v1 line, CRLF included.
const MAX_LINE_LEN: usize = 107;
/// How long a client may take to send its preamble.
pub const PREAMBLE_TIMEOUT: Duration = Duration::from_secs(5);
const PEEK_RETRY: Duration = Duration::from_millis(5);

/// Consume a PROXY preamble from `stream`, if present, and return the peer
/// address to report.
///
/// # Errors
///
/// Returns an error if the preamble is malformed or does not arrive within
/// [`PREAMBLE_TIMEOUT`]. The connection should then be dropped.
pub async fn accept(stream: &mut TcpStream, observed: SocketAddr) -> io::Result<SocketAddr> {
    let source = tokio::time::timeout(PREAMBLE_TIMEOUT, read_preamble(stream))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "PROXY preamble timed out"))??;
    Ok(source.unwrap_or(observed))
}

async fn read_preamble(stream: &mut TcpStream) -> io::Result<Option<SocketAddr>> {
    let mut probe = [0u8; SIGNATURE.len()];
    loop {
        let n = stream.peek(&mut probe).await?;
        if n == 0 || !SIGNATURE.starts_with(&probe[..n]) {
            return Ok(None);
        }
        if n == SIGNATURE.len() {
            break;
        }
        tokio::time::sleep(PEEK_RETRY).await;
    }

    let mut line = Vec::with_capacity(MAX_LINE_LEN);
    loop {
        let byte = stream.read_u8().await?;
        line.push(byte);
        if line.ends_with(b"\r\n") {
            break;
        }
        if line.len() >= MAX_LINE_LEN {
            return Err(invalid("PROXY preamble too long"));
        }
    }
    let line = std::str::from_utf8(&line[..line.len() - 2])
        .map_err(|_| invalid("PROXY preamble is not ASCII"))?;
    parse_line(line)
}

/// Parse a v1 line without its trailing CRLF.
///
/// `UNKNOWN` yields `None` (keep the observed peer).
pub fn parse_line(line: &str) -> io::Result<Option<SocketAddr>> {
    let mut fields = line.split(' ');
    if fields.next() != Some("PROXY") {
        return Err(invalid("missing PROXY signature"));
    }
    let family = fields.next().ok_or_else(|| invalid("missing protocol family"))?;
    if family == "UNKNOWN" {
        return Ok(None);
    }
    let (src, _dst, src_port, _dst_port) = match (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) {
        (Some(src), Some(dst), Some(sp), Some(dp), None) => (src, dst, sp, dp),
        _ => return Err(invalid("wrong number of PROXY fields")),
    };
    let ip: IpAddr = src
        .parse()
        .map_err(|_| invalid("invalid PROXY source address"))?;
    match (family, ip) {
        ("TCP4", IpAddr::V4(_)) | ("TCP6", IpAddr::V6(_)) => {}
        _ => return Err(invalid("PROXY family does not match address")),
    }
    let port: u16 = src_port
        .parse()
        .map_err(|_| invalid("invalid PROXY source port"))?;
    Ok(Some(SocketAddr::new(ip, port)))
}

fn invalid(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
