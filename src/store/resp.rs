//! RESP (REdis Serialization Protocol) wire codec.
//!
//! Encoding and decoding are pure/transport-agnostic: `encode_command`
//! produces bytes, `read_reply` consumes anything implementing
//! `AsyncBufRead`. The TCP connection itself lives in `super::client`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::StoreError;

/// A decoded RESP reply. Arrays are not decoded beyond shape detection —
/// the command set used here never requires interpreting array elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<String>),
    Array(i64),
}

/// Encodes a command as an inline RESP array of bulk strings:
/// `*<n>\r\n` followed by `n` `$<len>\r\n<bytes>\r\n` entries.
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 * args.len());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Reads and decodes one RESP reply from `reader`, dispatching on the first
/// byte.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, StoreError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    if line.is_empty() {
        return Err(StoreError::Protocol("empty reply line".to_string()));
    }
    let prefix = &line[..1];
    let body = &line[1..];

    match prefix {
        "+" => Ok(Reply::Simple(body.to_string())),
        "-" => Err(StoreError::Redis(body.to_string())),
        ":" => {
            let n: i64 = body
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad integer reply: {body}")))?;
            Ok(Reply::Integer(n))
        }
        "$" => {
            let len: i64 = body
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad bulk length: {body}")))?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            if len == 0 {
                read_exact_crlf(reader, 0).await?;
                return Ok(Reply::Bulk(Some(String::new())));
            }
            let bytes = read_exact_crlf(reader, len as usize).await?;
            let s = String::from_utf8(bytes)
                .map_err(|e| StoreError::Protocol(format!("non-utf8 bulk string: {e}")))?;
            Ok(Reply::Bulk(Some(s)))
        }
        "*" => {
            let n: i64 = body
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad array header: {body}")))?;
            Ok(Reply::Array(n))
        }
        other => Err(StoreError::Protocol(format!(
            "unknown reply prefix: {other:?}"
        ))),
    }
}

/// Reads one CRLF-terminated line (without the trailing CRLF).
async fn read_line<R>(reader: &mut R) -> Result<String, StoreError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed while reading reply",
        )));
    }
    while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|e| StoreError::Protocol(format!("non-utf8 reply line: {e}")))
}

/// Reads exactly `len` bytes, then the trailing CRLF.
async fn read_exact_crlf<R>(reader: &mut R, len: usize) -> Result<Vec<u8>, StoreError>
where
    R: AsyncBufRead + Unpin,
{
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).await?;
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
    Ok(bytes)
}
