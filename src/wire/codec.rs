// ABOUTME: Pure encode/decode logic for request and response frames
// ABOUTME: Decoding is necessarily interleaved with reading, since payload lengths are not known up front; see wire::io for the short-read/clean-close distinction this relies on

use super::io::{read_exact_truncating, read_prefix, write_all_flushed, PrefixRead};
use super::message::{RequestOp, Response, ResponseOp, MAGIC};
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use super::message::Request;

/// Every failure the wire codec can report for a single request, with the
/// exact peer-facing payload text from the error table where one applies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message")]
    InvalidMessage,
    #[error("invalid operation type")]
    InvalidOperation,
    #[error("image is 0 bytes")]
    ZeroImage,
    #[error("image too large")]
    ImageTooLarge,
    #[error("invalid image")]
    InvalidImage,
    #[error("no faces detected in image")]
    NoFacesDetected,
    #[error("peer closed the connection")]
    PeerClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// The exact operation-3 payload text for this error, if it is one
    /// that gets surfaced to the peer at all.
    pub fn payload(&self) -> Option<&'static str> {
        use ProtocolError::*;
        match self {
            InvalidMessage => Some("invalid message"),
            InvalidOperation => Some("invalid operation type"),
            ZeroImage => Some("image is 0 bytes"),
            ImageTooLarge => Some("image too large"),
            InvalidImage => Some("invalid image"),
            NoFacesDetected => Some("no faces detected in image"),
            PeerClosed | Io(_) => None,
        }
    }
}

/// Result of attempting to read one request off a connection.
pub enum ReadOutcome {
    Request(Request),
    /// The first four bytes didn't match the magic prefix.
    BadPrefix,
    /// The peer closed the connection cleanly between requests.
    Closed,
}

/// Reads one request frame. `max_image_bytes == 0` means no explicit cap
/// (the 32-bit length field is the only bound).
pub async fn read_request<R>(
    stream: &mut R,
    max_image_bytes: u32,
) -> Result<ReadOutcome, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match read_prefix::<_, 4>(stream).await? {
        PrefixRead::Closed => return Ok(ReadOutcome::Closed),
        PrefixRead::Partial => return Err(ProtocolError::InvalidMessage),
        PrefixRead::Full(bytes) => {
            if bytes != MAGIC {
                return Ok(ReadOutcome::BadPrefix);
            }
        }
    }

    let mut op_byte = [0u8; 1];
    read_exact_truncating(stream, &mut op_byte)
        .await
        .map_err(|_| ProtocolError::InvalidMessage)?;
    let op = RequestOp::try_from(op_byte[0]).map_err(|_| ProtocolError::InvalidOperation)?;

    let primary = read_length_prefixed_image(stream, max_image_bytes).await?;
    let secondary = match op {
        RequestOp::Replace => Some(read_length_prefixed_image(stream, max_image_bytes).await?),
        RequestOp::Detect => None,
    };

    Ok(ReadOutcome::Request(Request { op, primary, secondary }))
}

async fn read_length_prefixed_image<R>(
    stream: &mut R,
    max_image_bytes: u32,
) -> Result<Bytes, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    read_exact_truncating(stream, &mut len_buf)
        .await
        .map_err(|_| ProtocolError::InvalidMessage)?;
    let len = u32::from_le_bytes(len_buf);
    if len == 0 {
        return Err(ProtocolError::ZeroImage);
    }
    if max_image_bytes != 0 && len > max_image_bytes {
        return Err(ProtocolError::ImageTooLarge);
    }
    let mut buf = vec![0u8; len as usize];
    read_exact_truncating(stream, &mut buf)
        .await
        .map_err(|_| ProtocolError::InvalidMessage)?;
    Ok(Bytes::from(buf))
}

/// Encodes and writes a response frame: prefix, op byte, 4-byte LE length,
/// payload. A short write anywhere in here is the `PeerClosed` condition.
pub async fn write_response<W>(stream: &mut W, response: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let (op, payload): (ResponseOp, &[u8]) = match response {
        Response::Image(bytes) => (ResponseOp::Image, bytes.as_ref()),
        Response::Error(message) => (ResponseOp::Error, message.as_bytes()),
    };

    let mut header = Vec::with_capacity(9);
    header.extend_from_slice(&MAGIC);
    header.push(op as u8);
    header.extend_from_slice(&(payload.len() as u32).to_le_bytes());

    write_all_flushed(stream, &header)
        .await
        .map_err(|_| ProtocolError::PeerClosed)?;
    write_all_flushed(stream, payload)
        .await
        .map_err(|_| ProtocolError::PeerClosed)
}

/// Encodes and writes a request frame. Used by the client driver; the
/// server only ever reads requests (see [`read_request`]).
pub async fn write_request<W>(stream: &mut W, request: &Request) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(9 + request.primary.len());
    buf.extend_from_slice(&MAGIC);
    buf.push(request.op as u8);
    buf.extend_from_slice(&(request.primary.len() as u32).to_le_bytes());
    buf.extend_from_slice(&request.primary);
    if let Some(secondary) = &request.secondary {
        buf.extend_from_slice(&(secondary.len() as u32).to_le_bytes());
        buf.extend_from_slice(secondary);
    }
    write_all_flushed(stream, &buf).await
}

/// Writes the bad-prefix canned response verbatim: no framing, just the
/// configured file's bytes.
pub async fn write_raw<W>(stream: &mut W, contents: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_all_flushed(stream, contents)
        .await
        .map_err(|_| ProtocolError::PeerClosed)
}
