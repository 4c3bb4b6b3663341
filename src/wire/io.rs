// ABOUTME: Byte-level read/write helpers shared by the server worker and the client driver
// ABOUTME: Distinguishes a clean peer close from a short read, which the codec needs to tell BadPrefix/Closed apart from InvalidMessage

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Outcome of reading a fixed-size prefix at the start of a new request.
/// Unlike every other field in a frame, a short read here is not
/// automatically an error: zero bytes followed by EOF means the peer is
/// done with the connection.
pub enum PrefixRead<const N: usize> {
    /// Got all `N` bytes.
    Full([u8; N]),
    /// Got between 1 and `N - 1` bytes before EOF.
    Partial,
    /// Got zero bytes before EOF; the peer closed cleanly between requests.
    Closed,
}

/// Reads exactly `N` bytes unless the stream is at EOF from the very first
/// byte, in which case it reports a clean close instead of an error.
pub async fn read_prefix<R, const N: usize>(stream: &mut R) -> std::io::Result<PrefixRead<N>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; N];
    let mut filled = 0;
    while filled < N {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(if filled == 0 { PrefixRead::Closed } else { PrefixRead::Partial });
        }
        filled += n;
    }
    Ok(PrefixRead::Full(buf))
}

/// Reads exactly `buf.len()` bytes. Any short read (including zero bytes)
/// is reported as [`std::io::ErrorKind::UnexpectedEof`] — by this point in
/// a frame, a close is always a truncation, never a clean end.
pub async fn read_exact_truncating<R>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    stream.read_exact(buf).await?;
    Ok(())
}

/// Writes the whole buffer and flushes. A failure here (including a
/// partial write the OS reports as broken pipe) is the `PeerClosed`
/// condition from the wire codec's error table. Rust's runtime ignores
/// `SIGPIPE` by default, so a write to a closed socket surfaces as an
/// `io::Error` here rather than terminating the process.
pub async fn write_all_flushed<W>(stream: &mut W, buf: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(buf).await?;
    stream.flush().await
}
