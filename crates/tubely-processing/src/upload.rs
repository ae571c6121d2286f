//! Inbound upload bodies.

use tokio::io::{AsyncRead, AsyncReadExt};

/// A single-pass byte source plus whatever media type the client declared.
///
/// The reader is not seekable; consumers that need to look ahead must keep
/// the bytes they read and re-emit them.
pub struct UploadStream<R> {
    pub reader: R,
    pub declared_type: Option<String>,
}

impl<R> UploadStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, declared_type: Option<String>) -> Self {
        Self {
            reader,
            declared_type,
        }
    }

    /// Read up to `len` bytes, stopping early only at end of stream.
    pub async fn read_prefix(&mut self, len: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}
