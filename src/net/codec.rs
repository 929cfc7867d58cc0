//! Newline-delimited JSON framing over a byte stream
//!
//! The reader accumulates partial reads until a full `\n`-terminated line is
//! available, so a message split across TCP segments is reassembled instead
//! of being dropped. The writer emits one JSON message plus exactly one `\n`
//! per physical write; no framed message ever spans multiple writes.

use bytes::BytesMut;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 4096;

/// Buffered line reader over the receive half of a connection
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Next complete line, without its trailing newline.
    ///
    /// Returns `Ok(None)` on clean EOF; a trailing partial line at EOF is
    /// discarded, matching the one-message-per-line contract.
    pub async fn next_line(&mut self) -> std::io::Result<Option<BytesMut>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                return Ok(Some(line));
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
        }
    }
}

/// Serialize a message as JSON and send it as a single `\n`-terminated line
pub async fn write_line<W, T>(writer: &mut W, msg: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut frame = serde_json::to_vec(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reassembles_line_split_across_reads() {
        let stream = tokio_test::io::Builder::new()
            .read(b"{\"a\":[1.0,")
            .read(b"0.0,0.0]}\nrest")
            .read(b" of line\n")
            .build();

        let mut reader = LineReader::new(stream);
        assert_eq!(
            reader.next_line().await.unwrap().unwrap().as_ref(),
            b"{\"a\":[1.0,0.0,0.0]}"
        );
        assert_eq!(
            reader.next_line().await.unwrap().unwrap().as_ref(),
            b"rest of line"
        );
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn splits_multiple_lines_in_one_read() {
        let stream = tokio_test::io::Builder::new()
            .read(b"first\nsecond\nthird\n")
            .build();

        let mut reader = LineReader::new(stream);
        assert_eq!(reader.next_line().await.unwrap().unwrap().as_ref(), b"first");
        assert_eq!(reader.next_line().await.unwrap().unwrap().as_ref(), b"second");
        assert_eq!(reader.next_line().await.unwrap().unwrap().as_ref(), b"third");
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_line_at_eof_is_discarded() {
        let stream = tokio_test::io::Builder::new().read(b"no newline").build();

        let mut reader = LineReader::new(stream);
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_one_frame_per_message() {
        let mut out = Vec::new();
        write_line(&mut out, &serde_json::json!({"done": false})).await.unwrap();
        write_line(&mut out, &serde_json::json!({"ok": true})).await.unwrap();
        assert_eq!(out, b"{\"done\":false}\n{\"ok\":true}\n");
    }
}
