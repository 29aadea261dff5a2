//! Bounded line reading for assistant output

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Longest line kept in memory; the rest of an oversized line is discarded.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRead {
    /// End of input, nothing was read
    Eof,
    /// A whole line, newline stripped
    Complete,
    /// Longer than the cap; the buffer holds only the first `cap` bytes
    Truncated,
}

/// Read one `\n`-terminated line into `buf`, keeping at most `cap` bytes.
///
/// Bytes past the cap are consumed and dropped up to the next newline, so a
/// runaway line costs at most `cap` bytes of memory. A trailing `\r` is
/// stripped. `buf` is cleared first.
pub async fn read_capped_line<R>(reader: &mut R, buf: &mut Vec<u8>, cap: usize) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut read_any = false;
    let mut truncated = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        read_any = true;

        let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..i], i + 1, true),
            None => (available, available.len(), false),
        };
        let room = cap.saturating_sub(buf.len());
        if chunk.len() > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
        reader.consume(used);

        if done {
            break;
        }
    }

    if !read_any {
        return Ok(LineRead::Eof);
    }
    if truncated {
        return Ok(LineRead::Truncated);
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(LineRead::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn read_all(input: &[u8], cap: usize) -> Vec<(LineRead, String)> {
        // Tiny buffer so lines span several fill_buf calls
        let mut reader = BufReader::with_capacity(4, input);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            let read = read_capped_line(&mut reader, &mut buf, cap).await.unwrap();
            if read == LineRead::Eof {
                break;
            }
            out.push((read, String::from_utf8_lossy(&buf).into_owned()));
        }
        out
    }

    #[tokio::test]
    async fn test_lines_and_crlf() {
        let lines = read_all(b"first\r\nsecond\nlast", 64).await;
        assert_eq!(
            lines,
            vec![
                (LineRead::Complete, "first".to_string()),
                (LineRead::Complete, "second".to_string()),
                (LineRead::Complete, "last".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_line_is_not_eof() {
        let lines = read_all(b"\nafter\n", 64).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (LineRead::Complete, String::new()));
    }

    #[tokio::test]
    async fn test_oversized_line_is_truncated_and_skipped() {
        let lines = read_all(b"0123456789abcdef\nnext\n", 8).await;
        assert_eq!(
            lines,
            vec![
                (LineRead::Truncated, "01234567".to_string()),
                (LineRead::Complete, "next".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_kept_as_bytes() {
        let mut reader = BufReader::new(&b"\xff\xfe warn\nok\n"[..]);
        let mut buf = Vec::new();
        assert_eq!(
            read_capped_line(&mut reader, &mut buf, 64).await.unwrap(),
            LineRead::Complete
        );
        assert_eq!(buf, b"\xff\xfe warn");
        read_capped_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(buf, b"ok");
    }
}
