//! Input normalization and candidate text recovery
//!
//! Plaintext and search phrase arrive as newline-delimited files: every
//! line is trimmed, blank lines are dropped, and the remaining lines are
//! joined with a single space. The search core only ever sees the flat
//! normalized strings.

use std::fs;
use std::path::Path;

use crate::cipher::BLOCK_SIZE;
use crate::error::Result;

/// Normalize raw text: trim lines, drop blanks, join with single spaces.
pub fn normalize(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read a file and normalize its contents.
pub fn load_normalized(path: &Path) -> Result<String> {
    Ok(normalize(&fs::read_to_string(path)?))
}

/// Zero-pad text up to the next multiple of the cipher block size.
///
/// The caller guarantees non-empty input (setup rejects empty plaintext).
pub fn pad_blocks(text: &str) -> Vec<u8> {
    let padded = (text.len() + BLOCK_SIZE - 1) / BLOCK_SIZE * BLOCK_SIZE;
    let mut buf = vec![0u8; padded];
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf
}

/// Bytes of a decrypted candidate up to the first NUL.
///
/// Decrypted buffers carry the zero padding of the original plaintext, so
/// candidate text ends at the first zero byte. A candidate that starts
/// with a zero byte is empty and never matches anything.
#[inline]
pub fn candidate_text(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

/// Recover a printable string from a decrypted buffer.
pub fn recovered_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(candidate_text(buf)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_joins_lines_with_single_spaces() {
        assert_eq!(normalize("the quick\nbrown fox\n"), "the quick brown fox");
        assert_eq!(normalize("  padded  \n\n\n  lines \n"), "padded lines");
        assert_eq!(normalize("\n\n"), "");
        assert_eq!(normalize("single"), "single");
    }

    #[test]
    fn pad_blocks_rounds_up_to_block_size() {
        assert_eq!(pad_blocks("a").len(), 8);
        assert_eq!(pad_blocks("12345678").len(), 8);
        assert_eq!(pad_blocks("123456789").len(), 16);

        let buf = pad_blocks("abc");
        assert_eq!(&buf[..3], b"abc");
        assert!(buf[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn candidate_text_stops_at_first_nul() {
        assert_eq!(candidate_text(b"hello\0\0\0"), b"hello");
        assert_eq!(candidate_text(b"\0garbage"), b"");
        assert_eq!(candidate_text(b"no nul here"), b"no nul here");
    }

    #[test]
    fn recovered_string_is_lossy_on_garbage() {
        let buf = [0x74, 0x68, 0x65, 0xFF, 0x00, 0x00];
        let s = recovered_string(&buf);
        assert!(s.starts_with("the"));
    }
}
