//! Overlapping character-window splitter.
//!
//! The splitter walks the input as a character sequence and emits windows of at most
//! `chunk_size` characters, each new window starting `overlap` characters before the
//! previous window's end. The boundary rule is deliberately simple and fully pinned:
//!
//! - A window ends right after the last whitespace character inside it, provided
//!   that boundary lies past the overlap region (so the next window still advances).
//! - When no such whitespace exists, the window ends at the hard character limit,
//!   mid-word if necessary.
//! - Boundaries are counted in characters, never bytes, so multi-byte UTF-8 text is
//!   never split inside a code point.
//!
//! Two properties always hold and are relied on downstream: adjacent chunks share
//! exactly `overlap` characters at the seam, and concatenating the first chunk with
//! every subsequent chunk minus its leading overlap reconstructs the input exactly.

use super::types::ChunkingError;

/// Split text into overlapping character windows.
///
/// Returns an empty vector when the input is all whitespace. `overlap` must be
/// strictly smaller than `chunk_size`.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            soft_boundary(&chars, start, hard_end, overlap).unwrap_or(hard_end)
        };
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    Ok(chunks)
}

/// Find the rightmost whitespace boundary inside the window, if one exists past
/// the overlap region.
fn soft_boundary(chars: &[char], start: usize, hard_end: usize, overlap: usize) -> Option<usize> {
    let min_end = start + overlap + 1;
    (min_end..=hard_end)
        .rev()
        .find(|&end| chars[end - 1].is_whitespace())
}

/// Derive the character offset range of each chunk within the original text.
///
/// Valid because every window after the first starts exactly `overlap` characters
/// before its predecessor's end.
pub fn chunk_offsets(chunks: &[String], overlap: usize) -> Vec<(usize, usize)> {
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut start = 0usize;
    for (position, chunk) in chunks.iter().enumerate() {
        let len = chunk.chars().count();
        offsets.push((start, start + len));
        if position + 1 < chunks.len() {
            start = start + len - overlap;
        }
    }
    offsets
}
