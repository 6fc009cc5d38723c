//! Fixed-size overlapping chunking over whitespace-normalized text.

/// Characters per chunk.
pub const CHUNK_SIZE: usize = 900;
/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 150;

/// Slice a document into fixed-size windows. Whitespace runs collapse to a
/// single space first, so chunk boundaries are stable across formatting
/// differences. Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + CHUNK_SIZE).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    chunks
}
