//! Chunk slicing for streamed transfers
//!
//! Payloads larger than one packet are moved as fixed-size chunks. The
//! final chunk is padded up to the full chunk length with a filler
//! element so every wire packet has the same layout.

/// Slice one chunk out of a payload, padding with `filler` past the end
pub fn chunk_data<E: Copy>(source: &[E], offset: usize, chunk_len: usize, filler: E) -> Vec<E> {
    let mut chunk = Vec::with_capacity(chunk_len);
    if offset < source.len() {
        let end = usize::min(offset + chunk_len, source.len());
        chunk.extend_from_slice(&source[offset..end]);
    }
    chunk.resize(chunk_len, filler);
    chunk
}

/// Number of chunks needed to move `total` elements
pub fn chunk_count(total: usize, chunk_len: usize) -> usize {
    if chunk_len == 0 {
        return 0;
    }
    (total + chunk_len - 1) / chunk_len
}
