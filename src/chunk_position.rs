//! Text encodings of chunk grid positions (`[i,j,k]`) and chunk dimension sizes (`i j k`).

use std::fmt::Write;

/// Parse a `chunkPositionInArray` value such as `[0,4,2]`.
///
/// Returns `None` if the text is not a bracketed, comma-separated list of integers.
pub fn parse_position(text: &str) -> Option<Vec<u64>> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

pub fn format_position(position: &[u64]) -> String {
    let mut s = String::with_capacity(position.len() * 2 + 2);
    s.push('[');
    let mut is_first = true;
    for idx in position {
        if is_first {
            is_first = false;
        } else {
            s.push(',');
        }
        // writing to a String cannot fail
        let _ = write!(s, "{idx}");
    }
    s.push(']');
    s
}

/// Parse a `chunkDimensionSizes` text such as `1 10 10`.
pub fn parse_chunk_dimension_sizes(text: &str) -> Option<Vec<u64>> {
    text.split_whitespace().map(|s| s.parse::<u64>().ok()).collect()
}

pub fn format_chunk_dimension_sizes(shape: &[u64]) -> String {
    shape
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
