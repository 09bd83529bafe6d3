//! Delimiter-aware chunking of reply text
//!
//! Long replies are split into bounded segments before synthesis so each
//! network round trip stays short. A greedy window is taken from the front
//! of the text; when the window boundary lands mid-word the cut walks back
//! to the nearest preceding delimiter, falling back to a hard cut when the
//! window holds none. Delimiter runs between chunks are skipped.

/// Delimiters that mark a natural break point
const DELIMITERS: [char; 5] = [' ', '.', '?', '!', ','];

/// Whether a character is a chunk delimiter
#[must_use]
pub fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

/// Split `text` into speakable chunks of at most `max_chars` characters.
///
/// Leading and trailing whitespace is trimmed first. Chunks never exceed
/// `max_chars` (counted in characters, cut on char boundaries) and are never
/// empty. Concatenating the chunks with the skipped delimiter runs reinserted
/// reconstructs the trimmed input.
#[must_use]
pub fn chunk_reply(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let remaining = chars.len() - pos;
        if remaining <= max_chars {
            chunks.push(chars[pos..].iter().collect());
            break;
        }

        // The boundary is mid-word when both the last window char and the
        // char just past the window are non-delimiters.
        let window_end = pos + max_chars;
        let mut cut = window_end;
        if !is_delimiter(chars[window_end]) && !is_delimiter(chars[window_end - 1]) {
            if let Some(d) = (pos + 1..window_end).rev().find(|&i| is_delimiter(chars[i])) {
                cut = d;
            }
        }

        // A boundary cut can land just past spaces; trim them. A walked-back
        // cut sits on its delimiter, which the skip below consumes.
        while cut > pos + 1 && chars[cut - 1] == ' ' {
            cut -= 1;
        }

        chunks.push(chars[pos..cut].iter().collect());
        pos = cut;

        // Skip the delimiter run before the next chunk starts
        while pos < chars.len() && is_delimiter(chars[pos]) {
            pos += 1;
        }
    }

    chunks
}
