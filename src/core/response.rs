//! Outbound message splitting
//!
//! Assistant replies are relayed verbatim, so they can exceed what the chat
//! transport accepts in one message.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

/// Transport message content limit (bytes)
pub const MESSAGE_LIMIT: usize = 2000;

/// Split text into pieces of at most `max_size` bytes.
///
/// Each piece ends at the last line break that fits. A line longer than
/// `max_size` is cut at the largest character boundary that fits.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_size {
        let cut = fitting_prefix(rest, max_size);
        let (head, tail) = match rest[..cut].rfind('\n') {
            Some(newline) if newline > 0 => (&rest[..newline], &rest[newline + 1..]),
            _ => rest.split_at(cut),
        };

        let head = head.trim_end();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        rest = tail;
    }

    if !rest.trim_end().is_empty() || chunks.is_empty() {
        chunks.push(rest.trim_end().to_string());
    }
    chunks
}

/// Byte length of the longest prefix of `text` within `max_size` that ends on
/// a char boundary. Always at least one character.
fn fitting_prefix(text: &str, max_size: usize) -> usize {
    let mut cut = max_size.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        cut = text.chars().next().map_or(text.len(), char::len_utf8);
    }
    cut
}

/// Split text for one transport message each.
pub fn chunk_for_message(text: &str) -> Vec<String> {
    chunk_text(text, MESSAGE_LIMIT)
}
