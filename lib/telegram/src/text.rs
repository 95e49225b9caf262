//! Outgoing text helpers.

/// Longest text the Bot API accepts in one message.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Cuts prefer the last newline in a chunk, then the last space, and fall
/// back to a hard cut. Empty input yields no chunks.
#[must_use]
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(index, _)| index);
        let window = &rest[..hard_end];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&index| index > 0)
            .unwrap_or(hard_end);

        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches(['\n', ' ']);
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
