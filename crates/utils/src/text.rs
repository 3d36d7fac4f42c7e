//! Small string helpers shared by prompt construction and script handling.

/// Returns at most `max_chars` characters from the start of `text`.
///
/// Slices on a char boundary, so multi-byte text (accents, em-dashes in
/// screenplays) never panics.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
