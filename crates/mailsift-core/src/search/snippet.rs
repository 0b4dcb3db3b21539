//! Context-window snippets around evidence matches

/// Default number of context characters on each side of a match
pub const DEFAULT_CONTEXT_CHARS: usize = 120;

const ELLIPSIS: char = '…';

/// Build a single-line context window around `[match_start, match_end)`.
///
/// The window spans up to `context_chars` bytes on each side, clamped to char
/// boundaries. Newlines collapse to spaces so the snippet displays on one
/// line. An ellipsis marks each side that was cut. Pure function, no I/O.
pub fn build_snippet(
    text: &str,
    match_start: usize,
    match_end: usize,
    context_chars: usize,
) -> String {
    let mut left = match_start.saturating_sub(context_chars);
    while left > 0 && !text.is_char_boundary(left) {
        left -= 1;
    }

    let mut right = match_end.saturating_add(context_chars).min(text.len());
    while right < text.len() && !text.is_char_boundary(right) {
        right += 1;
    }

    // CRLF collapses to one space, lone \r or \n to one each
    let window: String = text[left..right]
        .replace("\r\n", "\n")
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let mut snippet = String::with_capacity(window.len() + 8);
    if left > 0 {
        snippet.push(ELLIPSIS);
    }
    snippet.push_str(&window);
    if right < text.len() {
        snippet.push(ELLIPSIS);
    }
    snippet
}
