//! Formatting utilities (Telegram HTML escaping, message splitting).

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Split plain text into chunks of at most `limit` UTF-16 code units,
/// the unit Telegram counts message length in.
///
/// Prefers breaking after the last newline inside the window, then after the
/// last space, and only cuts mid-word when neither exists.
pub fn split_text_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if utf16_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let window_end = utf16_window_end(rest, limit);
        if window_end >= rest.len() {
            out.push(rest.to_string());
            break;
        }

        let window = &rest[..window_end];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(window_end);

        out.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    out
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte offset where the first `limit` UTF-16 units of `s` end, or `s.len()`
/// if it fits. Always covers at least one char.
fn utf16_window_end(s: &str, limit: usize) -> usize {
    let mut units = 0;
    for (i, c) in s.char_indices() {
        units += c.len_utf16();
        if units > limit {
            return if i == 0 { c.len_utf8() } else { i };
        }
    }
    s.len()
}
