/// Telegram's per-message limit, counted in UTF-16 code units the way the
/// Bot API counts entity offsets.
pub const TELEGRAM_MAX_LEN: usize = 4096;

/// Natural break points, best first. Each chunk ends at the last occurrence
/// of the best break found inside the allowed window.
const BREAKS: [&str; 5] = ["\n\n", ". ", "! ", "? ", "\n"];

/// Split a reply into messages Telegram will accept.
///
/// Cuts at a paragraph break if the window has one, then at a sentence end,
/// then at a line break, and only as a last resort between two characters.
/// Trailing whitespace at a cut and leading newlines of the next chunk are
/// dropped.
pub fn chunk_message(text: &str) -> Vec<&str> {
    chunk_with_limit(text, TELEGRAM_MAX_LEN)
}

fn chunk_with_limit(text: &str, max_units: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let end = window_end(rest, max_units);
        if end == rest.len() {
            chunks.push(rest);
            break;
        }
        let cut = natural_cut(&rest[..end]).unwrap_or(end);
        let head = rest[..cut].trim_end();
        if !head.is_empty() {
            chunks.push(head);
        }
        rest = rest[cut..].trim_start_matches('\n');
    }

    chunks
}

/// Byte offset where `max_units` UTF-16 units run out. Always covers at
/// least the first character so the caller makes progress.
fn window_end(s: &str, max_units: usize) -> usize {
    let mut units = 0;
    for (offset, c) in s.char_indices() {
        units += c.len_utf16();
        if units > max_units {
            return if offset == 0 { c.len_utf8() } else { offset };
        }
    }
    s.len()
}

fn natural_cut(window: &str) -> Option<usize> {
    BREAKS.iter().find_map(|brk| {
        window
            .rfind(brk)
            .filter(|&pos| pos > 0)
            .map(|pos| pos + brk.len())
    })
}
