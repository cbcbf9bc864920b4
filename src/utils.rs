//! String handling for wire data
//!
//! Lines crossing the CLI boundary can be megabytes long and can contain
//! arbitrary UTF-8. These helpers produce bounded, boundary-safe previews of
//! that data for logs and error messages.

/// Clip a string to at most `max_bytes` bytes without splitting a UTF-8
/// character.
///
/// Keeps every whole character that fits inside the budget, so a multi-byte
/// character straddling the limit is dropped rather than cut in half.
///
/// # Example
/// ```
/// use claude_agent_sdk::utils::clip_utf8;
///
/// // The magnifier emoji is 4 bytes; a 10-byte budget cannot hold it
/// assert_eq!(clip_utf8("Status: 🔍 Active", 10), "Status: ");
/// assert_eq!(clip_utf8("Status: 🔍 Active", 12), "Status: 🔍");
/// ```
#[inline]
#[must_use]
pub fn clip_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = 0;
    for (idx, ch) in s.char_indices() {
        let next = idx + ch.len_utf8();
        if next > max_bytes {
            break;
        }
        end = next;
    }

    &s[..end]
}

/// Bounded preview of a wire line for logs and error messages.
///
/// Clips to `max_bytes` at a character boundary and marks the cut with an
/// ellipsis, so oversized or unparseable lines can be reported without
/// echoing the whole payload.
///
/// # Example
/// ```
/// use claude_agent_sdk::utils::line_preview;
///
/// let line = r#"{"type":"assistant","message":{"content":"..."}}"#;
/// assert_eq!(line_preview(line, 10), r#"{"type":"a..."#);
/// assert_eq!(line_preview("short", 100), "short");
/// ```
#[must_use]
pub fn line_preview(line: &str, max_bytes: usize) -> String {
    let clipped = clip_utf8(line, max_bytes);
    if clipped.len() == line.len() {
        clipped.to_string()
    } else {
        format!("{clipped}...")
    }
}
