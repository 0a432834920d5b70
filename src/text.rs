//! Small string helpers shared by the adapters, extractor and report builder.

/// Collapse every run of whitespace (including newlines) into a single space.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max_chars` characters, preferring the last word boundary.
pub(crate) fn clip_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => clip_at_word(s, end).to_string(),
    }
}

/// Truncate `s` so that the result, including `suffix`, is at most `max_bytes` long.
///
/// Cuts at the last whitespace before the limit when that does not discard
/// more than half of the allowed text; otherwise cuts on a char boundary.
pub(crate) fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    if suffix.len() >= max_bytes {
        let end = s.floor_char_boundary(max_bytes);
        return s[..end].to_string();
    }
    let room = s.floor_char_boundary(max_bytes - suffix.len());
    let mut out = clip_at_word(s, room).trim_end().to_string();
    out.push_str(suffix);
    out
}

fn clip_at_word(s: &str, end: usize) -> &str {
    let head = &s[..end];
    match head.rfind(char::is_whitespace) {
        Some(pos) if pos > end / 2 => &head[..pos],
        _ => head,
    }
}
