/// Handles start with a letter, end with a letter or digit and may contain
/// letters, digits, `_`, `-` and `.` in between. Empty means "no handle".
pub fn is_valid(h: &str) -> bool {
    if h.is_empty() {
        return true;
    }
    let bytes = h.as_bytes();
    if bytes.len() < 2 {
        return false;
    }
    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    first.is_ascii_alphabetic()
        && last.is_ascii_alphanumeric()
        && bytes[1..bytes.len() - 1]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}
