//! Position conversion between the engine and the protocol.
//!
//! The engine counts columns in chars; LSP positions count UTF-16 code
//! units.

/// Calculate UTF-16 code units for a character.
///
/// # Examples
///
/// ```
/// use stepscope_server::util::utf16_code_units;
///
/// assert_eq!(utf16_code_units('a'), 1);
/// assert_eq!(utf16_code_units('é'), 1);
/// assert_eq!(utf16_code_units('😀'), 2);
/// ```
#[inline]
#[must_use]
pub fn utf16_code_units(ch: char) -> u32 {
    if u32::from(ch) <= 0xFFFF { 1 } else { 2 }
}

/// Convert a char column of `line` into a UTF-16 column.
///
/// Columns past the end of the line clamp to the line's UTF-16 length.
///
/// # Examples
///
/// ```
/// use stepscope_server::util::char_col_to_utf16_col;
///
/// assert_eq!(char_col_to_utf16_col("a😀b", 2), 3);
/// ```
#[must_use]
pub fn char_col_to_utf16_col(line: &str, char_col: usize) -> u32 {
    line.chars().take(char_col).map(utf16_code_units).sum()
}

/// Convert a UTF-16 column of `line` into a char column.
///
/// A column inside a surrogate pair resolves to the char after it.
#[must_use]
pub fn utf16_col_to_char_col(line: &str, utf16_col: u32) -> usize {
    let mut units = 0u32;
    let mut chars = 0usize;
    for ch in line.chars() {
        if units >= utf16_col {
            break;
        }
        units = units.saturating_add(utf16_code_units(ch));
        chars = chars.saturating_add(1);
    }
    chars
}

/// The zero-based `line` of `text`, if present.
#[must_use]
pub fn line_at(text: &str, line: u32) -> Option<&str> {
    text.lines().nth(usize::try_from(line).ok()?)
}

/// Saturating conversion for protocol line and column numbers.
#[must_use]
pub fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('a', 1)]
    #[case('é', 1)]
    #[case('日', 1)]
    #[case('\u{FFFF}', 1)]
    #[case('\u{10000}', 2)]
    #[case('🦀', 2)]
    fn counts_code_units(#[case] ch: char, #[case] expected: u32) {
        assert_eq!(utf16_code_units(ch), expected);
    }

    #[rstest]
    #[case("Given a step", 6, 6)]
    #[case("Given café x", 11, 11)]
    #[case("Given 😀 x", 7, 8)]
    #[case("short", 100, 5)]
    #[case("", 3, 0)]
    fn converts_char_columns(#[case] line: &str, #[case] chars: usize, #[case] expected: u32) {
        assert_eq!(char_col_to_utf16_col(line, chars), expected);
    }

    #[rstest]
    #[case("Given a step", 6, 6)]
    #[case("Given 😀 x", 8, 7)]
    #[case("Given 😀 x", 7, 7)]
    #[case("short", 100, 5)]
    fn converts_utf16_columns(#[case] line: &str, #[case] units: u32, #[case] expected: usize) {
        assert_eq!(utf16_col_to_char_col(line, units), expected);
    }

    #[test]
    fn finds_lines() {
        let text = "one\ntwo\r\nthree";
        assert_eq!(line_at(text, 1), Some("two"));
        assert_eq!(line_at(text, 2), Some("three"));
        assert_eq!(line_at(text, 3), None);
    }
}
