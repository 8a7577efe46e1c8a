//! Prefix-tolerant matchers for lines that are still being typed.

/// Split normalised pattern source on spaces, keeping parenthesised spans
/// whole.
///
/// Depth is tracked across `(`/`)` so optional and alternation groups such as
/// `(big red|small)` stay one token even when they contain spaces. Escaped
/// characters (`\(`, `\ `) never affect depth or splitting. Consecutive
/// spaces yield empty tokens, mirroring the source spacing.
///
/// # Examples
/// ```
/// use stepscope_patterns::split_pattern_tokens;
///
/// assert_eq!(
///     split_pattern_tokens("I see (a red|the blue) car"),
///     vec!["I", "see", "(a red|the blue)", "car"],
/// );
/// ```
#[must_use]
pub fn split_pattern_tokens(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = source.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '(' => {
                depth = depth.saturating_add(1);
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ' ' if depth == 0 => tokens.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    tokens.push(current);
    tokens
}

/// Derive a pattern that accepts any token-aligned prefix of `normalized`.
///
/// Every token `t` becomes `(t|$)` and tokens are joined with `( |$)`, so the
/// text typed so far may stop between tokens (or before the first one) and
/// still match. A leading `^` in the input is folded into the single anchor
/// of the result.
///
/// # Examples
/// ```
/// use stepscope_patterns::build_prefix_pattern;
///
/// let prefix = build_prefix_pattern(r"^I have (\d+) cats$");
/// assert_eq!(prefix, r"^(I|$)( |$)(have|$)( |$)((\d+)|$)( |$)(cats$|$)");
/// ```
#[must_use]
pub fn build_prefix_pattern(normalized: &str) -> String {
    let body = normalized.strip_prefix('^').unwrap_or(normalized);
    let joined = split_pattern_tokens(body)
        .iter()
        .map(|token| format!("({token}|$)"))
        .collect::<Vec<_>>()
        .join("( |$)");
    format!("^{joined}")
}
