//! Quoting helpers for generated SQL text.

/// Escape a value for a single-quoted SQL literal by doubling single quotes.
///
/// No other character is touched; control or binary content is the caller's
/// responsibility.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Inverse of [`escape_literal`].
pub fn unescape_literal(value: &str) -> String {
    value.replace("''", "'")
}

/// Wrap an identifier in `quote` on both sides, doubling embedded quotes.
pub fn quote_identifier(ident: &str, quote: char) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push(quote);
    for ch in ident.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}
