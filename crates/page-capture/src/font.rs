//! Canonical forms for font family names and weights.

/// Canonical key for a `font-family` entry: `"Arial"`, `'arial'` and `Arial` collapse to
/// `arial`. CSS escapes are resolved before quotes are stripped.
pub fn normalize_font_family(name: &str) -> String {
    remove_quotes(&css_unescape(name.trim())).to_lowercase()
}

/// Strips one layer of matching single or double quotes, then trims.
pub fn remove_quotes(value: &str) -> String {
    let unquoted = strip_pair(value, '\'').or_else(|| strip_pair(value, '"'));
    unquoted.unwrap_or(value).trim().to_string()
}

fn strip_pair(value: &str, quote: char) -> Option<&str> {
    if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
        let inner = &value[1..value.len() - 1];
        if !inner.contains('\n') {
            return Some(inner);
        }
    }
    None
}

/// Maps keyword weights to numbers; anything else is returned as given.
pub fn font_weight(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "regular" | "normal" => "400".to_string(),
        "bold" | "bolder" => "700".to_string(),
        "lighter" => "100".to_string(),
        _ => raw.to_string(),
    }
}

/// Resolves CSS escape sequences (`\31 23`, `\"`, `\\`).
pub fn css_unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(next) if next.is_ascii_hexdigit() => {
                    hex.push(*next);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\u{fffd}'),
            }
            continue;
        }
        match chars.peek() {
            Some('\r') => {
                chars.next();
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(' ' | '\t' | '\n' | '\u{c}') => {
                chars.next();
            }
            _ => {}
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
        let decoded = match code {
            0 => '\u{fffd}',
            code => char::from_u32(code).unwrap_or('\u{fffd}'),
        };
        out.push(decoded);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_and_bare_names_collapse() {
        assert_eq!(normalize_font_family("\"Arial\""), "arial");
        assert_eq!(normalize_font_family(" Arial "), "arial");
        assert_eq!(normalize_font_family("'Open Sans'"), "open sans");
    }

    #[test]
    fn only_one_quote_layer_is_removed() {
        assert_eq!(remove_quotes("'\"x\"'"), "\"x\"");
        assert_eq!(remove_quotes("'unbalanced\""), "'unbalanced\"");
    }

    #[test]
    fn unescapes_hex_sequences() {
        assert_eq!(css_unescape("\\31 23"), "123");
        assert_eq!(css_unescape("a\\\"b"), "a\"b");
        assert_eq!(normalize_font_family("\\46 oo"), "foo");
    }

    #[test]
    fn maps_weight_keywords() {
        assert_eq!(font_weight("Bold"), "700");
        assert_eq!(font_weight(" normal "), "400");
        assert_eq!(font_weight("lighter"), "100");
        assert_eq!(font_weight("bolder"), "700");
        assert_eq!(font_weight("regular"), "400");
        assert_eq!(font_weight("600"), "600");
    }
}
