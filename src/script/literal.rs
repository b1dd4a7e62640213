//! Scalar literals shared by the reader and the command handlers.

use glam::Vec4;

use crate::clock::Millis;

/// Parses `<ms>` or `<seconds>s`. Only non-negative integers are accepted.
pub fn parse_timestamp(token: &str) -> Option<Millis> {
    let (digits, scale) = match token.strip_suffix(&['s', 'S'][..]) {
        Some(seconds) => (seconds, 1000),
        None => (token, 1),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<Millis>().ok()?.checked_mul(scale)
}

/// Parses `<r,g,b>` or `<r,g,b,a>` with float components. Alpha defaults to 1.
pub fn parse_color(token: &str) -> Option<Vec4> {
    let inner = token.strip_prefix('<')?.strip_suffix('>')?;
    let components = inner
        .split(',')
        .map(|component| component.trim().parse::<f32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match components[..] {
        [r, g, b] => Some(Vec4::new(r, g, b, 1.0)),
        [r, g, b, a] => Some(Vec4::new(r, g, b, a)),
        _ => None,
    }
}

/// Parses the literal `true` or `false`.
pub fn parse_bool(token: &str) -> Option<bool> {
    match token {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Splits on whitespace, rejoining angle-bracket groups such as `<1, 0, 0>`.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut group: Option<String> = None;
    for word in line.split_whitespace() {
        if let Some(open) = group.as_mut() {
            open.push_str(word);
            if word.ends_with('>') {
                tokens.extend(group.take());
            }
        } else if word.starts_with('<') && !word.ends_with('>') {
            group = Some(word.to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    tokens.extend(group);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_seconds_suffix() {
        assert_eq!(parse_timestamp("0"), Some(0));
        assert_eq!(parse_timestamp("1500"), Some(1500));
        assert_eq!(parse_timestamp("3s"), Some(3000));
        assert_eq!(parse_timestamp("3S"), Some(3000));
    }

    #[test]
    fn timestamps_reject_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("s"), None);
        assert_eq!(parse_timestamp("-5"), None);
        assert_eq!(parse_timestamp("1.5s"), None);
        assert_eq!(parse_timestamp("12ms"), None);
        assert_eq!(parse_timestamp("99999999999999999999"), None);
    }

    #[test]
    fn colors_take_three_or_four_components() {
        assert_eq!(parse_color("<1,0.5,0>"), Some(Vec4::new(1.0, 0.5, 0.0, 1.0)));
        assert_eq!(
            parse_color("<0,0,0,0.25>"),
            Some(Vec4::new(0.0, 0.0, 0.0, 0.25))
        );
        assert_eq!(parse_color("<1,1>"), None);
        assert_eq!(parse_color("<1,1,1,1,1>"), None);
        assert_eq!(parse_color("1,1,1"), None);
        assert_eq!(parse_color("<1,x,1>"), None);
    }

    #[test]
    fn tokenizer_rejoins_spaced_colors() {
        assert_eq!(
            tokenize("fade 0 2000 <1, 1, 1> t0"),
            vec!["fade", "0", "2000", "<1,1,1>", "t0"]
        );
        assert_eq!(tokenize("  a   b "), vec!["a", "b"]);
        assert_eq!(tokenize("<1, 2"), vec!["<1,2"]);
    }

    #[test]
    fn booleans_are_lowercase_literals() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("TRUE"), None);
        assert_eq!(parse_bool("1"), None);
    }
}
