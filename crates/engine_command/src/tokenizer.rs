/// Splits a command line into tokens.
///
/// A token is either a double-quoted run (quotes stripped, no escapes) or a
/// run of non-whitespace characters. The quoted form is tried first at every
/// position; a `"` without a closing partner is not special and stays inside
/// the bare token it starts or appears in.
pub fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if let Some(body) = rest.strip_prefix('"')
            && let Some(end) = body.find('"')
        {
            tokens.push(&body[..end]);
            rest = body[end + 1..].trim_start();
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_tokens() {
        assert_eq!(tokenize("  give  player\tdiamond \n"), vec!["give", "player", "diamond"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_quoted_token_keeps_spaces() {
        assert_eq!(tokenize(r#"say "hello world" now"#), vec!["say", "hello world", "now"]);
        assert_eq!(tokenize(r#"hello "world""#), vec!["hello", "world"]);
    }

    #[test]
    fn test_empty_quotes() {
        assert_eq!(tokenize(r#"name """#), vec!["name", ""]);
    }

    #[test]
    fn test_adjacent_quoted_and_bare() {
        // The quoted run ends the token; what follows starts a new one.
        assert_eq!(tokenize(r#""a"b"#), vec!["a", "b"]);
    }

    #[test]
    fn test_unclosed_quote_stays_in_token() {
        assert_eq!(tokenize(r#"say "hi"#), vec!["say", "\"hi"]);
        assert_eq!(tokenize(r#"ab"c d"#), vec!["ab\"c", "d"]);
        assert_eq!(tokenize(r#"ab"c d""#), vec!["ab\"c", "d\""]);
    }

    #[test]
    fn test_quotes_inside_bare_token_are_kept() {
        // Only a token that starts with a quote is a quoted run.
        assert_eq!(tokenize(r#"hello"world""#), vec!["hello\"world\""]);
        assert_eq!(tokenize(r#"say hello"world" now"#), vec!["say", "hello\"world\"", "now"]);
    }
}
