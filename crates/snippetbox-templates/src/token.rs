//! Splits template source into text and `{{ action }}` tokens.

use crate::error::TemplateError;

pub(crate) const ACTION_OPEN: &str = "{{";
pub(crate) const ACTION_CLOSE: &str = "}}";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Text(String),
    /// Trimmed action body and the 1-based line it starts on.
    Action { body: String, line: usize },
}

/// Tokenizes `source`.
///
/// `{{- ` trims whitespace before the action and ` -}}` after it. Comments
/// (`{{/* ... */}}`) produce no token.
pub(crate) fn tokenize(file: &str, source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut trim_next = false;

    while pos < source.len() {
        let Some(rel) = source[pos..].find(ACTION_OPEN) else {
            push_text(&mut tokens, &source[pos..], trim_next, false);
            break;
        };
        let open = pos + rel;
        let action_line = line + count_lines(&source[pos..open]);

        let after_open = open + ACTION_OPEN.len();
        let Some(close_rel) = find_close(&source[after_open..]) else {
            return Err(TemplateError::syntax(file, action_line, "unclosed action"));
        };
        let close = after_open + close_rel;
        let mut inner = &source[after_open..close];

        let trim_before = inner.starts_with("- ");
        if trim_before {
            inner = &inner[2..];
        }
        let trim_after = inner.ends_with(" -");
        if trim_after {
            inner = &inner[..inner.len() - 2];
        }

        push_text(&mut tokens, &source[pos..open], trim_next, trim_before);

        let body = inner.trim();
        if body.starts_with("/*") {
            if !body.ends_with("*/") {
                return Err(TemplateError::syntax(file, action_line, "unclosed comment"));
            }
        } else if body.is_empty() {
            return Err(TemplateError::syntax(file, action_line, "missing value for command"));
        } else {
            tokens.push(Token::Action {
                body: body.to_string(),
                line: action_line,
            });
        }

        line = action_line + count_lines(&source[open..close + ACTION_CLOSE.len()]);
        pos = close + ACTION_CLOSE.len();
        trim_next = trim_after;
    }

    Ok(tokens)
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Finds the closing delimiter, skipping over quoted strings.
fn find_close(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == b'\\' && q == b'"' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'`' => quote = Some(b),
            None if rest[i..].starts_with(ACTION_CLOSE) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn push_text(tokens: &mut Vec<Token>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(body: &str, line: usize) -> Token {
        Token::Action {
            body: body.to_string(),
            line,
        }
    }

    #[test]
    fn test_empty_template() {
        assert!(tokenize("t", "").unwrap().is_empty());
    }

    #[test]
    fn test_plain_html() {
        let tokens = tokenize("t", "<p>hello</p>").unwrap();
        assert_eq!(tokens, vec![Token::Text("<p>hello</p>".into())]);
    }

    #[test]
    fn test_actions_and_lines() {
        let tokens = tokenize("t", "<h1>{{ .title }}</h1>\n<p>\n{{.content}}</p>").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("<h1>".into()),
                action(".title", 1),
                Token::Text("</h1>\n<p>\n".into()),
                action(".content", 3),
                Token::Text("</p>".into()),
            ]
        );
    }

    #[test]
    fn test_comment_is_dropped() {
        let tokens = tokenize("t", "a{{/* note {{ */}}b").unwrap();
        assert_eq!(tokens, vec![Token::Text("a".into()), Token::Text("b".into())]);
    }

    #[test]
    fn test_trim_markers() {
        let tokens = tokenize("t", "<ul>\n  {{- .x -}}\n  </ul>").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Text("<ul>".into()), action(".x", 2), Token::Text("</ul>".into())]
        );
    }

    #[test]
    fn test_close_inside_string_is_ignored() {
        let tokens = tokenize("t", r#"{{template "a}}b" .}}"#).unwrap();
        assert_eq!(tokens, vec![action(r#"template "a}}b" ."#, 1)]);
    }

    #[test]
    fn test_unclosed_action() {
        let err = tokenize("home.page.tmpl", "a\n{{ .x").unwrap_err();
        assert_eq!(err.to_string(), "home.page.tmpl:2: unclosed action");
    }

    #[test]
    fn test_empty_action() {
        assert!(tokenize("t", "{{ }}").is_err());
    }
}
