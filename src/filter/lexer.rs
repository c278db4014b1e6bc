//! Tokenizer for SCIM filter text.

use crate::error::{FilterParseError, FilterResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// Quoted string literal, already unescaped
    Str(String),
    /// Attribute path, keyword, number or `true`/`false`/`null`
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset in the input
    pub position: usize,
    /// Raw source text of the token
    pub text: String,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '"')
}

pub(crate) fn tokenize(input: &str) -> FilterResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            _ => None,
        };
        if let Some(kind) = kind {
            chars.next();
            tokens.push(Token {
                kind,
                position: start,
                text: c.to_string(),
            });
            continue;
        }

        if c == '"' {
            chars.next();
            let mut escaped = false;
            let mut end = None;
            for (idx, ch) in chars.by_ref() {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    end = Some(idx);
                    break;
                }
            }
            let end = end.ok_or_else(|| {
                FilterParseError::new("unterminated string literal", &input[start..], start)
            })?;
            let raw = &input[start..=end];
            let value: String = serde_json::from_str(raw).map_err(|e| {
                FilterParseError::new(format!("invalid string literal: {}", e), raw, start)
            })?;
            tokens.push(Token {
                kind: TokenKind::Str(value),
                position: start,
                text: raw.to_string(),
            });
            continue;
        }

        let mut end = input.len();
        while let Some(&(idx, ch)) = chars.peek() {
            if is_delimiter(ch) {
                end = idx;
                break;
            }
            chars.next();
        }
        let word = &input[start..end];
        tokens.push(Token {
            kind: TokenKind::Word(word.to_string()),
            position: start,
            text: word.to_string(),
        });
    }

    Ok(tokens)
}
