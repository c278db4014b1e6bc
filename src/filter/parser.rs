//! Recursive-descent parser for the RFC 7644 filter grammar.
//!
//! ```text
//! filter    = orExpr
//! orExpr    = andExpr *("or" andExpr)
//! andExpr   = unary *("and" unary)
//! unary     = "not" "(" filter ")" / "(" filter ")" / attrExp / valuePath
//! attrExp   = attrPath "pr" / attrPath compareOp compValue
//! valuePath = attrPath "[" filter "]"
//! ```
//!
//! Parsing is purely syntactic; attribute names are not checked against any
//! schema here.

use super::ast::{CompareOperator, FilterExpression};
use super::lexer::{Token, TokenKind, tokenize};
use crate::config::EngineConfig;
use crate::error::{FilterParseError, FilterResult};
use crate::path::AttributeReference;
use log::trace;
use serde_json::Value;

/// Parse a filter with the default limits.
pub fn parse_filter(text: &str) -> FilterResult<FilterExpression> {
    parse_filter_with_config(text, &EngineConfig::default())
}

/// Parse a filter, enforcing the configured length and nesting limits.
pub fn parse_filter_with_config(
    text: &str,
    config: &EngineConfig,
) -> FilterResult<FilterExpression> {
    parse_fragment(text, 0, config)
}

/// Parse a filter that sits at byte `offset` of a larger text (e.g. the
/// bracketed part of a patch path), so error positions refer to the whole.
pub(crate) fn parse_fragment(
    text: &str,
    offset: usize,
    config: &EngineConfig,
) -> FilterResult<FilterExpression> {
    if text.len() > config.max_filter_length {
        return Err(FilterParseError::new(
            format!(
                "filter exceeds maximum length of {} bytes",
                config.max_filter_length
            ),
            truncate(text, 32),
            offset,
        ));
    }
    if text.trim().is_empty() {
        return Err(FilterParseError::new("filter is empty", text, offset));
    }

    let mut tokens = tokenize(text)?;
    for token in &mut tokens {
        token.position += offset;
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth: config.max_filter_depth,
        end: offset + text.len(),
    };
    let expression = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(FilterParseError::new(
            "unexpected token after end of filter",
            &token.text,
            token.position,
        ));
    }
    trace!("Parsed filter {:?} into {}", text, expression);
    Ok(expression)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    /// Position reported for "unexpected end of input"
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(
            self.peek(),
            Some(Token { kind: TokenKind::Word(word), .. }) if word.eq_ignore_ascii_case(keyword)
        )
    }

    fn end_of_input(&self, expected: &str) -> FilterParseError {
        FilterParseError::new(
            format!("unexpected end of filter, expected {}", expected),
            "",
            self.end,
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> FilterResult<()> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(FilterParseError::new(
                format!("expected {}", expected),
                token.text,
                token.position,
            )),
            None => Err(self.end_of_input(expected)),
        }
    }

    fn enter(&mut self, token: &Token) -> FilterResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FilterParseError::new(
                format!("filter nesting exceeds maximum depth of {}", self.max_depth),
                &token.text,
                token.position,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> FilterResult<FilterExpression> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.next();
            let right = self.parse_and()?;
            left = FilterExpression::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> FilterResult<FilterExpression> {
        let mut left = self.parse_unary()?;
        while self.peek_keyword("and") {
            self.next();
            let right = self.parse_unary()?;
            left = FilterExpression::and(left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> FilterResult<FilterExpression> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.end_of_input("attribute path or '('"))?;

        match &token.kind {
            TokenKind::Word(word)
                if word.eq_ignore_ascii_case("not")
                    && matches!(
                        self.peek_at(1),
                        Some(Token {
                            kind: TokenKind::LParen,
                            ..
                        })
                    ) =>
            {
                self.next();
                let inner = self.parse_parenthesized(&token)?;
                Ok(FilterExpression::not(inner))
            }
            TokenKind::LParen => Ok(FilterExpression::group(self.parse_parenthesized(&token)?)),
            TokenKind::Word(word) => {
                self.next();
                let path = parse_path(word, &token)?;
                self.parse_attribute_expression(path, &token)
            }
            _ => Err(FilterParseError::new(
                "expected attribute path or '('",
                &token.text,
                token.position,
            )),
        }
    }

    fn parse_parenthesized(&mut self, opening: &Token) -> FilterResult<FilterExpression> {
        self.enter(opening)?;
        self.expect(TokenKind::LParen, "'('")?;
        let inner = self.parse_or()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.leave();
        Ok(inner)
    }

    fn parse_attribute_expression(
        &mut self,
        path: AttributeReference,
        path_token: &Token,
    ) -> FilterResult<FilterExpression> {
        let token = self
            .next()
            .ok_or_else(|| self.end_of_input("operator after attribute path"))?;

        match &token.kind {
            TokenKind::LBracket => {
                self.enter(&token)?;
                let inner = self.parse_or()?;
                self.expect(TokenKind::RBracket, "']'")?;
                self.leave();
                Ok(FilterExpression::value_path(path, inner))
            }
            TokenKind::Word(word) if word.eq_ignore_ascii_case("pr") => {
                Ok(FilterExpression::present(path))
            }
            TokenKind::Word(word) => {
                let operator = CompareOperator::from_keyword(word).ok_or_else(|| {
                    FilterParseError::new(
                        format!("unknown operator after '{}'", path_token.text),
                        &token.text,
                        token.position,
                    )
                })?;
                let value = self.parse_value()?;
                Ok(FilterExpression::comparison(path, operator, value))
            }
            _ => Err(FilterParseError::new(
                "expected operator",
                &token.text,
                token.position,
            )),
        }
    }

    fn parse_value(&mut self) -> FilterResult<Value> {
        let token = self
            .next()
            .ok_or_else(|| self.end_of_input("comparison value"))?;

        match token.kind {
            TokenKind::Str(value) => Ok(Value::String(value)),
            TokenKind::Word(word) => {
                if word.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if word.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else if word.eq_ignore_ascii_case("null") {
                    Ok(Value::Null)
                } else {
                    word.parse::<serde_json::Number>()
                        .map(Value::Number)
                        .map_err(|_| {
                            FilterParseError::new(
                                "expected quoted string, number, true, false or null",
                                &token.text,
                                token.position,
                            )
                        })
                }
            }
            _ => Err(FilterParseError::new(
                "expected comparison value",
                &token.text,
                token.position,
            )),
        }
    }
}

fn parse_path(word: &str, token: &Token) -> FilterResult<AttributeReference> {
    AttributeReference::parse(word)
        .map_err(|e| FilterParseError::new(e.reason, &token.text, token.position))
}
