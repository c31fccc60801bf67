//! Tokenizer for SQL templates.
//!
//! Column type templates use `$l`, `$p` and `$s` for length, precision and
//! scale; function patterns use `?1`, `?2`, ... for positional arguments.
//! Both kinds share one lexer; each consumer treats the placeholders it does
//! not understand as plain text.

use logos::Logos;
use std::fmt;

/// Span represents a byte range in the template source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Token with its span information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The source text covered by this token
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Positional function argument, 1-based (`?1`)
    #[regex(r"\?[0-9]+", parse_argument)]
    Argument(usize),

    #[token("$l")]
    Length,
    #[token("$p")]
    Precision,
    #[token("$s")]
    Scale,

    #[regex(r"[^?$]+")]
    Text,

    // A lone marker that does not start a placeholder
    #[token("?")]
    Question,
    #[token("$")]
    Dollar,
}

fn parse_argument(lex: &mut logos::Lexer<TokenKind>) -> Option<usize> {
    lex.slice()[1..].parse::<usize>().ok().filter(|n| *n > 0)
}

impl TokenKind {
    /// True for tokens a consumer should copy through verbatim
    pub fn is_text(&self) -> bool {
        matches!(self, TokenKind::Text | TokenKind::Question | TokenKind::Dollar)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Argument(n) => write!(f, "?{}", n),
            TokenKind::Length => write!(f, "$l"),
            TokenKind::Precision => write!(f, "$p"),
            TokenKind::Scale => write!(f, "$s"),
            TokenKind::Text => write!(f, "text"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::Dollar => write!(f, "$"),
        }
    }
}

/// Lexer over a template string
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
        }
    }

    pub fn next_token(&mut self) -> Option<Token> {
        let kind = self.inner.next()?;
        let span = self.inner.span();
        let span = Span::new(span.start, span.end);
        match kind {
            Ok(kind) => Some(Token::new(kind, span)),
            // `?0` and overflowing argument numbers are kept as text
            Err(()) => Some(Token::new(TokenKind::Text, span)),
        }
    }

    pub fn source(&self) -> &'a str {
        self.inner.source()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Tokenize a whole template, merging adjacent text tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    for token in Lexer::new(source) {
        if token.kind.is_text() {
            if let Some(last) = tokens.last_mut() {
                if last.kind == TokenKind::Text {
                    last.span = last.span.merge(token.span);
                    continue;
                }
            }
            tokens.push(Token::new(TokenKind::Text, token.span));
        } else {
            tokens.push(token);
        }
    }
    tokens
}
