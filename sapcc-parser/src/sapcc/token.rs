//! Core token types shared by the grammar scanner, the token stream and the matcher.
//!
//! A token is `{ kind, text, line, col, source }`. The kind is generic: the grammar parser
//! reads [`TokenType`](crate::sapcc::scanning::TokenType) tokens, the matcher reads tokens whose
//! kind is a terminal id. Whatever the kind, it has to name an end-of-input value, because the
//! stream synthesizes that token once every input source is exhausted.

use crate::sapcc::range::{Location, Position};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Kinds a [`Token`] can carry
pub trait TokenKind: Copy + Eq + fmt::Debug {
    /// The kind of the token produced after the last input source is exhausted
    const END_OF_INPUT: Self;

    fn is_end(&self) -> bool {
        *self == Self::END_OF_INPUT
    }
}

/// Target-language tokens are identified by their terminal id. Id 0 is never assigned to a
/// terminal, so it marks end of input.
impl TokenKind for u16 {
    const END_OF_INPUT: u16 = 0;
}

/// One lexical token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token<K> {
    pub kind: K,
    pub text: String,
    pub line: usize,
    pub col: usize,
    pub source: Arc<str>,
}

impl<K: TokenKind> Token<K> {
    pub fn new(kind: K, text: impl Into<String>, source: Arc<str>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            line: position.line,
            col: position.column,
            source,
        }
    }

    /// The synthetic end-of-input token, placed at `position` in `source`
    pub fn end_of_input(source: Arc<str>, position: Position) -> Self {
        Self::new(K::END_OF_INPUT, "", source, position)
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    pub fn location(&self) -> Location {
        Location::new(Arc::clone(&self.source), self.position())
    }
}

/// An input the [`TokenStream`](crate::sapcc::stream::TokenStream) can pull tokens from.
///
/// Sources are pulled one token at a time and only when the stream needs to look past its
/// buffer. A source returns `None` once it is exhausted; the stream then drops it and resumes
/// the source underneath.
pub trait TokenSource<K> {
    /// Name of the input, used in token locations and diagnostics
    fn name(&self) -> Arc<str>;

    /// Scan the next token, or `None` at the end of this input
    fn next_token(&mut self) -> Option<Token<K>>;

    /// Where this input stopped; the end-of-input token is placed here
    fn end_position(&self) -> Position;
}

/// A source over tokens that were produced ahead of time
#[derive(Debug, Clone)]
pub struct VecSource<K> {
    name: Arc<str>,
    tokens: std::vec::IntoIter<Token<K>>,
    end: Position,
}

impl<K: TokenKind> VecSource<K> {
    pub fn new(name: impl Into<Arc<str>>, tokens: Vec<Token<K>>) -> Self {
        let end = tokens
            .last()
            .map(|t| Position::new(t.line, t.col + t.text.len().max(1)))
            .unwrap_or_default();
        Self {
            name: name.into(),
            tokens: tokens.into_iter(),
            end,
        }
    }
}

impl<K: TokenKind> TokenSource<K> for VecSource<K> {
    fn name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    fn next_token(&mut self) -> Option<Token<K>> {
        self.tokens.next()
    }

    fn end_position(&self) -> Position {
        self.end
    }
}
