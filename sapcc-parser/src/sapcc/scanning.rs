//! Grammar scanner
//!
//!     Tokenizes the grammar description language with a logos lexer. The token types are the
//!     directive keywords, `:` and `;`, quoted strings, unsigned numbers, brace-delimited code
//!     blocks and bare symbols. Whitespace and `#` comments are skipped.
//!
//! Lazy Scanning
//!
//!     [`GrammarScanner`] owns the text of one input and scans a single token per call, starting
//!     a fresh logos lexer at the current byte offset. That keeps the token stream in control of
//!     how far ahead the input is read, which matters for `%include`: the included file must be
//!     opened before the token after the directive is scanned.
//!
//! Code Blocks
//!
//!     A block starts at `{` and runs to the matching `}`, counting nesting depth. The outer
//!     braces are stripped from the token text; nested braces are kept verbatim. Nothing inside
//!     a block is interpreted, so braces in target-language strings or comments still count.
//!
//! Errors
//!
//!     Unknown directives, unterminated strings and blocks, and characters that start no token
//!     come out as `Error` tokens carrying the offending text. Scanning continues after them; the
//!     parser reports them through [`describe_error`].

use crate::sapcc::range::{Position, SourceLocation};
use crate::sapcc::stream::{StreamError, TokenStream};
use crate::sapcc::token::{Token, TokenKind, TokenSource};
use logos::Logos;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Token types of the grammar description language
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum TokenType {
    /// Produced by the token stream once every input is exhausted
    EndOfInput,
    /// Produced by the scanner for text it cannot tokenize
    Error,

    #[token("%tokens")]
    Tokens,
    #[token("%grammar")]
    Grammar,
    #[token("%end")]
    End,
    #[token("%header")]
    Header,
    #[token("%source")]
    Source,
    #[token("%verbosity")]
    Verbosity,
    #[token("%name")]
    Name,
    #[token("%prefix")]
    Prefix,
    #[token("%include")]
    Include,
    // Any other directive word is rejected
    #[regex(r"%[A-Za-z_][A-Za-z0-9_]*", reject, priority = 1)]
    UnknownDirective,

    #[token(":")]
    Colon,
    #[token(";")]
    Semi,

    #[token("{", code_block)]
    Block,
    #[token("\"", quoted_string)]
    QuotedString,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*@?")]
    Symbol,
}

impl TokenKind for TokenType {
    const END_OF_INPUT: TokenType = TokenType::EndOfInput;
}

impl TokenType {
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            TokenType::Tokens
                | TokenType::Grammar
                | TokenType::End
                | TokenType::Header
                | TokenType::Source
                | TokenType::Verbosity
                | TokenType::Name
                | TokenType::Prefix
                | TokenType::Include
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenType::EndOfInput => "END OF INPUT",
            TokenType::Error => "ERROR",
            TokenType::Tokens => "%tokens",
            TokenType::Grammar => "%grammar",
            TokenType::End => "%end",
            TokenType::Header => "%header",
            TokenType::Source => "%source",
            TokenType::Verbosity => "%verbosity",
            TokenType::Name => "%name",
            TokenType::Prefix => "%prefix",
            TokenType::Include => "%include",
            TokenType::UnknownDirective => "DIRECTIVE",
            TokenType::Colon => "':'",
            TokenType::Semi => "';'",
            TokenType::Block => "code BLOCK",
            TokenType::QuotedString => "STRING",
            TokenType::Number => "NUMBER",
            TokenType::Symbol => "SYMBOL",
        };
        write!(f, "{}", name)
    }
}

fn reject(_: &mut logos::Lexer<TokenType>) -> bool {
    false
}

fn code_block(lex: &mut logos::Lexer<TokenType>) -> bool {
    let mut depth = 1usize;
    for (i, ch) in lex.remainder().char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    lex.bump(i + 1);
                    return true;
                }
            }
            _ => {}
        }
    }
    let rest = lex.remainder().len();
    lex.bump(rest);
    false
}

fn quoted_string(lex: &mut logos::Lexer<TokenType>) -> bool {
    match lex.remainder().find('"') {
        Some(i) => {
            lex.bump(i + 1);
            true
        }
        None => {
            let rest = lex.remainder().len();
            lex.bump(rest);
            false
        }
    }
}

/// Human-readable message for the text of an `Error` token
pub fn describe_error(text: &str) -> String {
    match text.chars().next() {
        Some('%') => format!("unknown directive: {}", text),
        Some('{') => "unexpected end of file in code block".to_string(),
        Some('"') => "unterminated string".to_string(),
        Some(ch) => format!("unknown character: '{}' (0x{:04X})", ch, ch as u32),
        None => "unexpected end of input".to_string(),
    }
}

/// Scans one grammar input, one token at a time
#[derive(Debug, Clone)]
pub struct GrammarScanner {
    name: Arc<str>,
    source: String,
    offset: usize,
    locator: SourceLocation,
}

impl GrammarScanner {
    pub fn new(name: impl Into<Arc<str>>, source: impl Into<String>) -> Self {
        let source = source.into();
        let locator = SourceLocation::new(&source);
        Self {
            name: name.into(),
            source,
            offset: 0,
            locator,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, StreamError> {
        let source = std::fs::read_to_string(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), source))
    }
}

impl TokenSource<TokenType> for GrammarScanner {
    fn name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    fn next_token(&mut self) -> Option<Token<TokenType>> {
        let rest = &self.source[self.offset..];
        let mut lexer = TokenType::lexer(rest);
        let Some(result) = lexer.next() else {
            self.offset = self.source.len();
            return None;
        };
        let span = lexer.span();
        let start = self.offset + span.start;
        let position = self.locator.byte_to_position(start);

        let (kind, text, end) = match result {
            Ok(kind @ (TokenType::Block | TokenType::QuotedString)) => {
                let slice = &rest[span.clone()];
                (kind, slice[1..slice.len() - 1].to_string(), span.end)
            }
            Ok(kind) => (kind, rest[span.clone()].to_string(), span.end),
            Err(()) => {
                let tail = &rest[span.start..];
                match tail.chars().next() {
                    // Nothing closes an unterminated block or string, give up on the input
                    Some('{') | Some('"') => (TokenType::Error, tail.to_string(), rest.len()),
                    Some(ch) => {
                        let char_end = span.start + ch.len_utf8();
                        let end = if span.end > char_end && rest.is_char_boundary(span.end) {
                            span.end
                        } else {
                            char_end
                        };
                        (TokenType::Error, rest[span.start..end].to_string(), end)
                    }
                    None => (TokenType::Error, String::new(), rest.len()),
                }
            }
        };

        self.offset += end;
        Some(Token::new(kind, text, Arc::clone(&self.name), position))
    }

    fn end_position(&self) -> Position {
        self.locator.byte_to_position(self.source.len())
    }
}

/// A token stream over one grammar text
pub fn grammar_stream(name: &str, source: &str) -> TokenStream<TokenType> {
    TokenStream::new(GrammarScanner::new(name, source))
}

/// Scan a whole grammar text eagerly, END_OF_INPUT excluded
pub fn tokenize(source: &str) -> Vec<Token<TokenType>> {
    let mut scanner = GrammarScanner::new("<input>", source);
    std::iter::from_fn(|| scanner.next_token()).collect()
}
