//! Token traces
//!
//! A token trace stands in for a generated scanner: whitespace-separated terminal names, each
//! optionally followed by `=text` to give the token its text. `#` starts a comment. Traces make it
//! possible to run the matcher over a grammar before any target scanner exists.
//!
//!     NUM=12 PLUS NUM=30   # 12 + 30

use crate::sapcc::grammar::{Grammar, SymbolRef};
use crate::sapcc::range::{Location, SourceLocation};
use crate::sapcc::stream::TokenStream;
use crate::sapcc::token::{Token, VecSource};
use logos::Logos;
use std::sync::Arc;
use thiserror::Error;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
enum TraceWord {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(=[^ \t\r\n\f]*)?")]
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("{location}: unknown terminal {name}")]
    UnknownTerminal { location: Location, name: String },
    #[error("{location}: {name} is a non-terminal, traces list terminals only")]
    NotATerminal { location: Location, name: String },
    #[error("{location}: cannot read {text:?} as a token")]
    Invalid { location: Location, text: String },
}

/// Tokens of a trace, with terminal names resolved against `grammar`
pub fn trace_tokens(name: &str, text: &str, grammar: &Grammar) -> Result<Vec<Token<u16>>, TraceError> {
    let source: Arc<str> = Arc::from(name);
    let locator = SourceLocation::new(text);
    let mut lexer = TraceWord::lexer(text);
    let mut tokens = Vec::new();

    while let Some(word) = lexer.next() {
        let position = locator.byte_to_position(lexer.span().start);
        let location = Location::new(Arc::clone(&source), position);
        let slice = lexer.slice();
        if word.is_err() {
            return Err(TraceError::Invalid {
                location,
                text: slice.to_string(),
            });
        }

        let (symbol, token_text) = slice.split_once('=').unwrap_or((slice, ""));
        match grammar.lookup(symbol) {
            Some(SymbolRef::Terminal(id)) => {
                tokens.push(Token::new(id, token_text, Arc::clone(&source), position));
            }
            Some(SymbolRef::NonTerminal(_)) => {
                return Err(TraceError::NotATerminal {
                    location,
                    name: symbol.to_string(),
                })
            }
            None => {
                return Err(TraceError::UnknownTerminal {
                    location,
                    name: symbol.to_string(),
                })
            }
        }
    }

    tracing::debug!(trace = name, tokens = tokens.len(), "read token trace");
    Ok(tokens)
}

/// A token stream over a trace
pub fn trace_stream(name: &str, text: &str, grammar: &Grammar) -> Result<TokenStream<u16>, TraceError> {
    let tokens = trace_tokens(name, text, grammar)?;
    Ok(TokenStream::new(VecSource::new(name, tokens)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sapcc::testing::factories::compile_valid;

    fn grammar() -> Grammar {
        compile_valid("%tokens NUM@ PLUS %end sum : NUM PLUS NUM {} : NUM {}").grammar
    }

    #[test]
    fn test_words_become_tokens() {
        let tokens = trace_tokens("t", "NUM=12 PLUS # plus\n  NUM=30", &grammar()).unwrap();
        let kinds: Vec<u16> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![500, 501, 500]);
        assert_eq!(tokens[0].text, "12");
        assert_eq!(tokens[1].text, "");
        assert_eq!((tokens[2].line, tokens[2].col), (2, 3));
    }

    #[test]
    fn test_unknown_terminal() {
        let err = trace_tokens("t", "NUM MINUS", &grammar()).unwrap_err();
        assert_eq!(err.to_string(), "t:1:5: unknown terminal MINUS");
    }

    #[test]
    fn test_non_terminal_in_trace() {
        let err = trace_tokens("t", "sum", &grammar()).unwrap_err();
        assert!(matches!(err, TraceError::NotATerminal { .. }));
    }

    #[test]
    fn test_invalid_character() {
        let err = trace_tokens("t", "NUM +", &grammar()).unwrap_err();
        assert!(matches!(err, TraceError::Invalid { ref text, .. } if text == "+"));
    }
}
