//! Token stream
//!
//!     A buffered sequence of tokens pulled lazily from a stack of input sources. The grammar
//!     parser reads grammar tokens through it, and the table-driven matcher reads target tokens
//!     through it and backtracks over it.
//!
//! Source Stack
//!
//!     `open()` pushes a new source on top of the current one. Tokens are always scanned from
//!     the top source; when it is exhausted it is dropped and scanning resumes in the source
//!     below. Once the last source is exhausted the stream produces a single END_OF_INPUT token
//!     and never advances past it.
//!
//! Commit and Rewind
//!
//!     Tokens are scanned only when the cursor moves past the end of the buffer, and stay
//!     buffered until they are committed. `commit()` drops every buffered token before the
//!     cursor; `rewind()` moves the cursor back to the oldest buffered token, which is the last
//!     commit point.
//!
//!     On its own that gives one level of backtracking per commit point: an inner match that
//!     commits also discards what an enclosing match would need to rewind to. Nested matches
//!     therefore take checkpoints. `mark()` records the cursor, `rewind_to()` returns to it and
//!     `release()` drops it. While any checkpoint is live, `commit()` never discards tokens at
//!     or after the earliest one, so every enclosing attempt can still be rewound.

use crate::sapcc::range::Position;
use crate::sapcc::token::{Token, TokenKind, TokenSource};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the token stream and by opening its sources
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot rewind to token {index}: tokens before {base} were committed")]
    Committed { index: usize, base: usize },
}

/// A saved cursor position, see [`TokenStream::mark`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    index: usize,
    depth: usize,
}

impl Checkpoint {
    /// Absolute index of the token the checkpoint points at
    pub fn index(&self) -> usize {
        self.index
    }
}

pub struct TokenStream<K: TokenKind> {
    sources: Vec<Box<dyn TokenSource<K>>>,
    buffer: VecDeque<Token<K>>,
    /// Absolute index of `buffer[0]`
    base: usize,
    /// Absolute index of the current token
    cursor: usize,
    checkpoints: Vec<usize>,
    last_name: Arc<str>,
    last_end: Position,
}

impl<K: TokenKind> TokenStream<K> {
    /// Create a stream over `source` and scan its first token
    pub fn new(source: impl TokenSource<K> + 'static) -> Self {
        let last_name = source.name();
        let mut stream = Self {
            sources: vec![Box::new(source)],
            buffer: VecDeque::new(),
            base: 0,
            cursor: 0,
            checkpoints: Vec::new(),
            last_name,
            last_end: Position::default(),
        };
        let first = stream.scan();
        stream.buffer.push_back(first);
        stream
    }

    /// Push a new input source. The next token scanned comes from it.
    ///
    /// If END_OF_INPUT was already scanned, that token is replaced by the first token of the
    /// new source, wherever the cursor is.
    pub fn open(&mut self, source: impl TokenSource<K> + 'static) {
        tracing::debug!(source = %source.name(), depth = self.sources.len() + 1, "open input");
        self.sources.push(Box::new(source));

        if self.buffer.back().is_some_and(|token| token.kind.is_end()) {
            self.buffer.pop_back();
            let next = self.scan();
            self.buffer.push_back(next);
        }
    }

    /// The token at the cursor
    pub fn current(&self) -> &Token<K> {
        &self.buffer[self.cursor - self.base]
    }

    /// Move to the next token, scanning it if it isn't buffered yet. A no-op on END_OF_INPUT.
    pub fn advance(&mut self) -> &Token<K> {
        if !self.current().kind.is_end() {
            if self.cursor + 1 == self.base + self.buffer.len() {
                let next = self.scan();
                self.buffer.push_back(next);
            }
            self.cursor += 1;
        }
        self.current()
    }

    /// Drop buffered tokens before the cursor, never past a live checkpoint
    pub fn commit(&mut self) {
        let keep_from = self
            .checkpoints
            .iter()
            .copied()
            .fold(self.cursor, usize::min);
        let drop = keep_from - self.base;
        self.buffer.drain(..drop);
        self.base = keep_from;
    }

    /// Move the cursor back to the last commit point
    pub fn rewind(&mut self) {
        self.cursor = self.base;
    }

    /// Record the cursor so it can be returned to with [`rewind_to`](Self::rewind_to)
    pub fn mark(&mut self) -> Checkpoint {
        self.checkpoints.push(self.cursor);
        Checkpoint {
            index: self.cursor,
            depth: self.checkpoints.len() - 1,
        }
    }

    pub fn rewind_to(&mut self, checkpoint: &Checkpoint) -> Result<(), StreamError> {
        if checkpoint.index < self.base {
            return Err(StreamError::Committed {
                index: checkpoint.index,
                base: self.base,
            });
        }
        self.cursor = checkpoint.index;
        Ok(())
    }

    /// Drop a checkpoint and every checkpoint taken after it
    pub fn release(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.truncate(checkpoint.depth);
    }

    /// Absolute index of the current token since the stream was created
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Tokens still held in the buffer, oldest first
    pub fn buffered(&self) -> impl Iterator<Item = &Token<K>> {
        self.buffer.iter()
    }

    /// Number of sources still open
    pub fn depth(&self) -> usize {
        self.sources.len()
    }

    fn scan(&mut self) -> Token<K> {
        while let Some(source) = self.sources.last_mut() {
            if let Some(token) = source.next_token() {
                tracing::trace!(kind = ?token.kind, text = %token.text, line = token.line, col = token.col, "scan");
                return token;
            }
            self.last_name = source.name();
            self.last_end = source.end_position();
            tracing::debug!(source = %self.last_name, "close input");
            self.sources.pop();
        }
        Token::end_of_input(Arc::clone(&self.last_name), self.last_end)
    }
}
