//! # sapcc
//!
//! The core of the sapcc compiler-compiler.
//!
//! File Layout
//!
//! A grammar description goes through four stages at grammar-compile time, and the
//! table produced by the last one is interpreted by a fifth at target-parse time:
//!
//! src/sapcc
//!   ├── stream       Buffered, rewindable token stream over nested input sources
//!   ├── scanning     The logos scanner for the grammar description language
//!   ├── parsing      Recursive-descent grammar parser and post-parse validation
//!   ├── grammar      The grammar model (terminals, non-terminals, rules, code blobs)
//!   ├── diagnostics  Scan, syntax and semantic errors and warnings
//!   ├── encoding     Table encoder, table reader and table rendering
//!   ├── matching     The table-driven backtracking matcher and its AST
//!   └── trace        Token traces, terminal names standing in for a target scanner
//!
//! The token stream is shared: the grammar parser reads grammar tokens through it and the
//! matcher reads target-language tokens through it.

pub mod sapcc;
