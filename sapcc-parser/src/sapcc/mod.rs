//! Main module for sapcc library functionality

pub mod diagnostics;
pub mod encoding;
pub mod grammar;
pub mod matching;
pub mod parsing;
pub mod range;
pub mod scanning;
pub mod stream;
pub mod testing;
pub mod token;
pub mod trace;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use encoding::{encode, EncodeError, EncodedTable, RuleRecord, TableError};
pub use grammar::{Grammar, NonTerminal, Rule, SymbolId, SymbolRef, Terminal};
pub use matching::{Ast, AstNode, MatchError, MatchOptions, Matcher};
pub use parsing::{compile_file, compile_str, Compilation, CompileError, CompileOptions};
pub use scanning::{GrammarScanner, TokenType};
pub use stream::{StreamError, TokenStream};
pub use token::{Token, TokenKind, TokenSource, VecSource};
pub use trace::{trace_stream, TraceError};
