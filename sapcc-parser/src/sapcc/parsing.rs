//! Grammar compilation
//!
//!     Turns grammar description text into a validated [`Grammar`] model. Compilation runs in two
//!     phases that never interleave:
//!
//!         1. Parsing: a recursive-descent state machine over the grammar token stream. See the
//!            [parser](parser) module. Scan and syntax errors are reported, the offending token is
//!            skipped and parsing resumes at the top level.
//!         2. Validation: once the stream is exhausted, the model is checked for duplicate and
//!            undefined names, reference counts are computed and unused symbols are warned
//!            about. See the [validation](validation) module.
//!
//!     Every problem found ends up in the [`Diagnostics`] of the returned [`Compilation`]. Too
//!     many errors abort parsing and skip validation.

pub mod parser;
pub mod validation;

pub use parser::GrammarParser;

use crate::sapcc::diagnostics::Diagnostics;
use crate::sapcc::grammar::Grammar;
use crate::sapcc::scanning::{grammar_stream, GrammarScanner, TokenType};
use crate::sapcc::stream::{StreamError, TokenStream};
use std::path::Path;
use thiserror::Error;

/// Default number of errors tolerated before compilation gives up
pub const DEFAULT_MAX_ERRORS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Parsing aborts once more errors than this were reported
    pub max_errors: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Open(#[from] StreamError),
    #[error("compilation aborted after {errors} errors")]
    Aborted { errors: usize },
    #[error("grammar is invalid: {errors} error(s), {warnings} warning(s)")]
    Invalid { errors: usize, warnings: usize },
}

/// The outcome of compiling one grammar
#[derive(Debug)]
pub struct Compilation {
    pub grammar: Grammar,
    pub diagnostics: Diagnostics,
    /// Parsing stopped at the error ceiling; the model is incomplete and was not validated
    pub aborted: bool,
}

impl Compilation {
    /// True when no error was reported. Warnings don't count.
    pub fn is_valid(&self) -> bool {
        !self.aborted && !self.diagnostics.has_errors()
    }

    /// The grammar, if it may be encoded
    pub fn into_grammar(self) -> Result<Grammar, CompileError> {
        if self.aborted {
            return Err(CompileError::Aborted {
                errors: self.diagnostics.error_count(),
            });
        }
        if self.diagnostics.has_errors() {
            return Err(CompileError::Invalid {
                errors: self.diagnostics.error_count(),
                warnings: self.diagnostics.warning_count(),
            });
        }
        Ok(self.grammar)
    }
}

/// Compile grammar text; `name` is used in diagnostics and to resolve `%include` paths
pub fn compile_str(name: &str, source: &str, options: &CompileOptions) -> Compilation {
    compile_stream(grammar_stream(name, source), options)
}

/// Compile a grammar file. Only failing to open the file itself is an `Err`.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<Compilation, CompileError> {
    let scanner = GrammarScanner::from_file(path)?;
    Ok(compile_stream(TokenStream::new(scanner), options))
}

pub fn compile_stream(
    stream: TokenStream<TokenType>,
    options: &CompileOptions,
) -> Compilation {
    let mut compilation = GrammarParser::new(stream, options).parse();
    if !compilation.aborted {
        validation::validate(&mut compilation.grammar, &mut compilation.diagnostics);
    }
    tracing::debug!(
        errors = compilation.diagnostics.error_count(),
        warnings = compilation.diagnostics.warning_count(),
        aborted = compilation.aborted,
        "compiled grammar"
    );
    compilation
}
