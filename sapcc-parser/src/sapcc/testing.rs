//! Testing helpers
//!
//! Factories for token sources and streams over terminal ids, and a few grammar helpers, so
//! unit and integration tests can state inputs as compactly as the grammar they exercise.

pub mod factories {
    use crate::sapcc::parsing::{compile_str, Compilation, CompileOptions};
    use crate::sapcc::range::Position;
    use crate::sapcc::stream::TokenStream;
    use crate::sapcc::token::{Token, VecSource};
    use std::sync::Arc;

    /// Tokens of the given kinds, one per column on line 1
    pub fn mk_tokens(name: &str, kinds: &[u16]) -> Vec<Token<u16>> {
        let source: Arc<str> = Arc::from(name);
        kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| {
                Token::new(
                    kind,
                    format!("t{}", i),
                    Arc::clone(&source),
                    Position::new(1, i * 4 + 1),
                )
            })
            .collect()
    }

    pub fn mk_source(name: &str, kinds: &[u16]) -> VecSource<u16> {
        VecSource::new(name, mk_tokens(name, kinds))
    }

    /// A stream named `test` over the given kinds
    pub fn mk_stream(kinds: &[u16]) -> TokenStream<u16> {
        TokenStream::new(mk_source("test", kinds))
    }

    /// Compile grammar text with default options
    pub fn compile(source: &str) -> Compilation {
        compile_str("test.sapcc", source, &CompileOptions::default())
    }

    /// Compile grammar text and fail the test on any error diagnostic
    pub fn compile_valid(source: &str) -> Compilation {
        let compilation = compile(source);
        assert!(
            compilation.is_valid(),
            "grammar has errors:\n{}",
            compilation.diagnostics
        );
        compilation
    }
}
