//! Grammar parser
//!
//!     A recursive-descent state machine over [`TokenType`] tokens. The top level expects a
//!     directive or a standalone rule; each directive hands off to its own method, which reads
//!     the construct to its end and returns to the top level.
//!
//!         %tokens SYM SYM@ ... %end
//!         %grammar (name {pre} (: SYM* {action})+ ; {post})* %end
//!         name (: SYM* {action})+ [;]
//!         %header {..}   %source {..}   %verbosity N   %name ".."   %prefix ".."
//!         %include "path"
//!
//! Recovery
//!
//!     Any token a state does not expect is reported, consumed, and the method bails out with
//!     [`Reported`]. The top level then carries on with the next token. A directive other than
//!     `%end` is reported but not consumed, so the top level resumes at the construct it opens. An `Error` token from the
//!     scanner is reported as a scan error instead of a syntax error. Once more errors than the
//!     configured ceiling were reported, parsing stops and the compilation is marked aborted.
//!
//!     A non-terminal is only added to the model once all of its alternatives were read, so a
//!     rule with a syntax error in it leaves no trace in the grammar. The one exception is a
//!     keep marker on a rule symbol: it is reported and the symbol is read without it.

use super::{Compilation, CompileOptions};
use crate::sapcc::diagnostics::{DiagnosticKind, Diagnostics};
use crate::sapcc::grammar::{Grammar, PatternElement, Rule, MAX_TERMINALS};
use crate::sapcc::range::Location;
use crate::sapcc::scanning::{describe_error, GrammarScanner, TokenType};
use crate::sapcc::stream::TokenStream;
use crate::sapcc::token::Token;
use std::path::{Path, PathBuf};

/// How deep `%include` may nest
pub const MAX_INCLUDE_DEPTH: usize = 32;

const KEEP_MARKER: char = '@';

/// The current construct was abandoned after an error was reported
#[derive(Debug)]
struct Reported;

type Step<T = ()> = Result<T, Reported>;

/// A non-terminal whose alternatives are still being read
struct PendingRule {
    name: String,
    location: Location,
    pre_match: String,
    post_match: String,
    rules: Vec<Rule>,
}

impl PendingRule {
    fn new(token: &Token<TokenType>) -> Self {
        Self {
            name: token.text.clone(),
            location: token.location(),
            pre_match: String::new(),
            post_match: String::new(),
            rules: Vec::new(),
        }
    }
}

pub struct GrammarParser<'a> {
    stream: TokenStream<TokenType>,
    options: &'a CompileOptions,
    grammar: Grammar,
    diagnostics: Diagnostics,
    terminal_limit_reported: bool,
}

impl<'a> GrammarParser<'a> {
    pub fn new(stream: TokenStream<TokenType>, options: &'a CompileOptions) -> Self {
        Self {
            stream,
            options,
            grammar: Grammar::new(),
            diagnostics: Diagnostics::new(),
            terminal_limit_reported: false,
        }
    }

    /// Read the whole token stream into a grammar model
    pub fn parse(mut self) -> Compilation {
        let mut aborted = false;

        loop {
            let token = self.stream.current().clone();
            tracing::trace!(kind = %token.kind, line = token.line, col = token.col, "top level");

            let step = match token.kind {
                TokenType::EndOfInput => break,
                TokenType::Tokens => self.parse_tokens(),
                TokenType::Grammar => self.parse_grammar_block(),
                TokenType::Symbol => self.parse_standalone_rule(),
                TokenType::Header => self.parse_code(|g, code| g.headers.push(code)),
                TokenType::Source => self.parse_code(|g, code| g.sources.push(code)),
                TokenType::Verbosity => self.parse_verbosity(),
                TokenType::Name => self.parse_string(|g, s| g.name = Some(s)),
                TokenType::Prefix => self.parse_string(|g, s| g.prefix = Some(s)),
                TokenType::Include => self.parse_include(),
                _ => Err(self.unexpected("a directive or a rule definition")),
            };

            // Nothing here is ever rewound
            self.stream.commit();

            if step.is_err() && self.diagnostics.error_count() > self.options.max_errors {
                let count = self.diagnostics.error_count();
                self.diagnostics.error(
                    DiagnosticKind::Fatal,
                    Some(self.stream.current().location()),
                    format!("too many errors ({}), giving up", count),
                );
                aborted = true;
                break;
            }
        }

        Compilation {
            grammar: self.grammar,
            diagnostics: self.diagnostics,
            aborted,
        }
    }

    /// Report the current token as unexpected and skip it, unless it opens a construct
    fn unexpected(&mut self, expected: &str) -> Reported {
        let token = self.stream.current().clone();
        match token.kind {
            TokenType::Error => {
                self.diagnostics.error(
                    DiagnosticKind::Scan,
                    Some(token.location()),
                    describe_error(&token.text),
                );
            }
            TokenType::Symbol | TokenType::Number => {
                self.diagnostics.error(
                    DiagnosticKind::Syntax,
                    Some(token.location()),
                    format!("expected {}, but got a {} '{}'", expected, token.kind, token.text),
                );
            }
            _ => {
                self.diagnostics.error(
                    DiagnosticKind::Syntax,
                    Some(token.location()),
                    format!("expected {}, but got a {}", expected, token.kind),
                );
            }
        }
        if !token.kind.is_directive() || token.kind == TokenType::End {
            self.stream.advance();
        }
        Reported
    }

    /// Consume a token of `kind` or report it
    fn expect(&mut self, kind: TokenType, expected: &str) -> Step<Token<TokenType>> {
        if self.stream.current().kind == kind {
            let token = self.stream.current().clone();
            self.stream.advance();
            Ok(token)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consume a symbol that names a rule or a rule element.
    ///
    /// A keep marker is reported and dropped, and parsing goes on with the bare name.
    fn expect_rule_symbol(&mut self, expected: &str) -> Step<Token<TokenType>> {
        let mut token = self.expect(TokenType::Symbol, expected)?;
        if let Some(name) = token.text.strip_suffix(KEEP_MARKER) {
            let name = name.to_string();
            self.diagnostics.error(
                DiagnosticKind::Syntax,
                Some(token.location()),
                format!(
                    "the keep marker '{}' is only allowed in %tokens: {}",
                    KEEP_MARKER, token.text
                ),
            );
            token.text = name;
        }
        Ok(token)
    }

    fn parse_tokens(&mut self) -> Step {
        self.stream.advance();
        loop {
            let token = self.stream.current().clone();
            match token.kind {
                TokenType::Symbol => {
                    self.declare_terminal(&token);
                    self.stream.advance();
                }
                TokenType::End => {
                    self.stream.advance();
                    return Ok(());
                }
                _ => return Err(self.unexpected("a terminal SYMBOL or %end")),
            }
        }
    }

    fn declare_terminal(&mut self, token: &Token<TokenType>) {
        let (name, keep) = match token.text.strip_suffix(KEEP_MARKER) {
            Some(name) => (name, true),
            None => (token.text.as_str(), false),
        };
        match self.grammar.add_terminal(name, keep, token.location()) {
            Some(id) => tracing::debug!(name, keep, id, "terminal"),
            None if !self.terminal_limit_reported => {
                self.terminal_limit_reported = true;
                self.diagnostics.error(
                    DiagnosticKind::Semantic,
                    Some(token.location()),
                    format!("too many terminals, at most {} can be declared", MAX_TERMINALS),
                );
            }
            None => {}
        }
    }

    fn parse_grammar_block(&mut self) -> Step {
        self.stream.advance();
        loop {
            match self.stream.current().kind {
                TokenType::Symbol => {
                    let name = self.expect_rule_symbol("a non-terminal SYMBOL")?;
                    let mut pending = PendingRule::new(&name);
                    pending.pre_match = self.expect(TokenType::Block, "a pre-match code BLOCK")?.text;
                    self.parse_alternatives(&mut pending)?;
                    self.expect(TokenType::Semi, "a ':' or a ';'")?;
                    pending.post_match = self.expect(TokenType::Block, "a post-match code BLOCK")?.text;
                    self.define(pending);
                }
                TokenType::End => {
                    self.stream.advance();
                    return Ok(());
                }
                _ => return Err(self.unexpected("a non-terminal SYMBOL or %end")),
            }
        }
    }

    fn parse_standalone_rule(&mut self) -> Step {
        let name = self.expect_rule_symbol("a rule name")?;
        let mut pending = PendingRule::new(&name);
        if self.stream.current().kind != TokenType::Colon {
            return Err(self.unexpected("a ':'"));
        }
        self.parse_alternatives(&mut pending)?;
        if self.stream.current().kind == TokenType::Semi {
            self.stream.advance();
        }
        self.define(pending);
        Ok(())
    }

    /// Read `: SYM* {action}` alternatives while the next token is a ':'
    fn parse_alternatives(&mut self, pending: &mut PendingRule) -> Step {
        while self.stream.current().kind == TokenType::Colon {
            self.stream.advance();
            let mut rule = Rule::default();
            loop {
                match self.stream.current().kind {
                    TokenType::Symbol => {
                        let symbol = self.expect_rule_symbol("a rule SYMBOL")?;
                        rule.elements.push(PatternElement {
                            location: symbol.location(),
                            name: symbol.text,
                        });
                    }
                    TokenType::Block => {
                        rule.action = self.stream.current().text.clone();
                        self.stream.advance();
                        break;
                    }
                    _ => return Err(self.unexpected("a rule SYMBOL or a code BLOCK")),
                }
            }
            pending.rules.push(rule);
        }
        Ok(())
    }

    fn define(&mut self, pending: PendingRule) {
        let Some(id) = self.grammar.add_non_terminal(&pending.name, pending.location.clone()) else {
            self.diagnostics.error(
                DiagnosticKind::Semantic,
                Some(pending.location),
                format!("too many non-terminals, cannot define {}", pending.name),
            );
            return;
        };
        tracing::debug!(name = %pending.name, id, alternatives = pending.rules.len(), "non-terminal");
        if let Some(nterm) = self.grammar.non_terminal_mut(id) {
            nterm.rules = pending.rules;
            nterm.pre_match = pending.pre_match;
            nterm.post_match = pending.post_match;
        }
    }

    fn parse_code(&mut self, store: impl FnOnce(&mut Grammar, String)) -> Step {
        self.stream.advance();
        let block = self.expect(TokenType::Block, "a code BLOCK")?;
        store(&mut self.grammar, block.text);
        Ok(())
    }

    fn parse_string(&mut self, store: impl FnOnce(&mut Grammar, String)) -> Step {
        self.stream.advance();
        let string = self.expect(TokenType::QuotedString, "a STRING")?;
        store(&mut self.grammar, string.text);
        Ok(())
    }

    fn parse_verbosity(&mut self) -> Step {
        self.stream.advance();
        let number = self.expect(TokenType::Number, "a NUMBER")?;
        match number.text.parse::<u32>() {
            Ok(level) => {
                self.grammar.verbosity = level;
                Ok(())
            }
            Err(_) => {
                self.diagnostics.error(
                    DiagnosticKind::Syntax,
                    Some(number.location()),
                    format!("verbosity out of range: {}", number.text),
                );
                Err(Reported)
            }
        }
    }

    /// Open an included grammar on the stream.
    ///
    /// The file is opened while the path string is still the current token, so the token
    /// after it is scanned from the included file and not from the including one.
    fn parse_include(&mut self) -> Step {
        let path_token = self.stream.advance().clone();
        if path_token.kind != TokenType::QuotedString {
            return Err(self.unexpected("a STRING"));
        }

        if self.stream.depth() >= MAX_INCLUDE_DEPTH {
            self.diagnostics.error(
                DiagnosticKind::Syntax,
                Some(path_token.location()),
                format!("includes nested deeper than {}", MAX_INCLUDE_DEPTH),
            );
            self.stream.advance();
            return Err(Reported);
        }

        let path = include_path(&path_token.source, &path_token.text);
        match GrammarScanner::from_file(&path) {
            Ok(scanner) => {
                self.stream.open(scanner);
                self.stream.advance();
                Ok(())
            }
            Err(err) => {
                self.diagnostics
                    .error(DiagnosticKind::Syntax, Some(path_token.location()), err.to_string());
                self.stream.advance();
                Err(Reported)
            }
        }
    }
}

/// Resolve an include path relative to the directory of the including file
fn include_path(including: &str, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match Path::new(including).parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
