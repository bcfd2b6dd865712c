//! Table-driven matcher
//!
//!     Interprets an [`EncodedTable`] against a stream of target-language tokens whose kinds are
//!     terminal ids, and builds an [`Ast`].
//!
//! Matching A Rule
//!
//!     `match_rule(kind, is_final)` finds the rule record of `kind` and builds a cache with one
//!     line per alternative. Lines are driven in declaration order. A line is walked symbol by
//!     symbol: a terminal must equal the current token's kind and consumes it; a non-terminal is
//!     matched by a nested `match_rule`. The first line to reach its end wins, which makes the
//!     choice between alternatives ordered: an earlier alternative that matches always shadows
//!     a later one.
//!
//!     A line that fails is eliminated (score -1) and the stream is rewound to the checkpoint
//!     taken when the rule was entered, so the next line starts from the same token. On success
//!     the checkpoint is released and the stream is committed; enclosing rules keep their own
//!     checkpoints, so they can still rewind past a committed inner match.
//!
//! Failure
//!
//!     When every line is eliminated the rule fails. A rule matched as the final alternative,
//!     meaning no enclosing rule has another line left to try, raises a syntax error instead of
//!     returning the failure. The error points at the furthest token any line reached and
//!     lists the terminals expected there.
//!
//!     Left recursion would loop forever, so a line that enters a rule at the stream position
//!     where that same rule is already being matched simply fails. Nesting deeper than
//!     [`MatchOptions::max_depth`] is a fatal error.

use crate::sapcc::encoding::{EncodedTable, RuleRecord};
use crate::sapcc::grammar::{is_terminal_id, Grammar, SymbolId};
use crate::sapcc::range::Location;
use crate::sapcc::stream::{Checkpoint, StreamError, TokenStream};
use crate::sapcc::token::{Token, TokenKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    /// Deepest rule nesting allowed before matching gives up
    pub max_depth: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("syntax error: {location}: unexpected {found}{}", expected_list(.expected))]
    Syntax {
        location: Location,
        found: String,
        expected: Vec<String>,
    },
    #[error("fatal: no rule record for non-terminal {id}")]
    UnknownRule { id: SymbolId },
    #[error("fatal: the rule table is empty")]
    EmptyTable,
    #[error("fatal: rules nested deeper than {limit} at {location}")]
    RecursionLimit { limit: usize, location: Location },
    #[error(transparent)]
    Stream(#[from] StreamError),
}

fn expected_list(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expected {}", expected.join(" or "))
    }
}

/// A matched rule: which non-terminal, which of its alternatives, and what it matched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ast {
    pub kind: SymbolId,
    pub alternative: usize,
    pub children: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AstNode {
    Rule(Ast),
    Token(Token<u16>),
}

impl Ast {
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every token under this node, in input order
    pub fn tokens(&self) -> Vec<&Token<u16>> {
        let mut tokens = Vec::new();
        self.collect_tokens(&mut tokens);
        tokens
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token<u16>>) {
        for child in &self.children {
            match child {
                AstNode::Rule(ast) => ast.collect_tokens(out),
                AstNode::Token(token) => out.push(token),
            }
        }
    }
}

/// Progress of one alternative
#[derive(Debug)]
struct CacheLine {
    symbols: Vec<SymbolId>,
    /// Symbols matched so far, -1 once eliminated
    score: i32,
    match_index: usize,
}

impl CacheLine {
    fn is_viable(&self) -> bool {
        self.score >= 0
    }
}

/// One line per alternative of the rule being matched
#[derive(Debug)]
struct Cache {
    lines: Vec<CacheLine>,
}

impl Cache {
    fn new(record: &RuleRecord<'_>) -> Self {
        Self {
            lines: record
                .alternatives()
                .map(|symbols| CacheLine {
                    symbols: symbols.to_vec(),
                    score: 0,
                    match_index: 0,
                })
                .collect(),
        }
    }

    fn is_last_viable(&self, index: usize) -> bool {
        self.lines[index + 1..].iter().all(|line| !line.is_viable())
    }
}

/// The furthest point any line got to before a terminal mismatched
#[derive(Debug)]
struct Failure {
    position: usize,
    token: Token<u16>,
    expected: Vec<SymbolId>,
}

/// State shared by all rules of one top-level match
#[derive(Debug, Default)]
struct MatchState {
    depth: usize,
    /// (rule, stream position) of every rule being matched
    active: HashSet<(SymbolId, usize)>,
    furthest: Option<Failure>,
}

impl MatchState {
    fn note_mismatch(&mut self, position: usize, token: &Token<u16>, expected: SymbolId) {
        if let Some(failure) = &mut self.furthest {
            if failure.position > position {
                return;
            }
            if failure.position == position {
                if !failure.expected.contains(&expected) {
                    failure.expected.push(expected);
                }
                return;
            }
        }
        self.furthest = Some(Failure {
            position,
            token: token.clone(),
            expected: vec![expected],
        });
    }
}

pub struct Matcher<'t> {
    table: &'t EncodedTable,
    options: MatchOptions,
    names: HashMap<SymbolId, String>,
    /// Terminals whose text is kept in the AST; `None` keeps all text
    kept: Option<HashSet<SymbolId>>,
}

impl<'t> Matcher<'t> {
    pub fn new(table: &'t EncodedTable) -> Self {
        Self {
            table,
            options: MatchOptions::default(),
            names: HashMap::new(),
            kept: None,
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Keep token text only for these terminals
    pub fn with_kept(mut self, kept: impl IntoIterator<Item = SymbolId>) -> Self {
        self.kept = Some(kept.into_iter().collect());
        self
    }

    pub fn with_names(mut self, names: impl IntoIterator<Item = (SymbolId, String)>) -> Self {
        self.names.extend(names);
        self
    }

    /// Take symbol names and kept terminals from the grammar the table was encoded from
    pub fn with_grammar(self, grammar: &Grammar) -> Self {
        let names = grammar
            .terminals()
            .iter()
            .map(|t| (t.id, t.name.clone()))
            .chain(grammar.non_terminals().iter().map(|n| (n.id, n.name.clone())));
        let kept = grammar.terminals().iter().filter(|t| t.keep).map(|t| t.id);
        self.with_names(names).with_kept(kept)
    }

    /// Match the start symbol, the first rule record in the table
    pub fn parse(&self, stream: &mut TokenStream<u16>) -> Result<Ast, MatchError> {
        let start = self
            .table
            .records()
            .next()
            .ok_or(MatchError::EmptyTable)?
            .non_terminal();
        let mut state = MatchState::default();
        match self.match_in(stream, &mut state, start, true)? {
            Some(ast) => Ok(ast),
            None => Err(self.syntax_error(&state, stream)),
        }
    }

    /// Match the start symbol and require the input to end right after it
    pub fn parse_complete(&self, stream: &mut TokenStream<u16>) -> Result<Ast, MatchError> {
        let ast = self.parse(stream)?;
        let current = stream.current();
        if !current.kind.is_end() {
            return Err(MatchError::Syntax {
                location: current.location(),
                found: self.describe_token(current),
                expected: vec!["end of input".to_string()],
            });
        }
        Ok(ast)
    }

    /// Match non-terminal `kind` at the current token.
    ///
    /// Returns `Ok(None)` when no alternative matches, unless `is_final` is set, in which case
    /// the failure is a syntax error.
    pub fn match_rule(
        &self,
        stream: &mut TokenStream<u16>,
        kind: SymbolId,
        is_final: bool,
    ) -> Result<Option<Ast>, MatchError> {
        let mut state = MatchState::default();
        self.match_in(stream, &mut state, kind, is_final)
    }

    fn match_in(
        &self,
        stream: &mut TokenStream<u16>,
        state: &mut MatchState,
        kind: SymbolId,
        is_final: bool,
    ) -> Result<Option<Ast>, MatchError> {
        let record = self
            .table
            .find_rule(kind)
            .ok_or(MatchError::UnknownRule { id: kind })?;

        if state.depth >= self.options.max_depth {
            return Err(MatchError::RecursionLimit {
                limit: self.options.max_depth,
                location: stream.current().location(),
            });
        }

        let key = (kind, stream.position());
        if !state.active.insert(key) {
            tracing::trace!(rule = kind, position = key.1, "left recursion, line fails");
            return Ok(None);
        }

        state.depth += 1;
        let result = self.match_record(stream, state, &record, is_final);
        state.depth -= 1;
        state.active.remove(&key);
        result
    }

    fn match_record(
        &self,
        stream: &mut TokenStream<u16>,
        state: &mut MatchState,
        record: &RuleRecord<'_>,
        is_final: bool,
    ) -> Result<Option<Ast>, MatchError> {
        let kind = record.non_terminal();
        let entry = stream.mark();
        tracing::trace!(rule = kind, position = entry.index(), "enter rule");

        // The checkpoint goes whatever the outcome, errors included
        let result = self.match_lines(stream, state, record, is_final, &entry);
        stream.release(entry);

        match result? {
            Some(ast) => {
                stream.commit();
                tracing::trace!(rule = kind, alternative = ast.alternative, "rule matched");
                Ok(Some(ast))
            }
            None => {
                tracing::trace!(rule = kind, is_final, "rule failed");
                if is_final {
                    return Err(self.syntax_error(state, stream));
                }
                Ok(None)
            }
        }
    }

    /// Drive the lines of a rule in order, rewinding to `entry` after each failed one
    fn match_lines(
        &self,
        stream: &mut TokenStream<u16>,
        state: &mut MatchState,
        record: &RuleRecord<'_>,
        is_final: bool,
        entry: &Checkpoint,
    ) -> Result<Option<Ast>, MatchError> {
        let mut cache = Cache::new(record);

        for index in 0..cache.lines.len() {
            let line_final = is_final && cache.is_last_viable(index);
            let mut children = Vec::new();
            let matched = self.match_line(
                stream,
                state,
                &mut cache.lines[index],
                line_final,
                &mut children,
            )?;

            if matched {
                return Ok(Some(Ast {
                    kind: record.non_terminal(),
                    alternative: index,
                    children,
                }));
            }
            stream.rewind_to(entry)?;
        }
        Ok(None)
    }

    /// Walk one line to its end or to its first mismatch
    fn match_line(
        &self,
        stream: &mut TokenStream<u16>,
        state: &mut MatchState,
        line: &mut CacheLine,
        is_final: bool,
        children: &mut Vec<AstNode>,
    ) -> Result<bool, MatchError> {
        while let Some(&symbol) = line.symbols.get(line.match_index) {
            if is_terminal_id(symbol) {
                let token = stream.current();
                if token.kind != symbol {
                    state.note_mismatch(stream.position(), token, symbol);
                    line.score = -1;
                    return Ok(false);
                }
                children.push(AstNode::Token(self.retain(token)));
                stream.advance();
            } else {
                match self.match_in(stream, state, symbol, is_final)? {
                    Some(ast) => children.push(AstNode::Rule(ast)),
                    None => {
                        line.score = -1;
                        return Ok(false);
                    }
                }
            }
            line.match_index += 1;
            line.score += 1;
        }
        Ok(true)
    }

    fn retain(&self, token: &Token<u16>) -> Token<u16> {
        let mut token = token.clone();
        if let Some(kept) = &self.kept {
            if !kept.contains(&token.kind) {
                token.text.clear();
            }
        }
        token
    }

    fn syntax_error(&self, state: &MatchState, stream: &TokenStream<u16>) -> MatchError {
        let (token, expected) = match &state.furthest {
            Some(failure) => (&failure.token, failure.expected.as_slice()),
            None => (stream.current(), &[][..]),
        };
        MatchError::Syntax {
            location: token.location(),
            found: self.describe_token(token),
            expected: expected.iter().map(|&id| self.symbol_name(id)).collect(),
        }
    }

    pub fn symbol_name(&self, id: SymbolId) -> String {
        match self.names.get(&id) {
            Some(name) => name.clone(),
            None if id == u16::END_OF_INPUT => "end of input".to_string(),
            None => id.to_string(),
        }
    }

    fn describe_token(&self, token: &Token<u16>) -> String {
        if token.kind.is_end() {
            return "end of input".to_string();
        }
        let name = self.symbol_name(token.kind);
        if token.text.is_empty() {
            name
        } else {
            format!("{} '{}'", name, token.text)
        }
    }

    /// Indented outline of an AST, one node per line
    pub fn render(&self, ast: &Ast) -> String {
        let mut out = String::new();
        self.render_node(ast, 0, &mut out);
        out
    }

    fn render_node(&self, ast: &Ast, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let _ = writeln!(
            out,
            "{}{} #{}",
            indent,
            self.symbol_name(ast.kind),
            ast.alternative
        );
        for child in &ast.children {
            match child {
                AstNode::Rule(inner) => self.render_node(inner, depth + 1, out),
                AstNode::Token(token) if token.text.is_empty() => {
                    let _ = writeln!(out, "{}  {}", indent, self.symbol_name(token.kind));
                }
                AstNode::Token(token) => {
                    let _ = writeln!(
                        out,
                        "{}  {} {:?}",
                        indent,
                        self.symbol_name(token.kind),
                        token.text
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sapcc::testing::factories::mk_stream;

    // x : 500 501 | 500 502
    fn backtrack_table() -> EncodedTable {
        EncodedTable::from_words(vec![1, 10, 1000, 100, 2, 2, 500, 501, 2, 500, 502]).unwrap()
    }

    #[test]
    fn test_cache_from_record() {
        let table = backtrack_table();
        let record = table.find_rule(1000).unwrap();
        let cache = Cache::new(&record);
        assert_eq!(cache.lines.len(), 2);
        assert_eq!(cache.lines[1].symbols, vec![500, 502]);
        assert!(cache.lines.iter().all(|l| l.score == 0 && l.match_index == 0));
        assert!(!cache.is_last_viable(0));
        assert!(cache.is_last_viable(1));
    }

    #[test]
    fn test_backtracks_to_second_alternative() {
        let table = backtrack_table();
        let matcher = Matcher::new(&table);
        let mut stream = mk_stream(&[500, 502]);

        let ast = matcher.match_rule(&mut stream, 1000, true).unwrap().unwrap();
        assert_eq!(ast.alternative, 1);
        assert_eq!(ast.len(), 2);
        assert!(stream.current().kind.is_end());
    }

    #[test]
    fn test_non_final_failure_rewinds() {
        let table = backtrack_table();
        let matcher = Matcher::new(&table);
        let mut stream = mk_stream(&[500, 503]);

        assert!(matcher.match_rule(&mut stream, 1000, false).unwrap().is_none());
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_final_failure_reports_furthest_token() {
        let table = backtrack_table();
        let matcher = Matcher::new(&table).with_names(vec![
            (501, "b".to_string()),
            (502, "c".to_string()),
            (503, "d".to_string()),
        ]);
        let mut stream = mk_stream(&[500, 503]);

        let err = matcher.match_rule(&mut stream, 1000, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: test:1:5: unexpected d 't1', expected b or c"
        );
    }

    #[test]
    fn test_syntax_error_leaves_no_checkpoint_behind() {
        // x : 500 y ; y : 501
        let table = EncodedTable::from_words(vec![
            2, 7, 1000, 100, 1, 2, 500, 1001, 6, 1001, 100, 1, 1, 501,
        ])
        .unwrap();
        let matcher = Matcher::new(&table);
        let mut stream = mk_stream(&[500, 502, 503, 503, 503]);

        assert!(matcher.match_rule(&mut stream, 1000, true).is_err());
        assert_eq!(stream.position(), 1);

        stream.advance();
        stream.advance();
        stream.commit();
        assert_eq!(stream.buffered().count(), 1);
        stream.rewind();
        assert_eq!(stream.position(), 3);
    }

    #[test]
    fn test_unknown_rule_is_fatal() {
        let table = backtrack_table();
        let matcher = Matcher::new(&table);
        let mut stream = mk_stream(&[500]);
        let err = matcher.match_rule(&mut stream, 1005, true).unwrap_err();
        assert!(matches!(err, MatchError::UnknownRule { id: 1005 }));
    }

    #[test]
    fn test_left_recursion_falls_through() {
        // e : e 501 | 500
        let table = EncodedTable::from_words(vec![1, 9, 1000, 100, 2, 2, 1000, 501, 1, 500]).unwrap();
        let matcher = Matcher::new(&table);
        let mut stream = mk_stream(&[500, 501]);

        let ast = matcher.match_rule(&mut stream, 1000, false).unwrap().unwrap();
        assert_eq!(ast.alternative, 1);
        assert_eq!(stream.current().kind, 501);
    }

    #[test]
    fn test_recursion_limit() {
        // r : 500 r | 500
        let table = EncodedTable::from_words(vec![1, 9, 1000, 100, 2, 2, 500, 1000, 1, 500]).unwrap();
        let matcher = Matcher::new(&table).with_options(MatchOptions { max_depth: 3 });

        let mut shallow = mk_stream(&[500, 500]);
        assert!(matcher.parse(&mut shallow).is_ok());

        let mut deep = mk_stream(&[500, 500, 500]);
        let err = matcher.parse(&mut deep).unwrap_err();
        assert!(matches!(err, MatchError::RecursionLimit { limit: 3, .. }));
    }

    #[test]
    fn test_kept_text() {
        let table = backtrack_table();
        let matcher = Matcher::new(&table).with_kept([502]);
        let mut stream = mk_stream(&[500, 502]);
        let ast = matcher.parse(&mut stream).unwrap();
        let texts: Vec<&str> = ast.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["", "t1"]);
    }

    #[test]
    fn test_parse_complete_rejects_trailing_tokens() {
        let table = backtrack_table();
        let matcher = Matcher::new(&table);
        let mut stream = mk_stream(&[500, 501, 500]);
        let err = matcher.parse_complete(&mut stream).unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: test:1:9: unexpected 500 't2', expected end of input"
        );
    }

    #[test]
    fn test_empty_table() {
        let table = EncodedTable::from_words(vec![0]).unwrap();
        let mut stream = mk_stream(&[500]);
        let err = Matcher::new(&table).parse(&mut stream).unwrap_err();
        assert!(matches!(err, MatchError::EmptyTable));
    }
}
