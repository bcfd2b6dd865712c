//! Grammar model
//!
//!     The in-memory form of a compiled grammar description: terminals, non-terminals with their
//!     alternatives, and the code blobs and settings copied verbatim into generated output. The
//!     grammar parser is its only writer; the table encoder and the dump only read it.
//!
//! Symbol Ids
//!
//!     Terminals are numbered from [`BASE_TERM`] and non-terminals from [`BASE_NTERM`], both in
//!     declaration order. Every terminal id is below every non-terminal id, so one comparison
//!     against [`BASE_NTERM`] classifies an id. Id 0 is reserved for end of input.
//!
//!     Alternatives hold symbol names, not ids: a rule may reference a symbol declared further
//!     down, and names are only resolved once the whole grammar was read.

use crate::sapcc::range::Location;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Write as _};

pub type SymbolId = u16;

/// First terminal id
pub const BASE_TERM: SymbolId = 500;
/// First non-terminal id, also the upper bound of the terminal id space
pub const BASE_NTERM: SymbolId = 1000;
/// Precedence of a non-terminal that states none
pub const NO_PRECEDENCE: SymbolId = 100;
/// How many terminals fit below [`BASE_NTERM`]
pub const MAX_TERMINALS: usize = (BASE_NTERM - BASE_TERM) as usize;

/// A resolved symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolRef {
    Terminal(SymbolId),
    NonTerminal(SymbolId),
}

impl SymbolRef {
    /// Classify a raw id from an encoded table
    pub fn from_id(id: SymbolId) -> Self {
        if is_terminal_id(id) {
            SymbolRef::Terminal(id)
        } else {
            SymbolRef::NonTerminal(id)
        }
    }

    pub fn id(&self) -> SymbolId {
        match self {
            SymbolRef::Terminal(id) | SymbolRef::NonTerminal(id) => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SymbolRef::Terminal(_))
    }
}

pub fn is_terminal_id(id: SymbolId) -> bool {
    id < BASE_NTERM
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Terminal {
    pub name: String,
    /// The token text is preserved in the AST
    pub keep: bool,
    pub id: SymbolId,
    pub ref_count: usize,
    pub location: Location,
}

/// One symbol occurrence in an alternative
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternElement {
    pub name: String,
    pub location: Location,
}

/// One alternative of a non-terminal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rule {
    pub elements: Vec<PatternElement>,
    /// Action code, copied verbatim
    pub action: String,
}

impl Rule {
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonTerminal {
    pub name: String,
    pub id: SymbolId,
    pub precedence: SymbolId,
    pub ref_count: usize,
    pub rules: Vec<Rule>,
    /// Code run before matching, only set for rules from a `%grammar` block
    pub pre_match: String,
    /// Code run after matching, only set for rules from a `%grammar` block
    pub post_match: String,
    pub location: Location,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Grammar {
    terminals: Vec<Terminal>,
    non_terminals: Vec<NonTerminal>,
    pub headers: Vec<String>,
    pub sources: Vec<String>,
    pub verbosity: u32,
    pub name: Option<String>,
    pub prefix: Option<String>,
    /// First declaration of each name
    #[serde(skip)]
    index: HashMap<String, SymbolRef>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a terminal. Returns `None` once the terminal id space is exhausted.
    ///
    /// Repeated names still get their own id; the validation reports them.
    pub fn add_terminal(&mut self, name: &str, keep: bool, location: Location) -> Option<SymbolId> {
        if self.terminals.len() >= MAX_TERMINALS {
            return None;
        }
        let id = BASE_TERM + self.terminals.len() as SymbolId;
        self.index
            .entry(name.to_string())
            .or_insert(SymbolRef::Terminal(id));
        self.terminals.push(Terminal {
            name: name.to_string(),
            keep,
            id,
            ref_count: 0,
            location,
        });
        Some(id)
    }

    /// Declare a non-terminal without alternatives. Returns `None` once the id space is exhausted.
    pub fn add_non_terminal(&mut self, name: &str, location: Location) -> Option<SymbolId> {
        let offset = SymbolId::try_from(self.non_terminals.len()).ok()?;
        let id = BASE_NTERM.checked_add(offset)?;
        self.index
            .entry(name.to_string())
            .or_insert(SymbolRef::NonTerminal(id));
        self.non_terminals.push(NonTerminal {
            name: name.to_string(),
            id,
            precedence: NO_PRECEDENCE,
            ref_count: 0,
            rules: Vec::new(),
            pre_match: String::new(),
            post_match: String::new(),
            location,
        });
        Some(id)
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn non_terminals(&self) -> &[NonTerminal] {
        &self.non_terminals
    }

    pub(crate) fn terminals_mut(&mut self) -> &mut [Terminal] {
        &mut self.terminals
    }

    pub(crate) fn non_terminals_mut(&mut self) -> &mut [NonTerminal] {
        &mut self.non_terminals
    }

    /// Resolve a name to the first symbol declared with it
    pub fn lookup(&self, name: &str) -> Option<SymbolRef> {
        self.index.get(name).copied()
    }

    pub fn terminal(&self, id: SymbolId) -> Option<&Terminal> {
        let offset = id.checked_sub(BASE_TERM)?;
        self.terminals.get(offset as usize).filter(|_| is_terminal_id(id))
    }

    pub fn non_terminal(&self, id: SymbolId) -> Option<&NonTerminal> {
        let offset = id.checked_sub(BASE_NTERM)?;
        self.non_terminals.get(offset as usize)
    }

    pub fn non_terminal_mut(&mut self, id: SymbolId) -> Option<&mut NonTerminal> {
        let offset = id.checked_sub(BASE_NTERM)?;
        self.non_terminals.get_mut(offset as usize)
    }

    /// Name of the symbol with the given id
    pub fn symbol_name(&self, id: SymbolId) -> Option<&str> {
        match SymbolRef::from_id(id) {
            SymbolRef::Terminal(id) => self.terminal(id).map(|t| t.name.as_str()),
            SymbolRef::NonTerminal(id) => self.non_terminal(id).map(|n| n.name.as_str()),
        }
    }

    /// The first non-terminal declared
    pub fn start(&self) -> Option<&NonTerminal> {
        self.non_terminals.first()
    }

    /// Human-readable listing of everything the grammar holds
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut String) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(out, "NAME: {}", name)?;
        }
        if let Some(prefix) = &self.prefix {
            writeln!(out, "PREFIX: {}", prefix)?;
        }
        writeln!(out, "VERBOSITY: {}", self.verbosity)?;

        writeln!(out, "\nHEADERS:")?;
        for header in &self.headers {
            writeln!(out, "{}", header.trim())?;
        }
        writeln!(out, "\nSOURCES:")?;
        for source in &self.sources {
            writeln!(out, "{}", source.trim())?;
        }

        writeln!(out, "\nTERMINALS:")?;
        for term in &self.terminals {
            writeln!(
                out,
                "    {:<20} keep: {:<5}  id: {:<5}  refs: {}",
                term.name, term.keep, term.id, term.ref_count
            )?;
        }

        writeln!(out, "\nNON-TERMINALS:")?;
        for nterm in &self.non_terminals {
            writeln!(
                out,
                "{}  id: {}  refs: {}",
                nterm.name, nterm.id, nterm.ref_count
            )?;
            writeln!(out, "    pre-match: {}", nterm.pre_match.trim())?;
            writeln!(out, "    post-match: {}", nterm.post_match.trim())?;
            for rule in &nterm.rules {
                let symbols: Vec<&str> = rule.symbols().collect();
                writeln!(out, "    : {} {{{}}}", symbols.join(" "), rule.action)?;
            }
        }
        Ok(())
    }
}
