//! Post-parse validation
//!
//!     Runs once over the finished model, in this order:
//!
//!         1. Duplicate names: every terminal is compared with every non-terminal, and repeated
//!            declarations within each kind are caught as well. One error per colliding pair.
//!         2. References: every symbol used in an alternative bumps the reference count of the
//!            symbol it names. A name nothing declares is an error.
//!         3. Unused symbols: a terminal or non-terminal nobody references gets a warning. The
//!            start symbol is exempt, nothing has to reference it.

use crate::sapcc::diagnostics::{DiagnosticKind, Diagnostics};
use crate::sapcc::grammar::{Grammar, SymbolRef, BASE_NTERM, BASE_TERM};
use crate::sapcc::range::Location;

pub fn validate(grammar: &mut Grammar, diagnostics: &mut Diagnostics) {
    check_duplicates(grammar, diagnostics);
    count_references(grammar, diagnostics);
    check_unused(grammar, diagnostics);
}

pub fn check_duplicates(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    tracing::debug!("check duplicates");
    let terminals = grammar.terminals();
    let non_terminals = grammar.non_terminals();

    for term in terminals {
        for nterm in non_terminals {
            if term.name == nterm.name {
                diagnostics.error(
                    DiagnosticKind::Semantic,
                    Some(nterm.location.clone()),
                    format!(
                        "terminal and non-terminal have the same name: {} (terminal declared at {})",
                        nterm.name, term.location
                    ),
                );
            }
        }
    }

    for (i, later) in terminals.iter().enumerate() {
        for earlier in &terminals[..i] {
            if earlier.name == later.name {
                redeclared(diagnostics, "terminal", &later.name, &later.location, &earlier.location);
            }
        }
    }

    for (i, later) in non_terminals.iter().enumerate() {
        for earlier in &non_terminals[..i] {
            if earlier.name == later.name {
                redeclared(diagnostics, "non-terminal", &later.name, &later.location, &earlier.location);
            }
        }
    }
}

fn redeclared(diagnostics: &mut Diagnostics, what: &str, name: &str, at: &Location, first: &Location) {
    diagnostics.error(
        DiagnosticKind::Semantic,
        Some(at.clone()),
        format!("{} {} declared more than once, first at {}", what, name, first),
    );
}

/// Count references of every symbol, resolving names to their first declaration
pub fn count_references(grammar: &mut Grammar, diagnostics: &mut Diagnostics) {
    tracing::debug!("count references");
    let mut resolved = Vec::new();

    for nterm in grammar.non_terminals() {
        for rule in &nterm.rules {
            for element in &rule.elements {
                match grammar.lookup(&element.name) {
                    Some(symbol) => resolved.push(symbol),
                    None => diagnostics.error(
                        DiagnosticKind::Semantic,
                        Some(element.location.clone()),
                        format!("undefined symbol {} in a rule of {}", element.name, nterm.name),
                    ),
                }
            }
        }
    }

    for symbol in resolved {
        match symbol {
            SymbolRef::Terminal(id) => {
                if let Some(term) = grammar.terminals_mut().get_mut(usize::from(id - BASE_TERM)) {
                    term.ref_count += 1;
                }
            }
            SymbolRef::NonTerminal(id) => {
                if let Some(nterm) = grammar.non_terminals_mut().get_mut(usize::from(id - BASE_NTERM)) {
                    nterm.ref_count += 1;
                }
            }
        }
    }
}

pub fn check_unused(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    tracing::debug!("check references");

    for term in grammar.terminals() {
        if term.ref_count == 0 {
            diagnostics.warning(
                DiagnosticKind::Semantic,
                Some(term.location.clone()),
                format!("terminal symbol \"{}\" has no references in grammar", term.name),
            );
        }
    }

    // The first non-terminal is the start symbol
    for nterm in grammar.non_terminals().iter().skip(1) {
        if nterm.ref_count == 0 {
            diagnostics.warning(
                DiagnosticKind::Semantic,
                Some(nterm.location.clone()),
                format!("non-terminal symbol \"{}\" has no references in grammar", nterm.name),
            );
        }
    }
}
