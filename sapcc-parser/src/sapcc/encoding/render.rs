//! Table rendering
//!
//!     Generated parsers embed the table as a C array. With a grammar at hand, ids are written as
//!     the `_TOK_<name>` and `_nterm_<name>` enumerators emitted by [`symbol_enums`], which keeps
//!     the generated source readable; without one, plain numbers are written.

use super::table::EncodedTable;
use crate::sapcc::grammar::{is_terminal_id, Grammar, SymbolId};
use serde::Serialize;
use std::fmt::Write as _;

/// Enumerator name of a symbol id as used in generated C source
pub fn symbol_constant(grammar: &Grammar, id: SymbolId) -> Option<String> {
    let name = grammar.symbol_name(id)?;
    Some(if is_terminal_id(id) {
        format!("_TOK_{}", name)
    } else {
        format!("_nterm_{}", name)
    })
}

fn id_text(grammar: Option<&Grammar>, id: SymbolId) -> String {
    grammar
        .and_then(|g| symbol_constant(g, id))
        .unwrap_or_else(|| id.to_string())
}

/// C enums for the terminal and non-terminal ids
pub fn symbol_enums(grammar: &Grammar) -> String {
    let mut out = String::from("typedef enum {\n    _TOK_END_OF_INPUT = 0,\n");
    for term in grammar.terminals() {
        let _ = writeln!(out, "    _TOK_{} = {},", term.name, term.id);
    }
    out.push_str("} TokenType;\n\ntypedef enum {\n");
    for nterm in grammar.non_terminals() {
        let _ = writeln!(out, "    _nterm_{} = {},", nterm.name, nterm.id);
    }
    out.push_str("} NonTerminalType;\n");
    out
}

/// The table as a C array definition named `name`
pub fn c_array(table: &EncodedTable, grammar: Option<&Grammar>, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// parser table encoding");
    let _ = writeln!(out, "static const uint16_t {}[] = {{", name);
    let _ = writeln!(out, "    {},", table.rule_count());

    for record in table.records() {
        let _ = writeln!(out);
        let _ = writeln!(out, "    {},", record.words().len());
        let _ = writeln!(out, "    {},", id_text(grammar, record.non_terminal()));
        let _ = writeln!(out, "    {},", record.precedence());
        let _ = writeln!(out, "    {},", record.alternative_count());
        for alternative in record.alternatives() {
            let mut line = vec![alternative.len().to_string()];
            line.extend(alternative.iter().map(|&id| id_text(grammar, id)));
            let _ = writeln!(out, "        {},", line.join(", "));
        }
    }

    out.push_str("};\n");
    out
}

/// Whitespace-separated words, one rule record per line
pub fn plain_words(table: &EncodedTable) -> String {
    let mut out = format!("{}\n", table.rule_count());
    for record in table.records() {
        let words: Vec<String> = record.words().iter().map(u16::to_string).collect();
        out.push_str(&words.join(" "));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    non_terminal: SymbolId,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    precedence: u16,
    alternatives: Vec<&'a [SymbolId]>,
}

#[derive(Serialize)]
struct JsonTable<'a> {
    words: &'a [u16],
    records: Vec<JsonRecord<'a>>,
}

/// The table as pretty-printed JSON: the raw words plus a decoded view of every record
pub fn json(table: &EncodedTable, grammar: Option<&Grammar>) -> Result<String, serde_json::Error> {
    let records = table
        .records()
        .map(|record| JsonRecord {
            non_terminal: record.non_terminal(),
            name: grammar.and_then(|g| g.symbol_name(record.non_terminal())),
            precedence: record.precedence(),
            alternatives: record.alternatives().collect(),
        })
        .collect();
    serde_json::to_string_pretty(&JsonTable {
        words: table.words(),
        records,
    })
}
