use super::table::EncodedTable;
use super::RECORD_HEADER_LEN;
use crate::sapcc::grammar::Grammar;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("fatal: rule {rule} references undefined symbol {symbol}")]
    UndefinedSymbol { rule: String, symbol: String },
    #[error("fatal: {what} of rule {rule} does not fit in 16 bits")]
    Overflow { rule: String, what: &'static str },
}

/// Encode the grammar into a rule table, one record per non-terminal in id order.
///
/// The result depends on nothing but the grammar, so encoding the same grammar twice yields
/// the same words.
pub fn encode(grammar: &Grammar) -> Result<EncodedTable, EncodeError> {
    let non_terminals = grammar.non_terminals();
    let count = fit(non_terminals.len(), "", "rule count")?;

    let mut words = vec![count];
    let mut offsets = Vec::with_capacity(non_terminals.len());

    for nterm in non_terminals {
        let start = words.len();
        offsets.push(start);

        words.push(0);
        words.push(nterm.id);
        words.push(nterm.precedence);
        words.push(fit(nterm.rules.len(), &nterm.name, "alternative count")?);

        for rule in &nterm.rules {
            words.push(fit(rule.elements.len(), &nterm.name, "alternative length")?);
            for element in &rule.elements {
                let symbol = grammar.lookup(&element.name).ok_or_else(|| {
                    EncodeError::UndefinedSymbol {
                        rule: nterm.name.clone(),
                        symbol: element.name.clone(),
                    }
                })?;
                words.push(symbol.id());
            }
        }

        let len = words.len() - start;
        debug_assert!(len >= RECORD_HEADER_LEN);
        words[start] = fit(len, &nterm.name, "record length")?;
        tracing::trace!(rule = %nterm.name, id = nterm.id, len, "encoded rule record");
    }

    tracing::debug!(rules = offsets.len(), words = words.len(), "encoded table");
    Ok(EncodedTable::from_parts(words, offsets))
}

fn fit(value: usize, rule: &str, what: &'static str) -> Result<u16, EncodeError> {
    u16::try_from(value).map_err(|_| EncodeError::Overflow {
        rule: rule.to_string(),
        what,
    })
}
