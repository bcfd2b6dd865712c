//! Reading encoded tables
//!
//! [`EncodedTable::from_words`] checks the layout once, so the accessors can walk records
//! without bounds surprises later.

use super::RECORD_HEADER_LEN;
use crate::sapcc::grammar::{is_terminal_id, SymbolId};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table is empty")]
    Empty,
    #[error("table truncated in rule record {record}: needs {needed} words, {available} left")]
    Truncated {
        record: usize,
        needed: usize,
        available: usize,
    },
    #[error("rule record {record} declares length {declared}, its alternatives need {actual}")]
    BadRecordLength {
        record: usize,
        declared: usize,
        actual: usize,
    },
    #[error("rule record {record} names {id}, which is not a non-terminal id")]
    NotANonTerminal { record: usize, id: SymbolId },
    #[error("{count} words follow the last rule record")]
    TrailingWords { count: usize },
}

/// A validated encoded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedTable {
    words: Vec<u16>,
    /// Offset of every rule record
    #[serde(skip)]
    offsets: Vec<usize>,
}

impl EncodedTable {
    /// Validate `words` as an encoded table
    pub fn from_words(words: Vec<u16>) -> Result<Self, TableError> {
        let count = usize::from(*words.first().ok_or(TableError::Empty)?);
        let mut offsets = Vec::with_capacity(count);
        let mut offset = 1;

        for record in 0..count {
            let available = words.len() - offset;
            if available < RECORD_HEADER_LEN {
                return Err(TableError::Truncated {
                    record,
                    needed: RECORD_HEADER_LEN,
                    available,
                });
            }
            let declared = usize::from(words[offset]);
            let id = words[offset + 1];
            if is_terminal_id(id) {
                return Err(TableError::NotANonTerminal { record, id });
            }

            let alternatives = usize::from(words[offset + 3]);
            let mut actual = RECORD_HEADER_LEN;
            for _ in 0..alternatives {
                let Some(&line_len) = words.get(offset + actual) else {
                    return Err(TableError::Truncated {
                        record,
                        needed: actual + 1,
                        available,
                    });
                };
                actual += 1 + usize::from(line_len);
            }
            if actual > available {
                return Err(TableError::Truncated {
                    record,
                    needed: actual,
                    available,
                });
            }
            if declared != actual {
                return Err(TableError::BadRecordLength {
                    record,
                    declared,
                    actual,
                });
            }

            offsets.push(offset);
            offset += actual;
        }

        if offset != words.len() {
            return Err(TableError::TrailingWords {
                count: words.len() - offset,
            });
        }
        Ok(Self { words, offsets })
    }

    /// Wrap words the encoder laid out itself
    pub(crate) fn from_parts(words: Vec<u16>, offsets: Vec<usize>) -> Self {
        Self { words, offsets }
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn into_words(self) -> Vec<u16> {
        self.words
    }

    pub fn rule_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn records(&self) -> impl Iterator<Item = RuleRecord<'_>> + '_ {
        self.offsets.iter().map(move |&offset| self.record_at(offset))
    }

    /// The record of non-terminal `id`, found by scanning the records in order
    pub fn find_rule(&self, id: SymbolId) -> Option<RuleRecord<'_>> {
        self.records().find(|record| record.non_terminal() == id)
    }

    fn record_at(&self, offset: usize) -> RuleRecord<'_> {
        let len = usize::from(self.words[offset]);
        RuleRecord {
            words: &self.words[offset..offset + len],
        }
    }
}

/// One rule record, borrowed from its table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleRecord<'a> {
    words: &'a [u16],
}

impl<'a> RuleRecord<'a> {
    pub fn non_terminal(&self) -> SymbolId {
        self.words[1]
    }

    pub fn precedence(&self) -> u16 {
        self.words[2]
    }

    pub fn alternative_count(&self) -> usize {
        usize::from(self.words[3])
    }

    /// Symbol ids of each alternative, in declaration order
    pub fn alternatives(&self) -> Alternatives<'a> {
        Alternatives {
            rest: &self.words[RECORD_HEADER_LEN..],
            remaining: self.alternative_count(),
        }
    }

    pub fn words(&self) -> &'a [u16] {
        self.words
    }
}

pub struct Alternatives<'a> {
    rest: &'a [u16],
    remaining: usize,
}

impl<'a> Iterator for Alternatives<'a> {
    type Item = &'a [SymbolId];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (&len, tail) = self.rest.split_first()?;
        let len = usize::from(len);
        let line = tail.get(..len)?;
        self.rest = &tail[len..];
        self.remaining -= 1;
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sum : NUM PLUS NUM | NUM
    const SUM: [u16; 11] = [1, 10, 1000, 100, 2, 3, 500, 501, 500, 1, 500];

    #[test]
    fn test_read_records() {
        let table = EncodedTable::from_words(SUM.to_vec()).unwrap();
        assert_eq!(table.rule_count(), 1);

        let record = table.find_rule(1000).unwrap();
        assert_eq!(record.precedence(), 100);
        let alternatives: Vec<&[u16]> = record.alternatives().collect();
        assert_eq!(alternatives, vec![&[500, 501, 500][..], &[500][..]]);
        assert!(table.find_rule(1001).is_none());
    }

    #[test]
    fn test_empty_rule_table() {
        let table = EncodedTable::from_words(vec![0]).unwrap();
        assert_eq!(table.records().count(), 0);
    }

    #[test]
    fn test_empty_alternative() {
        let table = EncodedTable::from_words(vec![1, 7, 1000, 100, 2, 0, 1, 500]).unwrap();
        let record = table.find_rule(1000).unwrap();
        let alternatives: Vec<&[u16]> = record.alternatives().collect();
        assert_eq!(alternatives, vec![&[][..], &[500][..]]);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert_eq!(EncodedTable::from_words(vec![]), Err(TableError::Empty));
        assert!(matches!(
            EncodedTable::from_words(vec![1, 6, 1000]),
            Err(TableError::Truncated { record: 0, .. })
        ));
        assert!(matches!(
            EncodedTable::from_words(SUM[..9].to_vec()),
            Err(TableError::Truncated { record: 0, needed: 9, available: 8 })
        ));

        let mut wrong_length = SUM.to_vec();
        wrong_length[1] = 9;
        assert_eq!(
            EncodedTable::from_words(wrong_length),
            Err(TableError::BadRecordLength { record: 0, declared: 9, actual: 10 })
        );

        let mut terminal = SUM.to_vec();
        terminal[2] = 500;
        assert_eq!(
            EncodedTable::from_words(terminal),
            Err(TableError::NotANonTerminal { record: 0, id: 500 })
        );

        let mut trailing = SUM.to_vec();
        trailing.push(7);
        assert_eq!(
            EncodedTable::from_words(trailing),
            Err(TableError::TrailingWords { count: 1 })
        );
    }
}
