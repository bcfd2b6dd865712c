//! Table encoding
//!
//!     A compiled grammar is shipped to generated parsers as one flat array of 16-bit words:
//!
//!         table[0]                  number of rule records
//!         per rule record:
//!           [0] record length       words in this record, header included
//!           [1] non-terminal id
//!           [2] precedence
//!           [3] alternative count
//!           per alternative:
//!             [0] line length
//!             [1..=len] symbol ids
//!
//!     A record length is always `4 + sum(1 + line length)`, so records are walked by offset and
//!     the table needs no index. Records appear in non-terminal id order.
//!
//!     [`encode`](encoder::encode) builds the table from a [`Grammar`](crate::sapcc::grammar::Grammar).
//!     [`EncodedTable::from_words`] validates a word sequence from anywhere else, and every read
//!     goes through [`RuleRecord`]. The [render](render) module prints a table as a C array or
//!     as JSON.

pub mod encoder;
pub mod render;
pub mod table;

pub use encoder::{encode, EncodeError};
pub use table::{Alternatives, EncodedTable, RuleRecord, TableError};

/// Words in a rule record header
pub const RECORD_HEADER_LEN: usize = 4;
