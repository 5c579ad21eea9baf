//! Compilation of structured requests into parameterized SQL.
//!
//! Identifiers (table and column names) come from the catalog and are quoted
//! into the statement text. Every value supplied by a request is bound as a
//! positional parameter.

mod filter;
mod order;
mod select;
mod write;

pub use self::filter::{Filter, Op};
pub use self::order::{Direction, ORDER_BY_VALUES, OrderBy};
pub use self::select::{Select, count};
pub use self::write::{Action, OnConflict, Update, delete, insert, update};

/// Quotes an identifier, escaping any embedded double quotes.
pub fn quote(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}
