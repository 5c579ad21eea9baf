//! The storage boundary.
//!
//! The engine never talks to a database driver directly. Everything it needs
//! from the underlying relational store is expressed by the [`Storage`]
//! trait: a schema-version token, a flat introspection listing, and the
//! execution of parameterized statements, either one at a time or as a single
//! atomic batch.

mod sqlite;

use std::fmt::{self, Display, Formatter};

pub use self::sqlite::SqliteStore;
use crate::catalog::ColumnInfo;
use crate::err::Result;
use crate::val::{Row, Value};

/// A parameterized SQL statement.
///
/// Parameters are positional and bound in order to the `?` placeholders in
/// the statement text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
	pub text: String,
	pub params: Vec<Value>,
}

impl Statement {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			params: Vec::new(),
		}
	}

	pub fn with_params(text: impl Into<String>, params: Vec<Value>) -> Self {
		Self {
			text: text.into(),
			params,
		}
	}
}

impl Display for Statement {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.text)?;
		if !self.params.is_empty() {
			f.write_str(" -- [")?;
			for (i, p) in self.params.iter().enumerate() {
				if i > 0 {
					f.write_str(", ")?;
				}
				write!(f, "{p}")?;
			}
			f.write_str("]")?;
		}
		Ok(())
	}
}

/// The API the engine requires from a relational store.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
	/// The name of the storage backend.
	fn kind(&self) -> &'static str;

	/// An opaque token which changes whenever the database schema changes.
	///
	/// Returns [`None`] when the backend cannot report one, in which case
	/// callers must assume the schema may have changed at any time.
	async fn version(&self) -> Result<Option<String>>;

	/// Lists every column of every non-system table, in table creation order
	/// and then column order.
	async fn introspect(&self) -> Result<Vec<ColumnInfo>>;

	/// Runs a single statement and returns the rows it produced.
	async fn query(&self, stm: &Statement) -> Result<Vec<Row>>;

	/// Runs every statement inside one transaction.
	///
	/// If any statement fails, nothing is committed and the error of the
	/// failing statement is returned.
	async fn transaction(&self, stms: &[Statement]) -> Result<Vec<Vec<Row>>>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statement_display_includes_params() {
		let stm = Statement::with_params(
			r#"SELECT * FROM "users" WHERE "id" = ?"#,
			vec![Value::Integer(1)],
		);
		assert_eq!(stm.to_string(), r#"SELECT * FROM "users" WHERE "id" = ? -- [1]"#);
		assert_eq!(Statement::new("SELECT 1").to_string(), "SELECT 1");
	}
}
