use super::{Filter, OrderBy, quote};
use crate::catalog::Table;
use crate::dbs::Statement;
use crate::val::Value;

/// A list fetch over one table.
#[derive(Clone, Debug, Default)]
pub struct Select {
	pub filter: Filter,
	pub order: OrderBy,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

impl Select {
	pub fn new(filter: Filter) -> Select {
		Select {
			filter,
			..Default::default()
		}
	}

	pub fn limit(mut self, limit: i64) -> Select {
		self.limit = Some(limit);
		self
	}

	pub fn compile(&self, table: &Table) -> Statement {
		let mut params = Vec::new();
		let mut text = format!("SELECT * FROM {}", quote(&table.name));
		text.push_str(&self.filter.to_where(&mut params));
		text.push_str(&self.order.to_sql());
		match (self.limit, self.offset) {
			(None, None) => {}
			(limit, offset) => {
				// SQLite only accepts OFFSET after a LIMIT, where -1 means unbounded
				text.push_str(" LIMIT ?");
				params.push(Value::Integer(limit.unwrap_or(-1)));
				if let Some(offset) = offset {
					text.push_str(" OFFSET ?");
					params.push(Value::Integer(offset));
				}
			}
		}
		Statement::with_params(text, params)
	}
}

/// Counts the rows of a table matching a filter.
pub fn count(table: &Table, filter: &Filter) -> Statement {
	let mut params = Vec::new();
	let text = format!(
		"SELECT COUNT(*) AS \"count\" FROM {}{}",
		quote(&table.name),
		filter.to_where(&mut params)
	);
	Statement::with_params(text, params)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Catalog, ColumnInfo};
	use crate::sql::Direction;

	fn table() -> Table {
		let rows = vec![ColumnInfo {
			table_name: "users".into(),
			column_name: "id".into(),
			column_type: "INTEGER".into(),
			is_primary_key: true,
			..Default::default()
		}];
		Catalog::build(None, rows).table("users").cloned().unwrap()
	}

	#[test]
	fn select_with_every_clause() {
		let sel = Select {
			filter: Filter::eq("id", Value::Integer(3)),
			order: OrderBy(vec![("id".into(), Direction::Desc)]),
			limit: Some(10),
			offset: Some(20),
		};
		let stm = sel.compile(&table());
		assert_eq!(
			stm.text,
			r#"SELECT * FROM "users" WHERE "id" = ? ORDER BY "id" DESC LIMIT ? OFFSET ?"#
		);
		assert_eq!(stm.params, vec![Value::Integer(3), Value::Integer(10), Value::Integer(20)]);
	}

	#[test]
	fn offset_without_limit_is_unbounded() {
		let sel = Select {
			offset: Some(5),
			..Default::default()
		};
		let stm = sel.compile(&table());
		assert_eq!(stm.text, r#"SELECT * FROM "users" LIMIT ? OFFSET ?"#);
		assert_eq!(stm.params, vec![Value::Integer(-1), Value::Integer(5)]);
	}

	#[test]
	fn count_binds_its_filter() {
		let stm = count(&table(), &Filter::within("id", vec![Value::Integer(1), Value::Integer(2)]));
		assert_eq!(stm.text, r#"SELECT COUNT(*) AS "count" FROM "users" WHERE "id" IN (?, ?)"#);
		assert_eq!(stm.params.len(), 2);
		assert_eq!(count(&table(), &Filter::default()).text, r#"SELECT COUNT(*) AS "count" FROM "users""#);
	}
}
