//! Execution of compiled statements against the storage layer.

use std::sync::Arc;

use crate::catalog::{Catalog, Table};
use crate::dbs::{Statement, Storage};
use crate::err::{Error, Result, compilation};
use crate::sql::{self, Filter, OnConflict, Select, Update};
use crate::val::{Row, Value};

/// The outcome of one update or delete item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mutated {
	pub affected_rows: usize,
	pub returning: Vec<Row>,
}

impl From<Vec<Row>> for Mutated {
	fn from(rows: Vec<Row>) -> Self {
		Mutated {
			affected_rows: rows.len(),
			returning: rows,
		}
	}
}

/// Compiles requests for a table and runs them through a [`Storage`].
///
/// The executor is cheap to clone and is attached to every GraphQL request
/// as context data.
#[derive(Clone)]
pub struct Executor {
	store: Arc<dyn Storage>,
}

impl Executor {
	pub fn new(store: Arc<dyn Storage>) -> Executor {
		Executor {
			store,
		}
	}

	pub fn store(&self) -> &Arc<dyn Storage> {
		&self.store
	}

	/// Introspects the storage and builds a fresh catalog.
	pub async fn catalog(&self) -> Result<Catalog> {
		let token = self.store.version().await?;
		let rows = self.store.introspect().await?;
		Ok(Catalog::build(token, rows))
	}

	async fn run(&self, stm: &Statement) -> Result<Vec<Row>> {
		trace!("Running statement: {stm}");
		self.store.query(stm).await
	}

	fn primary_key<'a>(table: &'a Table) -> Result<&'a str> {
		table
			.primary_key()
			.map(|c| c.name.as_str())
			.ok_or_else(|| compilation(format!("table `{}` has no primary key", table.name)))
	}

	/// Fetches the rows matching a list query.
	pub async fn select(&self, table: &Table, sel: &Select) -> Result<Vec<Row>> {
		self.run(&sel.compile(table)).await
	}

	/// Fetches the first row whose column equals the given value.
	pub async fn find(&self, table: &Table, column: &str, key: Value) -> Result<Option<Row>> {
		let sel = Select::new(Filter::eq(column, key)).limit(1);
		Ok(self.select(table, &sel).await?.into_iter().next())
	}

	/// Fetches a row by its primary key.
	pub async fn by_pk(&self, table: &Table, key: Value) -> Result<Option<Row>> {
		let pk = Self::primary_key(table)?;
		self.find(table, pk, key).await
	}

	/// Counts the rows matching a filter.
	pub async fn count(&self, table: &Table, filter: &Filter) -> Result<i64> {
		let rows = self.run(&sql::count(table, filter)).await?;
		rows.first()
			.and_then(|r| r.get("count"))
			.and_then(Value::as_i64)
			.ok_or_else(|| Error::Internal("the count query returned no count".to_owned()))
	}

	/// Fetches every primary key value currently in the table.
	pub async fn keys(&self, table: &Table) -> Result<Vec<Value>> {
		let pk = Self::primary_key(table)?;
		let stm = Statement::new(format!(
			"SELECT {} FROM {}",
			sql::quote(pk),
			sql::quote(&table.name)
		));
		let rows = self.run(&stm).await?;
		Ok(rows.into_iter().filter_map(|mut r| r.swap_remove(pk)).collect())
	}

	/// Inserts records, returning the rows actually written.
	pub async fn insert(
		&self,
		table: &Table,
		records: &[Row],
		conflict: Option<&OnConflict>,
	) -> Result<Vec<Row>> {
		self.run(&sql::insert(table, records, conflict)?).await
	}

	/// Applies one update item.
	pub async fn update(&self, table: &Table, upd: &Update) -> Result<Mutated> {
		Ok(self.run(&sql::update(table, upd)?).await?.into())
	}

	/// Applies an update to the row with the given primary key.
	pub async fn update_by_pk(
		&self,
		table: &Table,
		key: Value,
		set: Row,
		inc: Row,
	) -> Result<Option<Row>> {
		let upd = Update {
			filter: Filter::eq(Self::primary_key(table)?, key),
			set,
			inc,
		};
		Ok(self.update(table, &upd).await?.returning.into_iter().next())
	}

	/// Applies every update item inside a single transaction.
	///
	/// Every item is compiled before anything is sent to the storage, and a
	/// failure of any item rolls back all of them.
	pub async fn update_many(&self, table: &Table, upds: &[Update]) -> Result<Vec<Mutated>> {
		let stms = upds.iter().map(|u| sql::update(table, u)).collect::<Result<Vec<_>>>()?;
		for stm in &stms {
			trace!("Running statement in transaction: {stm}");
		}
		let out = self.store.transaction(&stms).await?;
		Ok(out.into_iter().map(Mutated::from).collect())
	}

	/// Deletes the rows matching a non-empty filter.
	pub async fn delete(&self, table: &Table, filter: &Filter) -> Result<Mutated> {
		Ok(self.run(&sql::delete(table, filter)?).await?.into())
	}

	/// Deletes the row with the given primary key.
	pub async fn delete_by_pk(&self, table: &Table, key: Value) -> Result<Option<Row>> {
		let filter = Filter::eq(Self::primary_key(table)?, key);
		Ok(self.delete(table, &filter).await?.returning.into_iter().next())
	}

	/// Runs caller supplied SQL verbatim.
	pub async fn raw(&self, text: &str) -> Result<Vec<Row>> {
		self.run(&Statement::new(text)).await
	}
}
