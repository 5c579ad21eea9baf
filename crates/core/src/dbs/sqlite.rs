use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params_from_iter};

use super::{Statement, Storage};
use crate::catalog::ColumnInfo;
use crate::err::{Error, Result};
use crate::val::{Row, Value};

const TARGET: &str = "sqlgraph::core::dbs::sqlite";

/// Lists every column of every user table, joined with the foreign key (if
/// any) which originates at that column.
const INTROSPECT: &str = r#"
SELECT
	s.name AS table_name,
	info.name AS column_name,
	info.type AS column_type,
	info."notnull" AS not_null,
	info.pk AS pk,
	fk."table" AS references_table,
	fk."to" AS references_column
FROM sqlite_schema AS s
JOIN pragma_table_info(s.name) AS info
LEFT JOIN pragma_foreign_key_list(s.name) AS fk ON fk."from" = info.name
WHERE s.type = 'table' AND s.name NOT LIKE 'sqlite_%'
ORDER BY s.rowid, info.cid
"#;

/// A [`Storage`] backed by an embedded SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
	conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
	/// Opens the database at the given path, or an in-memory database when
	/// the path is `memory`.
	pub fn open(path: &str) -> Result<SqliteStore> {
		let conn = match path {
			"memory" | ":memory:" => {
				info!(target: TARGET, "Opening an in-memory database");
				Connection::open_in_memory()?
			}
			path => {
				info!(target: TARGET, "Opening database file: {path}");
				Connection::open(path)?
			}
		};
		Self::from_connection(conn)
	}

	/// Wraps an already open connection.
	pub fn from_connection(conn: Connection) -> Result<SqliteStore> {
		conn.pragma_update(None, "foreign_keys", "ON")?;
		Ok(SqliteStore {
			conn: Arc::new(Mutex::new(conn)),
		})
	}

	/// Runs a closure against the connection on the blocking thread pool.
	async fn with_conn<T, F>(&self, f: F) -> Result<T>
	where
		T: Send + 'static,
		F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
	{
		let conn = self.conn.clone();
		tokio::task::spawn_blocking(move || {
			let mut conn = conn.lock();
			f(&mut conn)
		})
		.await?
	}
}

/// Prepares, binds and steps one statement, collecting every returned row.
fn run(conn: &Connection, stm: &Statement) -> Result<Vec<Row>> {
	trace!(target: TARGET, "Executing statement: {stm}");
	let mut prepared = conn.prepare(&stm.text)?;
	let names: Vec<String> = prepared.column_names().into_iter().map(str::to_owned).collect();
	let mut rows = prepared.query(params_from_iter(stm.params.iter()))?;
	let mut out = Vec::new();
	while let Some(row) = rows.next()? {
		let mut map = Row::with_capacity(names.len());
		for (i, name) in names.iter().enumerate() {
			map.insert(name.clone(), Value::from(row.get_ref(i)?));
		}
		out.push(map);
	}
	Ok(out)
}

fn introspect(conn: &Connection) -> rusqlite::Result<Vec<ColumnInfo>> {
	let mut stm = conn.prepare(INTROSPECT)?;
	let rows = stm.query_map([], |row| {
		Ok(ColumnInfo {
			table_name: row.get("table_name")?,
			column_name: row.get("column_name")?,
			column_type: row.get::<_, Option<String>>("column_type")?.unwrap_or_default(),
			not_null: row.get::<_, i64>("not_null")? != 0,
			is_primary_key: row.get::<_, i64>("pk")? > 0,
			references_table: row.get("references_table")?,
			references_column: row.get("references_column")?,
		})
	})?;
	// A column which takes part in several foreign keys is listed once per key
	let mut seen = HashSet::new();
	let mut out = Vec::new();
	for row in rows {
		let row = row?;
		if seen.insert((row.table_name.clone(), row.column_name.clone())) {
			out.push(row);
		}
	}
	Ok(out)
}

#[async_trait::async_trait]
impl Storage for SqliteStore {
	fn kind(&self) -> &'static str {
		"sqlite"
	}

	async fn version(&self) -> Result<Option<String>> {
		self.with_conn(|conn| {
			let version = conn
				.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
				.optional()?;
			Ok(version.map(|v| v.to_string()))
		})
		.await
	}

	async fn introspect(&self) -> Result<Vec<ColumnInfo>> {
		self.with_conn(|conn| {
			introspect(conn).map_err(|e| Error::SchemaIntrospection(e.to_string()))
		})
		.await
	}

	async fn query(&self, stm: &Statement) -> Result<Vec<Row>> {
		let stm = stm.clone();
		self.with_conn(move |conn| run(conn, &stm)).await
	}

	async fn transaction(&self, stms: &[Statement]) -> Result<Vec<Vec<Row>>> {
		let stms = stms.to_vec();
		self.with_conn(move |conn| {
			let txn = conn.transaction()?;
			let mut out = Vec::with_capacity(stms.len());
			for stm in &stms {
				// Dropping the transaction without committing rolls it back
				out.push(run(&txn, stm)?);
			}
			txn.commit()?;
			Ok(out)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store() -> SqliteStore {
		let store = SqliteStore::open("memory").unwrap();
		store
			.conn
			.lock()
			.execute_batch(
				r#"
				CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
				CREATE TABLE posts (
					id INTEGER PRIMARY KEY,
					author INTEGER REFERENCES users(id),
					title TEXT
				);
				"#,
			)
			.unwrap();
		store
	}

	#[test_log::test(tokio::test)]
	async fn introspection_lists_columns_in_order() {
		let store = store();
		let cols = store.introspect().await.unwrap();
		let names: Vec<_> =
			cols.iter().map(|c| format!("{}.{}", c.table_name, c.column_name)).collect();
		assert_eq!(names, ["users.id", "users.name", "posts.id", "posts.author", "posts.title"]);
		let author = &cols[3];
		assert_eq!(author.references_table.as_deref(), Some("users"));
		assert_eq!(author.references_column.as_deref(), Some("id"));
		assert!(cols[0].is_primary_key);
		assert!(cols[1].not_null);
		assert!(!cols[4].not_null);
	}

	#[test_log::test(tokio::test)]
	async fn version_changes_with_the_schema() {
		let store = store();
		let before = store.version().await.unwrap();
		store.query(&Statement::new("CREATE TABLE extra (id INTEGER)")).await.unwrap();
		let after = store.version().await.unwrap();
		assert!(before.is_some());
		assert_ne!(before, after);
	}

	#[test_log::test(tokio::test)]
	async fn failed_transactions_roll_back() {
		let store = store();
		let res = store
			.transaction(&[
				Statement::with_params(
					"INSERT INTO users (id, name) VALUES (?, ?)",
					vec![Value::Integer(1), Value::from("a")],
				),
				Statement::with_params(
					"INSERT INTO users (id, name) VALUES (?, ?)",
					vec![Value::Integer(2), Value::Null],
				),
			])
			.await;
		assert!(matches!(res, Err(Error::Persistence(_))));
		let rows = store.query(&Statement::new("SELECT COUNT(*) AS n FROM users")).await.unwrap();
		assert_eq!(rows[0]["n"], Value::Integer(0));
	}

	#[test_log::test(tokio::test)]
	async fn file_databases_see_schema_changes_from_other_connections() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("app.db");
		let path = path.to_str().unwrap();
		let ours = SqliteStore::open(path).unwrap();
		let theirs = SqliteStore::open(path).unwrap();
		ours.query(&Statement::new("CREATE TABLE a (id INTEGER PRIMARY KEY)")).await.unwrap();
		let before = ours.version().await.unwrap();
		theirs.query(&Statement::new("CREATE TABLE b (id INTEGER PRIMARY KEY)")).await.unwrap();
		assert_ne!(ours.version().await.unwrap(), before);
		let tables: Vec<_> =
			ours.introspect().await.unwrap().into_iter().map(|c| c.table_name).collect();
		assert_eq!(tables, ["a", "b"]);
	}
}
