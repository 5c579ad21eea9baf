//! The relational catalog.
//!
//! A [`Catalog`] is the normalized, immutable model of one schema snapshot:
//! its tables, their columns, primary keys and the foreign key relations
//! between them, resolved in both directions. It is built in one pass from
//! the flat listing returned by [`crate::dbs::Storage::introspect`], and is
//! rebuilt in full whenever the storage reports a new version token.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::err::Error;

/// One row of the introspection listing: a single column of a single table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnInfo {
	pub table_name: String,
	pub column_name: String,
	pub column_type: String,
	pub not_null: bool,
	pub is_primary_key: bool,
	pub references_table: Option<String>,
	pub references_column: Option<String>,
}

/// The storage class of a column, derived from its declared type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageType {
	Integer,
	Real,
	Text,
	/// A declared type with no scalar mapping, kept verbatim for reporting
	Unsupported(String),
}

impl StorageType {
	/// Derives the storage class from a declared column type, following the
	/// SQLite column affinity rules.
	pub fn from_declared(decl: &str) -> StorageType {
		let upper = decl.to_ascii_uppercase();
		if upper.contains("INT") {
			StorageType::Integer
		} else if ["CHAR", "CLOB", "TEXT"].iter().any(|k| upper.contains(k)) {
			StorageType::Text
		} else if upper.is_empty() || upper.contains("BLOB") {
			StorageType::Unsupported(decl.to_owned())
		} else {
			// REAL, FLOAT, DOUBLE and the NUMERIC affinity
			StorageType::Real
		}
	}
}

impl Display for StorageType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			StorageType::Integer => f.write_str("integer"),
			StorageType::Real => f.write_str("real"),
			StorageType::Text => f.write_str("text"),
			StorageType::Unsupported(decl) if decl.is_empty() => f.write_str("<none>"),
			StorageType::Unsupported(decl) => f.write_str(decl),
		}
	}
}

impl Serialize for StorageType {
	fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
		s.collect_str(self)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
	pub name: String,
	pub storage_type: StorageType,
	pub nullable: bool,
	pub is_primary_key: bool,
	pub references: Option<String>,
	#[serde(skip)]
	references_column: Option<String>,
}

/// A column of this table holding the key of a row in another table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForwardRelation {
	/// The referencing column in this table
	pub column: String,
	/// The referenced table
	pub target: String,
	/// The referenced column in the target table
	pub target_column: String,
}

/// A column of another table holding the key of a row in this table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReverseRelation {
	/// The referencing table
	pub source: String,
	/// The referencing column in the source table
	pub column: String,
	/// The referenced column in this table
	pub target_column: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
	pub name: String,
	pub columns: Vec<Column>,
	#[serde(skip)]
	primary_key: Option<usize>,
	pub forward: Vec<ForwardRelation>,
	pub reverse: Vec<ReverseRelation>,
}

impl Table {
	fn new(name: String) -> Table {
		Table {
			name,
			columns: Vec::new(),
			primary_key: None,
			forward: Vec::new(),
			reverse: Vec::new(),
		}
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name == name)
	}

	/// The single primary key column, if the table has exactly one.
	pub fn primary_key(&self) -> Option<&Column> {
		self.primary_key.and_then(|i| self.columns.get(i))
	}

	/// The name of the primary key constraint accepted by conflict policies.
	pub fn pkey_constraint(&self) -> String {
		format!("{}{}", self.name, crate::cnf::PKEY_SUFFIX)
	}

	/// A JSON description of the table, as returned by the catalog lookup fields.
	pub fn describe(&self) -> serde_json::Value {
		let mut out = serde_json::to_value(self).unwrap_or_default();
		if let Some(obj) = out.as_object_mut() {
			obj.insert(
				"primary_key".to_owned(),
				self.primary_key().map(|c| c.name.clone().into()).unwrap_or_default(),
			);
		}
		out
	}
}

/// The full set of tables for one schema snapshot.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
	token: Option<String>,
	tables: IndexMap<String, Table>,
}

impl Catalog {
	/// Builds a catalog from the introspection listing.
	///
	/// Rows are grouped by table in the order they are listed. Relations to
	/// unknown tables or columns are dropped, and tables with a composite
	/// primary key are treated as having none.
	pub fn build(token: Option<String>, rows: Vec<ColumnInfo>) -> Catalog {
		let mut tables: IndexMap<String, Table> = IndexMap::new();
		for row in rows {
			let table =
				tables.entry(row.table_name.clone()).or_insert_with(|| Table::new(row.table_name));
			table.columns.push(Column {
				name: row.column_name,
				storage_type: StorageType::from_declared(&row.column_type),
				nullable: !row.not_null,
				is_primary_key: row.is_primary_key,
				references: row.references_table,
				references_column: row.references_column,
			});
		}
		// Primary keys
		for table in tables.values_mut() {
			let mut pks = table.columns.iter().enumerate().filter(|(_, c)| c.is_primary_key);
			table.primary_key = match (pks.next(), pks.next()) {
				(Some((i, _)), None) => Some(i),
				(Some(_), Some(_)) => {
					warn!(
						"Ignoring the composite primary key of table `{}`, it will be treated as having no primary key",
						table.name
					);
					None
				}
				_ => None,
			};
		}
		// Forward relations
		let mut forward = Vec::new();
		for table in tables.values() {
			for col in table.columns.iter() {
				let Some(target) = &col.references else {
					continue;
				};
				let resolved = tables.get(target).and_then(|t| match &col.references_column {
					Some(c) => t.column(c).map(|c| c.name.clone()),
					None => t.primary_key().map(|c| c.name.clone()),
				});
				match resolved {
					Some(target_column) => forward.push((
						table.name.clone(),
						ForwardRelation {
							column: col.name.clone(),
							target: target.clone(),
							target_column,
						},
					)),
					None => {
						let err = Error::RelationResolution {
							table: table.name.clone(),
							column: col.name.clone(),
							target: match &col.references_column {
								Some(c) => format!("{target}.{c}"),
								None => target.clone(),
							},
						};
						warn!("Dropping relation: {err}");
					}
				}
			}
		}
		// Reverse relations
		for (source, rel) in forward {
			if let Some(target) = tables.get_mut(&rel.target) {
				target.reverse.push(ReverseRelation {
					source: source.clone(),
					column: rel.column.clone(),
					target_column: rel.target_column.clone(),
				});
			}
			if let Some(table) = tables.get_mut(&source) {
				table.forward.push(rel);
			}
		}
		debug!("Built catalog with {} tables (token {token:?})", tables.len());
		Catalog {
			token,
			tables,
		}
	}

	/// The version token this catalog was built for.
	pub fn token(&self) -> Option<&str> {
		self.token.as_deref()
	}

	pub fn table(&self, name: &str) -> Option<&Table> {
		self.tables.get(name)
	}

	pub fn tables(&self) -> impl Iterator<Item = &Table> {
		self.tables.values()
	}

	pub fn len(&self) -> usize {
		self.tables.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}

	/// A JSON description of every table.
	pub fn describe(&self) -> serde_json::Value {
		serde_json::Value::Array(self.tables().map(Table::describe).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn col(
		table: &str,
		column: &str,
		ty: &str,
		not_null: bool,
		pk: bool,
		refs: Option<(&str, Option<&str>)>,
	) -> ColumnInfo {
		ColumnInfo {
			table_name: table.to_owned(),
			column_name: column.to_owned(),
			column_type: ty.to_owned(),
			not_null,
			is_primary_key: pk,
			references_table: refs.map(|(t, _)| t.to_owned()),
			references_column: refs.and_then(|(_, c)| c.map(str::to_owned)),
		}
	}

	fn sample() -> Vec<ColumnInfo> {
		vec![
			col("users", "id", "INTEGER", false, true, None),
			col("users", "name", "TEXT", true, false, None),
			col("users", "meta_json", "TEXT", false, false, None),
			col("posts", "id", "INTEGER", false, true, None),
			col("posts", "author", "INTEGER", true, false, Some(("users", Some("id")))),
			col("posts", "editor", "INTEGER", false, false, Some(("users", None))),
			col("posts", "ghost", "INTEGER", false, false, Some(("missing", None))),
		]
	}

	#[test]
	fn storage_types_follow_affinity() {
		assert_eq!(StorageType::from_declared("INTEGER"), StorageType::Integer);
		assert_eq!(StorageType::from_declared("bigint"), StorageType::Integer);
		assert_eq!(StorageType::from_declared("VARCHAR(20)"), StorageType::Text);
		assert_eq!(StorageType::from_declared("DOUBLE"), StorageType::Real);
		assert_eq!(StorageType::from_declared("NUMERIC"), StorageType::Real);
		assert_eq!(StorageType::from_declared("BLOB"), StorageType::Unsupported("BLOB".into()));
		assert_eq!(StorageType::from_declared(""), StorageType::Unsupported("".into()));
	}

	#[test]
	fn tables_keep_introspection_order() {
		let cat = Catalog::build(Some("1".into()), sample());
		let names: Vec<_> = cat.tables().map(|t| t.name.as_str()).collect();
		assert_eq!(names, ["users", "posts"]);
		let users = cat.table("users").unwrap();
		assert_eq!(users.primary_key().map(|c| c.name.as_str()), Some("id"));
		assert!(users.column("id").unwrap().nullable);
		assert!(!users.column("name").unwrap().nullable);
		assert_eq!(cat.token(), Some("1"));
	}

	#[test]
	fn relations_resolve_in_both_directions() {
		let cat = Catalog::build(None, sample());
		let posts = cat.table("posts").unwrap();
		let cols: Vec<_> = posts.forward.iter().map(|r| r.column.as_str()).collect();
		assert_eq!(cols, ["author", "editor"]);
		assert_eq!(posts.forward[1].target_column, "id");
		let users = cat.table("users").unwrap();
		assert_eq!(
			users.reverse,
			vec![
				ReverseRelation {
					source: "posts".into(),
					column: "author".into(),
					target_column: "id".into(),
				},
				ReverseRelation {
					source: "posts".into(),
					column: "editor".into(),
					target_column: "id".into(),
				},
			]
		);
	}

	#[test]
	fn composite_primary_keys_are_ignored() {
		let cat = Catalog::build(
			None,
			vec![
				col("tags", "post", "INTEGER", true, true, None),
				col("tags", "label", "TEXT", true, true, None),
			],
		);
		assert!(cat.table("tags").unwrap().primary_key().is_none());
	}

	#[test]
	fn describe_reports_primary_key_name() {
		let cat = Catalog::build(None, sample());
		let desc = cat.table("users").unwrap().describe();
		assert_eq!(desc["primary_key"], serde_json::json!("id"));
		assert_eq!(desc["columns"][0]["storage_type"], serde_json::json!("integer"));
		assert_eq!(cat.describe().as_array().map(Vec::len), Some(2));
	}
}
