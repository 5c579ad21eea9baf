//! Per-table type descriptors.
//!
//! A [`TableTypes`] names every GraphQL type derived from one table and
//! records how each column is exposed. Descriptors are built once per
//! catalog by a [`Synthesizer`], which hands out the same shared instance
//! for every request of the same table. The dynamic types themselves refer
//! to each other by name, so relations between tables may form cycles.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use super::SchemaOptions;
use super::error::GqlError;
use super::scalar::{JSON, SAFE_INT, ScalarKind};
use super::tables::{AGGREGATE, CONFLICT_ACTION, ORDER_BY};
use crate::catalog::{Catalog, Table};

/// A column as exposed on the table's object and input types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnField {
	pub name: String,
	pub kind: ScalarKind,
	pub nullable: bool,
}

#[derive(Debug)]
pub struct TableTypes {
	pub table: Arc<Table>,
	pub columns: Vec<ColumnField>,
	pub object: String,
	pub insert_input: String,
	pub set_input: String,
	pub inc_input: Option<String>,
	pub pk_input: Option<String>,
	pub on_conflict: Option<String>,
	pub order_by: String,
	pub bool_exp: String,
	pub aggregate: String,
	pub mutation_response: String,
	pub updates_input: String,
}

impl TableTypes {
	fn new(table: &Table, options: &SchemaOptions) -> Result<TableTypes, GqlError> {
		let mut columns = Vec::with_capacity(table.columns.len());
		for col in table.columns.iter() {
			if !is_valid_name(&col.name) {
				warn!("Skipping column `{}.{}`, its name is not a valid GraphQL name", table.name, col.name);
				continue;
			}
			columns.push(ColumnField {
				name: col.name.clone(),
				kind: ScalarKind::of(&table.name, col, &options.json_columns)?,
				nullable: col.nullable,
			});
		}
		let name = &table.name;
		let has_pk = table.primary_key().is_some_and(|pk| columns.iter().any(|c| c.name == pk.name));
		let has_numeric = columns.iter().any(|c| c.kind.is_numeric());
		Ok(TableTypes {
			table: Arc::new(table.clone()),
			columns,
			object: name.clone(),
			insert_input: format!("{name}_insert_input"),
			set_input: format!("{name}_set_input"),
			inc_input: has_numeric.then(|| format!("{name}_inc_input")),
			pk_input: has_pk.then(|| format!("{name}_pk_columns_input")),
			on_conflict: has_pk.then(|| format!("{name}_on_conflict")),
			order_by: format!("{name}_order_by"),
			bool_exp: format!("{name}_bool_exp"),
			aggregate: format!("{name}_aggregate"),
			mutation_response: format!("{name}_mutation_response"),
			updates_input: format!("{name}_updates_input"),
		})
	}

	pub fn name(&self) -> &str {
		&self.table.name
	}

	pub fn column(&self, name: &str) -> Option<&ColumnField> {
		self.columns.iter().find(|c| c.name == name)
	}

	/// Every type name the table adds to the schema.
	fn type_names(&self) -> Vec<&str> {
		let mut names = vec![
			self.object.as_str(),
			&self.insert_input,
			&self.set_input,
			&self.order_by,
			&self.bool_exp,
			&self.aggregate,
			&self.mutation_response,
			&self.updates_input,
		];
		names.extend(self.inc_input.as_deref());
		names.extend(self.pk_input.as_deref());
		names.extend(self.on_conflict.as_deref());
		names
	}

	/// Every root field name the table may add to the schema.
	fn root_fields(&self) -> Vec<String> {
		let t = self.name();
		vec![
			t.to_owned(),
			format!("{t}_by_pk"),
			format!("{t}_aggregate"),
			format!("insert_{t}_one"),
			format!("insert_{t}"),
			format!("update_{t}_one"),
			format!("update_{t}_many"),
			format!("delete_{t}"),
			format!("delete_{t}_by_pk"),
		]
	}

	/// The primary key column, when the table has exactly one and it is exposed.
	pub fn pk(&self) -> Option<&ColumnField> {
		self.pk_input.as_ref()?;
		self.table.primary_key().and_then(|pk| self.column(&pk.name))
	}
}

/// Whether a string can be used verbatim as a GraphQL name.
pub fn is_valid_name(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
		_ => return false,
	}
	!name.starts_with("__") && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Whether a table name clashes with one of the shared types.
fn is_reserved(name: &str) -> bool {
	const RESERVED: [&str; 13] = [
		"Query",
		"Mutation",
		"Subscription",
		"String",
		"Int",
		"Float",
		"Boolean",
		"ID",
		SAFE_INT,
		JSON,
		ORDER_BY,
		CONFLICT_ACTION,
		AGGREGATE,
	];
	RESERVED.contains(&name) || name.ends_with("_comparison_exp")
}

/// The root fields which are not generated from a table.
const CATALOG_FIELDS: [&str; 3] = ["_tables", "_table", "_sql"];

/// Builds and memoizes the descriptors of one catalog.
///
/// The first table to claim a type or root field name keeps it, a later
/// table whose generated names clash is skipped.
pub struct Synthesizer<'a> {
	catalog: &'a Catalog,
	options: &'a SchemaOptions,
	built: IndexMap<String, Option<Arc<TableTypes>>>,
	types: HashSet<String>,
	fields: HashSet<String>,
}

impl<'a> Synthesizer<'a> {
	pub fn new(catalog: &'a Catalog, options: &'a SchemaOptions) -> Self {
		Synthesizer {
			catalog,
			options,
			built: IndexMap::new(),
			types: HashSet::new(),
			fields: CATALOG_FIELDS.iter().map(|f| (*f).to_owned()).collect(),
		}
	}

	/// Reserves the names generated for a table, or returns the first one
	/// which is already taken.
	fn claim(&mut self, tt: &TableTypes) -> Option<String> {
		let types = tt.type_names();
		let fields = tt.root_fields();
		if let Some(taken) = types.iter().find(|n| self.types.contains(**n) || is_reserved(n)) {
			return Some((*taken).to_owned());
		}
		if let Some(taken) = fields.iter().find(|n| self.fields.contains(*n)) {
			return Some(taken.clone());
		}
		self.types.extend(types.into_iter().map(str::to_owned));
		self.fields.extend(fields);
		None
	}

	/// The descriptor of a table, or [`None`] if the table is unknown or
	/// cannot be exposed.
	pub fn table(&mut self, name: &str) -> Result<Option<Arc<TableTypes>>, GqlError> {
		if let Some(done) = self.built.get(name) {
			return Ok(done.clone());
		}
		let types = match self.catalog.table(name) {
			Some(table) if is_valid_name(&table.name) && !is_reserved(&table.name) => {
				let types = TableTypes::new(table, self.options)?;
				if types.columns.is_empty() {
					warn!("Skipping table `{}`, none of its columns can be exposed", table.name);
					None
				} else if let Some(taken) = self.claim(&types) {
					warn!("Skipping table `{}`, the generated name `{taken}` is already taken", table.name);
					None
				} else {
					Some(Arc::new(types))
				}
			}
			Some(table) if is_reserved(&table.name) => {
				warn!("Skipping table `{}`, its name clashes with a built-in type", table.name);
				None
			}
			Some(table) => {
				warn!("Skipping table `{}`, its name is not a valid GraphQL name", table.name);
				None
			}
			None => None,
		};
		self.built.insert(name.to_owned(), types.clone());
		Ok(types)
	}

	/// Builds the descriptors of every table, in catalog order.
	pub fn finish(mut self) -> Result<IndexMap<String, Arc<TableTypes>>, GqlError> {
		let names: Vec<String> = self.catalog.tables().map(|t| t.name.clone()).collect();
		let mut out = IndexMap::with_capacity(names.len());
		for name in names {
			if let Some(types) = self.table(&name)? {
				out.insert(name, types);
			}
		}
		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::ColumnInfo;

	fn catalog() -> Catalog {
		let col = |t: &str, c: &str, ty: &str, pk: bool| ColumnInfo {
			table_name: t.into(),
			column_name: c.into(),
			column_type: ty.into(),
			is_primary_key: pk,
			..Default::default()
		};
		Catalog::build(
			None,
			vec![
				col("users", "id", "INTEGER", true),
				col("users", "meta_json", "TEXT", false),
				col("users", "bad name", "TEXT", false),
				col("notes", "body", "TEXT", false),
				col("my table", "id", "INTEGER", true),
			],
		)
	}

	#[test]
	fn descriptors_are_shared_within_a_build() {
		let cat = catalog();
		let opts = SchemaOptions::default();
		let mut synth = Synthesizer::new(&cat, &opts);
		let a = synth.table("users").unwrap().unwrap();
		let b = synth.table("users").unwrap().unwrap();
		assert!(Arc::ptr_eq(&a, &b));
		let all = synth.finish().unwrap();
		assert!(Arc::ptr_eq(&a, &all["users"]));
	}

	#[test]
	fn descriptors_name_every_type() {
		let cat = catalog();
		let opts = SchemaOptions::default();
		let all = Synthesizer::new(&cat, &opts).finish().unwrap();
		assert_eq!(all.keys().collect::<Vec<_>>(), ["users", "notes"]);
		let users = &all["users"];
		assert_eq!(users.pk_input.as_deref(), Some("users_pk_columns_input"));
		assert_eq!(users.on_conflict.as_deref(), Some("users_on_conflict"));
		assert_eq!(users.inc_input.as_deref(), Some("users_inc_input"));
		assert_eq!(users.column("meta_json").map(|c| c.kind), Some(ScalarKind::Json));
		assert!(users.column("bad name").is_none());
		let notes = &all["notes"];
		assert!(notes.pk().is_none());
		assert!(notes.inc_input.is_none());
		assert!(notes.on_conflict.is_none());
	}

	#[test]
	fn tables_clashing_with_generated_names_are_skipped() {
		let col = |t: &str| ColumnInfo {
			table_name: t.into(),
			column_name: "id".into(),
			column_type: "INTEGER".into(),
			is_primary_key: true,
			..Default::default()
		};
		let cat = Catalog::build(
			None,
			vec![
				col("users"),
				col("users_aggregate"),
				col("users_bool_exp"),
				col("users_by_pk"),
				col("users_one"),
				col("_table"),
				col("String"),
				col("posts"),
			],
		);
		let opts = SchemaOptions::default();
		let all = Synthesizer::new(&cat, &opts).finish().unwrap();
		// `users_one` would add an `insert_users_one` field
		assert_eq!(all.keys().collect::<Vec<_>>(), ["users", "posts"]);
	}

	#[test]
	fn graphql_names() {
		assert!(is_valid_name("users"));
		assert!(is_valid_name("_private"));
		assert!(!is_valid_name("__type"));
		assert!(!is_valid_name("1st"));
		assert!(!is_valid_name("my table"));
		assert!(!is_valid_name(""));
		assert!(is_reserved("aggregate"));
		assert!(is_reserved("SafeInt_comparison_exp"));
		assert!(!is_reserved("users"));
	}
}
