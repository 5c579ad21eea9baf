use async_graphql::Value as GqlValue;

use super::filter::placeholders;
use super::{Filter, quote};
use crate::catalog::Table;
use crate::dbs::Statement;
use crate::err::{Result, compilation};
use crate::val::{Row, Value};

/// What to do when an inserted row conflicts with an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
	Nothing,
	Update,
}

/// A conflict policy for inserts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnConflict {
	/// The conflict target columns
	pub target: Vec<String>,
	pub action: Action,
	/// The columns overwritten with the proposed row on conflict
	pub update_columns: Vec<String>,
}

impl OnConflict {
	/// Parses a `<table>_on_conflict` input value.
	///
	/// The `constraint` is either the primary key constraint name
	/// (`<table>_pkey`) or a comma separated list of the table's columns.
	pub fn parse(table: &Table, v: &GqlValue) -> Result<Option<OnConflict>> {
		let o = match v {
			GqlValue::Null => return Ok(None),
			GqlValue::Object(o) => o,
			v => return Err(compilation(format!("a conflict policy must be an object, found {v}"))),
		};
		let constraint = o
			.get("constraint")
			.and_then(name_of)
			.ok_or_else(|| compilation("a conflict policy requires a `constraint`"))?;
		let target = resolve_target(table, constraint)?;
		let action = match o.get("action") {
			None | Some(GqlValue::Null) => Action::Nothing,
			Some(v) => match name_of(v) {
				Some("nothing") => Action::Nothing,
				Some("update") => Action::Update,
				_ => return Err(compilation(format!("unknown conflict action {v}"))),
			},
		};
		let mut update_columns = Vec::new();
		if let Some(GqlValue::List(cols)) = o.get("update_columns") {
			for col in cols {
				let name = name_of(col)
					.ok_or_else(|| compilation(format!("invalid update column {col}")))?;
				ensure!(
					table.column(name).is_some(),
					compilation(format!("column `{name}` does not exist on table `{}`", table.name))
				);
				update_columns.push(name.to_owned());
			}
		}
		ensure!(
			action == Action::Nothing || !update_columns.is_empty(),
			compilation("a conflict policy with action `update` requires `update_columns`")
		);
		Ok(Some(OnConflict {
			target,
			action,
			update_columns,
		}))
	}

	fn to_sql(&self) -> String {
		let target: Vec<String> = self.target.iter().map(|c| quote(c)).collect();
		let mut out = format!(" ON CONFLICT ({})", target.join(", "));
		match self.action {
			Action::Nothing => out.push_str(" DO NOTHING"),
			Action::Update => {
				let sets: Vec<String> = self
					.update_columns
					.iter()
					.map(|c| {
						let c = quote(c);
						format!("{c} = excluded.{c}")
					})
					.collect();
				out.push_str(" DO UPDATE SET ");
				out.push_str(&sets.join(", "));
			}
		}
		out
	}
}

/// The name carried by an enum or string input.
fn name_of(v: &GqlValue) -> Option<&str> {
	match v {
		GqlValue::String(s) => Some(s.as_str()),
		GqlValue::Enum(n) => Some(n.as_str()),
		_ => None,
	}
}

fn resolve_target(table: &Table, constraint: &str) -> Result<Vec<String>> {
	if constraint == table.pkey_constraint() {
		return match table.primary_key() {
			Some(pk) => Ok(vec![pk.name.clone()]),
			None => Err(compilation(format!("table `{}` has no primary key", table.name))),
		};
	}
	let mut out = Vec::new();
	for col in constraint.split(',').map(str::trim) {
		ensure!(
			table.column(col).is_some(),
			compilation(format!("unknown conflict constraint `{constraint}` on table `{}`", table.name))
		);
		out.push(col.to_owned());
	}
	Ok(out)
}

fn check_columns<'a>(table: &Table, cols: impl IntoIterator<Item = &'a String>) -> Result<()> {
	for col in cols {
		ensure!(
			table.column(col).is_some(),
			compilation(format!("column `{col}` does not exist on table `{}`", table.name))
		);
	}
	Ok(())
}

/// Compiles a multi-row insert returning the inserted rows.
///
/// Every record must set the same columns. A single empty record inserts a
/// row made only of column defaults.
pub fn insert(table: &Table, records: &[Row], conflict: Option<&OnConflict>) -> Result<Statement> {
	let Some(first) = records.first() else {
		return Err(compilation("no records to insert"));
	};
	let name = quote(&table.name);
	if first.is_empty() {
		ensure!(
			records.len() == 1 && conflict.is_none(),
			compilation("only a single record without a conflict policy may be empty")
		);
		return Ok(Statement::new(format!("INSERT INTO {name} DEFAULT VALUES RETURNING *")));
	}
	check_columns(table, first.keys())?;
	let columns: Vec<&String> = first.keys().collect();
	let mut params = Vec::with_capacity(columns.len() * records.len());
	let mut rows = Vec::with_capacity(records.len());
	for record in records {
		ensure!(
			record.len() == columns.len(),
			compilation("every inserted record must set the same columns")
		);
		for col in &columns {
			let v = record
				.get(*col)
				.ok_or_else(|| compilation("every inserted record must set the same columns"))?;
			params.push(v.clone());
		}
		rows.push(format!("({})", placeholders(columns.len())));
	}
	let cols: Vec<String> = columns.iter().map(|c| quote(c)).collect();
	let mut text =
		format!("INSERT INTO {name} ({}) VALUES {}", cols.join(", "), rows.join(", "));
	if let Some(conflict) = conflict {
		text.push_str(&conflict.to_sql());
	}
	text.push_str(" RETURNING *");
	Ok(Statement::with_params(text, params))
}

/// A single update item: assignments, increments and the rows they apply to.
#[derive(Clone, Debug, Default)]
pub struct Update {
	pub filter: Filter,
	pub set: Row,
	pub inc: Row,
}

/// Compiles an update returning the updated rows.
pub fn update(table: &Table, upd: &Update) -> Result<Statement> {
	ensure!(
		!upd.set.is_empty() || !upd.inc.is_empty(),
		compilation("an update requires `_set` or `_inc`")
	);
	check_columns(table, upd.set.keys().chain(upd.inc.keys()))?;
	let mut params: Vec<Value> = Vec::new();
	let mut sets = Vec::with_capacity(upd.set.len() + upd.inc.len());
	for (col, v) in &upd.set {
		sets.push(format!("{} = ?", quote(col)));
		params.push(v.clone());
	}
	for (col, v) in &upd.inc {
		let c = quote(col);
		sets.push(format!("{c} = {c} + ?"));
		params.push(v.clone());
	}
	let text = format!(
		"UPDATE {} SET {}{} RETURNING *",
		quote(&table.name),
		sets.join(", "),
		upd.filter.to_where(&mut params)
	);
	Ok(Statement::with_params(text, params))
}

/// Compiles a delete returning the deleted rows.
///
/// A filter which places no constraint on the rows is rejected.
pub fn delete(table: &Table, filter: &Filter) -> Result<Statement> {
	let mut params = Vec::new();
	let cond = filter.to_where(&mut params);
	ensure!(!cond.is_empty(), compilation("cannot delete without a filter"));
	Ok(Statement::with_params(
		format!("DELETE FROM {}{cond} RETURNING *", quote(&table.name)),
		params,
	))
}

#[cfg(test)]
mod tests {
	use async_graphql::Value as GqlValue;
	use serde_json::json;

	use super::*;
	use crate::catalog::{Catalog, ColumnInfo};
	use crate::err::Error;

	fn users() -> Table {
		let cols = [("id", "INTEGER", true), ("name", "TEXT", false), ("visits", "INTEGER", false)];
		let rows = cols
			.iter()
			.map(|(c, t, pk)| ColumnInfo {
				table_name: "users".into(),
				column_name: (*c).into(),
				column_type: (*t).into(),
				is_primary_key: *pk,
				..Default::default()
			})
			.collect();
		Catalog::build(None, rows).table("users").cloned().unwrap()
	}

	fn row(pairs: &[(&str, Value)]) -> Row {
		pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
	}

	fn conflict(v: serde_json::Value) -> Result<Option<OnConflict>> {
		OnConflict::parse(&users(), &GqlValue::from_json(v).unwrap())
	}

	#[test]
	fn insert_many_rows() {
		let records = [row(&[("name", "a".into())]), row(&[("name", "b".into())])];
		let stm = insert(&users(), &records, None).unwrap();
		assert_eq!(stm.text, r#"INSERT INTO "users" ("name") VALUES (?), (?) RETURNING *"#);
		assert_eq!(stm.params, vec![Value::from("a"), Value::from("b")]);
	}

	#[test]
	fn insert_requires_matching_columns() {
		let records = [row(&[("name", "a".into())]), row(&[("visits", Value::Integer(1))])];
		assert!(insert(&users(), &records, None).is_err());
		assert!(insert(&users(), &[], None).is_err());
		let stm = insert(&users(), &[Row::new()], None).unwrap();
		assert_eq!(stm.text, r#"INSERT INTO "users" DEFAULT VALUES RETURNING *"#);
	}

	#[test]
	fn insert_with_conflict_policies() {
		let records = [row(&[("id", Value::Integer(1)), ("name", "a".into())])];
		let nothing =
			conflict(json!({"constraint": "users_pkey", "action": "nothing"})).unwrap().unwrap();
		let stm = insert(&users(), &records, Some(&nothing)).unwrap();
		assert_eq!(
			stm.text,
			r#"INSERT INTO "users" ("id", "name") VALUES (?, ?) ON CONFLICT ("id") DO NOTHING RETURNING *"#
		);
		let update = conflict(json!({
			"constraint": "id",
			"action": "update",
			"update_columns": ["name", "visits"],
		}))
		.unwrap()
		.unwrap();
		let stm = insert(&users(), &records, Some(&update)).unwrap();
		assert!(stm.text.ends_with(
			r#"ON CONFLICT ("id") DO UPDATE SET "name" = excluded."name", "visits" = excluded."visits" RETURNING *"#
		));
	}

	#[test]
	fn conflict_constraints_are_validated() {
		assert!(conflict(json!({"constraint": "id); DROP TABLE users; --"})).is_err());
		assert!(conflict(json!({"constraint": "posts_pkey"})).is_err());
		assert!(conflict(json!({"constraint": "users_pkey", "action": "update"})).is_err());
		assert_eq!(conflict(json!(null)).unwrap(), None);
	}

	#[test]
	fn update_combines_set_and_inc() {
		let upd = Update {
			filter: Filter::eq("id", Value::Integer(1)),
			set: row(&[("name", "b".into())]),
			inc: row(&[("visits", Value::Integer(2))]),
		};
		let stm = update(&users(), &upd).unwrap();
		assert_eq!(
			stm.text,
			r#"UPDATE "users" SET "name" = ?, "visits" = "visits" + ? WHERE "id" = ? RETURNING *"#
		);
		assert_eq!(stm.params, vec![Value::from("b"), Value::Integer(2), Value::Integer(1)]);
		assert!(update(&users(), &Update::default()).is_err());
	}

	#[test]
	fn delete_requires_a_filter() {
		let err = delete(&users(), &Filter::default()).unwrap_err();
		assert!(matches!(err, Error::QueryCompilation(ref m) if m == "cannot delete without a filter"));
		let stm = delete(&users(), &Filter::eq("id", Value::Integer(4))).unwrap();
		assert_eq!(stm.text, r#"DELETE FROM "users" WHERE "id" = ? RETURNING *"#);
	}
}
