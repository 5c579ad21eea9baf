use async_graphql::Value as GqlValue;

use super::quote;
use crate::catalog::Table;
use crate::err::{Result, compilation};

/// The values of the shared `order_by` enum.
pub const ORDER_BY_VALUES: [&str; 6] =
	["asc", "asc_nulls_first", "asc_nulls_last", "desc", "desc_nulls_first", "desc_nulls_last"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	Asc,
	Desc,
}

impl Direction {
	/// Folds an `order_by` enum value into a sort direction.
	///
	/// Null placement hints are accepted but not honoured.
	pub fn parse(name: &str) -> Option<Direction> {
		match name {
			"asc" | "asc_nulls_first" | "asc_nulls_last" => Some(Direction::Asc),
			"desc" | "desc_nulls_first" | "desc_nulls_last" => Some(Direction::Desc),
			_ => None,
		}
	}

	pub fn as_sql(&self) -> &'static str {
		match self {
			Direction::Asc => "ASC",
			Direction::Desc => "DESC",
		}
	}
}

/// An ordered list of sort keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderBy(pub Vec<(String, Direction)>);

impl OrderBy {
	/// Parses an `order_by` argument: a `<table>_order_by` object, or a list
	/// of them. Keys within one object sort in the order they were given.
	pub fn parse(table: &Table, v: &GqlValue) -> Result<OrderBy> {
		let mut out = Vec::new();
		match v {
			GqlValue::Null => {}
			GqlValue::List(vs) => {
				for v in vs {
					out.extend(Self::parse(table, v)?.0);
				}
			}
			GqlValue::Object(o) => {
				for (col, dir) in o {
					if table.column(col.as_str()).is_none() {
						return Err(compilation(format!(
							"cannot order by unknown column `{col}` of table `{}`",
							table.name
						)));
					}
					let dir = match dir {
						GqlValue::Null => continue,
						GqlValue::Enum(n) => Direction::parse(n.as_str()),
						GqlValue::String(s) => Direction::parse(s),
						_ => None,
					}
					.ok_or_else(|| compilation(format!("invalid ordering for `{col}`: {dir}")))?;
					out.push((col.to_string(), dir));
				}
			}
			v => return Err(compilation(format!("an ordering must be an object, found {v}"))),
		}
		Ok(OrderBy(out))
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Compiles the ordering into an `ORDER BY` clause, or an empty string.
	pub fn to_sql(&self) -> String {
		if self.0.is_empty() {
			return String::new();
		}
		let keys: Vec<String> =
			self.0.iter().map(|(c, d)| format!("{} {}", quote(c), d.as_sql())).collect();
		format!(" ORDER BY {}", keys.join(", "))
	}
}

#[cfg(test)]
mod tests {
	use async_graphql::{Name, Value as GqlValue};
	use indexmap::IndexMap;

	use super::*;
	use crate::catalog::{Catalog, ColumnInfo};

	fn table() -> Table {
		let rows = ["id", "name"]
			.iter()
			.map(|c| ColumnInfo {
				table_name: "t".into(),
				column_name: (*c).into(),
				column_type: "TEXT".into(),
				..Default::default()
			})
			.collect();
		Catalog::build(None, rows).table("t").cloned().unwrap()
	}

	fn obj(pairs: &[(&str, &str)]) -> GqlValue {
		let mut o = IndexMap::new();
		for (k, v) in pairs {
			o.insert(Name::new(k), GqlValue::Enum(Name::new(v)));
		}
		GqlValue::Object(o)
	}

	#[test]
	fn null_hints_fold_to_plain_directions() {
		for v in ORDER_BY_VALUES {
			let dir = Direction::parse(v).unwrap();
			assert_eq!(dir == Direction::Asc, v.starts_with("asc"));
		}
		assert_eq!(Direction::parse("sideways"), None);
	}

	#[test]
	fn keys_keep_their_order() {
		let o = OrderBy::parse(&table(), &obj(&[("name", "desc_nulls_last"), ("id", "asc")]));
		assert_eq!(o.unwrap().to_sql(), r#" ORDER BY "name" DESC, "id" ASC"#);
		let list = GqlValue::List(vec![obj(&[("id", "desc")]), obj(&[("name", "asc")])]);
		assert_eq!(OrderBy::parse(&table(), &list).unwrap().to_sql(), r#" ORDER BY "id" DESC, "name" ASC"#);
		assert_eq!(OrderBy::default().to_sql(), "");
	}

	#[test]
	fn unknown_columns_are_rejected() {
		assert!(OrderBy::parse(&table(), &obj(&[("nope", "asc")])).is_err());
	}
}
