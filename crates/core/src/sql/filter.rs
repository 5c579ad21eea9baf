//! Boolean filter expressions.
//!
//! A filter is parsed from a `<table>_bool_exp` input object and compiled
//! into a parameterized `WHERE` clause. Every column key contributes one
//! condition per operator present, and sibling keys are combined with `AND`.
//! The `_and`, `_or` and `_not` keys nest recursively.

use async_graphql::{Name, Value as GqlValue};
use indexmap::IndexMap;

use super::quote;
use crate::catalog::Table;
use crate::err::{Result, compilation};
use crate::val::Value;

/// A comparison applied to a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
	Eq(Value),
	Neq(Value),
	In(Vec<Value>),
	Nin(Vec<Value>),
	Like(Value),
	IsNull(bool),
}

impl Op {
	fn parse(name: &str, v: &GqlValue) -> Result<Op> {
		let op = match name {
			"_eq" => Op::Eq(Value::from_gql(v)),
			"_neq" => Op::Neq(Value::from_gql(v)),
			"_in" => Op::In(list(name, v)?),
			"_nin" => Op::Nin(list(name, v)?),
			"_ilike" => Op::Like(Value::from_gql(v)),
			"_is_null" => match v {
				GqlValue::Boolean(b) => Op::IsNull(*b),
				v => return Err(compilation(format!("`_is_null` expects a boolean, found {v}"))),
			},
			op => return Err(compilation(format!("unsupported comparison operator `{op}`"))),
		};
		Ok(op)
	}

	fn build(&self, col: &str, params: &mut Vec<Value>) -> String {
		match self {
			Op::Eq(v) => {
				params.push(v.clone());
				format!("{col} = ?")
			}
			Op::Neq(v) => {
				params.push(v.clone());
				format!("{col} <> ?")
			}
			Op::Like(v) => {
				params.push(v.clone());
				format!("{col} LIKE ?")
			}
			Op::In(vs) if vs.is_empty() => "0".to_owned(),
			Op::Nin(vs) if vs.is_empty() => "1".to_owned(),
			Op::In(vs) => {
				params.extend(vs.iter().cloned());
				format!("{col} IN ({})", placeholders(vs.len()))
			}
			Op::Nin(vs) => {
				params.extend(vs.iter().cloned());
				format!("{col} NOT IN ({})", placeholders(vs.len()))
			}
			Op::IsNull(true) => format!("{col} IS NULL"),
			Op::IsNull(false) => format!("{col} IS NOT NULL"),
		}
	}
}

fn list(op: &str, v: &GqlValue) -> Result<Vec<Value>> {
	match v {
		GqlValue::List(vs) => Ok(vs.iter().map(Value::from_gql).collect()),
		GqlValue::Null => Err(compilation(format!("`{op}` expects a list, found null"))),
		// A single value coerces to a list of one
		v => Ok(vec![Value::from_gql(v)]),
	}
}

pub(crate) fn placeholders(n: usize) -> String {
	vec!["?"; n].join(", ")
}

/// A recursive boolean expression over the columns of one table.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
	And(Vec<Filter>),
	Or(Vec<Filter>),
	Not(Box<Filter>),
	Cmp {
		column: String,
		op: Op,
	},
}

impl Default for Filter {
	fn default() -> Self {
		Filter::And(Vec::new())
	}
}

impl Filter {
	/// An equality test on one column.
	pub fn eq(column: impl Into<String>, value: Value) -> Filter {
		Filter::Cmp {
			column: column.into(),
			op: Op::Eq(value),
		}
	}

	/// A set membership test on one column.
	pub fn within(column: impl Into<String>, values: Vec<Value>) -> Filter {
		Filter::Cmp {
			column: column.into(),
			op: Op::In(values),
		}
	}

	/// Combines this filter with another one.
	pub fn and(self, other: Filter) -> Filter {
		match self {
			Filter::And(mut fs) => {
				fs.push(other);
				Filter::And(fs)
			}
			f => Filter::And(vec![f, other]),
		}
	}

	/// Parses a `<table>_bool_exp` input value.
	///
	/// Column names are checked against the table, so only trusted
	/// identifiers ever reach the compiled SQL.
	pub fn parse(table: &Table, v: &GqlValue) -> Result<Filter> {
		match v {
			GqlValue::Null => Ok(Filter::default()),
			GqlValue::Object(o) => Self::parse_object(table, o),
			v => Err(compilation(format!("a filter must be an object, found {v}"))),
		}
	}

	fn parse_object(table: &Table, o: &IndexMap<Name, GqlValue>) -> Result<Filter> {
		let mut out = Vec::with_capacity(o.len());
		for (k, v) in o {
			match k.as_str() {
				"_and" => out.push(Filter::And(Self::parse_list(table, k, v)?)),
				"_or" => out.push(Filter::Or(Self::parse_list(table, k, v)?)),
				"_not" => out.push(Filter::Not(Box::new(Self::parse(table, v)?))),
				col => {
					if table.column(col).is_none() {
						return Err(compilation(format!(
							"column `{col}` does not exist on table `{}`",
							table.name
						)));
					}
					let ops = match v {
						GqlValue::Object(ops) => ops,
						GqlValue::Null => continue,
						v => {
							return Err(compilation(format!(
								"the comparison for `{col}` must be an object, found {v}"
							)));
						}
					};
					for (op, v) in ops {
						out.push(Filter::Cmp {
							column: col.to_owned(),
							op: Op::parse(op, v)?,
						});
					}
				}
			}
		}
		Ok(Filter::And(out))
	}

	fn parse_list(table: &Table, key: &Name, v: &GqlValue) -> Result<Vec<Filter>> {
		match v {
			GqlValue::List(vs) => vs.iter().map(|v| Self::parse(table, v)).collect(),
			GqlValue::Null => Ok(Vec::new()),
			GqlValue::Object(_) => Ok(vec![Self::parse(table, v)?]),
			v => Err(compilation(format!("`{key}` expects a list of filters, found {v}"))),
		}
	}

	/// Compiles the filter, appending its parameters.
	///
	/// Returns [`None`] when the filter places no constraint on the rows.
	pub fn build(&self, params: &mut Vec<Value>) -> Option<String> {
		match self {
			Filter::And(fs) => group(fs, params),
			Filter::Or(fs) => any(fs, params),
			// An empty operand matches every row, so its negation matches none
			Filter::Not(f) => Some(format!("NOT ({})", f.build(params).unwrap_or_else(|| "1".into()))),
			Filter::Cmp {
				column,
				op,
			} => Some(op.build(&quote(column), params)),
		}
	}

	/// Compiles the filter into a `WHERE` clause, or an empty string.
	pub fn to_where(&self, params: &mut Vec<Value>) -> String {
		match self.build(params) {
			Some(c) => format!(" WHERE {c}"),
			None => String::new(),
		}
	}

	/// Whether the filter compiles to no constraint at all.
	pub fn is_empty(&self) -> bool {
		self.build(&mut Vec::new()).is_none()
	}
}

/// A disjunction is unconstrained as soon as one of its operands is.
fn any(fs: &[Filter], params: &mut Vec<Value>) -> Option<String> {
	let mut local = Vec::new();
	let mut parts = Vec::with_capacity(fs.len());
	for f in fs {
		parts.push(f.build(&mut local)?);
	}
	let clause = match parts.len() {
		0 => return None,
		1 => parts.pop()?,
		_ => format!("({})", parts.join(" OR ")),
	};
	params.extend(local);
	Some(clause)
}

/// A conjunction skips its unconstrained operands.
fn group(fs: &[Filter], params: &mut Vec<Value>) -> Option<String> {
	let mut parts: Vec<String> = fs.iter().filter_map(|f| f.build(params)).collect();
	match parts.len() {
		0 => None,
		1 => parts.pop(),
		_ => Some(format!("({})", parts.join(" AND "))),
	}
}
