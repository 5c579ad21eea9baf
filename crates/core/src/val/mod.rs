//! Values exchanged with the storage layer.

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use async_graphql::Value as GqlValue;
use indexmap::IndexMap;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use serde_json::Number;

/// A single row, keyed by column name in projection order.
pub type Row = IndexMap<String, Value>;

/// A scalar value as stored in, or bound to, a relational column.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
	#[default]
	Null,
	Integer(i64),
	Real(f64),
	Text(String),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Converts a GraphQL input value into a bindable parameter.
	///
	/// Booleans become `0`/`1`, lists and objects are stored as JSON text.
	pub fn from_gql(v: &GqlValue) -> Value {
		match v {
			GqlValue::Null => Value::Null,
			GqlValue::Number(n) => match n.as_i64() {
				Some(i) => Value::Integer(i),
				None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
			},
			GqlValue::String(s) => Value::Text(s.clone()),
			GqlValue::Boolean(b) => Value::Integer(i64::from(*b)),
			GqlValue::Enum(n) => Value::Text(n.to_string()),
			GqlValue::Binary(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
			v @ (GqlValue::List(_) | GqlValue::Object(_)) => match v.clone().into_json() {
				Ok(json) => Value::Text(json.to_string()),
				Err(_) => Value::Text(v.to_string()),
			},
		}
	}

	/// Converts the value into a GraphQL output value.
	pub fn into_gql(self) -> GqlValue {
		match self {
			Value::Null => GqlValue::Null,
			Value::Integer(i) => GqlValue::Number(i.into()),
			Value::Real(f) => Number::from_f64(f).map(GqlValue::Number).unwrap_or(GqlValue::Null),
			Value::Text(s) => GqlValue::String(s),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Integer(a), Value::Integer(b)) => a == b,
			(Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
			(Value::Text(a), Value::Text(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Value::Null => {}
			Value::Integer(i) => i.hash(state),
			Value::Real(f) => f.to_bits().hash(state),
			Value::Text(s) => s.hash(state),
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("NULL"),
			Value::Integer(i) => write!(f, "{i}"),
			Value::Real(v) => write!(f, "{v}"),
			Value::Text(s) => write!(f, "{s:?}"),
		}
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Integer(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Real(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Text(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Text(v)
	}
}

impl From<ValueRef<'_>> for Value {
	fn from(v: ValueRef<'_>) -> Self {
		match v {
			ValueRef::Null => Value::Null,
			ValueRef::Integer(i) => Value::Integer(i),
			ValueRef::Real(f) => Value::Real(f),
			ValueRef::Text(t) | ValueRef::Blob(t) => {
				Value::Text(String::from_utf8_lossy(t).into_owned())
			}
		}
	}
}

impl From<Value> for serde_json::Value {
	fn from(v: Value) -> Self {
		match v {
			Value::Null => serde_json::Value::Null,
			Value::Integer(i) => serde_json::Value::Number(i.into()),
			Value::Real(f) => {
				Number::from_f64(f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
			}
			Value::Text(s) => serde_json::Value::String(s),
		}
	}
}

impl ToSql for Value {
	fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
		Ok(match self {
			Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
			Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
			Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
			Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
		})
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use async_graphql::Name;
	use indexmap::IndexMap as GqlMap;

	use super::*;

	#[test]
	fn gql_booleans_bind_as_integers() {
		assert_eq!(Value::from_gql(&GqlValue::Boolean(true)), Value::Integer(1));
		assert_eq!(Value::from_gql(&GqlValue::Boolean(false)), Value::Integer(0));
	}

	#[test]
	fn gql_objects_bind_as_json_text() {
		let mut obj = GqlMap::new();
		obj.insert(Name::new("x"), GqlValue::Number(1.into()));
		let v = Value::from_gql(&GqlValue::Object(obj));
		assert_eq!(v, Value::Text(r#"{"x":1}"#.to_owned()));
	}

	#[test]
	fn floats_are_hashable_keys() {
		let mut seen = HashSet::new();
		assert!(seen.insert(Value::Real(1.5)));
		assert!(!seen.insert(Value::Real(1.5)));
		assert!(seen.insert(Value::Integer(1)));
		assert!(seen.insert(Value::Text("1".into())));
	}

	#[test]
	fn non_finite_reals_become_null() {
		assert_eq!(Value::Real(f64::NAN).into_gql(), GqlValue::Null);
		assert_eq!(serde_json::Value::from(Value::Real(f64::INFINITY)), serde_json::Value::Null);
	}
}
