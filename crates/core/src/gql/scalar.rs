//! Output scalars and the mapping from storage types onto them.

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{Scalar, TypeRef};
use regex::Regex;

use crate::catalog::{Column, StorageType};
use crate::cnf::{DEFAULT_JSON_COLUMN_PATTERN, JSON_COLUMN_PATTERN, MAX_SAFE_INTEGER};
use crate::err::Error;

pub const SAFE_INT: &str = "SafeInt";
pub const JSON: &str = "JSON";

const SAFE_INT_URL: &str = "https://www.ecma-international.org/ecma-262/#sec-number.issafeinteger";

/// The scalar a column is exposed as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
	SafeInt,
	Float,
	String,
	Json,
}

impl ScalarKind {
	/// Maps a column onto its scalar.
	///
	/// Text columns whose name is matched by the JSON column predicate are
	/// exposed as embedded JSON.
	pub fn of(table: &str, column: &Column, json: &JsonColumns) -> Result<ScalarKind, Error> {
		match &column.storage_type {
			StorageType::Integer => Ok(ScalarKind::SafeInt),
			StorageType::Real => Ok(ScalarKind::Float),
			StorageType::Text if json.matches(table, &column.name) => Ok(ScalarKind::Json),
			StorageType::Text => Ok(ScalarKind::String),
			StorageType::Unsupported(_) => Err(Error::TypeSynthesis {
				table: table.to_owned(),
				column: column.name.clone(),
				kind: column.storage_type.to_string(),
			}),
		}
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			ScalarKind::SafeInt => SAFE_INT,
			ScalarKind::Float => TypeRef::FLOAT,
			ScalarKind::String => TypeRef::STRING,
			ScalarKind::Json => JSON,
		}
	}

	/// Whether fields of this scalar accept a `path` argument.
	pub fn accepts_path(&self) -> bool {
		matches!(self, ScalarKind::String | ScalarKind::Json)
	}

	/// Whether the scalar can be incremented in place.
	pub fn is_numeric(&self) -> bool {
		matches!(self, ScalarKind::SafeInt | ScalarKind::Float)
	}

	/// The field type of a column of this scalar.
	pub fn type_ref(&self, nullable: bool) -> TypeRef {
		if nullable {
			TypeRef::named(self.type_name())
		} else {
			TypeRef::named_nn(self.type_name())
		}
	}
}

/// Decides which text columns hold embedded JSON.
///
/// A column matches when its name matches the pattern, unless it is listed
/// as excluded. Columns listed as forced always match. Listed columns are
/// written as `table.column`.
#[derive(Clone, Debug)]
pub struct JsonColumns {
	pattern: Option<Regex>,
	force: Vec<String>,
	exclude: Vec<String>,
}

impl JsonColumns {
	pub fn new(pattern: &str) -> Result<JsonColumns, regex::Error> {
		Ok(JsonColumns {
			pattern: Some(Regex::new(pattern)?),
			force: Vec::new(),
			exclude: Vec::new(),
		})
	}

	pub fn force<I, S>(mut self, columns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.force.extend(columns.into_iter().map(Into::into));
		self
	}

	pub fn exclude<I, S>(mut self, columns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude.extend(columns.into_iter().map(Into::into));
		self
	}

	pub fn matches(&self, table: &str, column: &str) -> bool {
		let listed = |list: &[String]| {
			list.iter().any(|l| l.split_once('.') == Some((table, column)))
		};
		if listed(&self.force) {
			return true;
		}
		if listed(&self.exclude) {
			return false;
		}
		self.pattern.as_ref().is_some_and(|p| p.is_match(column))
	}
}

impl Default for JsonColumns {
	fn default() -> Self {
		JsonColumns::new(&JSON_COLUMN_PATTERN)
			.or_else(|e| {
				warn!("Ignoring the invalid JSON column pattern {:?}: {e}", *JSON_COLUMN_PATTERN);
				JsonColumns::new(DEFAULT_JSON_COLUMN_PATTERN)
			})
			.unwrap_or(JsonColumns {
				pattern: None,
				force: Vec::new(),
				exclude: Vec::new(),
			})
	}
}

fn check_safe(n: f64, shown: &dyn std::fmt::Display) -> Result<i64, String> {
	if !n.is_finite() || n.fract() != 0.0 {
		return Err(format!("SafeInt cannot represent non-integer value: {shown}"));
	}
	if n.abs() > MAX_SAFE_INTEGER as f64 {
		return Err(format!("SafeInt cannot represent unsafe integer value: {shown}"));
	}
	Ok(n as i64)
}

fn check_safe_int(i: i64) -> Result<i64, String> {
	if i.unsigned_abs() > MAX_SAFE_INTEGER as u64 {
		return Err(format!("SafeInt cannot represent unsafe integer value: {i}"));
	}
	Ok(i)
}

/// Converts numeric text the way an ECMAScript `Number()` call does.
fn parse_number(s: &str) -> f64 {
	let t = s.trim();
	if t.is_empty() {
		return 0.0;
	}
	let radix = match t.get(..2) {
		Some("0x" | "0X") => Some(16),
		Some("0o" | "0O") => Some(8),
		Some("0b" | "0B") => Some(2),
		_ => None,
	};
	if let Some(radix) = radix {
		return match u64::from_str_radix(&t[2..], radix) {
			Ok(v) => v as f64,
			Err(_) => f64::NAN,
		};
	}
	match t {
		"Infinity" | "+Infinity" => f64::INFINITY,
		"-Infinity" => f64::NEG_INFINITY,
		// Rust accepts spellings which ECMAScript does not
		t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
		t => t.parse().unwrap_or(f64::NAN),
	}
}

/// Converts an internal value into a `SafeInt` output.
///
/// Booleans become `1` or `0` and non-empty strings are parsed as numbers.
/// The result must be an integer with a magnitude of at most 2^53 - 1.
pub fn serialize_safe_int(v: &GqlValue) -> Result<i64, String> {
	match v {
		GqlValue::Boolean(b) => Ok(i64::from(*b)),
		GqlValue::Number(n) => match n.as_i64() {
			Some(i) => check_safe_int(i),
			None => check_safe(n.as_f64().unwrap_or(f64::NAN), n),
		},
		GqlValue::String(s) if !s.is_empty() => check_safe(parse_number(s), s),
		v => Err(format!("SafeInt cannot represent non-integer value: {v}")),
	}
}

/// Converts a `SafeInt` input, either a variable or an inline literal.
///
/// Only integers within the safe range are accepted. Unlike serialization,
/// booleans and numeric strings are rejected.
pub fn parse_safe_int(v: &GqlValue) -> Result<i64, String> {
	match v {
		GqlValue::Number(n) => match n.as_i64() {
			Some(i) => check_safe_int(i),
			None => Err(format!("SafeInt cannot represent non-integer value: {n}")),
		},
		v => Err(format!("SafeInt cannot represent non-integer value: {v}")),
	}
}

/// The `SafeInt` scalar type.
pub fn safe_int_scalar() -> Scalar {
	Scalar::new(SAFE_INT)
		.description(
			"The `SafeInt` scalar type represents non-fractional signed whole numeric values \
			that are considered safe as defined by the ECMAScript specification.",
		)
		.specified_by_url(SAFE_INT_URL)
		.validator(|v| parse_safe_int(v).is_ok())
}

/// The `JSON` scalar type, holding any structured value.
pub fn json_scalar() -> Scalar {
	Scalar::new(JSON).description("The `JSON` scalar type represents arbitrary JSON values.")
}
