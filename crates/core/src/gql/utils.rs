use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Name, Value as GqlValue};
use indexmap::IndexMap;

use super::error::{GqlError, internal_error, resolver_error};
use crate::catalog::Table;
use crate::exe::Executor;
use crate::val::{Row, Value};

pub(crate) trait GqlValueUtils {
	fn as_i64(&self) -> Option<i64>;
	fn as_string(&self) -> Option<String>;
	fn as_list(&self) -> Option<&Vec<GqlValue>>;
	fn as_object(&self) -> Option<&IndexMap<Name, GqlValue>>;
}

impl GqlValueUtils for GqlValue {
	fn as_i64(&self) -> Option<i64> {
		if let GqlValue::Number(n) = self {
			n.as_i64()
		} else {
			None
		}
	}

	fn as_string(&self) -> Option<String> {
		if let GqlValue::String(s) = self {
			Some(s.to_owned())
		} else {
			None
		}
	}

	fn as_list(&self) -> Option<&Vec<GqlValue>> {
		if let GqlValue::List(a) = self {
			Some(a)
		} else {
			None
		}
	}

	fn as_object(&self) -> Option<&IndexMap<Name, GqlValue>> {
		if let GqlValue::Object(o) = self {
			Some(o)
		} else {
			None
		}
	}
}

/// The executor attached to the request.
pub(crate) fn executor(ctx: &ResolverContext<'_>) -> Result<Executor, GqlError> {
	ctx.data::<Executor>()
		.cloned()
		.map_err(|_| internal_error("no executor was attached to the request"))
}

/// The value of an argument, or null when it was not supplied.
pub(crate) fn arg(ctx: &ResolverContext<'_>, name: &str) -> GqlValue {
	ctx.args.get(name).map(|v| v.as_value().clone()).unwrap_or(GqlValue::Null)
}

/// The value of an integer argument.
pub(crate) fn int_arg(ctx: &ResolverContext<'_>, name: &str) -> Result<Option<i64>, GqlError> {
	match arg(ctx, name) {
		GqlValue::Null => Ok(None),
		v => match v.as_i64() {
			Some(i) if i >= 0 => Ok(Some(i)),
			_ => Err(resolver_error(format!("`{name}` must be a non-negative integer"))),
		},
	}
}

/// Converts an input object into a row, keeping only the table's columns.
pub(crate) fn row_from_input(table: &Table, v: &GqlValue) -> Result<Row, GqlError> {
	match v {
		GqlValue::Null => Ok(Row::new()),
		GqlValue::Object(o) => {
			let mut row = Row::with_capacity(o.len());
			for (k, v) in o {
				if table.column(k.as_str()).is_none() {
					return Err(resolver_error(format!(
						"column `{k}` does not exist on table `{}`",
						table.name
					)));
				}
				row.insert(k.to_string(), Value::from_gql(v));
			}
			Ok(row)
		}
		v => Err(resolver_error(format!("expected an input object, found {v}"))),
	}
}

/// Wraps rows as resolver parents.
pub(crate) fn rows_value<'a>(rows: Vec<Row>) -> FieldValue<'a> {
	FieldValue::list(rows.into_iter().map(FieldValue::owned_any))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn value_accessors() {
		assert_eq!(GqlValue::Number(3.into()).as_i64(), Some(3));
		assert_eq!(GqlValue::String("a".into()).as_string(), Some("a".to_owned()));
		assert!(GqlValue::Null.as_list().is_none());
		assert!(GqlValue::Object(Default::default()).as_object().is_some());
	}
}
