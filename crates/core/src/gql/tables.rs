use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{
	Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Type,
	TypeRef,
};
use indexmap::IndexMap;

use super::error::{GqlError, internal_error, type_error};
use super::scalar::{SAFE_INT, ScalarKind, serialize_safe_int};
use super::types::{ColumnField, TableTypes};
use super::utils::{arg, executor, int_arg, rows_value};
use crate::catalog::Table;
use crate::exe::Mutated;
use crate::path::{Extracted, PathEvaluator, extract};
use crate::sql::{Filter, ORDER_BY_VALUES, OrderBy, Select};
use crate::val::{Row, Value};

pub(super) const ORDER_BY: &str = "order_by";
pub(super) const CONFLICT_ACTION: &str = "conflict_action";
pub(super) const AGGREGATE: &str = "aggregate";

macro_rules! limit_input {
	() => {
		InputValue::new("limit", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! offset_input {
	() => {
		InputValue::new("offset", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! where_input {
	($tt:expr) => {
		InputValue::new("where", TypeRef::named(&$tt.bool_exp))
	};
}

macro_rules! order_by_input {
	($tt:expr) => {
		InputValue::new("order_by", TypeRef::named_nn_list(&$tt.order_by))
	};
}

/// The parent of aggregate fields: a table and the rows being counted.
#[derive(Clone)]
pub(super) struct Aggregated {
	table: Arc<Table>,
	filter: Filter,
}

/// Restricts a relation field to the rows whose `column` holds the value of
/// the parent row's `key`.
struct Scope {
	column: String,
	key: String,
}

pub(super) fn comparison_name(kind: ScalarKind) -> String {
	format!("{}_comparison_exp", kind.type_name())
}

/// Registers the types shared by every table.
pub(super) fn shared_types(types: &mut Vec<Type>) {
	for kind in [ScalarKind::SafeInt, ScalarKind::Float, ScalarKind::String, ScalarKind::Json] {
		let ty = kind.type_name();
		let comparison = InputObject::new(comparison_name(kind))
			.description(format!("Boolean expression to compare columns of type `{ty}`"))
			.field(InputValue::new("_eq", TypeRef::named(ty)))
			.field(InputValue::new("_neq", TypeRef::named(ty)))
			.field(InputValue::new("_in", TypeRef::named_nn_list(ty)))
			.field(InputValue::new("_nin", TypeRef::named_nn_list(ty)))
			.field(InputValue::new("_ilike", TypeRef::named(TypeRef::STRING)))
			.field(InputValue::new("_is_null", TypeRef::named(TypeRef::BOOLEAN)));
		types.push(Type::InputObject(comparison));
	}

	types.push(Type::Enum(
		Enum::new(ORDER_BY)
			.description("Column ordering options, null placement hints are accepted but ignored")
			.items(ORDER_BY_VALUES),
	));

	types.push(Type::Enum(
		Enum::new(CONFLICT_ACTION)
			.description("What to do when an inserted row conflicts with an existing one")
			.item("nothing")
			.item("update"),
	));

	let aggregate = Object::new(AGGREGATE).field(Field::new(
		"count",
		TypeRef::named_nn(SAFE_INT),
		|ctx| {
			FieldFuture::new(async move {
				let agg = ctx.parent_value.try_downcast_ref::<Aggregated>()?;
				let exe = executor(&ctx)?;
				let count = exe.count(&agg.table, &agg.filter).await?;
				Ok(Some(FieldValue::value(count)))
			})
		},
	));
	types.push(Type::Object(aggregate));
}

/// Registers the object, input and filter types of one table.
pub(super) fn table_types(
	tt: &Arc<TableTypes>,
	all: &IndexMap<String, Arc<TableTypes>>,
	evaluator: &Arc<dyn PathEvaluator>,
	types: &mut Vec<Type>,
) {
	let tb_name = tt.name();
	trace!("Adding types for table: {tb_name}");

	let mut table_ty_obj = Object::new(&tt.object)
		.description(format!("Generated from table `{tb_name}`"));
	let mut table_filter = InputObject::new(&tt.bool_exp)
		.description(format!(
			"Generated from `{tb_name}` a boolean expression to filter rows, sibling fields are combined with AND"
		))
		.field(InputValue::new("_and", TypeRef::named_nn_list(&tt.bool_exp)))
		.field(InputValue::new("_or", TypeRef::named_nn_list(&tt.bool_exp)))
		.field(InputValue::new("_not", TypeRef::named(&tt.bool_exp)));
	let mut table_order = InputObject::new(&tt.order_by)
		.description(format!("Generated from `{tb_name}` an object representing a query ordering"));
	let mut insert_input = InputObject::new(&tt.insert_input)
		.description(format!("Generated from `{tb_name}` a row to insert"));
	let mut set_input = InputObject::new(&tt.set_input)
		.description(format!("Generated from `{tb_name}` the columns to set in an update"));
	let mut inc_input = tt.inc_input.as_ref().map(|name| {
		InputObject::new(name)
			.description(format!("Generated from `{tb_name}` the numeric columns to increment"))
	});

	let mut names = HashSet::new();
	for col in tt.columns.iter() {
		names.insert(col.name.clone());
		let mut field = Field::new(
			col.name.as_str(),
			col.kind.type_ref(col.nullable),
			make_column_resolver(col.clone(), evaluator.clone()),
		);
		if col.kind.accepts_path() {
			field = field.argument(InputValue::new("path", TypeRef::named(TypeRef::STRING)));
		}
		table_ty_obj = table_ty_obj.field(field);

		table_filter = table_filter
			.field(InputValue::new(col.name.as_str(), TypeRef::named(comparison_name(col.kind))));
		table_order = table_order.field(InputValue::new(col.name.as_str(), TypeRef::named(ORDER_BY)));
		insert_input = insert_input
			.field(InputValue::new(col.name.as_str(), col.kind.type_ref(col.nullable)));
		set_input = set_input.field(InputValue::new(col.name.as_str(), col.kind.type_ref(true)));
		if col.kind.is_numeric() {
			inc_input = inc_input
				.map(|inc| inc.field(InputValue::new(col.name.as_str(), col.kind.type_ref(true))));
		}
	}

	// Forward relations
	for rel in tt.table.forward.iter() {
		let Some(target) = all.get(&rel.target) else {
			continue;
		};
		if tt.column(&rel.column).is_none() || target.column(&rel.target_column).is_none() {
			continue;
		}
		let name = format!("{}_by_fk", rel.column);
		if !names.insert(name.clone()) {
			warn!("Skipping relation field `{tb_name}.{name}`, the name is already taken");
			continue;
		}
		table_ty_obj = table_ty_obj.field(
			Field::new(
				name,
				TypeRef::named(&target.object),
				make_forward_resolver(target.clone(), rel.column.clone(), rel.target_column.clone()),
			)
			.description(format!("The `{}` row referenced by `{}`", rel.target, rel.column)),
		);
	}

	// Reverse relations
	let mut per_source: HashMap<&str, usize> = HashMap::new();
	for rel in tt.table.reverse.iter() {
		*per_source.entry(rel.source.as_str()).or_default() += 1;
	}
	for rel in tt.table.reverse.iter() {
		let Some(source) = all.get(&rel.source) else {
			continue;
		};
		if source.column(&rel.column).is_none() || tt.column(&rel.target_column).is_none() {
			continue;
		}
		let list_name = format!("{}_by_{}", rel.source, rel.column);
		let agg_name = if per_source.get(rel.source.as_str()).copied().unwrap_or_default() > 1 {
			format!("{list_name}_aggregate")
		} else {
			format!("{}_aggregate", rel.source)
		};
		if !names.insert(list_name.clone()) || !names.insert(agg_name.clone()) {
			warn!("Skipping relation fields `{tb_name}.{list_name}`, the name is already taken");
			continue;
		}
		let scope = Arc::new(Scope {
			column: rel.column.clone(),
			key: rel.target_column.clone(),
		});
		table_ty_obj = table_ty_obj
			.field(
				Field::new(
					list_name,
					TypeRef::named_nn_list_nn(&source.object),
					make_list_resolver(source.clone(), Some(scope.clone())),
				)
				.description(format!("The `{}` rows whose `{}` references this row", rel.source, rel.column))
				.argument(where_input!(source))
				.argument(order_by_input!(source))
				.argument(limit_input!())
				.argument(offset_input!()),
			)
			.field(
				Field::new(
					agg_name,
					TypeRef::named_nn(&source.aggregate),
					make_aggregate_resolver(source.clone(), Some(scope)),
				)
				.argument(where_input!(source)),
			);
	}

	types.push(Type::Object(table_ty_obj));
	types.push(Type::InputObject(table_filter));
	types.push(Type::InputObject(table_order));
	types.push(Type::InputObject(insert_input));
	types.push(Type::InputObject(set_input));
	if let Some(inc_input) = inc_input {
		types.push(Type::InputObject(inc_input));
	}

	if let (Some(pk_input), Some(pk)) = (&tt.pk_input, tt.pk()) {
		types.push(Type::InputObject(
			InputObject::new(pk_input)
				.description(format!("Generated from `{tb_name}` the primary key of a row"))
				.field(InputValue::new(pk.name.as_str(), pk.kind.type_ref(false))),
		));
	}

	if let Some(on_conflict) = &tt.on_conflict {
		types.push(Type::InputObject(
			InputObject::new(on_conflict)
				.description(format!(
					"Generated from `{tb_name}` the policy applied when an insert conflicts, \
					the constraint is `{}` or a comma separated list of columns",
					tt.table.pkey_constraint()
				))
				.field(InputValue::new("constraint", TypeRef::named_nn(TypeRef::STRING)))
				.field(InputValue::new("action", TypeRef::named(CONFLICT_ACTION)))
				.field(InputValue::new("update_columns", TypeRef::named_nn_list(TypeRef::STRING))),
		));
	}

	let mut updates_input = InputObject::new(&tt.updates_input)
		.field(InputValue::new("where", TypeRef::named_nn(&tt.bool_exp)))
		.field(InputValue::new("_set", TypeRef::named(&tt.set_input)));
	if let Some(inc) = &tt.inc_input {
		updates_input = updates_input.field(InputValue::new("_inc", TypeRef::named(inc)));
	}
	types.push(Type::InputObject(updates_input));

	types.push(Type::Object(Object::new(&tt.aggregate).field(Field::new(
		AGGREGATE,
		TypeRef::named_nn(AGGREGATE),
		|ctx| {
			FieldFuture::new(async move {
				let agg = ctx.parent_value.try_downcast_ref::<Aggregated>()?;
				Ok(Some(FieldValue::owned_any(agg.clone())))
			})
		},
	))));

	types.push(Type::Object(
		Object::new(&tt.mutation_response)
			.field(Field::new("affected_rows", TypeRef::named_nn(TypeRef::INT), |ctx| {
				FieldFuture::new(async move {
					let res = ctx.parent_value.try_downcast_ref::<Mutated>()?;
					Ok(Some(FieldValue::value(res.affected_rows as i64)))
				})
			}))
			.field(Field::new("returning", TypeRef::named_nn_list_nn(&tt.object), |ctx| {
				FieldFuture::new(async move {
					let res = ctx.parent_value.try_downcast_ref::<Mutated>()?;
					Ok(Some(rows_value(res.returning.clone())))
				})
			})),
	));
}

/// Adds the root query fields of one table.
pub(super) fn query_fields(tt: &Arc<TableTypes>, mut query: Object) -> Object {
	let tb_name = tt.name();

	query = query.field(
		Field::new(
			tb_name,
			TypeRef::named_nn_list_nn(&tt.object),
			make_list_resolver(tt.clone(), None),
		)
		.description(format!("Generated from table `{tb_name}`\nallows querying a table with filters"))
		.argument(where_input!(tt))
		.argument(order_by_input!(tt))
		.argument(limit_input!())
		.argument(offset_input!()),
	);

	if let Some(pk) = tt.pk() {
		let tt1 = tt.clone();
		query = query.field(
			Field::new(format!("{tb_name}_by_pk"), TypeRef::named(&tt.object), move |ctx| {
				let tt = tt1.clone();
				FieldFuture::new(async move {
					let exe = executor(&ctx)?;
					let key = pk_arg(&tt, &ctx)?;
					let row = exe.by_pk(&tt.table, key).await?;
					Ok(row.map(FieldValue::owned_any))
				})
			})
			.description(format!(
				"Generated from table `{tb_name}`\nallows querying a single row by primary key"
			))
			.argument(InputValue::new(pk.name.as_str(), pk.kind.type_ref(false))),
		);
	}

	query.field(
		Field::new(
			format!("{tb_name}_aggregate"),
			TypeRef::named_nn(&tt.aggregate),
			make_aggregate_resolver(tt.clone(), None),
		)
		.description(format!("Generated from table `{tb_name}`\nallows counting the rows of a table"))
		.argument(where_input!(tt)),
	)
}

/// The primary key value passed as an argument named after the key column.
pub(super) fn pk_arg(tt: &TableTypes, ctx: &ResolverContext<'_>) -> Result<Value, GqlError> {
	let pk = tt.pk().ok_or_else(|| internal_error(format!("table `{}` has no primary key", tt.name())))?;
	match arg(ctx, &pk.name) {
		GqlValue::Null => Err(internal_error(format!(
			"Schema validation failed: No `{}` found in `{}_by_pk`",
			pk.name,
			tt.name()
		))),
		v => Ok(Value::from_gql(&v)),
	}
}

fn select_args(tt: &TableTypes, ctx: &ResolverContext<'_>) -> Result<Select, GqlError> {
	Ok(Select {
		filter: Filter::parse(&tt.table, &arg(ctx, "where"))?,
		order: OrderBy::parse(&tt.table, &arg(ctx, "order_by"))?,
		limit: int_arg(ctx, "limit")?,
		offset: int_arg(ctx, "offset")?,
	})
}

/// The filter restricting a relation field to its parent row, or [`None`]
/// if the parent holds no key.
fn scoped(ctx: &ResolverContext<'_>, scope: &Scope) -> Result<Option<Filter>, GqlError> {
	let row = ctx
		.parent_value
		.downcast_ref::<Row>()
		.ok_or_else(|| internal_error("failed to downcast"))?;
	match row.get(&scope.key) {
		None | Some(Value::Null) => Ok(None),
		Some(v) => Ok(Some(Filter::eq(scope.column.as_str(), v.clone()))),
	}
}

fn make_list_resolver(
	tt: Arc<TableTypes>,
	scope: Option<Arc<Scope>>,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let tt = tt.clone();
		let scope = scope.clone();
		FieldFuture::new(async move {
			let exe = executor(&ctx)?;
			let mut sel = select_args(&tt, &ctx)?;
			if let Some(scope) = &scope {
				match scoped(&ctx, scope)? {
					Some(f) => sel.filter = sel.filter.and(f),
					None => return Ok(Some(FieldValue::list(Vec::<FieldValue>::new()))),
				}
			}
			trace!("parsed list query on `{}`: {sel:?}", tt.name());
			let rows = exe.select(&tt.table, &sel).await?;
			Ok(Some(rows_value(rows)))
		})
	}
}

fn make_aggregate_resolver(
	tt: Arc<TableTypes>,
	scope: Option<Arc<Scope>>,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let tt = tt.clone();
		let scope = scope.clone();
		FieldFuture::new(async move {
			let mut filter = Filter::parse(&tt.table, &arg(&ctx, "where"))?;
			if let Some(scope) = &scope {
				// A parent without a key is referenced by no rows
				let restrict = scoped(&ctx, scope)?
					.unwrap_or_else(|| Filter::within(scope.column.as_str(), Vec::new()));
				filter = filter.and(restrict);
			}
			Ok(Some(FieldValue::owned_any(Aggregated {
				table: tt.table.clone(),
				filter,
			})))
		})
	}
}

fn make_forward_resolver(
	target: Arc<TableTypes>,
	column: String,
	target_column: String,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let target = target.clone();
		let column = column.clone();
		let target_column = target_column.clone();
		FieldFuture::new(async move {
			let row = ctx.parent_value.try_downcast_ref::<Row>()?;
			let key = match row.get(&column) {
				None | Some(Value::Null) => return Ok(None),
				Some(v) => v.clone(),
			};
			let exe = executor(&ctx)?;
			let found = exe.find(&target.table, &target_column, key).await?;
			Ok(found.map(FieldValue::owned_any))
		})
	}
}

fn make_column_resolver(
	col: ColumnField,
	evaluator: Arc<dyn PathEvaluator>,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let col = col.clone();
		let evaluator = evaluator.clone();
		FieldFuture::new(async move {
			let row = ctx
				.parent_value
				.downcast_ref::<Row>()
				.ok_or_else(|| internal_error("failed to downcast"))?;
			let value = row.get(&col.name).cloned().unwrap_or_default();
			let path = match arg(&ctx, "path") {
				GqlValue::String(s) => Some(s),
				_ => None,
			};
			let out = render(&col, value, path.as_deref(), evaluator.as_ref())?;
			Ok(Some(FieldValue::value(out)))
		})
	}
}

fn text(v: Value) -> String {
	match v {
		Value::Text(s) => s,
		v => v.to_string(),
	}
}

/// Converts a stored value into the output of a column field.
fn render(
	col: &ColumnField,
	value: Value,
	path: Option<&str>,
	evaluator: &dyn PathEvaluator,
) -> Result<GqlValue, GqlError> {
	if value.is_null() {
		return Ok(GqlValue::Null);
	}
	match col.kind {
		ScalarKind::SafeInt => {
			let v = value.into_gql();
			serialize_safe_int(&v).map(GqlValue::from).map_err(|e| type_error(col.kind, &v, e))
		}
		ScalarKind::Float => Ok(value.into_gql()),
		ScalarKind::String if path.is_none() => Ok(GqlValue::String(text(value))),
		kind => match extract(evaluator, text(value), path, kind == ScalarKind::Json) {
			Extracted::Json(v) => GqlValue::from_json(v)
				.map_err(|e| internal_error(format!("unable to convert extracted JSON: {e}"))),
			Extracted::Text(s) => Ok(GqlValue::String(s)),
		},
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::path::JmesPath;

	fn field(kind: ScalarKind) -> ColumnField {
		ColumnField {
			name: "c".into(),
			kind,
			nullable: true,
		}
	}

	#[test]
	fn render_applies_paths_by_scalar() {
		let doc = Value::from(r#"{"x": {"y": 2}}"#);
		let json = render(&field(ScalarKind::Json), doc.clone(), Some("x"), &JmesPath).unwrap();
		assert_eq!(json.into_json().unwrap(), json!({"y": 2}));
		let text = render(&field(ScalarKind::String), doc.clone(), Some("x"), &JmesPath).unwrap();
		assert_eq!(text, GqlValue::String(r#"{"y":2}"#.into()));
		let raw = render(&field(ScalarKind::String), doc, None, &JmesPath).unwrap();
		assert_eq!(raw, GqlValue::String(r#"{"x": {"y": 2}}"#.into()));
	}

	#[test]
	fn render_soft_fails_on_invalid_json() {
		let out = render(&field(ScalarKind::Json), Value::from("{oops"), None, &JmesPath).unwrap();
		assert_eq!(out, GqlValue::String("{oops".into()));
	}

	#[test]
	fn render_checks_safe_integers() {
		let ok = render(&field(ScalarKind::SafeInt), Value::Integer(7), None, &JmesPath).unwrap();
		assert_eq!(ok, GqlValue::from(7));
		let big = Value::Integer(crate::cnf::MAX_SAFE_INTEGER + 1);
		assert!(render(&field(ScalarKind::SafeInt), big, None, &JmesPath).is_err());
		let null = render(&field(ScalarKind::SafeInt), Value::Null, None, &JmesPath).unwrap();
		assert_eq!(null, GqlValue::Null);
	}
}
