use std::sync::Arc;

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, TypeRef};

use super::error::{GqlError, resolver_error};
use super::tables::pk_arg;
use super::types::TableTypes;
use super::utils::{GqlValueUtils, arg, executor, row_from_input, rows_value};
use crate::sql::{Filter, OnConflict, Update};
use crate::val::{Row, Value};

/// Adds the root mutation fields of one table.
pub(super) fn mutation_fields(tt: &Arc<TableTypes>, mut mutation: Object) -> Object {
	let tb_name = tt.name();

	let on_conflict = |field: Field| match &tt.on_conflict {
		Some(name) => field.argument(InputValue::new("on_conflict", TypeRef::named(name))),
		None => field,
	};

	let tt1 = tt.clone();
	mutation = mutation.field(on_conflict(
		Field::new(format!("insert_{tb_name}_one"), TypeRef::named(&tt.object), move |ctx| {
			let tt = tt1.clone();
			FieldFuture::new(async move {
				let exe = executor(&ctx)?;
				let record = row_from_input(&tt.table, &arg(&ctx, "object"))?;
				let conflict = conflict_arg(&tt, &ctx)?;
				let rows = exe.insert(&tt.table, &[record], conflict.as_ref()).await?;
				Ok(rows.into_iter().next().map(FieldValue::owned_any))
			})
		})
		.description(format!(
			"Generated from table `{tb_name}`\ninserts a single row, returning nothing if a conflict skipped it"
		))
		.argument(InputValue::new("object", TypeRef::named_nn(&tt.insert_input))),
	));

	let tt1 = tt.clone();
	mutation = mutation.field(on_conflict(
		Field::new(format!("insert_{tb_name}"), TypeRef::named_nn_list_nn(&tt.object), move |ctx| {
			let tt = tt1.clone();
			FieldFuture::new(async move {
				let exe = executor(&ctx)?;
				let objects = arg(&ctx, "objects");
				let records = objects
					.as_list()
					.ok_or_else(|| resolver_error("`objects` must be a list"))?
					.iter()
					.map(|v| row_from_input(&tt.table, v))
					.collect::<Result<Vec<Row>, GqlError>>()?;
				if records.is_empty() {
					return Ok(Some(rows_value(Vec::new())));
				}
				let conflict = conflict_arg(&tt, &ctx)?;
				let rows = exe.insert(&tt.table, &records, conflict.as_ref()).await?;
				Ok(Some(rows_value(rows)))
			})
		})
		.description(format!("Generated from table `{tb_name}`\ninserts rows in a single statement"))
		.argument(InputValue::new("objects", TypeRef::named_nn_list_nn(&tt.insert_input))),
	));

	if let Some(pk_input) = &tt.pk_input {
		let tt1 = tt.clone();
		let mut field =
			Field::new(format!("update_{tb_name}_one"), TypeRef::named(&tt.object), move |ctx| {
				let tt = tt1.clone();
				FieldFuture::new(async move {
					let exe = executor(&ctx)?;
					let key = pk_columns_arg(&tt, &ctx)?;
					let set = row_from_input(&tt.table, &arg(&ctx, "_set"))?;
					let inc = row_from_input(&tt.table, &arg(&ctx, "_inc"))?;
					let row = exe.update_by_pk(&tt.table, key, set, inc).await?;
					Ok(row.map(FieldValue::owned_any))
				})
			})
			.description(format!(
				"Generated from table `{tb_name}`\nupdates a single row by primary key"
			))
			.argument(InputValue::new("pk_columns", TypeRef::named_nn(pk_input)))
			.argument(InputValue::new("_set", TypeRef::named(&tt.set_input)));
		if let Some(inc) = &tt.inc_input {
			field = field.argument(InputValue::new("_inc", TypeRef::named(inc)));
		}
		mutation = mutation.field(field);
	}

	let tt1 = tt.clone();
	mutation = mutation.field(
		Field::new(
			format!("update_{tb_name}_many"),
			TypeRef::named_nn_list_nn(&tt.mutation_response),
			move |ctx| {
				let tt = tt1.clone();
				FieldFuture::new(async move {
					let exe = executor(&ctx)?;
					let updates = arg(&ctx, "updates");
					let updates = updates
						.as_list()
						.ok_or_else(|| resolver_error("`updates` must be a list"))?
						.iter()
						.map(|v| update_item(&tt, v))
						.collect::<Result<Vec<Update>, GqlError>>()?;
					let out = exe.update_many(&tt.table, &updates).await?;
					Ok(Some(FieldValue::list(out.into_iter().map(FieldValue::owned_any))))
				})
			},
		)
		.description(format!(
			"Generated from table `{tb_name}`\napplies every update in one transaction, all or nothing"
		))
		.argument(InputValue::new("updates", TypeRef::named_nn_list_nn(&tt.updates_input))),
	);

	let tt1 = tt.clone();
	mutation = mutation.field(
		Field::new(format!("delete_{tb_name}"), TypeRef::named_nn(&tt.mutation_response), move |ctx| {
			let tt = tt1.clone();
			FieldFuture::new(async move {
				let exe = executor(&ctx)?;
				let filter = Filter::parse(&tt.table, &arg(&ctx, "where"))?;
				let res = exe.delete(&tt.table, &filter).await?;
				Ok(Some(FieldValue::owned_any(res)))
			})
		})
		.description(format!(
			"Generated from table `{tb_name}`\ndeletes the rows matching a filter, which must not be empty"
		))
		.argument(InputValue::new("where", TypeRef::named_nn(&tt.bool_exp))),
	);

	if let Some(pk) = tt.pk() {
		let tt1 = tt.clone();
		mutation = mutation.field(
			Field::new(format!("delete_{tb_name}_by_pk"), TypeRef::named(&tt.object), move |ctx| {
				let tt = tt1.clone();
				FieldFuture::new(async move {
					let exe = executor(&ctx)?;
					let key = pk_arg(&tt, &ctx)?;
					let row = exe.delete_by_pk(&tt.table, key).await?;
					Ok(row.map(FieldValue::owned_any))
				})
			})
			.description(format!("Generated from table `{tb_name}`\ndeletes a single row by primary key"))
			.argument(InputValue::new(pk.name.as_str(), pk.kind.type_ref(false))),
		);
	}

	mutation
}

fn conflict_arg(tt: &TableTypes, ctx: &ResolverContext<'_>) -> Result<Option<OnConflict>, GqlError> {
	Ok(OnConflict::parse(&tt.table, &arg(ctx, "on_conflict"))?)
}

fn pk_columns_arg(tt: &TableTypes, ctx: &ResolverContext<'_>) -> Result<Value, GqlError> {
	let pk = tt.pk().ok_or_else(|| resolver_error(format!("table `{}` has no primary key", tt.name())))?;
	let key = arg(ctx, "pk_columns")
		.as_object()
		.and_then(|o| o.get(pk.name.as_str()).cloned())
		.unwrap_or(GqlValue::Null);
	match key {
		GqlValue::Null => Err(resolver_error(format!("`pk_columns` must contain `{}`", pk.name))),
		v => Ok(Value::from_gql(&v)),
	}
}

fn update_item(tt: &TableTypes, v: &GqlValue) -> Result<Update, GqlError> {
	let item = v.as_object().ok_or_else(|| resolver_error("an update must be an object"))?;
	let field = |name: &str| item.get(name).cloned().unwrap_or(GqlValue::Null);
	Ok(Update {
		filter: Filter::parse(&tt.table, &field("where"))?,
		set: row_from_input(&tt.table, &field("_set"))?,
		inc: row_from_input(&tt.table, &field("_inc"))?,
	})
}
