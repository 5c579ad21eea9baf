use std::sync::Arc;

use async_graphql::dynamic::{
	Field, FieldFuture, FieldValue, InputValue, Object, Schema, Subscription, Type, TypeRef,
};
use async_graphql::{Request, Response, Value as GqlValue};
use indexmap::IndexMap;

use super::SchemaOptions;
use super::error::{GqlError, internal_error, resolver_error, schema_error};
use super::mutation::mutation_fields;
use super::scalar::{JSON, json_scalar, safe_int_scalar};
use super::subscription::subscription_field;
use super::tables::{query_fields, shared_types, table_types};
use super::types::{Synthesizer, TableTypes};
use super::utils::{GqlValueUtils, arg, executor};
use crate::catalog::Catalog;
use crate::exe::Executor;
use crate::val::Row;

/// A GraphQL schema together with the catalog it was derived from.
///
/// Instances are immutable once built. Every table's descriptor is shared
/// between all the types and resolvers which refer to it.
pub struct SynthesizedSchema {
	catalog: Arc<Catalog>,
	types: IndexMap<String, Arc<TableTypes>>,
	schema: Schema,
}

impl SynthesizedSchema {
	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	pub fn catalog(&self) -> &Arc<Catalog> {
		&self.catalog
	}

	/// The descriptor of an exposed table.
	pub fn table_types(&self, name: &str) -> Option<&Arc<TableTypes>> {
		self.types.get(name)
	}

	/// The schema in SDL form.
	pub fn sdl(&self) -> String {
		self.schema.sdl()
	}

	/// Executes a request with the executor attached.
	pub async fn execute(&self, request: impl Into<Request>, exe: &Executor) -> Response {
		self.schema.execute(request.into().data(exe.clone())).await
	}
}

/// Synthesizes the schema of a catalog.
pub fn generate_schema(
	catalog: Catalog,
	options: &SchemaOptions,
) -> Result<SynthesizedSchema, GqlError> {
	let catalog = Arc::new(catalog);
	let tables = Synthesizer::new(&catalog, options).finish()?;
	debug!(token = ?catalog.token(), tables = tables.len(), "generating schema");

	let mut query = Object::new("Query");
	let mut mutation = Object::new("Mutation");
	let mut subscription = Subscription::new("Subscription");
	let mut types: Vec<Type> = Vec::new();
	let mut has_subscriptions = false;

	shared_types(&mut types);

	for tt in tables.values() {
		table_types(tt, &tables, &options.evaluator, &mut types);
		query = query_fields(tt, query);
		mutation = mutation_fields(tt, mutation);
		if options.subscriptions && tt.pk().is_some() {
			subscription = subscription_field(tt, options, subscription);
			has_subscriptions = true;
		}
	}

	query = catalog_fields(query, &catalog, options.raw_sql);

	trace!("current Query object for schema: {:?}", query);

	let has_mutations = !tables.is_empty();
	let mut schema = Schema::build(
		"Query",
		has_mutations.then_some("Mutation"),
		has_subscriptions.then_some("Subscription"),
	)
	.register(query)
	.register(safe_int_scalar())
	.register(json_scalar());
	if has_mutations {
		schema = schema.register(mutation);
	}
	if has_subscriptions {
		schema = schema.register(subscription);
	}
	for ty in types {
		trace!("adding type: {ty:?}");
		schema = schema.register(ty);
	}

	let schema = schema
		.finish()
		.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))?;

	Ok(SynthesizedSchema {
		catalog,
		types: tables,
		schema,
	})
}

/// Adds the catalog lookup fields, and the raw SQL field if enabled.
///
/// The lookups describe the catalog the schema was built from.
fn catalog_fields(mut query: Object, catalog: &Arc<Catalog>, raw_sql: bool) -> Object {
	let tables = catalog.clone();
	let table = catalog.clone();
	query = query
		.field(
			Field::new("_tables", TypeRef::named_nn(JSON), move |_| {
				let catalog = tables.clone();
				FieldFuture::new(async move {
					Ok(Some(FieldValue::value(GqlValue::from_json(catalog.describe())?)))
				})
			})
			.description("Describes every table of the database"),
		)
		.field(
			Field::new("_table", TypeRef::named(JSON), move |ctx| {
				let catalog = table.clone();
				FieldFuture::new(async move {
					let name = arg(&ctx, "name")
						.as_string()
						.ok_or_else(|| resolver_error("`name` must be a string"))?;
					match catalog.table(&name) {
						Some(tb) => Ok(Some(FieldValue::value(GqlValue::from_json(tb.describe())?))),
						None => Ok(None),
					}
				})
			})
			.description("Describes a single table, or returns null if it does not exist")
			.argument(InputValue::new("name", TypeRef::named_nn(TypeRef::STRING))),
		);

	if raw_sql {
		query = query.field(
			Field::new("_sql", TypeRef::named_nn(JSON), |ctx| {
				FieldFuture::new(async move {
					let text = arg(&ctx, "query")
						.as_string()
						.ok_or_else(|| resolver_error("`query` must be a string"))?;
					let exe = executor(&ctx)?;
					let rows = exe.raw(&text).await?;
					Ok(Some(FieldValue::value(rows_to_json(rows)?)))
				})
			})
			.description("Runs an SQL statement verbatim and returns the resulting rows")
			.argument(InputValue::new("query", TypeRef::named_nn(TypeRef::STRING))),
		);
	}

	query
}

fn rows_to_json(rows: Vec<Row>) -> Result<GqlValue, GqlError> {
	let rows = serde_json::to_value(rows).map_err(|e| internal_error(e.to_string()))?;
	GqlValue::from_json(rows).map_err(|e| internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::ColumnInfo;

	fn col(t: &str, c: &str, ty: &str) -> ColumnInfo {
		ColumnInfo {
			table_name: t.into(),
			column_name: c.into(),
			column_type: ty.into(),
			..Default::default()
		}
	}

	#[test]
	fn empty_catalog_keeps_catalog_fields() {
		let schema = generate_schema(Catalog::build(None, vec![]), &SchemaOptions::default()).unwrap();
		let sdl = schema.sdl();
		assert!(sdl.contains("_tables: JSON!"));
		assert!(sdl.contains("_sql(query: String!): JSON!"));
		assert!(!sdl.contains("type Mutation"));
		assert!(!sdl.contains("type Subscription"));
	}

	#[test]
	fn raw_sql_can_be_disabled() {
		let opts = SchemaOptions::default().with_raw_sql(false);
		let schema = generate_schema(Catalog::build(None, vec![]), &opts).unwrap();
		assert!(!schema.sdl().contains("_sql"));
	}

	#[test]
	fn tables_without_a_key_have_no_key_fields() {
		let cat = Catalog::build(None, vec![col("logs", "line", "TEXT"), col("logs", "n", "INTEGER")]);
		let schema = generate_schema(cat, &SchemaOptions::default()).unwrap();
		let sdl = schema.sdl();
		assert!(sdl.contains("insert_logs_one"));
		assert!(sdl.contains("delete_logs(where: logs_bool_exp!): logs_mutation_response!"));
		assert!(!sdl.contains("logs_by_pk"));
		assert!(!sdl.contains("update_logs_one"));
		assert!(!sdl.contains("type Subscription"));
		assert!(schema.table_types("logs").is_some());
	}

	#[test]
	fn unmappable_columns_fail_the_build() {
		let cat = Catalog::build(None, vec![col("files", "data", "BLOB")]);
		assert!(generate_schema(cat, &SchemaOptions::default()).is_err());
	}
}
