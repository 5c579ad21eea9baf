//! GraphQL schema synthesis.
//!
//! The schema is derived entirely from a [`crate::catalog::Catalog`]: every
//! table contributes an object type, its input, filter and ordering types,
//! and a set of root query, mutation and subscription fields. Resolvers
//! compile their arguments with [`crate::sql`] and run them through the
//! [`crate::exe::Executor`] attached to each request.

pub mod cache;
pub mod error;
mod mutation;
pub mod scalar;
mod schema;
mod subscription;
mod tables;
pub mod types;
mod utils;

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub use self::cache::{Invalidator, Pessimistic, SchemaCache, Versioned};
pub use self::error::GqlError;
pub use self::scalar::JsonColumns;
pub use self::schema::{SynthesizedSchema, generate_schema};
use crate::cnf::FEED_POLL_INTERVAL_MS;
use crate::path::{JmesPath, PathEvaluator};

/// Options controlling how a schema is synthesized.
#[derive(Clone)]
pub struct SchemaOptions {
	/// Which text columns hold embedded JSON
	pub json_columns: JsonColumns,
	/// Whether the `_sql` escape hatch is exposed
	pub raw_sql: bool,
	/// Whether a subscription root is generated
	pub subscriptions: bool,
	/// How often subscription feeds poll their table
	pub poll_interval: Duration,
	/// Whether subscription feeds skip the rows present when they start
	pub feed_from_tail: bool,
	/// Evaluates `path` arguments
	pub evaluator: Arc<dyn PathEvaluator>,
}

impl Default for SchemaOptions {
	fn default() -> Self {
		SchemaOptions {
			json_columns: JsonColumns::default(),
			raw_sql: true,
			subscriptions: true,
			poll_interval: Duration::from_millis(*FEED_POLL_INTERVAL_MS),
			feed_from_tail: false,
			evaluator: Arc::new(JmesPath),
		}
	}
}

impl Debug for SchemaOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("SchemaOptions")
			.field("json_columns", &self.json_columns)
			.field("raw_sql", &self.raw_sql)
			.field("subscriptions", &self.subscriptions)
			.field("poll_interval", &self.poll_interval)
			.field("feed_from_tail", &self.feed_from_tail)
			.finish_non_exhaustive()
	}
}

impl SchemaOptions {
	pub fn with_json_columns(mut self, json_columns: JsonColumns) -> Self {
		self.json_columns = json_columns;
		self
	}

	pub fn with_raw_sql(mut self, enabled: bool) -> Self {
		self.raw_sql = enabled;
		self
	}

	pub fn with_subscriptions(mut self, enabled: bool) -> Self {
		self.subscriptions = enabled;
		self
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	pub fn with_feed_from_tail(mut self, enabled: bool) -> Self {
		self.feed_from_tail = enabled;
		self
	}

	pub fn with_evaluator(mut self, evaluator: Arc<dyn PathEvaluator>) -> Self {
		self.evaluator = evaluator;
		self
	}
}
