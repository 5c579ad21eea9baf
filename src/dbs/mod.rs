use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use sqlgraph_core::dbs::{SqliteStore, Storage};
use sqlgraph_core::exe::Executor;
use sqlgraph_core::gql::{JsonColumns, SchemaOptions};

use crate::cli::validator;
use crate::err::Error;

const TARGET: &str = "sqlgraph::dbs";

#[derive(Args, Debug)]
pub struct DbsOptions {
	#[arg(help = "Path to the SQLite database file, or `memory` for an in-memory database")]
	#[arg(env = "SQLGRAPH_PATH", index = 1)]
	#[arg(default_value = "memory", value_parser = validator::path_valid)]
	path: String,
	#[arg(help = "A regular expression matching the names of text columns which hold JSON")]
	#[arg(env = "SQLGRAPH_JSON_COLUMNS", long = "json-columns")]
	#[arg(value_parser = validator::json_columns)]
	json_columns: Option<JsonColumns>,
	#[arg(help = "Columns always treated as JSON, given as `table.column`")]
	#[arg(env = "SQLGRAPH_JSON_FORCE", long = "json-force", value_delimiter = ',')]
	json_force: Vec<String>,
	#[arg(help = "Columns never treated as JSON, given as `table.column`")]
	#[arg(env = "SQLGRAPH_JSON_EXCLUDE", long = "json-exclude", value_delimiter = ',')]
	json_exclude: Vec<String>,
	#[arg(help = "Disable the `_sql` query field, which runs SQL statements verbatim")]
	#[arg(env = "SQLGRAPH_NO_RAW_SQL", long = "no-raw-sql")]
	#[arg(default_value_t = false)]
	no_raw_sql: bool,
	#[arg(help = "Disable the generated subscription fields")]
	#[arg(env = "SQLGRAPH_NO_SUBSCRIPTIONS", long = "no-subscriptions")]
	#[arg(default_value_t = false)]
	no_subscriptions: bool,
	#[arg(help = "How often subscriptions poll their table for new rows")]
	#[arg(env = "SQLGRAPH_POLL_INTERVAL", long = "poll-interval")]
	#[arg(value_parser = validator::duration)]
	poll_interval: Option<Duration>,
	#[arg(help = "Only deliver rows inserted after a subscription starts")]
	#[arg(env = "SQLGRAPH_FEED_FROM_TAIL", long = "feed-from-tail")]
	#[arg(default_value_t = false)]
	feed_from_tail: bool,
}

impl DbsOptions {
	/// The schema options selected on the command line.
	pub fn schema_options(&self) -> SchemaOptions {
		let json = self
			.json_columns
			.clone()
			.unwrap_or_default()
			.force(self.json_force.iter().cloned())
			.exclude(self.json_exclude.iter().cloned());
		let mut options = SchemaOptions::default()
			.with_json_columns(json)
			.with_raw_sql(!self.no_raw_sql)
			.with_subscriptions(!self.no_subscriptions)
			.with_feed_from_tail(self.feed_from_tail);
		if let Some(interval) = self.poll_interval {
			options = options.with_poll_interval(interval);
		}
		options
	}
}

/// Opens the database and returns an executor over it.
pub async fn init(opts: &DbsOptions) -> Result<(Executor, SchemaOptions), Error> {
	info!(target: TARGET, "Opening the database at {}", opts.path);
	let store: Arc<dyn Storage> = Arc::new(SqliteStore::open(&opts.path)?);
	let exe = Executor::new(store);
	let options = opts.schema_options();
	if !options.raw_sql {
		debug!(target: TARGET, "The `_sql` query field is disabled");
	}
	// Check the storage can be reached
	if let Some(version) = exe.store().version().await? {
		debug!(target: TARGET, "Database schema version is {version}");
	}
	Ok((exe, options))
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	#[derive(Parser, Debug)]
	struct Cmd {
		#[command(flatten)]
		dbs: DbsOptions,
	}

	#[test]
	fn flags_map_to_schema_options() {
		let cmd = Cmd::try_parse_from([
			"sqlgraph",
			"app.db",
			"--json-columns",
			"^doc$",
			"--json-force",
			"users.settings",
			"--no-raw-sql",
			"--poll-interval",
			"250ms",
		])
		.unwrap();
		assert_eq!(cmd.dbs.path, "app.db");
		let options = cmd.dbs.schema_options();
		assert!(!options.raw_sql);
		assert!(options.subscriptions);
		assert_eq!(options.poll_interval, Duration::from_millis(250));
		assert!(options.json_columns.matches("users", "doc"));
		assert!(options.json_columns.matches("users", "settings"));
		assert!(!options.json_columns.matches("users", "meta_json"));
	}

	#[test_log::test(tokio::test)]
	async fn opens_an_in_memory_database() {
		let cmd = Cmd::try_parse_from(["sqlgraph"]).unwrap();
		let (exe, _) = init(&cmd.dbs).await.unwrap();
		assert_eq!(exe.store().kind(), "sqlite");
	}
}
