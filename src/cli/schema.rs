use clap::Args;
use sqlgraph_core::gql::{SchemaCache, Versioned};

use crate::dbs::{self, DbsOptions};
use crate::err::Error;

#[derive(Args, Debug)]
pub struct SchemaCommandArguments {
	#[command(flatten)]
	dbs: DbsOptions,
	#[arg(help = "The logging level for the command-line tool")]
	#[arg(env = "SQLGRAPH_LOG", short = 'l', long = "log")]
	#[arg(default_value = "warn")]
	log: String,
}

pub async fn init(
	SchemaCommandArguments {
		dbs,
		log,
	}: SchemaCommandArguments,
) -> Result<(), Error> {
	crate::telemetry::builder().with_log_level(&log).init()?;
	let (exe, options) = dbs::init(&dbs).await?;
	let cache = SchemaCache::<Versioned>::new(exe, options);
	let schema = cache.get_schema().await?;
	print!("{}", schema.sdl());
	Ok(())
}
