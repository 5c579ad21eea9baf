use std::net::SocketAddr;

use clap::Args;
use sqlgraph_core::gql::{SchemaCache, Versioned};

use crate::cnf::{DEFAULT_BIND, LOGO};
use crate::dbs::{self, DbsOptions};
use crate::err::Error;
use crate::{env, net, telemetry};

#[derive(Args, Debug)]
pub struct StartCommandArguments {
	#[command(flatten)]
	dbs: DbsOptions,
	#[arg(help = "The hostname or IP address to listen for connections on")]
	#[arg(env = "SQLGRAPH_BIND", short = 'b', long = "bind")]
	#[arg(default_value = DEFAULT_BIND)]
	pub(super) bind: SocketAddr,
	#[arg(help = "The logging level, or a list of tracing filter directives")]
	#[arg(env = "SQLGRAPH_LOG", short = 'l', long = "log")]
	#[arg(default_value = "info")]
	log: String,
	#[arg(help = "Output logs as JSON lines")]
	#[arg(env = "SQLGRAPH_LOG_JSON", long = "log-json")]
	#[arg(default_value_t = false)]
	log_json: bool,
	#[arg(help = "Whether to hide the startup banner")]
	#[arg(env = "SQLGRAPH_NO_BANNER", long = "no-banner")]
	#[arg(default_value_t = false)]
	no_banner: bool,
}

pub async fn init(
	StartCommandArguments {
		dbs,
		bind,
		log,
		log_json,
		no_banner,
	}: StartCommandArguments,
) -> Result<(), Error> {
	// Initialize logging
	telemetry::builder().with_log_level(&log).with_json(log_json).init()?;
	// Check if a banner should be outputted
	if !no_banner {
		println!("{LOGO}");
	}
	// Initiate environment
	env::init();
	// Open the database
	let (exe, options) = dbs::init(&dbs).await?;
	let cache = SchemaCache::<Versioned>::new(exe, options);
	// Build the schema before accepting requests
	let schema = cache.get_schema().await?;
	info!("Found {} tables in the database", schema.catalog().tables().count());
	// Start the web server
	net::init(bind, cache).await
}
