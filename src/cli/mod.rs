mod schema;
mod start;
pub(crate) mod validator;
mod version;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::cnf::{LOGO, PKG_VERSION};
use crate::env::RELEASE;

const INFO: &str = "
To get started with sqlgraph, point it at a SQLite database file:

  sqlgraph start data/app.db

The GraphQL endpoint is then served at http://127.0.0.1:8080/graphql
";

#[derive(Parser, Debug)]
#[command(name = "sqlgraph command-line interface and server", bin_name = "sqlgraph")]
#[command(version = PKG_VERSION.as_str(), long_version = RELEASE.as_str())]
#[command(about = INFO, before_help = LOGO)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	#[command(about = "Start the GraphQL server")]
	Start(start::StartCommandArguments),
	#[command(about = "Print the synthesized GraphQL schema in SDL form")]
	Schema(schema::SchemaCommandArguments),
	#[command(about = "Output the command-line tool version information")]
	Version(version::VersionCommandArguments),
}

pub async fn init() -> ExitCode {
	let args = Cli::parse();
	let output = match args.command {
		Commands::Start(args) => start::init(args).await,
		Commands::Schema(args) => schema::init(args).await,
		Commands::Version(args) => version::init(args),
	};
	if let Err(e) = output {
		error!("{e}");
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}
