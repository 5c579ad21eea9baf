#![deny(clippy::mem_forget)]

#[macro_use]
extern crate tracing;

mod cli;
mod cnf;
mod dbs;
mod env;
mod err;
mod net;
mod telemetry;

use std::process::ExitCode;

fn main() -> ExitCode {
	// Start a tokio runtime for the server
	let runtime = match tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.thread_name("sqlgraph-worker")
		.build()
	{
		Ok(runtime) => runtime,
		Err(e) => {
			eprintln!("Unable to start the runtime: {e}");
			return ExitCode::FAILURE;
		}
	};
	// Parse the command line and run the command
	runtime.block_on(cli::init())
}
