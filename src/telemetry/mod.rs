use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

use crate::err::Error;

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Default, Debug)]
pub struct Builder {
	log_level: Option<String>,
	filter: Option<EnvFilter>,
	json: bool,
}

pub fn builder() -> Builder {
	Builder::default()
}

/// Turns a log level into filter directives for this project's crates.
///
/// Anything which is not a plain level is treated as a list of directives.
pub fn filter(level: &str) -> Result<EnvFilter, Error> {
	let directives = match level.trim() {
		l if LEVELS.contains(&l) => format!("error,sqlgraph={l},sqlgraph_core={l}"),
		"full" => "trace".to_owned(),
		l => l.to_owned(),
	};
	EnvFilter::builder()
		.parse(&directives)
		.map_err(|e| Error::Telemetry(format!("invalid log filter `{level}`: {e}")))
}

impl Builder {
	/// Set the log level on the builder
	pub fn with_log_level(mut self, log_level: &str) -> Self {
		self.log_level = Some(log_level.to_owned());
		self
	}

	/// Set the filter on the builder
	pub fn with_filter(mut self, filter: EnvFilter) -> Self {
		self.filter = Some(filter);
		self
	}

	/// Emit logs as JSON lines
	pub fn with_json(mut self, json: bool) -> Self {
		self.json = json;
		self
	}

	/// Build a tracing dispatcher with the fmt subscriber
	pub fn build(self) -> Result<Box<dyn Subscriber + Send + Sync + 'static>, Error> {
		let filter = match (self.filter, self.log_level) {
			(Some(filter), _) => filter,
			(None, Some(level)) => filter(&level)?,
			(None, None) => filter("info")?,
		};
		let layer = if self.json {
			tracing_subscriber::fmt::layer()
				.json()
				.with_target(true)
				.with_span_events(FmtSpan::NONE)
				.with_writer(std::io::stderr)
				.boxed()
		} else {
			tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_target(true)
				.with_file(cfg!(debug_assertions))
				.with_line_number(cfg!(debug_assertions))
				.with_span_events(FmtSpan::NONE)
				.with_writer(std::io::stderr)
				.boxed()
		};
		Ok(Box::new(tracing_subscriber::registry().with(layer.with_filter(filter))))
	}

	/// tracing pipeline
	pub fn init(self) -> Result<(), Error> {
		self.build()?.try_init().map_err(|e| Error::Telemetry(e.to_string()))
	}
}
