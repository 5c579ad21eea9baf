use thiserror::Error;

/// An error raised while building the catalog, synthesizing the schema, or
/// compiling and running a request.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The storage layer could not enumerate the tables and columns
	#[error("Unable to introspect the database schema: {0}")]
	SchemaIntrospection(String),

	/// A foreign key points at a table which does not exist
	#[error("The foreign key `{table}.{column}` references the unknown table `{target}`")]
	RelationResolution {
		table: String,
		column: String,
		target: String,
	},

	/// A column has a storage type with no GraphQL scalar
	#[error("The column `{table}.{column}` has the unsupported storage type `{kind}`")]
	TypeSynthesis {
		table: String,
		column: String,
		kind: String,
	},

	/// A request could not be turned into SQL
	#[error("Unable to compile the query: {0}")]
	QueryCompilation(String),

	/// The storage layer rejected a statement
	#[error("{0}")]
	Persistence(String),

	/// A path could not be extracted from embedded JSON text
	#[error("Unable to extract a path from JSON text: {0}")]
	PathExtraction(String),

	/// The engine encountered unreachable logic
	#[error("The engine encountered unreachable logic: {0}")]
	Internal(String),
}

impl Error {
	/// Whether the error was caused by the request rather than by the engine
	/// or the storage layer.
	pub fn is_client_error(&self) -> bool {
		matches!(self, Error::QueryCompilation(_) | Error::PathExtraction(_))
	}
}

impl From<rusqlite::Error> for Error {
	fn from(e: rusqlite::Error) -> Error {
		Error::Persistence(e.to_string())
	}
}

impl From<tokio::task::JoinError> for Error {
	fn from(e: tokio::task::JoinError) -> Error {
		Error::Internal(format!("storage task failed: {e}"))
	}
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Error {
		Error::PathExtraction(e.to_string())
	}
}

/// The result type used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shorthand for a [`Error::QueryCompilation`] error.
pub(crate) fn compilation(msg: impl Into<String>) -> Error {
	Error::QueryCompilation(msg.into())
}
