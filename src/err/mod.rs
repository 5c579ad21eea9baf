use std::io::Error as IoError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlgraph_core::err::Error as CoreError;
use sqlgraph_core::gql::GqlError;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	#[error("The storage layer could not be reached")]
	InvalidStorage,

	#[error("Unable to initialise logging: {0}")]
	Telemetry(String),

	#[error("There was a problem with the database: {0}")]
	Db(#[from] CoreError),

	#[error("There was a problem with the GraphQL schema: {0}")]
	Gql(#[from] GqlError),

	#[error("There was a problem with the file system or network: {0}")]
	Io(#[from] IoError),
}

impl Error {
	fn status(&self) -> StatusCode {
		match self {
			Error::Db(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
			Error::Gql(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
			Error::InvalidStorage => StatusCode::SERVICE_UNAVAILABLE,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			warn!("Request failed: {self}");
		}
		(status, self.to_string()).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_follow_the_error_origin() {
		let compile = Error::Db(CoreError::QueryCompilation("cannot delete without a filter".into()));
		assert_eq!(compile.into_response().status(), StatusCode::BAD_REQUEST);
		let schema = Error::Gql(GqlError::SchemaError("unsupported column type".into()));
		assert_eq!(schema.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
		let persist = Error::Db(CoreError::Persistence("disk I/O error".into()));
		assert_eq!(persist.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(Error::InvalidStorage.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
	}
}
