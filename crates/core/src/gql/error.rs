use thiserror::Error;

use super::scalar::ScalarKind;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("{0}")]
	DbError(crate::err::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
	#[error("Error converting value: {val} to type: {target:?}: {reason}")]
	TypeError {
		target: ScalarKind,
		val: async_graphql::Value,
		reason: String,
	},
}

impl GqlError {
	/// Whether the error was caused by the request.
	pub fn is_client_error(&self) -> bool {
		match self {
			GqlError::DbError(e) => e.is_client_error(),
			GqlError::ResolverError(_) => true,
			_ => false,
		}
	}
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

pub fn type_error(kind: ScalarKind, val: &async_graphql::Value, reason: impl Into<String>) -> GqlError {
	GqlError::TypeError {
		target: kind,
		val: val.to_owned(),
		reason: reason.into(),
	}
}

impl From<crate::err::Error> for GqlError {
	fn from(value: crate::err::Error) -> Self {
		GqlError::DbError(value)
	}
}
