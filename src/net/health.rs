use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;

use super::AppState;
use crate::err::Error;

pub(super) fn router() -> Router<AppState> {
	Router::new().route("/health", get(handler))
}

async fn handler(State(state): State<AppState>) -> impl IntoResponse {
	// Attempt a trivial statement
	match state.cache.exe.raw("SELECT 1").await {
		// The storage could not be reached
		Err(e) => {
			trace!(target: super::LOG, "Health check failed: {e}");
			Err(Error::InvalidStorage)
		}
		// The storage answered
		Ok(_) => Ok(()),
	}
}
