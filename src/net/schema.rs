use axum::Router;
use axum::extract::State;
use axum::routing::get;

use super::AppState;
use crate::err::Error;

pub(super) fn router() -> Router<AppState> {
	Router::new().route("/schema", get(handler))
}

async fn handler(State(state): State<AppState>) -> Result<String, Error> {
	let schema = state.cache.get_schema().await?;
	Ok(schema.sdl())
}
