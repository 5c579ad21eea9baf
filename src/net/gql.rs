use async_graphql::Data;
use async_graphql::http::{ALL_WEBSOCKET_PROTOCOLS, GraphiQLSource};
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{self, IntoResponse, Response};
use axum::routing::get;

use super::AppState;
use crate::cnf::{GRAPHQL_PATH, GRAPHQL_WS_PATH};
use crate::err::Error;

pub(super) fn router() -> Router<AppState> {
	Router::new()
		.route(GRAPHQL_PATH, get(graphiql).post(handler))
		.route(GRAPHQL_WS_PATH, get(subscriptions))
}

async fn graphiql() -> impl IntoResponse {
	response::Html(
		GraphiQLSource::build().endpoint(GRAPHQL_PATH).subscription_endpoint(GRAPHQL_WS_PATH).finish(),
	)
}

async fn handler(
	State(state): State<AppState>,
	request: GraphQLRequest,
) -> Result<GraphQLResponse, Error> {
	let schema = state.cache.get_schema().await?;
	Ok(schema.execute(request.into_inner(), &state.cache.exe).await.into())
}

async fn subscriptions(
	State(state): State<AppState>,
	protocol: GraphQLProtocol,
	upgrade: WebSocketUpgrade,
) -> Result<Response, Error> {
	let schema = state.cache.get_schema().await?;
	let exe = state.cache.exe.clone();
	let executor = schema.schema().clone();
	Ok(upgrade
		.protocols(ALL_WEBSOCKET_PROTOCOLS)
		.on_upgrade(move |socket| {
			let mut data = Data::default();
			data.insert(exe);
			GraphQLWebSocket::new(socket, executor, protocol).with_data(data).serve()
		})
		.into_response())
}
