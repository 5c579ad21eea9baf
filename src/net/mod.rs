mod gql;
mod health;
mod schema;
mod signals;

use std::net::SocketAddr;

use axum::Router;
use sqlgraph_core::gql::{SchemaCache, Versioned};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::err::Error;

const LOG: &str = "sqlgraph::net";

#[derive(Clone, Debug)]
pub struct AppState {
	pub cache: SchemaCache<Versioned>,
}

/// The routes served by the web server.
pub(crate) fn router(state: AppState) -> Router {
	let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any);
	Router::new()
		.merge(gql::router())
		.merge(schema::router())
		.merge(health::router())
		.layer(TraceLayer::new_for_http())
		.layer(cors)
		.with_state(state)
}

pub async fn init(bind: SocketAddr, cache: SchemaCache<Versioned>) -> Result<(), Error> {
	let app = router(AppState {
		cache,
	});

	let listener = TcpListener::bind(bind).await?;
	info!(target: LOG, "Started web server on {}", listener.local_addr()?);

	axum::serve(listener, app).with_graceful_shutdown(signals::shutdown()).await?;

	info!(target: LOG, "Web server stopped. Bye!");

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use axum::body::Body;
	use axum::http::{Request, StatusCode, header};
	use http_body_util::BodyExt;
	use sqlgraph_core::dbs::SqliteStore;
	use sqlgraph_core::exe::Executor;
	use sqlgraph_core::gql::SchemaOptions;
	use tower::ServiceExt;

	use super::*;
	use crate::cnf::{GRAPHQL_PATH, GRAPHQL_WS_PATH};

	async fn app() -> Router {
		let exe = Executor::new(Arc::new(SqliteStore::open("memory").unwrap()));
		exe.raw("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)").await.unwrap();
		exe.raw("INSERT INTO notes (id, body) VALUES (1, 'hello')").await.unwrap();
		router(AppState {
			cache: SchemaCache::new(exe, SchemaOptions::default()),
		})
	}

	async fn body(res: axum::response::Response) -> String {
		let bytes = res.into_body().collect().await.unwrap().to_bytes();
		String::from_utf8(bytes.to_vec()).unwrap()
	}

	#[test_log::test(tokio::test)]
	async fn graphql_queries_are_executed() {
		let req = Request::post(GRAPHQL_PATH)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(r#"{"query":"{ notes { id body } }"}"#))
			.unwrap();
		let res = app().await.oneshot(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::OK);
		let json: serde_json::Value = serde_json::from_str(&body(res).await).unwrap();
		assert_eq!(json["data"]["notes"], serde_json::json!([{ "id": 1, "body": "hello" }]));
	}

	#[test_log::test(tokio::test)]
	async fn graphiql_is_served() {
		let req = Request::get(GRAPHQL_PATH).body(Body::empty()).unwrap();
		let res = app().await.oneshot(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::OK);
		assert!(body(res).await.contains(GRAPHQL_WS_PATH));
	}

	#[test_log::test(tokio::test)]
	async fn schema_and_health_routes() {
		let app = app().await;
		let res = app.clone().oneshot(Request::get("/schema").body(Body::empty()).unwrap()).await.unwrap();
		assert_eq!(res.status(), StatusCode::OK);
		assert!(body(res).await.contains("notes_by_pk"));
		let res = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
		assert_eq!(res.status(), StatusCode::OK);
	}
}
