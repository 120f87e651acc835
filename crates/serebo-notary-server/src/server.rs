use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;

use crate::handlers::NotaryService;

/// XML-RPC endpoint: every procedure arrives as a POST to the root path.
pub fn router(service: Arc<NotaryService>) -> Router {
    Router::new().route("/", post(rpc)).with_state(service)
}

async fn rpc(State(service): State<Arc<NotaryService>>, body: String) -> impl IntoResponse {
    let response = service.handle(&body);
    ([(header::CONTENT_TYPE, "text/xml")], response)
}
