//! Request routing for the DID resolution API.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, Response},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers;
use crate::resolver::Resolver;

/// Application state shared between handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

/// Creates the main router for the resolver.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/1.0/identifiers/:identifier", get(identifier_handler))
        .with_state(state)
}

/// Handler for identifier resolution.
async fn identifier_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
) -> Response<Body> {
    let request_id = Uuid::new_v4().to_string();
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());

    let result =
        handlers::resolve_identifier(&state.resolver, &identifier, accept, &request_id).await;
    match result {
        Ok(response) => response,
        Err(e) => e.with_request_id(&request_id).into_response(),
    }
}
