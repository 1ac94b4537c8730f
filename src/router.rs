//! Router for the presign server.

use std::sync::Arc;

use axum::debug_handler;
use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info_span, Instrument};

use crate::{
    error::{Result, ServerError},
    extract::PresignRequest,
    response::UploadIntent,
    state::PresignServerState,
};

/// Path of the presign endpoint.
pub const PRESIGN_PATH: &str = "/uploads/presign";

/// Builds the router for the presign server.
///
/// `OPTIONS` requests are answered with an empty `200`, `POST` issues an
/// upload intent and every other method is rejected with `405`. A permissive
/// CORS layer is added when the configuration enables it.
pub fn build_presign_router(state: Arc<PresignServerState>) -> Router {
    let cors = state.config().cors();
    let router = Router::new()
        .route(
            PRESIGN_PATH,
            post(presign)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(state);

    if cors {
        router.layer(cors_layer())
    } else {
        router
    }
}

/// CORS policy of the presign endpoint.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")])
}

#[debug_handler]
async fn presign(
    state: State<Arc<PresignServerState>>,
    request: PresignRequest,
) -> Result<UploadIntent> {
    let span = info_span!(
        "presign",
        filename = ?request.filename,
        content_type = ?request.content_type,
        folder = ?request.folder
    );
    state.issue_upload_intent(request).instrument(span).await
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed(method: Method) -> impl IntoResponse {
    tracing::debug!(%method, "method not allowed on presign endpoint");
    (
        [(header::ALLOW, "POST, OPTIONS")],
        ServerError::method_not_allowed(),
    )
}
