pub mod ai;
pub mod auth;
pub mod error;
pub mod sites;
mod validation;


pub use ai::{DescriptionRequest, DescriptionResponse};
pub use error::{ApiError, ErrorBody, ErrorCode};
pub use sites::{ImageUploadResponse, MessageResponse};

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// Largest accepted request body. JSON bodies may carry inline data-URI images.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public, plus the session check)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::require_auth,
                )),
        );

    let public_site_routes = Router::new()
        .route("/", get(sites::list_sites))
        .route("/:id", get(sites::get_site));

    // Admin-only site management
    let admin_site_routes = Router::new()
        .route("/", post(sites::create_site))
        .route("/upload-image", post(sites::upload_image))
        .route("/with-image", post(sites::create_site_with_image))
        .route("/:id", put(sites::update_site).delete(sites::delete_site))
        .route("/:id/with-image", put(sites::update_site_with_image))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let ai_routes = Router::new()
        .route("/generate-description", post(ai::generate_description))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/sites", public_site_routes.merge(admin_site_routes))
        .nest("/api/ai", ai_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(method_not_allowed))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.config.server.frontend_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to the configured frontend origin
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(%frontend_url, error = %e, "Invalid frontend URL, cross-origin requests disabled");
            layer
        }
    }
}

async fn root() -> &'static str {
    "Smart Link API running"
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_else(|| uri.path());
    ApiError::not_found(format!("Route {} {} not found", method, path))
}

/// Give the router's empty 405 responses the standard JSON error body
async fn method_not_allowed(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = ApiError::new(
        ErrorCode::MethodNotAllowed,
        format!("Method {} not allowed on {}", method, path),
    )
    .into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}
