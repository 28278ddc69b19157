use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::StoryStore;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::storage::{Disk, PUBLIC_PREFIX};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoryStore>,
    pub disk: Arc<dyn Disk>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn StoryStore>, disk: Arc<dyn Disk>, config: Arc<AppConfig>) -> Self {
        Self { store, disk, config }
    }

    /// Base URL for public links (image URLs, page URLs)
    pub fn public_base(&self) -> &str {
        self.config.storage.public_base_url.trim_end_matches('/')
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .nest("/api", api_routes(state.clone()))
        // Public disk
        .nest_service(
            &format!("/{}", PUBLIC_PREFIX),
            ServeDir::new(&config.storage.public_root),
        )
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    use protected::stories;

    Router::new()
        .route("/stories", get(stories::index).post(stories::store))
        .route("/my-stories", get(stories::my_stories))
        // Updates use POST so multipart uploads work from plain HTML forms
        .route(
            "/stories/:id",
            get(stories::show).post(stories::update).delete(stories::destroy),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
