mod config;
mod db;
mod display;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod static_files;
mod storage;


use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webauthn_rs::Webauthn;

use crate::config::Config;
use crate::db::Database;
use crate::services::PasskeyService;
use crate::storage::StorageManager;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<StorageManager>,
    pub webauthn: Arc<Webauthn>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "progress_gallery=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting progress gallery...");

    let config = Arc::new(Config::load()?);

    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let storage = Arc::new(StorageManager::from_config(&config.storage)?);
    let webauthn = Arc::new(PasskeyService::webauthn_from_config(&config)?);

    spawn_cleanup(db.clone());

    let state = AppState {
        db,
        config: config.clone(),
        storage,
        webauthn,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Purge expired sessions and challenges now and then hourly
fn spawn_cleanup(db: Database) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match db.cleanup_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Removed {} expired sessions and challenges", n),
                Err(e) => tracing::error!("Cleanup of expired rows failed: {}", e),
            }
        }
    });
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    // Room for the text fields sent alongside the image
    let upload_limit = state.config.storage.max_upload_bytes + 1024 * 1024;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/register/options", post(handlers::passkey::register_options))
        .route("/auth/register/verify", post(handlers::passkey::register_verify))
        .route("/auth/login/options", post(handlers::passkey::login_options))
        .route("/auth/login/verify", post(handlers::passkey::login_verify))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/me",
            get(handlers::auth::me).patch(handlers::auth::update_me),
        );

    // Protected routes (session required)
    let protected_routes = Router::new()
        .route(
            "/photos",
            get(handlers::photo::list_photos)
                .post(handlers::photo::upload_photo)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/photos/:id",
            patch(handlers::photo::update_photo).delete(handlers::photo::delete_photo),
        )
        .route("/uploads/:filename", get(handlers::upload::serve_upload))
        .route(
            "/galleries",
            get(handlers::gallery::list_galleries).post(handlers::gallery::create_gallery),
        )
        .route(
            "/galleries/:id",
            patch(handlers::gallery::update_gallery).delete(handlers::gallery::delete_gallery),
        )
        .route(
            "/galleries/:id/config",
            get(handlers::gallery::get_gallery_config)
                .delete(handlers::gallery::clear_gallery_config),
        )
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let mut app = Router::new().nest("/api", public_routes.merge(protected_routes));

    if let Some(dir) = &state.config.server.static_dir {
        tracing::info!("Serving frontend from {}", dir);
        app = app.fallback_service(static_files::spa_service(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
