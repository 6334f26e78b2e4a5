mod api;
mod auth;
mod config;
mod db;
mod feed;
mod session;
mod state;

use axum::{
    routing::{delete, get, post},
    Router,
};
use state::AppState;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = config::Settings::new().expect("Failed to load settings");

    // Initialize database
    let db = db::Database::new(&settings.database.path).expect("Failed to create database");

    db.initialize()
        .expect("Failed to initialize database schema");

    // Always seed test data for development
    db.seed_test_data().expect("Failed to seed test data");
    tracing::info!("Test data seeded successfully");

    tracing::info!("Database initialized successfully");

    // Create application state
    let state = AppState::new(db);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication routes
        .route("/auth/login", post(api::auth::login))
        .route("/auth/logout", post(api::auth::logout))
        // Feed routes
        .route("/feed", get(api::feed::get_feed))
        // Review reaction routes
        .route("/feed/reviews/:id/like", post(api::reactions::like_review))
        .route(
            "/feed/reviews/:id/dislike",
            post(api::reactions::dislike_review),
        )
        .route(
            "/feed/reviews/:id/reaction",
            delete(api::reactions::remove_review_reaction),
        )
        // Review comment routes
        .route(
            "/feed/reviews/:id/comments",
            get(api::comments::get_review_comments).post(api::comments::post_review_comment),
        )
        .route(
            "/feed/reviews/:id/comments/:comment_id",
            delete(api::comments::delete_review_comment),
        )
        // Badge announcement reaction routes
        .route("/feed/badges/:id/like", post(api::reactions::like_badge))
        .route(
            "/feed/badges/:id/dislike",
            post(api::reactions::dislike_badge),
        )
        .route(
            "/feed/badges/:id/reaction",
            delete(api::reactions::remove_badge_reaction),
        )
        // Badge announcement comment routes
        .route(
            "/feed/badges/:id/comments",
            get(api::comments::get_badge_comments).post(api::comments::post_badge_comment),
        )
        .route(
            "/feed/badges/:id/comments/:comment_id",
            delete(api::comments::delete_badge_comment),
        )
        .with_state(state)
        .layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .expect("Failed to parse server address");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

async fn health_check() -> &'static str {
    "OK"
}
