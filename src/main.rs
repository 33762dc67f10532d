use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod statement_cache;

mod crypto {
    pub mod profile;
    pub mod skey;
}

mod models {
    pub mod outcome;
    pub mod session;
}

mod provider {
    pub mod direct;
    pub mod exchange;
    pub mod proxy;
}

mod repositories {
    pub mod session;
}

mod services {
    pub mod auth;
}

mod handlers {
    pub mod auth;
}

mod middleware_layer {
    pub mod auth;
}

use config::Config;
use state::AppState;

/// Builds the application router: an open login route running the issuance
/// protocol, and validated routes behind the session middleware.
pub fn app(state: AppState) -> Router {
    let login_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .with_state(state.clone());

    let validated_routes = Router::new()
        .route("/api/user/info", get(handlers::auth::user_info))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_session,
        ))
        .with_state(state);

    Router::new().merge(login_routes).merge(validated_routes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(50)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let app = app(state)
        .layer(tower_governor::GovernorLayer::new(governor_conf))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
