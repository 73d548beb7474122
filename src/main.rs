mod auth;
mod boards;
mod config;
mod controllers;
mod drafts;
mod models;
mod play;
mod prelude;
mod result;
mod sessions;

pub use crate::result::Result;

use std::{net::SocketAddr, sync::Arc};

use axum::{error_handling::HandleErrorLayer, http::StatusCode, middleware, Router};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tracing_subscriber::EnvFilter;

use crate::auth::AuthEvents;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<config::Config>,
    db: PgPool,
    auth_events: AuthEvents,
}

#[tokio::main]
async fn main() -> Result {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::build()?;

    let db = PgPool::connect(&cfg.database_url).await?;
    sqlx::migrate!().run(&db).await?;

    let session_store = sessions::store::build(db.clone()).await?;

    // The auth event subscription is registered exactly once, here, for
    // the lifetime of the process.
    let (auth_events, mut auth_event_rx) = broadcast::channel(64);
    tokio::spawn(async move {
        while let Ok(event) = auth_event_rx.recv().await {
            tracing::info!(?event, "auth state changed");
        }
    });

    let state = AppState {
        cfg: Arc::new(cfg),
        db,
        auth_events,
    };

    let session_service = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_| async {
            return StatusCode::BAD_REQUEST;
        }))
        .layer(
            SessionManagerLayer::new(session_store)
                .with_domain(state.cfg.server_domain.to_string())
                .with_expiry(Expiry::OnSessionEnd)
                .with_secure(false)
                .with_same_site(SameSite::Lax),
        );

    let router = Router::new();

    // dynamic paths; the draft observer only watches these, an asset
    // fetch is not navigation
    let router =
        controllers::add_routes(router).layer(middleware::from_fn(drafts::route_watcher));

    // static assets
    let router = router
        .route_service("/favicon.ico", ServeFile::new("assets/favicon.ico"))
        .nest_service("/assets", ServeDir::new("assets"));

    let router = router
        .with_state(state.clone())
        .layer(session_service)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.cfg.server_port));
    tracing::info!(%addr, "listening");

    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;

    return Ok(());
}
