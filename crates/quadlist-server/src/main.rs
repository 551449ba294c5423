use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use quadlist_api::session::SessionStore;
use quadlist_api::{AppState, AppStateInner, auth, router};
use quadlist_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quadlist=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("QUADLIST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("QUADLIST_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let database_url =
        std::env::var("QUADLIST_DATABASE_URL").unwrap_or_else(|_| "quadlist.db".into());
    let email_domain = std::env::var("QUADLIST_EMAIL_DOMAIN").unwrap_or_else(|_| "asu.edu".into());
    let require_verification = env_flag("QUADLIST_REQUIRE_VERIFICATION", true);
    let seed_demo = env_flag("QUADLIST_SEED_DEMO", false);

    // Backend choice is a construction-time decision: a postgres:// URL
    // selects the networked store, anything else is a SQLite file path.
    let db = if database_url.starts_with("postgres://")
        || database_url.starts_with("postgresql://")
    {
        Database::connect_postgres(&database_url)?
    } else {
        Database::open_sqlite(&PathBuf::from(&database_url))?
    };

    if seed_demo {
        let hash = auth::hash_password("password123")?;
        db.seed_demo(&hash)?;
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions: SessionStore::new(),
        email_domain,
        require_verification,
    });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Quadlist server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
