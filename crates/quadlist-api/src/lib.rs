pub mod auth;
pub mod error;
pub mod extract;
pub mod listings;
pub mod profile;
pub mod session;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post, put},
};
use tracing::error;

use quadlist_db::Database;

use crate::error::ApiError;
use crate::session::SessionStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
    /// Registration is restricted to addresses under this domain.
    pub email_domain: String,
    /// When false (simplified deployment), registration logs the caller in
    /// immediately and login skips the verified-email gate.
    pub require_verification: bool,
}

/// Assemble the API router. Session-gated routes enforce auth through the
/// `CurrentUser` extractor; everything else is public.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/verify-email", post(auth::verify_email))
        .route("/api/auth/check", get(auth::check))
        .route("/api/listings", get(listings::list_public).post(listings::create))
        .route("/api/listings/my", get(listings::list_mine))
        .route(
            "/api/listings/{id}",
            put(listings::update).delete(listings::remove),
        )
        .route("/api/listings/{id}/status", put(listings::set_status))
        .route("/api/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run blocking work (database access, password hashing) off the async
/// runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            Err(ApiError::Internal(anyhow::anyhow!("blocking task failed")))
        }
    }
}
