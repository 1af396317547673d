pub mod auth;
pub mod chat;
pub mod donations;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod notifications;
pub mod views;

use std::path::Path;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tracing::error;

use foodbridge_db::Database;
use foodbridge_types::models::Role;

use crate::auth::AppState;
use crate::error::AppError;
use crate::middleware::{require_auth, require_role};

/// Build the full application router. `static_dir` is served under `/static`.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout));

    let donor_routes = Router::new()
        .route("/donor", get(donations::donor_dashboard).post(donations::create_donation))
        .route_layer(from_fn_with_state(Role::Donor, require_role));

    let ngo_routes = Router::new()
        .route("/ngo", get(donations::ngo_dashboard))
        .route("/claim/{donation_id}", post(donations::claim))
        .route_layer(from_fn_with_state(Role::Ngo, require_role));

    let protected_routes = Router::new()
        .route("/notifications", get(notifications::list))
        .route("/notification/read/{id}", get(notifications::open))
        .route("/chat/{donation_id}", get(chat::thread).post(chat::post_message))
        .merge(donor_routes)
        .merge(ngo_routes)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Run blocking store work off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.into())
        })?
        .map_err(AppError::Internal)
}
