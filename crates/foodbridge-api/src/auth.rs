use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Form,
    extract::State,
    response::{Html, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use foodbridge_db::Database;
use foodbridge_types::api::{LoginForm, RegisterForm, Session};
use foodbridge_types::models::Role;

use crate::db_call;
use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::middleware::{clear_session, create_token, current_session, session_cookie};
use crate::views::{self, Nav};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_secret: String,
    pub session_ttl: chrono::Duration,
}

/// Nav data for a page that may or may not have a logged-in caller.
async fn optional_nav(state: &AppState, jar: &CookieJar) -> Result<Nav, AppError> {
    match current_session(state, jar) {
        Some(session) => Nav::for_session(state, session).await,
        None => Ok(Nav::anonymous()),
    }
}

pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let nav = optional_nav(&state, &jar).await?;
    let body = views::index(&nav);
    Ok(views::page(jar, "FoodBridge", &nav, &body))
}

pub async fn register_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let nav = optional_nav(&state, &jar).await?;
    Ok(views::page(jar, "Register", &nav, &views::register()))
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let user = form
        .validate()
        .map_err(|e| AppError::invalid_input(e.0, "/register"))?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(user.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let (username, role) = (user.username.clone(), user.role);
    let user_id = db_call(&state, move |db| {
        db.create_user(&user.username, &password_hash, user.role, &user.phone)
    })
    .await?
    .ok_or(AppError::DuplicateUsername)?;

    info!("Registered user {} ({}) as {}", username, user_id, role);
    Ok(flash::redirect(
        Flash::success("Registration successful! Please log in."),
        "/login",
    ))
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let nav = optional_nav(&state, &jar).await?;
    Ok(views::page(jar, "Login", &nav, &views::login()))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let username = form.username.trim().to_string();
    let lookup = username.clone();
    let user = db_call(&state, move |db| db.get_user_by_username(&lookup))
        .await?
        .ok_or_else(|| {
            warn!("Login failed: unknown user {}", username);
            AppError::InvalidCredentials
        })?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {}", user.id, e))?;

    Argon2::default()
        .verify_password(form.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Login failed: wrong password for {}", user.username);
            AppError::InvalidCredentials
        })?;

    let role: Role = user
        .role
        .parse()
        .map_err(|e| anyhow::anyhow!("user {}: {}", user.id, e))?;

    let session = Session {
        user_id: user.id,
        username: user.username,
        role,
    };
    let token = create_token(&state.session_secret, &session, state.session_ttl)?;

    info!("User {} logged in as {}", session.username, session.role);
    Ok((jar.add(session_cookie(token)), Redirect::to("/")))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (clear_session(jar), Redirect::to("/"))
}
