use anyhow::Context;
use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use foodbridge_types::api::{Claims, Session};
use foodbridge_types::models::Role;

use crate::auth::AppState;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "foodbridge_session";

pub fn create_token(secret: &str, session: &Session, ttl: chrono::Duration) -> anyhow::Result<String> {
    if ttl <= chrono::Duration::zero() {
        anyhow::bail!("session lifetime must be positive, got {}", ttl);
    }
    let expires = chrono::Utc::now()
        .checked_add_signed(ttl)
        .context("session lifetime overflows the clock")?;
    let claims = Claims {
        sub: session.user_id,
        username: session.username.clone(),
        role: session.role,
        exp: expires.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify a session token. Bad signatures and expired tokens yield `None`.
pub fn decode_token(secret: &str, token: &str) -> Option<Session> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims.into())
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
}

/// The caller's session, if the request carries a valid one.
pub fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let token = jar.get(SESSION_COOKIE)?;
    decode_token(&state.session_secret, token.value())
}

/// Resolve the session cookie into a [`Session`] request extension.
/// Requests without one are sent to the login page.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = current_session(&state, &jar).ok_or(AppError::Unauthenticated)?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Guard a route group for one role. Must sit inside [`require_auth`].
pub async fn require_role(
    State(required): State<Role>,
    Extension(session): Extension<Session>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if session.role != required {
        return Err(AppError::AccessDenied(format!(
            "Access Denied: You are logged in as {}.",
            session.role.label()
        )));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: 7,
            username: "shelter".into(),
            role: Role::Ngo,
        }
    }

    #[test]
    fn token_carries_the_session() {
        let token = create_token("secret", &session(), chrono::Duration::hours(1)).unwrap();
        assert_eq!(decode_token("secret", &token), Some(session()));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = create_token("secret", &session(), chrono::Duration::hours(1)).unwrap();
        assert_eq!(decode_token("other", &token), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: 7,
            username: "shelter".into(),
            role: Role::Ngo,
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(decode_token("secret", &token), None);
    }

    #[test]
    fn non_positive_lifetime_is_an_error() {
        assert!(create_token("secret", &session(), chrono::Duration::zero()).is_err());
        assert!(create_token("secret", &session(), chrono::Duration::hours(-1)).is_err());
    }

    #[test]
    fn overflowing_lifetime_is_an_error_not_a_panic() {
        let ttl = chrono::Duration::hours(1_000_000_000_000);
        assert!(create_token("secret", &session(), ttl).is_err());
    }
}
