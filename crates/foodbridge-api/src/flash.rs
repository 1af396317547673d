//! One-shot messages shown on the next rendered page.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Danger,
    Warning,
}

impl FlashKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing two plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        B64.encode(json)
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = B64.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

fn cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn set(jar: CookieJar, flash: &Flash) -> CookieJar {
    jar.add(cookie(flash.encode()))
}

/// Read the pending flash, if any, and clear it from the jar.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(raw) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/"));
    (jar, Flash::decode(&raw))
}

/// Redirect to `to` with `flash` queued for the next page.
pub fn redirect(flash: Flash, to: &str) -> Response {
    (set(CookieJar::new(), &flash), Redirect::to(to)).into_response()
}
