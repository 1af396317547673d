use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::flash::{self, Flash, FlashKind};

/// Request failures. Every variant except `Internal` ends as a flash message
/// and a redirect; none of them stop the server.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Please log in to continue.")]
    Unauthenticated,

    #[error("Username already taken.")]
    DuplicateUsername,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("{0}")]
    AccessDenied(String),

    #[error("{what} not found.")]
    NotFound {
        what: &'static str,
        back_to: &'static str,
    },

    #[error("{message}")]
    InvalidInput { message: String, back_to: String },

    /// A well-formed request the current state does not allow.
    #[error("{message}")]
    Refused { message: String, back_to: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>, back_to: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            back_to: back_to.into(),
        }
    }

    pub fn refused(message: impl Into<String>, back_to: impl Into<String>) -> Self {
        Self::Refused {
            message: message.into(),
            back_to: back_to.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (kind, target) = match &self {
            Self::Unauthenticated => return Redirect::to("/login").into_response(),
            Self::DuplicateUsername => (FlashKind::Danger, "/register".to_string()),
            Self::InvalidCredentials => (FlashKind::Danger, "/login".to_string()),
            Self::AccessDenied(_) => (FlashKind::Warning, "/".to_string()),
            Self::NotFound { back_to, .. } => (FlashKind::Warning, back_to.to_string()),
            Self::InvalidInput { back_to, .. } => (FlashKind::Danger, back_to.clone()),
            Self::Refused { back_to, .. } => (FlashKind::Warning, back_to.clone()),
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.").into_response();
            }
        };

        flash::redirect(
            Flash {
                kind,
                message: self.to_string(),
            },
            &target,
        )
    }
}
