use axum::{
    Extension,
    extract::{Path, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use foodbridge_types::api::Session;
use foodbridge_types::models::NotificationKind;

use crate::auth::AppState;
use crate::db_call;
use crate::error::AppError;
use crate::views::{self, Nav};

/// Where opening a notification of `kind` about donation `related_id` leads.
pub fn redirect_target(kind: Option<NotificationKind>, related_id: i64) -> String {
    match kind {
        Some(NotificationKind::Chat | NotificationKind::Claim) => format!("/chat/{}", related_id),
        Some(NotificationKind::NewDonation) => "/ngo".to_string(),
        None => "/notifications".to_string(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let user_id = session.user_id;
    let notifications = db_call(&state, move |db| db.list_notifications(user_id)).await?;

    let nav = Nav::for_session(&state, session).await?;
    Ok(views::page(jar, "Notifications", &nav, &views::notifications(&notifications)))
}

/// GET /notification/read/{id} — mark read, then jump to whatever it is about.
/// Unknown or foreign ids fall back to the notification list.
pub async fn open(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let user_id = session.user_id;
    let Some(notification) = db_call(&state, move |db| db.open_notification(id, user_id)).await? else {
        return Ok(Redirect::to("/notifications"));
    };

    let kind = match notification.kind.parse::<NotificationKind>() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!("Notification {}: {}", notification.id, e);
            None
        }
    };

    Ok(Redirect::to(&redirect_target(kind, notification.related_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_and_claim_open_the_thread() {
        assert_eq!(redirect_target(Some(NotificationKind::Chat), 4), "/chat/4");
        assert_eq!(redirect_target(Some(NotificationKind::Claim), 9), "/chat/9");
    }

    #[test]
    fn new_donation_opens_the_ngo_list() {
        assert_eq!(redirect_target(Some(NotificationKind::NewDonation), 4), "/ngo");
    }

    #[test]
    fn unknown_kind_falls_back_to_the_list() {
        assert_eq!(redirect_target(None, 4), "/notifications");
    }
}
