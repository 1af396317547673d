use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use foodbridge_db::models::PostOutcome;
use foodbridge_types::api::{ChatForm, Session};

use crate::auth::AppState;
use crate::db_call;
use crate::error::AppError;
use crate::views::{self, Nav};

fn donation_missing() -> AppError {
    AppError::NotFound {
        what: "Donation",
        back_to: "/",
    }
}

fn not_a_participant() -> AppError {
    AppError::AccessDenied("Access Denied: You are not part of this conversation.".to_string())
}

/// GET /chat/{donation_id}
pub async fn thread(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(donation_id): Path<i64>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let user_id = session.user_id;
    let loaded = db_call(&state, move |db| {
        let Some(thread) = db.get_thread(donation_id)? else {
            return Ok(None);
        };
        let counterpart_id = if thread.donation.donor_id == user_id {
            thread.donation.claimed_by
        } else {
            Some(thread.donation.donor_id)
        };
        let counterpart = match counterpart_id {
            Some(id) => db.get_user_by_id(id)?,
            None => None,
        };
        Ok(Some((thread, counterpart)))
    })
    .await?;

    let (thread, counterpart) = loaded.ok_or_else(donation_missing)?;
    if !thread.donation.is_party(user_id) {
        warn!("User {} tried to read chat for donation {}", session.username, donation_id);
        return Err(not_a_participant());
    }

    let body = views::chat(&thread, &session, counterpart.as_ref());
    let nav = Nav::for_session(&state, session).await?;
    Ok(views::page(jar, "Chat", &nav, &body))
}

/// POST /chat/{donation_id} — append a message, notify the other side and
/// redirect back to the thread.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(donation_id): Path<i64>,
    Form(form): Form<ChatForm>,
) -> Result<Redirect, AppError> {
    let back_to = format!("/chat/{}", donation_id);
    let text = form.message.trim().to_string();
    if text.is_empty() {
        return Err(AppError::refused("Message cannot be empty.", back_to));
    }

    let sender_id = session.user_id;
    let username = session.username.clone();
    let outcome = db_call(&state, move |db| {
        db.post_message(donation_id, sender_id, &username, &text)
    })
    .await?;

    match outcome {
        PostOutcome::Posted { message_id, recipient_id } => {
            debug!(
                "Message {} on donation {} from {} to user {}",
                message_id, donation_id, session.username, recipient_id
            );
            Ok(Redirect::to(&back_to))
        }
        PostOutcome::DonationMissing => Err(donation_missing()),
        PostOutcome::NotParticipant => {
            warn!("User {} tried to post on donation {}", session.username, donation_id);
            Err(not_a_participant())
        }
        PostOutcome::Unclaimed => Err(AppError::refused(
            "Chat opens once an NGO claims this donation.",
            back_to,
        )),
    }
}
