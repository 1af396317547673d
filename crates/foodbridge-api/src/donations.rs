use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use foodbridge_types::api::{DonationForm, Session};

use crate::auth::AppState;
use crate::db_call;
use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::views::{self, Nav};

/// GET /donor — the caller's own listings plus the listing form.
pub async fn donor_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let donor_id = session.user_id;
    let donations = db_call(&state, move |db| db.list_own_donations(donor_id)).await?;

    let nav = Nav::for_session(&state, session).await?;
    Ok(views::page(jar, "Donor dashboard", &nav, &views::donor_dashboard(&donations)))
}

/// POST /donor — list a donation and notify every NGO.
pub async fn create_donation(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<DonationForm>,
) -> Result<Response, AppError> {
    let donation = form
        .validate()
        .map_err(|e| AppError::invalid_input(e.0, "/donor"))?;

    let donor_id = session.user_id;
    let food_item = donation.food_item.clone();
    let created = db_call(&state, move |db| db.create_donation(donor_id, &donation)).await?;

    info!(
        "Donor {} listed donation {} ({}); notified {} NGOs",
        session.username, created.id, food_item, created.notified
    );
    Ok(flash::redirect(
        Flash::success("Donation listed! NGOs have been notified."),
        "/donor",
    ))
}

/// GET /ngo — every active donation plus the caller's claims.
pub async fn ngo_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let ngo_id = session.user_id;
    let (active, claims) = db_call(&state, move |db| {
        Ok((db.list_active_donations()?, db.list_my_claims(ngo_id)?))
    })
    .await?;

    let nav = Nav::for_session(&state, session).await?;
    Ok(views::page(jar, "NGO dashboard", &nav, &views::ngo_dashboard(&active, &claims)))
}

/// POST /claim/{donation_id}
///
/// Claims are last-write-wins: claiming an already claimed donation moves
/// it to the caller.
pub async fn claim(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(donation_id): Path<i64>,
) -> Result<Response, AppError> {
    let ngo_id = session.user_id;
    let username = session.username.clone();
    let outcome = db_call(&state, move |db| db.claim_donation(donation_id, ngo_id, &username))
        .await?
        .ok_or(AppError::NotFound {
            what: "Donation",
            back_to: "/ngo",
        })?;

    if let Some(previous) = outcome.previous_claimant.filter(|p| *p != ngo_id) {
        warn!(
            "Donation {} re-claimed by {}; overwrote claim by user {}",
            donation_id, session.username, previous
        );
    }

    info!(
        "NGO {} claimed donation {} ({}) from donor {}",
        session.username, donation_id, outcome.food_item, outcome.donor_id
    );
    Ok(flash::redirect(
        Flash::success("Claimed! Check \"My Claims\" to chat with the donor."),
        "/ngo",
    ))
}
