use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Format used for `expiry_datetime`, matching an HTML `datetime-local` input.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M";

// -- Session --

/// Signed session claims carried in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

/// Authenticated caller, resolved once per request and handed to every
/// protected handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

// -- Form validation --

/// A submitted form that failed validation. The message is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidForm(pub &'static str);

impl fmt::Display for InvalidForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for InvalidForm {}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone: String,
}

/// Registration input after validation; the password is still plaintext.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub phone: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<NewUser, InvalidForm> {
        let username = self.username.trim().to_string();
        let len = username.chars().count();
        if !(3..=32).contains(&len) {
            return Err(InvalidForm("Username must be between 3 and 32 characters."));
        }
        if self.password.is_empty() {
            return Err(InvalidForm("Password is required."));
        }
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| InvalidForm("Please choose either Donor or NGO."))?;

        Ok(NewUser {
            username,
            password: self.password,
            role,
            phone: self.phone.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// -- Donations --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DonationForm {
    pub org_name: String,
    pub food_item: String,
    pub quantity: String,
    pub expiry: String,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub org_name: String,
    pub food_item: String,
    pub quantity: String,
    pub expiry: NaiveDateTime,
}

impl NewDonation {
    /// Expiry rendered the way it is stored.
    pub fn expiry_string(&self) -> String {
        self.expiry.format(EXPIRY_FORMAT).to_string()
    }
}

impl DonationForm {
    pub fn validate(self) -> Result<NewDonation, InvalidForm> {
        let org_name = self.org_name.trim();
        let food_item = self.food_item.trim();
        let quantity = self.quantity.trim();
        if org_name.is_empty() || food_item.is_empty() || quantity.is_empty() {
            return Err(InvalidForm("All donation fields are required."));
        }

        let expiry = parse_expiry(self.expiry.trim())
            .ok_or(InvalidForm("Expiry must be a date and time."))?;

        Ok(NewDonation {
            org_name: org_name.to_string(),
            food_item: food_item.to_string(),
            quantity: quantity.to_string(),
            expiry,
        })
    }
}

fn parse_expiry(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, EXPIRY_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}
