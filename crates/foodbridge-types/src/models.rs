use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stored string that matches none of an enum's variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Ngo,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Donor => "donor",
            Self::Ngo => "ngo",
        }
    }

    /// Human label used in page copy ("a Donor", "an NGO").
    pub fn label(self) -> &'static str {
        match self {
            Self::Donor => "a Donor",
            Self::Ngo => "an NGO",
        }
    }

    /// Landing page for this role's dashboard.
    pub fn home_path(self) -> &'static str {
        match self {
            Self::Donor => "/donor",
            Self::Ngo => "/ngo",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(Self::Donor),
            "ngo" => Ok(Self::Ngo),
            other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Donations move Active -> Claimed exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationStatus {
    Active,
    Claimed,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Claimed => "Claimed",
        }
    }
}

impl FromStr for DonationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Claimed" => Ok(Self::Claimed),
            other => Err(UnknownVariant { kind: "donation status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A donor listed food; sent to every NGO.
    NewDonation,
    /// An NGO claimed a donation; sent to its donor.
    Claim,
    /// A chat message was posted; sent to the other party.
    Chat,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewDonation => "new_donation",
            Self::Claim => "claim",
            Self::Chat => "chat",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_donation" => Ok(Self::NewDonation),
            "claim" => Ok(Self::Claim),
            "chat" => Ok(Self::Chat),
            other => Err(UnknownVariant { kind: "notification type", value: other.to_string() }),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_stored_values() {
        assert_eq!("donor".parse::<Role>().unwrap(), Role::Donor);
        assert_eq!("ngo".parse::<Role>().unwrap(), Role::Ngo);
        assert!("admin".parse::<Role>().is_err());
        assert!("Donor".parse::<Role>().is_err());
    }

    #[test]
    fn unknown_notification_type_is_rejected() {
        let err = "reminder".parse::<NotificationKind>().unwrap_err();
        assert_eq!(err.value, "reminder");
        assert_eq!(err.to_string(), "unknown notification type 'reminder'");
    }

    #[test]
    fn status_strings_match_the_schema() {
        assert_eq!(DonationStatus::Active.as_str(), "Active");
        assert_eq!("Claimed".parse::<DonationStatus>().unwrap(), DonationStatus::Claimed);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Ngo).unwrap(), "\"ngo\"");
    }
}
