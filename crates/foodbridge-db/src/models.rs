/// Database row types — these map directly to SQLite rows.
/// Enum columns stay as their stored strings; callers parse them.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: String,
    pub phone: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct DonationRow {
    pub id: i64,
    pub donor_id: i64,
    pub org_name: String,
    pub food_item: String,
    pub quantity: String,
    pub expiry_datetime: String,
    pub status: String,
    pub claimed_by: Option<i64>,
    pub created_at: String,
}

impl DonationRow {
    /// True when `user_id` is the donor or the claiming NGO.
    pub fn is_party(&self, user_id: i64) -> bool {
        self.donor_id == user_id || self.claimed_by == Some(user_id)
    }
}

/// A donation claimed by the caller, with the donor's username.
#[derive(Debug, Clone)]
pub struct ClaimedDonationRow {
    pub donation: DonationRow,
    pub donor_name: String,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub kind: String,
    pub related_id: i64,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub donation_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub text: String,
    pub created_at: String,
}

/// A donation and its chat messages, oldest first.
#[derive(Debug, Clone)]
pub struct Thread {
    pub donation: DonationRow,
    pub messages: Vec<MessageRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedDonation {
    pub id: i64,
    /// Number of NGOs that received a `new_donation` notification.
    pub notified: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub donor_id: i64,
    pub food_item: String,
    /// The NGO that held the claim before this write, if any.
    pub previous_claimant: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    Posted { message_id: i64, recipient_id: i64 },
    DonationMissing,
    NotParticipant,
    /// Only the donor exists on an unclaimed donation; there is nobody to talk to.
    Unclaimed,
}
