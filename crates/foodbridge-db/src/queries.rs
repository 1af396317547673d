use crate::Database;
use crate::models::{
    ClaimOutcome, ClaimedDonationRow, CreatedDonation, DonationRow, MessageRow, NotificationRow,
    PostOutcome, Thread, UserRow,
};
use anyhow::Result;
use foodbridge_types::api::NewDonation;
use foodbridge_types::models::{DonationStatus, NotificationKind, Role};
use foodbridge_types::notices;
use rusqlite::{Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, username, password, role, phone, created_at";

const DONATION_COLUMNS: &str =
    "d.id, d.donor_id, d.org_name, d.food_item, d.quantity, d.expiry_datetime, d.status, d.claimed_by, d.created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, type, related_id, is_read, created_at";

impl Database {
    // -- Users --

    /// Insert a user. Returns `None` when the username is already taken.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        phone: &str,
    ) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, password, role, phone) VALUES (?1, ?2, ?3, ?4)",
                (username, password_hash, role.as_str(), phone),
            );

            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                    [username],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    // -- Donations --

    /// List a donation and notify every NGO about it, in one transaction.
    pub fn create_donation(&self, donor_id: i64, donation: &NewDonation) -> Result<CreatedDonation> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO donations (donor_id, org_name, food_item, quantity, expiry_datetime)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    donor_id,
                    &donation.org_name,
                    &donation.food_item,
                    &donation.quantity,
                    donation.expiry_string(),
                ),
            )?;
            let id = tx.last_insert_rowid();

            let ngo_ids = user_ids_with_role(tx, Role::Ngo)?;
            let message = notices::new_donation(&donation.food_item, &donation.org_name);
            for ngo_id in &ngo_ids {
                insert_notification(tx, *ngo_id, &message, NotificationKind::NewDonation, id)?;
            }

            Ok(CreatedDonation {
                id,
                notified: ngo_ids.len(),
            })
        })
    }

    pub fn get_donation(&self, id: i64) -> Result<Option<DonationRow>> {
        self.with_conn(|conn| query_donation(conn, id))
    }

    /// Donations owned by `donor_id`, newest first.
    pub fn list_own_donations(&self, donor_id: i64) -> Result<Vec<DonationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DONATION_COLUMNS} FROM donations d
                 WHERE d.donor_id = ?1
                 ORDER BY d.created_at DESC, d.id DESC"
            ))?;
            let rows = stmt
                .query_map([donor_id], donation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every unclaimed donation, newest first.
    pub fn list_active_donations(&self) -> Result<Vec<DonationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DONATION_COLUMNS} FROM donations d
                 WHERE d.status = ?1
                 ORDER BY d.created_at DESC, d.id DESC"
            ))?;
            let rows = stmt
                .query_map([DonationStatus::Active.as_str()], donation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark a donation claimed by `ngo_id` and notify its donor.
    ///
    /// The update does not look at the current status: a second claim
    /// overwrites the first and the last write wins. Returns `None` if the
    /// donation does not exist.
    pub fn claim_donation(
        &self,
        donation_id: i64,
        ngo_id: i64,
        ngo_username: &str,
    ) -> Result<Option<ClaimOutcome>> {
        self.with_tx(|tx| {
            let Some(donation) = query_donation(tx, donation_id)? else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE donations SET status = ?1, claimed_by = ?2 WHERE id = ?3",
                (DonationStatus::Claimed.as_str(), ngo_id, donation_id),
            )?;

            let message = notices::claimed(&donation.food_item, ngo_username);
            insert_notification(tx, donation.donor_id, &message, NotificationKind::Claim, donation_id)?;

            Ok(Some(ClaimOutcome {
                donor_id: donation.donor_id,
                food_item: donation.food_item,
                previous_claimant: donation.claimed_by,
            }))
        })
    }

    /// Donations claimed by `ngo_id` with their donor's username, newest first.
    pub fn list_my_claims(&self, ngo_id: i64) -> Result<Vec<ClaimedDonationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DONATION_COLUMNS}, u.username
                 FROM donations d
                 JOIN users u ON d.donor_id = u.id
                 WHERE d.claimed_by = ?1
                 ORDER BY d.created_at DESC, d.id DESC"
            ))?;
            let rows = stmt
                .query_map([ngo_id], |row| {
                    Ok(ClaimedDonationRow {
                        donation: donation_from_row(row)?,
                        donor_name: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn unread_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// All notifications for `user_id`, newest first.
    pub fn list_notifications(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark a notification read if it belongs to `user_id`.
    /// Returns `None` for unknown ids and for other users' notifications.
    pub fn open_notification(&self, id: i64, user_id: i64) -> Result<Option<NotificationRow>> {
        self.with_tx(|tx| {
            let found = tx
                .query_row(
                    &format!(
                        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1 AND user_id = ?2"
                    ),
                    (id, user_id),
                    notification_from_row,
                )
                .optional()?;

            let Some(mut notification) = found else {
                return Ok(None);
            };

            if !notification.is_read {
                tx.execute("UPDATE notifications SET is_read = 1 WHERE id = ?1", [id])?;
                notification.is_read = true;
            }
            Ok(Some(notification))
        })
    }

    // -- Messages --

    /// Append a chat message and notify the other party, in one transaction.
    pub fn post_message(
        &self,
        donation_id: i64,
        sender_id: i64,
        sender_username: &str,
        text: &str,
    ) -> Result<PostOutcome> {
        self.with_tx(|tx| {
            let Some(donation) = query_donation(tx, donation_id)? else {
                return Ok(PostOutcome::DonationMissing);
            };
            if !donation.is_party(sender_id) {
                return Ok(PostOutcome::NotParticipant);
            }

            let recipient_id = if sender_id == donation.donor_id {
                match donation.claimed_by {
                    Some(ngo_id) => ngo_id,
                    None => return Ok(PostOutcome::Unclaimed),
                }
            } else {
                donation.donor_id
            };

            tx.execute(
                "INSERT INTO messages (donation_id, sender_id, text) VALUES (?1, ?2, ?3)",
                (donation_id, sender_id, text),
            )?;
            let message_id = tx.last_insert_rowid();

            let notice = notices::chat(sender_username, &donation.food_item);
            insert_notification(tx, recipient_id, &notice, NotificationKind::Chat, donation_id)?;

            Ok(PostOutcome::Posted {
                message_id,
                recipient_id,
            })
        })
    }

    /// A donation with its messages, oldest first. `None` if the donation is missing.
    pub fn get_thread(&self, donation_id: i64) -> Result<Option<Thread>> {
        self.with_conn(|conn| {
            let Some(donation) = query_donation(conn, donation_id)? else {
                return Ok(None);
            };

            // JOIN users to fetch the sender's name in the same query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.donation_id, m.sender_id, u.username, m.text, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.donation_id = ?1
                 ORDER BY m.created_at ASC, m.id ASC",
            )?;
            let messages = stmt
                .query_map([donation_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        donation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_username: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        text: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(Thread { donation, messages }))
        })
    }
}

fn user_ids_with_role(conn: &Connection, role: Role) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE role = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map([role.as_str()], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn insert_notification(
    conn: &Connection,
    user_id: i64,
    message: &str,
    kind: NotificationKind,
    related_id: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (user_id, message, type, related_id) VALUES (?1, ?2, ?3, ?4)",
        (user_id, message, kind.as_str(), related_id),
    )?;
    Ok(())
}

fn query_donation(conn: &Connection, id: i64) -> Result<Option<DonationRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {DONATION_COLUMNS} FROM donations d WHERE d.id = ?1"),
            [id],
            donation_from_row,
        )
        .optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn donation_from_row(row: &Row<'_>) -> rusqlite::Result<DonationRow> {
    Ok(DonationRow {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        org_name: row.get(2)?,
        food_item: row.get(3)?,
        quantity: row.get(4)?,
        expiry_datetime: row.get(5)?,
        status: row.get(6)?,
        claimed_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        kind: row.get(3)?,
        related_id: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodbridge_types::api::EXPIRY_FORMAT;

    fn donation(food_item: &str) -> NewDonation {
        NewDonation {
            org_name: "Green Bistro".into(),
            food_item: food_item.into(),
            quantity: "20 portions".into(),
            expiry: chrono::NaiveDateTime::parse_from_str("2026-10-18T19:30", EXPIRY_FORMAT).unwrap(),
        }
    }

    fn user(db: &Database, name: &str, role: Role) -> i64 {
        db.create_user(name, "hash", role, "555-0100").unwrap().unwrap()
    }

    #[test]
    fn duplicate_username_leaves_first_row_alone() {
        let db = Database::open_in_memory().unwrap();
        let first = user(&db, "harbour", Role::Donor);

        let second = db.create_user("harbour", "other-hash", Role::Ngo, "555-0199").unwrap();
        assert_eq!(second, None);

        let row = db.get_user_by_username("harbour").unwrap().unwrap();
        assert_eq!(row.id, first);
        assert_eq!(row.password, "hash");
        assert_eq!(row.role, "donor");
        assert_eq!(row.phone, "555-0100");
    }

    #[test]
    fn other_constraint_failures_are_errors_not_duplicates() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER block_reserved BEFORE INSERT ON users
                 WHEN NEW.username = 'admin'
                 BEGIN SELECT RAISE(ABORT, 'reserved username'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.create_user("admin", "hash", Role::Donor, "").is_err());
        assert!(db.get_user_by_username("admin").unwrap().is_none());
    }

    #[test]
    fn new_donation_notifies_every_ngo() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let other_donor = user(&db, "bakery", Role::Donor);
        let ngos = [
            user(&db, "shelter", Role::Ngo),
            user(&db, "pantry", Role::Ngo),
            user(&db, "kitchen", Role::Ngo),
        ];

        let created = db.create_donation(donor, &donation("Curry")).unwrap();
        assert_eq!(created.notified, 3);

        for ngo in ngos {
            let notes = db.list_notifications(ngo).unwrap();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].kind, "new_donation");
            assert_eq!(notes[0].related_id, created.id);
            assert_eq!(notes[0].message, "New Donation Alert: Curry from Green Bistro");
            assert!(!notes[0].is_read);
        }
        assert!(db.list_notifications(donor).unwrap().is_empty());
        assert!(db.list_notifications(other_donor).unwrap().is_empty());
    }

    #[test]
    fn new_donation_without_ngos_still_lists() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);

        let created = db.create_donation(donor, &donation("Bread")).unwrap();
        assert_eq!(created.notified, 0);

        let row = db.get_donation(created.id).unwrap().unwrap();
        assert_eq!(row.status, "Active");
        assert_eq!(row.claimed_by, None);
        assert_eq!(row.expiry_datetime, "2026-10-18T19:30");
    }

    #[test]
    fn listings_are_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let first = db.create_donation(donor, &donation("Soup")).unwrap();
        let second = db.create_donation(donor, &donation("Rice")).unwrap();

        let own: Vec<i64> = db.list_own_donations(donor).unwrap().iter().map(|d| d.id).collect();
        assert_eq!(own, vec![second.id, first.id]);

        let active: Vec<i64> = db.list_active_donations().unwrap().iter().map(|d| d.id).collect();
        assert_eq!(active, vec![second.id, first.id]);
    }

    #[test]
    fn claim_sets_claimant_and_notifies_donor_once() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let ngo = user(&db, "shelter", Role::Ngo);
        let created = db.create_donation(donor, &donation("Curry")).unwrap();

        let outcome = db.claim_donation(created.id, ngo, "shelter").unwrap().unwrap();
        assert_eq!(outcome.donor_id, donor);
        assert_eq!(outcome.previous_claimant, None);

        let row = db.get_donation(created.id).unwrap().unwrap();
        assert_eq!(row.status, "Claimed");
        assert_eq!(row.claimed_by, Some(ngo));
        assert!(db.list_active_donations().unwrap().is_empty());

        let notes = db.list_notifications(donor).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, "claim");
        assert_eq!(notes[0].related_id, created.id);
        assert_eq!(notes[0].message, "Great news! Your Curry was claimed by shelter.");

        let claims = db.list_my_claims(ngo).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].donor_name, "bistro");
    }

    #[test]
    fn second_claim_overwrites_the_first() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let first_ngo = user(&db, "shelter", Role::Ngo);
        let second_ngo = user(&db, "pantry", Role::Ngo);
        let created = db.create_donation(donor, &donation("Curry")).unwrap();

        db.claim_donation(created.id, first_ngo, "shelter").unwrap().unwrap();
        let outcome = db.claim_donation(created.id, second_ngo, "pantry").unwrap().unwrap();
        assert_eq!(outcome.previous_claimant, Some(first_ngo));

        let row = db.get_donation(created.id).unwrap().unwrap();
        assert_eq!(row.claimed_by, Some(second_ngo));
        assert!(db.list_my_claims(first_ngo).unwrap().is_empty());
    }

    #[test]
    fn claiming_missing_donation_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let ngo = user(&db, "shelter", Role::Ngo);

        assert!(db.claim_donation(42, ngo, "shelter").unwrap().is_none());
        let total: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM notifications", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn chat_notifies_the_counterpart() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let ngo = user(&db, "shelter", Role::Ngo);
        let created = db.create_donation(donor, &donation("Curry")).unwrap();
        db.claim_donation(created.id, ngo, "shelter").unwrap();
        let ngo_before = db.unread_count(ngo).unwrap();
        let donor_before = db.unread_count(donor).unwrap();

        let outcome = db.post_message(created.id, donor, "bistro", "Pickup at 6?").unwrap();
        assert!(matches!(outcome, PostOutcome::Posted { recipient_id, .. } if recipient_id == ngo));
        assert_eq!(db.unread_count(ngo).unwrap(), ngo_before + 1);
        assert_eq!(db.unread_count(donor).unwrap(), donor_before);

        let outcome = db.post_message(created.id, ngo, "shelter", "Works for us").unwrap();
        assert!(matches!(outcome, PostOutcome::Posted { recipient_id, .. } if recipient_id == donor));
        assert_eq!(db.unread_count(donor).unwrap(), donor_before + 1);

        let latest = &db.list_notifications(donor).unwrap()[0];
        assert_eq!(latest.kind, "chat");
        assert_eq!(latest.message, "New message from shelter regarding Curry");

        let thread = db.get_thread(created.id).unwrap().unwrap();
        let texts: Vec<&str> = thread.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Pickup at 6?", "Works for us"]);
        assert_eq!(thread.messages[0].sender_username, "bistro");
    }

    #[test]
    fn chat_rejects_outsiders_and_unclaimed_threads() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let ngo = user(&db, "shelter", Role::Ngo);
        let outsider = user(&db, "pantry", Role::Ngo);
        let created = db.create_donation(donor, &donation("Curry")).unwrap();

        assert_eq!(
            db.post_message(created.id, donor, "bistro", "anyone?").unwrap(),
            PostOutcome::Unclaimed
        );

        db.claim_donation(created.id, ngo, "shelter").unwrap();
        assert_eq!(
            db.post_message(created.id, outsider, "pantry", "hi").unwrap(),
            PostOutcome::NotParticipant
        );
        assert_eq!(
            db.post_message(999, donor, "bistro", "hi").unwrap(),
            PostOutcome::DonationMissing
        );
        assert!(db.get_thread(created.id).unwrap().unwrap().messages.is_empty());
    }

    #[test]
    fn opening_a_notification_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let ngo = user(&db, "shelter", Role::Ngo);
        let created = db.create_donation(donor, &donation("Curry")).unwrap();
        let note_id = db.list_notifications(ngo).unwrap()[0].id;
        assert_eq!(db.unread_count(ngo).unwrap(), 1);

        let opened = db.open_notification(note_id, ngo).unwrap().unwrap();
        assert!(opened.is_read);
        assert_eq!(opened.related_id, created.id);
        assert_eq!(db.unread_count(ngo).unwrap(), 0);

        db.open_notification(note_id, ngo).unwrap().unwrap();
        assert_eq!(db.unread_count(ngo).unwrap(), 0);
    }

    #[test]
    fn foreign_notification_is_not_opened() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "bistro", Role::Donor);
        let ngo = user(&db, "shelter", Role::Ngo);
        db.create_donation(donor, &donation("Curry")).unwrap();
        let note_id = db.list_notifications(ngo).unwrap()[0].id;

        assert!(db.open_notification(note_id, donor).unwrap().is_none());
        assert!(db.open_notification(note_id + 100, ngo).unwrap().is_none());
        assert_eq!(db.unread_count(ngo).unwrap(), 1);
    }
}
