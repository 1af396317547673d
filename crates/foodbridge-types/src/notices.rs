//! Text of the notifications written by the donation and chat workflows.

pub fn new_donation(food_item: &str, org_name: &str) -> String {
    format!("New Donation Alert: {} from {}", food_item, org_name)
}

pub fn claimed(food_item: &str, ngo_username: &str) -> String {
    format!("Great news! Your {} was claimed by {}.", food_item, ngo_username)
}

pub fn chat(sender_username: &str, food_item: &str) -> String {
    format!("New message from {} regarding {}", sender_username, food_item)
}
