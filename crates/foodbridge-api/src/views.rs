//! Server-rendered pages. Every value that came from a user goes through
//! [`escape`] before it reaches the markup.

use std::fmt::Write;

use axum::response::Html;
use axum_extra::extract::cookie::CookieJar;

use foodbridge_db::models::{ClaimedDonationRow, DonationRow, NotificationRow, Thread, UserRow};
use foodbridge_types::api::Session;
use foodbridge_types::models::Role;

use crate::auth::AppState;
use crate::db_call;
use crate::error::AppError;
use crate::flash::{self, Flash};

/// Header state shared by every page: who is logged in and how many
/// notifications they have not opened.
pub struct Nav {
    pub session: Option<Session>,
    pub unread: i64,
}

impl Nav {
    pub fn anonymous() -> Self {
        Self {
            session: None,
            unread: 0,
        }
    }

    pub async fn for_session(state: &AppState, session: Session) -> Result<Self, AppError> {
        let user_id = session.user_id;
        let unread = db_call(state, move |db| db.unread_count(user_id)).await?;
        Ok(Self {
            session: Some(session),
            unread,
        })
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap `body` in the layout, consuming any pending flash message.
pub fn page(jar: CookieJar, title: &str, nav: &Nav, body: &str) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, Html(layout(title, nav, flash.as_ref(), body)))
}

fn layout(title: &str, nav: &Nav, flash: Option<&Flash>, body: &str) -> String {
    let links = match &nav.session {
        Some(session) => {
            let badge = if nav.unread > 0 {
                format!(r#" <span class="badge">{}</span>"#, nav.unread)
            } else {
                String::new()
            };
            format!(
                r#"<a href="{home}">Dashboard</a>
<a href="/notifications">Notifications{badge}</a>
<span class="user">{name} ({role})</span>
<a href="/logout">Logout</a>"#,
                home = session.role.home_path(),
                name = escape(&session.username),
                role = session.role,
            )
        }
        None => r#"<a href="/login">Login</a>
<a href="/register">Register</a>"#
            .to_string(),
    };

    let flash = flash
        .map(|f| {
            format!(
                r#"<div class="alert alert-{}">{}</div>"#,
                f.kind.as_str(),
                escape(&f.message)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<nav><a href="/" class="brand">FoodBridge</a>
{links}
</nav>
<main>
{flash}
{body}
</main>
<script src="/static/script.js"></script>
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn index(nav: &Nav) -> String {
    let call_to_action = match &nav.session {
        Some(session) => format!(
            r#"<p>Welcome back, {}.</p><p><a href="{}">Go to your dashboard</a></p>"#,
            escape(&session.username),
            session.role.home_path()
        ),
        None => r#"<p><a href="/register">Create an account</a> or <a href="/login">log in</a>.</p>"#
            .to_string(),
    };

    format!(
        r#"<h1>FoodBridge</h1>
<p>Donors list surplus food. NGOs claim it and arrange pickup over chat.</p>
{call_to_action}"#
    )
}

pub fn register() -> String {
    format!(
        r#"<h1>Register</h1>
<form method="post" action="/register">
<label>Username <input name="username" required minlength="3" maxlength="32"></label>
<label>Password <input type="password" name="password" required></label>
<label>Phone <input name="phone"></label>
<label>Role <select name="role">
<option value="{donor}">Donor</option>
<option value="{ngo}">NGO</option>
</select></label>
<button type="submit">Register</button>
</form>"#,
        donor = Role::Donor,
        ngo = Role::Ngo,
    )
}

pub fn login() -> String {
    r#"<h1>Login</h1>
<form method="post" action="/login">
<label>Username <input name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Login</button>
</form>"#
        .to_string()
}

pub fn donor_dashboard(donations: &[DonationRow]) -> String {
    let mut rows = String::new();
    for d in donations {
        let chat = if d.claimed_by.is_some() {
            format!(r#"<a href="/chat/{}">Chat</a>"#, d.id)
        } else {
            String::new()
        };
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>
"#,
            escape(&d.food_item),
            escape(&d.quantity),
            escape(&d.expiry_datetime),
            escape(&d.status),
            escape(&d.created_at),
            chat,
        );
    }
    if donations.is_empty() {
        rows.push_str(r#"<tr><td colspan="6">No donations yet.</td></tr>"#);
    }

    format!(
        r#"<h1>Donor dashboard</h1>
<form method="post" action="/donor">
<label>Organisation <input name="org_name" required></label>
<label>Food item <input name="food_item" required></label>
<label>Quantity <input name="quantity" required></label>
<label>Expiry <input type="datetime-local" name="expiry" required></label>
<button type="submit">List donation</button>
</form>
<h2>My donations</h2>
<table>
<tr><th>Food</th><th>Quantity</th><th>Expiry</th><th>Status</th><th>Listed</th><th></th></tr>
{rows}</table>"#
    )
}

pub fn ngo_dashboard(active: &[DonationRow], claims: &[ClaimedDonationRow]) -> String {
    let mut cards = String::new();
    for d in active {
        let _ = write!(
            cards,
            r#"<div class="donation-col"><div class="card-body">
<h3>{food}</h3>
<p>{quantity} from {org}</p>
<p class="countdown-timer" data-expiry="{expiry}">{expiry}</p>
<form method="post" action="/claim/{id}"><button type="submit">Claim</button></form>
</div></div>
"#,
            food = escape(&d.food_item),
            quantity = escape(&d.quantity),
            org = escape(&d.org_name),
            expiry = escape(&d.expiry_datetime),
            id = d.id,
        );
    }
    if active.is_empty() {
        cards.push_str("<p>No active donations right now.</p>");
    }

    let mut rows = String::new();
    for c in claims {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href="/chat/{}">Chat with donor</a></td></tr>
"#,
            escape(&c.donation.food_item),
            escape(&c.donation.quantity),
            escape(&c.donation.org_name),
            escape(&c.donor_name),
            c.donation.id,
        );
    }
    if claims.is_empty() {
        rows.push_str(r#"<tr><td colspan="5">You have not claimed anything yet.</td></tr>"#);
    }

    format!(
        r#"<h1>Available donations</h1>
<input id="donationSearch" placeholder="Search donations">
<div class="donations">
{cards}</div>
<h2>My Claims</h2>
<table>
<tr><th>Food</th><th>Quantity</th><th>Organisation</th><th>Donor</th><th></th></tr>
{rows}</table>"#
    )
}

pub fn notifications(notifications: &[NotificationRow]) -> String {
    let mut items = String::new();
    for n in notifications {
        let class = if n.is_read { "read" } else { "unread" };
        let _ = write!(
            items,
            r#"<li class="{class}"><a href="/notification/read/{id}">{message}</a> <small>{at}</small></li>
"#,
            id = n.id,
            message = escape(&n.message),
            at = escape(&n.created_at),
        );
    }
    if notifications.is_empty() {
        items.push_str("<li>Nothing here yet.</li>\n");
    }

    format!(
        r#"<h1>Notifications</h1>
<ul class="notifications">
{items}</ul>"#
    )
}

/// `counterpart` is the other party on the donation, when there is one.
pub fn chat(thread: &Thread, session: &Session, counterpart: Option<&UserRow>) -> String {
    let d = &thread.donation;

    let with = match counterpart {
        Some(user) if user.phone.is_empty() => format!("<p>Chatting with {}</p>", escape(&user.username)),
        Some(user) => format!(
            "<p>Chatting with {} (phone: {})</p>",
            escape(&user.username),
            escape(&user.phone)
        ),
        None => "<p>Chat opens once an NGO claims this donation.</p>".to_string(),
    };

    let mut lines = String::new();
    for m in &thread.messages {
        let class = if m.sender_id == session.user_id { "mine" } else { "theirs" };
        let _ = write!(
            lines,
            r#"<div class="message {class}"><strong>{who}</strong> {text} <small>{at}</small></div>
"#,
            who = escape(&m.sender_username),
            text = escape(&m.text),
            at = escape(&m.created_at),
        );
    }
    if thread.messages.is_empty() {
        lines.push_str("<p>No messages yet.</p>\n");
    }

    let form = if d.claimed_by.is_some() {
        format!(
            r#"<form method="post" action="/chat/{}">
<input name="message" required autocomplete="off">
<button type="submit">Send</button>
</form>"#,
            d.id
        )
    } else {
        String::new()
    };

    format!(
        r#"<h1>{food} ({quantity})</h1>
<p>{org} · status {status} · expires {expiry}</p>
{with}
<div class="thread">
{lines}</div>
{form}"#,
        food = escape(&d.food_item),
        quantity = escape(&d.quantity),
        org = escape(&d.org_name),
        status = escape(&d.status),
        expiry = escape(&d.expiry_datetime),
    )
}
