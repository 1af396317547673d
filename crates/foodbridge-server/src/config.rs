use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Accepted range for `FOODBRIDGE_SESSION_HOURS`: one hour up to one year.
const SESSION_HOURS: std::ops::RangeInclusive<i64> = 1..=8760;

/// Placeholder session secrets that must not reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub session_secret: String,
    pub session_ttl: chrono::Duration,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = env_or("FOODBRIDGE_DB_PATH", "foodbridge.db").into();
        let host = env_or("FOODBRIDGE_HOST", "0.0.0.0");
        let port: u16 = env_or("FOODBRIDGE_PORT", "5000")
            .parse()
            .context("FOODBRIDGE_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("FOODBRIDGE_HOST must be an IP address")?;
        let session_hours = parse_session_hours(&env_or("FOODBRIDGE_SESSION_HOURS", "168"))?;

        Ok(Self {
            db_path,
            addr,
            session_secret: env_or("FOODBRIDGE_SESSION_SECRET", "dev-secret-change-me"),
            session_ttl: chrono::Duration::hours(session_hours),
            static_dir: env_or("FOODBRIDGE_STATIC_DIR", "static").into(),
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.session_secret.as_str())
    }
}

fn parse_session_hours(raw: &str) -> Result<i64> {
    let hours: i64 = raw
        .parse()
        .context("FOODBRIDGE_SESSION_HOURS must be a whole number of hours")?;
    if !SESSION_HOURS.contains(&hours) {
        anyhow::bail!(
            "FOODBRIDGE_SESSION_HOURS must be between {} and {}, got {}",
            SESSION_HOURS.start(),
            SESSION_HOURS.end(),
            hours
        );
    }
    Ok(hours)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_hours_accepts_the_default_and_bounds() {
        assert_eq!(parse_session_hours("168").unwrap(), 168);
        assert_eq!(parse_session_hours("1").unwrap(), 1);
        assert_eq!(parse_session_hours("8760").unwrap(), 8760);
    }

    #[test]
    fn session_hours_rejects_out_of_range_values() {
        assert!(parse_session_hours("0").is_err());
        assert!(parse_session_hours("-1").is_err());
        assert!(parse_session_hours("1000000000000").is_err());
        assert!(parse_session_hours("a week").is_err());
    }
}
