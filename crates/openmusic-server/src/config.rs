use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder token secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "secret", "changeme"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub access_token_key: String,
    pub refresh_token_key: String,
    pub access_token_age: Duration,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let host = get("OPENMUSIC_HOST", "0.0.0.0");
        let port: u16 = get("OPENMUSIC_PORT", "5000")
            .parse()
            .context("OPENMUSIC_PORT must be a port number")?;
        let public_url = var("OPENMUSIC_PUBLIC_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        Ok(Self {
            db_path: get("OPENMUSIC_DB_PATH", "openmusic.db").into(),
            access_token_key: secret(&var, "ACCESS_TOKEN_KEY")?,
            refresh_token_key: secret(&var, "REFRESH_TOKEN_KEY")?,
            access_token_age: seconds(&get("ACCESS_TOKEN_AGE", "1800"), "ACCESS_TOKEN_AGE")?,
            upload_dir: get("OPENMUSIC_UPLOAD_DIR", "./uploads/images").into(),
            cache_ttl: seconds(&get("OPENMUSIC_CACHE_TTL", "1800"), "OPENMUSIC_CACHE_TTL")?,
            cache_capacity: get("OPENMUSIC_CACHE_CAPACITY", "10000")
                .parse()
                .context("OPENMUSIC_CACHE_CAPACITY must be a number")?,
            host,
            port,
            public_url,
        })
    }
}

fn secret(var: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    let value = var(name).unwrap_or_default();
    if value.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        bail!("{name} is unset or still a placeholder");
    }
    Ok(value)
}

fn seconds(value: &str, name: &str) -> anyhow::Result<Duration> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("{name} must be a number of seconds"))?;
    Ok(Duration::from_secs(secs))
}
