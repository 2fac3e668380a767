use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

pub struct Config {
    pub db_path: PathBuf,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_sender: String,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let poll_ms: u64 = var("EXPORT_POLL_MS")
            .unwrap_or_else(|| "1000".to_string())
            .parse()
            .context("EXPORT_POLL_MS must be a number of milliseconds")?;

        Ok(Self {
            db_path: var("OPENMUSIC_DB_PATH")
                .unwrap_or_else(|| "openmusic.db".to_string())
                .into(),
            mail_api_url: required(&var, "MAIL_API_URL")?,
            mail_api_key: required(&var, "MAIL_API_KEY")?,
            mail_sender: required(&var, "MAIL_SENDER")?,
            poll_interval: Duration::from_millis(poll_ms),
        })
    }
}

fn required(var: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    match var(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{name} must be set"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MAIL: [(&str, &str); 3] = [
        ("MAIL_API_URL", "http://relay.local/send"),
        ("MAIL_API_KEY", "relay-key"),
        ("MAIL_SENDER", "noreply@openmusic.local"),
    ];

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_mail_settings_are_set() {
        let config = Config::from_lookup(lookup(&MAIL)).unwrap();

        assert_eq!(config.db_path, PathBuf::from("openmusic.db"));
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.mail_api_url, "http://relay.local/send");
        assert_eq!(config.mail_sender, "noreply@openmusic.local");
    }

    #[test]
    fn each_mail_setting_is_required() {
        for (missing, _) in MAIL {
            let rest: Vec<_> = MAIL.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = Config::from_lookup(lookup(&rest)).err().unwrap();
            assert!(err.to_string().contains(missing), "{err}");
        }
    }

    #[test]
    fn blank_mail_setting_is_rejected() {
        let mut pairs = MAIL.to_vec();
        pairs[1] = ("MAIL_API_KEY", "   ");
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn poll_interval_must_be_milliseconds() {
        let mut pairs = MAIL.to_vec();
        pairs.push(("EXPORT_POLL_MS", "soon"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        pairs.pop();
        pairs.push(("EXPORT_POLL_MS", "250"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }
}
