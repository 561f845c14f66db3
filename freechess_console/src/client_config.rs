use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use freechess_club::network::{Credentials, DEFAULT_HOST, RelayAddress};


#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub host: String,
    pub secure: bool,
    // Connect as a guest if absent.
    pub user: Option<String>,
    pub password: Option<String>,
    // Pause before reopening a dropped connection, e.g. "3s" or "1m 30s".
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,
    pub log_file: Option<String>,
    pub sound: bool,
    pub autoscroll: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            host: DEFAULT_HOST.to_owned(),
            secure: true,
            user: None,
            password: None,
            reconnect_delay: Duration::from_secs(3),
            log_file: Some("freechess_console.log".to_owned()),
            sound: true,
            autoscroll: true,
        }
    }
}

impl ConsoleConfig {
    pub fn relay(&self) -> RelayAddress {
        RelayAddress { host: self.host.clone(), secure: self.secure }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.user.as_ref().map(|user| Credentials {
            user: user.clone(),
            password: self.password.clone().unwrap_or_default(),
        })
    }
}

pub fn read_config_file(filename: &str) -> anyhow::Result<ConsoleConfig> {
    let contents = std::fs::read_to_string(filename)
        .with_context(|| format!("Failed to read config file '{filename}'."))?;
    parse_config(&contents).with_context(|| format!("Failed to parse config file '{filename}'."))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ConsoleConfig> {
    Ok(serde_yaml::from_str(contents)?)
}


#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config = parse_config(indoc!("
            host: localhost:8080
            secure: false
            reconnect_delay: 1m 30s
        "))
        .unwrap();
        assert_eq!(config.relay().url(false), "ws://localhost:8080/ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(90));
        assert_eq!(config.credentials(), None);
        assert!(config.sound);
    }

    #[test]
    fn credentials() {
        let config = parse_config("user: alice\n").unwrap();
        assert_eq!(
            config.credentials(),
            Some(Credentials { user: "alice".to_owned(), password: String::new() })
        );
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn malformed_config() {
        assert!(parse_config("reconnect_delay: soon\n").is_err());
    }
}
