use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::event::{ClientMessage, ProtocolError};


pub const DEFAULT_HOST: &str = "www.freechess.club";
pub const RELAY_PATH: &str = "/ws";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAddress {
    pub host: String,
    // Use `wss://` instead of `ws://`.
    pub secure: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Default for RelayAddress {
    fn default() -> Self {
        RelayAddress { host: DEFAULT_HOST.to_owned(), secure: true }
    }
}

impl RelayAddress {
    pub fn url(&self, login: bool) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let query = if login { "?login=1" } else { "" };
        format!("{scheme}://{}{RELAY_PATH}{query}", self.host)
    }
}

// Login payload understood by the relay: "[user]" or "[user,base64(password)]".
pub fn login_text(credentials: &Credentials) -> String {
    if credentials.password.is_empty() {
        format!("[{}]", credentials.user)
    } else {
        format!("[{},{}]", credentials.user, BASE64.encode(&credentials.password))
    }
}

pub fn encode_message(message: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|err| ProtocolError::Json(err.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_urls() {
        let address = RelayAddress { host: "localhost:8080".to_owned(), secure: false };
        assert_eq!(address.url(false), "ws://localhost:8080/ws");
        assert_eq!(address.url(true), "ws://localhost:8080/ws?login=1");
        assert_eq!(RelayAddress::default().url(false), "wss://www.freechess.club/ws");
    }

    #[test]
    fn login_payload() {
        let guest = Credentials { user: "guest".to_owned(), password: String::new() };
        assert_eq!(login_text(&guest), "[guest]");
        let user = Credentials { user: "alice".to_owned(), password: "secret".to_owned() };
        assert_eq!(login_text(&user), "[alice,c2VjcmV0]");
    }
}
