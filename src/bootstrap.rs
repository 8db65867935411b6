//! Relay registration
//!
//! One request/response call against the relay obtains the session id and
//! the WebSocket endpoint for the signaling channel. Nothing can be sent
//! before it completes: the channel and negotiator constructors require the
//! registration's fields.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Identity and channel endpoint assigned by the relay
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub id: String,
    #[serde(rename = "wsEndpoint")]
    pub ws_endpoint: String,
}

/// Register with the relay and obtain a session identity
pub async fn register(base_url: &str) -> Result<Registration> {
    let url = format!("{}/connect", base_url.trim_end_matches('/'));
    info!("Registering with relay at {}", url);

    let registration = reqwest::get(&url)
        .await
        .context("Failed to reach relay")?
        .error_for_status()
        .context("Relay rejected registration")?
        .json::<Registration>()
        .await
        .context("Invalid registration response")?;

    info!("Registered as {}", registration.id);
    Ok(registration)
}

/// Build the signaling channel URL from the relay base and a registration
///
/// The relay hands out a path; the channel lives on the same host, with the
/// scheme switched to WebSocket.
pub fn ws_url(base_url: &str, registration: &Registration) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}{}", ws_base, registration.ws_endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_parses_relay_response() {
        let raw = r#"{"id":"abc123","wsEndpoint":"/ws/abc123"}"#;
        let registration: Registration = serde_json::from_str(raw).unwrap();
        assert_eq!(registration.id, "abc123");
        assert_eq!(registration.ws_endpoint, "/ws/abc123");
    }

    #[test]
    fn test_ws_url_switches_scheme() {
        let registration = Registration {
            id: "abc".to_string(),
            ws_endpoint: "/ws/abc".to_string(),
        };

        assert_eq!(
            ws_url("http://localhost:3000", &registration),
            "ws://localhost:3000/ws/abc"
        );
        assert_eq!(
            ws_url("https://relay.example.com/", &registration),
            "wss://relay.example.com/ws/abc"
        );
        assert_eq!(
            ws_url("ws://localhost:3000", &registration),
            "ws://localhost:3000/ws/abc"
        );
    }
}
