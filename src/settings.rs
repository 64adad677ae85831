//! Client configuration and the server capability snapshot.

use crate::error::ClimSimError;
use serde::Deserialize;
use serde_json::Value as Json;

/// Host/port pair of a service endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ServerAddress {
    pub hostname: &'static str,
    pub port: u16,
}

pub(crate) const REMOTE_ADDRESS: ServerAddress = ServerAddress {
    hostname: "climsim.dynalias.net",
    port: 80,
};

pub(crate) const LOCAL_ADDRESS: ServerAddress = ServerAddress {
    hostname: "192.168.0.194",
    port: 88,
};

/// Mutable per-client configuration, constructed via [`ClientSettings::default`]
/// and resettable through [`crate::ClimSim::reset_settings`]. Mutation is
/// single-writer: setters take `&mut self` on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Talk to the local server instead of the public one (test setups).
    pub local_connection: bool,
    /// Append the test-mode marker to every request.
    pub test_mode: bool,
    /// Generate past climate from normals instead of using observed dailies.
    pub force_climate_generation: bool,
    /// Number of stations used for spatial imputation, 1..=35. `None` leaves
    /// the server default (4).
    pub nb_nearest_neighbours: Option<u8>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            local_connection: false,
            test_mode: false,
            force_climate_generation: false,
            nb_nearest_neighbours: None,
        }
    }
}

impl ClientSettings {
    pub(crate) fn address(&self) -> ServerAddress {
        if self.local_connection {
            LOCAL_ADDRESS
        } else {
            REMOTE_ADDRESS
        }
    }
}

/// Immutable snapshot of the one-time capability handshake: per-endpoint
/// batch-size limits and client-support status.
#[derive(Debug, Clone)]
pub(crate) struct Capabilities {
    pub max_coordinates_normals: usize,
    pub max_coordinates_weather_generation: usize,
    pub client_supported: bool,
    pub client_message: String,
}

/// Top level of the status reply.
#[derive(Debug, Deserialize)]
struct StatusReply {
    #[serde(rename = "IsInitCompleted", default)]
    is_init_completed: bool,
    /// Either a plain object or a string-encoded nested JSON document.
    settings: Option<Json>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(rename = "NbMaxCoordinatesNormals")]
    max_normals: Json,
    #[serde(rename = "NbMaxCoordinatesWG")]
    max_weather_generation: Json,
    #[serde(rename = "IsClientSupported", default = "default_true")]
    client_supported: bool,
    #[serde(rename = "ClientMessage", default)]
    client_message: String,
}

fn default_true() -> bool {
    true
}

impl Capabilities {
    /// Parse the JSON status reply. `IsInitCompleted` must be true and the
    /// `settings` entry must carry both batch limits.
    pub(crate) fn from_status_reply(reply: &str) -> Result<Capabilities, ClimSimError> {
        let status: StatusReply = serde_json::from_str(reply)
            .map_err(|e| ClimSimError::Handshake(e.to_string()))?;
        if !status.is_init_completed {
            return Err(ClimSimError::ServerNotReady);
        }

        let settings = status
            .settings
            .ok_or_else(|| ClimSimError::Handshake("missing 'settings' entry".to_string()))?;
        let raw: RawSettings = match settings {
            Json::String(encoded) => serde_json::from_str(&encoded),
            other => serde_json::from_value(other),
        }
        .map_err(|e| ClimSimError::Handshake(e.to_string()))?;

        let limit = |key: &str, value: &Json| {
            as_usize(value)
                .ok_or_else(|| ClimSimError::Handshake(format!("invalid '{key}' limit")))
        };
        Ok(Capabilities {
            max_coordinates_normals: limit("NbMaxCoordinatesNormals", &raw.max_normals)?,
            max_coordinates_weather_generation: limit(
                "NbMaxCoordinatesWG",
                &raw.max_weather_generation,
            )?,
            client_supported: raw.client_supported,
            client_message: raw.client_message,
        })
    }
}

// Limits sometimes arrive as JSON numbers, sometimes as quoted strings.
fn as_usize(value: &Json) -> Option<usize> {
    match value {
        Json::Number(n) => n.as_u64().map(|v| v as usize),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_encoded_settings() {
        let reply = r#"{"IsInitCompleted": true,
            "settings": "{\"NbMaxCoordinatesNormals\": 50, \"NbMaxCoordinatesWG\": 10}"}"#;
        let caps = Capabilities::from_status_reply(reply).unwrap();
        assert_eq!(caps.max_coordinates_normals, 50);
        assert_eq!(caps.max_coordinates_weather_generation, 10);
        assert!(caps.client_supported);
        assert_eq!(caps.client_message, "");
    }

    #[test]
    fn parses_inline_settings_object() {
        let reply = r#"{"IsInitCompleted": true,
            "settings": {"NbMaxCoordinatesNormals": "25", "NbMaxCoordinatesWG": 5,
                         "IsClientSupported": false, "ClientMessage": "please upgrade"}}"#;
        let caps = Capabilities::from_status_reply(reply).unwrap();
        assert_eq!(caps.max_coordinates_normals, 25);
        assert!(!caps.client_supported);
        assert_eq!(caps.client_message, "please upgrade");
    }

    #[test]
    fn incomplete_initialization_fails() {
        let reply = r#"{"IsInitCompleted": false, "settings": "{}"}"#;
        assert!(matches!(
            Capabilities::from_status_reply(reply),
            Err(ClimSimError::ServerNotReady)
        ));
    }

    #[test]
    fn missing_settings_fails() {
        let reply = r#"{"IsInitCompleted": true}"#;
        assert!(matches!(
            Capabilities::from_status_reply(reply),
            Err(ClimSimError::Handshake(_))
        ));
    }

    #[test]
    fn malformed_json_fails() {
        assert!(matches!(
            Capabilities::from_status_reply("not json"),
            Err(ClimSimError::Handshake(_))
        ));
    }
}
