//! Saved Xtream account records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder shown when an account has never reported a status.
pub const UNSET_STATUS: &str = "-";

/// One saved account, as stored in `servers.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServerRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub server_url: String,
    #[serde(deserialize_with = "lenient::string")]
    pub username: String,
    #[serde(deserialize_with = "lenient::string")]
    pub password: String,
    #[serde(deserialize_with = "lenient::int")]
    pub created_at: i64,
    #[serde(deserialize_with = "lenient::opt_int")]
    pub last_check: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub last_endpoint: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub last_client: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub user_info: Map<String, Value>,
    #[serde(deserialize_with = "lenient::object")]
    pub server_info: Map<String, Value>,
}

impl ServerRecord {
    /// Build a fresh record. An empty label falls back to the server URL.
    pub fn new(
        name: impl Into<String>,
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        created_at: i64,
    ) -> Self {
        let server_url = server_url.into();
        let name = name.into();
        Self {
            name: if name.is_empty() {
                server_url.clone()
            } else {
                name
            },
            server_url,
            username: username.into(),
            password: password.into(),
            created_at,
            ..Default::default()
        }
    }

    /// Label for listings: the name, or the URL when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.server_url
        } else {
            &self.name
        }
    }

    /// Name with spaces replaced, used as a file name prefix.
    pub fn safe_name(&self) -> String {
        let name = if self.name.is_empty() {
            "server"
        } else {
            &self.name
        };
        name.replace(' ', "_")
    }

    /// `user_info.status` as reported by the panel, or `-`.
    pub fn status(&self) -> String {
        match self.user_info.get("status") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null) | None => UNSET_STATUS.to_string(),
            Some(Value::String(_)) => UNSET_STATUS.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Account expiry as unix seconds. Panels send either a number or a
    /// numeric string; `None` when absent or unparseable.
    pub fn expiry(&self) -> Option<i64> {
        value_as_i64(self.user_info.get("exp_date")?)
    }

    /// Raw `user_info` field rendered for display (`None` for missing/null).
    pub fn user_field(&self, key: &str) -> Option<String> {
        match self.user_info.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Replace account info after a successful `player_api` probe.
    pub fn apply_probe_success(
        &mut self,
        data: &Value,
        endpoint: impl Into<String>,
        client: impl Into<String>,
        now: i64,
    ) {
        self.user_info = object_field(data, "user_info");
        self.server_info = object_field(data, "server_info");
        self.last_endpoint = Some(endpoint.into());
        self.last_client = Some(client.into());
        self.last_check = Some(now);
    }

    /// Record a failed probe. Previously fetched info is kept.
    pub fn apply_probe_failure(&mut self, now: i64) {
        self.last_endpoint = None;
        self.last_client = None;
        self.last_check = Some(now);
    }

    /// Record a successful playlist download.
    pub fn apply_playlist_success(
        &mut self,
        endpoint: impl Into<String>,
        client: impl Into<String>,
        now: i64,
    ) {
        self.last_endpoint = Some(endpoint.into());
        self.last_client = Some(client.into());
        self.last_check = Some(now);
    }
}

fn object_field(data: &Value, key: &str) -> Map<String, Value> {
    match data.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Field decoders for hand-edited `servers.json` files: numbers and bools
/// read as strings, `null` reads as the default.
mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::{Map, Value};

    use super::value_as_i64;

    fn text(value: Value) -> Result<Option<String>, String> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(format!("expected a string, found {other}")),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(text(value).map_err(D::Error::custom)?.unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        text(Value::deserialize(d)?).map_err(D::Error::custom)
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(opt_int(d)?.unwrap_or_default())
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            value => value_as_i64(&value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a timestamp, found {value}"))),
        }
    }

    pub fn object<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
        match Value::deserialize(d)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(D::Error::custom(format!("expected an object, found {other}"))),
        }
    }
}
