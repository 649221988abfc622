use std::fmt::Debug;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Where and as whom to reach the storage service.
///
/// Every field is optional; unset fields fall back to the backend's own
/// defaults (shared profile files, instance metadata, ...).
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub region: Option<String>,

    /// Endpoint override, e.g. a local emulator
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Named credential profile
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,
}

impl Debug for ConnectionConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("profile", &self.profile)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ConnectionConfig {
    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let has_id = self.access_key_id.as_deref().is_some_and(|s| !s.is_empty());
        let has_secret = self.secret_access_key.as_deref().is_some_and(|s| !s.is_empty());
        if has_id != has_secret {
            return Err(Error::Config(ConfigError::Message(
                "connection.access_key_id and connection.secret_access_key must be set together"
                    .into(),
            )));
        }

        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "connection.endpoint must be an http(s) URL, got '{endpoint}'"
                ))));
            }
        }

        Ok(())
    }
}
