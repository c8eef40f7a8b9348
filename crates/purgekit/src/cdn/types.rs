use serde::{Deserialize, Serialize};

use crate::config::CdnConfig;

/// The three credentials every CDN API call needs
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CdnCredentials {
    /// Account identifier, sent as `X-Auth-Email`
    pub email: String,
    /// Sent as `X-Auth-Key`
    pub api_key: String,
    pub zone_id: String,
}

impl CdnCredentials {
    pub fn new(
        email: impl Into<String>,
        api_key: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            api_key: api_key.into(),
            zone_id: zone_id.into(),
        }
    }

    pub fn from_config(config: &CdnConfig) -> Self {
        Self::new(
            config.email.trim(),
            config.api_key.trim(),
            config.zone_id.trim(),
        )
    }

    /// All three credentials are non-blank
    pub fn is_complete(&self) -> bool {
        [&self.email, &self.api_key, &self.zone_id]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    /// Names of the credentials that are blank
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.api_key.trim().is_empty() {
            missing.push("api_key");
        }
        if self.zone_id.trim().is_empty() {
            missing.push("zone_id");
        }
        missing
    }
}

// Keep the API key out of logs
impl std::fmt::Debug for CdnCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnCredentials")
            .field("email", &self.email)
            .field("api_key", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

/// Envelope returned by every CDN API call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdnApiResponse {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<CdnApiError>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnApiError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl CdnApiResponse {
    /// The provider's error messages joined into one line
    pub fn error_message(&self) -> String {
        let messages: Vec<String> = self
            .errors
            .iter()
            .filter(|e| !e.message.is_empty())
            .map(|e| match e.code {
                Some(code) => format!("{} (code {code})", e.message),
                None => e.message.clone(),
            })
            .collect();

        if messages.is_empty() {
            "the API reported failure without an error message".to_string()
        } else {
            messages.join("; ")
        }
    }
}
