use jobfill_vault::{Profile, Provenance, SharedStore, StoredProfile};
use serde_json::Value;

use crate::config::AgentConfig;
use crate::error::SourceError;
use crate::{AgentError, Result};

/// Fetches the profile from the profile service.
///
/// Failures never leave this type: [`ProfileSource::fetch_profile`] and
/// [`ProfileSource::refresh`] log them and hand back `None`.
#[derive(Debug, Clone)]
pub struct ProfileSource {
    client: reqwest::Client,
    url: String,
}

impl ProfileSource {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.profile_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the profile, reporting exactly why it failed
    pub async fn try_fetch(&self) -> std::result::Result<Profile, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: service_error(&body),
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))?;

        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(SourceError::Service(message.to_string()));
        }

        Profile::from_value(value).map_err(|e| SourceError::Parse(e.to_string()))
    }

    /// GET the profile, or `None` if anything went wrong
    pub async fn fetch_profile(&self) -> Option<Profile> {
        match self.try_fetch().await {
            Ok(profile) => {
                tracing::debug!(url = %self.url, fields = profile.len(), "fetched profile");
                Some(profile)
            }
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "error fetching user data");
                None
            }
        }
    }

    /// Fetch and overwrite the cached profile. A failed fetch leaves the
    /// cache untouched.
    pub async fn refresh(&self, store: &SharedStore) -> Option<Profile> {
        let profile = self.fetch_profile().await?;

        let entry = StoredProfile {
            profile: profile.clone(),
            provenance: Provenance::fetched(self.url.as_str()),
        };

        let saved = store
            .lock()
            .map_err(|e| e.to_string())
            .and_then(|mut store| store.save(entry).map_err(|e| e.to_string()));

        match saved {
            Ok(()) => tracing::info!(fields = profile.len(), "user data cached"),
            Err(e) => tracing::error!(error = %e, "failed to cache user data"),
        }

        Some(profile)
    }
}

/// Pull the message out of an `{"error": "..."}` body, if that is what it is
fn service_error(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_extraction() {
        assert_eq!(
            service_error(r#"{"error": "user not found"}"#),
            Some("user not found".to_string())
        );
        assert_eq!(service_error("Internal Server Error"), None);
        assert_eq!(service_error(r#"{"error": 5}"#), None);
    }

    #[test]
    fn test_source_uses_config_url() {
        let mut config = AgentConfig::new("/tmp/profile.json");
        config.user_id = Some("7".to_string());

        let source = ProfileSource::new(&config).unwrap();
        assert_eq!(source.url(), "http://localhost:5000/api/user_data?user_id=7");
    }
}
