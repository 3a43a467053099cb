use std::path::PathBuf;
use std::time::Duration;

use crate::{AgentError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/user_data";
/// Per-user profile service, queried with `?user_id=`
pub const DEFAULT_USER_ENDPOINT: &str = "http://localhost:5001/api/user_data";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Endpoint used when none is configured: the per-user service when a
/// non-empty user id is set, the single-profile one otherwise
pub fn default_endpoint(user_id: Option<&str>) -> &'static str {
    match user_id {
        Some(id) if !id.is_empty() => DEFAULT_USER_ENDPOINT,
        _ => DEFAULT_ENDPOINT,
    }
}

/// Everything the agent needs to know, resolved once and passed around
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Profile endpoint, without the `user_id` query
    pub endpoint: String,
    pub user_id: Option<String>,
    pub refresh_interval: Duration,
    /// `None` waits on the endpoint indefinitely
    pub request_timeout: Option<Duration>,
    pub cache_path: PathBuf,
}

impl AgentConfig {
    /// Config with defaults for everything but the cache location
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_id: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: None,
            cache_path: cache_path.into(),
        }
    }

    /// Config using the platform data directory for the cache
    pub fn with_default_cache() -> Result<Self> {
        let path = jobfill_vault::default_store_path().ok_or_else(|| {
            AgentError::Config("could not determine a data directory; pass --cache".to_string())
        })?;
        Ok(Self::new(path))
    }

    /// Full URL the profile is fetched from
    pub fn profile_url(&self) -> String {
        match self.user_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                let separator = if self.endpoint.contains('?') { '&' } else { '?' };
                format!(
                    "{}{}user_id={}",
                    self.endpoint,
                    separator,
                    urlencoding::encode(id)
                )
            }
            None => self.endpoint.clone(),
        }
    }
}
