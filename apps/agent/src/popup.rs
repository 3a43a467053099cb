use crate::bus::MessageBus;
use crate::error::BusError;

pub const FETCH_FAILED_ALERT: &str =
    "Failed to fetch user data. Please make sure the profile service is running.";
pub const FILL_FAILED_ALERT: &str = "Auto-fill failed on this page.";

/// Result of pressing the auto-fill button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Filled,
    /// The user would see this message in an alert box
    Alert(String),
}

/// The popup UI: a single `autoFillBtn`
pub struct Popup<'a> {
    bus: &'a MessageBus,
}

impl<'a> Popup<'a> {
    pub fn new(bus: &'a MessageBus) -> Self {
        Self { bus }
    }

    /// `autoFillBtn` click: ask the background for the profile, then push it
    /// to the active tab. Each click is an independent pass.
    pub async fn click(&self) -> Result<ClickOutcome, BusError> {
        let Some(profile) = self.bus.get_user_data().await? else {
            tracing::warn!("{}", FETCH_FAILED_ALERT);
            return Ok(ClickOutcome::Alert(FETCH_FAILED_ALERT.to_string()));
        };

        if self.bus.auto_fill(profile).await? {
            Ok(ClickOutcome::Filled)
        } else {
            tracing::warn!("{}", FILL_FAILED_ALERT);
            Ok(ClickOutcome::Alert(FILL_FAILED_ALERT.to_string()))
        }
    }
}
