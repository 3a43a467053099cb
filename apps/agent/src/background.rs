use jobfill_vault::{Profile, SharedStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::bus::{Envelope, Inbox};
use crate::protocol::{Request, Response, UserDataReply};
use crate::source::ProfileSource;

/// The background context: owns the data source, keeps the cache fresh and
/// answers `getUserData`.
#[derive(Clone)]
pub struct Background {
    source: Arc<ProfileSource>,
    store: SharedStore,
}

impl Background {
    pub fn new(source: ProfileSource, store: SharedStore) -> Self {
        Self {
            source: Arc::new(source),
            store,
        }
    }

    /// Install hook: pull the profile into the cache right away
    pub async fn on_installed(&self) -> Option<Profile> {
        tracing::info!(url = %self.source.url(), "installed, fetching user data");
        self.source.refresh(&self.store).await
    }

    /// Refresh the cache every `period`, starting one period from now.
    ///
    /// Each tick runs on its own task, so a fetch slower than the period
    /// overlaps with the next one rather than delaying it.
    pub fn spawn_refresh_timer(&self, period: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!("periodic refresh");
                let source = Arc::clone(&this.source);
                let store = this.store.clone();
                tokio::spawn(async move {
                    source.refresh(&store).await;
                });
            }
        })
    }

    /// Serve the runtime inbox until every sender is gone
    pub fn spawn(self, mut inbox: Inbox) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                self.handle(envelope);
            }
            tracing::debug!("background context stopped");
        })
    }

    fn handle(&self, envelope: Envelope) {
        let request = match envelope.request() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, payload = %envelope.payload(), "dropping malformed message");
                return;
            }
        };

        match request {
            Request::GetUserData => {
                // Answered once the fetch completes; other messages keep flowing.
                let source = Arc::clone(&self.source);
                tokio::spawn(async move {
                    let user_data = source.fetch_profile().await;
                    envelope.respond(&Response::UserData(UserDataReply { user_data }));
                });
            }
            other => {
                tracing::debug!(action = other.action(), "not a background message, ignoring");
            }
        }
    }
}
