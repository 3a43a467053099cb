use jobfill_engine::FormDocument;
use jobfill_vault::SharedStore;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::background::Background;
use crate::bus::MessageBus;
use crate::config::AgentConfig;
use crate::content::{ContentOutcome, ContentScript};
use crate::popup::Popup;
use crate::source::ProfileSource;
use crate::Result;

/// Lifecycle hooks to run when the extension comes up
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    /// Run the install hook (immediate fetch into the cache) before returning
    pub install: bool,
    /// Start the periodic refresh with this period
    pub refresh_every: Option<Duration>,
}

/// The three contexts wired together over one message bus
pub struct Extension {
    bus: MessageBus,
    background: Background,
    background_task: JoinHandle<()>,
    content_task: JoinHandle<ContentOutcome>,
    refresh_task: Option<JoinHandle<()>>,
}

impl Extension {
    pub async fn launch(
        config: &AgentConfig,
        store: SharedStore,
        document: FormDocument,
        options: LaunchOptions,
    ) -> Result<Self> {
        let source = ProfileSource::new(config)?;
        let (bus, inboxes) = MessageBus::new();

        let background = Background::new(source, store.clone());
        let background_task = background.clone().spawn(inboxes.runtime);
        let content_task = ContentScript::new(document, store).spawn(inboxes.tab);

        if options.install {
            background.on_installed().await;
        }

        let refresh_task = options
            .refresh_every
            .map(|period| background.spawn_refresh_timer(period));

        Ok(Self {
            bus,
            background,
            background_task,
            content_task,
            refresh_task,
        })
    }

    pub fn popup(&self) -> Popup<'_> {
        Popup::new(&self.bus)
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Stop every context and return the page as the content context left it
    pub async fn shutdown(self) -> Result<ContentOutcome> {
        if let Some(task) = self.refresh_task {
            task.abort();
        }
        drop(self.bus);
        self.background_task.await?;
        Ok(self.content_task.await?)
    }
}
