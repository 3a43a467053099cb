use jobfill_engine::{fill_form, fill_from_storage, FillReport, FormDocument};
use jobfill_vault::SharedStore;
use tokio::task::JoinHandle;

use crate::bus::{Envelope, Inbox};
use crate::protocol::{AutoFillReply, Request, Response};

/// What the content context leaves behind when it stops
#[derive(Debug)]
pub struct ContentOutcome {
    pub document: FormDocument,
    /// One report per fill pass, oldest first
    pub reports: Vec<FillReport>,
}

/// The content context: the only place that touches the page
pub struct ContentScript {
    document: FormDocument,
    store: SharedStore,
    reports: Vec<FillReport>,
}

impl ContentScript {
    pub fn new(document: FormDocument, store: SharedStore) -> Self {
        Self {
            document,
            store,
            reports: Vec::new(),
        }
    }

    /// Serve the tab inbox until every sender is gone, then hand the page back
    pub fn spawn(mut self, mut inbox: Inbox) -> JoinHandle<ContentOutcome> {
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                self.handle(envelope);
            }
            tracing::debug!(passes = self.reports.len(), "content context stopped");
            ContentOutcome {
                document: self.document,
                reports: self.reports,
            }
        })
    }

    fn handle(&mut self, envelope: Envelope) {
        let request = match envelope.request() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, payload = %envelope.payload(), "dropping malformed message");
                return;
            }
        };

        match request {
            Request::AutoFill { user_data } => {
                let result = fill_form(&user_data, &mut self.document);
                let success = self.record(result);
                envelope.respond(&Response::AutoFill(AutoFillReply { success }));
            }
            Request::FillForm => {
                let result = fill_from_storage(&self.store, &mut self.document);
                self.record(result);
                envelope.respond(&Response::FillForm);
            }
            Request::GetUserData => {
                tracing::debug!("getUserData is for the background context, ignoring");
            }
        }
    }

    fn record(&mut self, result: jobfill_engine::Result<FillReport>) -> bool {
        match result {
            Ok(report) => {
                tracing::info!(filled = report.filled_count(), "form filled");
                self.reports.push(report);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "fill pass failed");
                false
            }
        }
    }
}
