//! In-process stand-in for extension messaging.
//!
//! Contexts share no memory: requests and replies cross as JSON values, each
//! request carrying a one-shot reply slot. Dropping the slot without
//! answering leaves the sender with [`BusError::NoResponse`].

use jobfill_vault::Profile;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusError;
use crate::protocol::{Request, Response};

/// A request in flight, as seen by the receiving context
#[derive(Debug)]
pub struct Envelope {
    payload: Value,
    reply: oneshot::Sender<Option<Value>>,
}

impl Envelope {
    /// Decode the request carried by this envelope
    pub fn request(&self) -> Result<Request, BusError> {
        Request::from_wire(self.payload.clone())
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Answer the sender. The sender may have stopped waiting; that is not
    /// an error for the responder.
    pub fn respond(self, response: &Response) {
        match response.to_wire() {
            Ok(payload) => {
                let _ = self.reply.send(payload);
            }
            Err(e) => tracing::error!(error = %e, "failed to encode reply"),
        }
    }
}

/// Sending side of one context's inbox
#[derive(Debug, Clone)]
pub struct Port {
    context: &'static str,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Port {
    /// Post a request and wait for the raw reply payload
    pub async fn send(&self, request: &Request) -> Result<Option<Value>, BusError> {
        let (reply, answer) = oneshot::channel();
        let envelope = Envelope {
            payload: request.to_wire()?,
            reply,
        };

        self.tx
            .send(envelope)
            .map_err(|_| BusError::Disconnected(self.context))?;

        answer
            .await
            .map_err(|_| BusError::NoResponse(self.context, request.action()))
    }

    /// Post a request and decode the typed reply
    pub async fn call(&self, request: &Request) -> Result<Response, BusError> {
        let payload = self.send(request).await?;
        Response::from_wire(request, payload)
    }
}

pub type Inbox = mpsc::UnboundedReceiver<Envelope>;

/// The two destinations a sender can address
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// Extension runtime, answered by the background context
    pub runtime: Port,
    /// The active tab, answered by its content context
    pub tab: Port,
}

/// Receiving ends handed to the contexts
#[derive(Debug)]
pub struct Inboxes {
    pub runtime: Inbox,
    pub tab: Inbox,
}

impl MessageBus {
    pub fn new() -> (Self, Inboxes) {
        let (runtime_tx, runtime_rx) = mpsc::unbounded_channel();
        let (tab_tx, tab_rx) = mpsc::unbounded_channel();

        let bus = Self {
            runtime: Port {
                context: "background",
                tx: runtime_tx,
            },
            tab: Port {
                context: "content",
                tx: tab_tx,
            },
        };
        let inboxes = Inboxes {
            runtime: runtime_rx,
            tab: tab_rx,
        };
        (bus, inboxes)
    }

    /// `getUserData` round trip
    pub async fn get_user_data(&self) -> Result<Option<Profile>, BusError> {
        match self.runtime.call(&Request::GetUserData).await? {
            Response::UserData(reply) => Ok(reply.user_data),
            other => Err(unexpected(&other)),
        }
    }

    /// `autoFill` round trip; `true` when the page reports success
    pub async fn auto_fill(&self, profile: Profile) -> Result<bool, BusError> {
        let request = Request::AutoFill { user_data: profile };
        match self.tab.call(&request).await? {
            Response::AutoFill(reply) => Ok(reply.success),
            other => Err(unexpected(&other)),
        }
    }

    /// `fillForm` round trip
    pub async fn fill_form(&self) -> Result<(), BusError> {
        self.tab.call(&Request::FillForm).await.map(|_| ())
    }
}

fn unexpected(response: &Response) -> BusError {
    BusError::Protocol(format!("unexpected reply {:?}", response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AutoFillReply, UserDataReply};
    use jobfill_vault::ProfileField;

    #[tokio::test]
    async fn test_round_trip_through_inbox() {
        let (bus, mut inboxes) = MessageBus::new();

        let responder = tokio::spawn(async move {
            let envelope = inboxes.runtime.recv().await.unwrap();
            assert_eq!(envelope.request().unwrap(), Request::GetUserData);
            let profile = Profile::new().with(ProfileField::Name, "Ana");
            envelope.respond(&Response::UserData(UserDataReply {
                user_data: Some(profile),
            }));
        });

        let profile = bus.get_user_data().await.unwrap().unwrap();
        assert_eq!(profile.get(ProfileField::Name), Some("Ana"));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_reply_slot_is_no_response() {
        let (bus, mut inboxes) = MessageBus::new();

        tokio::spawn(async move {
            let envelope = inboxes.tab.recv().await.unwrap();
            drop(envelope);
        });

        let err = bus.fill_form().await.unwrap_err();
        assert!(matches!(err, BusError::NoResponse("content", "fillForm")));
    }

    #[tokio::test]
    async fn test_closed_inbox_is_disconnected() {
        let (bus, inboxes) = MessageBus::new();
        drop(inboxes);

        let err = bus.get_user_data().await.unwrap_err();
        assert!(matches!(err, BusError::Disconnected("background")));
    }

    #[tokio::test]
    async fn test_auto_fill_reports_success_flag() {
        let (bus, mut inboxes) = MessageBus::new();

        tokio::spawn(async move {
            let envelope = inboxes.tab.recv().await.unwrap();
            envelope.respond(&Response::AutoFill(AutoFillReply { success: true }));
        });

        assert!(bus.auto_fill(Profile::new()).await.unwrap());
    }
}
