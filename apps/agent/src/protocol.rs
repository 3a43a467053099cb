//! Message contract between the popup, background and content contexts.
//!
//! Requests travel as `{"action": <tag>, ...payload}` objects. Each tag has
//! its own reply shape; `fillForm` replies without a payload.

use jobfill_vault::Profile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BusError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Ask the background context to fetch the profile
    GetUserData,
    /// Ask the content context to fill the page with this profile
    AutoFill {
        #[serde(rename = "userData")]
        user_data: Profile,
    },
    /// Ask the content context to fill the page from the cached profile
    FillForm,
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::GetUserData => "getUserData",
            Request::AutoFill { .. } => "autoFill",
            Request::FillForm => "fillForm",
        }
    }

    pub fn to_wire(&self) -> Result<Value, BusError> {
        serde_json::to_value(self).map_err(|e| BusError::Protocol(e.to_string()))
    }

    pub fn from_wire(value: Value) -> Result<Self, BusError> {
        serde_json::from_value(value).map_err(|e| BusError::Protocol(e.to_string()))
    }
}

/// Reply to `getUserData`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDataReply {
    #[serde(rename = "userData")]
    pub user_data: Option<Profile>,
}

/// Reply to `autoFill`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFillReply {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    UserData(UserDataReply),
    AutoFill(AutoFillReply),
    /// Acknowledges `fillForm`; carries nothing
    FillForm,
}

impl Response {
    /// Wire payload; `None` for replies that carry nothing
    pub fn to_wire(&self) -> Result<Option<Value>, BusError> {
        let encoded = match self {
            Response::UserData(reply) => serde_json::to_value(reply),
            Response::AutoFill(reply) => serde_json::to_value(reply),
            Response::FillForm => return Ok(None),
        };
        encoded
            .map(Some)
            .map_err(|e| BusError::Protocol(e.to_string()))
    }

    /// Decode the reply to `request` from its wire payload
    pub fn from_wire(request: &Request, payload: Option<Value>) -> Result<Self, BusError> {
        let decode_err = |e: serde_json::Error| {
            BusError::Protocol(format!("bad {} reply: {}", request.action(), e))
        };
        let missing = || BusError::Protocol(format!("{} reply has no payload", request.action()));

        match request {
            Request::GetUserData => {
                let payload = payload.ok_or_else(missing)?;
                serde_json::from_value(payload)
                    .map(Response::UserData)
                    .map_err(decode_err)
            }
            Request::AutoFill { .. } => {
                let payload = payload.ok_or_else(missing)?;
                serde_json::from_value(payload)
                    .map(Response::AutoFill)
                    .map_err(decode_err)
            }
            Request::FillForm => Ok(Response::FillForm),
        }
    }
}
