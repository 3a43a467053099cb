/*!
 * jobfill agent - fetches the user's profile and fills job application forms
 *
 * Models a browser extension's three isolated contexts as tasks that only
 * talk over a message bus: a background context that fetches and caches the
 * profile, a content context that owns the page, and a popup with a single
 * auto-fill button.
 */

pub mod background;
pub mod bus;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod extension;
pub mod popup;
pub mod protocol;
pub mod service;
pub mod source;

pub use config::AgentConfig;
pub use error::{AgentError, BusError, Result, SourceError};
pub use extension::{Extension, LaunchOptions};
