use thiserror::Error;

/// Why a profile fetch produced nothing
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Profile service returned {status}{}", detail(.message))]
    Status { status: u16, message: Option<String> },

    #[error("Malformed profile: {0}")]
    Parse(String),

    #[error("Profile service reported: {0}")]
    Service(String),
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// Failures crossing between contexts
#[derive(Error, Debug)]
pub enum BusError {
    #[error("{0} context is not running")]
    Disconnected(&'static str),

    #[error("{0} context did not answer {1}")]
    NoResponse(&'static str, &'static str),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Vault(#[from] jobfill_vault::VaultError),

    #[error(transparent)]
    Engine(#[from] jobfill_engine::EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile service error: {0}")]
    Service(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
