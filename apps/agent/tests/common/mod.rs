#![allow(dead_code)]

use jobfill_agent::service::{ProfileDirectory, ProfileService, ServiceHandle, DEFAULT_USER};
use jobfill_agent::AgentConfig;
use jobfill_vault::{Profile, ProfileField};
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tiny_http::{Response, Server};

/// Endpoint that answers every request with the same canned response
pub struct StubEndpoint {
    server: Arc<Server>,
    thread: Option<thread::JoinHandle<()>>,
    pub url: String,
}

impl StubEndpoint {
    pub fn respond_with(status: u16, body: &'static str) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();

        let serving = Arc::clone(&server);
        let thread = thread::spawn(move || {
            for request in serving.incoming_requests() {
                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });

        Self {
            server,
            thread: Some(thread),
            url: format!("http://{}/api/user_data", addr),
        }
    }
}

impl Drop for StubEndpoint {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn ana() -> Profile {
    Profile::new()
        .with(ProfileField::Name, "Ana")
        .with(ProfileField::Email, "a@x.com")
}

/// Profile service with `ana()` as the default user and a second user "42"
pub fn profile_service() -> (ServiceHandle, String) {
    let directory = ProfileDirectory::new()
        .with_user(DEFAULT_USER, ana())
        .with_user(
            "42",
            Profile::new()
                .with(ProfileField::Name, "Bea")
                .with(ProfileField::City, "Porto"),
        );
    let handle = ProfileService::bind("127.0.0.1:0", directory)
        .unwrap()
        .spawn();
    let url = format!("http://{}/api/user_data", handle.local_addr().unwrap());
    (handle, url)
}

/// URL on a port nothing listens on
pub fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/user_data", addr)
}

pub fn config(endpoint: &str, cache_dir: &Path) -> AgentConfig {
    let mut config = AgentConfig::new(cache_dir.join("profile.json"));
    config.endpoint = endpoint.to_string();
    config
}
