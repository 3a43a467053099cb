use jobfill_vault::Profile;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::{AgentError, Result};

pub const DEFAULT_USER: &str = "default";

// ============================================================================
// Profile Directory
// ============================================================================

/// Profiles the service can hand out, keyed by user id.
/// Requests without a `user_id` get the `default` entry.
#[derive(Debug, Clone, Default)]
pub struct ProfileDirectory {
    users: HashMap<String, Profile>,
}

impl ProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>, profile: Profile) -> Self {
        self.users.insert(user_id.into(), profile);
        self
    }

    /// Load `{"<user id>": {profile}, "default": {profile}}` from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let map: Map<String, Value> = serde_json::from_str(&text)?;

        let mut directory = Self::new();
        for (user_id, value) in map {
            let profile = Profile::from_value(value)?;
            directory.users.insert(user_id, profile);
        }
        Ok(directory)
    }

    pub fn lookup(&self, user_id: Option<&str>) -> Option<&Profile> {
        self.users.get(user_id.unwrap_or(DEFAULT_USER))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// ============================================================================
// HTTP Service
// ============================================================================

/// Local profile service: `GET /api/user_data[?user_id=<id>]`
pub struct ProfileService {
    server: Arc<Server>,
    directory: Arc<ProfileDirectory>,
}

/// A service running on its own thread
pub struct ServiceHandle {
    server: Arc<Server>,
    thread: thread::JoinHandle<()>,
    addr: Option<SocketAddr>,
}

impl ServiceHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Stop accepting requests and wait for the thread to exit
    pub fn shutdown(self) {
        self.server.unblock();
        if self.thread.join().is_err() {
            tracing::error!("profile service thread panicked");
        }
    }
}

impl ProfileService {
    pub fn bind(addr: &str, directory: ProfileDirectory) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| AgentError::Service(format!("Failed to start server on {}: {}", addr, e)))?;

        Ok(Self {
            server: Arc::new(server),
            directory: Arc::new(directory),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve on a background thread
    pub fn spawn(self) -> ServiceHandle {
        let server = Arc::clone(&self.server);
        let addr = self.local_addr();
        let thread = thread::spawn(move || self.run());
        ServiceHandle {
            server,
            thread,
            addr,
        }
    }

    /// Serve on the current thread until the server is unblocked
    pub fn run(self) {
        match self.local_addr() {
            Some(addr) => tracing::info!(%addr, users = self.directory.len(), "profile service listening"),
            None => tracing::info!(users = self.directory.len(), "profile service listening"),
        }

        for request in self.server.incoming_requests() {
            let method = request.method().clone();
            let url = request.url().to_string();
            let response = route(&self.directory, &method, &url);

            tracing::debug!(%method, %url, status = response.status_code().0, "request");
            respond(request, response);
        }

        tracing::debug!("profile service stopped");
    }
}

fn respond(request: Request, mut response: Response<Cursor<Vec<u8>>>) {
    // CORS headers for extension requests
    for (name, value) in [
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ] {
        if let Some(header) = header(name, value) {
            response.add_header(header);
        }
    }

    if let Err(e) = request.respond(response) {
        tracing::warn!(error = %e, "failed to send response");
    }
}

fn route(directory: &ProfileDirectory, method: &Method, url: &str) -> Response<Cursor<Vec<u8>>> {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    match (method, path) {
        // CORS preflight
        (Method::Options, _) => Response::from_string("").with_status_code(204),

        (Method::Get, "/health") => Response::from_string("OK"),

        (Method::Get, "/api/user_data") => {
            let user_id = query_param(query, "user_id");
            match directory.lookup(user_id.as_deref()) {
                Some(profile) => match serde_json::to_string(profile) {
                    Ok(body) => json_response(body, 200),
                    Err(e) => error_response(&e.to_string(), 500),
                },
                None => {
                    tracing::info!(user_id = ?user_id, "unknown user");
                    error_response("user not found", 404)
                }
            }
        }

        _ => Response::from_string("Not Found").with_status_code(404),
    }
}

fn json_response(body: String, status: u16) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(status);
    if let Some(header) = header("Content-Type", "application/json") {
        response.add_header(header);
    }
    response
}

fn error_response(message: &str, status: u16) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    json_response(body, status)
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| {
            let v = v.replace('+', " ");
            urlencoding::decode(&v).ok().map(|decoded| decoded.into_owned())
        })
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobfill_vault::ProfileField;
    use std::io::Read;

    fn directory() -> ProfileDirectory {
        ProfileDirectory::new()
            .with_user(DEFAULT_USER, Profile::new().with(ProfileField::Name, "Default"))
            .with_user("ana silva", Profile::new().with(ProfileField::Name, "Ana"))
    }

    fn body(response: Response<Cursor<Vec<u8>>>) -> String {
        let mut text = String::new();
        response.into_reader().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_query_param_decoding() {
        assert_eq!(query_param("user_id=ana%20silva", "user_id"), Some("ana silva".to_string()));
        assert_eq!(query_param("a=1&user_id=ana+silva", "user_id"), Some("ana silva".to_string()));
        assert_eq!(query_param("user_id=", "user_id"), None);
        assert_eq!(query_param("", "user_id"), None);
    }

    #[test]
    fn test_default_user_when_no_id() {
        let response = route(&directory(), &Method::Get, "/api/user_data");
        assert_eq!(response.status_code().0, 200);
        assert_eq!(body(response), r#"{"name":"Default"}"#);
    }

    #[test]
    fn test_lookup_by_user_id() {
        let response = route(&directory(), &Method::Get, "/api/user_data?user_id=ana%20silva");
        assert_eq!(body(response), r#"{"name":"Ana"}"#);
    }

    #[test]
    fn test_unknown_user_is_404_with_error_body() {
        let response = route(&directory(), &Method::Get, "/api/user_data?user_id=nobody");
        assert_eq!(response.status_code().0, 404);
        assert_eq!(body(response), r#"{"error":"user not found"}"#);
    }

    #[test]
    fn test_health_preflight_and_unknown_routes() {
        let dir = directory();
        assert_eq!(body(route(&dir, &Method::Get, "/health")), "OK");
        assert_eq!(route(&dir, &Method::Options, "/api/user_data").status_code().0, 204);
        assert_eq!(route(&dir, &Method::Post, "/api/user_data").status_code().0, 404);
    }

    #[test]
    fn test_load_directory_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"{"default": {"email": "a@x.com"}, "42": {"city": "Porto", "zip": 4000}}"#,
        )
        .unwrap();

        let directory = ProfileDirectory::load(&path).unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.lookup(Some("42")).and_then(|p| p.get(ProfileField::Zip)),
            Some("4000")
        );
    }
}
