//! Scripted transport used by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::client::Client;
use crate::error::ClientError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

pub const SITE: &str = "https://sentry.example.com";
pub const API: &str = "https://sentry.example.com/api/0/";

enum Reply {
    Response(ApiResponse),
    ConnectionRefused,
}

#[derive(Default)]
pub struct MockTransport {
    routes: RefCell<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `method` on `path` (relative to the API root,
    /// or absolute). Responses for the same route are served in order.
    pub fn on(&self, method: Method, path: &str, response: ApiResponse) -> &Self {
        self.push(method, path, Reply::Response(response));
        self
    }

    pub fn fail(&self, method: Method, path: &str) -> &Self {
        self.push(method, path, Reply::ConnectionRefused);
        self
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.routes
            .borrow_mut()
            .entry((method, absolute(path)))
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        let url = absolute(path);
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .cloned()
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.requests.borrow_mut().push(request.clone());
        let reply = self
            .routes
            .borrow_mut()
            .get_mut(&(request.method, request.url.clone()))
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::ConnectionRefused) => Err(ClientError::Transport {
                url: request.url,
                source: "connection refused".into(),
            }),
            None => Ok(status(404)),
        }
    }
}

fn absolute(path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{}{}", API, path)
    }
}

pub fn client(mock: &MockTransport) -> Client<&MockTransport> {
    Client::new(mock, SITE).unwrap()
}

pub fn page(items: Value) -> ApiResponse {
    ApiResponse {
        status: 200,
        body: items.to_string(),
        ..ApiResponse::default()
    }
}

pub fn page_with_next(items: Value, next: &str) -> ApiResponse {
    ApiResponse {
        link: Some(format!(
            "<{}>; rel=\"next\"; results=\"true\"; cursor=\"100:1:0\"",
            absolute(next)
        )),
        ..page(items)
    }
}

pub fn status(code: u16) -> ApiResponse {
    ApiResponse {
        status: code,
        ..ApiResponse::default()
    }
}

pub fn status_with_csrf(code: u16, token: &str) -> ApiResponse {
    ApiResponse {
        status: code,
        cookies: vec![
            ("sc".to_string(), token.to_string()),
            ("sentrysid".to_string(), "session".to_string()),
        ],
        ..ApiResponse::default()
    }
}

/// Serves organization `acme` with one project per entry, each listing its
/// issues on a single page.
pub fn projects(mock: &MockTransport, projects: &[(&str, Value)]) {
    let slugs: Vec<Value> = projects
        .iter()
        .map(|(slug, _)| serde_json::json!({ "slug": slug }))
        .collect();
    mock.on(Method::Get, "organizations/", page(serde_json::json!([{"slug": "acme"}])))
        .on(Method::Get, "organizations/acme/projects/", page(Value::Array(slugs)));
    for (slug, issues) in projects {
        mock.on(
            Method::Get,
            &format!("projects/acme/{}/issues/", slug),
            page(issues.clone()),
        );
    }
}

/// RFC 3339 timestamp `days` in the past.
pub fn days_ago(days: i64) -> String {
    (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339()
}

/// Turns coloring off; call before anything renders.
pub fn plain() {
    colored::control::set_override(false);
}

pub fn rendered(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}
