use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE, LINK};
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        ApiRequest {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn query(mut self, query: &[(String, String)]) -> Self {
        self.query.extend_from_slice(query);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn cookies(mut self, cookies: &[(String, String)]) -> Self {
        self.cookies.extend_from_slice(cookies);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub link: Option<String>,
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// URL of the next page, when the server says there is one.
    pub fn next_page(&self) -> Option<String> {
        self.link.as_deref().and_then(next_page_url)
    }
}

/// Sends one request and hands back the raw response.
///
/// Non-success statuses are not errors at this level: the client decides
/// whether a 401 deserves a second attempt.
pub trait Transport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        (**self).send(request)
    }
}

pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(token: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut authorization =
            HeaderValue::from_str(&format!("Basic {}", token)).map_err(|_| ClientError::InvalidToken)?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("curtis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Setup)?;

        Ok(HttpTransport { http })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        debug!(method = ?request.method, url = %request.url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Put => self.http.put(&request.url),
            Method::Delete => self.http.delete(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.cookies.is_empty() {
            builder = builder.header(COOKIE, cookie_header(&request.cookies));
        }
        if let Some(body) = &request.body {
            let typed = request
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
            if !typed {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body.to_string());
        }

        let response = builder.send().map_err(|e| ClientError::Transport {
            url: request.url.clone(),
            source: Box::new(e),
        })?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.text().map_err(|e| ClientError::Transport {
            url: request.url.clone(),
            source: Box::new(e),
        })?;

        debug!(status, url = %request.url, "received response");
        Ok(ApiResponse {
            status,
            link,
            cookies,
            body,
        })
    }
}

fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub url: String,
    pub params: HashMap<String, String>,
}

/// Parses an RFC 8288 style `Link` header:
/// `<url>; rel="next"; results="true"; cursor="0:100:0", <url>; rel="previous"`
pub fn parse_link_header(header: &str) -> Vec<LinkEntry> {
    let mut entries = Vec::new();
    let mut rest = header.trim();

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let url = after[..end].trim().to_string();
        let tail = &after[end + 1..];

        // Parameters run until the next entry's opening bracket.
        let params_end = tail.find('<').unwrap_or(tail.len());
        let mut params = HashMap::new();
        for param in tail[..params_end].split(';') {
            let param = param.trim().trim_end_matches(',').trim();
            if let Some((key, value)) = param.split_once('=') {
                params.insert(
                    key.trim().to_ascii_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                );
            }
        }

        entries.push(LinkEntry { url, params });
        rest = &tail[params_end..];
    }

    entries
}

pub fn next_page_url(header: &str) -> Option<String> {
    parse_link_header(header)
        .into_iter()
        .find(|entry| entry.params.get("rel").map(String::as_str) == Some("next"))
        .filter(|entry| entry.params.get("results").map(String::as_str) == Some("true"))
        .map(|entry| entry.url)
}
