//! Outbound HTTP caller
//!
//! A thin wrapper over `reqwest` that resolves relative paths against a base
//! URI, applies a default content type and a fixed timeout, and reports
//! status, body, headers and elapsed milliseconds. One attempt per call.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use thiserror::Error;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HttpRequest {
    /// Absolute URL, or a path resolved against the client's base URI.
    pub url: String,
    pub method: HttpMethod,
    /// Overrides the client's default content type when set.
    pub content_type: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { url: url.into(), method, ..Default::default() }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
    /// Milliseconds between the request start and the full body being read.
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug)]
pub struct HttpClientOptions {
    pub base_uri: String,
    pub default_content_type: String,
    pub timeout: Duration,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            base_uri: String::new(),
            default_content_type: DEFAULT_CONTENT_TYPE.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_uri: String,
    content_type: String,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(opts: HttpClientOptions) -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder().timeout(opts.timeout).build()?;
        Ok(Self {
            inner,
            base_uri: opts.base_uri,
            content_type: opts.default_content_type,
            timeout: opts.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request`, timing it from now.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.send_from(request, Instant::now()).await
    }

    /// Send `request`, timing it from `started_at` (e.g. when the inbound call arrived).
    pub async fn send_from(&self, request: HttpRequest, started_at: Instant) -> Result<HttpResponse, HttpError> {
        let url = self.resolve_uri(&request.url);
        let content_type = request.content_type.as_deref().unwrap_or(&self.content_type);
        let headers = build_headers(content_type, &request.headers)?;

        tracing::debug!(method = %request.method, %url, "sending http request");
        let resp = self
            .inner
            .request(request.method.into(), &url)
            .headers(headers)
            .body(request.body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let headers = flatten_headers(resp.headers());
        let body = resp.text().await?;

        Ok(HttpResponse {
            status,
            body,
            headers,
            elapsed_ms: started_at.elapsed().as_millis() as u64,
        })
    }

    /// Absolute URLs pass through; anything else is appended to the base URI.
    pub fn resolve_uri(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!("{}{}", self.base_uri, url)
    }
}

fn build_headers(content_type: &str, extra: &HashMap<String, String>) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    if !content_type.is_empty() {
        let value = HeaderValue::from_str(content_type).map_err(|e| HttpError::InvalidHeader {
            name: CONTENT_TYPE.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(CONTENT_TYPE, value);
    }
    for (key, value) in extra {
        let invalid = |reason: String| HttpError::InvalidHeader { name: key.clone(), reason };
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Collapse a header map to single values; repeated headers are joined with `, `.
fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert(value);
    }
    out
}
