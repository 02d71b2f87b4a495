use std::future::Future;
use std::time::Duration;

use log::trace;
use mime::Mime;
use reqwest::{header, Client, Method, StatusCode, Url};
use serde_json::Value;

use crate::error::{ApiError, Result};

/// A fully described outgoing call. The client builds these, a [`Transport`]
/// puts them on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: header::HeaderMap,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: header::HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// URL the response came from, used to resolve relative redirects.
    pub url: String,
    pub headers: header::HeaderMap,
    /// Reason phrase from the status line, only when it differs from the
    /// canonical one.
    pub reason: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: header::HeaderMap::new(),
            reason: None,
            body: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = header::HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_json(self, body: &Value) -> Self {
        let mut resp = self.with_header(header::CONTENT_TYPE, "application/json");
        resp.body = body.to_string().into_bytes();
        resp
    }

    pub fn with_bytes(self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut resp = self.with_header(header::CONTENT_TYPE, content_type);
        resp.body = body.into();
        resp
    }

    pub fn content_type(&self) -> Option<Mime> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Target of a redirect, made absolute against the URL of this response.
    pub fn location(&self) -> Result<String> {
        let location = self
            .headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingLocation)?;

        if location.starts_with("http://") || location.starts_with("https://") {
            return Ok(location.to_string());
        }

        let base = Url::parse(&self.url).map_err(|e| ApiError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        base.join(location)
            .map(String::from)
            .map_err(|e| ApiError::InvalidUrl {
                url: location.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Sends a single request and hands back whatever the server answered.
///
/// Implementations must not follow redirects or interpret the status code;
/// the client does both.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    let user_agent = format!("kontist/{}", env!("CARGO_PKG_VERSION"));
    if let Ok(value) = header::HeaderValue::from_str(&user_agent) {
        headers.insert(header::USER_AGENT, value);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// [`Transport`] backed by a reqwest client with redirects switched off.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self::new(build_client(timeout)?))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        trace!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body.to_string());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let url = resp.url().to_string();
        let headers = resp.headers().clone();
        // hyper only records the phrase when it is not the canonical one
        let reason = resp
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned());
        let body = resp.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            url,
            headers,
            reason,
            body,
        })
    }
}


// ============================================================================
// Tests
// ============================================================================
