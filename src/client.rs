use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{self, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::{bearer_header, mask_token};
use crate::error::{ApiError, Result};
use crate::models::{
    ConfirmStandingOrderBody, ConfirmTransferBody, LoginBody, StandingOrderBody,
    StandingOrderDraft, TransferDraft,
};
use crate::pagination::{target_count, Dedup, Page};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

pub const BASE_URL: &str = "https://api.kontist.com";
pub const ACCEPT: &str = "application/vnd.kontist.transactionlist.v2.1+json";
pub const AUTH_PATH: &str = "/api/user/auth-token";

/// Redirects followed before giving up. One hop is the normal case
/// (statement downloads from object storage).
pub const MAX_REDIRECT_HOPS: usize = 3;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A resolved response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary {
        content_type: String,
        /// Raw `Content-Disposition` header, if the server sent one.
        disposition: Option<String>,
        bytes: Vec<u8>,
    },
}

fn is_json(mime: &mime::Mime) -> bool {
    mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON)
}

impl Payload {
    fn from_response(resp: HttpResponse) -> Result<Self> {
        let content_type = resp.content_type();
        let blank = resp.body.iter().all(u8::is_ascii_whitespace);

        match content_type {
            Some(ref m) if is_json(m) => {
                if blank {
                    return Ok(Payload::Json(Value::Null));
                }
                serde_json::from_slice(&resp.body)
                    .map(Payload::Json)
                    .map_err(|source| ApiError::Decode {
                        url: resp.url,
                        source,
                    })
            }
            Some(m) => Ok(Self::binary(m.to_string(), resp)),
            None if blank => Ok(Payload::Json(Value::Null)),
            None => match serde_json::from_slice(&resp.body) {
                Ok(value) => Ok(Payload::Json(value)),
                Err(_) => Ok(Self::binary(
                    mime::APPLICATION_OCTET_STREAM.to_string(),
                    resp,
                )),
            },
        }
    }

    fn binary(content_type: String, resp: HttpResponse) -> Self {
        let disposition = resp
            .headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Payload::Binary {
            content_type,
            disposition,
            bytes: resp.body,
        }
    }

    pub fn into_json(self, url: &str) -> Result<Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Binary { content_type, .. } => Err(ApiError::UnexpectedPayload {
                url: url.to_string(),
                content_type,
            }),
        }
    }
}

/// Client for the Kontist banking API.
///
/// Holds the session token of one login. All calls go through
/// [`KontistClient::request`], which adds the JSON and version headers plus
/// the bearer token, follows object-storage redirects by hand and turns
/// non-2xx responses into [`ApiError::Status`].
#[derive(Debug)]
pub struct KontistClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    token: Option<String>,
}

impl KontistClient<HttpTransport> {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::with_timeout(config.timeout)?;
        Ok(Self::with_transport(transport, &config.base_url))
    }
}

impl<T: Transport> KontistClient<T> {
    pub fn with_transport(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            token: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in and keep the returned bearer token for later calls.
    ///
    /// Any previous token is dropped first, so a failed login leaves the
    /// client logged out.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String> {
        self.token = None;

        let body = encode(&LoginBody { email, password })?;
        let result = match self.request(Method::POST, AUTH_PATH, Some(body)).await {
            Ok(value) => value,
            Err(ApiError::Status { message, .. }) => {
                return Err(ApiError::Authentication { message });
            }
            Err(e) => return Err(e),
        };

        let token = result
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingToken)?
            .to_string();

        debug!("logged in as {} (token {})", email, mask_token(&token));
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Issue a call expecting a JSON answer.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.url_for(path);
        self.request_payload(method, path, body)
            .await?
            .into_json(&url)
    }

    /// Issue a call and return whatever body the final response carried.
    pub async fn request_payload(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Payload> {
        let request = self.build_request(method, path, body);
        debug!("{} {}", request.method, request.url);

        let response = self.transport.send(request).await?;
        self.resolve(response).await
    }

    /// Collect up to `limit` items of a paginated list starting at `start`.
    pub async fn fetch_amount(&self, start: &str, limit: usize) -> Result<Vec<Value>> {
        self.collect_pages(start, limit, None).await
    }

    /// Like [`fetch_amount`](Self::fetch_amount), but drops items whose `id`
    /// already appeared on an earlier page.
    pub async fn fetch_unique(&self, start: &str, limit: usize) -> Result<Vec<Value>> {
        self.collect_pages(start, limit, Some(Dedup::new())).await
    }

    pub async fn get_user(&self) -> Result<Value> {
        self.request(Method::GET, "/api/user", None).await
    }

    pub async fn get_accounts(&self) -> Result<Value> {
        self.request(Method::GET, "/api/accounts", None).await
    }

    /// Id of the first account, used when the caller does not name one.
    pub async fn default_account_id(&self) -> Result<u64> {
        let accounts = self.get_accounts().await?;
        accounts
            .get(0)
            .and_then(|a| a.get("id"))
            .and_then(Value::as_u64)
            .ok_or(ApiError::NoAccount)
    }

    pub async fn get_transactions(&self, account_id: u64, limit: usize) -> Result<Vec<Value>> {
        self.fetch_unique(&format!("/api/accounts/{}/transactions", account_id), limit)
            .await
    }

    pub async fn get_future_transactions(
        &self,
        account_id: u64,
        limit: usize,
    ) -> Result<Vec<Value>> {
        self.fetch_unique(
            &format!("/api/accounts/{}/future-transactions", account_id),
            limit,
        )
        .await
    }

    pub async fn get_transfers(&self, account_id: u64, limit: usize) -> Result<Vec<Value>> {
        self.fetch_unique(&format!("/api/accounts/{}/transfer", account_id), limit)
            .await
    }

    /// Saved recipients whose name or IBAN contains `query` (case-insensitive).
    pub async fn get_wire_transfer_suggestions(&self, query: &str) -> Result<Vec<Value>> {
        let query = query.to_lowercase();
        let suggestions = self
            .request(Method::GET, "/api/wire-transfer-suggestions", None)
            .await?;

        let matches = |field: Option<&Value>| {
            field
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&query))
        };

        Ok(suggestions
            .as_array()
            .map(|list| {
                list.iter()
                    .filter(|s| matches(s.get("name")) || matches(s.get("iban")))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Create a transfer. It stays pending until confirmed with the token
    /// sent by SMS.
    pub async fn initiate_transfer(&self, account_id: u64, transfer: &TransferDraft) -> Result<Value> {
        let body = encode(transfer)?;
        self.request(
            Method::POST,
            &format!("/api/accounts/{}/transfer", account_id),
            Some(body),
        )
        .await
    }

    pub async fn confirm_transfer(
        &self,
        account_id: u64,
        transfer_id: &str,
        authorization_token: &str,
        transfer: &TransferDraft,
    ) -> Result<Value> {
        let body = encode(&ConfirmTransferBody {
            authorization_token,
            transfer,
        })?;
        self.request(
            Method::PUT,
            &format!("/api/accounts/{}/transfer/{}", account_id, transfer_id),
            Some(body),
        )
        .await
    }

    pub async fn get_standing_orders(&self, account_id: u64) -> Result<Value> {
        self.request(
            Method::GET,
            &format!("/api/accounts/{}/standing-orders", account_id),
            None,
        )
        .await
    }

    pub async fn initiate_standing_order(
        &self,
        account_id: u64,
        order: &StandingOrderDraft,
    ) -> Result<Value> {
        let body = encode(&StandingOrderBody::from(order))?;
        self.request(
            Method::POST,
            &format!("/api/accounts/{}/standing-orders", account_id),
            Some(body),
        )
        .await
    }

    /// Confirms a new standing order as well as a cancellation.
    pub async fn confirm_standing_order(
        &self,
        account_id: u64,
        request_id: &str,
        authorization_token: &str,
    ) -> Result<Value> {
        let body = encode(&ConfirmStandingOrderBody {
            authorization_token,
            request_id,
        })?;
        self.request(
            Method::POST,
            &format!("/api/accounts/{}/standing-orders/confirm", account_id),
            Some(body),
        )
        .await
    }

    pub async fn init_cancel_standing_order(
        &self,
        account_id: u64,
        standing_order_id: &str,
    ) -> Result<Value> {
        self.request(
            Method::PATCH,
            &format!(
                "/api/accounts/{}/standing-orders/{}/cancel",
                account_id, standing_order_id
            ),
            Some(json!({})),
        )
        .await
    }

    /// Monthly statement, usually a PDF served through a redirect.
    pub async fn get_statement(&self, year: &str, month: &str) -> Result<Payload> {
        self.request_payload(
            Method::GET,
            &format!("/api/user/statements/{}/{}", year, month),
            None,
        )
        .await
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn build_request(&self, method: Method, path: &str, body: Option<Value>) -> HttpRequest {
        let mut request = HttpRequest::new(method, self.url_for(path))
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .header(header::ACCEPT, HeaderValue::from_static(ACCEPT));

        if let Some(token) = &self.token {
            match bearer_header(token) {
                Some(value) => request = request.header(header::AUTHORIZATION, value),
                None => warn!("session token is not a valid header value, sending without it"),
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    // Redirects are re-issued as bare GETs: object storage rejects requests
    // that carry our Authorization header on top of its signed URL.
    async fn resolve(&self, mut response: HttpResponse) -> Result<Payload> {
        let mut hops = 0;
        while response.status == StatusCode::FOUND {
            if hops == MAX_REDIRECT_HOPS {
                return Err(ApiError::TooManyRedirects(hops));
            }
            let location = response.location()?;
            debug!("redirected to {}", location);
            response = self
                .transport
                .send(HttpRequest::new(Method::GET, location))
                .await?;
            hops += 1;
        }

        if !response.status.is_success() {
            debug!(
                "{} from {}: {}",
                response.status,
                response.url,
                String::from_utf8_lossy(&response.body)
            );
            return Err(ApiError::from_reason(
                response.status,
                response.reason.as_deref(),
            ));
        }

        Payload::from_response(response)
    }

    async fn collect_pages(
        &self,
        start: &str,
        limit: usize,
        mut dedup: Option<Dedup>,
    ) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        let mut wanted = limit;
        let mut next = Some(start.to_string());

        while results.len() < wanted {
            let Some(path) = next.take() else {
                break;
            };

            let value = self.request(Method::GET, &path, None).await?;
            let page: Page = serde_json::from_value(value).map_err(|source| ApiError::Decode {
                url: self.url_for(&path),
                source,
            })?;
            debug!(
                "{}: {} results, total {}",
                path,
                page.results.len(),
                page.total
            );

            wanted = target_count(page.total, limit);
            next = page.next;
            match dedup.as_mut() {
                Some(seen) => results.extend(page.results.into_iter().filter(|i| seen.admit(i))),
                None => results.extend(page.results),
            }
        }

        results.truncate(limit);
        Ok(results)
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(ApiError::Encode)
}

/// Transfer id of an initiate response: the last segment of `links.self`.
pub fn transfer_id_from_links(response: &Value) -> Option<String> {
    response
        .pointer("/links/self")
        .and_then(Value::as_str)
        .and_then(|link| link.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================
