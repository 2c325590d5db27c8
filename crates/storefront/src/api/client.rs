//! HTTP client for the commerce API.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{ApiError, Envelope};
use crate::config::ApiConfig;

/// Endpoint used to renew an expired session.
const REFRESH_ENDPOINT: &str = "/users/refresh-token";

/// Endpoint that ends a session. Never triggers a refresh.
const LOGOUT_ENDPOINT: &str = "/users/logout";

/// Cookie carrying the session token.
const ACCESS_TOKEN_COOKIE: &str = "accessToken";

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Cheap to clone; clones share the connection pool, cookie jar and the
/// in-flight request table.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: String,
    /// Results of in-flight GETs, keyed by URL. Entries are removed as soon as
    /// the request resolves; the TTL only bounds stragglers.
    in_flight: Cache<String, Arc<Value>>,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a new client.
    ///
    /// When an access token is configured it is installed as the
    /// `accessToken` cookie for the API origin.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        if let Some(token) = &config.access_token {
            jar.add_cookie_str(
                &format!(
                    "{ACCESS_TOKEN_COOKIE}={}; Path=/",
                    token.expose_secret()
                ),
                &config.base_url,
            );
        }

        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let in_flight = Cache::builder()
            .max_capacity(256)
            .time_to_live(Duration::from_secs(5))
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                in_flight,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Resolve an endpoint against the base URL.
    ///
    /// A base ending in `/api` and an endpoint starting with `/api` share the
    /// prefix once.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        join_endpoint(&self.inner.base_url, endpoint)
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// GET an endpoint.
    ///
    /// Concurrent calls for the same URL share one request and all observe its
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails, the server returns a
    /// non-success status, or the body does not match `T`.
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Envelope<T>, ApiError> {
        let url = self.endpoint_url(endpoint);

        let result = self
            .inner
            .in_flight
            .try_get_with(url.clone(), async {
                debug!(url = %url, "Issuing GET");
                self.perform(Method::GET, &url, None).await.map(Arc::new)
            })
            .await;
        self.inner.in_flight.invalidate(&url).await;

        let body = result.map_err(|e| (*e).clone())?;
        decode(body.as_ref().clone())
    }

    /// GET an endpoint with a request of its own, never joining one already
    /// in flight. Use when the response must reflect writes that completed
    /// before the call.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails, the server returns a
    /// non-success status, or the body does not match `T`.
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn get_fresh<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<Envelope<T>, ApiError> {
        self.send_json(Method::GET, endpoint, None).await
    }

    /// POST a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails, the server returns a
    /// non-success status, or the body does not match `T`.
    #[instrument(skip(self, body), fields(endpoint = %endpoint))]
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<Envelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, endpoint, Some(encode(body)?)).await
    }

    /// PATCH a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails, the server returns a
    /// non-success status, or the body does not match `T`.
    #[instrument(skip(self, body), fields(endpoint = %endpoint))]
    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<Envelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, endpoint, Some(encode(body)?)).await
    }

    /// DELETE an endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails, the server returns a
    /// non-success status, or the body does not match `T`.
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Envelope<T>, ApiError> {
        self.send_json(Method::DELETE, endpoint, None).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Envelope<T>, ApiError> {
        let url = self.endpoint_url(endpoint);
        let response = self.perform(method, &url, body.as_ref()).await?;
        decode(response)
    }

    /// Send a request, refreshing the session once on `401`, and return the
    /// parsed body of a successful response.
    async fn perform(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let busted = with_cache_buster(url, chrono::Utc::now().timestamp_millis());

        let mut response = self.send(method.clone(), &busted, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && !is_session_endpoint(url)
            && self.refresh_session().await
        {
            debug!(url = %url, "Session refreshed, retrying request");
            response = self.send(method, &busted, body).await?;
        }

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let data = parse_body(status, &text);

        if !status.is_success() {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Something went wrong")
                .to_string();
            warn!(
                status = %status,
                message = %message,
                "Commerce API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(data)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header("X-Request-Id", Uuid::new_v4().to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            error!(error = %e, "Commerce API request failed");
            ApiError::Request(e.to_string())
        })
    }

    /// Ask the server to renew the session cookie. Returns whether it did.
    async fn refresh_session(&self) -> bool {
        let url = self.endpoint_url(REFRESH_ENDPOINT);
        match self.inner.client.post(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(status = %response.status(), "Session refresh rejected");
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh session");
                false
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn join_endpoint(base: &str, endpoint: &str) -> String {
    let endpoint = if base.ends_with("/api") {
        endpoint.strip_prefix("/api").unwrap_or(endpoint)
    } else {
        endpoint
    };
    if endpoint.starts_with('/') {
        format!("{base}{endpoint}")
    } else {
        format!("{base}/{endpoint}")
    }
}

/// Append a `_t` timestamp so intermediaries never serve a cached response.
fn with_cache_buster(url: &str, millis: i64) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair("_t", &millis.to_string());
            parsed.into()
        }
        Err(_) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}_t={millis}")
        }
    }
}

fn is_session_endpoint(url: &str) -> bool {
    url.contains(REFRESH_ENDPOINT) || url.contains(LOGOUT_ENDPOINT)
}

/// Parse a body as JSON whatever the content type claims; fall back to a
/// minimal envelope carrying the raw text.
fn parse_body(status: StatusCode, text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| {
        let message = if !text.is_empty() {
            text.to_string()
        } else if status.is_success() {
            "Success".to_string()
        } else {
            "Request failed".to_string()
        };
        json!({ "success": status.is_success(), "message": message })
    })
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<Envelope<T>, ApiError> {
    serde_json::from_value(body).map_err(|e| {
        error!(error = %e, "Failed to parse commerce API response");
        ApiError::Decode(e.to_string())
    })
}
