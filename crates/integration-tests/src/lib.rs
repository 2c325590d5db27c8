//! Integration tests for the GymFuel storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gymfuel-integration-tests
//! ```
//!
//! No external services are needed: [`FakeCommerceApi`] serves the commerce
//! REST API on an ephemeral local port with an in-memory cart, a small
//! product catalog and a few coupons.
//!
//! # Test Categories
//!
//! - `api_client` - Envelope handling, read dedup, session refresh
//! - `remote_cart` - Cart store against the API with reconciliation
//! - `coupons` - Remote coupon verification and background persistence
//! - `local_cart` - Cart and wishlist on file storage

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use gymfuel_core::{ProductSnapshot, VariantAttributes};
use gymfuel_storefront::api::CommerceClient;
use gymfuel_storefront::config::ApiConfig;

// ============================================================================
// Catalog
// ============================================================================

/// A purchasable product variant known to the fake API.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub variant_id: &'static str,
    pub product_id: &'static str,
    pub name: &'static str,
    pub price: Decimal,
    pub size: Option<&'static str>,
    pub flavor: Option<&'static str>,
}

impl CatalogEntry {
    /// Product snapshot as a storefront page would build it.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot::new(self.product_id, self.name, self.price).with_variant_id(self.variant_id)
    }

    #[must_use]
    pub fn attributes(&self) -> VariantAttributes {
        VariantAttributes::new(self.size.map(String::from), self.flavor.map(String::from))
    }
}

pub const WHEY_1KG: &str = "v_whey_1kg_mocha";
pub const WHEY_2KG: &str = "v_whey_2kg_mocha";
pub const CREATINE: &str = "v_creatine_250g";
pub const BAND: &str = "v_band";

/// Products sold by the fake API.
#[must_use]
pub fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            variant_id: WHEY_1KG,
            product_id: "whey",
            name: "Whey Protein",
            price: Decimal::from(2499),
            size: Some("1kg"),
            flavor: Some("Mocha"),
        },
        CatalogEntry {
            variant_id: WHEY_2KG,
            product_id: "whey",
            name: "Whey Protein",
            price: Decimal::from(4499),
            size: Some("2kg"),
            flavor: Some("Mocha"),
        },
        CatalogEntry {
            variant_id: CREATINE,
            product_id: "creatine",
            name: "Creatine Monohydrate",
            price: Decimal::new(89_900, 2),
            size: Some("250g"),
            flavor: None,
        },
        CatalogEntry {
            variant_id: BAND,
            product_id: "band",
            name: "Resistance Band",
            price: Decimal::from(100),
            size: None,
            flavor: None,
        },
    ]
}

/// Catalog entry for `variant_id`.
///
/// # Panics
///
/// Panics if the variant is not in the catalog.
#[must_use]
pub fn entry(variant_id: &str) -> CatalogEntry {
    catalog()
        .into_iter()
        .find(|e| e.variant_id == variant_id)
        .unwrap_or_else(|| panic!("unknown variant {variant_id}"))
}

// ============================================================================
// Server state
// ============================================================================

#[derive(Debug, Clone)]
struct ServerLine {
    id: String,
    variant_id: &'static str,
    quantity: u32,
}

#[derive(Debug, Default)]
struct ApiState {
    cart: Mutex<Vec<ServerLine>>,
    next_line: AtomicU64,
    /// `"METHOD /path"` → number of requests.
    hits: Mutex<HashMap<String, usize>>,
    last_query: Mutex<Option<String>>,
    /// When set, requests must carry `accessToken=<token>`.
    session_token: Mutex<Option<String>>,
    refresh_allowed: AtomicBool,
    refreshes: AtomicUsize,
    cart_delay_ms: AtomicU64,
    /// When set, `GET /cart` answers with this status and plain-text body.
    cart_failure: Mutex<Option<(StatusCode, String)>>,
    fail_coupon_apply: AtomicBool,
    applied_coupons: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ApiState {
    fn record(&self, method: &str, path: &str, query: Option<&str>) {
        *lock(&self.hits).entry(format!("{method} {path}")).or_insert(0) += 1;
        *lock(&self.last_query) = query.map(String::from);
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let Some(expected) = lock(&self.session_token).clone() else {
            return Ok(());
        };
        let presented = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == "accessToken" && value == expected);
        if presented {
            Ok(())
        } else {
            Err(failure(StatusCode::UNAUTHORIZED, "Session expired"))
        }
    }

    fn cart_json(&self) -> Value {
        let catalog = catalog();
        let lines = lock(&self.cart).clone();
        let mut subtotal = Decimal::ZERO;
        let items: Vec<Value> = lines
            .iter()
            .filter_map(|line| {
                let entry = catalog.iter().find(|e| e.variant_id == line.variant_id)?;
                let line_total = entry.price * Decimal::from(line.quantity);
                subtotal += line_total;
                Some(json!({
                    "id": line.id,
                    "quantity": line.quantity,
                    "price": entry.price.to_string(),
                    "subtotal": line_total.to_string(),
                    "variant": {
                        "id": entry.variant_id,
                        "size": entry.size,
                        "flavor": entry.flavor,
                    },
                    "product": {
                        "id": entry.product_id,
                        "name": entry.name,
                        "slug": entry.product_id,
                    },
                }))
            })
            .collect();
        json!({
            "items": items,
            "subtotal": subtotal.to_string(),
            "itemCount": lines.len(),
        })
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_variant_id: String,
    quantity: u32,
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    code: String,
    cart_total: String,
}

#[derive(Deserialize)]
struct CodeBody {
    code: String,
}

async fn record_hits(State(api): State<Arc<ApiState>>, request: Request, next: Next) -> Response {
    api.record(
        request.method().as_str(),
        request.uri().path(),
        request.uri().query(),
    );
    next.run(request).await
}

async fn get_cart(State(api): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    // Read as of arrival; writes landing during the delay are not visible.
    let failure = lock(&api.cart_failure).clone();
    let snapshot = api.cart_json();
    let delay = api.cart_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if let Some((status, body)) = failure {
        return (status, body).into_response();
    }
    ok(snapshot)
}

async fn add_to_cart(
    State(api): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    let Some(entry) = catalog()
        .into_iter()
        .find(|e| e.variant_id == body.product_variant_id)
    else {
        return failure(StatusCode::NOT_FOUND, "Product variant not found");
    };
    if body.quantity == 0 {
        return failure(StatusCode::BAD_REQUEST, "Quantity must be at least 1");
    }

    {
        let mut cart = lock(&api.cart);
        if let Some(line) = cart.iter_mut().find(|l| l.variant_id == entry.variant_id) {
            line.quantity += body.quantity;
        } else {
            let n = api.next_line.fetch_add(1, Ordering::SeqCst);
            cart.push(ServerLine {
                id: format!("ci_{n}"),
                variant_id: entry.variant_id,
                quantity: body.quantity,
            });
        }
    }
    ok(api.cart_json())
}

async fn update_item(
    State(api): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<QuantityBody>,
) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    {
        let mut cart = lock(&api.cart);
        let Some(line) = cart.iter_mut().find(|l| l.id == id) else {
            return failure(StatusCode::NOT_FOUND, "Cart item not found");
        };
        line.quantity = body.quantity;
    }
    ok(api.cart_json())
}

async fn remove_item(
    State(api): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    {
        let mut cart = lock(&api.cart);
        let before = cart.len();
        cart.retain(|l| l.id != id);
        if cart.len() == before {
            return failure(StatusCode::NOT_FOUND, "Cart item not found");
        }
    }
    ok(api.cart_json())
}

async fn clear_cart(State(api): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    lock(&api.cart).clear();
    Json(json!({ "success": true, "message": "Cart cleared" })).into_response()
}

async fn verify_coupon(
    State(api): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<VerifyBody>,
) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    let Ok(total) = body.cart_total.parse::<Decimal>() else {
        return failure(StatusCode::BAD_REQUEST, "Invalid cart total");
    };

    let (id, kind, value, minimum) = match body.code.to_uppercase().as_str() {
        "WELCOME10" => ("cp_1", "PERCENTAGE", Decimal::from(10), None),
        "FLAT95" => ("cp_2", "FIXED_AMOUNT", Decimal::from(95), None),
        "BIG500" => ("cp_3", "FIXED_AMOUNT", Decimal::from(500), Some(Decimal::from(2000))),
        "SUMMER23" => return failure(StatusCode::BAD_REQUEST, "Coupon has expired"),
        _ => return failure(StatusCode::BAD_REQUEST, "Invalid coupon code"),
    };
    if minimum.is_some_and(|m| total < m) {
        return failure(StatusCode::BAD_REQUEST, "Minimum cart value not met");
    }

    let discount = if kind == "PERCENTAGE" {
        (total * value / Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        value
    };
    ok(json!({
        "coupon": {
            "id": id,
            "code": body.code.to_uppercase(),
            "discountType": kind,
            "discountValue": value,
            "discountAmount": discount,
            "finalAmount": total - discount,
        }
    }))
}

async fn apply_coupon(
    State(api): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<CodeBody>,
) -> Response {
    if let Err(denied) = api.authorize(&headers) {
        return denied;
    }
    lock(&api.applied_coupons).push(body.code);
    if api.fail_coupon_apply.load(Ordering::SeqCst) {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Could not save coupon");
    }
    Json(json!({ "success": true, "message": "Coupon applied" })).into_response()
}

async fn refresh_token(State(api): State<Arc<ApiState>>) -> Response {
    api.refreshes.fetch_add(1, Ordering::SeqCst);
    if !api.refresh_allowed.load(Ordering::SeqCst) {
        return failure(StatusCode::UNAUTHORIZED, "Refresh token expired");
    }
    let fresh = format!("fresh-{}", api.refreshes.load(Ordering::SeqCst));
    *lock(&api.session_token) = Some(fresh.clone());
    (
        [(SET_COOKIE, format!("accessToken={fresh}; Path=/"))],
        Json(json!({ "success": true, "message": "Token refreshed" })),
    )
        .into_response()
}

// ============================================================================
// FakeCommerceApi
// ============================================================================

/// In-process commerce API for tests.
pub struct FakeCommerceApi {
    state: Arc<ApiState>,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl FakeCommerceApi {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(ApiState::default());

        let app = Router::new()
            .route("/api/cart", get(get_cart))
            .route("/api/cart/add", post(add_to_cart))
            .route("/api/cart/update/{id}", patch(update_item))
            .route("/api/cart/remove/{id}", delete(remove_item))
            .route("/api/cart/clear", delete(clear_cart))
            .route("/api/coupons/verify", post(verify_coupon))
            .route("/api/coupons/apply", post(apply_coupon))
            .route("/api/users/refresh-token", post(refresh_token))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), record_hits))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            state,
            addr,
            server,
        }
    }

    /// Base URL including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration without credentials.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url()).expect("Fake API URL is valid")
    }

    /// Client sending `token` as the `accessToken` cookie.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client_with_token(&self, token: &str) -> CommerceClient {
        let mut config = self.api_config();
        config.access_token = Some(SecretString::from(token.to_string()));
        CommerceClient::new(&config).expect("Failed to build commerce client")
    }

    /// Client without credentials.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> CommerceClient {
        CommerceClient::new(&self.api_config()).expect("Failed to build commerce client")
    }

    // ------------------------------------------------------------------------
    // Server-side manipulation
    // ------------------------------------------------------------------------

    /// Put a line in the server cart directly, as another device would.
    pub fn seed_line(&self, variant_id: &'static str, quantity: u32) {
        let n = self.state.next_line.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.cart).push(ServerLine {
            id: format!("ci_{n}"),
            variant_id,
            quantity,
        });
    }

    /// `(variant_id, quantity)` for every server line.
    #[must_use]
    pub fn server_lines(&self) -> Vec<(&'static str, u32)> {
        lock(&self.state.cart)
            .iter()
            .map(|l| (l.variant_id, l.quantity))
            .collect()
    }

    /// Require `accessToken=<token>` on every request except refresh.
    pub fn require_session(&self, token: &str, refresh_allowed: bool) {
        *lock(&self.state.session_token) = Some(token.to_string());
        self.state
            .refresh_allowed
            .store(refresh_allowed, Ordering::SeqCst);
    }

    #[must_use]
    pub fn refreshes(&self) -> usize {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    /// Delay every `GET /cart` response. The body still reflects the cart
    /// as it was when the request arrived.
    pub fn set_cart_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.cart_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Make `GET /cart` answer with a plain-text error.
    pub fn fail_cart(&self, status: StatusCode, body: &str) {
        *lock(&self.state.cart_failure) = Some((status, body.to_string()));
    }

    pub fn fail_coupon_apply(&self, fail: bool) {
        self.state.fail_coupon_apply.store(fail, Ordering::SeqCst);
    }

    /// Codes received by `POST /coupons/apply`.
    #[must_use]
    pub fn applied_coupons(&self) -> Vec<String> {
        lock(&self.state.applied_coupons).clone()
    }

    /// Number of requests for `"METHOD /path"`.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        lock(&self.state.hits).get(route).copied().unwrap_or(0)
    }

    /// Query string of the most recent request.
    #[must_use]
    pub fn last_query(&self) -> Option<String> {
        lock(&self.state.last_query).clone()
    }
}

impl Drop for FakeCommerceApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}
