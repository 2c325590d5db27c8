//! Commerce API client against the fake server.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::Value;

use gymfuel_integration_tests::{FakeCommerceApi, WHEY_1KG};
use gymfuel_storefront::api::{ApiError, Envelope, RemoteCart};

#[tokio::test]
async fn test_get_cart_envelope() {
    let api = FakeCommerceApi::start().await;
    api.seed_line(WHEY_1KG, 2);
    let client = api.client();

    let envelope: Envelope<RemoteCart> = client.get("/cart").await.unwrap();
    assert_eq!(envelope.success, Some(true));

    let cart = envelope.into_data().unwrap().into_cart();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.item_count(), 2);
}

#[tokio::test]
async fn test_concurrent_gets_share_one_request() {
    let api = FakeCommerceApi::start().await;
    api.set_cart_delay(Duration::from_millis(200));
    let client = api.client();

    let results = join_all((0..5).map(|_| client.get::<RemoteCart>("/cart"))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(api.hits("GET /api/cart"), 1);

    // Once settled, the next read goes to the server again.
    let _: Envelope<RemoteCart> = client.get("/cart").await.unwrap();
    assert_eq!(api.hits("GET /api/cart"), 2);
}

#[tokio::test]
async fn test_fresh_get_never_joins_earlier_request() {
    let api = FakeCommerceApi::start().await;
    api.set_cart_delay(Duration::from_millis(200));
    let client = api.client();

    let (shared, fresh) = tokio::join!(client.get::<RemoteCart>("/cart"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        api.seed_line(WHEY_1KG, 1);
        client.get_fresh::<RemoteCart>("/cart").await
    });

    assert!(shared.unwrap().into_data().unwrap().items.is_empty());
    assert_eq!(fresh.unwrap().into_data().unwrap().items.len(), 1);
    assert_eq!(api.hits("GET /api/cart"), 2);
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries() {
    let api = FakeCommerceApi::start().await;
    api.require_session("current-session", true);
    let client = api.client_with_token("stale-session");

    let envelope: Envelope<RemoteCart> = client.get("/cart").await.unwrap();

    assert!(envelope.data.is_some());
    assert_eq!(api.refreshes(), 1);
    assert_eq!(api.hits("GET /api/cart"), 2);
}

#[tokio::test]
async fn test_rejected_refresh_surfaces_unauthorized() {
    let api = FakeCommerceApi::start().await;
    api.require_session("current-session", false);
    let client = api.client_with_token("stale-session");

    let err = client.get::<RemoteCart>("/cart").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.user_message(), "Session expired");
    assert_eq!(api.refreshes(), 1);
    assert_eq!(api.hits("GET /api/cart"), 1);
}

#[tokio::test]
async fn test_valid_session_cookie_is_sent() {
    let api = FakeCommerceApi::start().await;
    api.require_session("current-session", false);
    let client = api.client_with_token("current-session");

    let _: Envelope<RemoteCart> = client.get("/cart").await.unwrap();
    assert_eq!(api.refreshes(), 0);
}

#[tokio::test]
async fn test_error_message_comes_from_body() {
    let api = FakeCommerceApi::start().await;
    let client = api.client();

    let err = client
        .post::<_, Value>(
            "/cart/add",
            &serde_json::json!({"productVariantId": "v_missing", "quantity": 1}),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Status {
            status: 404,
            message: "Product variant not found".to_string(),
        }
    );
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let api = FakeCommerceApi::start().await;
    api.fail_cart(StatusCode::BAD_GATEWAY, "upstream down");
    let client = api.client();

    let err = client.get::<RemoteCart>("/cart").await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.user_message(), "upstream down");
}

#[tokio::test]
async fn test_empty_error_body_uses_generic_message() {
    let api = FakeCommerceApi::start().await;
    api.fail_cart(StatusCode::SERVICE_UNAVAILABLE, "");
    let client = api.client();

    let err = client.get::<RemoteCart>("/cart").await.unwrap_err();
    assert_eq!(err.user_message(), "Request failed");
}

#[tokio::test]
async fn test_duplicate_api_prefix_and_cache_buster() {
    let api = FakeCommerceApi::start().await;
    let client = api.client();

    assert_eq!(
        client.endpoint_url("/api/cart"),
        format!("{}/cart", api.base_url())
    );

    let _: Envelope<RemoteCart> = client.get("/api/cart").await.unwrap();
    assert_eq!(api.hits("GET /api/cart"), 1);

    let query = api.last_query().unwrap();
    assert!(query.starts_with("_t="), "unexpected query {query}");
}

#[tokio::test]
async fn test_unreachable_server() {
    let api = FakeCommerceApi::start().await;
    let config = api.api_config();
    drop(api);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = gymfuel_storefront::api::CommerceClient::new(&config).unwrap();
    let err = client.get::<RemoteCart>("/cart").await.unwrap_err();

    assert!(matches!(err, ApiError::Request(_)));
    assert_eq!(err.user_message(), "Failed to fetch data");
}
