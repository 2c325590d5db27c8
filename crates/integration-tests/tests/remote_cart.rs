//! Cart store in remote mode against the fake commerce API.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use rust_decimal::Decimal;

use gymfuel_core::{CartItemId, ProductId, ProductSnapshot, ShippingPolicy, VariantAttributes};
use gymfuel_integration_tests::{BAND, CREATINE, FakeCommerceApi, WHEY_1KG, WHEY_2KG, entry};
use gymfuel_storefront::api::{ApiError, RemoteCart};
use gymfuel_storefront::backend::RemoteBackend;
use gymfuel_storefront::error::StoreError;
use gymfuel_storefront::store::CartStore;

fn remote_store(api: &FakeCommerceApi) -> CartStore<RemoteBackend> {
    CartStore::new(RemoteBackend::new(api.client()), ShippingPolicy::default())
}

async fn add(store: &CartStore<RemoteBackend>, variant_id: &str, quantity: u32) {
    let item = entry(variant_id);
    store
        .add_item(&item.snapshot(), quantity, item.attributes())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_hydrate_loads_server_cart() {
    let api = FakeCommerceApi::start().await;
    api.seed_line(WHEY_1KG, 1);
    api.seed_line(CREATINE, 3);
    let store = remote_store(&api);

    store.hydrate().await.unwrap();

    let cart = store.snapshot().await;
    assert_eq!(cart.len(), 2);
    assert_eq!(store.item_count().await, 4);
    assert_eq!(store.subtotal().await, Decimal::new(519_600, 2));
    assert!(cart.lines().iter().all(|l| l.line_id.is_some()));
}

#[tokio::test]
async fn test_add_is_applied_and_line_ids_adopted() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);

    add(&store, WHEY_1KG, 2).await;

    // Applied locally as soon as the server accepted it.
    let cart = store.snapshot().await;
    assert_eq!(cart.item_count(), 2);
    assert_eq!(api.server_lines(), vec![(WHEY_1KG, 2)]);

    store.settle().await;

    let cart = store.snapshot().await;
    assert_eq!(cart.lines()[0].line_id, Some(CartItemId::new("ci_0")));
    assert_eq!(api.hits("GET /api/cart"), 1);
}

#[tokio::test]
async fn test_adding_same_variant_accumulates() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);

    add(&store, WHEY_1KG, 1).await;
    add(&store, WHEY_1KG, 2).await;
    add(&store, WHEY_2KG, 1).await;
    store.settle().await;

    assert_eq!(api.server_lines(), vec![(WHEY_1KG, 3), (WHEY_2KG, 1)]);
    let cart = store.snapshot().await;
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.item_count(), 4);
}

#[tokio::test]
async fn test_update_and_remove_use_line_ids() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);
    add(&store, WHEY_1KG, 1).await;
    add(&store, CREATINE, 1).await;
    store.settle().await;

    let whey = entry(WHEY_1KG);
    let whey_key = whey.attributes().key();
    assert!(
        store
            .update_quantity(&ProductId::new("whey"), &whey_key, 5)
            .await
            .unwrap()
    );
    assert_eq!(api.hits("PATCH /api/cart/update/ci_0"), 1);

    let creatine_key = entry(CREATINE).attributes().key();
    assert!(
        store
            .remove_item(&ProductId::new("creatine"), &creatine_key)
            .await
            .unwrap()
    );
    assert_eq!(api.hits("DELETE /api/cart/remove/ci_1"), 1);
    store.settle().await;

    assert_eq!(api.server_lines(), vec![(WHEY_1KG, 5)]);
    assert_eq!(store.item_count().await, 5);
}

#[tokio::test]
async fn test_update_to_zero_never_reaches_server() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);
    add(&store, BAND, 2).await;
    store.settle().await;

    let changed = store
        .update_quantity(&ProductId::new("band"), &VariantAttributes::default().key(), 0)
        .await
        .unwrap();

    assert!(!changed);
    assert_eq!(api.hits("PATCH /api/cart/update/ci_0"), 0);
    assert_eq!(api.server_lines(), vec![(BAND, 2)]);
}

#[tokio::test]
async fn test_clear_empties_both_sides() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);
    add(&store, WHEY_1KG, 1).await;
    add(&store, BAND, 1).await;

    store.clear().await.unwrap();
    store.settle().await;

    assert!(api.server_lines().is_empty());
    assert!(store.snapshot().await.is_empty());
    assert_eq!(api.hits("DELETE /api/cart/clear"), 1);
}

#[tokio::test]
async fn test_diverged_server_cart_replaces_local() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);
    // Added from another device after this store loaded.
    api.seed_line(CREATINE, 1);

    add(&store, WHEY_1KG, 1).await;
    assert_eq!(store.snapshot().await.len(), 1);

    store.settle().await;

    let cart = store.snapshot().await;
    assert_eq!(cart.len(), 2);
    assert_eq!(store.subtotal().await, Decimal::new(339_800, 2));
}

#[tokio::test]
async fn test_missing_variant_is_rejected_locally() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);

    let product = ProductSnapshot::new("whey", "Whey Protein", Decimal::from(2499));
    let err = store
        .add_item(&product, 1, VariantAttributes::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::MissingVariant(_)));
    assert_eq!(err.user_message(), "Please select a product option.");
    assert_eq!(api.hits("POST /api/cart/add"), 0);
    assert!(store.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_server_rejection_leaves_local_state_unchanged() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);
    add(&store, BAND, 1).await;
    store.settle().await;
    let before = store.snapshot().await;

    let ghost = ProductSnapshot::new("ghost", "Discontinued", Decimal::from(10))
        .with_variant_id("v_missing");
    let err = store
        .add_item(&ghost, 1, VariantAttributes::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::Api(ApiError::Status {
            status: 404,
            message: "Product variant not found".to_string(),
        })
    );
    assert_eq!(store.snapshot().await, before);
    assert!(store.last_error().await.is_some());

    add(&store, BAND, 1).await;
    assert!(store.last_error().await.is_none());
}

#[tokio::test]
async fn test_totals_with_shipping() {
    let api = FakeCommerceApi::start().await;
    let store = remote_store(&api);

    add(&store, BAND, 2).await;
    let totals = store.totals().await;
    assert_eq!(totals.shipping, Decimal::from(99));
    assert_eq!(totals.total, Decimal::from(299));

    add(&store, WHEY_1KG, 1).await;
    let totals = store.totals().await;
    assert_eq!(totals.shipping, Decimal::ZERO);
    assert_eq!(totals.total, Decimal::from(2699));
}

#[tokio::test]
async fn test_add_during_reconciliation_is_kept() {
    let api = FakeCommerceApi::start().await;
    api.set_cart_delay(Duration::from_millis(300));
    let store = remote_store(&api);

    add(&store, WHEY_1KG, 1).await;
    // The first reconciliation read is still in flight and predates this add.
    tokio::time::sleep(Duration::from_millis(50)).await;
    add(&store, CREATINE, 1).await;
    store.settle().await;

    assert_eq!(api.server_lines(), vec![(WHEY_1KG, 1), (CREATINE, 1)]);
    let server = api
        .client()
        .get::<RemoteCart>("/cart")
        .await
        .unwrap()
        .into_data()
        .unwrap()
        .into_cart();
    let local = store.snapshot().await;
    assert!(local.same_contents(&server));
    assert_eq!(local.item_count(), 2);
    assert!(local.lines().iter().all(|l| l.line_id.is_some()));
}
