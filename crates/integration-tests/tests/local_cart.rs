//! Cart, coupons and wishlist in local mode on file storage.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use gymfuel_core::{CouponRule, DiscountType, ProductId, ShippingPolicy, VariantKey};
use gymfuel_integration_tests::{BAND, CREATINE, WHEY_1KG, WHEY_2KG, entry};
use gymfuel_storefront::backend::LocalBackend;
use gymfuel_storefront::coupon::{CatalogCouponVerifier, CouponEvaluator};
use gymfuel_storefront::storage::{FileStorage, Storage, keys};
use gymfuel_storefront::store::CartStore;
use gymfuel_storefront::wishlist::WishlistStore;

fn open_storage(dir: &TempDir) -> Arc<dyn Storage> {
    Arc::new(FileStorage::open(dir.path().join("state")).unwrap())
}

async fn open_store(storage: Arc<dyn Storage>) -> CartStore<LocalBackend> {
    let store = CartStore::new(LocalBackend::new(storage), ShippingPolicy::default());
    store.hydrate().await.unwrap();
    store
}

async fn add(store: &CartStore<LocalBackend>, variant_id: &str, quantity: u32) {
    let item = entry(variant_id);
    store
        .add_item(&item.snapshot(), quantity, item.attributes())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cart_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let store = open_store(open_storage(&dir)).await;
    add(&store, WHEY_1KG, 1).await;
    add(&store, WHEY_2KG, 1).await;
    add(&store, WHEY_1KG, 2).await;
    add(&store, CREATINE, 1).await;
    assert!(
        store
            .remove_item(&ProductId::new("creatine"), &entry(CREATINE).attributes().key())
            .await
            .unwrap()
    );
    drop(store);

    let reopened = open_store(open_storage(&dir)).await;
    let cart = reopened.snapshot().await;

    assert_eq!(cart.len(), 2);
    let small = cart
        .find(&ProductId::new("whey"), &VariantKey::new(Some("1kg"), Some("Mocha")))
        .unwrap();
    assert_eq!(small.quantity, 3);
    assert_eq!(reopened.subtotal().await, Decimal::from(2499 * 3 + 4499));
}

#[tokio::test]
async fn test_stored_payload_shape() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    let store = open_store(Arc::clone(&storage)).await;
    add(&store, WHEY_1KG, 2).await;

    let raw = storage.get_item(keys::CART).unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(stored[0]["id"], "whey");
    assert_eq!(stored[0]["quantity"], 2);
    assert_eq!(stored[0]["size"], "1kg");
    assert_eq!(stored[0]["flavor"], "Mocha");
}

#[tokio::test]
async fn test_corrupt_cart_loads_empty() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    storage.set_item(keys::CART, "{not json").unwrap();

    let store = open_store(Arc::clone(&storage)).await;
    assert!(store.snapshot().await.is_empty());

    add(&store, BAND, 1).await;
    let reopened = open_store(storage).await;
    assert_eq!(reopened.item_count().await, 1);
}

#[tokio::test]
async fn test_catalog_coupon_on_local_cart() {
    let dir = TempDir::new().unwrap();
    let store = open_store(open_storage(&dir)).await;
    add(&store, WHEY_1KG, 2).await;

    let coupons = CouponEvaluator::new(CatalogCouponVerifier::new(vec![CouponRule::new(
        "WELCOME10",
        DiscountType::Percentage,
        Decimal::from(10),
    )]));
    coupons.apply_coupon(&store, "WELCOME10").await.unwrap();
    coupons.settle().await;

    let totals = store.totals().await;
    assert_eq!(totals.subtotal, Decimal::from(4998));
    assert_eq!(totals.discount, Decimal::new(49_980, 2));
    assert_eq!(totals.total, Decimal::new(449_820, 2));

    store.clear().await.unwrap();
    assert!(store.coupon().await.is_none());
}

#[tokio::test]
async fn test_wishlist_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let wishlist = WishlistStore::open(open_storage(&dir));
    assert!(wishlist.toggle(ProductId::new("whey")).await);
    assert!(wishlist.toggle(ProductId::new("creatine")).await);
    assert!(!wishlist.toggle(ProductId::new("whey")).await);
    drop(wishlist);

    let reopened = WishlistStore::open(open_storage(&dir));
    assert_eq!(reopened.items().await, vec![ProductId::new("creatine")]);
    assert!(reopened.contains(&ProductId::new("creatine")).await);
}

#[tokio::test]
async fn test_cart_and_wishlist_share_storage() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);

    let store = open_store(Arc::clone(&storage)).await;
    let wishlist = WishlistStore::open(Arc::clone(&storage));
    add(&store, BAND, 1).await;
    wishlist.add(ProductId::new("band")).await;

    assert!(storage.get_item(keys::CART).unwrap().is_some());
    assert!(storage.get_item(keys::WISHLIST).unwrap().is_some());

    store.clear().await.unwrap();
    assert_eq!(wishlist.items().await, vec![ProductId::new("band")]);
}
