//! Wishlist commands. The wishlist always lives in local storage.

use std::sync::Arc;

use gymfuel_core::ProductId;
use gymfuel_storefront::storage::Storage;
use gymfuel_storefront::wishlist::WishlistStore;

use super::render;

/// Print the wishlist.
#[allow(clippy::print_stdout)]
pub async fn list(storage: Arc<dyn Storage>) {
    let store = WishlistStore::open(storage);
    print!("{}", render::wishlist(&store.items().await));
}

/// Flip a product's membership.
#[allow(clippy::print_stdout)]
pub async fn toggle(storage: Arc<dyn Storage>, product_id: &str) {
    let store = WishlistStore::open(storage);
    if store.toggle(ProductId::new(product_id)).await {
        println!("Added {product_id} to your wishlist.");
    } else {
        println!("Removed {product_id} from your wishlist.");
    }
}

/// Remove a product.
#[allow(clippy::print_stdout)]
pub async fn remove(storage: Arc<dyn Storage>, product_id: &str) {
    let store = WishlistStore::open(storage);
    if store.remove(&ProductId::new(product_id)).await {
        println!("Removed {product_id} from your wishlist.");
    } else {
        println!("{product_id} is not in your wishlist.");
    }
}
