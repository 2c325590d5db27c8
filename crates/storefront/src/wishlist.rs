//! Wishlist store, persisted under the `wishlist` storage key.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::instrument;

use gymfuel_core::{ProductId, Wishlist};

use crate::error::add_breadcrumb;
use crate::storage::{self, Storage, keys};

pub struct WishlistStore {
    storage: Arc<dyn Storage>,
    wishlist: RwLock<Wishlist>,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore").finish_non_exhaustive()
    }
}

impl WishlistStore {
    /// Open the wishlist, hydrating it from storage. Corrupt payloads load as
    /// an empty wishlist.
    #[must_use]
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let wishlist = storage::load_wishlist(storage.as_ref());
        Self {
            storage,
            wishlist: RwLock::new(wishlist),
        }
    }

    /// Flip membership of `product_id`. Returns whether it is now wishlisted.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn toggle(&self, product_id: ProductId) -> bool {
        let mut wishlist = self.wishlist.write().await;
        let added = wishlist.toggle(product_id.clone());
        self.persist(&wishlist);
        add_breadcrumb(
            "wishlist",
            if added { "Added to wishlist" } else { "Removed from wishlist" },
            Some(&[("product_id", product_id.as_str())]),
        );
        added
    }

    /// Returns `false` if already present.
    pub async fn add(&self, product_id: ProductId) -> bool {
        let mut wishlist = self.wishlist.write().await;
        let added = wishlist.add(product_id);
        if added {
            self.persist(&wishlist);
        }
        added
    }

    /// Returns `false` if absent.
    pub async fn remove(&self, product_id: &ProductId) -> bool {
        let mut wishlist = self.wishlist.write().await;
        let removed = wishlist.remove(product_id);
        if removed {
            self.persist(&wishlist);
        }
        removed
    }

    pub async fn contains(&self, product_id: &ProductId) -> bool {
        self.wishlist.read().await.contains(product_id)
    }

    /// Wishlisted product IDs in insertion order.
    pub async fn items(&self) -> Vec<ProductId> {
        self.wishlist.read().await.iter().cloned().collect()
    }

    fn persist(&self, wishlist: &Wishlist) {
        storage::save_json(self.storage.as_ref(), keys::WISHLIST, wishlist);
    }
}
