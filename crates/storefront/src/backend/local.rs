use std::sync::Arc;

use gymfuel_core::{Cart, CartMutation};

use super::CartBackend;
use crate::error::StoreError;
use crate::storage::{self, Storage, keys};

/// Cart stored under the `cart` key of a [`Storage`].
#[derive(Clone)]
pub struct LocalBackend {
    storage: Arc<dyn Storage>,
}

impl LocalBackend {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend").finish_non_exhaustive()
    }
}

impl CartBackend for LocalBackend {
    fn reconciles(&self) -> bool {
        false
    }

    async fn fetch(&self) -> Result<Cart, StoreError> {
        Ok(storage::load_cart(self.storage.as_ref()))
    }

    async fn submit(&self, _before: &Cart, _mutation: &CartMutation) -> Result<(), StoreError> {
        Ok(())
    }

    fn persist(&self, cart: &Cart) {
        storage::save_json(self.storage.as_ref(), keys::CART, cart);
    }
}
