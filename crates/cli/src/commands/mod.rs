//! Command implementations.

pub mod cart;
pub mod coupon;
mod render;
pub mod wishlist;

use gymfuel_core::CurrencyCode;
use gymfuel_storefront::Error;
use gymfuel_storefront::backend::CartBackend;
use gymfuel_storefront::config::StorefrontConfig;
use gymfuel_storefront::coupon::{CouponEvaluator, CouponVerifier};
use gymfuel_storefront::store::CartStore;

/// A hydrated cart plus the coupon evaluator for the configured mode.
pub struct Session<B: CartBackend, V: CouponVerifier> {
    pub store: CartStore<B>,
    pub coupons: CouponEvaluator<V>,
    pub currency: CurrencyCode,
}

impl<B: CartBackend, V: CouponVerifier> Session<B, V> {
    /// Build the store and load the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart cannot be fetched.
    pub async fn open(backend: B, verifier: V, config: &StorefrontConfig) -> Result<Self, Error> {
        let store = CartStore::new(backend, config.shipping);
        store.hydrate().await?;
        Ok(Self {
            store,
            coupons: CouponEvaluator::new(verifier),
            currency: config.currency,
        })
    }

    /// Wait for background reconciliation and coupon persistence.
    pub async fn settle(&self) {
        self.store.settle().await;
        self.coupons.settle().await;
    }
}
