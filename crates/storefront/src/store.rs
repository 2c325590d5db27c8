//! Cart store.
//!
//! The store owns the in-memory cart and the active coupon. Every mutation
//! runs in two phases:
//!
//! 1. the backend is asked to carry out the mutation (a no-op locally, a
//!    request in remote mode); on success the same pure transition is applied
//!    to local state and persisted
//! 2. backends that reconcile get a detached task that re-fetches the
//!    authoritative cart and replaces local state if it diverged and nothing
//!    newer has been applied since
//!
//! Background failures are logged, never returned.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use gymfuel_core::{
    AppliedCoupon, Cart, CartLine, CartMutation, CartTotals, ProductId, ProductSnapshot,
    ShippingPolicy, VariantAttributes, VariantKey,
};

use crate::backend::CartBackend;
use crate::error::{StoreError, add_breadcrumb};

#[derive(Debug, Default)]
struct CartState {
    cart: Cart,
    coupon: Option<AppliedCoupon>,
    /// Bumped on every applied mutation; reconciliation only lands when it
    /// still matches.
    generation: u64,
    /// Requests in flight per line.
    pending: HashMap<(ProductId, VariantKey), usize>,
    /// Mutations submitted but not yet applied locally.
    in_flight: usize,
    last_error: Option<StoreError>,
}

/// Cart state manager, generic over where the cart is persisted.
///
/// Cheap to clone; clones share state.
pub struct CartStore<B: CartBackend> {
    inner: Arc<CartStoreInner<B>>,
}

struct CartStoreInner<B> {
    backend: B,
    state: RwLock<CartState>,
    shipping: ShippingPolicy,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: CartBackend> Clone for CartStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CartBackend> std::fmt::Debug for CartStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("shipping", &self.inner.shipping)
            .finish_non_exhaustive()
    }
}

impl<B: CartBackend> CartStore<B> {
    /// Create an empty store. Call [`hydrate`](Self::hydrate) to load the
    /// persisted cart.
    #[must_use]
    pub fn new(backend: B, shipping: ShippingPolicy) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                backend,
                state: RwLock::new(CartState::default()),
                shipping,
                background: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Replace local state with the backend's cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the remote cart cannot be fetched. Local
    /// storage never fails; corrupt payloads load as an empty cart.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) -> Result<(), StoreError> {
        match self.inner.backend.fetch().await {
            Ok(cart) => {
                let mut state = self.inner.state.write().await;
                debug!(lines = cart.len(), "Cart hydrated");
                state.cart = cart;
                state.generation += 1;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                self.inner.state.write().await.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a product variant. A quantity of 0 counts as 1.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the mutation; local state
    /// is left unchanged.
    #[instrument(skip(self, product, variant), fields(product_id = %product.id))]
    pub async fn add_item(
        &self,
        product: &ProductSnapshot,
        quantity: u32,
        variant: VariantAttributes,
    ) -> Result<(), StoreError> {
        let line = CartLine::from_product(product, quantity, variant);
        self.mutate(CartMutation::Add(line)).await.map(|_| ())
    }

    /// Set a line's quantity. Returns `false` without contacting the backend
    /// when `quantity` is 0, unchanged, or the line does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the mutation.
    #[instrument(skip(self), fields(product_id = %product_id, variant = %variant))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<bool, StoreError> {
        self.mutate(CartMutation::SetQuantity {
            product_id: product_id.clone(),
            variant: variant.clone(),
            quantity,
        })
        .await
    }

    /// Remove a line. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the mutation.
    #[instrument(skip(self), fields(product_id = %product_id, variant = %variant))]
    pub async fn remove_item(
        &self,
        product_id: &ProductId,
        variant: &VariantKey,
    ) -> Result<bool, StoreError> {
        self.mutate(CartMutation::Remove {
            product_id: product_id.clone(),
            variant: variant.clone(),
        })
        .await
    }

    /// Empty the cart and drop the coupon.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the mutation.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.mutate(CartMutation::Clear).await.map(|_| ())
    }

    async fn mutate(&self, mutation: CartMutation) -> Result<bool, StoreError> {
        let before = self.inner.state.read().await.cart.clone();

        // Clear always goes through so a stale server cart is emptied too.
        let mut probe = before.clone();
        if !probe.apply(&mutation) && mutation != CartMutation::Clear {
            debug!("Mutation changes nothing, skipping");
            return Ok(false);
        }

        let target = mutation.target();
        {
            let mut state = self.inner.state.write().await;
            state.in_flight += 1;
            if let Some(target) = &target {
                *state.pending.entry(target.clone()).or_insert(0) += 1;
            }
        }

        let result = self.inner.backend.submit(&before, &mutation).await;

        let generation = {
            let mut state = self.inner.state.write().await;
            state.in_flight -= 1;
            if let Some(target) = &target {
                if let Some(count) = state.pending.get_mut(target) {
                    *count -= 1;
                    if *count == 0 {
                        state.pending.remove(target);
                    }
                }
            }
            if let Err(e) = result {
                warn!(error = %e, "Cart mutation failed");
                state.last_error = Some(e.clone());
                return Err(e);
            }

            state.cart.apply(&mutation);
            if mutation == CartMutation::Clear {
                state.coupon = None;
            }
            state.generation += 1;
            state.last_error = None;
            self.inner.backend.persist(&state.cart);
            state.generation
        };

        record_breadcrumb(&mutation);

        if self.inner.backend.reconciles() {
            self.spawn_reconcile(generation).await;
        }
        Ok(true)
    }

    async fn spawn_reconcile(&self, generation: u64) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.reconcile(generation).await });
        let mut background = self.inner.background.lock().await;
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    /// Wait for every background task spawned so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.inner.background.lock().await);
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Background cart task panicked");
            }
        }
    }

    // =========================================================================
    // Coupon
    // =========================================================================

    /// The active coupon, if any.
    pub async fn coupon(&self) -> Option<AppliedCoupon> {
        self.inner.state.read().await.coupon.clone()
    }

    pub(crate) async fn set_coupon(&self, coupon: AppliedCoupon) {
        self.inner.state.write().await.coupon = Some(coupon);
    }

    /// Drop the active coupon. Returns whether one was applied.
    pub async fn remove_coupon(&self) -> bool {
        self.inner.state.write().await.coupon.take().is_some()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.inner.state.read().await.cart.clone()
    }

    /// Σ(unit price × quantity) over the current lines.
    pub async fn subtotal(&self) -> Decimal {
        self.inner.state.read().await.cart.subtotal()
    }

    pub async fn item_count(&self) -> u32 {
        self.inner.state.read().await.cart.item_count()
    }

    /// Subtotal, discount, shipping and grand total.
    pub async fn totals(&self) -> CartTotals {
        let state = self.inner.state.read().await;
        CartTotals::compute(&state.cart, state.coupon.as_ref(), &self.inner.shipping)
    }

    /// Whether a request for this line is in flight.
    pub async fn is_pending(&self, product_id: &ProductId, variant: &VariantKey) -> bool {
        self.inner
            .state
            .read()
            .await
            .pending
            .contains_key(&(product_id.clone(), variant.clone()))
    }

    /// Error of the most recent failed operation, cleared by the next success.
    pub async fn last_error(&self) -> Option<StoreError> {
        self.inner.state.read().await.last_error.clone()
    }
}

impl<B: CartBackend> CartStoreInner<B> {
    async fn reconcile(&self, generation: u64) {
        // Issued after this mutation was applied, so the read cannot predate it.
        let server = match self.backend.fetch_latest().await {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "Background cart reconciliation failed");
                return;
            }
        };

        let mut state = self.state.write().await;
        // A fetch taken while another mutation was in flight may already
        // contain it; the reconciliation spawned by that mutation decides.
        if state.generation != generation || state.in_flight > 0 {
            debug!(
                expected = generation,
                current = state.generation,
                "Cart changed since fetch, dropping reconciliation"
            );
            return;
        }

        if state.cart.same_contents(&server) {
            if state.cart.lines().iter().all(|l| l.line_id.is_some()) {
                debug!("Cart matches server");
                return;
            }
            debug!("Adopting server line IDs");
        } else {
            info!(
                local_lines = state.cart.len(),
                server_lines = server.len(),
                "Local cart diverged from server, replacing"
            );
        }

        state.cart = server;
        self.backend.persist(&state.cart);
    }
}

fn record_breadcrumb(mutation: &CartMutation) {
    match mutation {
        CartMutation::Add(line) => {
            let quantity = line.quantity.max(1).to_string();
            add_breadcrumb(
                "cart",
                "Added item",
                Some(&[
                    ("product_id", line.product_id.as_str()),
                    ("quantity", &quantity),
                ]),
            );
        }
        CartMutation::SetQuantity {
            product_id,
            quantity,
            ..
        } => {
            let quantity = quantity.to_string();
            add_breadcrumb(
                "cart",
                "Updated quantity",
                Some(&[("product_id", product_id.as_str()), ("quantity", &quantity)]),
            );
        }
        CartMutation::Remove { product_id, .. } => {
            add_breadcrumb(
                "cart",
                "Removed item",
                Some(&[("product_id", product_id.as_str())]),
            );
        }
        CartMutation::Clear => add_breadcrumb("cart", "Cleared cart", None),
    }
}
