//! Coupon evaluation.
//!
//! A [`CouponVerifier`] turns a code and subtotal into a [`CouponQuote`]:
//! [`RemoteCouponVerifier`] asks the commerce API, [`CatalogCouponVerifier`]
//! checks a configured catalog offline. [`CouponEvaluator`] applies the quote
//! to a [`CartStore`] and then persists the association in the background.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use gymfuel_core::{AppliedCoupon, CouponQuote, CouponRejection, CouponRule, round_money};

use crate::api::{
    ApiError, ApplyCouponRequest, CommerceClient, Envelope, VerifyCouponData, VerifyCouponRequest,
};
use crate::backend::CartBackend;
use crate::error::add_breadcrumb;
use crate::store::CartStore;

/// Errors returned by [`CouponEvaluator::apply_coupon`].
#[derive(Debug, Clone, Error)]
pub enum CouponError {
    #[error(transparent)]
    Rejected(#[from] CouponRejection),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CouponError {
    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Api(err) => err.user_message(),
        }
    }
}

/// Validates coupon codes.
pub trait CouponVerifier: Send + Sync + 'static {
    /// Check `code` against `subtotal`.
    fn verify(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> impl Future<Output = Result<CouponQuote, CouponError>> + Send;

    /// Record that `code` is applied to the shopper's cart.
    fn persist(&self, code: &str) -> impl Future<Output = Result<(), CouponError>> + Send;
}

// =============================================================================
// Verifiers
// =============================================================================

/// Verifies coupons with the commerce API.
#[derive(Debug, Clone)]
pub struct RemoteCouponVerifier {
    client: CommerceClient,
}

impl RemoteCouponVerifier {
    #[must_use]
    pub const fn new(client: CommerceClient) -> Self {
        Self { client }
    }
}

impl CouponVerifier for RemoteCouponVerifier {
    #[instrument(skip(self), fields(code = %code))]
    async fn verify(&self, code: &str, subtotal: Decimal) -> Result<CouponQuote, CouponError> {
        let envelope: Envelope<VerifyCouponData> = self
            .client
            .post(
                "/coupons/verify",
                &VerifyCouponRequest {
                    code,
                    cart_total: format!("{:.2}", round_money(subtotal)),
                },
            )
            .await?;
        Ok(envelope.into_data()?.coupon)
    }

    #[instrument(skip(self), fields(code = %code))]
    async fn persist(&self, code: &str) -> Result<(), CouponError> {
        let _: Envelope<Value> = self
            .client
            .post("/coupons/apply", &ApplyCouponRequest { code })
            .await?;
        Ok(())
    }
}

/// Verifies coupons against a fixed catalog, without network access.
#[derive(Debug, Clone, Default)]
pub struct CatalogCouponVerifier {
    rules: Vec<CouponRule>,
}

impl CatalogCouponVerifier {
    #[must_use]
    pub const fn new(rules: Vec<CouponRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[CouponRule] {
        &self.rules
    }
}

impl CouponVerifier for CatalogCouponVerifier {
    async fn verify(&self, code: &str, subtotal: Decimal) -> Result<CouponQuote, CouponError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches(code))
            .ok_or_else(|| CouponRejection::Invalid {
                code: code.to_string(),
            })?;
        Ok(rule.quote(subtotal, Utc::now())?)
    }

    async fn persist(&self, _code: &str) -> Result<(), CouponError> {
        Ok(())
    }
}

// =============================================================================
// CouponEvaluator
// =============================================================================

/// Applies coupons to a cart store.
pub struct CouponEvaluator<V: CouponVerifier> {
    verifier: Arc<V>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl<V: CouponVerifier> std::fmt::Debug for CouponEvaluator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponEvaluator").finish_non_exhaustive()
    }
}

impl<V: CouponVerifier> CouponEvaluator<V> {
    #[must_use]
    pub fn new(verifier: V) -> Self {
        Self {
            verifier: Arc::new(verifier),
            background: Mutex::new(Vec::new()),
        }
    }

    /// Verify `code` against the store's subtotal and apply it.
    ///
    /// The coupon is stored on the cart as soon as verification succeeds. The
    /// server is then told about it from a detached task whose failure is
    /// only logged.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Rejected` for empty, unknown, expired or
    /// below-minimum codes and `CouponError::Api` when the verifier cannot be
    /// reached.
    #[instrument(skip(self, store), fields(code = %code))]
    pub async fn apply_coupon<B: CartBackend>(
        &self,
        store: &CartStore<B>,
        code: &str,
    ) -> Result<AppliedCoupon, CouponError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CouponRejection::EmptyCode.into());
        }

        let subtotal = round_money(store.subtotal().await);
        let quote = self.verifier.verify(code, subtotal).await.map_err(|e| {
            debug!(error = %e, "Coupon verification failed");
            e
        })?;

        let applied = quote.apply_to(subtotal);
        if applied.capped {
            info!(
                code = %applied.code,
                discount = %applied.discount_amount,
                "Fixed-amount discount capped at 90% of subtotal"
            );
        }
        store.set_coupon(applied.clone()).await;
        add_breadcrumb("coupon", "Applied coupon", Some(&[("code", &applied.code)]));

        self.spawn_persist(applied.code.clone()).await;
        Ok(applied)
    }

    /// Drop the store's coupon. The server is not notified.
    pub async fn remove_coupon<B: CartBackend>(&self, store: &CartStore<B>) -> bool {
        store.remove_coupon().await
    }

    async fn spawn_persist(&self, code: String) {
        let verifier = Arc::clone(&self.verifier);
        let handle = tokio::spawn(async move {
            if let Err(e) = verifier.persist(&code).await {
                warn!(code = %code, error = %e, "Failed to save coupon to cart");
            }
        });
        let mut background = self.background.lock().await;
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    /// Wait for every background task spawned so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.background.lock().await);
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Background coupon task panicked");
            }
        }
    }
}
