//! Unified error handling with Sentry integration.
//!
//! Each concern owns its error type ([`ApiError`], [`StorageError`],
//! [`StoreError`], [`CouponError`], [`ConfigError`]); [`Error`] wraps them
//! for the composition root, which shows [`Error::user_message`] to the
//! shopper and [`Error::report`]s the rest to Sentry.

use thiserror::Error;

use gymfuel_core::{ProductId, VariantKey};

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::coupon::CouponError;
use crate::storage::StorageError;

/// Errors raised by cart store mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The commerce API rejected or failed the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Remote carts are keyed by product variant; the product had none.
    #[error("Product {0} has no variant ID")]
    MissingVariant(ProductId),

    /// The server cart has no line for the product/variant.
    #[error("No cart line for product {product_id} ({variant})")]
    LineNotFound {
        product_id: ProductId,
        variant: VariantKey,
    },
}

impl StoreError {
    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            Self::MissingVariant(_) => "Please select a product option.".to_string(),
            Self::LineNotFound { .. } => "This item is no longer in your cart.".to_string(),
        }
    }
}

/// Top-level error type for the storefront.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cart error: {0}")]
    Store(#[from] StoreError),

    #[error("Coupon error: {0}")]
    Coupon(#[from] CouponError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl Error {
    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::Store(err) => err.user_message(),
            Self::Coupon(err) => err.user_message(),
            Self::Storage(_) => "Something went wrong".to_string(),
            Self::Api(err) => err.user_message(),
        }
    }

    /// Whether the error is a fault on our side or the server's rather than a
    /// rejection of the shopper's input.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        let api = match self {
            Self::Config(_) | Self::Storage(_) => return true,
            Self::Store(StoreError::Api(err)) | Self::Api(err) => err,
            Self::Coupon(CouponError::Api(err)) => err,
            Self::Store(_) | Self::Coupon(_) => return false,
        };
        api.status().is_none_or(|status| status >= 500)
    }

    /// Capture internal errors to Sentry and log them.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::info!(error = %self, "Request rejected");
        }
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Add a breadcrumb for a shopper action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "whey")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use gymfuel_core::CouponRejection;

    use super::*;

    #[test]
    fn test_store_error_messages() {
        let err = StoreError::Api(ApiError::Status {
            status: 409,
            message: "Out of stock".to_string(),
        });
        assert_eq!(err.user_message(), "Out of stock");

        let err = StoreError::MissingVariant(ProductId::new("whey"));
        assert_eq!(err.to_string(), "Product whey has no variant ID");
    }

    #[test]
    fn test_is_internal() {
        let rejected = Error::Coupon(CouponError::Rejected(CouponRejection::Invalid {
            code: "NOPE".to_string(),
        }));
        assert!(!rejected.is_internal());

        let client_error = Error::Api(ApiError::Status {
            status: 400,
            message: "Bad".to_string(),
        });
        assert!(!client_error.is_internal());

        let server_error = Error::Store(StoreError::Api(ApiError::Status {
            status: 502,
            message: "Bad gateway".to_string(),
        }));
        assert!(server_error.is_internal());

        let network = Error::Api(ApiError::Request("refused".to_string()));
        assert!(network.is_internal());
        assert_eq!(network.user_message(), "Failed to fetch data");
    }
}
