//! Wire types for the commerce API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gymfuel_core::{
    Cart, CartItemId, CartLine, CouponQuote, ProductId, ProductVariantId, VariantAttributes,
};

use super::ApiError;

// =============================================================================
// Envelope
// =============================================================================

/// Standard response wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the `data` field.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the response carried no data.
    pub fn into_data(self) -> Result<T, ApiError> {
        self.data
            .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Product details embedded in a cart item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Variant details embedded in a cart item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVariant {
    pub id: ProductVariantId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub flavor: Option<String>,
}

/// One line of the server-side cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    pub id: CartItemId,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub product_variant_id: Option<ProductVariantId>,
    #[serde(default)]
    pub variant: Option<RemoteVariant>,
    #[serde(default)]
    pub product: Option<RemoteProduct>,
}

impl RemoteCartItem {
    /// Convert to a cart line.
    ///
    /// Items without embedded product data are keyed by their variant (or,
    /// failing that, line) ID so they still have a stable identity.
    #[must_use]
    pub fn into_line(self) -> CartLine {
        let variant_id = self
            .variant
            .as_ref()
            .map(|v| v.id.clone())
            .or(self.product_variant_id);
        let (size, flavor) = self
            .variant
            .map_or((None, None), |v| (v.size, v.flavor));
        let (product_id, name, slug, image) = match self.product {
            Some(p) => (p.id, p.name, p.slug, p.image),
            None => {
                let fallback = variant_id
                    .as_ref()
                    .map_or_else(|| self.id.to_string(), ToString::to_string);
                (ProductId::new(fallback), String::new(), None, None)
            }
        };

        CartLine {
            product_id,
            name,
            slug,
            image,
            unit_price: self.price,
            quantity: self.quantity,
            variant: VariantAttributes::new(size, flavor),
            variant_id,
            line_id: Some(self.id),
        }
    }
}

/// The server-side cart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub item_count: Option<u32>,
    #[serde(default)]
    pub total_quantity: Option<u32>,
}

impl RemoteCart {
    /// Convert to a normalized [`Cart`]. Server totals are ignored; the cart
    /// recomputes them from its lines.
    #[must_use]
    pub fn into_cart(self) -> Cart {
        Cart::from_lines(self.items.into_iter().map(RemoteCartItem::into_line))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub product_variant_id: &'a ProductVariantId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCouponRequest<'a> {
    pub code: &'a str,
    /// Subtotal formatted with two decimals.
    pub cart_total: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyCouponData {
    pub coupon: CouponQuote,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyCouponRequest<'a> {
    pub code: &'a str,
}
