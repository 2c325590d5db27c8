//! Checkout totals derived from a cart and its coupon.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::coupon::AppliedCoupon;
use crate::types::round_money;

/// Flat-rate shipping, free from a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub free_threshold: Decimal,
    pub flat_rate: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::from(999),
            flat_rate: Decimal::from(99),
        }
    }
}

impl ShippingPolicy {
    /// Shipping charged for `subtotal`. Empty carts ship free.
    #[must_use]
    pub fn charge(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.flat_rate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// `subtotal - discount + shipping + tax`, tax being zero.
    #[must_use]
    pub fn compute(cart: &Cart, coupon: Option<&AppliedCoupon>, shipping: &ShippingPolicy) -> Self {
        let subtotal = round_money(cart.subtotal());
        let discount = coupon.map_or(Decimal::ZERO, |c| c.discount_against(subtotal));
        let shipping = shipping.charge(subtotal);
        let tax = Decimal::ZERO;
        Self {
            subtotal,
            discount,
            shipping,
            tax,
            total: subtotal - discount + shipping + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ProductSnapshot;
    use crate::coupon::{CouponQuote, DiscountType};
    use crate::types::VariantAttributes;

    fn cart_worth(amount: i64) -> Cart {
        let mut cart = Cart::new();
        cart.add_item(
            &ProductSnapshot::new("p", "Product", Decimal::from(amount)),
            1,
            VariantAttributes::default(),
        );
        cart
    }

    #[test]
    fn test_shipping_below_threshold() {
        let totals = CartTotals::compute(&cart_worth(500), None, &ShippingPolicy::default());
        assert_eq!(totals.shipping, Decimal::from(99));
        assert_eq!(totals.total, Decimal::from(599));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = CartTotals::compute(&cart_worth(999), None, &ShippingPolicy::default());
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::from(999));
    }

    #[test]
    fn test_empty_cart_is_zero() {
        let totals = CartTotals::compute(&Cart::new(), None, &ShippingPolicy::default());
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_discount_applied() {
        let cart = cart_worth(2000);
        let coupon = CouponQuote {
            id: None,
            code: "GYMFUEL20".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            discount_amount: None,
        }
        .apply_to(cart.subtotal());
        let totals = CartTotals::compute(&cart, Some(&coupon), &ShippingPolicy::default());
        assert_eq!(totals.discount, Decimal::from(400));
        assert_eq!(totals.total, Decimal::from(1600));
    }
}
