//! Plain-text rendering of cart state.

use std::fmt::Write;

use gymfuel_core::{AppliedCoupon, Cart, CartTotals, CurrencyCode, Price, ProductId};

/// Cart lines followed by the totals block.
pub fn cart(cart: &Cart, totals: &CartTotals, coupon: Option<&AppliedCoupon>, currency: CurrencyCode) -> String {
    let money = |amount| Price::new(amount, currency).display();
    let mut out = String::new();

    if cart.is_empty() {
        out.push_str("Your cart is empty.\n");
        return out;
    }

    for line in cart.lines() {
        let _ = write!(out, "{:>3} x {}", line.quantity, display_name(line.name.as_str(), &line.product_id));
        let variant = line.variant_key();
        if variant.size().is_some() || variant.flavor().is_some() {
            let _ = write!(out, " ({variant})");
        }
        let _ = writeln!(out, "  {}", money(line.line_total()));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Subtotal ({} items): {}", cart.item_count(), money(totals.subtotal));
    if let Some(coupon) = coupon {
        let _ = writeln!(out, "Discount ({}): -{}", coupon.code, money(totals.discount));
        if coupon.capped {
            out.push_str("  Discount limited to 90% of the subtotal.\n");
        }
    }
    if totals.shipping.is_zero() {
        out.push_str("Shipping: Free\n");
    } else {
        let _ = writeln!(out, "Shipping: {}", money(totals.shipping));
    }
    let _ = writeln!(out, "Total: {}", money(totals.total));
    out
}

/// One product ID per line.
pub fn wishlist(items: &[ProductId]) -> String {
    if items.is_empty() {
        return "Your wishlist is empty.\n".to_string();
    }
    items.iter().fold(String::new(), |mut out, id| {
        let _ = writeln!(out, "- {id}");
        out
    })
}

fn display_name<'a>(name: &'a str, product_id: &'a ProductId) -> &'a str {
    if name.is_empty() { product_id.as_str() } else { name }
}

#[cfg(test)]
mod tests {
    use gymfuel_core::{CouponQuote, DiscountType, ProductSnapshot, ShippingPolicy, VariantAttributes};
    use rust_decimal::Decimal;

    use super::*;

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(
            &ProductSnapshot::new("whey", "Whey Protein", Decimal::from(2499)),
            2,
            VariantAttributes::new(Some("1kg".to_string()), Some("Mocha".to_string())),
        );
        cart
    }

    #[test]
    fn test_empty_cart() {
        let empty = Cart::new();
        let totals = CartTotals::compute(&empty, None, &ShippingPolicy::default());
        assert_eq!(cart(&empty, &totals, None, CurrencyCode::INR), "Your cart is empty.\n");
    }

    #[test]
    fn test_cart_with_coupon() {
        let cart_value = sample_cart();
        let coupon = CouponQuote {
            id: None,
            code: "WELCOME10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            discount_amount: None,
        }
        .apply_to(cart_value.subtotal());
        let totals = CartTotals::compute(&cart_value, Some(&coupon), &ShippingPolicy::default());

        let out = cart(&cart_value, &totals, Some(&coupon), CurrencyCode::INR);
        assert!(out.contains("  2 x Whey Protein (1kg/Mocha)  ₹4,998.00"));
        assert!(out.contains("Subtotal (2 items): ₹4,998.00"));
        assert!(out.contains("Discount (WELCOME10): -₹499.80"));
        assert!(out.contains("Shipping: Free"));
        assert!(out.contains("Total: ₹4,498.20"));
    }

    #[test]
    fn test_wishlist() {
        assert_eq!(wishlist(&[]), "Your wishlist is empty.\n");
        assert_eq!(
            wishlist(&[ProductId::new("whey"), ProductId::new("bcaa")]),
            "- whey\n- bcaa\n"
        );
    }
}
