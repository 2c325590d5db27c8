//! Cart commands.

use rust_decimal::Decimal;
use tracing::info;

use gymfuel_core::{ProductId, ProductSnapshot, VariantAttributes, VariantKey};
use gymfuel_storefront::Error;
use gymfuel_storefront::backend::CartBackend;
use gymfuel_storefront::coupon::CouponVerifier;

use super::{Session, render};

/// Product details for `cart add`.
pub struct NewItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub variant: VariantAttributes,
    pub variant_id: Option<String>,
    pub slug: Option<String>,
    pub image: Option<String>,
}

impl NewItem {
    fn snapshot(&self) -> ProductSnapshot {
        let mut product =
            ProductSnapshot::new(self.product_id.as_str(), self.name.as_str(), self.price);
        product.slug.clone_from(&self.slug);
        product.image.clone_from(&self.image);
        match &self.variant_id {
            Some(id) => product.with_variant_id(id.as_str()),
            None => product,
        }
    }
}

/// Print the cart, optionally applying `coupon` first.
///
/// # Errors
///
/// Returns an error if the coupon is rejected.
pub async fn show<B: CartBackend, V: CouponVerifier>(
    session: &Session<B, V>,
    coupon: Option<&str>,
) -> Result<(), Error> {
    if let Some(code) = coupon {
        session.coupons.apply_coupon(&session.store, code).await?;
    }
    print_cart(session).await;
    Ok(())
}

/// Add a product and print the cart.
///
/// # Errors
///
/// Returns an error if the backend rejects the item.
pub async fn add<B: CartBackend, V: CouponVerifier>(
    session: &Session<B, V>,
    item: NewItem,
) -> Result<(), Error> {
    let product = item.snapshot();
    session
        .store
        .add_item(&product, item.quantity, item.variant)
        .await?;
    info!(product_id = %product.id, quantity = item.quantity, "Added to cart");
    print_cart(session).await;
    Ok(())
}

/// Set a line's quantity and print the cart.
///
/// # Errors
///
/// Returns an error if the backend rejects the update.
pub async fn update<B: CartBackend, V: CouponVerifier>(
    session: &Session<B, V>,
    product_id: &str,
    variant: &VariantKey,
    quantity: u32,
) -> Result<(), Error> {
    let changed = session
        .store
        .update_quantity(&ProductId::new(product_id), variant, quantity)
        .await?;
    if !changed {
        notice(&format!(
            "Nothing to update for {product_id} ({variant}); use `cart remove` to delete a line."
        ));
    }
    print_cart(session).await;
    Ok(())
}

/// Remove a line and print the cart.
///
/// # Errors
///
/// Returns an error if the backend rejects the removal.
pub async fn remove<B: CartBackend, V: CouponVerifier>(
    session: &Session<B, V>,
    product_id: &str,
    variant: &VariantKey,
) -> Result<(), Error> {
    let removed = session
        .store
        .remove_item(&ProductId::new(product_id), variant)
        .await?;
    if !removed {
        notice(&format!("{product_id} ({variant}) is not in your cart."));
    }
    print_cart(session).await;
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the backend rejects the request.
pub async fn clear<B: CartBackend, V: CouponVerifier>(session: &Session<B, V>) -> Result<(), Error> {
    session.store.clear().await?;
    print_cart(session).await;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) async fn print_cart<B: CartBackend, V: CouponVerifier>(session: &Session<B, V>) {
    let cart = session.store.snapshot().await;
    let totals = session.store.totals().await;
    let coupon = session.store.coupon().await;
    print!(
        "{}",
        render::cart(&cart, &totals, coupon.as_ref(), session.currency)
    );
}

#[allow(clippy::print_stdout)]
fn notice(message: &str) {
    println!("{message}");
}
