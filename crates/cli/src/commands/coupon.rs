//! Coupon commands.

use tracing::info;

use gymfuel_storefront::Error;
use gymfuel_storefront::backend::CartBackend;
use gymfuel_storefront::coupon::CouponVerifier;

use super::Session;
use super::cart::print_cart;

/// Verify `code` against the current cart and print the discounted totals.
///
/// # Errors
///
/// Returns an error if the coupon is rejected or the verifier is unreachable.
#[allow(clippy::print_stdout)]
pub async fn check<B: CartBackend, V: CouponVerifier>(
    session: &Session<B, V>,
    code: &str,
) -> Result<(), Error> {
    let applied = session.coupons.apply_coupon(&session.store, code).await?;
    info!(code = %applied.code, capped = applied.capped, "Coupon accepted");
    println!("Coupon {} applied.", applied.code);
    print_cart(session).await;
    Ok(())
}
