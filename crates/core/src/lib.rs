//! GymFuel Core - Shared cart, wishlist and coupon types.
//!
//! This crate provides the types and pure state transitions used by the
//! storefront cart manager and the `gymfuel` CLI.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. Persistence and remote sync live in `gymfuel-storefront`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and variant keys
//! - [`cart`] - Cart lines and their transitions
//! - [`wishlist`] - Product wishlist set
//! - [`coupon`] - Discount math and the fixed-amount cap
//! - [`totals`] - Shipping and checkout totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod coupon;
pub mod totals;
pub mod types;
pub mod wishlist;

pub use cart::{Cart, CartLine, CartMutation, ProductSnapshot};
pub use coupon::{AppliedCoupon, CouponQuote, CouponRejection, CouponRule, DiscountType};
pub use totals::{CartTotals, ShippingPolicy};
pub use types::*;
pub use wishlist::Wishlist;
