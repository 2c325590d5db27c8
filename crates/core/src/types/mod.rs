//! Core types for GymFuel.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod variant;

pub use id::*;
pub use price::{CurrencyCode, Price, UnknownCurrency, round_money};
pub use variant::{VariantAttributes, VariantKey};
