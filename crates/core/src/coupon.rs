//! Coupon discount math.
//!
//! A verifier (remote or offline) produces a [`CouponQuote`]; [`CouponQuote::apply_to`]
//! turns it into the [`AppliedCoupon`] shown to the shopper, enforcing the
//! fixed-amount cap.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CouponId, round_money};

/// Share of the subtotal a fixed-amount discount may cover (90%).
pub const FIXED_AMOUNT_CAP: Decimal = Decimal::from_parts(90, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discount_value` percent of the subtotal.
    Percentage,
    /// `discount_value` in currency units.
    FixedAmount,
}

impl DiscountType {
    /// Raw discount before any cap.
    #[must_use]
    pub fn raw_discount(self, value: Decimal, subtotal: Decimal) -> Decimal {
        match self {
            Self::Percentage => round_money(subtotal * value / Decimal::ONE_HUNDRED),
            Self::FixedAmount => value,
        }
    }
}

/// A coupon accepted by a verifier for a given subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
    #[serde(default)]
    pub id: Option<CouponId>,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Discount as computed by the verifier, if it computed one.
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
}

impl CouponQuote {
    /// Compute the discount against `subtotal`.
    ///
    /// Fixed-amount discounts are limited to 90% of the subtotal and flagged
    /// `capped` when the limit is reached. Percentage discounts never exceed
    /// the subtotal.
    #[must_use]
    pub fn apply_to(&self, subtotal: Decimal) -> AppliedCoupon {
        let raw = self
            .discount_amount
            .unwrap_or_else(|| self.discount_type.raw_discount(self.discount_value, subtotal))
            .max(Decimal::ZERO);

        let (discount_amount, capped) = match self.discount_type {
            DiscountType::FixedAmount => {
                let cap = round_money(subtotal * FIXED_AMOUNT_CAP);
                if raw >= cap && !raw.is_zero() {
                    (cap, true)
                } else {
                    (raw, false)
                }
            }
            DiscountType::Percentage => (raw.min(subtotal), false),
        };

        AppliedCoupon {
            id: self.id.clone(),
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            discount_amount,
            final_amount: subtotal - discount_amount,
            capped,
        }
    }
}

/// The coupon currently applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub id: Option<CouponId>,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_amount: Decimal,
    /// Subtotal minus discount at application time.
    pub final_amount: Decimal,
    /// The discount hit the fixed-amount cap (shown to the shopper).
    pub capped: bool,
}

impl AppliedCoupon {
    /// Discount usable against the current subtotal, which may have shrunk
    /// since the coupon was applied.
    #[must_use]
    pub fn discount_against(&self, subtotal: Decimal) -> Decimal {
        self.discount_amount.min(subtotal.max(Decimal::ZERO))
    }
}

/// Reasons a coupon code is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Please enter a coupon code.")]
    EmptyCode,

    #[error("Invalid coupon code. Please try again.")]
    Invalid { code: String },

    #[error("Coupon {code} has expired.")]
    Expired { code: String },

    #[error("Add items worth at least {minimum} to use coupon {code}.")]
    BelowMinimum { code: String, minimum: Decimal },
}

/// An offline coupon definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponRule {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_subtotal: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponRule {
    #[must_use]
    pub fn new(code: impl Into<String>, discount_type: DiscountType, discount_value: Decimal) -> Self {
        Self {
            code: code.into(),
            discount_type,
            discount_value,
            min_subtotal: None,
            expires_at: None,
        }
    }

    /// Whether `code` names this coupon (trimmed, case-insensitive).
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// Check the rule against a subtotal at time `now`.
    ///
    /// # Errors
    ///
    /// Returns `CouponRejection::Expired` or `CouponRejection::BelowMinimum`.
    pub fn quote(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<CouponQuote, CouponRejection> {
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(CouponRejection::Expired {
                code: self.code.clone(),
            });
        }
        if let Some(minimum) = self.min_subtotal
            && subtotal < minimum
        {
            return Err(CouponRejection::BelowMinimum {
                code: self.code.clone(),
                minimum,
            });
        }
        Ok(CouponQuote {
            id: None,
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            discount_amount: None,
        })
    }
}
