//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `GYMFUEL_API_URL` - Commerce API base URL (default: `http://localhost:4000/api`)
//! - `GYMFUEL_CART_MODE` - `local` or `remote` (default: local)
//! - `GYMFUEL_STORAGE_DIR` - Directory for the local store (default: .gymfuel)
//! - `GYMFUEL_ACCESS_TOKEN` - Session token sent as the `accessToken` cookie
//! - `GYMFUEL_CURRENCY` - Display currency (default: INR)
//! - `GYMFUEL_FREE_SHIPPING_THRESHOLD` - Subtotal from which shipping is free (default: 999)
//! - `GYMFUEL_SHIPPING_FLAT_RATE` - Shipping below the threshold (default: 99)
//! - `GYMFUEL_COUPONS` - Offline coupon catalog, `CODE:type:value[:min]` separated by commas
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use gymfuel_core::{CouponRule, CurrencyCode, DiscountType, ShippingPolicy};

use crate::backend::CartMode;

const DEFAULT_API_URL: &str = "http://localhost:4000/api";
const DEFAULT_STORAGE_DIR: &str = ".gymfuel";
const DEFAULT_COUPONS: &str = "WELCOME10:percentage:10,GYMFUEL20:percentage:20";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Commerce API connection
    pub api: ApiConfig,
    /// Which side holds the authoritative cart
    pub cart_mode: CartMode,
    /// Directory of the file-backed local store
    pub storage_dir: PathBuf,
    /// Display currency
    pub currency: CurrencyCode,
    pub shipping: ShippingPolicy,
    /// Offline coupon catalog
    pub coupons: Vec<CouponRule>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Commerce API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ApiConfig {
    /// Configuration for `base_url` without credentials.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("GYMFUEL_API_URL", base_url)?,
            access_token: None,
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or the access token
    /// fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let base_url = parse_url(
            "GYMFUEL_API_URL",
            &env.get_or_default("GYMFUEL_API_URL", DEFAULT_API_URL),
        )?;
        let access_token = match env.get_optional("GYMFUEL_ACCESS_TOKEN") {
            Some(token) => {
                validate_secret_strength(&token, "GYMFUEL_ACCESS_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };

        let cart_mode = env
            .get_or_default("GYMFUEL_CART_MODE", "local")
            .parse::<CartMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("GYMFUEL_CART_MODE".to_string(), e))?;
        let storage_dir = PathBuf::from(env.get_or_default("GYMFUEL_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let currency = env
            .get_or_default("GYMFUEL_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("GYMFUEL_CURRENCY".to_string(), e.to_string())
            })?;

        let defaults = ShippingPolicy::default();
        let shipping = ShippingPolicy {
            free_threshold: env.get_money("GYMFUEL_FREE_SHIPPING_THRESHOLD", defaults.free_threshold)?,
            flat_rate: env.get_money("GYMFUEL_SHIPPING_FLAT_RATE", defaults.flat_rate)?,
        };

        let coupons = parse_coupon_catalog(&env.get_or_default("GYMFUEL_COUPONS", DEFAULT_COUPONS))
            .map_err(|e| ConfigError::InvalidEnvVar("GYMFUEL_COUPONS".to_string(), e))?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                access_token,
            },
            cart_mode,
            storage_dir,
            currency,
            shipping,
            coupons,
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }
}

/// Parse a coupon catalog of comma-separated `CODE:type:value[:min]` entries.
///
/// `type` is `percentage` (or `percent`) or `fixed` (or `fixed_amount`).
///
/// # Errors
///
/// Returns a description of the first malformed entry.
pub fn parse_coupon_catalog(raw: &str) -> Result<Vec<CouponRule>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_coupon_rule)
        .collect()
}

fn parse_coupon_rule(entry: &str) -> Result<CouponRule, String> {
    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    let (code, kind, value, min) = match parts.as_slice() {
        [code, kind, value] => (*code, *kind, *value, None),
        [code, kind, value, min] => (*code, *kind, *value, Some(*min)),
        _ => return Err(format!("{entry:?} is not CODE:type:value[:min]")),
    };

    if code.is_empty() {
        return Err(format!("{entry:?} has an empty code"));
    }
    let discount_type = match kind.to_lowercase().as_str() {
        "percentage" | "percent" => DiscountType::Percentage,
        "fixed" | "fixed_amount" => DiscountType::FixedAmount,
        other => return Err(format!("unknown discount type {other:?} in {entry:?}")),
    };
    let value = parse_money(value).ok_or_else(|| format!("invalid value in {entry:?}"))?;
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(format!("percentage above 100 in {entry:?}"));
    }

    let mut rule = CouponRule::new(code.to_uppercase(), discount_type, value);
    if let Some(min) = min {
        rule.min_subtotal =
            Some(parse_money(min).ok_or_else(|| format!("invalid minimum in {entry:?}"))?);
    }
    Ok(rule)
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable. Blank values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a non-negative amount of money.
    fn get_money(&self, key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
        match self.get_optional(key) {
            Some(raw) => parse_money(&raw).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    key.to_string(),
                    format!("{raw:?} is not a non-negative amount"),
                )
            }),
            None => Ok(default),
        }
    }
}

fn parse_money(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim())
        .ok()
        .filter(|d| !d.is_sign_negative())
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the token from a signed-in session."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:4000/api");
        assert!(config.api.access_token.is_none());
        assert_eq!(config.cart_mode, CartMode::Local);
        assert_eq!(config.storage_dir, PathBuf::from(".gymfuel"));
        assert_eq!(config.currency, CurrencyCode::INR);
        assert_eq!(config.shipping, ShippingPolicy::default());
        assert_eq!(config.coupons.len(), 2);
        assert!(config.coupons[0].matches("welcome10"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("GYMFUEL_API_URL", "https://shop.test/api"),
            ("GYMFUEL_CART_MODE", "remote"),
            ("GYMFUEL_CURRENCY", "usd"),
            ("GYMFUEL_FREE_SHIPPING_THRESHOLD", "50"),
            ("GYMFUEL_SHIPPING_FLAT_RATE", "4.99"),
            ("GYMFUEL_COUPONS", ""),
            ("SENTRY_DSN", "https://key@sentry.test/1"),
        ])
        .unwrap();
        assert_eq!(config.cart_mode, CartMode::Remote);
        assert_eq!(config.currency, CurrencyCode::USD);
        assert_eq!(config.shipping.free_threshold, Decimal::from(50));
        assert_eq!(config.shipping.flat_rate, Decimal::new(499, 2));
        // Blank counts as unset.
        assert_eq!(config.coupons.len(), 2);
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("GYMFUEL_CART_MODE", "cloud")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "GYMFUEL_CART_MODE"
        ));
        assert!(load(&[("GYMFUEL_API_URL", "not a url")]).is_err());
        assert!(load(&[("GYMFUEL_SHIPPING_FLAT_RATE", "-5")]).is_err());
        assert!(load(&[("GYMFUEL_CURRENCY", "XYZ")]).is_err());
    }

    #[test]
    fn test_parse_coupon_catalog() {
        let rules = parse_coupon_catalog("welcome10:percentage:10, FLAT500:fixed:500:2000").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].code, "WELCOME10");
        assert_eq!(rules[1].discount_type, DiscountType::FixedAmount);
        assert_eq!(rules[1].min_subtotal, Some(Decimal::from(2000)));
    }

    #[test]
    fn test_parse_coupon_catalog_errors() {
        assert!(parse_coupon_catalog("BROKEN").is_err());
        assert!(parse_coupon_catalog("X:bogo:1").is_err());
        assert!(parse_coupon_catalog("X:percentage:150").is_err());
        assert!(parse_coupon_catalog(":fixed:10").is_err());
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_access_token_placeholder_rejected() {
        let result = load(&[("GYMFUEL_ACCESS_TOKEN", "your-token-here")]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_access_token_low_entropy_rejected() {
        let result = load(&[("GYMFUEL_ACCESS_TOKEN", "aaaaaaaaaaaaaaaaaaaaaaaa")]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_access_token_accepted() {
        let config = load(&[("GYMFUEL_ACCESS_TOKEN", "eyJhbGciOi.J9kQ2mX7pLw4Rz")]).unwrap();
        assert_eq!(
            config.api.access_token.as_ref().map(ExposeSecret::expose_secret),
            Some("eyJhbGciOi.J9kQ2mX7pLw4Rz")
        );
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let config = ApiConfig {
            base_url: Url::parse("https://shop.test/api").unwrap(),
            access_token: Some(SecretString::from("tok_9fK2xLq7Zp3Wm")),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("https://shop.test/api"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_9fK2xLq7Zp3Wm"));
    }
}
