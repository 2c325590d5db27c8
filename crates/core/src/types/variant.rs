//! Selectable product attributes and the key derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attributes a shopper picks before adding a product (e.g. size, flavor).
///
/// Two lines for the same product with different attributes are distinct
/// cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantAttributes {
    /// Pack size, e.g. "1kg".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Flavor, e.g. "Chocolate".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
}

impl VariantAttributes {
    /// Create attributes from optional size and flavor.
    ///
    /// Blank strings are treated as "not selected".
    #[must_use]
    pub fn new(size: Option<String>, flavor: Option<String>) -> Self {
        Self {
            size: size.filter(|s| !s.trim().is_empty()),
            flavor: flavor.filter(|f| !f.trim().is_empty()),
        }
    }

    /// Derive the identity key for these attributes.
    #[must_use]
    pub fn key(&self) -> VariantKey {
        VariantKey {
            size: self.size.clone(),
            flavor: self.flavor.clone(),
        }
    }
}

/// Identity of a variant within a product: the combination of selected
/// attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    size: Option<String>,
    flavor: Option<String>,
}

impl VariantKey {
    /// Build a key directly from size and flavor.
    #[must_use]
    pub fn new(size: Option<&str>, flavor: Option<&str>) -> Self {
        VariantAttributes::new(size.map(String::from), flavor.map(String::from)).key()
    }

    /// Selected size, if any.
    #[must_use]
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    /// Selected flavor, if any.
    #[must_use]
    pub fn flavor(&self) -> Option<&str> {
        self.flavor.as_deref()
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.size.as_deref().unwrap_or("-"),
            self.flavor.as_deref().unwrap_or("-")
        )
    }
}
