//! Cart lines and the pure state transitions over them.
//!
//! Every transition is a plain function of the previous cart. Stores that
//! persist or sync carts build on [`Cart::apply`] so the local effect of a
//! mutation is defined in exactly one place.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, ProductId, ProductVariantId, VariantAttributes, VariantKey};

/// Product data captured when an item is added to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub slug: Option<String>,
    pub image: Option<String>,
    /// Unit price at add time.
    pub price: Decimal,
    /// Purchasable variant on the commerce API, when known.
    pub variant_id: Option<ProductVariantId>,
}

impl ProductSnapshot {
    /// Snapshot with just an id, a name and a price.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: None,
            image: None,
            price,
            variant_id: None,
        }
    }

    /// Attach the commerce API variant ID.
    #[must_use]
    pub fn with_variant_id(mut self, variant_id: impl Into<ProductVariantId>) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }
}

/// A single product + variant + quantity entry.
///
/// The serialized form uses the field names of the stored `cart` payload
/// (`id`, `price`, `size`, `flavor`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Unit price snapshot.
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(flatten)]
    pub variant: VariantAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<ProductVariantId>,
    /// Server-side line ID (remote mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_id: Option<CartItemId>,
}

impl CartLine {
    /// Build a line from a product snapshot. A quantity of 0 is treated as 1.
    #[must_use]
    pub fn from_product(product: &ProductSnapshot, quantity: u32, variant: VariantAttributes) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            image: product.image.clone(),
            unit_price: product.price,
            quantity: quantity.max(1),
            variant,
            variant_id: product.variant_id.clone(),
            line_id: None,
        }
    }

    /// Variant identity of this line.
    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        self.variant.key()
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, key: &VariantKey) -> bool {
        &self.product_id == product_id && &self.variant.key() == key
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A state transition on a [`Cart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Merge `line` into the cart, accumulating quantity on an existing key.
    Add(CartLine),
    /// Set the quantity of an existing line. Quantities below 1 are ignored.
    SetQuantity {
        product_id: ProductId,
        variant: VariantKey,
        quantity: u32,
    },
    /// Delete a line.
    Remove {
        product_id: ProductId,
        variant: VariantKey,
    },
    /// Delete every line.
    Clear,
}

impl CartMutation {
    /// Identity of the line this mutation targets, if it targets one.
    #[must_use]
    pub fn target(&self) -> Option<(ProductId, VariantKey)> {
        match self {
            Self::Add(line) => Some((line.product_id.clone(), line.variant_key())),
            Self::SetQuantity {
                product_id,
                variant,
                ..
            }
            | Self::Remove {
                product_id,
                variant,
            } => Some((product_id.clone(), variant.clone())),
            Self::Clear => None,
        }
    }
}

/// Ordered collection of cart lines.
///
/// Line order only matters for display. Subtotal and counts are always
/// recomputed from the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, enforcing the line invariants: lines with
    /// quantity 0 are dropped and duplicate keys are merged into the first
    /// occurrence.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity >= 1 {
                cart.apply(&CartMutation::Add(line));
            }
        }
        cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Find the line with the given identity.
    #[must_use]
    pub fn find(&self, product_id: &ProductId, key: &VariantKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(product_id, key))
    }

    fn find_mut(&mut self, product_id: &ProductId, key: &VariantKey) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.matches(product_id, key))
    }

    /// Add `quantity` of a product variant, accumulating onto an existing line.
    pub fn add_item(&mut self, product: &ProductSnapshot, quantity: u32, variant: VariantAttributes) {
        self.apply(&CartMutation::Add(CartLine::from_product(
            product, quantity, variant,
        )));
    }

    /// Set the quantity of a line. Returns `false` (and changes nothing) when
    /// the quantity is below 1 or the line does not exist.
    pub fn update_quantity(&mut self, product_id: &ProductId, key: &VariantKey, quantity: u32) -> bool {
        self.apply(&CartMutation::SetQuantity {
            product_id: product_id.clone(),
            variant: key.clone(),
            quantity,
        })
    }

    /// Remove a line. Returns `false` if there was no such line.
    pub fn remove_item(&mut self, product_id: &ProductId, key: &VariantKey) -> bool {
        self.apply(&CartMutation::Remove {
            product_id: product_id.clone(),
            variant: key.clone(),
        })
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.apply(&CartMutation::Clear);
    }

    /// Apply a mutation. Returns whether the cart changed.
    pub fn apply(&mut self, mutation: &CartMutation) -> bool {
        match mutation {
            CartMutation::Add(line) => {
                let key = line.variant_key();
                let quantity = line.quantity.max(1);
                if let Some(existing) = self.find_mut(&line.product_id, &key) {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                    if existing.line_id.is_none() {
                        existing.line_id.clone_from(&line.line_id);
                    }
                    if existing.variant_id.is_none() {
                        existing.variant_id.clone_from(&line.variant_id);
                    }
                } else {
                    let mut line = line.clone();
                    line.quantity = quantity;
                    self.lines.push(line);
                }
                true
            }
            CartMutation::SetQuantity {
                product_id,
                variant,
                quantity,
            } => {
                if *quantity < 1 {
                    return false;
                }
                match self.find_mut(product_id, variant) {
                    Some(line) if line.quantity != *quantity => {
                        line.quantity = *quantity;
                        true
                    }
                    _ => false,
                }
            }
            CartMutation::Remove {
                product_id,
                variant,
            } => {
                let before = self.lines.len();
                self.lines.retain(|l| !l.matches(product_id, variant));
                self.lines.len() != before
            }
            CartMutation::Clear => {
                let changed = !self.lines.is_empty();
                self.lines.clear();
                changed
            }
        }
    }

    /// Σ(unit price × quantity).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Whether both carts hold the same lines, ignoring order.
    #[must_use]
    pub fn same_contents(&self, other: &Self) -> bool {
        self.lines.len() == other.lines.len()
            && self.lines.iter().all(|line| {
                other
                    .find(&line.product_id, &line.variant_key())
                    .is_some_and(|o| o.quantity == line.quantity && o.unit_price == line.unit_price)
            })
    }
}
