//! Wishlist: an insertion-ordered set of product IDs.

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    items: Vec<ProductId>,
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a wishlist, dropping duplicate IDs.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let mut wishlist = Self::new();
        for id in ids {
            wishlist.add(id);
        }
        wishlist
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.contains(id)
    }

    /// Add a product. Returns `false` if it was already present.
    pub fn add(&mut self, id: ProductId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.items.push(id);
        true
    }

    /// Remove a product. Returns `false` if it was not present.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item != id);
        self.items.len() != before
    }

    /// Flip membership. Returns whether the product is now in the wishlist.
    pub fn toggle(&mut self, id: ProductId) -> bool {
        if self.remove(&id) {
            false
        } else {
            self.items.push(id);
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductId> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_membership() {
        let mut wishlist = Wishlist::from_ids(["a".into(), "b".into()]);
        let original = wishlist.clone();

        assert!(!wishlist.toggle("a".into()));
        assert!(wishlist.toggle("a".into()));
        assert!(wishlist.contains(&"a".into()));
        assert_eq!(wishlist.len(), original.len());

        assert!(wishlist.toggle("c".into()));
        assert!(!wishlist.toggle("c".into()));
        assert!(!wishlist.contains(&"c".into()));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut wishlist = Wishlist::new();
        assert!(wishlist.add("a".into()));
        assert!(!wishlist.add("a".into()));
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_from_ids_dedupes() {
        let wishlist = Wishlist::from_ids(["a".into(), "a".into(), "b".into()]);
        assert_eq!(wishlist.len(), 2);
    }

    #[test]
    fn test_remove_missing() {
        let mut wishlist = Wishlist::new();
        assert!(!wishlist.remove(&"x".into()));
        assert!(wishlist.is_empty());
    }
}
