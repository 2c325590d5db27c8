//! Durable client-side key/value storage.
//!
//! Mirrors the browser `localStorage` contract: string keys, string (JSON)
//! values, synchronous access. Two implementations ship:
//! - [`FileStorage`] - one JSON file per key in a directory
//! - [`MemoryStorage`] - process-local map, used by tests and remote mode
//!
//! Reads go through [`load_cart`] / [`load_wishlist`], which never fail:
//! missing, corrupt or non-array payloads are logged and replaced by an empty
//! value. Writes go through [`save_json`], which logs failures instead of
//! returning them.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use gymfuel_core::{Cart, CartLine, ProductId, Wishlist};

/// Storage keys.
pub mod keys {
    /// JSON array of cart lines.
    pub const CART: &str = "cart";

    /// JSON array of product IDs.
    pub const WISHLIST: &str = "wishlist";
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// A synchronous string key/value store.
pub trait Storage: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Serialize `value` and store it under `key`.
///
/// Failures are logged and swallowed: in-memory state stays authoritative for
/// the running process.
pub fn save_json<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Failed to serialize value for storage");
            return;
        }
    };
    if let Err(e) = storage.set_item(key, &raw) {
        warn!(key, error = %e, "Failed to write to storage");
    }
}

/// Load the stored cart.
///
/// Unreadable entries are skipped; the surviving lines are normalized
/// (quantity ≥ 1, one line per product/variant).
pub fn load_cart(storage: &dyn Storage) -> Cart {
    let lines = load_array(storage, keys::CART)
        .into_iter()
        .filter_map(|entry| decode_entry::<CartLine>(keys::CART, entry))
        .collect::<Vec<_>>();
    Cart::from_lines(lines)
}

/// Load the stored wishlist.
///
/// Entries may be bare product IDs or objects carrying an `id` field.
pub fn load_wishlist(storage: &dyn Storage) -> Wishlist {
    let ids = load_array(storage, keys::WISHLIST)
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(mut product) => product
                .remove("id")
                .and_then(|id| decode_entry::<ProductId>(keys::WISHLIST, id)),
            other => decode_entry::<ProductId>(keys::WISHLIST, other),
        });
    Wishlist::from_ids(ids)
}

/// Read `key` as a JSON array. Anything else yields an empty vector.
fn load_array(storage: &dyn Storage, key: &str) -> Vec<Value> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read from storage, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(key, kind = json_kind(&other), "Stored payload is not an array, resetting");
            Vec::new()
        }
        Err(e) => {
            warn!(key, error = %e, "Stored payload is not valid JSON, resetting");
            Vec::new()
        }
    }
}

fn decode_entry<T: DeserializeOwned>(key: &str, entry: Value) -> Option<T> {
    match serde_json::from_value(entry) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "Skipping unreadable stored entry");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gymfuel_core::{ProductSnapshot, VariantAttributes};
    use rust_decimal::Decimal;

    use super::*;

    fn stored(key: &str, raw: &str) -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.set_item(key, raw).unwrap();
        storage
    }

    #[test]
    fn test_missing_cart_is_empty() {
        assert!(load_cart(&MemoryStorage::new()).is_empty());
    }

    #[test]
    fn test_non_array_cart_resets_to_empty() {
        for raw in [r#"{"id": "whey"}"#, "42", "\"cart\"", "null", "not json at all"] {
            let storage = stored(keys::CART, raw);
            assert!(load_cart(&storage).is_empty(), "payload {raw} should reset");
        }
    }

    #[test]
    fn test_cart_round_trip() {
        let storage = MemoryStorage::new();
        let mut cart = Cart::new();
        cart.add_item(
            &ProductSnapshot::new("whey", "Whey", Decimal::new(2499, 0)),
            2,
            VariantAttributes::new(Some("1kg".to_string()), None),
        );
        save_json(&storage, keys::CART, &cart);
        assert_eq!(load_cart(&storage), cart);
    }

    #[test]
    fn test_cart_skips_bad_entries_and_normalizes() {
        let storage = stored(
            keys::CART,
            r#"[
                {"id": "a", "name": "A", "price": 10, "quantity": 2},
                {"id": "b", "name": "B", "price": "oops", "quantity": 1},
                {"id": "c", "name": "C", "price": 5, "quantity": 0},
                {"id": "a", "name": "A", "price": 10, "quantity": 1},
                "garbage"
            ]"#,
        );
        let cart = load_cart(&storage);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.subtotal(), Decimal::from(30));
    }

    #[test]
    fn test_wishlist_accepts_ids_and_products() {
        let storage = stored(
            keys::WISHLIST,
            r#"["a", 7, {"id": "b", "name": "Bar"}, {"name": "no id"}, "a"]"#,
        );
        let wishlist = load_wishlist(&storage);
        let ids: Vec<&str> = wishlist.iter().map(ProductId::as_str).collect();
        assert_eq!(ids, vec!["a", "7", "b"]);
    }

    #[test]
    fn test_non_array_wishlist_resets() {
        let storage = stored(keys::WISHLIST, r#"{"a": true}"#);
        assert!(load_wishlist(&storage).is_empty());
    }
}
