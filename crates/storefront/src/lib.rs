//! GymFuel storefront cart and coupon state manager.
//!
//! This crate wires the pure cart logic of `gymfuel-core` to persistence:
//! durable local storage, the commerce REST API, configuration, logging and
//! error reporting.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gymfuel_storefront::{backend::LocalBackend, storage::FileStorage, store::CartStore};
//!
//! let storage = Arc::new(FileStorage::open(&config.storage_dir)?);
//! let store = CartStore::new(LocalBackend::new(storage), config.shipping);
//! store.hydrate().await?;
//! store.add_item(&product, 2, variant).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod backend;
pub mod config;
pub mod coupon;
pub mod error;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod wishlist;

pub use error::{Error, Result};
