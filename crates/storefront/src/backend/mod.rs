//! Cart persistence backends.
//!
//! A [`CartBackend`] decides where the authoritative cart lives:
//! - [`LocalBackend`] - durable local storage, no network
//! - [`RemoteBackend`] - the commerce API; local state is an optimistic cache
//!   reconciled against server fetches

mod local;
mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use std::future::Future;
use std::str::FromStr;

use gymfuel_core::{Cart, CartMutation};

use crate::error::StoreError;

/// Which side holds the authoritative cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartMode {
    #[default]
    Local,
    Remote,
}

impl std::fmt::Display for CartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for CartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" | "api" => Ok(Self::Remote),
            other => Err(format!("unknown cart mode: {other} (expected local or remote)")),
        }
    }
}

/// Persistence seam used by [`CartStore`](crate::store::CartStore).
pub trait CartBackend: Send + Sync + 'static {
    /// Whether local state must be reconciled against [`fetch`](Self::fetch)
    /// after each mutation.
    fn reconciles(&self) -> bool;

    /// Load the authoritative cart.
    fn fetch(&self) -> impl Future<Output = Result<Cart, StoreError>> + Send;

    /// Load the authoritative cart with a read issued now. Never shares the
    /// result of a load that started earlier, so the returned cart reflects
    /// every mutation already accepted.
    fn fetch_latest(&self) -> impl Future<Output = Result<Cart, StoreError>> + Send {
        self.fetch()
    }

    /// Send `mutation` to the authoritative side. `before` is the local cart
    /// the mutation will be applied to.
    fn submit(
        &self,
        before: &Cart,
        mutation: &CartMutation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write the post-mutation cart to durable storage. Never fails.
    fn persist(&self, cart: &Cart);
}
