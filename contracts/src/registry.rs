//! # Destination Registry
//!
//! Append-only arena of allocation destinations. A destination's index is
//! its position in the backing vector: indices are dense, zero-based, and
//! never reused or compacted. Destinations are never removed, only toggled
//! between active and inactive.
//!
//! ## Router Uniqueness
//!
//! Router identities are unique across every destination ever registered,
//! inactive ones included. Uniqueness is enforced case-insensitively so that
//! checksummed and lowercase spellings of the same address collide.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::adapter::AdapterError;
use crate::error::VaultError;
use crate::types::{Address, DestinationIndex};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One registered allocation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Stable position in the registry.
    pub index: DestinationIndex,
    /// Router used to swap and provide liquidity.
    pub router: Address,
    /// Farm the LP token is staked in.
    pub farm: Address,
    /// Pool identifier the router/farm pair expects.
    pub pool_id: u64,
    /// The intermediate LP token.
    pub lp_token: Address,
    /// Whether new deposits are routed here.
    pub active: bool,
}

/// Registration request for a destination that has no index yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDestination {
    /// Router identity. Must not collide with any registered router.
    pub router: Address,
    /// Farm identity.
    pub farm: Address,
    /// Pool identifier, verified against `lp_token` at registration.
    pub pool_id: u64,
    /// LP token identity.
    pub lp_token: Address,
}

impl NewDestination {
    /// Convenience constructor.
    pub fn new(
        router: impl Into<Address>,
        farm: impl Into<Address>,
        pool_id: u64,
        lp_token: impl Into<Address>,
    ) -> Self {
        Self {
            router: router.into(),
            farm: farm.into(),
            pool_id,
            lp_token: lp_token.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The destination arena.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationRegistry {
    destinations: Vec<Destination>,
    /// Normalized router identity -> index.
    routers: HashMap<Address, DestinationIndex>,
}

fn router_key(router: &str) -> Address {
    router.to_ascii_lowercase()
}

impl DestinationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new active destination and returns its index.
    ///
    /// `validate_pool` is the router's own lookup; it runs only after the
    /// duplicate check passes and must confirm that `pool_id` holds
    /// `lp_token`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DuplicateRouter`] if the router was registered
    /// before, [`VaultError::PoolMismatch`] if the lookup disagrees, and
    /// [`VaultError::AdapterFailure`] if the lookup itself failed.
    pub fn register<F>(
        &mut self,
        request: NewDestination,
        validate_pool: F,
    ) -> Result<DestinationIndex, VaultError>
    where
        F: FnOnce(&NewDestination) -> Result<bool, AdapterError>,
    {
        let key = router_key(&request.router);
        if self.routers.contains_key(&key) {
            return Err(VaultError::DuplicateRouter {
                router: request.router,
            });
        }

        if !validate_pool(&request)? {
            return Err(VaultError::PoolMismatch {
                router: request.router,
                pool_id: request.pool_id,
                lp_token: request.lp_token,
            });
        }

        let index = self.destinations.len();
        self.destinations.push(Destination {
            index,
            router: request.router,
            farm: request.farm,
            pool_id: request.pool_id,
            lp_token: request.lp_token,
            active: true,
        });
        self.routers.insert(key, index);
        Ok(index)
    }

    /// Sets the active flag of an existing destination.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidIndex`] if out of range and
    /// [`VaultError::NoStatusChange`] if the flag already has that value.
    pub fn set_active(&mut self, index: DestinationIndex, active: bool) -> Result<(), VaultError> {
        let count = self.destinations.len();
        let destination = self
            .destinations
            .get_mut(index)
            .ok_or(VaultError::InvalidIndex { index, count })?;
        if destination.active == active {
            return Err(VaultError::NoStatusChange { index, active });
        }
        destination.active = active;
        Ok(())
    }

    /// Returns the destination at `index`.
    pub fn get(&self, index: DestinationIndex) -> Result<&Destination, VaultError> {
        self.destinations.get(index).ok_or(VaultError::InvalidIndex {
            index,
            count: self.destinations.len(),
        })
    }

    /// Returns the destination at `index` if it exists and is active.
    pub fn get_active(&self, index: DestinationIndex) -> Result<&Destination, VaultError> {
        let destination = self.get(index)?;
        if !destination.active {
            return Err(VaultError::InactiveDestination(index));
        }
        Ok(destination)
    }

    /// Number of destinations currently flagged active.
    pub fn active_count(&self) -> usize {
        self.destinations.iter().filter(|d| d.active).count()
    }

    /// Snapshot of the active destinations in ascending index order.
    pub fn active(&self) -> Vec<Destination> {
        self.destinations
            .iter()
            .filter(|d| d.active)
            .cloned()
            .collect()
    }

    /// Every destination ever registered, in index order.
    pub fn all(&self) -> &[Destination] {
        &self.destinations
    }

    /// Number of destinations ever registered.
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
