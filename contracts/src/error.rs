//! # Vault Errors
//!
//! Every rejection the vault can produce. Each variant is an
//! operation-scoped failure: the vault state is exactly as it was before the
//! call that returned it.

use thiserror::Error;

use crate::adapter::AdapterError;
use crate::config::ConfigError;
use crate::types::{Address, DestinationIndex};

/// Errors returned by the vault's public operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    /// A destination with this router was registered before (active or not).
    #[error("router already exists: {router}")]
    DuplicateRouter {
        /// The rejected router identity.
        router: Address,
    },

    /// The router's own lookup says `pool_id` does not hold `lp_token`.
    #[error("LP tokens do not match: pool {pool_id} on router {router} is not {lp_token}")]
    PoolMismatch {
        /// Router that performed the lookup.
        router: Address,
        /// The pool identifier supplied at registration.
        pool_id: u64,
        /// The LP token supplied at registration.
        lp_token: Address,
    },

    /// No destination exists at this index.
    #[error("invalid destination index {index} (registered: {count})")]
    InvalidIndex {
        /// The requested index.
        index: DestinationIndex,
        /// Number of registered destinations.
        count: usize,
    },

    /// The destination already has the requested status.
    #[error("destination {index} is already {}", status_word(.active))]
    NoStatusChange {
        /// The destination index.
        index: DestinationIndex,
        /// The status that was requested (and already held).
        active: bool,
    },

    /// The destination exists but is not eligible for the requested role.
    #[error("destination {0} is inactive")]
    InactiveDestination(DestinationIndex),

    /// A deposit arrived while no destination is active.
    #[error("no active destinations to allocate to")]
    NoActiveDestinations,

    /// The caller holds no position at any destination.
    #[error("nothing to withdraw for {user}")]
    NothingToWithdraw {
        /// The caller.
        user: Address,
    },

    /// A fee sweep was requested with no accrued fees.
    #[error("no fees to collect")]
    NothingToSweep,

    /// The caller is not permitted to perform this operation.
    #[error("unauthorized: {caller} is not permitted to call {operation}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// Name of the guarded operation.
        operation: &'static str,
    },

    /// Deposits and withdrawals are suspended.
    #[error("vault is paused")]
    Paused,

    /// Pause or unpause requested while already in that state.
    #[error("vault is already {}", pause_word(.paused))]
    PauseUnchanged {
        /// The state that was requested (and already held).
        paused: bool,
    },

    /// Zero-amount deposits are rejected.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// A checked arithmetic operation overflowed.
    #[error("amount overflow: operation would exceed allowed limits")]
    AmountOverflow,

    /// The construction parameters were invalid.
    #[error("invalid vault configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The external swap/stake adapter failed; the operation was rolled back.
    #[error("adapter failure: {0}")]
    AdapterFailure(#[from] AdapterError),
}

fn status_word(active: &bool) -> &'static str {
    if *active {
        "active"
    } else {
        "inactive"
    }
}

fn pause_word(paused: &bool) -> &'static str {
    if *paused {
        "paused"
    } else {
        "unpaused"
    }
}

impl VaultError {
    /// Stable machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::DuplicateRouter { .. } => "duplicate_router",
            VaultError::PoolMismatch { .. } => "pool_mismatch",
            VaultError::InvalidIndex { .. } => "invalid_index",
            VaultError::NoStatusChange { .. } => "no_status_change",
            VaultError::InactiveDestination(_) => "inactive_destination",
            VaultError::NoActiveDestinations => "no_active_destinations",
            VaultError::NothingToWithdraw { .. } => "nothing_to_withdraw",
            VaultError::NothingToSweep => "nothing_to_sweep",
            VaultError::Unauthorized { .. } => "unauthorized",
            VaultError::Paused => "paused",
            VaultError::PauseUnchanged { .. } => "pause_unchanged",
            VaultError::ZeroAmount => "zero_amount",
            VaultError::AmountOverflow => "amount_overflow",
            VaultError::InvalidConfig(_) => "invalid_config",
            VaultError::AdapterFailure(AdapterError::SlippageExceeded { .. }) => {
                "slippage_exceeded"
            }
            VaultError::AdapterFailure(_) => "adapter_failure",
        }
    }
}
