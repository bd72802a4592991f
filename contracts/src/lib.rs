// Copyright (c) 2026 Pacific DeFi Contributors. MIT License.
// See LICENSE for details.

//! # Pacific Vault
//!
//! A pooled-capital allocator. Users deposit a base asset into a shared
//! vault; the vault keeps a protocol fee, splits the rest evenly across a
//! registry of yield-bearing destinations (router + farm + pool), and tracks
//! every user's LP and unconverted excess per destination. Withdrawal
//! unwinds every position, harvests farm rewards, and returns the proceeds.
//!
//! ## Architecture
//!
//! ```text
//! registry.rs   — append-only destination arena, router uniqueness, toggling
//! adapter.rs    — capability trait for the external swap/stake services,
//!                 slippage-bounded conversions and reward-debt accounting
//! allocation.rs — even split of net capital, rounding remainder as excess
//! ledger.rs     — per-user, per-destination positions; withdrawal; rewards
//! fees.rs       — fee computation, accrual and sweep
//! vault.rs      — the public surface: access control, pause, atomicity
//! events.rs     — buffered record of committed state changes
//! simulated.rs  — deterministic in-memory adapter for tests and local runs
//! ```
//!
//! ## Design Principles
//!
//! 1. Amounts are 18-decimal fixed-point `u128`. No floating point, and
//!    every sum is `checked_*`.
//! 2. Conservation: for every deposit, `fee + Σ allocated == gross`. The
//!    rounding remainder of the even split is booked as excess, never lost.
//! 3. Operations are all-or-nothing. A failing external call rolls the
//!    adapter back to its checkpoint and leaves the ledger untouched.
//! 4. No globals. The vault is an explicit value; the adapter is injected.

pub mod adapter;
pub mod allocation;
pub mod config;
pub mod error;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod registry;
pub mod simulated;
pub mod types;
pub mod vault;

pub use adapter::{AdapterError, Conversion, SwapStakeAdapter, UnwindRequest};
pub use allocation::{Allocation, AllocationLeg};
pub use config::{ConfigError, Slippage, VaultConfig, DEFAULT_SLIPPAGE};
pub use error::VaultError;
pub use events::{VaultEvent, VaultEventKind};
pub use fees::FeeSweep;
pub use ledger::{UserPosition, Withdrawal};
pub use registry::{Destination, NewDestination};
pub use simulated::{SimulatedAdapter, SimulatedPool};
pub use types::{Address, Amount, DestinationIndex};
pub use vault::{Vault, VaultState};
