//! # Position Ledger
//!
//! Per-user, per-destination claims. A [`UserPosition`] accumulates across
//! deposits into the same destination and is cleared in full on withdrawal;
//! there is no partial withdrawal.
//!
//! Positions are kept per user in a `BTreeMap` keyed by destination index so
//! that every traversal (withdrawal, reward aggregation) runs in ascending
//! index order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::adapter::{SwapStakeAdapter, UnwindRequest};
use crate::config::Slippage;
use crate::error::VaultError;
use crate::registry::{Destination, DestinationRegistry};
use crate::types::{Address, Amount, DestinationIndex};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One user's claim against one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPosition {
    /// Accumulated LP tokens attributed to the user at this destination.
    pub lp_amount: Amount,
    /// Unconverted base asset held for the user until withdrawal.
    pub excess: Amount,
    /// Farm rewards that had accrued to `lp_amount` before it was staked.
    pub reward_debt: Amount,
    /// Whether the user currently holds a position here.
    pub participating: bool,
}

/// Additive change to one position produced by a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDelta {
    /// Destination the delta applies to.
    pub index: DestinationIndex,
    /// LP tokens to add.
    pub lp_amount: Amount,
    /// Excess base asset to add.
    pub excess: Amount,
    /// Reward debt to add.
    pub reward_debt: Amount,
}

/// Proceeds of unwinding one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwoundPosition {
    /// Destination that was unwound.
    pub index: DestinationIndex,
    /// The position as it stood before clearing.
    pub position: UserPosition,
    /// Base asset returned by the adapter.
    pub proceeds: Amount,
}

/// Outcome of a full withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Per-destination breakdown in ascending index order.
    pub legs: Vec<UnwoundPosition>,
    /// Sum of all proceeds.
    pub total: Amount,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// All user positions held by the vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionLedger {
    positions: HashMap<Address, BTreeMap<DestinationIndex, UserPosition>>,
}

impl PositionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a batch of deltas atomically: every sum is computed with
    /// checked arithmetic before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AmountOverflow`] if any position would overflow,
    /// in which case the ledger is untouched.
    pub fn record_deposits(&mut self, user: &str, deltas: &[PositionDelta]) -> Result<(), VaultError> {
        let existing = self.positions.get(user);
        let mut updated: BTreeMap<DestinationIndex, UserPosition> = BTreeMap::new();

        for delta in deltas {
            let current = updated
                .get(&delta.index)
                .copied()
                .or_else(|| existing.and_then(|p| p.get(&delta.index)).copied())
                .unwrap_or_default();
            let next = UserPosition {
                lp_amount: current
                    .lp_amount
                    .checked_add(delta.lp_amount)
                    .ok_or(VaultError::AmountOverflow)?,
                excess: current
                    .excess
                    .checked_add(delta.excess)
                    .ok_or(VaultError::AmountOverflow)?,
                reward_debt: current
                    .reward_debt
                    .checked_add(delta.reward_debt)
                    .ok_or(VaultError::AmountOverflow)?,
                participating: true,
            };
            updated.insert(delta.index, next);
        }

        if updated.is_empty() {
            return Ok(());
        }
        self.positions
            .entry(user.to_string())
            .or_default()
            .extend(updated);
        Ok(())
    }

    /// Returns the user's position at `index`, zero-valued if none exists.
    pub fn position_of(&self, user: &str, index: DestinationIndex) -> UserPosition {
        self.positions
            .get(user)
            .and_then(|p| p.get(&index))
            .copied()
            .unwrap_or_default()
    }

    /// Returns `true` if the user holds a position at `index`.
    pub fn is_participating(&self, user: &str, index: DestinationIndex) -> bool {
        self.position_of(user, index).participating
    }

    /// The user's participating positions in ascending index order.
    pub fn participating(&self, user: &str) -> Vec<(DestinationIndex, UserPosition)> {
        self.positions
            .get(user)
            .map(|p| {
                p.iter()
                    .filter(|(_, pos)| pos.participating)
                    .map(|(&i, &pos)| (i, pos))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Unwinds every participating position of `user` through `adapter`,
    /// sums the proceeds, and clears the positions.
    ///
    /// Positions are unwound regardless of the destination's current active
    /// flag. Reward proceeds are converted through `swap_route`, and every
    /// unwind is bounded by `slippage`. Nothing is
    /// cleared unless every unwind succeeds; rolling back the adapter's own
    /// state on failure is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NothingToWithdraw`] if the user participates
    /// nowhere, [`VaultError::AdapterFailure`] if any unwind fails, and
    /// [`VaultError::AmountOverflow`] if the proceeds overflow.
    pub fn withdraw_all<A: SwapStakeAdapter>(
        &mut self,
        user: &str,
        registry: &DestinationRegistry,
        swap_route: &Destination,
        slippage: Slippage,
        adapter: &mut A,
    ) -> Result<Withdrawal, VaultError> {
        let held = self.participating(user);
        if held.is_empty() {
            return Err(VaultError::NothingToWithdraw {
                user: user.to_string(),
            });
        }

        let mut legs = Vec::with_capacity(held.len());
        let mut total: Amount = 0;
        for (index, position) in held {
            let destination = registry.get(index)?;
            let proceeds = adapter.unwind(UnwindRequest {
                destination,
                swap_route,
                lp_amount: position.lp_amount,
                excess: position.excess,
                reward_debt: position.reward_debt,
                slippage,
            })?;
            total = total
                .checked_add(proceeds)
                .ok_or(VaultError::AmountOverflow)?;
            legs.push(UnwoundPosition {
                index,
                position,
                proceeds,
            });
        }

        self.positions.remove(user);
        Ok(Withdrawal { legs, total })
    }

    /// Sums the adapter's pending rewards over the user's positions.
    /// Never mutates state.
    pub fn earned_rewards<A: SwapStakeAdapter>(
        &self,
        user: &str,
        registry: &DestinationRegistry,
        adapter: &A,
    ) -> Result<Amount, VaultError> {
        let mut total: Amount = 0;
        for (index, position) in self.participating(user) {
            let destination = registry.get(index)?;
            let reward =
                adapter.pending_reward(destination, position.lp_amount, position.reward_debt)?;
            total = total.checked_add(reward).ok_or(VaultError::AmountOverflow)?;
        }
        Ok(total)
    }

    /// Number of users holding at least one position.
    pub fn user_count(&self) -> usize {
        self.positions
            .values()
            .filter(|p| p.values().any(|pos| pos.participating))
            .count()
    }

    /// Total excess held across all users and destinations.
    pub fn total_excess(&self) -> Amount {
        self.positions
            .values()
            .flat_map(|p| p.values())
            .fold(0, |acc: Amount, pos| acc.saturating_add(pos.excess))
    }
}
