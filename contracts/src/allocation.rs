//! # Allocation Engine
//!
//! Splits a deposit's net capital evenly across the active destinations and
//! converts each share through the adapter.
//!
//! ## Rounding
//!
//! `share = net / active_count` truncates. The remainder
//! `net - share * active_count` is strictly less than `active_count` and is
//! booked as excess on the first active destination (lowest index), so it
//! is returned at withdrawal rather than lost. For every deposit:
//!
//! ```text
//! fee + Σ leg.allocated == gross
//! ```
//!
//! and for every leg, `leg.excess <= leg.allocated`. A conversion that
//! mints no LP must hand the whole share back as excess; anything else
//! would lose capital without a position to show for it.

use serde::{Deserialize, Serialize};

use crate::adapter::{AdapterError, Conversion, SwapStakeAdapter};
use crate::config::Slippage;
use crate::error::VaultError;
use crate::fees::FeeSplit;
use crate::ledger::PositionDelta;
use crate::registry::Destination;
use crate::types::{Amount, DestinationIndex};

/// How a net amount divides across `active_count` destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharePlan {
    /// Amount handed to the adapter for every destination.
    pub share: Amount,
    /// Rounding remainder booked as excess on the first destination.
    pub remainder: Amount,
}

/// Divides `net` evenly across `active_count` destinations.
///
/// # Errors
///
/// Returns [`VaultError::NoActiveDestinations`] if `active_count` is zero.
pub fn plan_shares(net: Amount, active_count: usize) -> Result<SharePlan, VaultError> {
    if active_count == 0 {
        return Err(VaultError::NoActiveDestinations);
    }
    let count = active_count as Amount;
    let share = net / count;
    Ok(SharePlan {
        share,
        remainder: net - share * count,
    })
}

/// What one destination received from a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLeg {
    /// Destination index.
    pub index: DestinationIndex,
    /// Base asset attributed to this destination (share, plus the rounding
    /// remainder on the first leg).
    pub allocated: Amount,
    /// LP tokens credited to the user.
    pub lp_delta: Amount,
    /// Base asset credited to the user as excess.
    pub excess_delta: Amount,
    /// Reward debt of the LP minted for this leg.
    pub reward_debt_delta: Amount,
}

/// Full breakdown of one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Amount the user deposited.
    pub gross: Amount,
    /// Protocol fee retained.
    pub fee: Amount,
    /// Capital allocated across destinations.
    pub net: Amount,
    /// Per-destination results in ascending index order.
    pub legs: Vec<AllocationLeg>,
}

impl Allocation {
    /// Sum of all leg allocations. Equals `net`.
    pub fn allocated_total(&self) -> Amount {
        self.legs.iter().map(|l| l.allocated).sum()
    }

    /// Ledger deltas for the legs that produced a position.
    pub fn position_deltas(&self) -> Vec<PositionDelta> {
        self.legs
            .iter()
            .filter(|l| l.lp_delta > 0 || l.excess_delta > 0)
            .map(|l| PositionDelta {
                index: l.index,
                lp_amount: l.lp_delta,
                excess: l.excess_delta,
                reward_debt: l.reward_debt_delta,
            })
            .collect()
    }
}

/// Rejects conversions that report more than they were given, or that
/// consumed part of the input without minting LP.
fn check_conversion(
    destination: &Destination,
    input: Amount,
    conversion: Conversion,
) -> Result<Conversion, AdapterError> {
    let lost_without_lp = conversion.lp_amount == 0 && conversion.excess < input;
    if conversion.excess > input || lost_without_lp {
        return Err(AdapterError::InvalidConversion {
            router: destination.router.clone(),
            input,
            lp_amount: conversion.lp_amount,
            excess: conversion.excess,
        });
    }
    Ok(conversion)
}

/// Converts the net part of `split` across `active` destinations.
///
/// `active` must be the registry's active snapshot in ascending index order.
/// The adapter is called once per destination with a non-zero share. No
/// ledger or fee state is touched here; on error the caller is expected to
/// restore the adapter to its pre-call checkpoint.
pub fn allocate<A: SwapStakeAdapter>(
    adapter: &mut A,
    active: &[Destination],
    gross: Amount,
    split: FeeSplit,
    slippage: Slippage,
) -> Result<Allocation, VaultError> {
    let plan = plan_shares(split.net, active.len())?;

    let mut legs = Vec::with_capacity(active.len());
    for (position, destination) in active.iter().enumerate() {
        let conversion = if plan.share == 0 {
            Conversion::default()
        } else {
            let c = adapter.convert(destination, plan.share, slippage)?;
            check_conversion(destination, plan.share, c)?
        };

        let (allocated, excess_delta) = if position == 0 {
            (
                plan.share + plan.remainder,
                conversion.excess + plan.remainder,
            )
        } else {
            (plan.share, conversion.excess)
        };

        legs.push(AllocationLeg {
            index: destination.index,
            allocated,
            lp_delta: conversion.lp_amount,
            excess_delta,
            reward_debt_delta: conversion.reward_debt,
        });
    }

    Ok(Allocation {
        gross,
        fee: split.fee,
        net: split.net,
        legs,
    })
}
