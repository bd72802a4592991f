//! # Swap/Stake Adapter
//!
//! The vault never talks to routers or farms directly. Everything external
//! goes through a [`SwapStakeAdapter`]: converting base asset into a staked
//! LP position, unwinding it back, querying pending farm rewards, and
//! verifying a pool at registration time.
//!
//! Conversions and unwinds carry a [`Slippage`] tolerance. The adapter
//! quotes the operation, executes it, and fails with
//! [`AdapterError::SlippageExceeded`] if the executed output falls below
//! `slippage.min_out(quote)`.
//!
//! Farm rewards are tracked with a reward-per-share index. Each conversion
//! reports the `reward_debt` of the LP it minted (the share of rewards
//! already accrued before the position existed); the caller stores it with
//! the position and hands it back on reward queries and unwinds.
//!
//! Adapter calls are synchronous and all-or-nothing. A call either returns
//! a result or an [`AdapterError`]; partial conversions do not exist. To let
//! the vault roll back legs that already executed within a failed operation,
//! adapters expose a [`Checkpoint`](SwapStakeAdapter::Checkpoint) that
//! captures their external state and can be restored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Slippage;
use crate::registry::{Destination, NewDestination};
use crate::types::{Address, Amount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by (or about) the external swap/stake services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The router has no pool under the requested identifier.
    #[error("unknown pool on router {router}")]
    UnknownPool {
        /// Router that was queried.
        router: Address,
    },

    /// Swapping or adding liquidity failed.
    #[error("conversion failed on router {router}: {reason}")]
    ConversionFailed {
        /// Router that failed.
        router: Address,
        /// Human-readable cause.
        reason: String,
    },

    /// Unstaking, removing liquidity or swapping back failed.
    #[error("unwind failed on router {router}: {reason}")]
    UnwindFailed {
        /// Router that failed.
        router: Address,
        /// Human-readable cause.
        reason: String,
    },

    /// The farm could not report pending rewards.
    #[error("reward query failed on farm {farm}: {reason}")]
    RewardQueryFailed {
        /// Farm that failed.
        farm: Address,
        /// Human-readable cause.
        reason: String,
    },

    /// The adapter reported more value than it was given, or consumed
    /// input without minting any LP.
    #[error(
        "conversion on router {router} returned {lp_amount} LP and excess {excess} for input {input}"
    )]
    InvalidConversion {
        /// Router that misreported.
        router: Address,
        /// Base amount handed to the adapter.
        input: Amount,
        /// LP the adapter claimed to mint.
        lp_amount: Amount,
        /// Unconverted remainder the adapter claimed.
        excess: Amount,
    },

    /// The executed output fell below the caller's tolerance.
    #[error("slippage exceeded on router {router}: got {actual}, minimum {minimum}")]
    SlippageExceeded {
        /// Router that executed the trade.
        router: Address,
        /// Smallest output the tolerance allowed.
        minimum: Amount,
        /// Output actually produced.
        actual: Amount,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Result of converting base asset into a destination's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conversion {
    /// LP tokens minted and staked on behalf of the vault.
    pub lp_amount: Amount,
    /// Base asset that could not be converted and is held until withdrawal.
    pub excess: Amount,
    /// Rewards already accrued to `lp_amount` at the time of staking, which
    /// the new position is not entitled to.
    pub reward_debt: Amount,
}

/// Everything the adapter needs to unwind one position.
#[derive(Debug, Clone, Copy)]
pub struct UnwindRequest<'a> {
    /// Destination holding the position.
    pub destination: &'a Destination,
    /// Destination whose router converts harvested rewards back to base.
    pub swap_route: &'a Destination,
    /// LP tokens to unstake and redeem.
    pub lp_amount: Amount,
    /// Unconverted base asset returned alongside the redemption.
    pub excess: Amount,
    /// Reward debt recorded for the position.
    pub reward_debt: Amount,
    /// Tolerated shortfall of the redemption against its quote.
    pub slippage: Slippage,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Capability contract the vault requires from the external services.
pub trait SwapStakeAdapter {
    /// Opaque snapshot of the adapter's external state.
    type Checkpoint;

    /// Captures the current external state.
    fn checkpoint(&self) -> Self::Checkpoint;

    /// Returns the external state to a previously captured checkpoint.
    fn restore(&mut self, checkpoint: Self::Checkpoint);

    /// Asks the router whether `pool_id` corresponds to `lp_token`.
    fn validate_pool(&self, request: &NewDestination) -> Result<bool, AdapterError>;

    /// Converts `amount` of base asset into a staked position, failing if
    /// the LP minted falls short of the quote by more than `slippage`.
    fn convert(
        &mut self,
        destination: &Destination,
        amount: Amount,
        slippage: Slippage,
    ) -> Result<Conversion, AdapterError>;

    /// Unstakes and redeems a position, harvests its rewards, and returns the
    /// total base asset produced (redemption, excess and converted rewards).
    fn unwind(&mut self, request: UnwindRequest<'_>) -> Result<Amount, AdapterError>;

    /// Rewards accrued at `destination` to `lp_amount` since it was staked,
    /// net of `reward_debt`.
    fn pending_reward(
        &self,
        destination: &Destination,
        lp_amount: Amount,
        reward_debt: Amount,
    ) -> Result<Amount, AdapterError>;
}
