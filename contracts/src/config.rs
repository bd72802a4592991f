//! # Vault Configuration & Constants
//!
//! Every number the vault's accounting depends on lives here, together with
//! the construction-time [`VaultConfig`]. The fee rate is part of the config
//! and becomes immutable once a [`crate::vault::Vault`] is built from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Amount, DestinationIndex};

// ---------------------------------------------------------------------------
// Fee Parameters
// ---------------------------------------------------------------------------

/// Fees are expressed in parts-per-thousand of the gross deposit.
/// A `fee_percent` of 25 therefore means 2.5%.
pub const FEE_DENOMINATOR: u128 = 1_000;

/// Highest admissible fee. A fee equal to the denominator would leave no
/// net capital to allocate.
pub const MAX_FEE_PERCENT: u16 = 999;

// ---------------------------------------------------------------------------
// Registry Defaults
// ---------------------------------------------------------------------------

/// Swap destination used until the owner selects another one. Index 0 is the
/// first destination ever registered.
pub const DEFAULT_SWAP_DESTINATION: DestinationIndex = 0;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Number of base units in one whole token. All amounts are fixed-point
/// integers with 18 decimals, the precision of the wrapped native asset.
pub const BASE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Fixed-point scale used by the simulated farm's reward-per-share index.
pub const REWARD_PRECISION: u128 = 1_000_000_000_000;

// ---------------------------------------------------------------------------
// Slippage
// ---------------------------------------------------------------------------

/// Slippage tolerances are parts-per-thousand of the quoted output.
pub const SLIPPAGE_DENOMINATOR: u16 = 1_000;

/// Tolerance applied when a caller does not name one: 1%.
pub const DEFAULT_SLIPPAGE: Slippage = Slippage(10);

/// Removes `parts` thousandths from `amount`, rounding the deduction down.
///
/// Splits `amount` before multiplying so the result never overflows.
pub(crate) fn deduct_parts_per_thousand(amount: Amount, parts: u16) -> Amount {
    let parts = Amount::from(parts.min(SLIPPAGE_DENOMINATOR));
    let denominator = Amount::from(SLIPPAGE_DENOMINATOR);
    let cut = (amount / denominator) * parts + (amount % denominator) * parts / denominator;
    amount - cut
}

/// How far an executed conversion or unwind may fall short of the adapter's
/// quote before the operation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Slippage(u16);

impl Slippage {
    /// Accept nothing below the quote.
    pub const ZERO: Slippage = Slippage(0);

    /// Accept any output.
    pub const MAX: Slippage = Slippage(SLIPPAGE_DENOMINATOR);

    /// A tolerance of `parts` thousandths.
    pub fn new(parts: u16) -> Result<Self, ConfigError> {
        if parts > SLIPPAGE_DENOMINATOR {
            return Err(ConfigError::SlippageTooHigh {
                slippage: parts,
                max: SLIPPAGE_DENOMINATOR,
            });
        }
        Ok(Self(parts))
    }

    /// The tolerance in parts-per-thousand.
    pub fn parts_per_thousand(self) -> u16 {
        self.0
    }

    /// Smallest output accepted against `quoted`.
    pub fn min_out(self, quoted: Amount) -> Amount {
        deduct_parts_per_thousand(quoted, self.0)
    }
}

impl Default for Slippage {
    fn default() -> Self {
        DEFAULT_SLIPPAGE
    }
}

impl TryFrom<u16> for Slippage {
    type Error = ConfigError;

    fn try_from(parts: u16) -> Result<Self, Self::Error> {
        Self::new(parts)
    }
}

impl From<Slippage> for u16 {
    fn from(slippage: Slippage) -> Self {
        slippage.0
    }
}

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Errors raised while validating a [`VaultConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The fee would consume the whole deposit (or more).
    #[error("fee of {fee_percent} parts-per-thousand exceeds the maximum of {max}")]
    FeeTooHigh {
        /// The rejected fee.
        fee_percent: u16,
        /// The highest admissible fee.
        max: u16,
    },

    /// A slippage tolerance above 100% was requested.
    #[error("slippage of {slippage} parts-per-thousand exceeds the maximum of {max}")]
    SlippageTooHigh {
        /// The rejected tolerance.
        slippage: u16,
        /// The highest admissible tolerance.
        max: u16,
    },

    /// A required identity field was left empty.
    #[error("missing identity for `{0}`")]
    MissingIdentity(&'static str),
}

/// Construction-time parameters of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Protocol fee in parts-per-thousand.
    pub fee_percent: u16,
    /// Identity of the base asset users deposit.
    pub base_token: Address,
    /// Identity of the wrapped form of the base asset used by routers.
    pub wrapped_base_token: Address,
    /// Principal allowed to call admin operations.
    pub owner: Address,
    /// Recipient of swept fees. Falls back to `owner` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_recipient: Option<Address>,
}

impl VaultConfig {
    /// Builds a config whose fee recipient is the owner.
    pub fn new(
        fee_percent: u16,
        base_token: impl Into<Address>,
        wrapped_base_token: impl Into<Address>,
        owner: impl Into<Address>,
    ) -> Self {
        Self {
            fee_percent,
            base_token: base_token.into(),
            wrapped_base_token: wrapped_base_token.into(),
            owner: owner.into(),
            fee_recipient: None,
        }
    }

    /// Sets an explicit fee recipient.
    pub fn with_fee_recipient(mut self, recipient: impl Into<Address>) -> Self {
        self.fee_recipient = Some(recipient.into());
        self
    }

    /// Checks the fee bound and that every identity is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_percent > MAX_FEE_PERCENT {
            return Err(ConfigError::FeeTooHigh {
                fee_percent: self.fee_percent,
                max: MAX_FEE_PERCENT,
            });
        }
        if self.base_token.is_empty() {
            return Err(ConfigError::MissingIdentity("base_token"));
        }
        if self.wrapped_base_token.is_empty() {
            return Err(ConfigError::MissingIdentity("wrapped_base_token"));
        }
        if self.owner.is_empty() {
            return Err(ConfigError::MissingIdentity("owner"));
        }
        if matches!(&self.fee_recipient, Some(r) if r.is_empty()) {
            return Err(ConfigError::MissingIdentity("fee_recipient"));
        }
        Ok(())
    }

    /// The address that receives swept fees.
    pub fn effective_fee_recipient(&self) -> &str {
        self.fee_recipient.as_deref().unwrap_or(&self.owner)
    }
}
