//! # Fee Controller
//!
//! Computes the protocol fee on each deposit, accrues it, and sweeps the
//! accrued balance to the fee recipient. The fee rate is fixed when the
//! controller is built; `total_fees` only grows on deposit and only returns
//! to zero on a sweep.

use serde::{Deserialize, Serialize};

use crate::config::FEE_DENOMINATOR;
use crate::error::VaultError;
use crate::types::{Address, Amount};

/// Fee and net capital derived from one gross deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Protocol-retained portion.
    pub fee: Amount,
    /// Capital left to allocate.
    pub net: Amount,
}

/// Result of a successful sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSweep {
    /// Address the fees were paid to.
    pub recipient: Address,
    /// Amount paid out.
    pub amount: Amount,
}

/// Fee accrual state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeController {
    fee_percent: u16,
    total_fees: Amount,
    recipient: Address,
}

impl FeeController {
    /// Creates a controller with nothing accrued.
    pub fn new(fee_percent: u16, recipient: impl Into<Address>) -> Self {
        Self {
            fee_percent,
            total_fees: 0,
            recipient: recipient.into(),
        }
    }

    /// Fee rate in parts-per-thousand.
    pub fn fee_percent(&self) -> u16 {
        self.fee_percent
    }

    /// Accrued, un-swept fees.
    pub fn total_fees(&self) -> Amount {
        self.total_fees
    }

    /// Current fee recipient.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub(crate) fn set_recipient(&mut self, recipient: Address) {
        self.recipient = recipient;
    }

    /// `gross * fee_percent / 1000`, truncated toward zero.
    pub fn compute_fee(&self, gross: Amount) -> Result<Amount, VaultError> {
        gross
            .checked_mul(Amount::from(self.fee_percent))
            .map(|scaled| scaled / FEE_DENOMINATOR)
            .ok_or(VaultError::AmountOverflow)
    }

    /// Splits a gross deposit into fee and net. `fee + net == gross` always.
    pub fn split(&self, gross: Amount) -> Result<FeeSplit, VaultError> {
        let fee = self.compute_fee(gross)?;
        let net = gross.checked_sub(fee).ok_or(VaultError::AmountOverflow)?;
        Ok(FeeSplit { fee, net })
    }

    /// Adds `fee` to the accrued balance.
    pub fn accrue(&mut self, fee: Amount) -> Result<(), VaultError> {
        self.total_fees = self
            .total_fees
            .checked_add(fee)
            .ok_or(VaultError::AmountOverflow)?;
        Ok(())
    }

    /// Pays out the accrued balance and resets it to zero.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NothingToSweep`] if nothing has accrued.
    pub fn sweep(&mut self) -> Result<FeeSweep, VaultError> {
        if self.total_fees == 0 {
            return Err(VaultError::NothingToSweep);
        }
        let amount = std::mem::take(&mut self.total_fees);
        Ok(FeeSweep {
            recipient: self.recipient.clone(),
            amount,
        })
    }
}
