//! # Vault Events
//!
//! Every committed state change appends a [`VaultEvent`] to the vault's
//! buffer. Hosts drain the buffer after each operation to publish, index or
//! log the events. Failed operations never emit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, DestinationIndex};

/// A committed vault state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEventKind {
    /// A destination was registered.
    DestinationAdded {
        index: DestinationIndex,
        router: Address,
        farm: Address,
        pool_id: u64,
        lp_token: Address,
    },
    /// A destination was activated or deactivated.
    DestinationStatusChanged { index: DestinationIndex, active: bool },
    /// The swap destination used to convert rewards was changed.
    SwapDestinationChanged { index: DestinationIndex },
    /// A user deposited.
    Deposited {
        user: Address,
        gross: Amount,
        fee: Amount,
        net: Amount,
        destinations: usize,
    },
    /// A user withdrew every position.
    Withdrawn {
        user: Address,
        amount: Amount,
        destinations: usize,
    },
    /// Accrued fees were swept.
    FeesCollected { recipient: Address, amount: Amount },
    /// The fee recipient changed.
    FeeRecipientChanged { recipient: Address },
    /// Deposits and withdrawals were suspended.
    Paused { by: Address },
    /// Deposits and withdrawals were resumed.
    Unpaused { by: Address },
    /// Admin rights moved to a new owner.
    OwnershipTransferred { previous: Address, new: Address },
}

/// A [`VaultEventKind`] with its sequence number and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    /// Monotonic sequence number, starting at 0 for the first event.
    pub sequence: u64,
    /// When the event was emitted.
    pub at: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub kind: VaultEventKind,
}

/// Buffer of emitted-but-not-yet-drained events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    next_sequence: u64,
    pending: Vec<VaultEvent>,
}

impl EventLog {
    /// Appends an event.
    pub fn emit(&mut self, kind: VaultEventKind) {
        let event = VaultEvent {
            sequence: self.next_sequence,
            at: Utc::now(),
            kind,
        };
        self.next_sequence += 1;
        self.pending.push(event);
    }

    /// Removes and returns every pending event in emission order.
    pub fn drain(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.pending)
    }
}
