//! # Vault
//!
//! The pooled-capital allocator. A [`Vault`] owns the destination registry,
//! the position ledger, the fee controller and the event buffer, and calls
//! out to an injected [`SwapStakeAdapter`] for everything external.
//!
//! ## Lifecycle
//!
//! ```text
//!    ┌──────────┐  pause   ┌──────────┐
//!    │  Active  │ ───────► │  Paused  │
//!    │          │ ◄─────── │          │
//!    └──────────┘ unpause  └──────────┘
//! ```
//!
//! Both states accept admin operations. Only `Active` accepts deposits and
//! withdrawals. There is no terminal state.
//!
//! ## Atomicity
//!
//! Every public operation either commits all of its mutations or none. For
//! deposits and withdrawals the adapter is checkpointed before the first
//! external call and restored if any call fails; ledger and fee updates are
//! applied only after every external call succeeded. Mutating operations
//! take `&mut self`, so the host serializes them (e.g. behind a lock).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapter::SwapStakeAdapter;
use crate::allocation::{self, Allocation};
use crate::config::{ConfigError, Slippage, VaultConfig, DEFAULT_SWAP_DESTINATION};
use crate::error::VaultError;
use crate::events::{EventLog, VaultEvent, VaultEventKind};
use crate::fees::{FeeController, FeeSweep};
use crate::ledger::{PositionLedger, UserPosition, Withdrawal};
use crate::registry::{Destination, DestinationRegistry, NewDestination};
use crate::types::{Address, Amount, DestinationIndex};

/// Point-in-time view of the vault's process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    /// Fee rate in parts-per-thousand.
    pub fee_percent: u16,
    /// Base asset identity.
    pub base_token: Address,
    /// Wrapped base asset identity.
    pub wrapped_base_token: Address,
    /// Accrued, un-swept fees.
    pub total_fees: Amount,
    /// Destination used to convert rewards back to base.
    pub swap_destination: DestinationIndex,
    /// Whether deposits and withdrawals are suspended.
    pub paused: bool,
    /// Admin principal.
    pub owner: Address,
    /// Recipient of swept fees.
    pub fee_recipient: Address,
    /// Destinations ever registered.
    pub destinations: usize,
    /// Destinations currently active.
    pub active_destinations: usize,
    /// Users holding at least one position.
    pub participants: usize,
    /// Excess base asset held for users.
    pub held_excess: Amount,
}

/// The vault.
#[derive(Debug)]
pub struct Vault<A: SwapStakeAdapter> {
    base_token: Address,
    wrapped_base_token: Address,
    owner: Address,
    paused: bool,
    swap_destination: DestinationIndex,
    registry: DestinationRegistry,
    ledger: PositionLedger,
    fees: FeeController,
    events: EventLog,
    adapter: A,
}

impl<A: SwapStakeAdapter> Vault<A> {
    /// Builds a vault from a validated config. The fee rate is fixed from
    /// here on.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the config fails validation.
    pub fn new(config: VaultConfig, adapter: A) -> Result<Self, VaultError> {
        config.validate()?;
        let fees = FeeController::new(config.fee_percent, config.effective_fee_recipient());
        info!(
            fee_percent = config.fee_percent,
            owner = %config.owner,
            base_token = %config.base_token,
            "vault created"
        );
        Ok(Self {
            base_token: config.base_token,
            wrapped_base_token: config.wrapped_base_token,
            owner: config.owner,
            paused: false,
            swap_destination: DEFAULT_SWAP_DESTINATION,
            registry: DestinationRegistry::new(),
            ledger: PositionLedger::new(),
            fees,
            events: EventLog::default(),
            adapter,
        })
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn ensure_owner(&self, caller: &str, operation: &'static str) -> Result<(), VaultError> {
        if caller != self.owner {
            warn!(caller, operation, "rejected non-owner call");
            return Err(VaultError::Unauthorized {
                caller: caller.to_string(),
                operation,
            });
        }
        Ok(())
    }

    fn ensure_not_paused(&self) -> Result<(), VaultError> {
        if self.paused {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // User Operations
    // -----------------------------------------------------------------------

    /// Deposits `gross` base asset on behalf of `caller`.
    ///
    /// The fee is deducted and accrued, the net is split evenly across the
    /// active destinations, and the resulting LP and excess are added to the
    /// caller's positions. Every conversion must land within `slippage` of
    /// its quote.
    ///
    /// # Errors
    ///
    /// [`VaultError::Paused`], [`VaultError::ZeroAmount`],
    /// [`VaultError::NoActiveDestinations`], [`VaultError::AdapterFailure`]
    /// (after rollback) or [`VaultError::AmountOverflow`].
    pub fn deposit(
        &mut self,
        caller: &str,
        gross: Amount,
        slippage: Slippage,
    ) -> Result<Allocation, VaultError> {
        self.ensure_not_paused()?;
        if gross == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let split = self.fees.split(gross)?;
        self.fees
            .total_fees()
            .checked_add(split.fee)
            .ok_or(VaultError::AmountOverflow)?;

        let active = self.registry.active();
        if active.is_empty() {
            return Err(VaultError::NoActiveDestinations);
        }

        let checkpoint = self.adapter.checkpoint();
        let staged = allocation::allocate(&mut self.adapter, &active, gross, split, slippage)
            .and_then(|allocation| {
                self.ledger
                    .record_deposits(caller, &allocation.position_deltas())
                    .map(|()| allocation)
            });
        let allocation = match staged {
            Ok(allocation) => allocation,
            Err(e) => {
                self.adapter.restore(checkpoint);
                warn!(
                    user = caller,
                    gross = %gross,
                    slippage = slippage.parts_per_thousand(),
                    error = %e,
                    "deposit rolled back"
                );
                return Err(e);
            }
        };
        self.fees.accrue(split.fee)?;

        info!(
            user = caller,
            gross = %gross,
            fee = %split.fee,
            net = %split.net,
            destinations = allocation.legs.len(),
            "deposit allocated"
        );
        self.events.emit(VaultEventKind::Deposited {
            user: caller.to_string(),
            gross,
            fee: split.fee,
            net: split.net,
            destinations: allocation.legs.len(),
        });
        Ok(allocation)
    }

    /// Unwinds every position `caller` holds, returning the total proceeds.
    ///
    /// Positions at inactive destinations are unwound too. Rewards are
    /// converted through the current swap destination. Every unwind must
    /// land within `slippage` of its quote.
    ///
    /// # Errors
    ///
    /// [`VaultError::Paused`], [`VaultError::NothingToWithdraw`],
    /// [`VaultError::AdapterFailure`] (after rollback) or
    /// [`VaultError::AmountOverflow`].
    pub fn withdraw(&mut self, caller: &str, slippage: Slippage) -> Result<Withdrawal, VaultError> {
        self.ensure_not_paused()?;
        if self.ledger.participating(caller).is_empty() {
            return Err(VaultError::NothingToWithdraw {
                user: caller.to_string(),
            });
        }
        let swap_route = self.registry.get(self.swap_destination)?;

        let checkpoint = self.adapter.checkpoint();
        let withdrawal = match self.ledger.withdraw_all(
            caller,
            &self.registry,
            swap_route,
            slippage,
            &mut self.adapter,
        ) {
            Ok(w) => w,
            Err(e) => {
                self.adapter.restore(checkpoint);
                warn!(
                    user = caller,
                    slippage = slippage.parts_per_thousand(),
                    error = %e,
                    "withdrawal rolled back"
                );
                return Err(e);
            }
        };

        info!(
            user = caller,
            amount = %withdrawal.total,
            destinations = withdrawal.legs.len(),
            "withdrawal completed"
        );
        self.events.emit(VaultEventKind::Withdrawn {
            user: caller.to_string(),
            amount: withdrawal.total,
            destinations: withdrawal.legs.len(),
        });
        Ok(withdrawal)
    }

    /// Rewards pending for `user` across every destination they hold.
    pub fn earned_rewards(&self, user: &str) -> Result<Amount, VaultError> {
        self.ledger
            .earned_rewards(user, &self.registry, &self.adapter)
    }

    // -----------------------------------------------------------------------
    // Admin Operations
    // -----------------------------------------------------------------------

    /// Registers a new destination after verifying its pool through the
    /// adapter. Owner only.
    pub fn add_destination(
        &mut self,
        caller: &str,
        request: NewDestination,
    ) -> Result<DestinationIndex, VaultError> {
        self.ensure_owner(caller, "add_destination")?;
        let adapter = &self.adapter;
        let index = self
            .registry
            .register(request, |r| adapter.validate_pool(r))?;

        let destination = self.registry.get(index)?.clone();
        info!(
            index,
            router = %destination.router,
            pool_id = destination.pool_id,
            "destination registered"
        );
        self.events.emit(VaultEventKind::DestinationAdded {
            index,
            router: destination.router,
            farm: destination.farm,
            pool_id: destination.pool_id,
            lp_token: destination.lp_token,
        });
        Ok(index)
    }

    /// Activates or deactivates a destination. Existing positions there are
    /// unaffected. Owner only.
    pub fn set_destination_active(
        &mut self,
        caller: &str,
        index: DestinationIndex,
        active: bool,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller, "set_destination_active")?;
        self.registry.set_active(index, active)?;
        info!(index, active, "destination status changed");
        self.events
            .emit(VaultEventKind::DestinationStatusChanged { index, active });
        Ok(())
    }

    /// Selects the destination whose router converts rewards back to base.
    /// The target must be active. Owner only.
    pub fn set_swap_destination(
        &mut self,
        caller: &str,
        index: DestinationIndex,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller, "set_swap_destination")?;
        self.registry.get_active(index)?;
        self.swap_destination = index;
        info!(index, "swap destination changed");
        self.events
            .emit(VaultEventKind::SwapDestinationChanged { index });
        Ok(())
    }

    /// Pays accrued fees to the fee recipient. Callable by the owner or the
    /// fee recipient.
    pub fn collect_fees(&mut self, caller: &str) -> Result<FeeSweep, VaultError> {
        if caller != self.fees.recipient() {
            self.ensure_owner(caller, "collect_fees")?;
        }
        let sweep = self.fees.sweep()?;
        info!(recipient = %sweep.recipient, amount = %sweep.amount, "fees collected");
        self.events.emit(VaultEventKind::FeesCollected {
            recipient: sweep.recipient.clone(),
            amount: sweep.amount,
        });
        Ok(sweep)
    }

    /// Changes the fee recipient. Owner only.
    pub fn set_fee_recipient(&mut self, caller: &str, recipient: &str) -> Result<(), VaultError> {
        self.ensure_owner(caller, "set_fee_recipient")?;
        if recipient.is_empty() {
            return Err(ConfigError::MissingIdentity("fee_recipient").into());
        }
        self.fees.set_recipient(recipient.to_string());
        info!(recipient, "fee recipient changed");
        self.events.emit(VaultEventKind::FeeRecipientChanged {
            recipient: recipient.to_string(),
        });
        Ok(())
    }

    /// Hands admin rights to `new_owner`. Owner only.
    pub fn transfer_ownership(&mut self, caller: &str, new_owner: &str) -> Result<(), VaultError> {
        self.ensure_owner(caller, "transfer_ownership")?;
        if new_owner.is_empty() {
            return Err(ConfigError::MissingIdentity("owner").into());
        }
        let previous = std::mem::replace(&mut self.owner, new_owner.to_string());
        info!(previous = %previous, new = new_owner, "ownership transferred");
        self.events.emit(VaultEventKind::OwnershipTransferred {
            previous,
            new: new_owner.to_string(),
        });
        Ok(())
    }

    /// Suspends deposits and withdrawals. Owner only.
    pub fn pause(&mut self, caller: &str) -> Result<(), VaultError> {
        self.ensure_owner(caller, "pause")?;
        if self.paused {
            return Err(VaultError::PauseUnchanged { paused: true });
        }
        self.paused = true;
        info!(by = caller, "vault paused");
        self.events.emit(VaultEventKind::Paused {
            by: caller.to_string(),
        });
        Ok(())
    }

    /// Resumes deposits and withdrawals. Owner only.
    pub fn unpause(&mut self, caller: &str) -> Result<(), VaultError> {
        self.ensure_owner(caller, "unpause")?;
        if !self.paused {
            return Err(VaultError::PauseUnchanged { paused: false });
        }
        self.paused = false;
        info!(by = caller, "vault unpaused");
        self.events.emit(VaultEventKind::Unpaused {
            by: caller.to_string(),
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Fee rate in parts-per-thousand.
    pub fn fee_percent(&self) -> u16 {
        self.fees.fee_percent()
    }

    /// Accrued, un-swept fees.
    pub fn total_fees(&self) -> Amount {
        self.fees.total_fees()
    }

    /// Number of active destinations.
    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    /// `user`'s position at `index`; zero-valued if none.
    pub fn position_of(&self, user: &str, index: DestinationIndex) -> UserPosition {
        self.ledger.position_of(user, index)
    }

    /// Whether `user` holds a position at `index`.
    pub fn is_participating(&self, user: &str, index: DestinationIndex) -> bool {
        self.ledger.is_participating(user, index)
    }

    /// The destination at `index`.
    pub fn destination(&self, index: DestinationIndex) -> Result<&Destination, VaultError> {
        self.registry.get(index)
    }

    /// Every destination ever registered.
    pub fn destinations(&self) -> &[Destination] {
        self.registry.all()
    }

    /// Current swap destination index.
    pub fn swap_destination(&self) -> DestinationIndex {
        self.swap_destination
    }

    /// Base asset identity.
    pub fn base_token(&self) -> &str {
        &self.base_token
    }

    /// Wrapped base asset identity.
    pub fn wrapped_base_token(&self) -> &str {
        &self.wrapped_base_token
    }

    /// Admin principal.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Fee recipient.
    pub fn fee_recipient(&self) -> &str {
        self.fees.recipient()
    }

    /// Whether deposits and withdrawals are suspended.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The injected adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutable access to the injected adapter (e.g. to advance a simulated
    /// clock). Never touches vault accounting.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Removes and returns the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        self.events.drain()
    }

    /// Snapshot of the process-wide state.
    pub fn state(&self) -> VaultState {
        VaultState {
            fee_percent: self.fee_percent(),
            base_token: self.base_token.clone(),
            wrapped_base_token: self.wrapped_base_token.clone(),
            total_fees: self.total_fees(),
            swap_destination: self.swap_destination,
            paused: self.paused,
            owner: self.owner.clone(),
            fee_recipient: self.fees.recipient().to_string(),
            destinations: self.registry.len(),
            active_destinations: self.registry.active_count(),
            participants: self.ledger.user_count(),
            held_excess: self.ledger.total_excess(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SLIPPAGE;
    use crate::simulated::{SimulatedAdapter, SimulatedPool};

    const OWNER: &str = "owner";

    fn vault() -> Vault<SimulatedAdapter> {
        let adapter = SimulatedAdapter::with_pools([
            SimulatedPool::new("0xRouterA", "0xFarmA", 252, "0xLpA"),
            SimulatedPool::new("0xRouterB", "0xFarmB", 3, "0xLpB"),
        ]);
        Vault::new(VaultConfig::new(10, "busd", "wbnb", OWNER), adapter).unwrap()
    }

    #[test]
    fn construction_rejects_invalid_fee() {
        let err = Vault::new(
            VaultConfig::new(1_000, "busd", "wbnb", OWNER),
            SimulatedAdapter::new(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_config");
    }

    #[test]
    fn accessors_reflect_construction() {
        let v = vault();
        assert_eq!(v.fee_percent(), 10);
        assert_eq!(v.base_token(), "busd");
        assert_eq!(v.wrapped_base_token(), "wbnb");
        assert_eq!(v.swap_destination(), 0);
        assert_eq!(v.fee_recipient(), OWNER);
        assert!(!v.is_paused());
    }

    #[test]
    fn double_pause_and_unpause_rejected() {
        let mut v = vault();
        assert_eq!(
            v.unpause(OWNER),
            Err(VaultError::PauseUnchanged { paused: false })
        );
        v.pause(OWNER).unwrap();
        assert_eq!(
            v.pause(OWNER),
            Err(VaultError::PauseUnchanged { paused: true })
        );
        v.unpause(OWNER).unwrap();
        assert!(!v.is_paused());
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut v = vault();
        v.add_destination(OWNER, NewDestination::new("0xRouterA", "0xFarmA", 252, "0xLpA"))
            .unwrap();
        assert_eq!(v.deposit("alice", 0, DEFAULT_SLIPPAGE), Err(VaultError::ZeroAmount));
    }

    #[test]
    fn events_emitted_only_on_success() {
        let mut v = vault();
        v.add_destination(OWNER, NewDestination::new("0xRouterA", "0xFarmA", 252, "0xLpA"))
            .unwrap();
        let _ = v.add_destination(OWNER, NewDestination::new("0xRouterA", "0xFarmA", 252, "0xLpA"));
        let _ = v.pause("mallory");

        let events = v.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            VaultEventKind::DestinationAdded { index: 0, .. }
        ));
    }

    #[test]
    fn fee_recipient_may_collect() {
        let mut v = vault();
        v.add_destination(OWNER, NewDestination::new("0xRouterA", "0xFarmA", 252, "0xLpA"))
            .unwrap();
        v.set_fee_recipient(OWNER, "treasury").unwrap();
        v.deposit("alice", 1_000, DEFAULT_SLIPPAGE).unwrap();

        assert!(matches!(
            v.collect_fees("alice"),
            Err(VaultError::Unauthorized { .. })
        ));
        let sweep = v.collect_fees("treasury").unwrap();
        assert_eq!(sweep.amount, 10);
        assert_eq!(sweep.recipient, "treasury");
    }

    #[test]
    fn ownership_transfer_moves_admin_rights() {
        let mut v = vault();
        v.transfer_ownership(OWNER, "new-owner").unwrap();
        assert!(matches!(
            v.pause(OWNER),
            Err(VaultError::Unauthorized { .. })
        ));
        v.pause("new-owner").unwrap();
        assert_eq!(v.owner(), "new-owner");
    }

    #[test]
    fn state_snapshot_counts_participants() {
        let mut v = vault();
        v.add_destination(OWNER, NewDestination::new("0xRouterA", "0xFarmA", 252, "0xLpA"))
            .unwrap();
        v.deposit("alice", 1_001, DEFAULT_SLIPPAGE).unwrap();
        v.deposit("bob", 2_000, DEFAULT_SLIPPAGE).unwrap();

        let state = v.state();
        assert_eq!(state.participants, 2);
        assert_eq!(state.total_fees, 10 + 20);
        assert_eq!(state.destinations, 1);
        assert_eq!(state.active_destinations, 1);
        // 1001 - 10 = 991 at lp_price 2 leaves 1 unit of excess.
        assert_eq!(state.held_excess, 1);
    }
}
