//! # Simulated Swap/Stake Adapter
//!
//! A deterministic, in-memory stand-in for the external routers and farms.
//! Used by the test suites and by `pacific-node` when no live services are
//! attached.
//!
//! ## Model
//!
//! - Each router hosts one pool. Converting base asset mints
//!   `amount / lp_price` LP tokens; `amount % lp_price` cannot be converted
//!   and comes back as excess.
//! - Each pool's farm emits `reward_per_tick` reward units per clock tick to
//!   whatever LP is staked there, and raises its reward-per-share index by
//!   `emitted * REWARD_PRECISION / staked`. A position is owed
//!   `lp * index / REWARD_PRECISION - reward_debt`, where the debt is what
//!   the index already paid out per LP when the position was staked, so LP
//!   never earns rewards emitted before it arrived.
//! - On unwind, LP redeems at `lp_price`, excess is returned as is, and the
//!   harvested rewards are sold through the swap route's pool at
//!   `reward_price / REWARD_PRECISION` base units per reward unit.
//! - A pool may lose `execution_loss` thousandths of every quote on
//!   execution; conversions and unwinds fail when that exceeds the caller's
//!   slippage tolerance.
//! - The clock only moves when [`SimulatedAdapter::advance`] is called.
//!
//! Routers can be told to fail their next calls, which is how the rollback
//! paths of the vault are exercised.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::adapter::{AdapterError, Conversion, SwapStakeAdapter, UnwindRequest};
use crate::config::{deduct_parts_per_thousand, Slippage, REWARD_PRECISION, SLIPPAGE_DENOMINATOR};
use crate::registry::{Destination, NewDestination};
use crate::types::{Address, Amount};

fn default_lp_price() -> Amount {
    2
}

fn default_reward_per_tick() -> Amount {
    1_000_000_000
}

fn default_reward_price() -> Amount {
    REWARD_PRECISION
}

fn key(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Static description of one simulated router/farm pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedPool {
    /// Router identity.
    pub router: Address,
    /// Farm identity.
    pub farm: Address,
    /// Pool identifier the router reports for `lp_token`.
    pub pool_id: u64,
    /// LP token identity.
    pub lp_token: Address,
    /// Base units per LP token. Must be non-zero.
    #[serde(default = "default_lp_price")]
    pub lp_price: Amount,
    /// Reward units the farm emits per tick while LP is staked.
    #[serde(default = "default_reward_per_tick")]
    pub reward_per_tick: Amount,
    /// Base units per reward unit, scaled by `REWARD_PRECISION`, when this
    /// pool is used as the swap route.
    #[serde(default = "default_reward_price")]
    pub reward_price: Amount,
    /// Thousandths of every quote lost on execution.
    #[serde(default)]
    pub execution_loss: u16,
}

impl SimulatedPool {
    /// A pool with default pricing.
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
            lp_price: default_lp_price(),
            reward_per_tick: default_reward_per_tick(),
            reward_price: default_reward_price(),
            execution_loss: 0,
        }
    }

    /// Sets the LP price (clamped to at least 1).
    pub fn with_lp_price(mut self, lp_price: Amount) -> Self {
        self.lp_price = lp_price.max(1);
        self
    }

    /// Sets the farm's emission rate.
    pub fn with_reward_per_tick(mut self, reward_per_tick: Amount) -> Self {
        self.reward_per_tick = reward_per_tick;
        self
    }

    /// Sets the reward sale price.
    pub fn with_reward_price(mut self, reward_price: Amount) -> Self {
        self.reward_price = reward_price;
        self
    }

    /// Sets the execution loss (clamped to 1000 thousandths).
    pub fn with_execution_loss(mut self, parts_per_thousand: u16) -> Self {
        self.execution_loss = parts_per_thousand.min(SLIPPAGE_DENOMINATOR);
        self
    }

    /// The registration request matching this pool.
    pub fn registration(&self) -> NewDestination {
        NewDestination::new(
            self.router.clone(),
            self.farm.clone(),
            self.pool_id,
            self.lp_token.clone(),
        )
    }
}

/// Mutable farm accounting for one pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmState {
    /// LP staked by the vault.
    pub staked: Amount,
    /// Reward units accrued and not yet harvested.
    pub pending: Amount,
    /// Rewards emitted per staked LP, scaled by `REWARD_PRECISION`.
    pub acc_reward_per_share: Amount,
}

impl FarmState {
    fn accrued(&self, lp_amount: Amount) -> Option<Amount> {
        lp_amount
            .checked_mul(self.acc_reward_per_share)
            .map(|scaled| scaled / REWARD_PRECISION)
    }

    fn owed(&self, lp_amount: Amount, reward_debt: Amount) -> Option<Amount> {
        self.accrued(lp_amount)
            .map(|accrued| accrued.saturating_sub(reward_debt))
    }
}

/// Checkpointable portion of the simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedState {
    /// Current clock tick.
    pub tick: u64,
    /// Farm accounting keyed by normalized router.
    pub farms: HashMap<String, FarmState>,
}

/// The deterministic adapter.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAdapter {
    pools: HashMap<String, SimulatedPool>,
    state: SimulatedState,
    failing_converts: HashSet<String>,
    failing_unwinds: HashSet<String>,
    failing_rewards: HashSet<String>,
}

impl SimulatedAdapter {
    /// An adapter with no pools.
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter preloaded with `pools`.
    pub fn with_pools(pools: impl IntoIterator<Item = SimulatedPool>) -> Self {
        let mut adapter = Self::new();
        for pool in pools {
            adapter.add_pool(pool);
        }
        adapter
    }

    /// Adds (or replaces) the pool hosted by `pool.router`.
    pub fn add_pool(&mut self, pool: SimulatedPool) {
        let k = key(&pool.router);
        self.state.farms.entry(k.clone()).or_default();
        self.pools.insert(k, pool);
    }

    /// Advances the clock, accruing farm emissions to staked LP.
    pub fn advance(&mut self, ticks: u64) {
        self.state.tick = self.state.tick.saturating_add(ticks);
        for (router, farm) in self.state.farms.iter_mut() {
            if farm.staked == 0 {
                continue;
            }
            if let Some(pool) = self.pools.get(router) {
                let emitted = pool.reward_per_tick.saturating_mul(Amount::from(ticks));
                let per_share = emitted.saturating_mul(REWARD_PRECISION) / farm.staked;
                farm.pending = farm.pending.saturating_add(emitted);
                farm.acc_reward_per_share = farm.acc_reward_per_share.saturating_add(per_share);
            }
        }
    }

    /// Current clock tick.
    pub fn now(&self) -> u64 {
        self.state.tick
    }

    /// Farm accounting for `router`.
    pub fn farm(&self, router: &str) -> Option<&FarmState> {
        self.state.farms.get(&key(router))
    }

    /// Makes every subsequent conversion on `router` fail.
    pub fn fail_converts(&mut self, router: &str) {
        self.failing_converts.insert(key(router));
    }

    /// Makes every subsequent unwind on `router` fail.
    pub fn fail_unwinds(&mut self, router: &str) {
        self.failing_unwinds.insert(key(router));
    }

    /// Makes every subsequent reward query on `router`'s farm fail.
    pub fn fail_rewards(&mut self, router: &str) {
        self.failing_rewards.insert(key(router));
    }

    /// Clears every injected failure on `router`.
    pub fn heal(&mut self, router: &str) {
        let k = key(router);
        self.failing_converts.remove(&k);
        self.failing_unwinds.remove(&k);
        self.failing_rewards.remove(&k);
    }

    fn pool(&self, router: &str) -> Result<&SimulatedPool, AdapterError> {
        self.pools.get(&key(router)).ok_or(AdapterError::UnknownPool {
            router: router.to_string(),
        })
    }

    fn check_slippage(
        router: &str,
        quoted: Amount,
        executed: Amount,
        slippage: Slippage,
    ) -> Result<(), AdapterError> {
        let minimum = slippage.min_out(quoted);
        if executed < minimum {
            return Err(AdapterError::SlippageExceeded {
                router: router.to_string(),
                minimum,
                actual: executed,
            });
        }
        Ok(())
    }
}

impl SwapStakeAdapter for SimulatedAdapter {
    type Checkpoint = SimulatedState;

    fn checkpoint(&self) -> SimulatedState {
        self.state.clone()
    }

    fn restore(&mut self, checkpoint: SimulatedState) {
        self.state = checkpoint;
    }

    fn validate_pool(&self, request: &NewDestination) -> Result<bool, AdapterError> {
        let pool = self.pool(&request.router)?;
        Ok(pool.pool_id == request.pool_id && key(&pool.lp_token) == key(&request.lp_token))
    }

    fn convert(
        &mut self,
        destination: &Destination,
        amount: Amount,
        slippage: Slippage,
    ) -> Result<Conversion, AdapterError> {
        let router = &destination.router;
        let convert_err = |reason: &str| AdapterError::ConversionFailed {
            router: router.clone(),
            reason: reason.to_string(),
        };

        let k = key(router);
        if self.failing_converts.contains(&k) {
            return Err(convert_err("injected failure"));
        }
        let pool = self.pool(router)?;
        let lp_price = pool.lp_price.max(1);
        let quoted = amount / lp_price;
        let lp_amount = deduct_parts_per_thousand(quoted, pool.execution_loss);
        Self::check_slippage(router, quoted, lp_amount, slippage)?;

        let farm = self.state.farms.entry(k).or_default();
        let reward_debt = farm
            .accrued(lp_amount)
            .ok_or_else(|| convert_err("reward debt overflow"))?;
        farm.staked = farm
            .staked
            .checked_add(lp_amount)
            .ok_or_else(|| convert_err("staked LP overflow"))?;
        Ok(Conversion {
            lp_amount,
            excess: amount % lp_price,
            reward_debt,
        })
    }

    fn unwind(&mut self, request: UnwindRequest<'_>) -> Result<Amount, AdapterError> {
        let router = &request.destination.router;
        let unwind_err = |reason: &str| AdapterError::UnwindFailed {
            router: router.clone(),
            reason: reason.to_string(),
        };

        let k = key(router);
        if self.failing_unwinds.contains(&k) {
            return Err(unwind_err("injected failure"));
        }
        let pool = self.pool(router)?;
        let lp_price = pool.lp_price.max(1);
        let execution_loss = pool.execution_loss;
        let reward_price = self.pool(&request.swap_route.router)?.reward_price;

        let farm = self
            .state
            .farms
            .get(&k)
            .cloned()
            .ok_or_else(|| unwind_err("farm has no stake"))?;
        if request.lp_amount > farm.staked {
            return Err(unwind_err("unstake exceeds staked LP"));
        }
        let reward = farm
            .owed(request.lp_amount, request.reward_debt)
            .ok_or_else(|| unwind_err("reward overflow"))?;
        let pending = farm
            .pending
            .checked_sub(reward)
            .ok_or_else(|| unwind_err("reward exceeds farm balance"))?;

        let redeemed = request
            .lp_amount
            .checked_mul(lp_price)
            .ok_or_else(|| unwind_err("redemption overflow"))?;
        let reward_base = reward
            .checked_mul(reward_price)
            .map(|v| v / REWARD_PRECISION)
            .ok_or_else(|| unwind_err("reward swap overflow"))?;
        let quoted = redeemed
            .checked_add(reward_base)
            .ok_or_else(|| unwind_err("proceeds overflow"))?;
        let executed = deduct_parts_per_thousand(quoted, execution_loss);
        Self::check_slippage(router, quoted, executed, request.slippage)?;
        let total = executed
            .checked_add(request.excess)
            .ok_or_else(|| unwind_err("proceeds overflow"))?;

        if let Some(farm) = self.state.farms.get_mut(&k) {
            farm.staked -= request.lp_amount;
            farm.pending = pending;
        }
        Ok(total)
    }

    fn pending_reward(
        &self,
        destination: &Destination,
        lp_amount: Amount,
        reward_debt: Amount,
    ) -> Result<Amount, AdapterError> {
        let k = key(&destination.router);
        if self.failing_rewards.contains(&k) {
            return Err(AdapterError::RewardQueryFailed {
                farm: destination.farm.clone(),
                reason: "injected failure".into(),
            });
        }
        let Some(farm) = self.state.farms.get(&k) else {
            return Ok(0);
        };
        farm.owed(lp_amount, reward_debt).ok_or_else(|| AdapterError::RewardQueryFailed {
            farm: destination.farm.clone(),
            reason: "reward overflow".into(),
        })
    }
}
