//! Integration tests for the vault.
//!
//! These walk through the vault's lifecycle the way an operator and its
//! users would: registering destinations, depositing, toggling, collecting
//! fees and withdrawing, against the deterministic simulated adapter.

use pacific_contracts::config::{BASE_UNIT, REWARD_PRECISION};
use pacific_contracts::{
    AdapterError, NewDestination, SimulatedAdapter, SimulatedPool, Slippage, UserPosition, Vault,
    VaultConfig, VaultError, DEFAULT_SLIPPAGE,
};

const OWNER: &str = "0x63fc43d4874f314d3f519d9406415dc91c5b11ec";
const ALICE: &str = "0xa11ce";
const BOB: &str = "0xb0b";
const MALLORY: &str = "0xbad";
const TOKEN: &str = "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56";
const WTOKEN: &str = "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c";

const ROUTER_A: &str = "0x10ED43C718714eb63d5aA57B78B54704E256024E";
const ROUTER_B: &str = "0xcF0feBd3f17CEf5b47b0cD257aCf6025c5BFf3b7";

fn pool_a() -> SimulatedPool {
    SimulatedPool::new(
        ROUTER_A,
        "0x73feaa1eE314F8c655E354234017bE2193C9E24E",
        252,
        "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82",
    )
}

fn pool_b() -> SimulatedPool {
    SimulatedPool::new(
        ROUTER_B,
        "0x5c8D727b265DBAfaba67E050f2f739cAeEB4A6F9",
        3,
        "0x603c7f932ED1fc6575303D8Fb018fDCBb0f39a95",
    )
}

/// Helper: a vault with fee 10 (1%) whose adapter knows both pools but has
/// nothing registered yet.
fn bare_vault() -> Vault<SimulatedAdapter> {
    vault_with_pools(pool_a(), pool_b())
}

fn vault_with_pools(a: SimulatedPool, b: SimulatedPool) -> Vault<SimulatedAdapter> {
    Vault::new(
        VaultConfig::new(10, TOKEN, WTOKEN, OWNER),
        SimulatedAdapter::with_pools([a, b]),
    )
    .unwrap()
}

/// Helper: a vault with both destinations registered and active.
fn two_destination_vault() -> Vault<SimulatedAdapter> {
    let mut vault = bare_vault();
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault.add_destination(OWNER, pool_b().registration()).unwrap();
    vault
}

/// Helper: a vault with only destination A registered.
fn one_destination_vault() -> Vault<SimulatedAdapter> {
    let mut vault = bare_vault();
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn deploys_correctly() {
    let vault = bare_vault();
    assert_eq!(vault.fee_percent(), 10);
    assert_eq!(vault.base_token(), TOKEN);
    assert_eq!(vault.wrapped_base_token(), WTOKEN);
    assert_eq!(vault.active_count(), 0);
    assert_eq!(vault.total_fees(), 0);
}

#[test]
fn adds_destinations() {
    let vault = two_destination_vault();
    assert_eq!(vault.active_count(), 2);
    assert_eq!(vault.destinations().len(), 2);
    assert_eq!(vault.destination(1).unwrap().pool_id, 3);
}

#[test]
fn deactivates_and_reactivates_destination() {
    let mut vault = two_destination_vault();

    vault.set_destination_active(OWNER, 0, false).unwrap();
    assert_eq!(vault.active_count(), 1);

    vault.set_destination_active(OWNER, 0, true).unwrap();
    assert_eq!(vault.active_count(), 2);
}

#[test]
fn cannot_add_existing_router() {
    let mut vault = one_destination_vault();
    let err = vault
        .add_destination(OWNER, pool_a().registration())
        .unwrap_err();
    assert!(matches!(err, VaultError::DuplicateRouter { .. }));
}

#[test]
fn cannot_re_add_router_after_deactivation() {
    let mut vault = one_destination_vault();
    vault.set_destination_active(OWNER, 0, false).unwrap();
    let err = vault
        .add_destination(OWNER, pool_a().registration())
        .unwrap_err();
    assert!(matches!(err, VaultError::DuplicateRouter { .. }));
    assert_eq!(vault.destinations().len(), 1);
}

#[test]
fn cannot_add_destination_with_wrong_pool_id() {
    let mut vault = bare_vault();
    let mut request = pool_a().registration();
    request.pool_id = 250;
    let err = vault.add_destination(OWNER, request).unwrap_err();
    assert!(matches!(err, VaultError::PoolMismatch { pool_id: 250, .. }));
    assert!(vault.destinations().is_empty());
}

#[test]
fn cannot_toggle_to_current_status() {
    let mut vault = one_destination_vault();
    assert_eq!(
        vault.set_destination_active(OWNER, 0, true),
        Err(VaultError::NoStatusChange {
            index: 0,
            active: true
        })
    );

    vault.set_destination_active(OWNER, 0, false).unwrap();
    assert_eq!(
        vault.set_destination_active(OWNER, 0, false),
        Err(VaultError::NoStatusChange {
            index: 0,
            active: false
        })
    );
}

#[test]
fn toggling_unknown_index_rejected() {
    let mut vault = one_destination_vault();
    assert!(matches!(
        vault.set_destination_active(OWNER, 5, false),
        Err(VaultError::InvalidIndex { index: 5, count: 1 })
    ));
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

#[test]
fn deposit_splits_net_across_active_destinations() {
    let mut vault = two_destination_vault();
    let allocation = vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();

    let net = BASE_UNIT - BASE_UNIT / 100;
    assert_eq!(allocation.fee, BASE_UNIT / 100);
    assert_eq!(allocation.net, net);
    assert_eq!(allocation.legs.len(), 2);
    for leg in &allocation.legs {
        assert!(leg.allocated.abs_diff(net / 2) <= 1);
    }
    assert_eq!(allocation.fee + allocation.allocated_total(), BASE_UNIT);
    assert!(vault.is_participating(ALICE, 0));
    assert!(vault.is_participating(ALICE, 1));
}

#[test]
fn deposit_after_deactivating_one_destination_goes_to_the_other() {
    let mut vault = two_destination_vault();
    vault.set_destination_active(OWNER, 0, false).unwrap();

    let allocation = vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(allocation.legs.len(), 1);
    assert_eq!(allocation.legs[0].index, 1);
    assert_eq!(allocation.legs[0].allocated, allocation.net);
    assert!(!vault.is_participating(ALICE, 0));
}

#[test]
fn deposit_without_destinations_rejected() {
    let mut vault = bare_vault();
    assert_eq!(
        vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE),
        Err(VaultError::NoActiveDestinations)
    );

    let mut vault = one_destination_vault();
    vault.set_destination_active(OWNER, 0, false).unwrap();
    assert_eq!(
        vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE),
        Err(VaultError::NoActiveDestinations)
    );
    assert_eq!(vault.total_fees(), 0);
}

#[test]
fn cannot_deposit_when_paused() {
    let mut vault = two_destination_vault();
    vault.pause(OWNER).unwrap();
    assert_eq!(vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE), Err(VaultError::Paused));

    vault.unpause(OWNER).unwrap();
    assert!(vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).is_ok());
}

#[test]
fn repeated_deposits_accumulate_lp() {
    let mut vault = one_destination_vault();

    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    let first = vault.position_of(OWNER, 0);
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    let second = vault.position_of(OWNER, 0);

    assert!(second.lp_amount > first.lp_amount);
    assert_eq!(second.lp_amount, first.lp_amount * 2);
}

#[test]
fn odd_split_books_remainder_as_excess_on_first_leg() {
    let mut vault = two_destination_vault();
    // 1_001 - fee 10 = 991 net; 495 per leg, remainder 1 on leg 0.
    // 495 at lp_price 2 converts to 247 LP with 1 unit unconverted.
    let allocation = vault.deposit(ALICE, 1_001, DEFAULT_SLIPPAGE).unwrap();

    assert_eq!(allocation.legs[0].allocated, 496);
    assert_eq!(allocation.legs[1].allocated, 495);
    assert_eq!(
        vault.position_of(ALICE, 0),
        UserPosition {
            lp_amount: 247,
            excess: 2,
            reward_debt: 0,
            participating: true
        }
    );
    assert_eq!(vault.position_of(ALICE, 1).excess, 1);
}

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

#[test]
fn withdraws_correctly() {
    let mut vault = one_destination_vault();
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(50_000);

    let withdrawal = vault.withdraw(OWNER, DEFAULT_SLIPPAGE).unwrap();
    assert!(withdrawal.total > BASE_UNIT * 9 / 10);
    assert_eq!(withdrawal.legs.len(), 1);
}

#[test]
fn withdraw_proceeds_do_not_decrease_with_elapsed_time() {
    let mut previous = 0;
    for ticks in [0, 1, 100, 50_000] {
        let mut vault = one_destination_vault();
        vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
        vault.adapter_mut().advance(ticks);
        let total = vault.withdraw(ALICE, DEFAULT_SLIPPAGE).unwrap().total;
        assert!(total >= previous);
        previous = total;
    }
}

#[test]
fn immediate_withdraw_returns_net_deposit() {
    let mut vault = two_destination_vault();
    let allocation = vault.deposit(ALICE, 1_001, DEFAULT_SLIPPAGE).unwrap();
    let withdrawal = vault.withdraw(ALICE, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(withdrawal.total, allocation.net);
}

#[test]
fn cannot_withdraw_when_paused() {
    let mut vault = one_destination_vault();
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(50_000);
    vault.pause(OWNER).unwrap();

    assert_eq!(vault.withdraw(OWNER, DEFAULT_SLIPPAGE), Err(VaultError::Paused));
    assert!(vault.is_participating(OWNER, 0));
}

#[test]
fn cannot_withdraw_without_position() {
    let mut vault = one_destination_vault();
    assert!(matches!(
        vault.withdraw(ALICE, DEFAULT_SLIPPAGE),
        Err(VaultError::NothingToWithdraw { .. })
    ));
}

#[test]
fn collected_fees_after_withdraw_are_exact() {
    let mut vault = one_destination_vault();
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(50_000);
    vault.withdraw(OWNER, DEFAULT_SLIPPAGE).unwrap();

    assert_eq!(vault.total_fees(), BASE_UNIT * 10 / 1_000);
}

#[test]
fn balances_cleared_after_withdrawing() {
    let mut vault = one_destination_vault();
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(50_000);
    vault.withdraw(OWNER, DEFAULT_SLIPPAGE).unwrap();

    assert_eq!(vault.position_of(OWNER, 0), UserPosition::default());
    assert!(!vault.is_participating(OWNER, 0));
    assert!(matches!(
        vault.withdraw(OWNER, DEFAULT_SLIPPAGE),
        Err(VaultError::NothingToWithdraw { .. })
    ));
}

#[test]
fn withdraw_unwinds_positions_at_inactive_destinations() {
    let mut vault = two_destination_vault();
    vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.set_destination_active(OWNER, 1, false).unwrap();

    let withdrawal = vault.withdraw(ALICE, DEFAULT_SLIPPAGE).unwrap();
    let indices: Vec<_> = withdrawal.legs.iter().map(|l| l.index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert!(!vault.is_participating(ALICE, 1));
}

#[test]
fn rewards_are_sold_through_swap_destination() {
    let mut vault = vault_with_pools(
        pool_a().with_reward_per_tick(99),
        pool_b().with_reward_price(3 * REWARD_PRECISION),
    );
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault.add_destination(OWNER, pool_b().registration()).unwrap();
    vault.set_swap_destination(OWNER, 1).unwrap();
    vault.set_destination_active(OWNER, 1, false).unwrap();

    // 1000 - fee 10 = 990 into A only, staked as 495 LP.
    vault.deposit(ALICE, 1_000, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(3);

    // 297 reward units sold at 3 base each.
    assert_eq!(vault.withdraw(ALICE, DEFAULT_SLIPPAGE).unwrap().total, 990 + 891);
}

// ---------------------------------------------------------------------------
// Fees, Swap Destination & Rewards
// ---------------------------------------------------------------------------

#[test]
fn sets_swap_destination() {
    let mut vault = two_destination_vault();
    assert_eq!(vault.swap_destination(), 0);

    vault.set_swap_destination(OWNER, 1).unwrap();
    assert_eq!(vault.swap_destination(), 1);
}

#[test]
fn swap_destination_must_exist_and_be_active() {
    let mut vault = two_destination_vault();
    assert!(matches!(
        vault.set_swap_destination(OWNER, 2),
        Err(VaultError::InvalidIndex { .. })
    ));

    vault.set_destination_active(OWNER, 1, false).unwrap();
    assert_eq!(
        vault.set_swap_destination(OWNER, 1),
        Err(VaultError::InactiveDestination(1))
    );
    assert_eq!(vault.swap_destination(), 0);
}

#[test]
fn collects_fees() {
    let mut vault = one_destination_vault();
    assert_eq!(vault.total_fees(), 0);

    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(vault.total_fees(), BASE_UNIT * 10 / 1_000);

    let sweep = vault.collect_fees(OWNER).unwrap();
    assert_eq!(sweep.amount, BASE_UNIT / 100);
    assert_eq!(vault.total_fees(), 0);

    assert_eq!(vault.collect_fees(OWNER), Err(VaultError::NothingToSweep));
}

#[test]
fn fees_accrue_across_deposits() {
    let mut vault = two_destination_vault();
    vault.deposit(ALICE, 3 * BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(vault.total_fees(), 4 * BASE_UNIT / 100);
}

#[test]
fn gets_earned_rewards() {
    let mut vault = two_destination_vault();
    vault.deposit(OWNER, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(vault.earned_rewards(OWNER).unwrap(), 0);

    vault.adapter_mut().advance(50_000);
    let rewards = vault.earned_rewards(OWNER).unwrap();
    assert!(rewards > 0);

    // Read-only: asking again changes nothing.
    let before = vault.position_of(OWNER, 0);
    assert_eq!(vault.earned_rewards(OWNER).unwrap(), rewards);
    assert_eq!(vault.position_of(OWNER, 0), before);
}

#[test]
fn late_depositor_does_not_share_earlier_rewards() {
    let mut vault = one_destination_vault();
    vault.deposit(ALICE, 1_000, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(100);
    let alice_before = vault.earned_rewards(ALICE).unwrap();
    assert!(alice_before > 0);

    vault.deposit(BOB, 1_000, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(vault.earned_rewards(ALICE).unwrap(), alice_before);
    assert_eq!(vault.earned_rewards(BOB).unwrap(), 0);
    assert_eq!(vault.withdraw(BOB, DEFAULT_SLIPPAGE).unwrap().total, 990);

    // Alice still collects everything that accrued while she was alone.
    let withdrawal = vault.withdraw(ALICE, DEFAULT_SLIPPAGE).unwrap();
    assert_eq!(withdrawal.total, 990 + alice_before);
}

#[test]
fn rewards_after_second_deposit_are_shared_by_stake() {
    let mut vault = vault_with_pools(pool_a().with_reward_per_tick(99), pool_b());
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault.deposit(ALICE, 1_000, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().advance(5);
    vault.deposit(BOB, 1_000, DEFAULT_SLIPPAGE).unwrap();

    // 990 LP staked in total; 990 units emitted over 10 ticks split evenly.
    vault.adapter_mut().advance(10);
    assert_eq!(vault.earned_rewards(ALICE).unwrap(), 495 + 495);
    assert_eq!(vault.earned_rewards(BOB).unwrap(), 495);
}

#[test]
fn earned_rewards_for_stranger_is_zero() {
    let vault = two_destination_vault();
    assert_eq!(vault.earned_rewards(ALICE).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Access Control
// ---------------------------------------------------------------------------

#[test]
fn admin_operations_reject_non_owner_and_leave_state_unchanged() {
    let mut vault = two_destination_vault();
    vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.drain_events();
    let state = vault.state();
    let destinations = vault.destinations().to_vec();

    let results = [
        vault
            .add_destination(MALLORY, NewDestination::new("0xR", "0xF", 1, "0xL"))
            .map(|_| ()),
        vault.set_destination_active(MALLORY, 0, false),
        vault.set_swap_destination(MALLORY, 1),
        vault.collect_fees(MALLORY).map(|_| ()),
        vault.set_fee_recipient(MALLORY, MALLORY),
        vault.transfer_ownership(MALLORY, MALLORY),
        vault.pause(MALLORY),
    ];
    for result in results {
        assert!(matches!(result, Err(VaultError::Unauthorized { .. })));
    }

    vault.pause(OWNER).unwrap();
    assert!(matches!(
        vault.unpause(MALLORY),
        Err(VaultError::Unauthorized { .. })
    ));
    vault.unpause(OWNER).unwrap();
    vault.drain_events();

    assert_eq!(vault.state(), state);
    assert_eq!(vault.destinations(), destinations.as_slice());
}

#[test]
fn admin_operations_allowed_while_paused() {
    let mut vault = bare_vault();
    vault.pause(OWNER).unwrap();
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault.add_destination(OWNER, pool_b().registration()).unwrap();
    vault.set_destination_active(OWNER, 0, false).unwrap();
    vault.set_swap_destination(OWNER, 1).unwrap();
    assert_eq!(vault.active_count(), 1);
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[test]
fn failed_conversion_rolls_back_whole_deposit() {
    let mut vault = two_destination_vault();
    vault.adapter_mut().fail_converts(ROUTER_B);

    let err = vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap_err();
    assert!(matches!(err, VaultError::AdapterFailure(_)));

    // Leg A had already converted; it must be undone.
    assert_eq!(vault.adapter().farm(ROUTER_A).unwrap().staked, 0);
    assert!(!vault.is_participating(ALICE, 0));
    assert_eq!(vault.total_fees(), 0);

    vault.adapter_mut().heal(ROUTER_B);
    vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    assert!(vault.is_participating(ALICE, 1));
}

#[test]
fn failed_unwind_rolls_back_whole_withdrawal() {
    let mut vault = two_destination_vault();
    vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    let staked_a = vault.adapter().farm(ROUTER_A).unwrap().staked;
    let position_a = vault.position_of(ALICE, 0);
    vault.adapter_mut().fail_unwinds(ROUTER_B);

    let err = vault.withdraw(ALICE, DEFAULT_SLIPPAGE).unwrap_err();
    assert!(matches!(err, VaultError::AdapterFailure(_)));
    assert_eq!(vault.adapter().farm(ROUTER_A).unwrap().staked, staked_a);
    assert_eq!(vault.position_of(ALICE, 0), position_a);
    assert!(vault.is_participating(ALICE, 1));

    vault.adapter_mut().heal(ROUTER_B);
    assert!(vault.withdraw(ALICE, DEFAULT_SLIPPAGE).is_ok());
}

#[test]
fn deposit_beyond_slippage_tolerance_rolls_back() {
    let mut vault = vault_with_pools(pool_a(), pool_b().with_execution_loss(20));
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault.add_destination(OWNER, pool_b().registration()).unwrap();

    let err = vault
        .deposit(ALICE, BASE_UNIT, Slippage::new(10).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::AdapterFailure(AdapterError::SlippageExceeded { .. })
    ));
    assert_eq!(err.code(), "slippage_exceeded");
    assert_eq!(vault.adapter().farm(ROUTER_A).unwrap().staked, 0);
    assert!(!vault.is_participating(ALICE, 0));
    assert_eq!(vault.total_fees(), 0);

    let allocation = vault
        .deposit(ALICE, BASE_UNIT, Slippage::new(20).unwrap())
        .unwrap();
    assert_eq!(allocation.fee + allocation.allocated_total(), BASE_UNIT);
    assert!(vault.position_of(ALICE, 1).lp_amount < vault.position_of(ALICE, 0).lp_amount);
}

#[test]
fn withdraw_beyond_slippage_tolerance_rolls_back() {
    let mut vault = vault_with_pools(pool_a().with_execution_loss(20), pool_b());
    vault.add_destination(OWNER, pool_a().registration()).unwrap();
    vault.deposit(ALICE, 1_000, Slippage::MAX).unwrap();
    let position = vault.position_of(ALICE, 0);

    let err = vault.withdraw(ALICE, Slippage::ZERO).unwrap_err();
    assert_eq!(err.code(), "slippage_exceeded");
    assert_eq!(vault.position_of(ALICE, 0), position);
    assert_eq!(
        vault.adapter().farm(ROUTER_A).unwrap().staked,
        position.lp_amount
    );

    let withdrawal = vault.withdraw(ALICE, Slippage::new(20).unwrap()).unwrap();
    assert!(withdrawal.total < 990);
    assert!(!vault.is_participating(ALICE, 0));
}

#[test]
fn failed_reward_query_surfaces_adapter_failure() {
    let mut vault = one_destination_vault();
    vault.deposit(ALICE, BASE_UNIT, DEFAULT_SLIPPAGE).unwrap();
    vault.adapter_mut().fail_rewards(ROUTER_A);
    assert!(matches!(
        vault.earned_rewards(ALICE),
        Err(VaultError::AdapterFailure(_))
    ));
}
