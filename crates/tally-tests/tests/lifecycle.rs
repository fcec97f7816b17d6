//! End-to-end position lifecycle tests against in-memory collaborators.

use proptest::prelude::*;

use tally_compound::compound;
use tally_core::constants::SECONDS_PER_DAY;
use tally_core::error::LedgerError;
use tally_core::events::LedgerEvent;
use tally_core::types::{PositionSlot, Rate};
use tally_ledger::TransferRecord;
use tally_tests::helpers::*;

#[test]
fn worked_example_one_stale_day() {
    let fx = Fixture::with_schedule(example_schedule(), 0);
    let alice = user("alice");
    fx.fund(&alice, 1_000);

    let id = fx.ledger.stake(&alice, 1_000, 30).unwrap();
    fx.advance_days(31);

    let expected = compound(
        Rate::from_ppm(50),
        compound(Rate::from_ppm(200), 1_000, 30).unwrap(),
        1,
    )
    .unwrap();
    assert_eq!(fx.ledger.withdrawable_amount(&alice, id).unwrap(), expected);
}

#[test]
fn immediate_query_is_term_not_elapsed() {
    let fx = Fixture::new(0);
    let alice = user("alice");
    fx.fund(&alice, 10 * TOKEN);
    for period in [30, 180, 1_460] {
        let id = fx.ledger.stake(&alice, TOKEN, period).unwrap();
        assert!(matches!(
            fx.ledger.withdrawable_amount(&alice, id),
            Err(LedgerError::TermNotElapsed { id: e, .. }) if e == id
        ));
    }
}

#[test]
fn withdraw_all_at_exact_term_for_every_tier() {
    let schedule = example_schedule();
    for tier in *schedule.tiers() {
        let fx = Fixture::with_schedule(schedule.clone(), 10_000 * TOKEN);
        let alice = user("alice");
        fx.fund(&alice, 1_000 * TOKEN);

        let id = fx.ledger.stake(&alice, 1_000 * TOKEN, tier.period).unwrap();
        fx.advance_days(tier.period);

        let expected = compound(tier.rate, 1_000 * TOKEN, tier.period).unwrap();
        let receipt = fx.ledger.withdraw_all(&alice, id).unwrap();
        assert_eq!(receipt.withdrawn, expected, "tier {}d", tier.period);
        assert_eq!(receipt.remainder, None);
        assert_eq!(fx.backend.assets.balance_of(&alice), expected);
        assert_eq!(
            fx.ledger.position(&alice, id),
            Some(PositionSlot::Closed { id })
        );
        assert!(fx.ledger.active_positions(&alice).is_empty());
    }
}

#[test]
fn stale_days_compound_at_minimum_rate_only_when_whole() {
    let fx = Fixture::with_schedule(example_schedule(), 0);
    let alice = user("alice");
    fx.fund(&alice, 1_000 * TOKEN);
    let id = fx.ledger.stake(&alice, 1_000 * TOKEN, 180).unwrap();

    let at_term = compound(Rate::from_ppm(400), 1_000 * TOKEN, 180).unwrap();

    fx.advance_days(180);
    fx.advance_secs(SECONDS_PER_DAY - 1);
    assert_eq!(fx.ledger.withdrawable_amount(&alice, id).unwrap(), at_term);

    for k in 1..=5u64 {
        fx.advance_secs(if k == 1 { 1 } else { SECONDS_PER_DAY });
        assert_eq!(
            fx.ledger.withdrawable_amount(&alice, id).unwrap(),
            compound(Rate::from_ppm(50), at_term, k).unwrap(),
            "k = {k}"
        );
    }
}

#[test]
fn partial_withdraw_closes_restakes_and_pays_exactly() {
    let fx = Fixture::new(1_000 * TOKEN);
    let alice = user("alice");
    fx.fund(&alice, 500 * TOKEN);
    let id = fx.ledger.stake(&alice, 500 * TOKEN, 180).unwrap();
    fx.advance_days(185);

    let available = fx.ledger.withdrawable_amount(&alice, id).unwrap();
    let transfers_before = fx.backend.assets.transfers().len();
    let receipt = fx.ledger.withdraw(&alice, id, 100 * TOKEN).unwrap();

    // (a) original closed
    assert!(fx.ledger.position(&alice, id).unwrap().is_closed());
    // (b) exactly one new position with the remainder at the rollover period
    let active = fx.ledger.active_positions(&alice);
    assert_eq!(active.len(), 1);
    let rem = &active[0];
    assert_eq!(Some(rem.id), receipt.remainder);
    assert_eq!(rem.staked_amount, available - 100 * TOKEN);
    assert_eq!(
        rem.staking_period,
        fx.ledger.schedule().period_for_minimum_rate()
    );
    assert_eq!(rem.start_time, fx.ledger.now());
    // (c) exactly `w` left custody
    let transfers = fx.backend.assets.transfers();
    assert_eq!(transfers.len(), transfers_before + 1);
    assert_eq!(
        transfers.last(),
        Some(&TransferRecord::Out {
            to: alice.clone(),
            amount: 100 * TOKEN
        })
    );
}

#[test]
fn withdrawn_event_reports_closed_position_fields() {
    let fx = Fixture::new(1_000 * TOKEN);
    let alice = user("alice");
    fx.fund(&alice, 500 * TOKEN);
    let id = fx.ledger.stake(&alice, 500 * TOKEN, 30).unwrap();
    fx.advance_days(40);
    fx.ledger.withdraw(&alice, id, 7).unwrap();

    let end = START + 40 * SECONDS_PER_DAY;
    let last = fx.backend.events.events().pop().unwrap();
    assert_eq!(
        last,
        LedgerEvent::Withdrawn {
            caller: alice,
            id,
            staked_amount: 500 * TOKEN,
            withdraw_amount: 7,
            period: 30,
            start_time: START,
            end_time: end,
        }
    );
}

#[test]
fn mismatched_batches_change_nothing() {
    let fx = Fixture::new(1_000 * TOKEN);
    let alice = user("alice");
    fx.fund(&alice, 1_000 * TOKEN);
    let id = fx.ledger.stake(&alice, TOKEN, 30).unwrap();
    fx.advance_days(30);
    let snapshot = fx.ledger.positions(&alice);
    let transfers = fx.backend.assets.transfers().len();
    let events = fx.backend.events.len();

    assert_eq!(
        fx.ledger.stake_batch(&alice, &[TOKEN, TOKEN], &[30]),
        Err(LedgerError::LengthMismatch { left: 2, right: 1 })
    );
    assert_eq!(
        fx.ledger.withdraw_batch(&alice, &[id], &[]),
        Err(LedgerError::LengthMismatch { left: 1, right: 0 })
    );

    assert_eq!(fx.ledger.positions(&alice), snapshot);
    assert_eq!(fx.backend.assets.transfers().len(), transfers);
    assert_eq!(fx.backend.events.len(), events);
    assert_eq!(fx.ledger.next_id(), id + 1);
}

#[test]
fn rollovers_never_reuse_ids_and_keep_closed_slots() {
    let fx = Fixture::new(1_000 * TOKEN);
    let alice = user("alice");
    fx.fund(&alice, 100 * TOKEN);

    let first = fx.ledger.stake(&alice, 100 * TOKEN, 30).unwrap();
    fx.advance_days(30);
    let second = fx.ledger.extend_staking_period(&alice, first, 30).unwrap();
    fx.advance_days(30);
    let third = fx.ledger.extend_staking_period(&alice, second, 180).unwrap();
    fx.advance_days(180);
    let receipt = fx.ledger.withdraw(&alice, third, TOKEN).unwrap();

    let slots = fx.ledger.positions(&alice);
    let ids: Vec<_> = slots.iter().map(PositionSlot::id).collect();
    assert_eq!(ids, vec![first, second, third, receipt.remainder.unwrap()]);
    assert!(slots[..3].iter().all(PositionSlot::is_closed));
    assert!(!slots[3].is_closed());

    for closed in [first, second, third] {
        assert_eq!(
            fx.ledger.withdraw_all(&alice, closed),
            Err(LedgerError::InvalidPosition(closed))
        );
    }
}

#[test]
fn extend_compounds_term_value_into_next_principal() {
    let fx = Fixture::new(0);
    let alice = user("alice");
    fx.fund(&alice, 1_000 * TOKEN);
    let id = fx.ledger.stake(&alice, 1_000 * TOKEN, 30).unwrap();
    fx.advance_days(32);

    let value = fx.ledger.withdrawable_amount(&alice, id).unwrap();
    let new_id = fx.ledger.extend_staking_period(&alice, id, 1_460).unwrap();
    let p = fx.ledger.position(&alice, new_id).unwrap();
    assert_eq!(p.active().unwrap().staked_amount, value);
    assert_eq!(fx.ledger.total_staked(&alice).unwrap(), value);
    // Custody is untouched by a roll-over.
    assert_eq!(fx.backend.assets.custody(), 1_000 * TOKEN);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn withdrawable_matches_tier_then_minimum_rate(
        amount in 1u128..=1_000_000 * TOKEN,
        tier_index in 0usize..3,
        extra_secs in 0u64..(400 * SECONDS_PER_DAY),
    ) {
        let schedule = example_schedule();
        let tier = schedule.tiers()[tier_index];
        let fx = Fixture::with_schedule(schedule.clone(), 0);
        let alice = user("alice");
        fx.fund(&alice, amount);

        let id = fx.ledger.stake(&alice, amount, tier.period).unwrap();
        fx.advance_days(tier.period);
        fx.advance_secs(extra_secs);

        let at_term = compound(tier.rate, amount, tier.period).unwrap();
        let extra_days = extra_secs / SECONDS_PER_DAY;
        let expected = if extra_days >= 1 {
            compound(schedule.minimum_rate(), at_term, extra_days).unwrap()
        } else {
            at_term
        };
        prop_assert_eq!(fx.ledger.withdrawable_amount(&alice, id).unwrap(), expected);
    }

    #[test]
    fn partial_withdraw_conserves_value(
        amount in 1_000u128..=1_000 * TOKEN,
        fraction_ppm in 1u128..1_000_000,
    ) {
        let fx = Fixture::new(10_000 * TOKEN);
        let alice = user("alice");
        fx.fund(&alice, amount);
        let id = fx.ledger.stake(&alice, amount, 30).unwrap();
        fx.advance_days(30);

        let available = fx.ledger.withdrawable_amount(&alice, id).unwrap();
        let w = (available * fraction_ppm / 1_000_000).max(1);
        let receipt = fx.ledger.withdraw(&alice, id, w).unwrap();

        let remaining = fx.ledger.total_staked(&alice).unwrap();
        prop_assert_eq!(w + remaining, available);
        prop_assert_eq!(receipt.remainder.is_some(), remaining > 0);
        prop_assert_eq!(fx.backend.assets.balance_of(&alice), w);
    }
}
