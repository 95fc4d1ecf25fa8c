//! Property-based tests for ledger invariants
//!
//! - Conservation: donations move coins, never create or destroy them
//! - Atomicity: a rejected donation leaves every record untouched
//! - Non-negative balances under any sequence of donations
//! - No self-donation, whatever the amount
//! - Concurrent donations from one payer never overdraw

use ledger_core::{
    AccountId, Config, Direction, Ledger, MemoryStore, NewAccount, NewPost, PostId,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

const ACCOUNTS: [&str; 3] = ["alice", "bob", "carol"];

struct World {
    ledger: Ledger<MemoryStore>,
    accounts: Vec<AccountId>,
    posts: Vec<PostId>,
}

/// Accounts with the given balances; one post per account
fn world(balances: &[Decimal]) -> World {
    let ledger = Ledger::new(Arc::new(MemoryStore::new()), &Config::default()).unwrap();
    let feed = ledger.feed();

    let mut accounts = Vec::new();
    let mut posts = Vec::new();
    for (name, balance) in ACCOUNTS.iter().zip(balances) {
        let account = ledger.open_account(NewAccount::new(*name)).unwrap();
        ledger
            .adjust_balance(&account.id, *balance - account.balance)
            .unwrap();
        let post = feed
            .create_post(NewPost::new(account.id.clone(), format!("{} says hi", name)))
            .unwrap();
        accounts.push(account.id);
        posts.push(post.id);
    }

    World {
        ledger,
        accounts,
        posts,
    }
}

/// Balances, post totals and donation count
fn snapshot(w: &World) -> (Vec<Decimal>, Vec<Decimal>, usize) {
    let balances = w
        .accounts
        .iter()
        .map(|a| w.ledger.balance(a).unwrap())
        .collect();
    let feed = w.ledger.feed();
    let totals = w
        .posts
        .iter()
        .map(|p| feed.get_post(p).unwrap().donations_received)
        .collect();
    let donations = w
        .accounts
        .iter()
        .map(|a| w.ledger.donations_for_account(a, Direction::Sent).unwrap().len())
        .sum();
    (balances, totals, donations)
}

/// Strategy for positive amounts with cent precision
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..20_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..50_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// (payer index, payee index, post index, amount)
fn donation_strategy() -> impl Strategy<Value = (usize, usize, usize, Decimal)> {
    (0usize..3, 0usize..3, 0usize..3, amount_strategy())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: total coins are conserved and every committed amount lands on its post
    #[test]
    fn prop_conservation(
        balances in prop::collection::vec(balance_strategy(), 3),
        donations in prop::collection::vec(donation_strategy(), 1..40),
    ) {
        let w = world(&balances);
        let total_before: Decimal = balances.iter().copied().sum();
        let mut committed = Decimal::ZERO;

        for (from, to, post, amount) in donations {
            let before = snapshot(&w);
            let result = w.ledger.create_donation(&w.accounts[from], &w.accounts[to], amount, &w.posts[post]);

            match result {
                Ok(record) => {
                    committed += amount;
                    let after = snapshot(&w);
                    prop_assert_eq!(after.0[from], before.0[from] - amount);
                    prop_assert_eq!(after.0[to], before.0[to] + amount);
                    prop_assert_eq!(after.1[post], before.1[post] + amount);
                    prop_assert_eq!(record.amount, amount);
                }
                Err(e) => {
                    prop_assert!(e.is_rejection());
                    prop_assert_eq!(snapshot(&w), before);
                }
            }
        }

        let (balances_after, totals_after, _) = snapshot(&w);
        prop_assert_eq!(balances_after.iter().copied().sum::<Decimal>(), total_before);
        prop_assert_eq!(totals_after.iter().copied().sum::<Decimal>(), committed);
        prop_assert!(balances_after.iter().all(|b| *b >= Decimal::ZERO));
    }

    /// Property: a donation above the payer balance is rejected without effects
    #[test]
    fn prop_insufficient_balance_rejected(
        balance in balance_strategy(),
        excess in amount_strategy(),
    ) {
        let w = world(&[balance, Decimal::ZERO, Decimal::ZERO]);
        let before = snapshot(&w);

        let err = w
            .ledger
            .create_donation(&w.accounts[0], &w.accounts[1], balance + excess, &w.posts[1])
            .unwrap_err();

        prop_assert_eq!(err.reason_code(), "insufficient_balance");
        prop_assert_eq!(snapshot(&w), before);
    }

    /// Property: paying yourself is always rejected, even with funds
    #[test]
    fn prop_no_self_donation(amount in amount_strategy(), who in 0usize..3) {
        let w = world(&[Decimal::from(1000), Decimal::from(1000), Decimal::from(1000)]);
        let before = snapshot(&w);

        let err = w
            .ledger
            .create_donation(&w.accounts[who], &w.accounts[who], amount, &w.posts[(who + 1) % 3])
            .unwrap_err();

        prop_assert_eq!(err.reason_code(), "self_donation");
        prop_assert_eq!(snapshot(&w), before);
    }

    /// Property: non-positive amounts are rejected before anything else
    #[test]
    fn prop_non_positive_amount_rejected(cents in -20_000i64..=0) {
        let w = world(&[Decimal::from(100), Decimal::ZERO, Decimal::ZERO]);
        let err = w
            .ledger
            .create_donation(&w.accounts[0], &w.accounts[0], Decimal::new(cents, 2), &PostId::new("missing"))
            .unwrap_err();
        prop_assert_eq!(err.reason_code(), "invalid_amount");
    }
}

#[test]
fn test_donation_scenario() {
    let w = world(&[Decimal::from(100), Decimal::ZERO, Decimal::ZERO]);
    let (alice, bob) = (&w.accounts[0], &w.accounts[1]);

    w.ledger
        .create_donation(alice, bob, Decimal::from(30), &w.posts[1])
        .unwrap();

    assert_eq!(w.ledger.balance(alice).unwrap(), Decimal::from(70));
    assert_eq!(w.ledger.balance(bob).unwrap(), Decimal::from(30));
    assert_eq!(
        w.ledger.feed().get_post(&w.posts[1]).unwrap().donations_received,
        Decimal::from(30)
    );
}

#[test]
fn test_rejected_scenario() {
    let w = world(&[Decimal::from(10), Decimal::ZERO, Decimal::ZERO]);
    let before = snapshot(&w);

    let err = w
        .ledger
        .create_donation(&w.accounts[0], &w.accounts[1], Decimal::from(30), &w.posts[1])
        .unwrap_err();

    assert_eq!(err.reason_code(), "insufficient_balance");
    assert_eq!(snapshot(&w), before);
}

#[test]
fn test_concurrent_donations_never_overdraw() {
    let w = world(&[Decimal::from(100), Decimal::ZERO, Decimal::ZERO]);
    let (alice, bob, carol) = (&w.accounts[0], &w.accounts[1], &w.accounts[2]);

    let committed = std::thread::scope(|s| {
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let ledger = &w.ledger;
                let to = if i % 2 == 0 { bob } else { carol };
                let post = &w.posts[if i % 2 == 0 { 1 } else { 2 }];
                s.spawn(move || ledger.create_donation(alice, to, Decimal::from(10), post).is_ok())
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join())
            .filter(|joined| matches!(joined, Ok(true)))
            .count()
    });

    assert_eq!(committed, 10);
    assert_eq!(w.ledger.balance(alice).unwrap(), Decimal::ZERO);
    let (balances, totals, donations) = snapshot(&w);
    assert_eq!(balances.iter().copied().sum::<Decimal>(), Decimal::from(100));
    assert_eq!(totals.iter().copied().sum::<Decimal>(), Decimal::from(100));
    assert_eq!(donations, 10);
}

#[test]
fn test_concurrent_likes_and_donations_keep_both() {
    let w = world(&[Decimal::from(1000), Decimal::ZERO, Decimal::ZERO]);
    let feed = w.ledger.feed();
    let post = &w.posts[1];

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..100 {
                w.ledger
                    .create_donation(&w.accounts[0], &w.accounts[1], Decimal::ONE, post)
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..50 {
                feed.like(post, &w.accounts[2]).unwrap();
                feed.unlike(post, &w.accounts[2]).unwrap();
            }
            feed.add_comment(post, &w.accounts[2], "well done").unwrap();
        });
    });

    let post = feed.get_post(post).unwrap();
    assert_eq!(post.donations_received, Decimal::from(100));
    assert_eq!(post.comments_count, 1);
    assert_eq!(post.likes_count(), 0);
}
