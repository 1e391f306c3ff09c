//! Property tests for the sniper fund split
//!
//! Any sequence of slider adjustments keeps the split valid, raising a wallet
//! on a full split is refused, and the lamport allocation derived from a
//! valid split always adds up to the budget.

use launch_bundler::distributor::{WalletFundDistributor, MAX_WALLETS, SUM_TOLERANCE};
use launch_bundler::request::{allocate, sol_to_lamports};
use launch_bundler::wallet::SniperSigner;
use proptest::prelude::*;

fn assert_valid(shares: &[f64], count: usize) {
    assert_eq!(shares.len(), count);
    assert!(shares.iter().all(|s| *s >= 0.0), "negative share in {:?}", shares);
    let total: f64 = shares.iter().sum();
    assert!(
        (total - 100.0).abs() < SUM_TOLERANCE,
        "split {:?} sums to {}",
        shares,
        total
    );
}

proptest! {
    #[test]
    fn equal_split_is_valid(count in 1usize..=MAX_WALLETS) {
        let shares = WalletFundDistributor::equal_split(count).unwrap();
        assert_valid(&shares, count);
    }

    #[test]
    fn adjustments_keep_split_valid(
        count in 1usize..=MAX_WALLETS,
        moves in prop::collection::vec((0usize..MAX_WALLETS, 0.0f64..=100.0), 1..12),
    ) {
        let mut distributor = WalletFundDistributor::new(count).unwrap();
        for (index, value) in moves {
            let before = distributor.shares().to_vec();
            let outcome = distributor.adjust(index % count, value);
            if outcome.is_applied() {
                assert_valid(distributor.shares(), count);
            } else {
                prop_assert_eq!(distributor.shares(), before.as_slice());
            }
        }
    }

    #[test]
    fn out_of_range_values_are_rejected(
        count in 2usize..=MAX_WALLETS,
        value in prop_oneof![100.01f64..1_000.0, -1_000.0f64..-0.01],
    ) {
        let mut distributor = WalletFundDistributor::new(count).unwrap();
        let before = distributor.shares().to_vec();
        prop_assert!(!distributor.adjust(0, value).is_applied());
        prop_assert_eq!(distributor.shares(), before.as_slice());
    }

    #[test]
    fn increases_on_full_split_are_rejected(
        count in 1usize..=MAX_WALLETS,
        index in 0usize..MAX_WALLETS,
        raise in 0.2f64..=100.0,
    ) {
        let mut distributor = WalletFundDistributor::new(count).unwrap();
        let index = index % count;
        let before = distributor.shares().to_vec();
        let target = before[index] + raise;
        prop_assert!(!distributor.adjust(index, target).is_applied());
        prop_assert_eq!(distributor.shares(), before.as_slice());
    }

    #[test]
    fn allocation_spends_exact_budget(
        count in 1usize..=MAX_WALLETS,
        total_sol in 0.001f64..50.0,
        slider in 0.0f64..=100.0,
    ) {
        let mut distributor = WalletFundDistributor::new(count).unwrap();
        distributor.adjust(count - 1, slider);
        let signers = (0..count).map(|_| SniperSigner::generate()).collect();

        let allocations = allocate(total_sol, distributor.shares(), signers).unwrap();
        let spent: u64 = allocations.iter().map(|a| a.lamports).sum();
        prop_assert_eq!(spent, sol_to_lamports(total_sol));
        for (i, a) in allocations.iter().enumerate() {
            prop_assert_eq!(a.index, i);
        }
    }
}
