//! Benchmarks for bundle assembly and the relay wire format
//!
//! Benchmarks:
//! - Assembling pool + liquidity + N buys, with order checks
//! - Encoding an assembled bundle to base64 wire transactions
//! - Constant-product quote and minimum-output math

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use solana_sdk::{
    hash::Hash,
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::VersionedTransaction,
};

use launch_bundler::tx_builder::{
    assemble, curve, instructions::tip_instruction, BuiltTransaction, TipSpec,
};
use launch_bundler::TxKind;

/// Helper: a signed one-transfer transaction paid by `payer`
fn signed_transfer(
    payer: &Keypair,
    to: &Pubkey,
    lamports: u64,
    blockhash: Hash,
) -> VersionedTransaction {
    let ix = tip_instruction(&payer.pubkey(), to, lamports).unwrap();
    let message = Message::new_with_blockhash(&[ix], Some(&payer.pubkey()), &blockhash);
    VersionedTransaction::try_new(VersionedMessage::Legacy(message), &[payer]).unwrap()
}

struct Parts {
    pool: BuiltTransaction,
    liquidity: BuiltTransaction,
    snipes: Vec<BuiltTransaction>,
    tip: TipSpec,
}

fn parts(buys: usize) -> Parts {
    let blockhash = Hash::new_unique();
    let wallet = Keypair::new();
    let tip = TipSpec {
        account: Pubkey::new_unique(),
        lamports: 10_000,
    };

    let pool = BuiltTransaction::new(
        signed_transfer(&wallet, &Pubkey::new_unique(), 1, blockhash),
        TxKind::Pool,
        None,
    );
    let liquidity = BuiltTransaction::new(
        signed_transfer(&wallet, &tip.account, tip.lamports, blockhash),
        TxKind::Liquidity,
        None,
    );
    let snipes = (0..buys)
        .map(|i| {
            let sniper = Keypair::new();
            BuiltTransaction::new(
                signed_transfer(&sniper, &Pubkey::new_unique(), 400_000_000, blockhash),
                TxKind::Buy,
                Some(i),
            )
        })
        .collect();

    Parts {
        pool,
        liquidity,
        snipes,
        tip,
    }
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_assemble");
    for buys in [1usize, 3, 10] {
        let template = parts(buys);
        group.bench_with_input(BenchmarkId::from_parameter(buys), &buys, |b, _| {
            b.iter(|| {
                let mut snipes = template.snipes.clone();
                snipes.reverse();
                let bundle = assemble(
                    template.pool.clone(),
                    template.liquidity.clone(),
                    snipes,
                    template.tip,
                )
                .unwrap();
                black_box(bundle.tip_embedded())
            })
        });
    }
    group.finish();
}

fn bench_encode_wire(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_encode_wire");
    for buys in [3usize, 10] {
        let p = parts(buys);
        let bundle = assemble(p.pool, p.liquidity, p.snipes, p.tip).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(buys), &bundle, |b, bundle| {
            b.iter(|| black_box(bundle.encode_wire().unwrap()))
        });
    }
    group.finish();
}

fn bench_curve(c: &mut Criterion) {
    c.bench_function("curve_quote_and_minimum", |b| {
        b.iter(|| {
            let quote = curve::swap_base_input(
                black_box(400_000_000),
                5_000_000_000,
                1_000_000_000_000,
                2_500,
            )
            .unwrap();
            let minimum = curve::min_amount_out(
                1_000_000_000_000,
                black_box(400_000_000),
                5_000_000_000,
                10.0,
            );
            black_box(quote.amount_out >= minimum)
        })
    });
}

criterion_group!(benches, bench_assemble, bench_encode_wire, bench_curve);
criterion_main!(benches);
