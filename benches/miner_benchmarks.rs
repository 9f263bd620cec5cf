//! Performance Benchmarks for the Miner stack
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use miner::node::{LocalNode, NodeConfig};
use miner::prelude::*;
use miner_contracts::{ManualClock, SECONDS_PER_DAY};
use miner_fhe::FHEConfig;
use std::sync::Arc;

// =============================================================================
// ENCRYPTED ARITHMETIC
// =============================================================================

fn bench_store_ops<B: FheBackend>(c: &mut Criterion, name: &str, backend: B, sample_size: usize) {
    let mut group = c.benchmark_group(format!("store_ops/{}", name));
    group.sample_size(sample_size);
    let store = ConfidentialValueStore::with_seed(backend, [1u8; 32]);
    let contract = Address::from_label("bench");
    let power = store.trivial(contract, 64).unwrap();

    group.bench_function("add", |b| {
        b.iter(|| store.add(contract, power, power).unwrap())
    });
    group.bench_function("scalar_multiply", |b| {
        b.iter(|| store.scalar_multiply(contract, power, 7).unwrap())
    });
    group.bench_function("sample_power", |b| {
        b.iter(|| {
            let random = store.random(contract).unwrap();
            let bounded = store.rem_scalar(contract, random, 81).unwrap();
            store.add_scalar(contract, bounded, 20).unwrap()
        })
    });

    group.finish();
}

fn bench_mock_store(c: &mut Criterion) {
    bench_store_ops(c, "mock", MockBackend, 100);
}

fn bench_tfhe_store(c: &mut Criterion) {
    let backend = TfheBackend::generate(&FHEConfig::default()).unwrap();
    bench_store_ops(c, "tfhe", backend, 10);
}

// =============================================================================
// CONTRACT CALLS
// =============================================================================

fn bench_claim(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim");

    for days in [1u64, 30, 365] {
        group.bench_with_input(BenchmarkId::from_parameter(days), &days, |b, &days| {
            b.iter_with_setup(
                || {
                    let clock = Arc::new(ManualClock::new(1_700_000_000));
                    let devnet = miner_contracts::Devnet::deploy(
                        MockBackend,
                        DevnetConfig::local(),
                        clock.clone(),
                    )
                    .unwrap();
                    let alice = Address::from_label("alice");
                    devnet.submit(alice, Call::MintMiner).wait();
                    devnet.submit(alice, Call::Stake { token_id: 1 }).wait();
                    clock.advance(days * SECONDS_PER_DAY);
                    (devnet, alice)
                },
                |(devnet, alice)| devnet.submit(alice, Call::Claim { token_id: 1 }).wait(),
            )
        });
    }

    group.finish();
}

// =============================================================================
// USER DECRYPTION
// =============================================================================

fn bench_user_decrypt(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("user_decrypt");

    for tokens in [1usize, 8, 32] {
        let node = LocalNode::start(MockBackend, NodeConfig::local()).unwrap();
        let wallet = Wallet::from_seed([1u8; 32]);
        let miner = node.deployment().miner;
        let store = node.devnet().store();
        let pairs: Vec<HandleContractPair> = (0..tokens)
            .map(|i| {
                let handle = store.trivial(miner, i as u64).unwrap();
                store.allow(miner, handle, wallet.address()).unwrap();
                HandleContractPair::new(handle, miner)
            })
            .collect();
        let authorizer = node.authorizer();

        group.bench_with_input(BenchmarkId::from_parameter(tokens), &pairs, |b, pairs| {
            b.iter(|| runtime.block_on(authorizer.user_decrypt(&wallet, pairs)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mock_store,
    bench_claim,
    bench_user_decrypt,
    bench_tfhe_store,
);
criterion_main!(benches);
