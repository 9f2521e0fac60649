// Signing & verification benchmarks for QReceipt.
//
// Covers key generation, signing and verifying a canonical payload, the full
// offline receipt check, and receipt verification at various batch sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use qreceipt_protocol::config::LedgerConfig;
use qreceipt_protocol::crypto::{Ed25519Scheme, Keypair, SignatureScheme};
use qreceipt_protocol::ledger::Ledger;
use qreceipt_protocol::receipt::{verify, Receipt};
use qreceipt_protocol::transaction::{SubmittedTransaction, TransactionPayload};

fn payload() -> TransactionPayload {
    TransactionPayload {
        from_wallet: "7f0c3a52-9d4e-4c61-b1a8-2f7e5b6d9c10".into(),
        to_wallet: "1b2e4f6a-8c0d-4e2f-a3b5-c7d9e1f3a5b7".into(),
        amount: 10_000,
        currency: "USD".into(),
        nonce: 42,
        timestamp: 1_760_000_000,
    }
}

/// Seal `count` transfers and return their receipts.
fn receipts(count: u64) -> Vec<Receipt> {
    let ledger = Ledger::in_memory(LedgerConfig {
        seal_threshold: 0,
        ..LedgerConfig::default()
    });
    let keys: Keypair = Ed25519Scheme.generate_keypair();
    let wallet = ledger
        .create_wallet(keys.public_key.clone(), "ed25519", None)
        .unwrap();

    let ids: Vec<_> = (0..count)
        .map(|i| {
            let prepared = ledger.prepare(&wallet.wallet_id, "sink", i + 1, "USD").unwrap();
            let signature = Ed25519Scheme
                .sign(&keys.secret_key, &prepared.signing_bytes())
                .unwrap();
            ledger
                .submit(SubmittedTransaction {
                    prepared,
                    signature,
                    public_key: keys.public_key.clone(),
                })
                .unwrap()
                .tx_id
        })
        .collect();
    ledger.seal().unwrap();
    ids.iter().map(|id| ledger.get_receipt(id).unwrap()).collect()
}

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("ed25519/keypair_generate", |b| {
        b.iter(|| Ed25519Scheme.generate_keypair());
    });
}

fn bench_sign_payload(c: &mut Criterion) {
    let keys = Ed25519Scheme.generate_keypair();
    let message = payload().canonical_bytes();

    c.bench_function("ed25519/sign_payload", |b| {
        b.iter(|| Ed25519Scheme.sign(&keys.secret_key, &message).unwrap());
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let keys = Ed25519Scheme.generate_keypair();
    let message = payload().canonical_bytes();
    let signature = Ed25519Scheme.sign(&keys.secret_key, &message).unwrap();

    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| Ed25519Scheme.verify(&keys.public_key, &message, &signature));
    });
}

fn bench_canonical_encoding(c: &mut Criterion) {
    let payload = payload();
    c.bench_function("payload/canonical_hash", |b| {
        b.iter(|| payload.hash());
    });
}

fn bench_verify_receipts(c: &mut Criterion) {
    let mut group = c.benchmark_group("receipt/verify");

    for size in [1u64, 16, 256, 1024] {
        let batch = receipts(size);

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| batch.iter().all(|r| verify(r).valid));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_sign_payload,
    bench_verify_signature,
    bench_canonical_encoding,
    bench_verify_receipts,
);
criterion_main!(benches);
