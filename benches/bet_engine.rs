use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roulette_table::{
    games::{bet_engine::canonical_selection, classify, BetPayload, BetType, SettlementResponse, Wager},
    FairRandomSource,
};

fn classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    for bet_type in BetType::ALL_VALID {
        let numbers = canonical_selection(bet_type);
        group.bench_function(BenchmarkId::new("valid", format!("{:?}", bet_type)), |b| {
            b.iter(|| black_box(classify(black_box(&numbers))))
        });
    }
    let invalid: Vec<i64> = vec![1, 5];
    group.bench_function("invalid_pair", |b| b.iter(|| black_box(classify(black_box(&invalid)))));
    group.finish();
}

fn round_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle_round");
    for size in [10usize, 100, 1_000] {
        let wagers: Vec<Wager> = (0..size)
            .map(|i| {
                let bet_type = BetType::ALL_VALID[i % BetType::ALL_VALID.len()];
                BetPayload::new(canonical_selection(bet_type), 5)
                    .into_wager(&format!("p{}", i), 1_000)
                    .expect("canonical selection")
            })
            .collect();

        group.bench_function(BenchmarkId::new("resolve", size), |b| {
            b.iter(|| black_box(SettlementResponse::resolve(1, black_box(17), &wagers)))
        });
    }
    group.finish();
}

fn spins(c: &mut Criterion) {
    c.bench_function("spin_seeded", |b| {
        let mut source = FairRandomSource::seeded(42);
        b.iter(|| black_box(source.spin().expect("seeded source never runs dry")))
    });
}

criterion_group!(benches, classification, round_settlement, spins);
criterion_main!(benches);
