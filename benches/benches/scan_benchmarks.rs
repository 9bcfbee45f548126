use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kvscan::{
    Client, HashScan, InMemoryStore, KvResult, RangeQuery, ScanArgs, ScoreRange, ScoredValue,
    SortedSetScan,
};

fn hash_client(fields: usize) -> Client<InMemoryStore> {
    let mut client = Client::new(InMemoryStore::new());
    let pairs: Vec<(Bytes, Bytes)> = (0..fields)
        .map(|i| (Bytes::from(format!("field:{i}")), Bytes::from(format!("value:{i}"))))
        .collect();
    client.hmset("h", &pairs).unwrap();
    client
}

fn zset_client(members: usize) -> Client<InMemoryStore> {
    let mut client = Client::new(InMemoryStore::new());
    let entries: Vec<(f64, Bytes)> = (0..members)
        .map(|i| ((i % 97) as f64, Bytes::from(format!("member:{i}"))))
        .collect();
    client.zadd_multi("z", &entries).unwrap();
    client
}

fn bench_hscan_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("hscan walk 10k");
    let mut client = hash_client(10_000);
    for count in [10u64, 100, 1000] {
        let args = ScanArgs::new().limit(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &args, |b, args| {
            b.iter(|| black_box(client.scan_all::<HashScan>("h", Some(args)).unwrap()))
        });
    }
    group.finish();
}

fn bench_zscan_bulk_vs_stream(c: &mut Criterion) {
    let mut client = zset_client(10_000);
    let args = ScanArgs::new().limit(500);

    c.bench_function("zscan bulk 10k", |b| {
        b.iter(|| black_box(client.scan_all::<SortedSetScan>("z", Some(&args)).unwrap()))
    });

    c.bench_function("zscan stream 10k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            let n = client
                .scan_all_stream::<SortedSetScan, _>(
                    &mut |sv: ScoredValue| -> KvResult<()> {
                        sum += sv.score;
                        Ok(())
                    },
                    "z",
                    Some(&args),
                )
                .unwrap();
            black_box((n, sum))
        })
    });
}

fn bench_range_by_score(c: &mut Criterion) {
    let mut client = zset_client(10_000);
    let query = RangeQuery::by_score(ScoreRange::new(10.0, 20.0)).with_scores();
    c.bench_function("zrangebyscore 10k", |b| {
        b.iter(|| black_box(client.zrange_with_scores("z", &query).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_hscan_walk,
    bench_zscan_bulk_vs_stream,
    bench_range_by_score
);

criterion_main!(benches);
