use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    session::bench_dispatch_message,
    session::bench_connect_cycle,
    session::bench_split_topic
);
criterion_main!(benches);
