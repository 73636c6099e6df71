//! # Ledger Benchmark
//!
//! REQUIREMENTS:
//! - Fingerprinting a login costs less than a frame decode
//! - Blacklist increments stay cheap under a flood of distinct addresses
//!
//! Run with: `cargo bench --package bastion_security`

#![allow(missing_docs)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use bastion_security::{Blacklist, Fingerprint, RateLimiter};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Distinct addresses per flood.
const FLOOD: u32 = 10_000;

fn address(index: u32) -> IpAddr {
    IpAddr::V4(Ipv4Addr::from(0x0A00_0000 | index))
}

fn bench_fingerprint(c: &mut Criterion) {
    let address = address(42);
    c.bench_function("fingerprint", |b| {
        b.iter(|| black_box(Fingerprint::of(black_box("Steve_01"), address)));
    });
}

fn bench_blacklist_flood(c: &mut Criterion) {
    c.bench_function("blacklist_flood", |b| {
        b.iter(|| {
            let blacklist = Blacklist::new(Duration::from_secs(600));
            let now = Instant::now();
            for index in 0..FLOOD {
                black_box(blacklist.increment_at(address(index % 512), now));
            }
        });
    });
}

fn bench_rate_limiter(c: &mut Criterion) {
    c.bench_function("rate_limiter_attempts", |b| {
        b.iter(|| {
            let limiter = RateLimiter::new(Duration::from_secs(8));
            let now = Instant::now();
            for index in 0..FLOOD {
                black_box(limiter.attempt_at(address(index), now));
            }
        });
    });
}

criterion_group!(benches, bench_fingerprint, bench_blacklist_flood, bench_rate_limiter);
criterion_main!(benches);
