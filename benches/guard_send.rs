//! Guarded send throughput.
//!
//! Measures binary frame writes through one `ConnectionGuard` over an
//! in-memory pipe, with one writer and with several concurrent writers.
//!
//! Run with: cargo bench --bench guard_send
//! Results saved to: target/criterion/

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::StreamExt;
use tokio::io::{DuplexStream, duplex};
use tokio::runtime::Runtime;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use wsduplex::ConnectionGuard;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[64, 1024, 16 * 1024];
const WRITER_COUNTS: &[usize] = &[1, 4, 16];
const FRAMES_PER_WRITER: usize = 64;

// ============================================================================
// Setup
// ============================================================================

/// Connected guard whose peer drains and discards every frame.
async fn draining_guard() -> Arc<ConnectionGuard<DuplexStream>> {
    let (a, b) = duplex(1024 * 1024);
    let local = WebSocketStream::from_raw_socket(a, Role::Client, None).await;
    let mut peer = WebSocketStream::from_raw_socket(b, Role::Server, None).await;

    tokio::spawn(async move { while let Some(Ok(_)) = peer.next().await {} });
    Arc::new(ConnectionGuard::from_stream(local))
}

// ============================================================================
// Benchmark: Single Writer
// ============================================================================

fn bench_single_writer(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let guard = rt.block_on(draining_guard());

    let mut group = c.benchmark_group("single_writer");
    for &size in PAYLOAD_SIZES {
        let payload = bytes::Bytes::from(vec![0xAB; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("send", size), &payload, |b, payload| {
            b.to_async(&rt).iter(|| {
                let guard = Arc::clone(&guard);
                let payload = payload.clone();
                async move { guard.send(payload).await.expect("send") }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Concurrent Writers
// ============================================================================

fn bench_concurrent_writers(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let guard = rt.block_on(draining_guard());
    let payload = bytes::Bytes::from(vec![0xCD; 1024]);

    let mut group = c.benchmark_group("concurrent_writers");
    group.sample_size(20);
    for &writers in WRITER_COUNTS {
        group.throughput(Throughput::Elements((writers * FRAMES_PER_WRITER) as u64));
        group.bench_with_input(BenchmarkId::new("send", writers), &writers, |b, &writers| {
            b.to_async(&rt).iter(|| {
                let guard = Arc::clone(&guard);
                let payload = payload.clone();
                async move { send_from_tasks(guard, payload, writers).await }
            });
        });
    }
    group.finish();
}

async fn send_from_tasks(
    guard: Arc<ConnectionGuard<DuplexStream>>,
    payload: bytes::Bytes,
    writers: usize,
) {
    let tasks: Vec<_> = (0..writers)
        .map(|_| {
            let guard = Arc::clone(&guard);
            let payload = payload.clone();
            tokio::spawn(async move {
                for _ in 0..FRAMES_PER_WRITER {
                    guard.send(payload.clone()).await.expect("send");
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.expect("join");
    }
}

criterion_group!(benches, bench_single_writer, bench_concurrent_writers);
criterion_main!(benches);
