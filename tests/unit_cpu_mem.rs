#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{bail, Result as AnyResult};
use flex_stressor::domain::Deadline;
use flex_stressor::lib_cpu::cpu_load;
use flex_stressor::lib_mem::{allocate_chunk, memory_load, GrowthOutcome, CHUNK_BYTES};
use flex_stressor::validation::logical_cpus;

static GRANTED: AtomicUsize = AtomicUsize::new(0);

// Hands out two chunks, then reports exhaustion.
fn two_chunks_then_fail() -> AnyResult<Box<[u8]>> {
    if GRANTED.fetch_add(1, Ordering::SeqCst) >= 2 {
        bail!("out of memory");
    }
    allocate_chunk()
}

#[test]
fn cpu_workers_stop_at_deadline() {
    let start = Instant::now();
    let deadline = Deadline::after(Duration::from_millis(300));
    let workers = cpu_load(2, deadline).expect("spawn");
    assert_eq!(workers.len(), 2);
    let batches = workers.join().expect("join");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(1), "overran: {elapsed:?}");
    assert!(batches.iter().all(|b| *b > 0));
}

#[test]
fn cpu_workers_with_past_deadline_exit_immediately() {
    let workers = cpu_load(1, Deadline::at(Instant::now())).expect("spawn");
    assert_eq!(workers.join().expect("join"), vec![0]);
}

#[test]
fn oversubscribed_cpu_workers_all_finish() {
    let cores = logical_cpus() * 4;
    let start = Instant::now();
    let workers = cpu_load(cores, Deadline::after(Duration::from_millis(500))).expect("spawn");
    assert_eq!(workers.len(), cores);
    let batches = workers.join().expect("join");
    let elapsed = start.elapsed();
    assert_eq!(batches.len(), cores);
    assert!(batches.iter().all(|b| *b > 0));
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(1500), "overran: {elapsed:?}");
}

#[test]
fn chunk_is_one_mib_of_zeroes() {
    let chunk = allocate_chunk().expect("alloc");
    assert_eq!(chunk.len(), CHUNK_BYTES);
    assert!(chunk.iter().all(|b| *b == 0));
}

#[tokio::test]
async fn mem_stops_at_target() {
    let deadline = Deadline::after(Duration::from_secs(10));
    let ballast = memory_load(3, deadline, allocate_chunk).await.expect("ok");
    assert_eq!(ballast.outcome(), GrowthOutcome::TargetReached);
    assert_eq!(ballast.len(), 3);
    assert_eq!(ballast.bytes(), 3 * CHUNK_BYTES);
}

#[tokio::test]
async fn mem_stops_at_deadline() {
    let deadline = Deadline::after(Duration::from_millis(350));
    let ballast = memory_load(1000, deadline, allocate_chunk).await.expect("ok");
    assert_eq!(ballast.outcome(), GrowthOutcome::DeadlineReached);
    assert!((1..=5).contains(&ballast.len()), "held {}", ballast.len());
    assert!(deadline.is_past());
}

#[tokio::test]
async fn mem_with_past_deadline_holds_nothing() {
    let ballast = memory_load(10, Deadline::at(Instant::now()), allocate_chunk)
        .await
        .expect("ok");
    assert_eq!(ballast.outcome(), GrowthOutcome::DeadlineReached);
    assert!(ballast.is_empty());
}

#[tokio::test]
async fn mem_allocation_failure_is_an_error() {
    let deadline = Deadline::after(Duration::from_secs(10));
    let err = memory_load(100, deadline, two_chunks_then_fail)
        .await
        .err()
        .expect("allocation failure");
    let msg = format!("{err:#}");
    assert!(msg.contains("memory chunk 3"), "{msg}");
    assert!(msg.contains("out of memory"), "{msg}");
    assert!(!deadline.is_past());
}
