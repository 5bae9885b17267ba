#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use std::fmt;
use std::hint::black_box;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::domain::Deadline;

/// One MiB.
pub const CHUNK_BYTES: usize = 1024 * 1024;
pub const PAGE_BYTES: usize = 4096;
/// Pause between two allocations, ~10 MiB/s of growth.
pub const PACING: Duration = Duration::from_millis(100);

const PROGRESS_EVERY: usize = 10;

/// Source of ballast chunks. `allocate_chunk` in production.
pub type ChunkAllocator = fn() -> AnyResult<Box<[u8]>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthOutcome {
    TargetReached,
    DeadlineReached,
}

impl fmt::Display for GrowthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthOutcome::TargetReached => f.write_str("target reached"),
            GrowthOutcome::DeadlineReached => f.write_str("deadline reached"),
        }
    }
}

/// The retained buffer list. Only ever grows; freed when dropped at process exit.
pub struct Ballast {
    chunks: Vec<Box<[u8]>>,
    outcome: GrowthOutcome,
}

impl Ballast {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    pub fn outcome(&self) -> GrowthOutcome {
        self.outcome
    }
}

/// Allocate one zeroed MiB and dirty every page so it is physically backed.
pub fn allocate_chunk() -> AnyResult<Box<[u8]>> {
    let mut chunk = Vec::new();
    chunk
        .try_reserve_exact(CHUNK_BYTES)
        .context("allocate 1 MiB chunk")?;
    chunk.resize(CHUNK_BYTES, 0u8);
    // The fill alone may be folded into a lazily zeroed allocation.
    for page in chunk.chunks_mut(PAGE_BYTES) {
        if let Some(byte) = page.first_mut() {
            *byte = black_box(0);
        }
    }
    Ok(chunk.into_boxed_slice())
}

/// Grow the ballast one chunk per `PACING` until `memory_mb` chunks are held or the
/// deadline passes. Does not wait for the deadline once growth stops.
pub async fn memory_load(
    memory_mb: u64,
    deadline: Deadline,
    allocate: ChunkAllocator,
) -> AnyResult<Ballast> {
    let target = usize::try_from(memory_mb).unwrap_or(usize::MAX);
    let mut chunks: Vec<Box<[u8]>> = Vec::new();
    let outcome = loop {
        if deadline.is_past() {
            break GrowthOutcome::DeadlineReached;
        }
        chunks.try_reserve(1).context("grow chunk list")?;
        let chunk = allocate().with_context(|| format!("memory chunk {}", chunks.len() + 1))?;
        chunks.push(chunk);
        if chunks.len() % PROGRESS_EVERY == 0 {
            debug!(held_mb = chunks.len(), target_mb = memory_mb, "memory growth");
        }
        if chunks.len() >= target {
            break GrowthOutcome::TargetReached;
        }
        sleep(PACING).await;
    };
    info!(held_mb = chunks.len(), %outcome, "memory growth stopped");
    Ok(Ballast { chunks, outcome })
}
