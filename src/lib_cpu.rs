#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{anyhow, Context, Result as AnyResult};
use std::hint::black_box;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

use crate::domain::Deadline;
use crate::validation::logical_cpus;

/// Arithmetic steps between two deadline checks. Keeps overrun well under a millisecond.
pub const SPIN_BATCH: u32 = 10_000;

/// Handles to the launched busy workers. Dropping this detaches them.
pub struct CpuWorkers {
    handles: Vec<JoinHandle<u64>>,
}

impl CpuWorkers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker and return how many batches each one spun.
    pub fn join(self) -> AnyResult<Vec<u64>> {
        self.handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("cpu worker panicked")))
            .collect()
    }
}

/// Launch `cores` busy workers on dedicated OS threads. Returns as soon as all are running.
pub fn cpu_load(cores: usize, deadline: Deadline) -> AnyResult<CpuWorkers> {
    let available = logical_cpus();
    if cores > available {
        warn!(cores, available, "more cpu workers than logical cpus");
    }
    let mut handles = Vec::with_capacity(cores);
    for idx in 0..cores {
        let handle = thread::Builder::new()
            .name(format!("cpu-burn-{idx}"))
            .spawn(move || burn(deadline))
            .with_context(|| format!("spawn cpu worker {idx}"))?;
        handles.push(handle);
    }
    info!(workers = handles.len(), "cpu workers launched");
    Ok(CpuWorkers { handles })
}

fn burn(deadline: Deadline) -> u64 {
    let mut acc = 0u64;
    let mut batches = 0u64;
    while !deadline.is_past() {
        for step in 0..SPIN_BATCH {
            acc = black_box(acc.wrapping_mul(31).wrapping_add(u64::from(step)));
        }
        batches += 1;
    }
    black_box(acc);
    batches
}
