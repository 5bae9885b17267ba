#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::info;

use crate::domain::{Config, Deadline, RunPlan};
use crate::lib_cpu::cpu_load;
use crate::lib_mem::{allocate_chunk, memory_load, Ballast, ChunkAllocator, GrowthOutcome};

pub const COMPLETION_NOTICE: &str = "Stress test complete!";

#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub cpu_workers: usize,
    /// `None` when the deadline came before the memory stressor reported back.
    pub chunks_held: Option<usize>,
    pub outcome: Option<GrowthOutcome>,
    pub elapsed: Duration,
}

/// Runs one bounded workload: notices on `out`, stressors in parallel, exit at the deadline.
#[derive(Clone)]
pub struct StressRunner {
    config: Config,
    allocate: ChunkAllocator,
}

impl StressRunner {
    pub fn new(config: Config) -> Self {
        Self::with_allocator(config, allocate_chunk)
    }

    pub fn with_allocator(config: Config, allocate: ChunkAllocator) -> Self {
        Self { config, allocate }
    }

    pub fn startup_notice(&self) -> String {
        format!("Starting stress: {}", self.config)
    }

    pub async fn run<W: Write>(&self, out: &mut W) -> AnyResult<RunSummary> {
        writeln!(out, "{}", self.startup_notice()).context("write startup notice")?;
        out.flush().context("flush startup notice")?;

        let started = Instant::now();
        let plan = RunPlan::new(self.config, chrono::Utc::now().timestamp());
        info!(
            cpu_cores = self.config.cpu_cores(),
            memory_mb = self.config.memory_mb(),
            duration_seconds = self.config.duration().as_secs(),
            started_ts_seconds = plan.started_ts_seconds,
            ends_ts_seconds = plan.ends_ts_seconds,
            "stress run started"
        );

        let cpu = cpu_load(self.config.cpu_cores(), plan.deadline)?;
        let mut mem = tokio::spawn(memory_load(
            self.config.memory_mb(),
            plan.deadline,
            self.allocate,
        ));

        // The ballast must outlive the wait below.
        let ballast = tokio::select! {
            biased;
            joined = &mut mem => Some(joined.context("memory stressor task")??),
            () = wait_for(plan.deadline) => None,
        };
        if ballast.is_some() {
            wait_for(plan.deadline).await;
        }

        let summary = RunSummary {
            cpu_workers: cpu.len(),
            chunks_held: ballast.as_ref().map(Ballast::len),
            outcome: ballast.as_ref().map(Ballast::outcome),
            elapsed: started.elapsed(),
        };
        writeln!(out, "{COMPLETION_NOTICE}").context("write completion notice")?;
        out.flush().context("flush completion notice")?;
        Ok(summary)
    }
}

/// Sleep until `deadline` has passed on the monotonic clock.
pub async fn wait_for(deadline: Deadline) {
    while !deadline.is_past() {
        sleep(deadline.remaining()).await;
    }
}
