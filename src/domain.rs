#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result as AnyResult};
use std::fmt;
use std::time::{Duration, Instant};

const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Resolved workload parameters. Built once at startup, never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    cpu_cores: usize,
    memory_mb: u64,
    duration: Duration,
}

impl Config {
    pub fn new(cpu_cores: usize, memory_mb: u64, duration: Duration) -> AnyResult<Self> {
        if cpu_cores == 0 {
            bail!("cpu_cores must be > 0");
        }
        if memory_mb == 0 {
            bail!("memory_mb must be > 0");
        }
        if duration.is_zero() {
            bail!("duration must be > 0");
        }
        Ok(Self {
            cpu_cores,
            memory_mb,
            duration,
        })
    }

    /// Resolve from the process environment, defaulting anything missing or malformed.
    pub fn from_env() -> AnyResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AnyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        crate::validation::resolve_config(lookup)
    }

    pub fn cpu_cores(&self) -> usize {
        self.cpu_cores
    }

    pub fn memory_mb(&self) -> u64 {
        self.memory_mb
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU={} cores, Memory={}MB, Duration={}",
            self.cpu_cores,
            self.memory_mb,
            HumanDuration(self.duration)
        )
    }
}

/// Whole-second rendering in the `1h2m3s` style.
pub struct HumanDuration(pub Duration);

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_secs();
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if hours > 0 {
            write!(f, "{hours}h{minutes}m{seconds}s")
        } else if minutes > 0 {
            write!(f, "{minutes}m{seconds}s")
        } else {
            write!(f, "{seconds}s")
        }
    }
}

/// Absolute end of the workload on the monotonic clock. Shared read-only by every worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Saturates at roughly a century out when `duration` overflows the clock.
    pub fn after(duration: Duration) -> Self {
        let now = Instant::now();
        Self(
            now.checked_add(duration)
                .unwrap_or_else(|| now + FAR_FUTURE),
        )
    }

    /// True once the current time is at or past the deadline.
    pub fn is_past(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Zero once the deadline has passed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

/// A config bound to a concrete time window.
#[derive(Clone, Copy, Debug)]
pub struct RunPlan {
    pub config: Config,
    pub deadline: Deadline,
    pub started_ts_seconds: i64,
    pub ends_ts_seconds: i64,
}

impl RunPlan {
    pub fn new(config: Config, now_ts: i64) -> Self {
        let secs = i64::try_from(config.duration().as_secs()).unwrap_or(i64::MAX);
        Self {
            config,
            deadline: Deadline::after(config.duration()),
            started_ts_seconds: now_ts,
            ends_ts_seconds: now_ts.saturating_add(secs),
        }
    }
}
