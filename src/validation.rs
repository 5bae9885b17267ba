#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use std::time::Duration;
use tracing::debug;

use crate::domain::Config;

pub const CPU_CORES_VAR: &str = "CPU_CORES";
pub const MEMORY_MB_VAR: &str = "MEMORY_MB";
pub const DURATION_SEC_VAR: &str = "DURATION_SEC";

pub const DEFAULT_MEMORY_MB: u64 = 100;
pub const DEFAULT_DURATION_SEC: u64 = 300;

/// Parse an option value. Missing, malformed, zero and negative all yield `None`.
pub fn parse_positive(raw: Option<&str>) -> Option<u64> {
    let value: i64 = raw?.parse().ok()?;
    u64::try_from(value).ok().filter(|v| *v > 0)
}

/// Logical CPUs visible to this process, or 1 when the platform cannot tell.
pub fn logical_cpus() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}

pub fn resolve_config<F>(lookup: F) -> AnyResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let cpu_cores = option(&lookup, CPU_CORES_VAR)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or_else(logical_cpus);
    let memory_mb = option(&lookup, MEMORY_MB_VAR).unwrap_or(DEFAULT_MEMORY_MB);
    let duration_sec = option(&lookup, DURATION_SEC_VAR).unwrap_or(DEFAULT_DURATION_SEC);
    Config::new(cpu_cores, memory_mb, Duration::from_secs(duration_sec))
        .context("resolve config")
}

fn option<F>(lookup: &F, name: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name);
    let parsed = parse_positive(raw.as_deref());
    if parsed.is_none() {
        debug!(option = name, raw = ?raw, "using default");
    }
    parsed
}
