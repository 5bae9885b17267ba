#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

pub mod domain;
pub mod lib_cpu;
pub mod lib_mem;
pub mod service;
pub mod validation;

pub use domain::{Config, Deadline, RunPlan};
pub use lib_cpu::{cpu_load, CpuWorkers};
pub use lib_mem::{memory_load, Ballast, ChunkAllocator, GrowthOutcome};
pub use service::{RunSummary, StressRunner};
