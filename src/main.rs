#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use flex_stressor::{Config, StressRunner};
use tracing::{error, info};

fn init_tracing() {
    // stdout is reserved for the two run notices.
    let fmt = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    fmt.json().init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let runner = StressRunner::new(Config::from_env()?);
    let mut stdout = std::io::stdout();
    match runner.run(&mut stdout).await {
        Ok(summary) => {
            info!(
                cpu_workers = summary.cpu_workers,
                chunks_held = ?summary.chunks_held,
                outcome = ?summary.outcome,
                elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
                "stress run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "stress run failed");
            Err(e)
        }
    }
}
