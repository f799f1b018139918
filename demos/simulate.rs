//! # Glycemia regulation simulation
//!
//! Runs the full task set (controller, infusion, syringe watcher, display,
//! alarms) under the supervisor and prints operator alerts on stdout.
//! Lifecycle events go to stderr through `tracing`.
//!
//! ## Run
//! ```bash
//! cargo run --example simulate
//! cargo run --example simulate -- --cycles 100 --time-factor 0.01
//! RUST_LOG=glycovisor=debug cargo run --example simulate -- --realtime
//! ```
//!
//! Ctrl-C stops the controller early; the normal HALT protocol still runs.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use glycovisor::{Config, LogWriter, Subscribe, Supervisor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Simulated closed-loop glycemia regulator")]
struct Cli {
    /// Controller cycles before the system halts.
    #[arg(long, default_value_t = 600)]
    cycles: u32,

    /// Wall time per unit of simulated time.
    #[arg(long, default_value_t = 0.1)]
    time_factor: f64,

    /// Simulated cycle period in milliseconds.
    #[arg(long, default_value_t = 500)]
    cycle_ms: u64,

    /// Patient glucose at startup.
    #[arg(long, default_value_t = 100)]
    glucose: i64,

    /// Start the insulin pump idle instead of injecting.
    #[arg(long)]
    insulin_idle: bool,

    /// Request SCHED_FIFO priorities (needs CAP_SYS_NICE).
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glycovisor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config {
        cycle: Duration::from_millis(cli.cycle_ms),
        time_factor: cli.time_factor,
        total_cycles: cli.cycles,
        initial_glucose: cli.glucose,
        insulin_starts_injecting: !cli.insulin_idle,
        realtime: cli.realtime,
        ..Config::default()
    };
    tracing::info!(
        cycles = cfg.total_cycles,
        cycle = ?cfg.cycle_wall(),
        realtime = cfg.realtime,
        "starting simulation"
    );

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::new(cfg, subs);
    let patient = Arc::clone(&sup.context().patient);

    sup.run().await?;

    tracing::info!(
        glycemia = patient.compute_glycemia(),
        "simulation finished"
    );
    Ok(())
}
