//! Explorable simulations CLI
//!
//! Runs catalog simulations headless and exports the recorded frames.

use anyhow::{bail, Context, Result};
use clap::Parser;
use explorable_simlib::SchedulerConfig;
use explorable_sims::{ControlOverride, HeadlessRunner, RunConfig, RunOutcome, SimulationId};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Headless runner for explorable simulations
#[derive(Parser, Debug)]
#[command(name = "explorable-sims")]
#[command(
    about = "Run explorable simulations headless and export what they draw",
    long_about = None
)]
struct Args {
    /// Simulation to run (ising, fireflies, fish, all)
    #[arg(short = 'S', long, default_value = "all")]
    sim: String,

    /// Seed for the simulation RNG (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of vsyncs to drive
    #[arg(short, long, default_value = "300")]
    frames: u64,

    /// Container width in CSS pixels
    #[arg(long, default_value = "640")]
    width: f64,

    /// Container height in CSS pixels
    #[arg(long, default_value = "360")]
    height: f64,

    /// Device pixel ratio
    #[arg(long, default_value = "1.0")]
    dpr: f64,

    /// Update rate cap in Hz (0 = every frame)
    #[arg(long, default_value = "120")]
    update_hz: f64,

    /// Render rate cap in Hz (0 = every frame)
    #[arg(long, default_value = "60")]
    render_hz: f64,

    /// Host refresh rate in Hz
    #[arg(long, default_value = "60")]
    refresh_hz: f64,

    /// Control override applied before the first frame (id=value, repeatable)
    #[arg(long = "set", value_name = "ID=VALUE")]
    overrides: Vec<ControlOverride>,

    /// Frame at which the container scrolls out of view
    #[arg(long)]
    hide_at: Option<u64>,

    /// Frame at which the container scrolls back into view
    #[arg(long)]
    show_at: Option<u64>,

    /// Export recorded frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Write the last rendered frame to an SVG file
    #[arg(long)]
    svg: Option<String>,

    /// Drive from the wall clock instead of a virtual one
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

impl Args {
    fn run_config(&self, simulation: SimulationId, seed: u64) -> RunConfig {
        RunConfig {
            simulation,
            seed,
            frames: self.frames,
            css_width: self.width,
            css_height: self.height,
            device_pixel_ratio: self.dpr,
            refresh_hz: self.refresh_hz,
            scheduler: SchedulerConfig {
                max_update_hz: self.update_hz,
                max_render_hz: self.render_hz,
            },
            overrides: self.overrides.clone(),
            hide_at: self.hide_at,
            show_at: self.show_at,
            realtime: self.realtime,
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn summary_line(outcome: &RunOutcome) -> serde_json::Value {
    let export = &outcome.export;
    serde_json::json!({
        "simulation": export.simulation,
        "seed": export.seed,
        "passed": export.passed,
        "vsyncs": outcome.stats.vsyncs,
        "updates": outcome.stats.updates,
        "renders": outcome.stats.renders,
        "recorded_frames": export.frames.len(),
        "sim_time": outcome.view.sim_time,
        "failure": export.failure.as_ref().map(|f| f.message.clone()),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    if !args.json {
        info!("Explorable simulations v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let simulations: Vec<SimulationId> = if args.sim == "all" {
        SimulationId::all()
    } else {
        vec![args.sim.parse().map_err(anyhow::Error::msg)?]
    };

    if simulations.len() > 1 && (args.export.is_some() || args.svg.is_some()) {
        bail!("--export and --svg need a single --sim, not 'all'");
    }
    if simulations.len() > 1 && !args.overrides.is_empty() {
        bail!("--set needs a single --sim, control ids differ between simulations");
    }

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let mut outcomes = Vec::new();
    for simulation in simulations {
        let runner = HeadlessRunner::new(args.run_config(simulation, seed));
        let outcome = runner
            .run()
            .await
            .with_context(|| format!("{simulation} (seed={seed}) could not run"))?;

        if let Some(path) = &args.export {
            outcome
                .write_export(path)
                .with_context(|| format!("Failed to write export to {path}"))?;
            info!("Exported {} frames to {}", outcome.export.frames.len(), path);
        }
        if let Some(path) = &args.svg {
            outcome
                .write_svg(path)
                .with_context(|| format!("Failed to write SVG to {path}"))?;
            info!("Wrote last frame to {}", path);
        }

        if !args.json {
            if outcome.passed() {
                info!(
                    "✓ {} (seed={}) PASSED: {} updates, {} renders, t={:.2}s",
                    simulation,
                    seed,
                    outcome.stats.updates,
                    outcome.stats.renders,
                    outcome.view.sim_time
                );
            } else {
                let reason = outcome
                    .export
                    .failure
                    .as_ref()
                    .map(|f| f.message.as_str())
                    .unwrap_or("unknown");
                error!("✗ {} (seed={}) FAILED: {}", simulation, seed, reason);
            }
        }
        outcomes.push(outcome);
    }

    let total = outcomes.len();
    let failed = outcomes.iter().filter(|o| !o.passed()).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed,
            "failed": failed,
            "results": outcomes.iter().map(summary_line).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if failed == 0 {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("All {} simulation runs passed", total);
    } else {
        error!("{}/{} simulation runs failed", failed, total);
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
