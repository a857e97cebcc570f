use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tdc_twin::domain::{CaptureSnapshot, GateDelays, Measurement, PhaseCalibration, Tdc, TdcConfig, Ticks};
use tdc_twin::{load_config, save_config};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// TDC digital twin
/// Measures start-to-stop intervals on a simulated ring-oscillator converter
#[derive(Parser)]
#[command(name = "tdc", version)]
#[command(about = "Ring-oscillator TDC digital twin", long_about = None)]
struct Cli {
    #[command(flatten)]
    circuit: CircuitArgs,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Circuit selection; flags override the config file
#[derive(Args)]
struct CircuitArgs {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ring length
    #[arg(short = 'n', long, global = true)]
    stages: Option<usize>,

    /// Counter width in bits
    #[arg(long, global = true)]
    counter_bits: Option<u32>,

    /// Use the plain ring instead of the interleaved one
    #[arg(long, global = true)]
    plain: bool,

    /// Unit-delay model with this half-stage delay in ticks
    #[arg(long, global = true)]
    unit_delay: Option<Ticks>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure one interval
    Measure {
        /// Start edge time
        #[arg(long, default_value_t = 0)]
        start: Ticks,
        /// Stop edge time
        #[arg(long)]
        stop: Ticks,
    },
    /// Measure a range of stop times and report decode error
    Sweep {
        /// First stop time
        #[arg(long)]
        from: Ticks,
        /// Last stop time, inclusive
        #[arg(long)]
        to: Ticks,
        /// Stop time increment
        #[arg(long, default_value_t = 1)]
        step: Ticks,
    },
    /// Print latency, period and the phase table
    Calibrate,
    /// Print the effective configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct MeasureReport {
    start: Ticks,
    stop: Ticks,
    snapshot: CaptureSnapshot,
    decoded: Option<Measurement>,
}

#[derive(Serialize)]
struct SweepRow {
    stop: Ticks,
    ring: String,
    counter: u32,
    decoded: Option<Ticks>,
    error: Option<i64>,
}

impl CircuitArgs {
    fn resolve(&self) -> Result<TdcConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
            None => TdcConfig::default(),
        };
        if let Some(stages) = self.stages {
            config.n_delay = stages;
        }
        if let Some(bits) = self.counter_bits {
            config.n_ctr = bits;
        }
        if self.plain {
            config.interleaved = false;
        }
        if let Some(half_stage) = self.unit_delay {
            config.delays = GateDelays::symmetric(half_stage);
        }
        config.validate().context("invalid circuit")?;
        Ok(config)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn measure(config: TdcConfig, start: Ticks, stop: Ticks, json: bool) -> Result<()> {
    if stop < start {
        bail!("stop ({stop}) is earlier than start ({start})");
    }
    let calibration = PhaseCalibration::measure(&config).context("calibrating")?;
    let mut tdc = Tdc::production(config)?;
    let snapshot = tdc.measure(start, stop)?;
    let decoded = calibration.decode(&snapshot);

    if json {
        return print_json(&MeasureReport {
            start,
            stop,
            snapshot,
            decoded,
        });
    }

    println!("ring     {}", snapshot.ring);
    println!("counter  {}", snapshot.counter);
    if snapshot.race.any() {
        println!("race     ring={} counter={}", snapshot.race.ring, snapshot.race.counter);
    }
    match decoded {
        Some(m) => println!(
            "interval {} (laps {}, fine {}, actual {})",
            m.interval,
            m.laps,
            m.fine,
            stop - start
        ),
        None => println!("interval undecodable"),
    }
    Ok(())
}

fn sweep(config: TdcConfig, from: Ticks, to: Ticks, step: Ticks, json: bool) -> Result<()> {
    if step == 0 {
        bail!("step must be positive");
    }
    let calibration = PhaseCalibration::measure(&config).context("calibrating")?;
    let mut tdc = Tdc::production(config)?;

    let mut rows = Vec::new();
    for stop in (from..=to).step_by(usize::try_from(step)?) {
        tdc.reset()?;
        let snapshot = tdc.measure(0, stop)?;
        let decoded = calibration.decode(&snapshot).map(|m| m.interval);
        rows.push(SweepRow {
            stop,
            ring: snapshot.ring.to_string(),
            counter: snapshot.counter,
            decoded,
            error: decoded.map(|d| stop as i64 - d as i64),
        });
    }

    if json {
        return print_json(&rows);
    }

    println!("{:>10}  {:<width$}  {:>8}  {:>10}  {:>6}", "stop", "ring", "counter", "decoded", "error", width = tdc.ring().len());
    for row in &rows {
        let decoded = row.decoded.map_or_else(|| "-".to_string(), |d| d.to_string());
        let error = row.error.map_or_else(|| "-".to_string(), |e| e.to_string());
        println!("{:>10}  {}  {:>8}  {:>10}  {:>6}", row.stop, row.ring, row.counter, decoded, error);
    }
    let worst = rows.iter().filter_map(|r| r.error).map(i64::abs).max();
    info!(rows = rows.len(), worst_error = ?worst, "sweep complete");
    Ok(())
}

fn calibrate(config: TdcConfig, json: bool) -> Result<()> {
    let calibration = PhaseCalibration::measure(&config).context("calibrating")?;
    if json {
        return print_json(&calibration);
    }

    println!("variant  {}", calibration.variant());
    println!("latency  {}", calibration.injection_latency());
    println!("period   {}", calibration.period());
    println!(
        "phases   {} (step {}..{}, mean {:.2})",
        calibration.phase_count(),
        calibration.finest_step(),
        calibration.coarsest_step(),
        calibration.mean_step()
    );
    println!("range    {}", calibration.range());
    for phase in calibration.phases() {
        println!("{:>8}  {}", phase.offset, phase.ring);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let cli = Cli::parse();
    let config = cli.circuit.resolve()?;
    info!(stages = config.n_delay, variant = %config.variant(), "circuit selected");

    match cli.command {
        Commands::Measure { start, stop } => measure(config, start, stop, cli.json),
        Commands::Sweep { from, to, step } => sweep(config, from, to, step, cli.json),
        Commands::Calibrate => calibrate(config, cli.json),
        Commands::Config { output } => match output {
            Some(path) => {
                save_config(&path, &config).with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "config written");
                Ok(())
            }
            None => {
                print!("{}", config.to_toml_string()?);
                Ok(())
            }
        },
    }
}
