//! Simulate command implementation
//!
//! Runs a compound Poisson-lognormal simulation through loss_engine and
//! reports the sample summary, the closed-form moments and tail measures.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::Args;
use loss_engine::stats::{expected_shortfall, value_at_risk, CompoundMoments, SampleSummary};
use loss_engine::{
    simulate_serial, simulate_serial_seeded, ParallelExecutor, SimulationParameters, StreamKey,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{CliConfig, OutputFormat};
use crate::{CliError, Result};

/// Arguments of `losssim simulate`
///
/// Unset values fall back to the `[simulation]` table of the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SimulateArgs {
    /// Poisson frequency rate λ (≥ 0)
    #[arg(short, long)]
    pub lambda: Option<f64>,

    /// Log-severity location μ
    #[arg(short, long, allow_hyphen_values = true)]
    pub mu: Option<f64>,

    /// Log-severity scale σ (> 0)
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Number of trials N
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// Base seed; drawn from entropy and logged when omitted
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Worker threads for the parallel path
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Use the single-threaded reference path
    #[arg(long)]
    pub serial: bool,

    /// Secondary stream key (partition-index, range-end)
    #[arg(long)]
    pub stream_key: Option<String>,

    /// Output format (json, csv, table)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tail levels for VaR / expected shortfall, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub quantiles: Vec<f64>,
}

/// How the samples are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Single stream on the calling thread
    Serial,
    /// Partitioned fill on a worker pool
    Parallel {
        /// Number of workers
        workers: usize,
        /// Secondary key policy
        stream_key: StreamKey,
    },
}

/// Fully resolved simulation request
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub lambda: f64,
    pub mu: f64,
    pub sigma: f64,
    pub samples: usize,
    /// `None` means an entropy-seeded serial run
    pub seed: Option<u64>,
    pub mode: ExecutionMode,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub quantiles: Vec<f64>,
}

/// Parse a stream key policy name
pub fn parse_stream_key(s: &str) -> Result<StreamKey> {
    match s.to_lowercase().as_str() {
        "partition-index" | "index" => Ok(StreamKey::PartitionIndex),
        "range-end" | "end" => Ok(StreamKey::RangeEnd),
        other => Err(CliError::InvalidArgument(format!(
            "Unknown stream key: {}. Supported: partition-index, range-end",
            other
        ))),
    }
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "--{} is required (or set it under [simulation] in the config file)",
            flag
        ))
    })
}

/// Merge command line arguments over the loaded configuration
pub fn resolve(args: &SimulateArgs, config: &CliConfig) -> Result<RunPlan> {
    let defaults = &config.simulation;

    let lambda = required(args.lambda.or(defaults.lambda), "lambda")?;
    let mu = required(args.mu.or(defaults.mu), "mu")?;
    let sigma = required(args.sigma.or(defaults.sigma), "sigma")?;
    let samples = required(args.samples.or(defaults.samples), "samples")?;
    let explicit_seed = args.seed.or(defaults.seed);

    let format = match &args.format {
        Some(f) => OutputFormat::from_str(f)?,
        None => config.format,
    };

    let quantiles = if args.quantiles.is_empty() {
        config.quantiles.clone()
    } else {
        args.quantiles.clone()
    };
    if let Some(level) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
        return Err(CliError::InvalidArgument(format!(
            "quantile level {} is outside [0, 1]",
            level
        )));
    }

    let (mode, seed) = if args.serial {
        if args.workers.is_some() {
            return Err(CliError::InvalidArgument(
                "--workers cannot be combined with --serial".to_string(),
            ));
        }
        (ExecutionMode::Serial, explicit_seed)
    } else {
        let workers = args
            .workers
            .or(config.workers)
            .unwrap_or_else(loss_engine::default_worker_count);
        if workers == 0 {
            return Err(CliError::InvalidArgument(
                "--workers must be at least 1".to_string(),
            ));
        }
        let stream_key = match &args.stream_key {
            Some(key) => parse_stream_key(key)?,
            None => config.stream_key,
        };
        let seed = explicit_seed.unwrap_or_else(|| {
            let seed: u64 = rand::random();
            info!(seed, "No seed given, drew one from entropy; pass --seed {} to reproduce", seed);
            seed
        });
        (ExecutionMode::Parallel { workers, stream_key }, Some(seed))
    };

    Ok(RunPlan {
        lambda,
        mu,
        sigma,
        samples,
        seed,
        mode,
        format,
        output: args.output.clone(),
        quantiles,
    })
}

/// Parameters echoed in the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportParameters {
    pub lambda: f64,
    pub mu: f64,
    pub sigma: f64,
    pub samples: usize,
    pub seed: Option<u64>,
    pub mode: &'static str,
    pub workers: Option<usize>,
    pub stream_key: Option<StreamKey>,
}

/// VaR and expected shortfall at one level
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TailMetric {
    pub level: f64,
    pub value_at_risk: f64,
    pub expected_shortfall: f64,
}

/// Result of one simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub parameters: ReportParameters,
    /// `None` when no samples were drawn
    pub summary: Option<SampleSummary>,
    pub theory: CompoundMoments,
    pub tail: Vec<TailMetric>,
    pub elapsed_ms: f64,
}

impl SimulationReport {
    /// Summarise `losses` drawn under `plan`
    pub fn build(plan: &RunPlan, losses: &[f64], elapsed_ms: f64) -> Result<Self> {
        let (mode, workers, stream_key) = match plan.mode {
            ExecutionMode::Serial => ("serial", None, None),
            ExecutionMode::Parallel {
                workers,
                stream_key,
            } => ("parallel", Some(workers), Some(stream_key)),
        };

        let tail = if losses.is_empty() {
            Vec::new()
        } else {
            plan.quantiles
                .iter()
                .map(|&level| {
                    Ok(TailMetric {
                        level,
                        value_at_risk: value_at_risk(losses, level)?,
                        expected_shortfall: expected_shortfall(losses, level)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            parameters: ReportParameters {
                lambda: plan.lambda,
                mu: plan.mu,
                sigma: plan.sigma,
                samples: plan.samples,
                seed: plan.seed,
                mode,
                workers,
                stream_key,
            },
            summary: SampleSummary::from_samples(losses),
            theory: CompoundMoments::new(plan.lambda, plan.mu, plan.sigma),
            tail,
            elapsed_ms,
        })
    }
}

/// Draw the losses described by `plan`
pub fn execute(plan: &RunPlan) -> Result<Vec<f64>> {
    let losses = match (plan.mode, plan.seed) {
        (ExecutionMode::Serial, None) => {
            simulate_serial(plan.lambda, plan.mu, plan.sigma, plan.samples)?
        }
        (ExecutionMode::Serial, Some(seed)) => {
            let params =
                SimulationParameters::new(plan.lambda, plan.mu, plan.sigma, plan.samples, seed)?;
            simulate_serial_seeded(&params)?
        }
        (
            ExecutionMode::Parallel {
                workers,
                stream_key,
            },
            seed,
        ) => {
            let params = SimulationParameters::new(
                plan.lambda,
                plan.mu,
                plan.sigma,
                plan.samples,
                seed.unwrap_or_default(),
            )?;
            ParallelExecutor::with_stream_key(stream_key, workers)?.run(&params)?
        }
    };
    Ok(losses)
}

/// Run the simulate command
pub fn run(args: &SimulateArgs, config: &CliConfig) -> Result<()> {
    let plan = resolve(args, config)?;

    info!("Starting simulation...");
    info!("  λ = {}, μ = {}, σ = {}", plan.lambda, plan.mu, plan.sigma);
    info!("  Samples: {}", plan.samples);
    info!("  Mode: {:?}", plan.mode);
    info!("  Output format: {}", plan.format);

    let started = Instant::now();
    let losses = execute(&plan)?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;
    debug!(elapsed_ms, "Simulation finished");

    let report = SimulationReport::build(&plan, &losses, elapsed_ms)?;

    match &plan.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_output(&mut writer, plan.format, &report, &losses)?;
            writer.flush()?;
            info!("Results written to {}", path.display());
        }
        None => {
            let mut writer = io::stdout().lock();
            write_output(&mut writer, plan.format, &report, &losses)?;
        }
    }

    info!("Simulation complete");
    Ok(())
}

/// Write results in the requested format
pub fn write_output<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    report: &SimulationReport,
    losses: &[f64],
) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(writer, report),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, report)?;
            writeln!(writer)?;
            Ok(())
        }
        OutputFormat::Csv => write_csv(writer, losses),
    }
}

#[derive(Serialize)]
struct LossRecord {
    trial: usize,
    loss: f64,
}

fn write_csv<W: Write>(writer: &mut W, losses: &[f64]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if losses.is_empty() {
        csv.write_record(["trial", "loss"])?;
    }
    for (trial, &loss) in losses.iter().enumerate() {
        csv.serialize(LossRecord { trial, loss })?;
    }
    csv.flush()?;
    Ok(())
}

fn row<W: Write>(w: &mut W, label: &str, value: String) -> io::Result<()> {
    writeln!(w, "│ {:<22} │ {:>18} │", label, value)
}

fn write_table<W: Write>(w: &mut W, report: &SimulationReport) -> Result<()> {
    let p = &report.parameters;

    writeln!(w, "\n┌────────────────────────┬────────────────────┐")?;
    writeln!(w, "│ Parameter              │ Value              │")?;
    writeln!(w, "├────────────────────────┼────────────────────┤")?;
    row(w, "λ (frequency)", format!("{}", p.lambda))?;
    row(w, "μ (log-location)", format!("{}", p.mu))?;
    row(w, "σ (log-scale)", format!("{}", p.sigma))?;
    row(w, "Samples", p.samples.to_string())?;
    row(
        w,
        "Seed",
        p.seed.map_or_else(|| "entropy".to_string(), |s| s.to_string()),
    )?;
    row(
        w,
        "Mode",
        match p.workers {
            Some(workers) => format!("{} × {}", p.mode, workers),
            None => p.mode.to_string(),
        },
    )?;
    writeln!(w, "├────────────────────────┼────────────────────┤")?;

    match &report.summary {
        Some(s) => {
            row(w, "Mean", format!("{:.6}", s.mean))?;
            row(w, "  95% CI half-width", format!("{:.6}", s.confidence_95()))?;
            row(w, "Theoretical mean", format!("{:.6}", report.theory.mean))?;
            row(w, "Std dev", format!("{:.6}", s.std_dev))?;
            row(w, "Theoretical std dev", format!("{:.6}", report.theory.std_dev()))?;
            row(w, "Min", format!("{:.6}", s.min))?;
            row(w, "Max", format!("{:.6}", s.max))?;
            row(w, "Zero-loss share", format!("{:.4}", s.zero_fraction))?;
        }
        None => row(w, "(no samples)", String::new())?,
    }

    if !report.tail.is_empty() {
        writeln!(w, "├────────────────────────┼────────────────────┤")?;
        for t in &report.tail {
            row(w, &format!("VaR {:.1}%", t.level * 100.0), format!("{:.6}", t.value_at_risk))?;
            row(w, &format!("ES  {:.1}%", t.level * 100.0), format!("{:.6}", t.expected_shortfall))?;
        }
    }

    writeln!(w, "├────────────────────────┼────────────────────┤")?;
    row(w, "Elapsed (ms)", format!("{:.3}", report.elapsed_ms))?;
    writeln!(w, "└────────────────────────┴────────────────────┘")?;
    Ok(())
}
