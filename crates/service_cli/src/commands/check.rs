//! Check command implementation
//!
//! Reports detected hardware parallelism and the effective configuration.

use std::io::{self, Write};

use tracing::info;

use crate::config::{CliConfig, ENV_FORMAT, ENV_LOG_LEVEL, ENV_WORKERS};
use crate::Result;

/// Run the check command
pub fn run(config: &CliConfig) -> Result<()> {
    info!("Checking system configuration...");
    let mut out = io::stdout().lock();
    write_report(&mut out, config, loss_engine::default_worker_count())?;
    info!("Check complete");
    Ok(())
}

fn or_unset<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "(unset)".to_string(), |v| v.to_string())
}

/// Write the check report for `config`
pub fn write_report<W: Write>(w: &mut W, config: &CliConfig, hardware_threads: usize) -> Result<()> {
    writeln!(w, "losssim {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(w)?;
    writeln!(w, "Hardware")?;
    writeln!(w, "  threads:        {}", hardware_threads)?;
    writeln!(w)?;
    writeln!(w, "Configuration")?;
    writeln!(w, "  log_level:      {}", config.log_level)?;
    writeln!(
        w,
        "  workers:        {}",
        config
            .workers
            .map_or_else(|| format!("{} (hardware)", hardware_threads), |n| n.to_string())
    )?;
    writeln!(w, "  stream_key:     {:?}", config.stream_key)?;
    writeln!(w, "  format:         {}", config.format)?;
    writeln!(w, "  quantiles:      {:?}", config.quantiles)?;
    writeln!(w)?;
    writeln!(w, "Simulation defaults")?;
    let sim = &config.simulation;
    writeln!(w, "  lambda:         {}", or_unset(sim.lambda))?;
    writeln!(w, "  mu:             {}", or_unset(sim.mu))?;
    writeln!(w, "  sigma:          {}", or_unset(sim.sigma))?;
    writeln!(w, "  samples:        {}", or_unset(sim.samples))?;
    writeln!(w, "  seed:           {}", or_unset(sim.seed))?;
    writeln!(w)?;
    writeln!(w, "Environment overrides: {}, {}, {}", ENV_LOG_LEVEL, ENV_WORKERS, ENV_FORMAT)?;
    Ok(())
}
