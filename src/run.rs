use std::{io::Write, path::PathBuf};

use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::{analyze, config::Config, load, plot, Error};

/// Files written by a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub csv: PathBuf,
    pub temperature_chart: PathBuf,
    pub rainfall_chart: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Artifacts),
    /// The input file does not exist, nothing was written.
    Aborted,
}

/// Today's local date, UTC when the local offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Load, describe, export and chart the dataset named by `config`, writing the
/// run log to `out`.
pub fn run(config: &Config, today: Date, out: &mut impl Write) -> Result<Outcome, Error> {
    if !config.input.exists() {
        warn!(input = %config.input.display(), "input file missing");
        writeln!(out, "File {} not found.", config.input.display())?;
        writeln!(out, "Please create the JSON file in the expected format first.")?;
        return Ok(Outcome::Aborted);
    }

    let (table, meta) = load::load_file(&config.input)?;
    info!(rows = table.len(), input = %config.input.display(), "loaded");

    let csv = analyze::analyze(&table, &meta, &config.export_path(today), out)?;

    let temperature_chart = config.temperature_chart();
    plot::plot_temperature_trends(&table, &meta.city, &temperature_chart, config.chart_size)?;
    writeln!(out, "Temperature chart saved to: {}", temperature_chart.display())?;

    let rainfall_chart = config.rainfall_chart();
    plot::plot_rainfall_patterns(&table, &meta.city, &rainfall_chart, config.chart_size)?;
    writeln!(out, "Rainfall chart saved to: {}", rainfall_chart.display())?;

    Ok(Outcome::Completed(Artifacts {
        csv,
        temperature_chart,
        rainfall_chart,
    }))
}
