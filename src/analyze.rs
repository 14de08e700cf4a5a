use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    load::{Metadata, DATE_COLUMN},
    table::{iso_date, ColumnError, Table},
};

/// Descriptive statistics of one column, missing values skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (N - 1 denominator).
    pub std: f64,
}

impl Summary {
    /// All fields but `count` are NaN without values; `std` is NaN below two.
    pub fn of(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
                std: f64::NAN,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count < 2 {
            f64::NAN
        } else {
            let squares: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        };

        Self {
            count,
            min,
            max,
            mean,
            std,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub code: String,
    pub label: String,
    pub summary: Summary,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error("Could not write {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Statistics for every metadata parameter that is a column of `table`, in
/// metadata order.
pub fn describe(table: &Table, meta: &Metadata) -> Result<Vec<ParameterSummary>, ColumnError> {
    meta.parameters
        .iter()
        .filter_map(|parameter| table.column(&parameter.code).map(|column| (parameter, column)))
        .map(|(parameter, column)| -> Result<_, ColumnError> {
            let values: Vec<f64> = column.numbers()?.into_iter().flatten().collect();
            let summary = Summary::of(&values);
            debug!(code = %parameter.code, count = summary.count, "described parameter");
            Ok(ParameterSummary {
                code: parameter.code.clone(),
                label: parameter.label.clone(),
                summary,
            })
        })
        .collect()
}

/// Write the whole table to `path`, creating its directory when needed.
pub fn export_csv(table: &Table, path: &Path) -> Result<(), AnalyzeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let export = |source: csv::Error| AnalyzeError::Export {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| export(e.into()))?;
    table.write_csv(BufWriter::new(file)).map_err(export)?;
    info!(path = %path.display(), rows = table.len(), "exported table");
    Ok(())
}

/// Print the dataset overview and statistics to `out`, then export the table
/// to `csv_path`.
pub fn analyze(
    table: &Table,
    meta: &Metadata,
    csv_path: &Path,
    out: &mut impl Write,
) -> Result<PathBuf, AnalyzeError> {
    writeln!(out, "Data from: {}, {}, {}", meta.station, meta.city, meta.province)?;
    if let Some((first, last)) = table.date_range(DATE_COLUMN)? {
        writeln!(out, "Period: {} to {}", iso_date(first), iso_date(last))?;
    }
    writeln!(out, "Records: {} days\n", table.len())?;

    writeln!(out, "Basic statistics:")?;
    for ParameterSummary { label, summary, .. } in describe(table, meta)? {
        writeln!(out, "{label}:")?;
        writeln!(out, "  Min: {}", summary.min)?;
        writeln!(out, "  Max: {}", summary.max)?;
        writeln!(out, "  Mean: {:.2}", summary.mean)?;
        writeln!(out, "  Std: {:.2}\n", summary.std)?;
    }

    export_csv(table, csv_path)?;
    writeln!(out, "Data saved to: {}", csv_path.display())?;

    Ok(csv_path.to_path_buf())
}
