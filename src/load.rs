use std::{
    fmt,
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use serde_json::{Map, Value};
use thiserror::Error;
use time::{macros::format_description, Date};
use tracing::debug;

use crate::table::{Cell, Table};

pub const DATE_COLUMN: &str = "date";
pub const YEAR_COLUMN: &str = "year";
pub const MONTH_COLUMN: &str = "month";
pub const DAY_COLUMN: &str = "day";

#[derive(Debug, Deserialize)]
struct RawDocument {
    data: Vec<Map<String, Value>>,
    meta: Metadata,
}

/// Station identity and the parameters worth reporting on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Metadata {
    pub station: String,
    pub city: String,
    pub province: String,
    // Keeps the order of the JSON object
    #[serde(deserialize_with = "parameter_list")]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub code: String,
    pub label: String,
}

fn parameter_list<'de, D>(deserializer: D) -> Result<Vec<Parameter>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ParameterVisitor;

    impl<'de> Visitor<'de> for ParameterVisitor {
        type Value = Vec<Parameter>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of parameter codes to labels")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut parameters = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((code, label)) = map.next_entry::<String, String>()? {
                parameters.push(Parameter { code, label });
            }
            Ok(parameters)
        }
    }

    deserializer.deserialize_map(ParameterVisitor)
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("No record has a `date` field")]
    MissingDateColumn,
    #[error("Row {row}: `{value}` is not a YYYY-MM-DD date")]
    InvalidDate { row: usize, value: String },
}

/// Load the JSON dataset at `path`.
pub fn load_file(path: &Path) -> Result<(Table, Metadata), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(BufReader::new(file))
}

pub fn parse_document(reader: impl Read) -> Result<(Table, Metadata), LoadError> {
    let document: RawDocument = serde_json::from_reader(reader)?;
    let mut table = Table::from_records(document.data);
    derive_dates(&mut table)?;
    debug!(
        rows = table.len(),
        columns = table.column_names().count(),
        station = %document.meta.station,
        "loaded dataset"
    );
    Ok((table, document.meta))
}

/// Reload a table previously written by [`crate::analyze::export_csv`].
pub fn read_csv(path: &Path) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut table = Table::read_csv(BufReader::new(file))?;
    derive_dates(&mut table)?;
    debug!(rows = table.len(), path = %path.display(), "reloaded export");
    Ok(table)
}

pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s, format_description!("[year]-[month]-[day]")).ok()
}

/// Parse the date column and (re)derive the year, month and day columns.
fn derive_dates(table: &mut Table) -> Result<(), LoadError> {
    let column = table
        .column(DATE_COLUMN)
        .ok_or(LoadError::MissingDateColumn)?;

    let dates = column
        .cells()
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Cell::Date(date) => Ok(*date),
            Cell::Text(s) => parse_date(s).ok_or_else(|| LoadError::InvalidDate {
                row,
                value: s.clone(),
            }),
            other => Err(LoadError::InvalidDate {
                row,
                value: other.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let part = |f: fn(&Date) -> i64| -> Vec<Cell> {
        dates.iter().map(|d| Cell::Int(f(d))).collect()
    };
    let years = part(|d| d.year().into());
    let months = part(|d| u8::from(d.month()).into());
    let days = part(|d| d.day().into());

    table.set_column(DATE_COLUMN, dates.iter().copied().map(Cell::Date).collect());
    table.set_column(YEAR_COLUMN, years);
    table.set_column(MONTH_COLUMN, months);
    table.set_column(DAY_COLUMN, days);
    Ok(())
}
