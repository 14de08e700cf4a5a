use std::{fmt, io};

use serde_json::{Map, Value};
use thiserror::Error;
use time::Date;

/// One value of one column in one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(Date),
}

impl Cell {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                // u64 beyond i64 and every non-integer end up here
                None => n.as_f64().map_or(Self::Missing, Self::Float),
            },
            Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }

    /// Guess the type of a raw CSV field.
    pub fn infer(field: &str) -> Self {
        if field.is_empty() {
            return Self::Missing;
        }
        match field {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => (),
        }
        if let Ok(i) = field.parse::<i64>() {
            return Self::Int(i);
        }
        match field.parse::<f64>() {
            Ok(f) if f.is_finite() => Self::Float(f),
            _ => Self::Text(field.to_string()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing value",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the `.0` on integral floats and round-trips exactly
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => f.write_str(&iso_date(*d)),
        }
    }
}

/// `YYYY-MM-DD`, the only date format read or written.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("Missing column `{0}`")]
    Missing(String),
    #[error("Column `{column}` holds a {kind} at row {row}, expected a number")]
    NonNumeric {
        column: String,
        row: usize,
        kind: &'static str,
    },
    #[error("Column `{column}` holds a {kind} at row {row}, expected a date")]
    NotDate {
        column: String,
        row: usize,
        kind: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Numeric view of the column, `None` where the cell is missing.
    pub fn numbers(&self) -> Result<Vec<Option<f64>>, ColumnError> {
        self.cells
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Cell::Missing => Ok(None),
                Cell::Int(i) => Ok(Some(*i as f64)),
                Cell::Float(x) => Ok(Some(*x)),
                other => Err(ColumnError::NonNumeric {
                    column: self.name.clone(),
                    row,
                    kind: other.kind(),
                }),
            })
            .collect()
    }
}

/// Column-oriented table. Every column holds exactly `rows` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table from JSON objects. Columns appear in the order their key
    /// is first seen; records lacking a key get a missing cell.
    pub fn from_records(records: impl IntoIterator<Item = Map<String, Value>>) -> Self {
        let mut table = Self::default();
        for record in records {
            for (key, value) in record {
                let index = match table.position(&key) {
                    Some(index) => index,
                    None => {
                        table.columns.push(Column {
                            name: key,
                            cells: vec![Cell::Missing; table.rows],
                        });
                        table.columns.len() - 1
                    }
                };
                table.columns[index].cells.push(Cell::from_json(value));
            }
            table.rows += 1;
            for column in &mut table.columns {
                column.cells.resize(table.rows, Cell::Missing);
            }
        }
        table
    }

    /// Read a CSV document with a header row, inferring the type of each field.
    pub fn read_csv(reader: impl io::Read) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut columns: Vec<Column> = reader
            .headers()?
            .iter()
            .map(|name| Column {
                name: name.to_string(),
                cells: Vec::new(),
            })
            .collect();

        let mut rows = 0;
        for record in reader.records() {
            let record = record?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.cells.push(Cell::infer(field));
            }
            rows += 1;
        }

        Ok(Self { columns, rows })
    }

    pub fn write_csv(&self, writer: impl io::Write) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns.iter().map(Column::name))?;
        for row in 0..self.rows {
            writer.write_record(self.columns.iter().map(|column| column.cells[row].to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&Column, ColumnError> {
        self.column(name)
            .ok_or_else(|| ColumnError::Missing(name.to_string()))
    }

    pub fn numbers(&self, name: &str) -> Result<Vec<Option<f64>>, ColumnError> {
        self.require(name)?.numbers()
    }

    /// All values of a parsed date column.
    pub fn dates(&self, name: &str) -> Result<Vec<Date>, ColumnError> {
        let column = self.require(name)?;
        column
            .cells
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Cell::Date(date) => Ok(*date),
                other => Err(ColumnError::NotDate {
                    column: column.name.clone(),
                    row,
                    kind: other.kind(),
                }),
            })
            .collect()
    }

    /// Earliest and latest date of the column, `None` on an empty table.
    pub fn date_range(&self, name: &str) -> Result<Option<(Date, Date)>, ColumnError> {
        let dates = self.dates(name)?;
        Ok(dates.iter().min().copied().zip(dates.iter().max().copied()))
    }

    /// Replace the column called `name` in place, or append it.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.rows);
        match self.position(name) {
            Some(index) => self.columns[index].cells = cells,
            None => self.columns.push(Column {
                name: name.to_string(),
                cells,
            }),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use super::*;

    fn records(value: Value) -> Vec<Map<String, Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn columns_follow_first_appearance_and_pad_missing_keys() {
        let table = Table::from_records(records(json!([
            { "date": "2023-01-01", "Tavg": 22.5 },
            { "date": "2023-01-02", "RR": 3, "Tavg": null },
            { "date": "2023-01-03" },
        ])));

        assert_eq!(table.len(), 3);
        assert_eq!(table.column_names().collect::<Vec<_>>(), ["date", "Tavg", "RR"]);
        assert_eq!(
            table.column("Tavg").unwrap().cells(),
            [Cell::Float(22.5), Cell::Missing, Cell::Missing]
        );
        assert_eq!(
            table.column("RR").unwrap().cells(),
            [Cell::Missing, Cell::Int(3), Cell::Missing]
        );
    }

    #[test]
    fn nested_values_are_kept_as_json_text() {
        let table = Table::from_records(records(json!([{ "flags": [1, 2], "ok": true }])));
        assert_eq!(table.column("flags").unwrap().cells(), [Cell::Text("[1,2]".into())]);
        assert_eq!(table.column("ok").unwrap().cells(), [Cell::Bool(true)]);
    }

    #[test]
    fn infer_csv_fields() {
        assert_eq!(Cell::infer(""), Cell::Missing);
        assert_eq!(Cell::infer("12"), Cell::Int(12));
        assert_eq!(Cell::infer("12.0"), Cell::Float(12.0));
        assert_eq!(Cell::infer("-0.5"), Cell::Float(-0.5));
        assert_eq!(Cell::infer("false"), Cell::Bool(false));
        assert_eq!(Cell::infer("inf"), Cell::Text("inf".into()));
        assert_eq!(Cell::infer("Bandung"), Cell::Text("Bandung".into()));
    }

    #[test]
    fn display_matches_csv_representation() {
        assert_eq!(Cell::Missing.to_string(), "");
        assert_eq!(Cell::Float(22.0).to_string(), "22.0");
        assert_eq!(Cell::Float(0.1).to_string(), "0.1");
        assert_eq!(Cell::Int(7).to_string(), "7");
        assert_eq!(Cell::Date(date!(2023 - 02 - 03)).to_string(), "2023-02-03");
    }

    #[test]
    fn numbers_reject_text() {
        let table = Table::from_records(records(json!([
            { "RR": 1.5 },
            { "RR": null },
            { "RR": "trace" },
        ])));

        match table.numbers("RR") {
            Err(ColumnError::NonNumeric { column, row, kind }) => {
                assert_eq!(column, "RR");
                assert_eq!(row, 2);
                assert_eq!(kind, "text");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            table.numbers("Tx"),
            Err(ColumnError::Missing(name)) if name == "Tx"
        ));
    }

    #[test]
    fn set_column_replaces_in_place() {
        let mut table = Table::from_records(records(json!([{ "a": 1, "b": 2 }])));
        table.set_column("a", vec![Cell::Int(10)]);
        table.set_column("c", vec![Cell::Int(3)]);

        assert_eq!(table.column_names().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(table.column("a").unwrap().cells(), [Cell::Int(10)]);
    }

    #[test]
    fn csv_text_keeps_quoting() {
        let table = Table::from_records(records(json!([
            { "station": "Bandung, Jawa Barat", "RR": 0.0 },
        ])));
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer.clone()).unwrap(),
            "station,RR\n\"Bandung, Jawa Barat\",0.0\n"
        );
        assert_eq!(Table::read_csv(buffer.as_slice()).unwrap(), table);
    }
}
