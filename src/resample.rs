use std::collections::BTreeMap;

use time::Date;
use tracing::debug;

use crate::{
    load::DATE_COLUMN,
    table::{ColumnError, Table},
};

/// Aggregate of the rows falling in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket<T> {
    /// Last day of the month.
    pub month_end: Date,
    pub value: T,
}

/// Mean of `column` per month, `None` for months without any value.
pub fn monthly_mean(table: &Table, column: &str) -> Result<Vec<Bucket<Option<f64>>>, ColumnError> {
    monthly(table, column, |values| {
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    })
}

/// Sum of `column` per month, `0` for months without any value.
pub fn monthly_sum(table: &Table, column: &str) -> Result<Vec<Bucket<f64>>, ColumnError> {
    monthly(table, column, |values| values.iter().sum())
}

/// One bucket per month between the earliest and latest date, empty months
/// included.
fn monthly<T>(
    table: &Table,
    column: &str,
    aggregate: impl Fn(&[f64]) -> T,
) -> Result<Vec<Bucket<T>>, ColumnError> {
    let values = table.numbers(column)?;
    let dates = table.dates(DATE_COLUMN)?;

    let mut groups: BTreeMap<Date, Vec<f64>> = BTreeMap::new();
    for (date, value) in dates.iter().zip(values) {
        let slot = groups.entry(month_end(*date)).or_default();
        slot.extend(value);
    }

    let (Some(&first), Some(&last)) = (groups.keys().next(), groups.keys().next_back()) else {
        return Ok(Vec::new());
    };

    let mut buckets = Vec::new();
    let mut end = first;
    loop {
        let values = groups.get(&end).map_or(&[][..], Vec::as_slice);
        buckets.push(Bucket {
            month_end: end,
            value: aggregate(values),
        });
        match end.next_day() {
            Some(next) if end < last => end = month_end(next),
            _ => break,
        }
    }

    debug!(column, buckets = buckets.len(), "resampled by month");
    Ok(buckets)
}

pub fn month_end(date: Date) -> Date {
    let mut end = date;
    while let Some(next) = end.next_day().filter(|next| next.month() == date.month()) {
        end = next;
    }
    end
}
