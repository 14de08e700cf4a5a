use std::{fs, io, ops::Range, path::Path};

use chrono::NaiveDate;
use plotters::prelude::*;
use thiserror::Error;
use time::{Date, Duration};
use tracing::info;

use crate::{
    resample::{monthly_mean, monthly_sum, Bucket},
    table::{ColumnError, Table},
};

pub const TEMPERATURE_SERIES: [(&str, &str, RGBColor); 3] = [
    ("Tavg", "Average temperature", GREEN),
    ("Tx", "Maximum temperature", RED),
    ("Tn", "Minimum temperature", BLUE),
];
pub const RAINFALL_COLUMN: &str = "RR";

const FONT: &str = "sans-serif";
// Bars are centred on the month end
const BAR_HALF_WIDTH: Duration = Duration::days(10);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error("Nothing to plot, the table is empty")]
    Empty,
    #[error("{0} cannot be drawn on a chart axis")]
    DateOutOfRange(Date),
    #[error("Could not draw the chart: {0}")]
    Drawing(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn drawing(error: impl std::error::Error) -> PlotError {
    PlotError::Drawing(error.to_string())
}

fn to_chrono(date: Date) -> Result<NaiveDate, PlotError> {
    NaiveDate::from_ymd_opt(date.year(), u8::from(date.month()) as u32, date.day() as u32)
        .ok_or(PlotError::DateOutOfRange(date))
}

/// Date axis covering every bucket with `margin` on both sides.
fn date_axis<T>(buckets: &[Bucket<T>], margin: Duration) -> Result<Range<NaiveDate>, PlotError> {
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return Err(PlotError::Empty);
    };
    let start = first.month_end.checked_sub(margin).unwrap_or(first.month_end);
    let end = last.month_end.checked_add(margin).unwrap_or(last.month_end);
    Ok(to_chrono(start)?..to_chrono(end)?)
}

/// Value axis with 5% of headroom on both sides.
fn value_axis(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (low, high) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), v| {
        (low.min(v), high.max(v))
    });
    if low > high {
        return 0.0..1.0;
    }
    let padding = if high - low > f64::EPSILON {
        (high - low) * 0.05
    } else {
        1.0
    };
    low - padding..high + padding
}

/// Consecutive months with a value; a month without one breaks the line.
fn segments(buckets: &[Bucket<Option<f64>>]) -> Result<Vec<Vec<(NaiveDate, f64)>>, PlotError> {
    let mut segments = vec![Vec::new()];
    for bucket in buckets {
        match bucket.value {
            Some(value) => {
                if let Some(current) = segments.last_mut() {
                    current.push((to_chrono(bucket.month_end)?, value));
                }
            }
            None => segments.push(Vec::new()),
        }
    }
    segments.retain(|segment| !segment.is_empty());
    Ok(segments)
}

/// Monthly means of the average, maximum and minimum temperature as three
/// lines, written as a PNG to `path`.
pub fn plot_temperature_trends(
    table: &Table,
    city: &str,
    path: &Path,
    size: (u32, u32),
) -> Result<(), PlotError> {
    let mut series = Vec::with_capacity(TEMPERATURE_SERIES.len());
    for (column, label, color) in TEMPERATURE_SERIES {
        series.push((monthly_mean(table, column)?, label, color));
    }

    let x_range = date_axis(&series[0].0, Duration::days(15))?;
    let y_range = value_axis(
        series
            .iter()
            .flat_map(|(buckets, _, _)| buckets.iter().filter_map(|bucket| bucket.value)),
    );
    let lines = series
        .iter()
        .map(|(buckets, label, color)| -> Result<_, PlotError> {
            Ok((segments(buckets)?, *label, *color))
        })
        .collect::<Result<Vec<_>, PlotError>>()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Monthly temperature trend in {city}"),
            (FONT, 30).into_font(),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(drawing)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Temperature (°C)")
        .x_label_formatter(&|date: &NaiveDate| date.format("%Y-%m").to_string())
        .draw()
        .map_err(drawing)?;

    for (segments, label, color) in lines {
        chart
            .draw_series(
                segments
                    .into_iter()
                    .map(|points| PathElement::new(points, color.stroke_width(2))),
            )
            .map_err(drawing)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing)?;

    root.present().map_err(drawing)?;
    info!(path = %path.display(), "wrote temperature chart");
    Ok(())
}

/// Monthly rainfall totals as bars, written as a PNG to `path`.
pub fn plot_rainfall_patterns(
    table: &Table,
    city: &str,
    path: &Path,
    size: (u32, u32),
) -> Result<(), PlotError> {
    let buckets = monthly_sum(table, RAINFALL_COLUMN)?;

    let x_range = date_axis(&buckets, BAR_HALF_WIDTH * 2)?;
    // Bars grow from zero, no headroom below it
    let low = buckets.iter().map(|bucket| bucket.value).fold(0.0, f64::min);
    let high = buckets.iter().map(|bucket| bucket.value).fold(0.0, f64::max);
    let headroom = if high > low { (high - low) * 0.05 } else { 1.0 };
    let y_range = low..high + headroom;

    let bars = buckets
        .iter()
        .map(|bucket| -> Result<_, PlotError> {
            let end = bucket.month_end;
            let left = end.checked_sub(BAR_HALF_WIDTH).unwrap_or(end);
            let right = end.checked_add(BAR_HALF_WIDTH).unwrap_or(end);
            Ok((to_chrono(left)?, to_chrono(right)?, bucket.value))
        })
        .collect::<Result<Vec<_>, PlotError>>()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Monthly rainfall pattern in {city}"),
            (FONT, 30).into_font(),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(drawing)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Date")
        .y_desc("Rainfall (mm)")
        .x_label_formatter(&|date: &NaiveDate| date.format("%Y-%m").to_string())
        .draw()
        .map_err(drawing)?;

    chart
        .draw_series(bars.into_iter().map(|(left, right, total)| {
            Rectangle::new([(left, 0.0), (right, total)], BLUE.mix(0.7).filled())
        }))
        .map_err(drawing)?;

    root.present().map_err(drawing)?;
    info!(path = %path.display(), months = buckets.len(), "wrote rainfall chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use super::*;
    use crate::load::parse_document;

    fn table(data: serde_json::Value) -> Table {
        let document = json!({
            "data": data,
            "meta": { "station": "s", "city": "c", "province": "p", "parameters": {} },
        });
        parse_document(document.to_string().as_bytes()).unwrap().0
    }

    #[test]
    fn rainfall_without_rr_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("rainfall_patterns.png");
        let table = table(json!([{ "date": "2023-01-01", "Tavg": 21.0 }]));

        let err = plot_rainfall_patterns(&table, "Bandung", &path, (400, 300)).unwrap_err();

        assert!(
            matches!(err, PlotError::Column(ColumnError::Missing(ref c)) if c == "RR"),
            "{err:?}"
        );
        assert!(!path.exists());
        assert!(!dir.path().join("output").exists());
    }

    #[test]
    fn temperature_needs_all_three_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temperature_trends.png");
        let table = table(json!([{ "date": "2023-01-01", "Tavg": 21.0, "Tn": 18.0 }]));

        let err = plot_temperature_trends(&table, "Bandung", &path, (400, 300)).unwrap_err();

        assert!(
            matches!(err, PlotError::Column(ColumnError::Missing(ref c)) if c == "Tx"),
            "{err:?}"
        );
        assert!(!path.exists());
    }

    #[test]
    fn temperature_rejects_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temperature_trends.png");
        let table = table(json!([{ "date": "2023-01-01", "Tavg": "hot", "Tx": 30, "Tn": 20 }]));

        let err = plot_temperature_trends(&table, "Bandung", &path, (400, 300)).unwrap_err();
        assert!(matches!(err, PlotError::Column(ColumnError::NonNumeric { .. })), "{err:?}");
        assert!(!path.exists());
    }

    #[test]
    fn lines_break_on_empty_months() {
        let buckets = [
            Bucket { month_end: date!(2023 - 01 - 31), value: Some(20.0) },
            Bucket { month_end: date!(2023 - 02 - 28), value: Some(21.0) },
            Bucket { month_end: date!(2023 - 03 - 31), value: None },
            Bucket { month_end: date!(2023 - 04 - 30), value: Some(23.0) },
        ];
        let segments = segments(&buckets).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(
            segments[1],
            [(NaiveDate::from_ymd_opt(2023, 4, 30).unwrap(), 23.0)]
        );
    }

    #[test]
    fn axes() {
        let axis = value_axis([10.0, 20.0].into_iter());
        assert!((axis.start - 9.5).abs() < 1e-9 && (axis.end - 20.5).abs() < 1e-9);
        assert_eq!(value_axis([3.0].into_iter()), 2.0..4.0);
        assert_eq!(value_axis(std::iter::empty()), 0.0..1.0);

        let buckets = [Bucket { month_end: date!(2023 - 01 - 31), value: 1.0 }];
        let axis = date_axis(&buckets, Duration::days(10)).unwrap();
        assert_eq!(axis.start, NaiveDate::from_ymd_opt(2023, 1, 21).unwrap());
        assert_eq!(axis.end, NaiveDate::from_ymd_opt(2023, 2, 10).unwrap());

        let empty: [Bucket<f64>; 0] = [];
        assert!(matches!(date_axis(&empty, Duration::days(10)), Err(PlotError::Empty)));
    }

    #[test]
    #[ignore = "renders text, needs system fonts"]
    fn renders_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let table = table(json!([
            { "date": "2023-01-01", "Tavg": 21.0, "Tx": 28.0, "Tn": 17.0, "RR": 4.0 },
            { "date": "2023-02-14", "Tavg": 22.0, "Tx": 29.0, "Tn": 18.0, "RR": 0.0 },
            { "date": "2023-04-02", "Tavg": 23.0, "Tx": 30.0, "Tn": 19.0, "RR": 12.5 },
        ]));
        let temperature = dir.path().join("temperature_trends.png");
        let rainfall = dir.path().join("rainfall_patterns.png");

        plot_temperature_trends(&table, "Bandung", &temperature, (600, 300)).unwrap();
        plot_rainfall_patterns(&table, "Bandung", &rainfall, (600, 300)).unwrap();

        assert!(fs::metadata(temperature).unwrap().len() > 0);
        assert!(fs::metadata(rainfall).unwrap().len() > 0);
    }
}
