//! Datapoints ↔ polars DataFrame conversion and multi-series alignment.
//!
//! Every frame carries an `i64` epoch-millisecond `timestamp` column followed by
//! `f64` value columns. Aligned frames use the union of all timestamps; a series
//! with no point at a timestamp gets a null there (never forward-filled).

use crate::platform::Datapoint;
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Name of the time axis column in every frame.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Value column of a raw (non-aggregate) series.
pub const VALUE_COLUMN: &str = "value";

/// `timestamp` + one value column, in the order given.
pub fn datapoints_frame(points: &[Datapoint], value_column: &str) -> PolarsResult<DataFrame> {
    let timestamps: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();

    DataFrame::new(vec![
        Column::new(TIMESTAMP_COLUMN.into(), timestamps),
        Column::new(value_column.into(), values),
    ])
}

/// Align several series on the union of their timestamps, sorted ascending.
///
/// Columns follow the order of `series`. Names must be distinct and must not be
/// `timestamp`.
pub fn align_frames<S: AsRef<str>>(series: &[(S, Vec<Datapoint>)]) -> PolarsResult<DataFrame> {
    let axis: Vec<i64> = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|p| p.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut columns = Vec::with_capacity(series.len() + 1);
    columns.push(Column::new(TIMESTAMP_COLUMN.into(), axis.clone()));

    for (name, points) in series {
        let by_timestamp: HashMap<i64, f64> =
            points.iter().map(|p| (p.timestamp, p.value)).collect();
        let values: Vec<Option<f64>> = axis.iter().map(|t| by_timestamp.get(t).copied()).collect();
        columns.push(Column::new(name.as_ref().into(), values));
    }

    DataFrame::new(columns)
}

/// Read `column` back as datapoints keyed by the frame's `timestamp` column.
///
/// Integer and float columns are accepted and cast. Rows where either side is
/// null are skipped.
pub fn frame_points(df: &DataFrame, column: &str) -> PolarsResult<Vec<Datapoint>> {
    let timestamps = df.column(TIMESTAMP_COLUMN)?.cast(&DataType::Int64)?;
    let values = df.column(column)?.cast(&DataType::Float64)?;

    let timestamps = timestamps.i64()?;
    let values = values.f64()?;

    Ok(timestamps
        .into_iter()
        .zip(values)
        .filter_map(|(t, v)| Some(Datapoint::new(t?, v?)))
        .collect())
}

/// Names of every column except `timestamp`, in frame order.
pub fn value_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .filter(|name| *name != TIMESTAMP_COLUMN)
        .map(String::from)
        .collect()
}

pub fn has_timestamp_column(df: &DataFrame) -> bool {
    df.column(TIMESTAMP_COLUMN).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(raw: &[(i64, f64)]) -> Vec<Datapoint> {
        raw.iter().copied().map(Datapoint::from).collect()
    }

    #[test]
    fn single_series_frame() {
        let df = datapoints_frame(&points(&[(1, 1.5), (2, 2.5)]), VALUE_COLUMN).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(value_columns(&df), ["value"]);
        assert_eq!(
            frame_points(&df, VALUE_COLUMN).unwrap(),
            points(&[(1, 1.5), (2, 2.5)])
        );
    }

    #[test]
    fn align_fills_missing_with_null() {
        let series = vec![
            ("a", points(&[(1, 10.0), (2, 20.0), (3, 30.0)])),
            ("b", points(&[(1, 100.0), (3, 300.0)])),
        ];
        let df = align_frames(&series).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(value_columns(&df), ["a", "b"]);
        let b = df.column("b").unwrap().f64().unwrap();
        assert_eq!(b.get(0), Some(100.0));
        assert_eq!(b.get(1), None);
        assert_eq!(b.null_count(), 1);

        // nulls are dropped when reading back
        assert_eq!(frame_points(&df, "b").unwrap(), points(&[(1, 100.0), (3, 300.0)]));
    }

    #[test]
    fn align_sorts_the_union_of_timestamps() {
        let series = vec![
            ("late".to_string(), points(&[(30, 1.0)])),
            ("early".to_string(), points(&[(10, 1.0), (20, 2.0)])),
        ];
        let df = align_frames(&series).unwrap();
        let ts: Vec<Option<i64>> = df
            .column(TIMESTAMP_COLUMN)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ts, vec![Some(10), Some(20), Some(30)]);
        assert_eq!(value_columns(&df), ["late", "early"]);
    }

    #[test]
    fn integer_columns_are_cast() {
        let df = DataFrame::new(vec![
            Column::new(TIMESTAMP_COLUMN.into(), vec![1_i32, 2]),
            Column::new("x".into(), vec![3_i64, 4]),
        ])
        .unwrap();
        assert_eq!(frame_points(&df, "x").unwrap(), points(&[(1, 3.0), (2, 4.0)]));
    }

    #[test]
    fn missing_timestamp_column_is_an_error() {
        let df = DataFrame::new(vec![Column::new("x".into(), vec![1.0_f64])]).unwrap();
        assert!(!has_timestamp_column(&df));
        assert!(frame_points(&df, "x").is_err());
    }
}
