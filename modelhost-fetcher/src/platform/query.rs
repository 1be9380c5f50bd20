//! Datapoint selection and aggregation over an in-process series.
//!
//! Shared by the stores that hold raw datapoints locally. Raw queries return the
//! points in `[start, end)`, optionally padded with the nearest point on either
//! side. Aggregate queries bucket points on `t - t mod granularity` and emit one
//! point per non-empty bucket, stamped with the bucket start.

use super::{Datapoint, DatapointsQuery, PlatformError};
use modelhost_spec::Aggregate;

/// Answer `query` from `points`, which must be sorted by timestamp.
pub fn select(points: &[Datapoint], query: &DatapointsQuery) -> Result<Vec<Datapoint>, PlatformError> {
    match (query.aggregate, query.granularity.as_ref()) {
        (Some(aggregate), Some(granularity)) => {
            aggregate_points(points, query.start, query.end, aggregate, granularity.as_ms())
        }
        _ => Ok(raw_points(points, query.start, query.end, query.include_outside_points)),
    }
}

/// Index of the first point with `timestamp >= t`.
fn lower_bound(points: &[Datapoint], t: i64) -> usize {
    points.partition_point(|p| p.timestamp < t)
}

fn raw_points(points: &[Datapoint], start: i64, end: i64, include_outside: bool) -> Vec<Datapoint> {
    let from = lower_bound(points, start);
    let to = lower_bound(points, end).max(from);

    let from = if include_outside { from.saturating_sub(1) } else { from };
    let to = if include_outside { (to + 1).min(points.len()) } else { to };
    points[from..to].to_vec()
}

fn aggregate_points(
    points: &[Datapoint],
    start: i64,
    end: i64,
    aggregate: Aggregate,
    granularity_ms: i64,
) -> Result<Vec<Datapoint>, PlatformError> {
    if aggregate == Aggregate::ContinuousVariance {
        return Err(PlatformError::UnsupportedAggregate(aggregate));
    }

    let from = lower_bound(points, start);
    let to = lower_bound(points, end).max(from);
    let in_range = &points[from..to];

    let mut out = Vec::new();
    let mut bucket_begin = 0;
    while bucket_begin < in_range.len() {
        let bucket_start = bucket_of(in_range[bucket_begin].timestamp, granularity_ms);
        let bucket_len = in_range[bucket_begin..]
            .iter()
            .take_while(|p| bucket_of(p.timestamp, granularity_ms) == bucket_start)
            .count();
        let bucket = &in_range[bucket_begin..bucket_begin + bucket_len];

        let value = match aggregate {
            Aggregate::Average => mean(bucket),
            Aggregate::Count => bucket.len() as f64,
            Aggregate::Max => bucket.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Min => bucket.iter().map(|p| p.value).fold(f64::INFINITY, f64::min),
            Aggregate::Sum => bucket.iter().map(|p| p.value).sum(),
            Aggregate::DiscreteVariance => variance(bucket),
            Aggregate::TotalVariation => bucket
                .windows(2)
                .map(|pair| (pair[1].value - pair[0].value).abs())
                .sum(),
            Aggregate::StepInterpolation => step_at(points, bucket_start, bucket[0].value),
            Aggregate::Interpolation => interpolate_at(points, bucket_start, bucket[0].value),
            Aggregate::ContinuousVariance => return Err(PlatformError::UnsupportedAggregate(aggregate)),
        };
        out.push(Datapoint::new(bucket_start, value));
        bucket_begin += bucket_len;
    }
    Ok(out)
}

fn bucket_of(timestamp: i64, granularity_ms: i64) -> i64 {
    timestamp - timestamp.rem_euclid(granularity_ms)
}

fn mean(bucket: &[Datapoint]) -> f64 {
    bucket.iter().map(|p| p.value).sum::<f64>() / bucket.len() as f64
}

/// Population variance of the bucket values.
fn variance(bucket: &[Datapoint]) -> f64 {
    let mu = mean(bucket);
    bucket.iter().map(|p| (p.value - mu).powi(2)).sum::<f64>() / bucket.len() as f64
}

/// Value of the latest point at or before `t`, else `fallback`.
fn step_at(points: &[Datapoint], t: i64, fallback: f64) -> f64 {
    let after = points.partition_point(|p| p.timestamp <= t);
    after.checked_sub(1).map(|i| points[i].value).unwrap_or(fallback)
}

/// Linear interpolation at `t` between its neighbours, else `fallback`.
fn interpolate_at(points: &[Datapoint], t: i64, fallback: f64) -> f64 {
    let next = lower_bound(points, t);
    match (next.checked_sub(1).map(|i| points[i]), points.get(next)) {
        (_, Some(p)) if p.timestamp == t => p.value,
        (Some(before), Some(after)) => {
            let span = (after.timestamp - before.timestamp) as f64;
            let weight = (t - before.timestamp) as f64 / span;
            before.value + weight * (after.value - before.value)
        }
        _ => fallback,
    }
}
