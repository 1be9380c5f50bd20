//! Millisecond time arithmetic shared by every spec.
//!
//! Three textual forms are understood:
//! - granularities: `<integer>(s|m|h|d)`, e.g. `"5m"`
//! - intervals and offsets: `[-]<integer>(s|m|h|d|w)`, e.g. `"1w"`, `"-3h"`
//! - relative instants: `"now"` or `<integer>(s|m|h|d|w)-ago`, e.g. `"2d-ago"`
//!
//! Everything resolves to epoch milliseconds (`i64`).

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

pub const MS_PER_SECOND: i64 = 1_000;
pub const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
pub const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Errors raised while parsing or resolving time expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid granularity format: `{0}`. Must be on format <integer>(s|m|h|d), e.g. '5m', '3h' or '1d'")]
    InvalidGranularity(String),

    #[error("invalid time-ago format: `{0}`. Must be on format <integer>(s|m|h|d|w)-ago or 'now', e.g. '3d-ago' or '1w-ago'")]
    InvalidTimeAgo(String),

    #[error("invalid time interval format: `{0}`. Must be on format <integer>(s|m|h|d|w), e.g. '5m', '3h' or '1d'")]
    InvalidInterval(String),

    #[error("invalid time offset format: `{0}`. Must be on format [-]<integer>(s|m|h|d|w), e.g. '-5m', '-3h' or '1d'")]
    InvalidOffset(String),

    #[error("timestamps can't be negative (they must represent a time after 1970-01-01), but {0} was provided")]
    NegativeTimestamp(i64),

    #[error("time interval has to be positive, but got {0} ms")]
    NonPositiveInterval(i64),
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn unit_ms(unit: char, allow_weeks: bool) -> Option<i64> {
    match unit {
        's' => Some(MS_PER_SECOND),
        'm' => Some(MS_PER_MINUTE),
        'h' => Some(MS_PER_HOUR),
        'd' => Some(MS_PER_DAY),
        'w' if allow_weeks => Some(MS_PER_WEEK),
        _ => None,
    }
}

/// Parse `[-]<digits><unit>` into milliseconds. `None` on any mismatch or overflow.
fn magnitude_to_ms(text: &str, allow_weeks: bool, allow_negative: bool) -> Option<i64> {
    let unit = text.chars().last()?;
    let per_unit = unit_ms(unit, allow_weeks)?;
    let digits = &text[..text.len() - unit.len_utf8()];

    let (negative, digits) = match digits.strip_prefix('-') {
        Some(rest) if allow_negative => (true, rest),
        Some(_) => return None,
        None => (false, digits),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let magnitude: i64 = digits.parse().ok()?;
    let ms = magnitude.checked_mul(per_unit)?;
    Some(if negative { -ms } else { ms })
}

/// Milliseconds in a granularity such as `"1m"` or `"12h"`. Weeks are not a
/// valid granularity unit and zero-length granularities are rejected.
pub fn granularity_to_ms(granularity: &str) -> Result<i64, TimeError> {
    match magnitude_to_ms(granularity, false, false) {
        Some(ms) if ms > 0 => Ok(ms),
        _ => Err(TimeError::InvalidGranularity(granularity.to_string())),
    }
}

/// Milliseconds in a positive interval such as `"5m"` or `"1w"`.
pub fn interval_to_ms(interval: &str) -> Result<i64, TimeError> {
    let ms = magnitude_to_ms(interval, true, false)
        .ok_or_else(|| TimeError::InvalidInterval(interval.to_string()))?;
    if ms <= 0 {
        return Err(TimeError::NonPositiveInterval(ms));
    }
    Ok(ms)
}

/// Milliseconds in a signed offset such as `"-5m"`.
pub fn offset_to_ms(offset: &str) -> Result<i64, TimeError> {
    magnitude_to_ms(offset, true, true).ok_or_else(|| TimeError::InvalidOffset(offset.to_string()))
}

/// How far back a relative instant lies: `"now"` is 0, `"3d-ago"` is three days.
pub fn time_ago_to_ms(time_ago: &str) -> Result<i64, TimeError> {
    if time_ago == "now" {
        return Ok(0);
    }
    time_ago
        .strip_suffix("-ago")
        .and_then(|magnitude| magnitude_to_ms(magnitude, true, false))
        .ok_or_else(|| TimeError::InvalidTimeAgo(time_ago.to_string()))
}

/// An absolute instant given as epoch milliseconds, a relative expression, or a datetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeInput {
    Millis(i64),
    Ago(String),
    DateTime(DateTime<Utc>),
}

impl TimeInput {
    /// Resolve against an explicit "now". Relative expressions are subtracted from it.
    pub fn resolve(&self, now_ms: i64) -> Result<i64, TimeError> {
        let ms = match self {
            TimeInput::Millis(ms) => *ms,
            TimeInput::Ago(text) => now_ms - time_ago_to_ms(text)?,
            TimeInput::DateTime(dt) => dt.timestamp_millis(),
        };
        if ms < 0 {
            return Err(TimeError::NegativeTimestamp(ms));
        }
        Ok(ms)
    }

    /// Resolve against the wall clock.
    pub fn to_ms(&self) -> Result<i64, TimeError> {
        self.resolve(now_ms())
    }
}

impl From<i64> for TimeInput {
    fn from(ms: i64) -> Self {
        TimeInput::Millis(ms)
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        TimeInput::Ago(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        TimeInput::Ago(text)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeInput::DateTime(dt)
    }
}

/// Naive datetimes are taken to be UTC.
impl From<NaiveDateTime> for TimeInput {
    fn from(dt: NaiveDateTime) -> Self {
        TimeInput::DateTime(dt.and_utc())
    }
}

/// A span of time: strides, window sizes and output offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanInput {
    Millis(i64),
    Text(String),
    Duration(chrono::Duration),
}

impl SpanInput {
    /// Resolve as a strictly positive interval.
    pub fn interval_ms(&self) -> Result<i64, TimeError> {
        let ms = match self {
            SpanInput::Millis(ms) => *ms,
            SpanInput::Text(text) => interval_to_ms(text)?,
            SpanInput::Duration(d) => d.num_milliseconds(),
        };
        if ms <= 0 {
            return Err(TimeError::NonPositiveInterval(ms));
        }
        Ok(ms)
    }

    /// Resolve as a signed offset.
    pub fn offset_ms(&self) -> Result<i64, TimeError> {
        match self {
            SpanInput::Millis(ms) => Ok(*ms),
            SpanInput::Text(text) => offset_to_ms(text),
            SpanInput::Duration(d) => Ok(d.num_milliseconds()),
        }
    }
}

impl From<i64> for SpanInput {
    fn from(ms: i64) -> Self {
        SpanInput::Millis(ms)
    }
}

impl From<&str> for SpanInput {
    fn from(text: &str) -> Self {
        SpanInput::Text(text.to_string())
    }
}

impl From<String> for SpanInput {
    fn from(text: String) -> Self {
        SpanInput::Text(text)
    }
}

impl From<chrono::Duration> for SpanInput {
    fn from(d: chrono::Duration) -> Self {
        SpanInput::Duration(d)
    }
}

/// Windows `(window_end - window_size, window_end)` of a recurring schedule.
///
/// Window ends fall on `first + k * stride`. The first one is the earliest such
/// tick at or after `max(start, first)`; ticks advance while strictly before `end`.
/// A non-positive stride yields no windows.
pub fn calculate_windows(
    start: i64,
    end: i64,
    stride: i64,
    window_size: i64,
    first: i64,
) -> Vec<(i64, i64)> {
    if stride <= 0 {
        return Vec::new();
    }

    let mut tick = start.max(first);
    // tick >= first, so the distance fits in u64
    let misalignment = (tick.abs_diff(first) % stride as u64) as i64;
    if misalignment != 0 {
        match tick.checked_add(stride - misalignment) {
            Some(aligned) => tick = aligned,
            None => return Vec::new(),
        }
    }

    let mut windows = Vec::new();
    while tick < end {
        windows.push((tick.saturating_sub(window_size), tick));
        match tick.checked_add(stride) {
            Some(next) => tick = next,
            None => break,
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn granularity_units() {
        assert_eq!(granularity_to_ms("1s"), Ok(1_000));
        assert_eq!(granularity_to_ms("5m"), Ok(300_000));
        assert_eq!(granularity_to_ms("3h"), Ok(10_800_000));
        assert_eq!(granularity_to_ms("1d"), Ok(86_400_000));
    }

    #[test]
    fn granularity_rejects_weeks_zero_and_garbage() {
        for bad in ["1w", "0m", "m", "", "1.5m", "-1m", "1 m", "1M", "1ms"] {
            assert!(
                matches!(granularity_to_ms(bad), Err(TimeError::InvalidGranularity(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn interval_accepts_weeks() {
        assert_eq!(interval_to_ms("2w"), Ok(2 * MS_PER_WEEK));
        assert!(matches!(interval_to_ms("0s"), Err(TimeError::NonPositiveInterval(0))));
        assert!(matches!(interval_to_ms("-1s"), Err(TimeError::InvalidInterval(_))));
    }

    #[test]
    fn offset_allows_sign() {
        assert_eq!(offset_to_ms("-5m"), Ok(-300_000));
        assert_eq!(offset_to_ms("1d"), Ok(MS_PER_DAY));
        assert_eq!(offset_to_ms("0s"), Ok(0));
        assert!(offset_to_ms("--5m").is_err());
    }

    #[test]
    fn time_ago_forms() {
        assert_eq!(time_ago_to_ms("now"), Ok(0));
        assert_eq!(time_ago_to_ms("3d-ago"), Ok(3 * MS_PER_DAY));
        assert_eq!(time_ago_to_ms("1w-ago"), Ok(MS_PER_WEEK));
        assert!(time_ago_to_ms("3d").is_err());
        assert!(time_ago_to_ms("yesterday").is_err());
    }

    #[test]
    fn time_input_resolution() {
        let now = 10 * MS_PER_DAY;
        assert_eq!(TimeInput::from(1234).resolve(now), Ok(1234));
        assert_eq!(TimeInput::from("now").resolve(now), Ok(now));
        assert_eq!(TimeInput::from("1d-ago").resolve(now), Ok(9 * MS_PER_DAY));

        let dt = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(TimeInput::from(dt).resolve(now), Ok(1_514_764_800_000));

        let naive = NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(TimeInput::from(naive).resolve(now), Ok(1_546_300_800_000));
    }

    #[test]
    fn time_input_rejects_negative() {
        assert_eq!(
            TimeInput::from(-1).resolve(0),
            Err(TimeError::NegativeTimestamp(-1))
        );
        assert!(matches!(
            TimeInput::from("2d-ago").resolve(MS_PER_DAY),
            Err(TimeError::NegativeTimestamp(_))
        ));
    }

    #[test]
    fn span_input_resolution() {
        assert_eq!(SpanInput::from("1m").interval_ms(), Ok(60_000));
        assert_eq!(SpanInput::from(chrono::Duration::seconds(90)).interval_ms(), Ok(90_000));
        assert!(SpanInput::from(0).interval_ms().is_err());
        assert_eq!(SpanInput::from("-1h").offset_ms(), Ok(-MS_PER_HOUR));
        assert_eq!(SpanInput::from(-7).offset_ms(), Ok(-7));
    }

    #[test]
    fn windows_from_first_tick() {
        assert_eq!(
            calculate_windows(0, 5, 1, 1, 0),
            vec![(-1, 0), (0, 1), (1, 2), (2, 3), (3, 4)]
        );
        assert_eq!(calculate_windows(1, 5, 2, 1, 0), vec![(1, 2), (3, 4)]);
        assert_eq!(calculate_windows(1, 5, 1, 3, 0), vec![(-2, 1), (-1, 2), (0, 3), (1, 4)]);
    }

    #[test]
    fn windows_respect_later_first_tick() {
        assert_eq!(calculate_windows(0, 10, 3, 2, 4), vec![(2, 4), (5, 7)]);
    }

    #[test]
    fn windows_align_to_first_when_start_is_between_ticks() {
        // ticks at 2, 7, 12, ...; start 3 rounds up to 7
        assert_eq!(calculate_windows(3, 13, 5, 5, 2), vec![(2, 7), (7, 12)]);
    }

    #[test]
    fn windows_empty_when_range_is_empty_or_stride_invalid() {
        assert!(calculate_windows(5, 5, 1, 1, 0).is_empty());
        assert!(calculate_windows(0, 10, 0, 1, 0).is_empty());
    }

    #[test]
    fn windows_stop_at_the_end_of_the_time_axis() {
        assert_eq!(
            calculate_windows(0, i64::MAX, i64::MAX, 1, 5),
            vec![(4, 5)]
        );
        assert_eq!(
            calculate_windows(i64::MAX - 10, i64::MAX, 4, 3, 0),
            vec![(i64::MAX - 7 - 3, i64::MAX - 7), (i64::MAX - 6, i64::MAX - 3)]
        );
        // aligning to the next tick would run past i64::MAX
        assert!(calculate_windows(i64::MAX - 1, i64::MAX, i64::MAX - 1, 1, 3).is_empty());
        assert_eq!(
            calculate_windows(i64::MIN, i64::MIN + 2, 1, i64::MAX, i64::MIN),
            vec![(i64::MIN, i64::MIN), (i64::MIN, i64::MIN + 1)]
        );
    }
}
