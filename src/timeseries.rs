use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::forecast::{ForecastSeries, Forecaster, SeriesPoint};
use crate::models::PostRow;

/// Why no forecast could be produced. The message doubles as chart title.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastUnavailable {
    #[error("No data for forecast")]
    NoData,
    #[error("Missing timestamp or sentiment column")]
    MissingFields,
    #[error("No rows with a parseable timestamp and sentiment")]
    NoParsableRows,
    #[error("Not enough variation in the data for a forecast")]
    InsufficientVariation,
    #[error("Forecast model failed: {0}")]
    Model(String),
}

impl ForecastUnavailable {
    pub fn code(&self) -> &'static str {
        match self {
            ForecastUnavailable::NoData => "no_data",
            ForecastUnavailable::MissingFields => "missing_fields",
            ForecastUnavailable::NoParsableRows => "no_parsable_rows",
            ForecastUnavailable::InsufficientVariation => "insufficient_variation",
            ForecastUnavailable::Model(_) => "model_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentForecast {
    pub history: Vec<SeriesPoint>,
    pub prediction: ForecastSeries,
}

// time of day followed by Z, ±HH:MM, ±HHMM or ±HH
static TZ_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>.*\d{1,2}:\d{2}(?::\d{2}(?:[.,]\d+)?)?)\s*(?:Z|[+-]\d{2}(?::?\d{2})?)$")
        .expect("static pattern")
});

/// Drop a trailing timezone designator, leaving the local wall-clock time.
pub fn strip_tz_suffix(raw: &str) -> String {
    let s = raw.trim();
    match TZ_SUFFIX.captures(s) {
        Some(c) => c["base"].trim_end().to_string(),
        None => s.strip_suffix('Z').unwrap_or(s).trim_end().to_string(),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a loosely formatted timestamp after removing its timezone suffix.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = strip_tz_suffix(raw);
    if s.is_empty() {
        return None;
    }
    for f in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, f) {
            return Some(dt);
        }
    }
    for f in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&s, f) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Rows with a parseable timestamp and a sentiment label, as (time, score), sorted.
pub fn scored_points(rows: &[PostRow]) -> Vec<(NaiveDateTime, f64)> {
    let mut pts: Vec<(NaiveDateTime, f64)> = rows
        .iter()
        .filter_map(|r| {
            let label = r.sentiment()?;
            let ts = parse_timestamp(r.timestamp.as_deref()?)?;
            Some((ts, label.score()))
        })
        .collect();
    pts.sort_by_key(|(ts, _)| *ts);
    pts
}

/// Mean score per fixed-width bucket, buckets anchored at midnight of the
/// first point's day. Gaps between populated buckets are filled with 0.
pub fn resample(points: &[(NaiveDateTime, f64)], bucket_width: Duration) -> Vec<SeriesPoint> {
    let width = bucket_width.num_seconds();
    let Some((first, _)) = points.first() else {
        return Vec::new();
    };
    if width <= 0 {
        return Vec::new();
    }
    let origin = first.date().and_time(chrono::NaiveTime::MIN);

    let mut sums: BTreeMap<i64, (f64, u32)> = BTreeMap::new();
    for (ts, score) in points {
        let idx = (*ts - origin).num_seconds().div_euclid(width);
        let e = sums.entry(idx).or_insert((0.0, 0));
        e.0 += score;
        e.1 += 1;
    }

    let (Some(&lo), Some(&hi)) = (sums.keys().next(), sums.keys().next_back()) else {
        return Vec::new();
    };
    (lo..=hi)
        .map(|idx| {
            let value = sums.get(&idx).map(|(s, c)| s / *c as f64).unwrap_or(0.0);
            SeriesPoint {
                ts: origin + Duration::seconds(idx * width),
                value,
            }
        })
        .collect()
}

/// Number of distinct values in a series (`-0.0` and `0.0` count as one).
pub fn distinct_values(series: &[SeriesPoint]) -> usize {
    let mut bits: Vec<u64> = series.iter().map(|p| (p.value + 0.0).to_bits()).collect();
    bits.sort_unstable();
    bits.dedup();
    bits.len()
}

/// Resample the rows' sentiment and run the forecaster over it.
pub fn forecast_sentiment(
    rows: &[PostRow],
    horizon: usize,
    bucket_width: Duration,
    forecaster: &dyn Forecaster,
) -> Result<SentimentForecast, ForecastUnavailable> {
    if rows.is_empty() {
        return Err(ForecastUnavailable::NoData);
    }

    let points = scored_points(rows);
    if points.is_empty() {
        return Err(ForecastUnavailable::NoParsableRows);
    }
    let dropped = rows.len() - points.len();

    let history = resample(&points, bucket_width);
    let distinct = distinct_values(&history);
    debug!(
        "Sentiment series resampled - rows={}, dropped={}, buckets={}, distinct_values={}",
        rows.len(), dropped, history.len(), distinct
    );
    if distinct < 2 {
        return Err(ForecastUnavailable::InsufficientVariation);
    }

    let prediction = forecaster
        .fit_and_predict(&history, horizon, bucket_width)
        .map_err(|e| {
            warn!("Forecaster failed - buckets={}, error={:#}", history.len(), e);
            ForecastUnavailable::Model(e.to_string())
        })?;

    Ok(SentimentForecast { history, prediction })
}
