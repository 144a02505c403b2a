use anyhow::{anyhow, bail, Result};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub ts: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub ts: NaiveDateTime,
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Predicted values for every history bucket followed by the horizon buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
}

/// Black-box forecasting capability: fit on `history`, predict `horizon`
/// further buckets of width `bucket_width`.
pub trait Forecaster {
    fn fit_and_predict(
        &self,
        history: &[SeriesPoint],
        horizon: usize,
        bucket_width: Duration,
    ) -> Result<ForecastSeries>;
}

/// Upper bound on history plus horizon buckets in one prediction.
pub const MAX_POINTS: usize = 100_000;

/// Least-squares trend line over the bucket index with a prediction band.
#[derive(Debug, Clone, Copy)]
pub struct TrendForecaster {
    pub interval_width: f64,
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self { interval_width: 0.95 }
    }
}

impl TrendForecaster {
    pub fn new(interval_width: f64) -> Self {
        Self { interval_width }
    }

    fn z(&self) -> f64 {
        match self.interval_width {
            c if c >= 0.99 => 2.576,
            c if c >= 0.95 => 1.96,
            c if c >= 0.90 => 1.645,
            c if c >= 0.80 => 1.282,
            _ => 1.0,
        }
    }
}

impl Forecaster for TrendForecaster {
    fn fit_and_predict(
        &self,
        history: &[SeriesPoint],
        horizon: usize,
        bucket_width: Duration,
    ) -> Result<ForecastSeries> {
        if history.len() < 2 {
            bail!("need at least 2 points to fit a trend, got {}", history.len());
        }
        if history.iter().any(|p| !p.value.is_finite()) {
            bail!("history contains non-finite values");
        }

        let n = history.len() as f64;
        let xs: Vec<f64> = (0..history.len()).map(|i| i as f64).collect();
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = history.iter().map(|p| p.value).sum::<f64>() / n;

        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(history)
            .map(|(x, p)| (x - x_mean) * (p.value - y_mean))
            .sum();
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let sse: f64 = xs
            .iter()
            .zip(history)
            .map(|(x, p)| (p.value - (intercept + slope * x)).powi(2))
            .sum();
        let s = if history.len() > 2 { (sse / (n - 2.0)).sqrt() } else { 0.0 };
        let z = self.z();

        let origin = history[0].ts;
        let total = history
            .len()
            .checked_add(horizon)
            .filter(|t| *t <= MAX_POINTS)
            .ok_or_else(|| anyhow!("horizon {} exceeds {} points", horizon, MAX_POINTS))?;
        let mut points = Vec::with_capacity(total);
        for i in 0..total {
            let x = i as f64;
            let yhat = intercept + slope * x;
            let se = s * (1.0 + 1.0 / n + (x - x_mean).powi(2) / sxx).sqrt();
            let ts = i32::try_from(i)
                .ok()
                .and_then(|step| bucket_width.checked_mul(step))
                .and_then(|offset| origin.checked_add_signed(offset))
                .ok_or_else(|| anyhow!("bucket {} past {} is out of the calendar range", i, origin))?;
            points.push(ForecastPoint {
                ts,
                yhat,
                lower: yhat - z * se,
                upper: yhat + z * se,
            });
        }

        Ok(ForecastSeries { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn exact_line_has_zero_width_band() {
        let hist: Vec<SeriesPoint> = (0..4)
            .map(|i| SeriesPoint { ts: at(i), value: -1.0 + 0.5 * i as f64 })
            .collect();
        let out = TrendForecaster::default()
            .fit_and_predict(&hist, 2, Duration::hours(1))
            .unwrap();

        assert_eq!(out.points.len(), 6);
        assert_eq!(out.points[5].ts, at(5));
        assert!((out.points[5].yhat - 1.5).abs() < 1e-9);
        assert!((out.points[5].upper - out.points[5].lower).abs() < 1e-9);
    }

    #[test]
    fn noisy_history_gets_a_band_that_widens_with_distance() {
        let values = [0.0, 1.0, -1.0, 0.5, 0.0];
        let hist: Vec<SeriesPoint> = values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint { ts: at(i as u32), value: *v })
            .collect();
        let out = TrendForecaster::new(0.95).fit_and_predict(&hist, 3, Duration::hours(1)).unwrap();

        let width = |p: &ForecastPoint| p.upper - p.lower;
        assert!(out.points.iter().all(|p| p.lower <= p.yhat && p.yhat <= p.upper));
        assert!(width(&out.points[7]) > width(&out.points[2]));
    }

    #[test]
    fn oversized_horizon_or_width_is_an_error() {
        let hist: Vec<SeriesPoint> = (0..3)
            .map(|i| SeriesPoint { ts: at(i), value: i as f64 })
            .collect();
        let f = TrendForecaster::default();

        assert!(f.fit_and_predict(&hist, usize::MAX, Duration::hours(1)).is_err());
        assert!(f.fit_and_predict(&hist, MAX_POINTS, Duration::hours(1)).is_err());
        // a century per bucket leaves the calendar after a few thousand steps
        let err = f.fit_and_predict(&hist, 5_000, Duration::days(36_500)).unwrap_err();
        assert!(err.to_string().contains("calendar range"));
    }

    #[test]
    fn rejects_single_point() {
        let hist = [SeriesPoint { ts: at(0), value: 1.0 }];
        assert!(TrendForecaster::default().fit_and_predict(&hist, 1, Duration::hours(1)).is_err());
    }
}
