use anyhow::{anyhow, bail, Result};
use chrono::Duration;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Knobs for deriving dashboard data from a snapshot.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub csv_folder: PathBuf,
    pub top_words: usize,
    pub forecast_horizon: usize,
    pub bucket_width: Duration,
    pub interval_width: f64,
    pub timezone: Tz,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            csv_folder: PathBuf::from("datos"),
            top_words: 25,
            forecast_horizon: 8,
            bucket_width: Duration::hours(1),
            interval_width: 0.95,
            timezone: Tz::UTC,
        }
    }
}

/// Credentials and endpoints for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub access_token: String,
    pub page_id: String,
    pub text_key: String,
    pub text_endpoint: String,
    pub language: Option<String>,
    pub graph_version: String,
    pub batch_size: usize,
    pub max_pages: usize,
}

/// The four required ingestion settings, validated together.
#[derive(Debug, Clone)]
pub struct IngestCredentials {
    pub access_token: String,
    pub page_id: String,
    pub text_key: String,
    pub text_endpoint: String,
}

impl IngestCredentials {
    /// Fail with the names of every missing setting rather than the first one.
    pub fn from_parts(
        access_token: Option<String>,
        page_id: Option<String>,
        text_key: Option<String>,
        text_endpoint: Option<String>,
    ) -> Result<Self> {
        let mut missing = Vec::new();
        let mut take = |v: Option<String>, name: &'static str| {
            let v = v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            if v.is_none() {
                missing.push(name);
            }
            v.unwrap_or_default()
        };
        let creds = IngestCredentials {
            access_token: take(access_token, "FACEBOOK_ACCESS_TOKEN"),
            page_id: take(page_id, "META_PAGE_ID"),
            text_key: take(text_key, "AZURE_TEXT_KEY"),
            text_endpoint: take(text_endpoint, "AZURE_TEXT_ENDPOINT"),
        };
        if !missing.is_empty() {
            bail!("Environment variables not configured: {}", missing.join(", "));
        }
        Ok(creds)
    }

    pub fn into_config(
        self,
        language: Option<String>,
        graph_version: String,
        batch_size: usize,
        max_pages: usize,
    ) -> IngestConfig {
        IngestConfig {
            access_token: self.access_token,
            page_id: self.page_id,
            text_key: self.text_key,
            text_endpoint: self.text_endpoint.trim_end_matches('/').to_string(),
            language: language.filter(|l| !l.trim().is_empty()),
            graph_version,
            batch_size: batch_size.max(1),
            max_pages: max_pages.max(1),
        }
    }
}

static WIDTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(s|sec|m|min|t|h|hr|d)\s*$").expect("static pattern")
});

/// Parse a bucket width such as `1h`, `1H`, `30min`, `15m` or `1d`.
pub fn parse_bucket_width(s: &str) -> Result<Duration> {
    let caps = WIDTH_RE
        .captures(s)
        .ok_or_else(|| anyhow!("invalid bucket width {:?} (expected e.g. 1h, 30min, 1d)", s))?;
    let n: i64 = caps[1].parse()?;
    if n == 0 {
        bail!("bucket width must be positive, got {:?}", s);
    }
    let d = match caps[2].to_ascii_lowercase().as_str() {
        "s" | "sec" => Duration::try_seconds(n),
        "m" | "min" | "t" => Duration::try_minutes(n),
        "h" | "hr" => Duration::try_hours(n),
        _ => Duration::try_days(n),
    };
    d.ok_or_else(|| anyhow!("bucket width {:?} is out of range", s))
}

pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("invalid timezone {:?}: {}", s, e))
}

/// Short label for a horizon, e.g. `8h` or `90min`.
pub fn horizon_label(horizon: usize, bucket_width: Duration) -> String {
    let total = i64::try_from(horizon)
        .ok()
        .and_then(|h| bucket_width.num_minutes().checked_mul(h));
    match total {
        Some(m) if m % 60 == 0 => format!("{}h", m / 60),
        Some(m) => format!("{}min", m),
        None => format!("{} buckets", horizon),
    }
}
