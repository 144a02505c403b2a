use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Closed set of sentiment classes. Locale variants of the labels all map here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Normalize a raw label. Empty input and null markers are `None`;
    /// anything else unrecognized is neutral.
    pub fn parse(raw: &str) -> Option<Self> {
        if is_missing_cell(raw) {
            return None;
        }
        let s = raw.trim().trim_end_matches('.').trim().to_lowercase();
        if s.is_empty() {
            return None;
        }
        Some(match s.as_str() {
            "positivo" | "positive" => SentimentLabel::Positive,
            "negativo" | "negative" => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        })
    }

    pub fn score(&self) -> f64 {
        match self {
            SentimentLabel::Positive => 1.0,
            SentimentLabel::Negative => -1.0,
            SentimentLabel::Neutral => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "#2ca02c",
            SentimentLabel::Negative => "#d62728",
            SentimentLabel::Neutral => NEUTRAL_COLOR,
        }
    }
}

pub const NEUTRAL_COLOR: &str = "#7f7f7f";

/// One ingested post. Absent or empty CSV cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub timestamp: Option<String>,
    pub text: Option<String>,
    pub likes: Option<u64>,
    pub sentiment_label: Option<String>,
}

impl PostRow {
    pub fn sentiment(&self) -> Option<SentimentLabel> {
        self.sentiment_label.as_deref().and_then(SentimentLabel::parse)
    }
}

/// Header positions of the known columns, resolved through aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub timestamp: Option<usize>,
    pub text: Option<usize>,
    pub sentiment: Option<usize>,
    pub likes: Option<usize>,
}

/// Written for absent values on ingestion.
pub const MISSING_CELL: &str = "N/A";

// the null markers spreadsheet and dataframe tools emit, matched exactly
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for an empty cell or a null marker such as `N/A` or `nan`.
pub fn is_missing_cell(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || MISSING_MARKERS.contains(&s)
}

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "fecha", "created_time"];
const TEXT_ALIASES: &[&str] = &["text", "post", "message"];
const SENTIMENT_ALIASES: &[&str] = &["sentiment_label", "sentimiento", "sentiment"];
const LIKES_ALIASES: &[&str] = &["likes"];

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Self {
        let find = |aliases: &[&str]| {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(alias))
            })
        };
        ColumnMap {
            timestamp: find(TIMESTAMP_ALIASES),
            text: find(TEXT_ALIASES),
            sentiment: find(SENTIMENT_ALIASES),
            likes: find(LIKES_ALIASES),
        }
    }

    fn row_from(&self, record: &[String]) -> PostRow {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|s| s.trim())
                .filter(|s| !is_missing_cell(s))
                .map(|s| s.to_string())
        };
        PostRow {
            timestamp: cell(self.timestamp),
            text: cell(self.text),
            // float-formatted counts ("12.0") show up in hand-edited sheets
            likes: cell(self.likes).and_then(|s| {
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
            }),
            sentiment_label: cell(self.sentiment),
        }
    }
}

/// Immutable view of one stored data file.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub name: String,
    pub modified: Option<DateTime<Utc>>,
    pub fingerprint: String,
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
    pub columns: ColumnMap,
    pub rows: Vec<PostRow>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn from_csv_bytes(name: &str, bytes: &[u8], modified: Option<DateTime<Utc>>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("reading CSV header of {}", name))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let columns = ColumnMap::resolve(&headers);

        let mut records = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("reading CSV record {} of {}", i + 1, name))?;
            records.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }
        let rows = records.iter().map(|r| columns.row_from(r)).collect();

        Ok(Snapshot {
            name: name.to_string(),
            modified,
            fingerprint: format!("{:016x}", xxh3_64(bytes)),
            headers,
            records,
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_variants_normalize_to_closed_set() {
        assert_eq!(SentimentLabel::parse("Positivo"), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("positivo."), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("NEGATIVE"), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::parse("neutro"), Some(SentimentLabel::Neutral));
        assert_eq!(SentimentLabel::parse("mixed"), Some(SentimentLabel::Neutral));
        assert_eq!(SentimentLabel::parse("   "), None);
        assert_eq!(SentimentLabel::parse("N/A"), None);
        assert_eq!(SentimentLabel::parse("nan"), None);
        assert_eq!(SentimentLabel::Negative.score(), -1.0);
    }

    #[test]
    fn spanish_headers_resolve_through_aliases() {
        let csv = "Fecha,Post,Likes,Sentimiento\n\
                   2025-01-01T10:00:00+0000,hola mundo,3,Positivo\n\
                   2025-01-01T11:00:00+0000,,,\n";
        let snap = Snapshot::from_csv_bytes("sentimiento.csv", csv.as_bytes(), None).unwrap();

        assert_eq!(snap.headers, vec!["Fecha", "Post", "Likes", "Sentimiento"]);
        assert_eq!(snap.rows.len(), 2);
        assert_eq!(snap.rows[0].text.as_deref(), Some("hola mundo"));
        assert_eq!(snap.rows[0].likes, Some(3));
        assert_eq!(snap.rows[0].sentiment(), Some(SentimentLabel::Positive));
        assert_eq!(snap.rows[1], PostRow {
            timestamp: Some("2025-01-01T11:00:00+0000".into()),
            ..Default::default()
        });
        assert_eq!(snap.fingerprint.len(), 16);
    }

    #[test]
    fn null_markers_read_as_absent_cells() {
        let csv = "timestamp,text,likes,sentiment_label\n\
                   2025-01-01T10:30:00+0000,N/A,0,N/A\n\
                   N/A,nan,NULL,null\n\
                   2025-01-01T11:00:00+0000,NA is a word here,1,NA\n";
        let snap = Snapshot::from_csv_bytes("x.csv", csv.as_bytes(), None).unwrap();

        assert_eq!(snap.rows[0], PostRow {
            timestamp: Some("2025-01-01T10:30:00+0000".into()),
            likes: Some(0),
            ..Default::default()
        });
        assert_eq!(snap.rows[1], PostRow::default());
        assert_eq!(snap.rows[2].text.as_deref(), Some("NA is a word here"));
        assert_eq!(snap.rows[2].sentiment(), None);
        // the table keeps what the file says
        assert_eq!(snap.records[0][1], "N/A");
    }

    #[test]
    fn missing_text_column_leaves_text_unset() {
        let csv = "timestamp,sentiment_label\n2025-01-01 10:00,neutral\n";
        let snap = Snapshot::from_csv_bytes("x.csv", csv.as_bytes(), None).unwrap();
        assert_eq!(snap.columns.text, None);
        assert!(snap.rows[0].text.is_none());
    }
}
