use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{horizon_label, DashboardConfig};
use crate::forecast::Forecaster;
use crate::graph::{build_word_graph, WordGraph};
use crate::models::{SentimentLabel, Snapshot, NEUTRAL_COLOR};
use crate::out_models::*;
use crate::store::SnapshotSource;
use crate::timeseries::{forecast_sentiment, ForecastUnavailable, SentimentForecast};

/// Holds the snapshot the dashboard currently serves.
///
/// A refresh swaps in the newest snapshot from the source. When the source
/// has nothing (or fails), the previous snapshot stays in place.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    current: Arc<Snapshot>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn refresh(&mut self, source: &dyn SnapshotSource) -> Arc<Snapshot> {
        match source.latest() {
            Ok(Some(snap)) if !snap.is_empty() => {
                if snap.fingerprint == self.current.fingerprint {
                    debug!("Snapshot unchanged - file={}", snap.name);
                }
                self.current = Arc::new(snap);
            }
            Ok(Some(snap)) => {
                warn!("Snapshot has no rows, keeping previous - file={}", snap.name);
            }
            Ok(None) => {
                debug!("No snapshot available, keeping previous");
            }
            Err(e) => {
                warn!("Snapshot read failed, keeping previous - error={:#}", e);
            }
        }
        self.current()
    }
}

/// Derive every dashboard output from one snapshot.
pub fn build_view(
    snapshot: &Snapshot,
    cfg: &DashboardConfig,
    forecaster: &dyn Forecaster,
    now: DateTime<Utc>,
) -> DashboardView {
    let generated_at = now.with_timezone(&cfg.timezone);
    let stamp = generated_at.format("%Y-%m-%d %H:%M:%S").to_string();

    if snapshot.is_empty() {
        return DashboardView {
            has_data: false,
            source: None,
            fingerprint: None,
            generated_at: generated_at.to_rfc3339(),
            last_update: "No data (no CSV available)".to_string(),
            post_count: 0,
            graph: Vec::new(),
            sentiment: Vec::new(),
            table: TableView::default(),
            forecast: unavailable(&ForecastUnavailable::NoData),
        };
    }

    let graph = build_word_graph(&snapshot.rows, cfg.top_words);
    if graph.is_empty() {
        debug!("No content words in snapshot - file={}", snapshot.name);
    }

    let forecast = if snapshot.columns.timestamp.is_none() || snapshot.columns.sentiment.is_none() {
        Err(ForecastUnavailable::MissingFields)
    } else {
        forecast_sentiment(&snapshot.rows, cfg.forecast_horizon, cfg.bucket_width, forecaster)
    };
    let forecast = match forecast {
        Ok(f) => ForecastPanel::Ready(forecast_chart(&f, cfg)),
        Err(reason) => {
            info!("Forecast unavailable - reason={}", reason.code());
            unavailable(&reason)
        }
    };

    let mut last_update = format!("Last local update: {}", stamp);
    if !snapshot.name.is_empty() {
        last_update.push_str(&format!("  ·  CSV: {}", snapshot.name));
    }

    DashboardView {
        has_data: true,
        source: Some(snapshot.name.clone()),
        fingerprint: Some(snapshot.fingerprint.clone()),
        generated_at: generated_at.to_rfc3339(),
        last_update,
        post_count: snapshot.rows.len(),
        graph: graph_elements(&graph),
        sentiment: sentiment_distribution(snapshot),
        table: TableView {
            columns: snapshot.headers.clone(),
            rows: snapshot.records.clone(),
        },
        forecast,
    }
}

fn unavailable(reason: &ForecastUnavailable) -> ForecastPanel {
    ForecastPanel::Unavailable {
        title: reason.to_string(),
        reason: reason.code().to_string(),
    }
}

pub fn graph_elements(graph: &WordGraph) -> Vec<GraphElement> {
    let nodes = graph.nodes.iter().map(|n| GraphElement::Node {
        data: NodeData {
            id: n.token.clone(),
            label: n.token.clone(),
            freq: n.frequency,
            sentiment: n.sentiment.map(|s| s.name().to_string()),
        },
        style: NodeStyle {
            width: n.size,
            height: n.size,
            background_color: n.sentiment.map(|s| s.color()).unwrap_or(NEUTRAL_COLOR).to_string(),
        },
    });
    let edges = graph.edges.iter().map(|e| GraphElement::Edge {
        data: EdgeData {
            id: format!("e-{}-{}", e.source, e.target),
            source: e.source.clone(),
            target: e.target.clone(),
            weight: e.weight,
        },
    });
    nodes.chain(edges).collect()
}

/// Raw label counts in first-seen order; rows without a label are skipped.
fn sentiment_distribution(snapshot: &Snapshot) -> Vec<SentimentBar> {
    let mut bars: Vec<SentimentBar> = Vec::new();
    for label in snapshot.rows.iter().filter_map(|r| r.sentiment_label.as_deref()) {
        match bars.iter_mut().find(|b| b.label == label) {
            Some(b) => b.count += 1,
            None => bars.push(SentimentBar {
                label: label.to_string(),
                count: 1,
                color: SentimentLabel::parse(label)
                    .map(|s| s.color())
                    .unwrap_or(NEUTRAL_COLOR)
                    .to_string(),
            }),
        }
    }
    bars
}

fn forecast_chart(f: &SentimentForecast, cfg: &DashboardConfig) -> ForecastChart {
    let pts = &f.prediction.points;
    ForecastChart {
        title: format!(
            "Sentiment forecast ({})",
            horizon_label(cfg.forecast_horizon, cfg.bucket_width)
        ),
        x_title: "Time".to_string(),
        y_title: "Mean sentiment".to_string(),
        history: f.history.iter().map(|p| ChartPoint { x: p.ts, y: p.value }).collect(),
        predicted: pts.iter().map(|p| ChartPoint { x: p.ts, y: p.yhat }).collect(),
        upper: pts.iter().map(|p| ChartPoint { x: p.ts, y: p.upper }).collect(),
        lower: pts.iter().map(|p| ChartPoint { x: p.ts, y: p.lower }).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{ForecastSeries, SeriesPoint, TrendForecaster};
    use anyhow::{anyhow, Result};
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;

    struct QueueSource(RefCell<Vec<Result<Option<Snapshot>>>>);

    impl SnapshotSource for QueueSource {
        fn latest(&self) -> Result<Option<Snapshot>> {
            self.0.borrow_mut().remove(0)
        }
    }

    struct Exploding;

    impl Forecaster for Exploding {
        fn fit_and_predict(&self, _: &[SeriesPoint], _: usize, _: Duration) -> Result<ForecastSeries> {
            Err(anyhow!("model diverged"))
        }
    }

    fn snap(csv: &str) -> Snapshot {
        Snapshot::from_csv_bytes("sentimiento_2025-01-01_12-00-00.csv", csv.as_bytes(), None).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 30, 0).unwrap()
    }

    const VARIED: &str = "timestamp,text,likes,sentiment_label\n\
        2025-01-01T10:15:00+0000,buen producto buen servicio,3,Positivo\n\
        2025-01-01T11:45:00+0000,mal servicio,0,Negativo\n\
        2025-01-01T11:50:00+0000,servicio lento,1,neutral\n";

    #[test]
    fn refresh_keeps_previous_snapshot_when_source_is_empty_or_failing() {
        let source = QueueSource(RefCell::new(vec![
            Ok(Some(snap(VARIED))),
            Ok(None),
            Err(anyhow!("disk gone")),
            Ok(Some(snap("text\n"))),
        ]));
        let mut state = DashboardState::new();
        assert!(state.current().is_empty());

        let first = state.refresh(&source);
        assert_eq!(first.rows.len(), 3);
        for _ in 0..3 {
            let again = state.refresh(&source);
            assert!(Arc::ptr_eq(&first, &again));
        }
    }

    #[test]
    fn view_carries_graph_table_histogram_and_forecast() {
        let cfg = DashboardConfig::default();
        let view = build_view(&snap(VARIED), &cfg, &TrendForecaster::default(), now());

        assert!(view.has_data);
        assert_eq!(view.post_count, 3);
        assert_eq!(view.table.columns.len(), 4);
        assert_eq!(view.node_count(), 5);
        assert!(view.last_update.contains("2025-01-01 12:30:00"));
        assert!(view.last_update.ends_with("CSV: sentimiento_2025-01-01_12-00-00.csv"));

        let labels: Vec<(&str, u32)> = view.sentiment.iter().map(|b| (b.label.as_str(), b.count)).collect();
        assert_eq!(labels, vec![("Positivo", 1), ("Negativo", 1), ("neutral", 1)]);
        assert_eq!(view.sentiment[1].color, "#d62728");

        let with_blank = format!("{}2025-01-01T11:55:00+0000,N/A,0,N/A\n", VARIED);
        let view = build_view(&snap(&with_blank), &cfg, &TrendForecaster::default(), now());
        let labels: Vec<(&str, u32)> = view.sentiment.iter().map(|b| (b.label.as_str(), b.count)).collect();
        assert_eq!(labels, vec![("Positivo", 1), ("Negativo", 1), ("neutral", 1)]);
        assert_eq!(view.post_count, 4);
        assert_eq!(view.node_count(), 5);

        match &view.forecast {
            ForecastPanel::Ready(chart) => {
                assert_eq!(chart.title, "Sentiment forecast (8h)");
                assert_eq!(chart.history.len(), 2);
                assert_eq!(chart.predicted.len(), 10);
            }
            other => panic!("expected a chart, got {:?}", other),
        }
    }

    #[test]
    fn graph_elements_are_colored_by_dominant_sentiment() {
        let view = build_view(&snap(VARIED), &DashboardConfig::default(), &TrendForecaster::default(), now());
        let node = view.graph.iter().find_map(|e| match e {
            GraphElement::Node { data, style } if data.id == "producto" => Some((data.clone(), style.clone())),
            _ => None,
        });
        let (data, style) = node.expect("producto node");
        assert_eq!(data.sentiment.as_deref(), Some("positive"));
        assert_eq!(style.background_color, "#2ca02c");
        assert_eq!(style.width, 20);

        let edge_ids: Vec<&str> = view
            .graph
            .iter()
            .filter_map(|e| match e {
                GraphElement::Edge { data } => Some(data.id.as_str()),
                _ => None,
            })
            .collect();
        assert!(edge_ids.contains(&"e-mal-servicio"));
    }

    #[test]
    fn forecast_failures_become_placeholders() {
        let cfg = DashboardConfig::default();

        let view = build_view(&snap(VARIED), &cfg, &Exploding, now());
        assert_eq!(view.forecast.title(), "Forecast model failed: model diverged");
        assert!(view.node_count() > 0);

        let far = DashboardConfig { forecast_horizon: usize::MAX, ..cfg.clone() };
        let view = build_view(&snap(VARIED), &far, &TrendForecaster::default(), now());
        assert!(matches!(&view.forecast, ForecastPanel::Unavailable { reason, .. } if reason == "model_error"));

        let flat = "timestamp,text,sentiment_label\n2025-01-01 10:00,hola amigos,positivo\n2025-01-01 11:00,otra vez,positivo\n";
        let view = build_view(&snap(flat), &cfg, &TrendForecaster::default(), now());
        assert_eq!(
            view.forecast,
            ForecastPanel::Unavailable {
                title: "Not enough variation in the data for a forecast".into(),
                reason: "insufficient_variation".into(),
            }
        );

        let no_dates = "text,sentiment_label\nhola amigos,positivo\n";
        let view = build_view(&snap(no_dates), &cfg, &TrendForecaster::default(), now());
        assert_eq!(view.forecast.title(), "Missing timestamp or sentiment column");
    }

    #[test]
    fn empty_snapshot_renders_no_data_placeholders() {
        let cfg = DashboardConfig { timezone: chrono_tz::America::Mexico_City, ..Default::default() };
        let view = build_view(&Snapshot::empty(), &cfg, &TrendForecaster::default(), now());

        assert!(!view.has_data);
        assert!(view.graph.is_empty() && view.sentiment.is_empty());
        assert_eq!(view.last_update, "No data (no CSV available)");
        assert_eq!(view.forecast.title(), "No data for forecast");
        assert!(view.generated_at.starts_with("2025-01-01T06:30:00"));
    }
}
