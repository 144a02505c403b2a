use chrono::NaiveDateTime;
use serde::Serialize;

/* Word graph, Cytoscape element layout */

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphElement {
    Node { data: NodeData, style: NodeStyle },
    Edge { data: EdgeData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub id: String,
    pub label: String,
    pub freq: u32,
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStyle {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "background-color")]
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub weight: u32,
}

/* Sentiment distribution */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentBar {
    pub label: String,
    pub count: u32,
    pub color: String,
}

/* Post table */

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/* Forecast chart */

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: NaiveDateTime,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub history: Vec<ChartPoint>,
    pub predicted: Vec<ChartPoint>,
    pub upper: Vec<ChartPoint>,
    pub lower: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastPanel {
    Ready(ForecastChart),
    Unavailable { title: String, reason: String },
}

impl ForecastPanel {
    pub fn title(&self) -> &str {
        match self {
            ForecastPanel::Ready(c) => &c.title,
            ForecastPanel::Unavailable { title, .. } => title,
        }
    }
}

/* Whole dashboard */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub has_data: bool,
    pub source: Option<String>,
    pub fingerprint: Option<String>,
    pub generated_at: String,
    pub last_update: String,
    pub post_count: usize,
    pub graph: Vec<GraphElement>,
    pub sentiment: Vec<SentimentBar>,
    pub table: TableView,
    pub forecast: ForecastPanel,
}

impl DashboardView {
    pub fn node_count(&self) -> usize {
        self.graph.iter().filter(|e| matches!(e, GraphElement::Node { .. })).count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.iter().filter(|e| matches!(e, GraphElement::Edge { .. })).count()
    }
}
