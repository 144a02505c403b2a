// src/viz_export.rs
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::{fs, path::Path};

use crate::out_models::{DashboardView, ForecastPanel};

pub const VIZ_FILES: &[&str] = &[
    "viz.graph.json",
    "viz.sentiment.json",
    "viz.table.json",
    "viz.forecast.json",
];

/* -------------------------------------------------------------------------- */
/* Entry point                                                                */
/* -------------------------------------------------------------------------- */

/// Write the dashboard bundle (Cytoscape graph, histogram, table, forecast,
/// index) into `out_dir`.
pub fn write_all_viz(out_dir: &Path, view: &DashboardView) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {:?}", out_dir))?;

    // 1) Word graph
    write_json(out_dir.join("viz.graph.json"), &json!({ "elements": view.graph }))?;

    // 2) Sentiment distribution
    write_json(
        out_dir.join("viz.sentiment.json"),
        &json!({ "title": "Sentiment distribution", "bars": view.sentiment }),
    )?;

    // 3) Post table
    write_json(out_dir.join("viz.table.json"), &view.table)?;

    // 4) Forecast chart or placeholder
    write_json(out_dir.join("viz.forecast.json"), &view.forecast)?;

    // 5) Index
    let forecast_status = match &view.forecast {
        ForecastPanel::Ready(_) => "ready",
        ForecastPanel::Unavailable { .. } => "unavailable",
    };
    let idx = json!({
        "version": 1,
        "has_data": view.has_data,
        "source": view.source,
        "fingerprint": view.fingerprint,
        "generated_at": view.generated_at,
        "last_update": view.last_update,
        "counts": {
            "posts": view.post_count,
            "nodes": view.node_count(),
            "edges": view.edge_count(),
        },
        "forecast": forecast_status,
        "files": VIZ_FILES,
    });
    write_json(out_dir.join("viz.index.json"), &idx)?;

    Ok(())
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_vec_pretty(value)?).with_context(|| format!("write {:?}", path))
}
