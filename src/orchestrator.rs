use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyze::{classify_all, SentimentClassifier};
use crate::api_types::ApiPost;
use crate::config::{DashboardConfig, IngestConfig};
use crate::dashboard::{build_view, DashboardState};
use crate::fetch::{documents_for, fetch_page_feed};
use crate::forecast::Forecaster;
use crate::models::{PostRow, MISSING_CELL};
use crate::out_models::DashboardView;
use crate::render::render_dashboard_markdown;
use crate::store::{SnapshotSink, SnapshotSource};
use crate::viz_export::write_all_viz;

/// Join posts with their sentiment labels (keyed by post index).
pub fn assemble_rows(posts: &[ApiPost], labels: &HashMap<String, String>) -> Vec<PostRow> {
    posts
        .iter()
        .enumerate()
        .map(|(i, p)| PostRow {
            timestamp: Some(p.created_time.clone().unwrap_or_else(|| MISSING_CELL.to_string())),
            text: Some(
                p.message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| MISSING_CELL.to_string()),
            ),
            likes: Some(p.like_count()),
            sentiment_label: Some(
                labels
                    .get(&i.to_string())
                    .cloned()
                    .unwrap_or_else(|| MISSING_CELL.to_string()),
            ),
        })
        .collect()
}

/// Scores already-fetched posts and persists them. `None` when there was nothing to store.
pub async fn score_and_store(
    posts: &[ApiPost],
    cfg: &IngestConfig,
    classifier: &dyn SentimentClassifier,
    sink: &dyn SnapshotSink,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>> {
    if posts.is_empty() {
        info!("No posts found on the page");
        return Ok(None);
    }

    let docs = documents_for(posts, cfg.language.as_deref());
    debug!("Documents prepared - posts={}, with_message={}", posts.len(), docs.len());

    let labels = classify_all(classifier, &docs, cfg.batch_size).await?;
    let rows = assemble_rows(posts, &labels);

    let path = sink.save(&rows, now)?;
    info!("Posts stored - rows={}, path={}", rows.len(), path.display());
    Ok(Some(path))
}

/// One ingestion run: page feed -> sentiment -> snapshot.
pub async fn run_ingest(
    client: &Client,
    cfg: &IngestConfig,
    classifier: &dyn SentimentClassifier,
    sink: &dyn SnapshotSink,
) -> Result<Option<PathBuf>> {
    let start = std::time::Instant::now();
    info!("Ingestion started - page_id={}", cfg.page_id);

    let posts = fetch_page_feed(client, cfg).await?;
    let stored = score_and_store(&posts, cfg, classifier, sink, Utc::now()).await?;

    info!(
        "Ingestion completed - total_duration={:.2}s, posts={}, stored={}",
        start.elapsed().as_secs_f32(),
        posts.len(),
        stored.is_some()
    );
    Ok(stored)
}

/// One dashboard refresh: reload the newest snapshot, derive outputs, write them.
pub fn run_refresh(
    state: &mut DashboardState,
    source: &dyn SnapshotSource,
    cfg: &DashboardConfig,
    forecaster: &dyn Forecaster,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<DashboardView> {
    let start = std::time::Instant::now();
    let snapshot = state.refresh(source);
    let view = build_view(&snapshot, cfg, forecaster, now);

    write_all_viz(output_dir, &view)?;
    let md_path = output_dir.join("dashboard.md");
    std::fs::write(&md_path, render_dashboard_markdown(&view))
        .with_context(|| format!("write {:?}", md_path))?;

    info!(
        "Dashboard refreshed - duration={:.2}s, posts={}, nodes={}, edges={}, forecast={}, directory={}",
        start.elapsed().as_secs_f32(),
        view.post_count,
        view.node_count(),
        view.edge_count(),
        view.forecast.title(),
        output_dir.display()
    );
    Ok(view)
}
