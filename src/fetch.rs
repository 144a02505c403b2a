use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::{debug, error, info};
use url::Url;

use crate::api_types::*;
use crate::config::IngestConfig;

const GRAPH_BASE: &str = "https://graph.facebook.com";
const FEED_FIELDS: &str = "message,likes.summary(true),created_time";

pub fn feed_url(cfg: &IngestConfig) -> Result<Url> {
    let base = format!("{}/{}/{}/feed", GRAPH_BASE, cfg.graph_version, cfg.page_id);
    Url::parse_with_params(
        &base,
        &[("fields", FEED_FIELDS), ("access_token", cfg.access_token.as_str())],
    )
    .with_context(|| format!("building feed URL for page {}", cfg.page_id))
}

/// Fetch the page feed, following `paging.next` up to `cfg.max_pages` pages.
pub async fn fetch_page_feed(client: &Client, cfg: &IngestConfig) -> Result<Vec<ApiPost>> {
    let start = std::time::Instant::now();
    let mut next = Some(feed_url(cfg)?);
    let mut posts = Vec::new();
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if pages >= cfg.max_pages {
            debug!("Feed page limit reached - pages={}", pages);
            break;
        }
        debug!("Fetching feed page - page_id={}, page={}", cfg.page_id, pages + 1);

        let resp = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for page {} feed", cfg.page_id))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(env) => error!("Graph API error - status={}, error={}", status, env.error),
                Err(_) => error!("Graph API error - status={}", status),
            }
            bail!("Graph API returned {} for page {}", status, cfg.page_id);
        }

        let page: ApiFeedPage = resp
            .json()
            .await
            .with_context(|| format!("Decoding feed JSON for page {}", cfg.page_id))?;
        pages += 1;
        posts.extend(page.data);

        next = page
            .paging
            .and_then(|p| p.next)
            .and_then(|n| Url::parse(&n).ok());
    }

    info!(
        "Feed fetch completed - page_id={}, duration={:.2}s, pages={}, posts={}",
        cfg.page_id,
        start.elapsed().as_secs_f32(),
        pages,
        posts.len()
    );
    Ok(posts)
}

/// Documents for sentiment scoring: posts with a non-empty message, id = post index.
pub fn documents_for(posts: &[ApiPost], language: Option<&str>) -> Vec<TextDocument> {
    posts
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let text = p.message.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            Some(TextDocument {
                id: i.to_string(),
                text: text.to_string(),
                language: language.map(|l| l.to_string()),
            })
        })
        .collect()
}
