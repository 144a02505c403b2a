use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::api_types::{DocumentSentiment, SentimentRequest, SentimentResponse, TextDocument};
use crate::config::IngestConfig;

/// Sentiment scoring capability for one batch of documents.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, batch: &[TextDocument]) -> Result<Vec<DocumentSentiment>>;
}

/// Cloud text-analytics v3.0 sentiment endpoint.
pub struct TextAnalyticsClient {
    client: Client,
    url: String,
    key: String,
}

impl TextAnalyticsClient {
    pub fn new(client: Client, cfg: &IngestConfig) -> Self {
        Self {
            client,
            url: format!("{}/text/analytics/v3.0/sentiment", cfg.text_endpoint),
            key: cfg.text_key.clone(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for TextAnalyticsClient {
    async fn classify(&self, batch: &[TextDocument]) -> Result<Vec<DocumentSentiment>> {
        let start = std::time::Instant::now();
        debug!("Sentiment call starting - documents={}", batch.len());

        let resp = self
            .client
            .post(&self.url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&SentimentRequest { documents: batch })
            .send()
            .await
            .with_context(|| format!("Request failed for {}", self.url))?
            .error_for_status()
            .with_context(|| format!("HTTP error for {}", self.url))?;

        let body: SentimentResponse = resp
            .json()
            .await
            .with_context(|| format!("Decoding JSON for {}", self.url))?;

        for e in &body.errors {
            warn!("Document not scored - id={}, error={}", e.id, e.error);
        }
        info!(
            "Sentiment call completed - duration={:.2}s, scored={}, errors={}",
            start.elapsed().as_secs_f32(),
            body.documents.len(),
            body.errors.len()
        );
        Ok(body.documents)
    }
}

/// Score every document in `batch_size` chunks, all chunks in flight at once.
/// Returns document id -> sentiment label.
pub async fn classify_all(
    classifier: &dyn SentimentClassifier,
    docs: &[TextDocument],
    batch_size: usize,
) -> Result<HashMap<String, String>> {
    let chunks: Vec<&[TextDocument]> = docs.chunks(batch_size.max(1)).collect();
    info!(
        "Sentiment scoring starting - documents={}, batches={}, batch_size={}",
        docs.len(),
        chunks.len(),
        batch_size
    );

    let tasks = chunks.iter().map(|c| classifier.classify(c));
    let results = futures::future::join_all(tasks).await;

    let mut labels = HashMap::with_capacity(docs.len());
    for (i, result) in results.into_iter().enumerate() {
        let scored = result.map_err(|e| anyhow!("sentiment batch {} failed: {:#}", i + 1, e))?;
        for d in scored {
            labels.insert(d.id, d.sentiment);
        }
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct KeywordClassifier {
        batch_sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SentimentClassifier for KeywordClassifier {
        async fn classify(&self, batch: &[TextDocument]) -> Result<Vec<DocumentSentiment>> {
            self.batch_sizes.lock().unwrap().push(batch.len());
            Ok(batch
                .iter()
                .map(|d| DocumentSentiment {
                    id: d.id.clone(),
                    sentiment: if d.text.contains("bien") { "positive" } else { "negative" }.into(),
                })
                .collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl SentimentClassifier for Failing {
        async fn classify(&self, _batch: &[TextDocument]) -> Result<Vec<DocumentSentiment>> {
            Err(anyhow!("quota exceeded"))
        }
    }

    fn docs(n: usize) -> Vec<TextDocument> {
        (0..n)
            .map(|i| TextDocument {
                id: i.to_string(),
                text: if i % 2 == 0 { "muy bien".into() } else { "fatal".into() },
                language: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn splits_into_batches_and_merges_by_id() {
        let clf = KeywordClassifier { batch_sizes: Mutex::new(Vec::new()) };
        let labels = classify_all(&clf, &docs(23), 10).await.unwrap();

        let mut sizes = clf.batch_sizes.lock().unwrap().clone();
        sizes.sort();
        assert_eq!(sizes, vec![3, 10, 10]);
        assert_eq!(labels.len(), 23);
        assert_eq!(labels["0"], "positive");
        assert_eq!(labels["21"], "negative");
    }

    #[tokio::test]
    async fn batch_failure_fails_the_run() {
        let err = classify_all(&Failing, &docs(3), 10).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
