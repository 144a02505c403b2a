use itertools::Itertools;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::models::{PostRow, SentimentLabel};
use crate::tokens::row_tokens;

#[derive(Debug, Clone, PartialEq)]
pub struct WordNode {
    pub token: String,
    pub frequency: u32,
    pub sentiment: Option<SentimentLabel>,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordGraph {
    pub nodes: Vec<WordNode>,
    pub edges: Vec<WordEdge>,
}

impl WordGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub fn node_size(frequency: u32) -> u32 {
    (8 + 7 * frequency).max(20)
}

struct TokenStats {
    frequency: u32,
    labels: Vec<SentimentLabel>,
}

/// Build the co-occurrence graph of the `top_n` most frequent tokens.
///
/// Vocabulary ties are broken by the order in which tokens first appear
/// across `rows`. Edges come out sorted by `(source, target)` with
/// `source < target`.
pub fn build_word_graph(rows: &[PostRow], top_n: usize) -> WordGraph {
    // tokenizing is independent per row; collect() keeps row order
    let per_row: Vec<(Vec<String>, Option<SentimentLabel>)> = rows
        .par_iter()
        .map(|r| {
            let toks = r.text.as_deref().map(row_tokens).unwrap_or_default();
            (toks, r.sentiment())
        })
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut stats: HashMap<String, TokenStats> = HashMap::new();

    for (toks, label) in &per_row {
        for t in toks {
            let entry = stats.entry(t.clone()).or_insert_with(|| {
                order.push(t.clone());
                TokenStats { frequency: 0, labels: Vec::new() }
            });
            entry.frequency += 1;
            if let Some(l) = label {
                entry.labels.push(*l);
            }
        }
    }

    if order.is_empty() || top_n == 0 {
        debug!("Word graph empty - rows={}, top_n={}", rows.len(), top_n);
        return WordGraph::default();
    }

    // stable sort: equal frequencies stay in first-seen order
    let mut ranked = order;
    ranked.sort_by_key(|t| std::cmp::Reverse(stats[t].frequency));
    ranked.truncate(top_n);

    let nodes: Vec<WordNode> = ranked
        .iter()
        .map(|t| {
            let s = &stats[t];
            WordNode {
                token: t.clone(),
                frequency: s.frequency,
                sentiment: dominant_label(&s.labels),
                size: node_size(s.frequency),
            }
        })
        .collect();

    let vocab: HashSet<&str> = ranked.iter().map(|s| s.as_str()).collect();
    let mut edge_counts: BTreeMap<(String, String), u32> = BTreeMap::new();
    for (toks, _) in &per_row {
        let mut present: Vec<&String> = toks.iter().filter(|t| vocab.contains(t.as_str())).collect();
        present.sort();
        for (a, b) in present.into_iter().tuple_combinations() {
            *edge_counts.entry((a.clone(), b.clone())).or_insert(0) += 1;
        }
    }

    let edges: Vec<WordEdge> = edge_counts
        .into_iter()
        .map(|((source, target), weight)| WordEdge { source, target, weight })
        .collect();

    debug!(
        "Word graph built - rows={}, distinct_tokens={}, nodes={}, edges={}",
        rows.len(), stats.len(), nodes.len(), edges.len()
    );

    WordGraph { nodes, edges }
}

/// Most frequent label; on a tie the one encountered first wins.
fn dominant_label(labels: &[SentimentLabel]) -> Option<SentimentLabel> {
    let mut counts: Vec<(SentimentLabel, u32)> = Vec::new();
    for l in labels {
        match counts.iter_mut().find(|(k, _)| k == l) {
            Some((_, c)) => *c += 1,
            None => counts.push((*l, 1)),
        }
    }
    // max_by_key returns the last maximum, so walk the counts manually
    let mut best: Option<(SentimentLabel, u32)> = None;
    for (l, c) in counts {
        if best.map_or(true, |(_, bc)| c > bc) {
            best = Some((l, c));
        }
    }
    best.map(|(l, _)| l)
}
