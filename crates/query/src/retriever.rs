use anyhow::Result;
use graph::{EdgeRecord, EntityRecord, GraphStore};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetrieverOptions {
    pub max_seeds: usize,
    pub max_hops: usize,
    pub max_neighbor_edges: usize,
    pub max_mentions: usize,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            max_seeds: 8,
            max_hops: 2,
            max_neighbor_edges: 50,
            max_mentions: 10,
        }
    }
}

/// A short textual rendering of one node, edge or chunk summary. Ordering is
/// traversal order, best-effort only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFragment {
    pub text: String,
}

impl ContextFragment {
    fn new(text: String) -> Self {
        Self { text }
    }
}

/// Graph-aware retrieval: seed entities by keyword match, then expand
/// outward a bounded number of hops, collecting the nodes and edges
/// traversed plus the summaries of chunks that mention them. Each call is a
/// fresh traversal; no state is kept between questions.
pub struct MultiHopRetriever {
    store: Arc<dyn GraphStore>,
    options: RetrieverOptions,
    token_pattern: Regex,
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "that", "this", "with", "from", "what", "which", "how", "should",
    "when", "does", "can", "will", "you", "your", "into", "about", "according", "involved",
];

impl MultiHopRetriever {
    pub fn new(store: Arc<dyn GraphStore>, options: RetrieverOptions) -> Self {
        Self {
            store,
            options,
            token_pattern: Regex::new(r"[a-z0-9][a-z0-9_.\-]+").unwrap(),
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<ContextFragment>> {
        let terms = self.query_terms(question);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        debug!(?terms, "retrieving graph context");

        let seeds = self
            .store
            .search_entities(&terms, self.options.max_seeds)
            .await?;

        let mut fragments = Vec::new();
        let mut seen_names: BTreeSet<String> = BTreeSet::new();
        let mut seen_edges: BTreeSet<EdgeRecord> = BTreeSet::new();

        for seed in &seeds {
            seen_names.insert(seed.key.name.clone());
            fragments.push(render_entity(seed));
        }

        let mut frontier: Vec<String> = seeds.iter().map(|s| s.key.name.clone()).collect();

        for _hop in 0..self.options.max_hops {
            if frontier.is_empty() {
                break;
            }

            let edges = self
                .store
                .neighbors(&frontier, self.options.max_neighbor_edges)
                .await?;

            let mut discovered = Vec::new();
            for edge in edges {
                if !seen_edges.insert(edge.clone()) {
                    continue;
                }
                fragments.push(render_edge(&edge));
                for name in [&edge.from, &edge.to] {
                    if seen_names.insert(name.clone()) {
                        discovered.push(name.clone());
                    }
                }
            }

            if !discovered.is_empty() {
                for record in self.store.get_entities(&discovered).await? {
                    fragments.push(render_entity(&record));
                }
            }

            frontier = discovered;
        }

        let collected: Vec<String> = seen_names.into_iter().collect();
        for mention in self
            .store
            .chunk_mentions(&collected, self.options.max_mentions)
            .await?
        {
            if !mention.summary.is_empty() {
                fragments.push(ContextFragment::new(format!(
                    "Document {}: {}",
                    mention.chunk_id, mention.summary
                )));
            }
        }

        debug!(fragments = fragments.len(), "retrieval complete");
        Ok(fragments)
    }

    fn query_terms(&self, question: &str) -> Vec<String> {
        let lowered = question.to_lowercase();
        let mut seen = BTreeSet::new();
        let mut terms = Vec::new();

        for token in self.token_pattern.find_iter(&lowered) {
            let term = token.as_str();
            if term.len() < 3 || STOPWORDS.contains(&term) {
                continue;
            }
            if seen.insert(term.to_string()) {
                terms.push(term.to_string());
            }
        }

        terms
    }
}

fn render_entity(record: &EntityRecord) -> ContextFragment {
    let text = if record.description.is_empty() {
        format!(
            "{} \"{}\"",
            record.key.entity_type.label(),
            record.key.name
        )
    } else {
        format!(
            "{} \"{}\": {}",
            record.key.entity_type.label(),
            record.key.name,
            record.description
        )
    };
    ContextFragment::new(text)
}

fn render_edge(edge: &EdgeRecord) -> ContextFragment {
    ContextFragment::new(format!("\"{}\" {} \"{}\"", edge.from, edge.rel, edge.to))
}
