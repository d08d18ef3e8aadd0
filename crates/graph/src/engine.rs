use anyhow::{Context, Result};
use extract::schema::{EntityType, ExtractionResult, RelationshipType};
use extract::SemanticExtractor;
use ingest::Chunk;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::store::{EntityKey, GraphStore};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Delete all prior graph content before the run, making the run
    /// idempotent relative to previous state rather than additive.
    pub clear_before_ingest: bool,
    /// Deployment knob, not a correctness bound: chunks past the cap are
    /// never ingested.
    pub max_chunks: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            clear_before_ingest: true,
            max_chunks: None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct IngestionReport {
    pub chunks_seen: usize,
    pub chunks_ingested: usize,
    /// Chunks whose extraction produced no entities. Not an error.
    pub chunks_skipped: usize,
    pub chunks_failed: Vec<ChunkFailure>,
    pub entities_merged: usize,
    pub relationships_merged: usize,
    /// Relationships dropped because an endpoint did not resolve to exactly
    /// one node.
    pub unresolved_endpoints: usize,
    pub coerced_entity_types: usize,
    pub coerced_relationship_types: usize,
}

#[derive(Debug, Serialize)]
pub struct ChunkFailure {
    pub chunk_id: String,
    pub error: String,
}

/// Merges extraction output into the graph store, one chunk at a time.
/// A failing chunk is recorded and the batch continues; only a failure to
/// reach the store at clearing time aborts the run.
pub struct IngestionEngine {
    extractor: SemanticExtractor,
    store: Arc<dyn GraphStore>,
    options: IngestOptions,
}

impl IngestionEngine {
    pub fn new(
        extractor: SemanticExtractor,
        store: Arc<dyn GraphStore>,
        options: IngestOptions,
    ) -> Self {
        Self {
            extractor,
            store,
            options,
        }
    }

    pub async fn ingest(&self, chunks: &[Chunk]) -> Result<IngestionReport> {
        let mut report = IngestionReport::default();

        if self.options.clear_before_ingest {
            self.store
                .clear()
                .await
                .context("Failed to clear graph store before ingestion")?;
            info!("cleared existing graph data");
        }

        let cap = self.options.max_chunks.unwrap_or(usize::MAX);

        for chunk in chunks.iter().take(cap) {
            report.chunks_seen += 1;

            let extraction = match self.extractor.extract(&chunk.text).await {
                Ok(extraction) => extraction,
                Err(e) => {
                    error!(chunk_id = %chunk.chunk_id, error = %format!("{e:#}"), "extraction failed");
                    report.chunks_failed.push(ChunkFailure {
                        chunk_id: chunk.chunk_id.clone(),
                        error: format!("{e:#}"),
                    });
                    continue;
                }
            };

            if extraction.entities.is_empty() {
                report.chunks_skipped += 1;
                continue;
            }

            match self.ingest_chunk(chunk, &extraction, &mut report).await {
                Ok(()) => report.chunks_ingested += 1,
                Err(e) => {
                    error!(chunk_id = %chunk.chunk_id, error = %format!("{e:#}"), "chunk ingestion failed");
                    report.chunks_failed.push(ChunkFailure {
                        chunk_id: chunk.chunk_id.clone(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        info!(
            ingested = report.chunks_ingested,
            skipped = report.chunks_skipped,
            failed = report.chunks_failed.len(),
            "ingestion complete"
        );
        Ok(report)
    }

    async fn ingest_chunk(
        &self,
        chunk: &Chunk,
        extraction: &ExtractionResult,
        report: &mut IngestionReport,
    ) -> Result<()> {
        self.store
            .merge_chunk(&chunk.chunk_id, &extraction.chunk_summary)
            .await?;

        // Entities extracted from this chunk, by name. Relationship endpoints
        // resolve here first, so a chunk's own entities always win.
        let mut local: BTreeMap<&str, Vec<EntityKey>> = BTreeMap::new();

        for entity in &extraction.entities {
            let entity_type = match EntityType::parse(&entity.entity_type) {
                Some(t) => t,
                None => {
                    warn!(raw = %entity.entity_type, name = %entity.name, "unknown entity type, coercing to Unclassified");
                    report.coerced_entity_types += 1;
                    EntityType::Unclassified
                }
            };

            let key = EntityKey::new(entity_type, entity.name.clone());
            self.store.merge_entity(&key, &entity.description).await?;
            self.store.link_chunk(&chunk.chunk_id, &key).await?;
            report.entities_merged += 1;

            local.entry(entity.name.as_str()).or_default().push(key);
        }

        for rel in &extraction.relationships {
            let from = self.resolve_endpoint(&local, &rel.from).await?;
            let to = self.resolve_endpoint(&local, &rel.to).await?;

            let (Some(from), Some(to)) = (from, to) else {
                warn!(from = %rel.from, to = %rel.to, "relationship endpoint did not resolve to exactly one node");
                report.unresolved_endpoints += 1;
                continue;
            };

            let rel_type = match RelationshipType::parse(&rel.rel_type) {
                Some(t) => t,
                None => {
                    warn!(raw = %rel.rel_type, "unknown relationship type, coercing to RELATED_TO");
                    report.coerced_relationship_types += 1;
                    RelationshipType::RelatedTo
                }
            };

            self.store.merge_relationship(&from, &to, rel_type).await?;
            report.relationships_merged += 1;
        }

        Ok(())
    }

    /// Resolve a relationship endpoint name to exactly one entity, first
    /// against the current chunk's extractions, then against the store.
    /// Ambiguous or missing names resolve to `None`.
    async fn resolve_endpoint(
        &self,
        local: &BTreeMap<&str, Vec<EntityKey>>,
        name: &str,
    ) -> Result<Option<EntityKey>> {
        if let Some(keys) = local.get(name) {
            return Ok(if keys.len() == 1 {
                Some(keys[0].clone())
            } else {
                None
            });
        }

        let matches = self.store.find_by_name(name).await?;
        Ok(if matches.len() == 1 {
            Some(matches[0].clone())
        } else {
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use extract::ExtractorOptions;
    use llm::{CompletionRequest, CompletionService};

    /// Replies with the canned extraction whose marker appears in the
    /// prompt; chunks without a matching script extract nothing.
    struct ScriptedService {
        scripts: Vec<(&'static str, &'static str)>,
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            let prompt = &request.messages[0].content;
            for (marker, reply) in &self.scripts {
                if prompt.contains(marker) {
                    return Ok(reply.to_string());
                }
            }
            Ok("{}".to_string())
        }
    }

    const CHUNK_A_REPLY: &str = r#"{
        "entities": [
            {"type": "Concept", "name": "Memory Management", "description": "memory handling for HANA VMs"},
            {"type": "Component", "name": "vSphere", "description": "virtualization platform"}
        ],
        "relationships": [
            {"from": "Memory Management", "to": "vSphere", "type": "INVOLVES_COMPONENT"}
        ],
        "chunk_summary": "memory management on vSphere"
    }"#;

    const CHUNK_B_REPLY: &str = r#"{
        "entities": [
            {"type": "Parameter", "name": "numa.nodeAffinity", "description": "controls NUMA node assignment"},
            {"type": "Component", "name": "vSphere", "description": "virtualization platform"}
        ],
        "relationships": [
            {"from": "numa.nodeAffinity", "to": "vSphere", "type": "AFFECTS"}
        ],
        "chunk_summary": "NUMA affinity tuning"
    }"#;

    fn chunk(doc: &str, text: &str, index: usize) -> Chunk {
        Chunk::new(doc.to_string(), text.to_string(), "test.md".to_string(), index)
    }

    fn engine_with(
        scripts: Vec<(&'static str, &'static str)>,
        store: Arc<dyn GraphStore>,
        options: IngestOptions,
    ) -> IngestionEngine {
        let extractor = SemanticExtractor::new(
            Arc::new(ScriptedService { scripts }),
            ExtractorOptions::default(),
        );
        IngestionEngine::new(extractor, store, options)
    }

    fn scenario_scripts() -> Vec<(&'static str, &'static str)> {
        vec![("chunk alpha", CHUNK_A_REPLY), ("chunk beta", CHUNK_B_REPLY)]
    }

    #[tokio::test]
    async fn two_chunk_scenario_produces_expected_graph() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            scenario_scripts(),
            store.clone(),
            IngestOptions::default(),
        );

        let chunks = [chunk("doc", "chunk alpha", 0), chunk("doc", "chunk beta", 1)];
        let report = engine.ingest(&chunks).await.unwrap();

        assert_eq!(report.chunks_ingested, 2);
        assert!(report.chunks_failed.is_empty());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.parameters, 1);
        assert_eq!(stats.components, 1);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunk_links, 4);
        assert_eq!(stats.relationships, 2);

        let edges = store
            .neighbors(&["vSphere".to_string()], 10)
            .await
            .unwrap();
        let rels: Vec<&str> = edges.iter().map(|e| e.rel.as_str()).collect();
        assert!(rels.contains(&"INVOLVES_COMPONENT"));
        assert!(rels.contains(&"AFFECTS"));
    }

    #[tokio::test]
    async fn reingesting_the_same_chunk_does_not_inflate_counts() {
        let store = Arc::new(MemoryStore::new());
        let options = IngestOptions {
            clear_before_ingest: false,
            ..Default::default()
        };
        let engine = engine_with(scenario_scripts(), store.clone(), options);

        let chunks = [chunk("doc", "chunk alpha", 0)];
        engine.ingest(&chunks).await.unwrap();
        engine.ingest(&chunks).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.components, 1);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.chunk_links, 2);
        assert_eq!(stats.relationships, 1);
    }

    #[tokio::test]
    async fn entity_mentioned_by_two_chunks_merges_to_one_node() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            scenario_scripts(),
            store.clone(),
            IngestOptions::default(),
        );

        let chunks = [chunk("doc", "chunk alpha", 0), chunk("doc", "chunk beta", 1)];
        engine.ingest(&chunks).await.unwrap();

        // vSphere appears in both chunks but exists once, linked from both
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.components, 1);

        let mentions = store
            .chunk_mentions(&["vSphere".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(mentions.len(), 2);
    }

    #[tokio::test]
    async fn clearing_discards_the_previous_run() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            scenario_scripts(),
            store.clone(),
            IngestOptions::default(),
        );

        let both = [chunk("doc", "chunk alpha", 0), chunk("doc", "chunk beta", 1)];
        engine.ingest(&both).await.unwrap();

        let only_alpha = [chunk("doc", "chunk alpha", 0)];
        engine.ingest(&only_alpha).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.parameters, 0);
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.components, 1);
    }

    #[tokio::test]
    async fn chunk_without_entities_is_skipped_not_failed() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(vec![], store.clone(), IngestOptions::default());

        let report = engine
            .ingest(&[chunk("doc", "nothing of note", 0)])
            .await
            .unwrap();

        assert_eq!(report.chunks_skipped, 1);
        assert_eq!(report.chunks_ingested, 0);
        assert!(report.chunks_failed.is_empty());
        assert_eq!(store.stats().await.unwrap().documents, 0);
    }

    #[tokio::test]
    async fn unknown_entity_type_is_coerced_to_unclassified() {
        const WIDGET_REPLY: &str = r#"{
            "entities": [{"type": "Widget", "name": "Mystery Box", "description": ""}],
            "relationships": [],
            "chunk_summary": "s"
        }"#;

        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            vec![("widget chunk", WIDGET_REPLY)],
            store.clone(),
            IngestOptions::default(),
        );

        let report = engine.ingest(&[chunk("doc", "widget chunk", 0)]).await.unwrap();

        assert_eq!(report.coerced_entity_types, 1);
        assert_eq!(store.stats().await.unwrap().unclassified, 1);
    }

    #[tokio::test]
    async fn unknown_relationship_type_is_coerced_to_related_to() {
        const DEPENDS_REPLY: &str = r#"{
            "entities": [
                {"type": "Component", "name": "SAP HANA", "description": ""},
                {"type": "Component", "name": "Guest OS", "description": ""}
            ],
            "relationships": [{"from": "SAP HANA", "to": "Guest OS", "type": "DEPENDS_ON"}],
            "chunk_summary": "s"
        }"#;

        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            vec![("depends chunk", DEPENDS_REPLY)],
            store.clone(),
            IngestOptions::default(),
        );

        let report = engine
            .ingest(&[chunk("doc", "depends chunk", 0)])
            .await
            .unwrap();

        assert_eq!(report.coerced_relationship_types, 1);
        assert_eq!(report.relationships_merged, 1);

        let edges = store
            .neighbors(&["SAP HANA".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(edges[0].rel, "RELATED_TO");
    }

    #[tokio::test]
    async fn unresolvable_endpoint_drops_the_relationship() {
        const DANGLING_REPLY: &str = r#"{
            "entities": [{"type": "Concept", "name": "Storage Layout", "description": ""}],
            "relationships": [{"from": "Storage Layout", "to": "Nonexistent Thing", "type": "AFFECTS"}],
            "chunk_summary": "s"
        }"#;

        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            vec![("dangling chunk", DANGLING_REPLY)],
            store.clone(),
            IngestOptions::default(),
        );

        let report = engine
            .ingest(&[chunk("doc", "dangling chunk", 0)])
            .await
            .unwrap();

        assert_eq!(report.unresolved_endpoints, 1);
        assert_eq!(report.relationships_merged, 0);
        assert_eq!(store.stats().await.unwrap().relationships, 0);
    }

    #[tokio::test]
    async fn max_chunks_caps_the_run() {
        let store = Arc::new(MemoryStore::new());
        let options = IngestOptions {
            max_chunks: Some(1),
            ..Default::default()
        };
        let engine = engine_with(scenario_scripts(), store.clone(), options);

        let chunks = [chunk("doc", "chunk alpha", 0), chunk("doc", "chunk beta", 1)];
        let report = engine.ingest(&chunks).await.unwrap();

        assert_eq!(report.chunks_seen, 1);
        assert_eq!(store.stats().await.unwrap().documents, 1);
    }
}
