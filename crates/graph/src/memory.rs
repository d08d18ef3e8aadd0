use anyhow::Result;
use async_trait::async_trait;
use extract::schema::{EntityType, RelationshipType};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::store::{
    ChunkMention, EdgeRecord, EntityKey, EntityRecord, GraphStats, GraphStore,
};

/// In-memory graph store with the same merge semantics as the Neo4j
/// implementation. Backs the test suite and the `--memory` CLI mode; BTree
/// containers keep read-backs deterministic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, String>,
    entities: BTreeMap<EntityKey, String>,
    chunk_links: BTreeSet<(String, EntityKey)>,
    relationships: BTreeSet<(EntityKey, RelationshipType, EntityKey)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        *state = State::default();
        Ok(())
    }

    async fn merge_chunk(&self, chunk_id: &str, summary: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .documents
            .insert(chunk_id.to_string(), summary.to_string());
        Ok(())
    }

    async fn merge_entity(&self, key: &EntityKey, description: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.entities.insert(key.clone(), description.to_string());
        Ok(())
    }

    async fn link_chunk(&self, chunk_id: &str, entity: &EntityKey) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .chunk_links
            .insert((chunk_id.to_string(), entity.clone()));
        Ok(())
    }

    async fn merge_relationship(
        &self,
        from: &EntityKey,
        to: &EntityKey,
        rel: RelationshipType,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .relationships
            .insert((from.clone(), rel, to.clone()));
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<EntityKey>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entities
            .keys()
            .filter(|k| k.name == name)
            .cloned()
            .collect())
    }

    async fn get_entities(&self, names: &[String]) -> Result<Vec<EntityRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entities
            .iter()
            .filter(|(k, _)| names.contains(&k.name))
            .map(|(k, d)| EntityRecord {
                key: k.clone(),
                description: d.clone(),
            })
            .collect())
    }

    async fn search_entities(&self, terms: &[String], limit: usize) -> Result<Vec<EntityRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entities
            .iter()
            .filter(|(k, d)| {
                let name = k.name.to_lowercase();
                let description = d.to_lowercase();
                terms
                    .iter()
                    .any(|t| name.contains(t.as_str()) || description.contains(t.as_str()))
            })
            .take(limit)
            .map(|(k, d)| EntityRecord {
                key: k.clone(),
                description: d.clone(),
            })
            .collect())
    }

    async fn neighbors(&self, names: &[String], limit: usize) -> Result<Vec<EdgeRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .relationships
            .iter()
            .filter(|(from, _, to)| names.contains(&from.name) || names.contains(&to.name))
            .take(limit)
            .map(|(from, rel, to)| EdgeRecord {
                from: from.name.clone(),
                rel: rel.label().to_string(),
                to: to.name.clone(),
            })
            .collect())
    }

    async fn chunk_mentions(&self, names: &[String], limit: usize) -> Result<Vec<ChunkMention>> {
        let state = self.state.lock().unwrap();
        let chunk_ids: BTreeSet<&String> = state
            .chunk_links
            .iter()
            .filter(|(_, entity)| names.contains(&entity.name))
            .map(|(chunk_id, _)| chunk_id)
            .collect();

        Ok(chunk_ids
            .into_iter()
            .take(limit)
            .map(|chunk_id| ChunkMention {
                chunk_id: chunk_id.clone(),
                summary: state.documents.get(chunk_id).cloned().unwrap_or_default(),
            })
            .collect())
    }

    async fn stats(&self) -> Result<GraphStats> {
        let state = self.state.lock().unwrap();
        let count_type = |t: EntityType| {
            state
                .entities
                .keys()
                .filter(|k| k.entity_type == t)
                .count()
        };

        Ok(GraphStats {
            concepts: count_type(EntityType::Concept),
            parameters: count_type(EntityType::Parameter),
            components: count_type(EntityType::Component),
            recommendations: count_type(EntityType::Recommendation),
            unclassified: count_type(EntityType::Unclassified),
            documents: state.documents.len(),
            chunk_links: state.chunk_links.len(),
            relationships: state.relationships.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merge_is_idempotent() {
        let store = MemoryStore::new();
        let key = EntityKey::new(EntityType::Concept, "NUMA Optimization");

        store.merge_entity(&key, "first").await.unwrap();
        store.merge_entity(&key, "second").await.unwrap();
        store
            .merge_relationship(
                &key,
                &EntityKey::new(EntityType::Component, "vSphere"),
                RelationshipType::InvolvesComponent,
            )
            .await
            .unwrap();
        store
            .merge_relationship(
                &key,
                &EntityKey::new(EntityType::Component, "vSphere"),
                RelationshipType::InvolvesComponent,
            )
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.relationships, 1);

        // Last writer wins on the description
        let records = store
            .get_entities(&["NUMA Optimization".to_string()])
            .await
            .unwrap();
        assert_eq!(records[0].description, "second");
    }

    #[tokio::test]
    async fn same_name_different_type_are_distinct_nodes() {
        let store = MemoryStore::new();
        store
            .merge_entity(&EntityKey::new(EntityType::Concept, "HANA"), "")
            .await
            .unwrap();
        store
            .merge_entity(&EntityKey::new(EntityType::Component, "HANA"), "")
            .await
            .unwrap();

        let matches = store.find_by_name("HANA").await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn search_matches_name_and_description() {
        let store = MemoryStore::new();
        store
            .merge_entity(
                &EntityKey::new(EntityType::Parameter, "numa.nodeAffinity"),
                "controls NUMA node assignment",
            )
            .await
            .unwrap();
        store
            .merge_entity(
                &EntityKey::new(EntityType::Concept, "Memory Management"),
                "memory allocation on NUMA systems",
            )
            .await
            .unwrap();

        let hits = store
            .search_entities(&["numa".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }
}
