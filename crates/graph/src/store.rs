use anyhow::Result;
use async_trait::async_trait;
use extract::schema::{EntityType, RelationshipType};
use serde::Serialize;

/// Composite merge key: the graph holds at most one node per (type, name).
/// Relationship endpoints resolve against this key, never against a bare
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub name: String,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            entity_type,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub key: EntityKey,
    pub description: String,
}

/// A directed entity-to-entity edge as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EdgeRecord {
    pub from: String,
    pub rel: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct ChunkMention {
    pub chunk_id: String,
    pub summary: String,
}

#[derive(Debug, Default, Serialize)]
pub struct GraphStats {
    pub concepts: usize,
    pub parameters: usize,
    pub components: usize,
    pub recommendations: usize,
    pub unclassified: usize,
    pub documents: usize,
    pub chunk_links: usize,
    pub relationships: usize,
}

/// The persistent graph store, passed explicitly into every component that
/// reads or writes it. All write operations have merge semantics: repeating
/// them is a no-op.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Delete all nodes and edges. Irreversible; used for full rebuilds.
    async fn clear(&self) -> Result<()>;

    /// Merge a document chunk node keyed by chunk_id, attaching its summary.
    async fn merge_chunk(&self, chunk_id: &str, summary: &str) -> Result<()>;

    /// Merge an entity node by composite key, overwriting its description
    /// (last writer wins).
    async fn merge_entity(&self, key: &EntityKey, description: &str) -> Result<()>;

    /// Link a chunk to an entity it mentions, labeled `HAS_<TYPE>`.
    async fn link_chunk(&self, chunk_id: &str, entity: &EntityKey) -> Result<()>;

    /// Merge a directed entity-to-entity edge.
    async fn merge_relationship(
        &self,
        from: &EntityKey,
        to: &EntityKey,
        rel: RelationshipType,
    ) -> Result<()>;

    /// All entity nodes carrying exactly this name, any type.
    async fn find_by_name(&self, name: &str) -> Result<Vec<EntityKey>>;

    /// Full records for the named entities.
    async fn get_entities(&self, names: &[String]) -> Result<Vec<EntityRecord>>;

    /// Entities whose name or description contains any of the lowercased
    /// terms.
    async fn search_entities(&self, terms: &[String], limit: usize) -> Result<Vec<EntityRecord>>;

    /// Directed entity-to-entity edges touching any of the named nodes.
    async fn neighbors(&self, names: &[String], limit: usize) -> Result<Vec<EdgeRecord>>;

    /// Chunks linked to any of the named entities.
    async fn chunk_mentions(&self, names: &[String], limit: usize) -> Result<Vec<ChunkMention>>;

    async fn stats(&self) -> Result<GraphStats>;
}
