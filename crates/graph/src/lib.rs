pub mod engine;
pub mod memory;
pub mod neo4j;
pub mod store;

pub use engine::{ChunkFailure, IngestOptions, IngestionEngine, IngestionReport};
pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;
pub use store::{
    ChunkMention, EdgeRecord, EntityKey, EntityRecord, GraphStats, GraphStore,
};
