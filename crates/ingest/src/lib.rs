pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::FileReader;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from a file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Load every matching file under `dir` and split it into ordered chunks.
pub async fn load_corpus(dir: &Path, extensions: &[&str]) -> Result<Vec<Chunk>> {
    let files = FileReader::read_directory(dir, extensions).await?;
    let chunker = Chunker::new(ChunkerConfig::default());

    let mut all_chunks = Vec::new();

    for (path, content) in files {
        let doc_id = generate_doc_id(&path);
        all_chunks.extend(chunker.chunk_text(&doc_id, &content, &path));
    }

    info!(chunks = all_chunks.len(), dir = %dir.display(), "loaded document corpus");
    Ok(all_chunks)
}
