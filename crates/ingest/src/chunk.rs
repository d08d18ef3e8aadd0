use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One ordered unit of source text. Immutable once loaded; the chunk_id is
/// stable across runs because it is derived from the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    /// Position of this chunk within its document.
    pub index: usize,
}

impl Chunk {
    pub fn new(doc_id: String, text: String, source: String, index: usize) -> Self {
        let chunk_id = Self::generate_chunk_id(&doc_id, &text, index);

        Self {
            doc_id,
            chunk_id,
            text,
            source,
            index,
        }
    }

    fn generate_chunk_id(doc_id: &str, text: &str, index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(index.to_string().as_bytes());
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..16])
    }

    /// Rough token estimate (~1.3 tokens per word).
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }
}

pub(crate) fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f64 * 1.3) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable() {
        let a = Chunk::new("doc".into(), "some text".into(), "a.md".into(), 0);
        let b = Chunk::new("doc".into(), "some text".into(), "a.md".into(), 0);
        assert_eq!(a.chunk_id, b.chunk_id);
    }

    #[test]
    fn chunk_id_depends_on_position() {
        let a = Chunk::new("doc".into(), "some text".into(), "a.md".into(), 0);
        let b = Chunk::new("doc".into(), "some text".into(), "a.md".into(), 1);
        assert_ne!(a.chunk_id, b.chunk_id);
    }
}
