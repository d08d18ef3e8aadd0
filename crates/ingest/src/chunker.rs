use crate::chunk::{Chunk, estimate_tokens};

pub struct ChunkerConfig {
    pub target_tokens_max: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_tokens_max: 800,
        }
    }
}

/// Splits a document into chunks along markdown headings, packing paragraphs
/// until the token target is reached. Heading boundaries are never crossed so
/// a chunk stays on one topic.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut index = 0;

        for section in self.split_by_headings(text) {
            if estimate_tokens(&section) <= self.config.target_tokens_max {
                if !section.trim().is_empty() {
                    self.push_chunk(&mut chunks, doc_id, section, source, &mut index);
                }
                continue;
            }

            // Section too large: pack paragraphs up to the target
            let mut buffer = String::new();
            for para in section.split("\n\n").filter(|p| !p.trim().is_empty()) {
                if !buffer.is_empty()
                    && estimate_tokens(&buffer) + estimate_tokens(para)
                        > self.config.target_tokens_max
                {
                    self.push_chunk(&mut chunks, doc_id, buffer.clone(), source, &mut index);
                    buffer.clear();
                }
                buffer.push_str(para.trim());
                buffer.push_str("\n\n");
            }
            if !buffer.trim().is_empty() {
                self.push_chunk(&mut chunks, doc_id, buffer, source, &mut index);
            }
        }

        chunks
    }

    fn push_chunk(
        &self,
        chunks: &mut Vec<Chunk>,
        doc_id: &str,
        text: String,
        source: &str,
        index: &mut usize,
    ) {
        chunks.push(Chunk::new(
            doc_id.to_string(),
            text,
            source.to_string(),
            *index,
        ));
        *index += 1;
    }

    fn split_by_headings(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();

        for line in text.lines() {
            if line.trim_start().starts_with('#') && !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            current.push_str(line);
            current.push('\n');
        }

        if !current.is_empty() {
            sections.push(current);
        }

        if sections.is_empty() {
            sections.push(text.to_string());
        }

        sections
    }
}
