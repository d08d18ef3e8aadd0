use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{CompletionRequest, CompletionService};

/// Response cache wrapping any completion service. The key hashes the full
/// request, so the same prompt at a different temperature is a miss.
pub struct CachedCompletion<S> {
    inner: S,
    responses: DashMap<String, String>,
    max_entries: usize,
}

impl<S: CompletionService> CachedCompletion<S> {
    pub fn new(inner: S, max_entries: usize) -> Self {
        Self {
            inner,
            responses: DashMap::new(),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    fn cache_key(request: &CompletionRequest) -> String {
        let serialized = serde_json::to_string(request).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl<S: CompletionService> CompletionService for CachedCompletion<S> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let key = Self::cache_key(request);

        if let Some(hit) = self.responses.get(&key) {
            debug!("completion served from cache");
            return Ok(hit.value().clone());
        }

        let response = self.inner.complete(request).await?;

        if self.responses.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .responses
                .iter()
                .take(self.max_entries / 4)
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.responses.remove(&key);
            }
        }

        self.responses.insert(key, response.clone());
        Ok(response)
    }
}
