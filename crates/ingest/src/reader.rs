use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))
    }

    /// Read every file in `dir` whose extension is in `extensions`, sorted by
    /// path so the chunk sequence is deterministic.
    pub async fn read_directory(dir: &Path, extensions: &[&str]) -> Result<Vec<(String, String)>> {
        let mut paths: Vec<PathBuf> = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| extensions.contains(&ext))
                .unwrap_or(false);
            if matches {
                paths.push(path);
            }
        }

        paths.sort();

        let mut files = Vec::new();
        for path in paths {
            let content = Self::read_file(&path).await?;
            files.push((path.to_string_lossy().to_string(), content));
        }

        Ok(files)
    }
}
