use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Append-only dedup ledger. One entry per line, read once at run start,
/// never pruned. Single-writer only.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    fn contains(&self, id: &str) -> bool;
    async fn add(&mut self, id: &str) -> Result<()>;
}

pub struct FileHistory {
    path: PathBuf,
    seen: HashSet<String>,
}

impl FileHistory {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let seen = match fs::read_to_string(&path).await {
            Ok(content) => content
                .lines()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("read ledger: {}", path.display()));
            }
        };
        Ok(Self { path, seen })
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[async_trait]
impl HistoryStore for FileHistory {
    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id.trim())
    }

    async fn add(&mut self, id: &str) -> Result<()> {
        let id = id.trim().to_string();
        if id.is_empty() || self.seen.contains(&id) {
            return Ok(());
        }

        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .with_context(|| format!("open ledger for append: {}", self.path.display()))?;
        file.write_all(format!("{id}\n").as_bytes()).await?;
        file.flush().await?;

        self.seen.insert(id);
        Ok(())
    }
}

/// In-memory substitute used by tests.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    seen: HashSet<String>,
}

impl MemoryHistory {
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id.trim())
    }

    async fn add(&mut self, id: &str) -> Result<()> {
        self.seen.insert(id.trim().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_history_starts_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::load(dir.path().join("ledger.txt")).await.unwrap();
        assert!(history.is_empty());
        assert!(!history.contains("123"));
    }

    #[tokio::test]
    async fn file_history_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.txt");

        let mut history = FileHistory::load(&path).await.unwrap();
        history.add("111").await.unwrap();
        history.add("222").await.unwrap();
        assert!(history.contains("111"));
        assert_eq!(history.len(), 2);

        let reloaded = FileHistory::load(&path).await.unwrap();
        assert!(reloaded.contains("111"));
        assert!(reloaded.contains("222"));
        assert!(!reloaded.contains("333"));
    }

    #[tokio::test]
    async fn file_history_skips_duplicates_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.txt");

        let mut history = FileHistory::load(&path).await.unwrap();
        history.add("abc").await.unwrap();
        history.add("abc").await.unwrap();
        history.add("  ").await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "abc\n");
    }

    #[tokio::test]
    async fn memory_history_tracks_ids() {
        let mut history = MemoryHistory::with_ids(["a", "b"]);
        assert!(history.contains("a"));
        assert!(!history.contains("c"));
        history.add("c").await.unwrap();
        assert!(history.contains("c"));
    }
}
