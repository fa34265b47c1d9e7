use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only JSON-lines journal.
///
/// One serialized record per line. `append` returns only after the bytes
/// are written and fsynced, so an acknowledged record survives a crash.
pub struct Journal {
    file: File,
    path: PathBuf,
}

impl Journal {
    /// Open the journal for appending, creating parent directories and the
    /// file itself as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating journal directory {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening journal {}", path.display()))?;
        Ok(Self { file, path })
    }

    /// Append one record line and fsync before returning.
    pub async fn append(&mut self, line: &str) -> Result<()> {
        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line.as_bytes());
        record.push(b'\n');
        self.file
            .write_all(&record)
            .await
            .with_context(|| format!("appending to journal {}", self.path.display()))?;
        self.file
            .sync_data()
            .await
            .with_context(|| format!("syncing journal {}", self.path.display()))?;
        Ok(())
    }
}

/// Read every non-empty line currently in the journal. A missing file is an
/// empty journal, not an error.
pub async fn replay(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("reading journal {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_journal_replays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lines = replay(dir.path().join("absent.jsonl")).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn appended_lines_replay_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let mut journal = Journal::open(&path).await.unwrap();
        journal.append("one").await.unwrap();
        journal.append("two").await.unwrap();
        drop(journal);

        assert_eq!(replay(&path).await.unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/journal.jsonl");

        let mut journal = Journal::open(&path).await.unwrap();
        journal.append("record").await.unwrap();

        assert_eq!(replay(&path).await.unwrap(), vec!["record"]);
    }

    #[tokio::test]
    async fn reopening_appends_after_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let mut journal = Journal::open(&path).await.unwrap();
        journal.append("first").await.unwrap();
        drop(journal);

        let mut journal = Journal::open(&path).await.unwrap();
        journal.append("second").await.unwrap();

        assert_eq!(replay(&path).await.unwrap(), vec!["first", "second"]);
    }
}
