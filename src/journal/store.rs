//! Trade stores behind the journal task

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

use crate::core::{Result, TradeRecord, TradeStore};

/// In-process store, used by tests and the stress driver.
#[derive(Default)]
pub struct MemoryTradeStore {
    records: Mutex<Vec<TradeRecord>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TradeRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn append(&self, record: &TradeRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Append-only JSON-lines file, one record per line.
pub struct JsonLinesStore {
    path: PathBuf,
    file: AsyncMutex<tokio::fs::File>,
}

impl JsonLinesStore {
    /// Open (creating if needed) the journal file for appending
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::info!(path = %path.display(), "trade journal opened");
        Ok(Self {
            path,
            file: AsyncMutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, e.g. for reconciliation
    pub async fn read_all(path: impl AsRef<Path>) -> Result<Vec<TradeRecord>> {
        let content = tokio::fs::read_to_string(path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl TradeStore for JsonLinesStore {
    async fn append(&self, record: &TradeRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
