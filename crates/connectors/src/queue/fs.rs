use crate::{error::StoreError, queue::JobQueue};
use async_trait::async_trait;
use std::{
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::info;

/// Breaks ties between messages enqueued within the same clock tick.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Queue backed by a directory: one file per message, names sort in enqueue order.
#[derive(Debug, Clone)]
pub struct FsJobQueue {
    dir: PathBuf,
    name: String,
}

impl FsJobQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self { dir, name }
    }

    /// Payloads currently waiting in the queue, oldest first.
    pub async fn pending(&self) -> Result<Vec<String>, StoreError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                names.push(path);
            }
        }
        names.sort();

        let mut payloads = Vec::with_capacity(names.len());
        for path in names {
            payloads.push(tokio::fs::read_to_string(path).await?);
        }
        Ok(payloads)
    }
}

#[async_trait]
impl JobQueue for FsJobQueue {
    async fn enqueue(&self, payload: &str) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let id = format!(
            "{}-{:08}-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.9f"),
            SEQUENCE.fetch_add(1, Ordering::Relaxed),
            uuid::Uuid::new_v4().simple()
        );
        let tmp = self.dir.join(format!("{id}.tmp"));
        tokio::fs::write(&tmp, payload.as_bytes()).await?;
        tokio::fs::rename(&tmp, self.dir.join(format!("{id}.json"))).await?;

        info!(queue = %self.name, message_id = %id, "Enqueued job");
        Ok(id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
