use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use crate::engine::types::*;
use crate::storage::records::{GroupRecord, prepare_group, prepare_task};
use crate::storage::{Result, StateStore, StoreError};

/// File-based JSON state store.
///
/// Each task is stored as `tasks/<id>.json` and each group header as
/// `jobs/<id>.json` under the base directory. Deletion is soft: the record
/// keeps its file and gains a `DeletedAt` stamp.
pub struct JsonStateStore {
    base_dir: PathBuf,
    lock: RwLock<()>,
}

impl JsonStateStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    fn record_path(&self, resource: &'static str, id: &str) -> Result<PathBuf> {
        // Ids become file names; anything that could escape the directory is unknown.
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StoreError::not_found(resource, id));
        }
        let dir = match resource {
            "task" => "tasks",
            _ => "jobs",
        };
        Ok(self.base_dir.join(dir).join(format!("{}.json", id)))
    }

    async fn read_record<T: DeserializeOwned>(&self, resource: &'static str, id: &str) -> Result<T> {
        let path = self.record_path(resource, id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(resource, id));
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_str(&data).map_err(|source| StoreError::Decode {
            resource,
            id: id.to_string(),
            source,
        })
    }

    async fn write_record<T: Serialize>(&self, resource: &'static str, id: &str, record: &T) -> Result<()> {
        let path = self.record_path(resource, id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let tmp_path = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::io(&path, std::io::Error::other(e)))?;
        tokio::fs::write(&tmp_path, &data)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(resource, id, "Wrote record");
        Ok(())
    }

    async fn read_live_task(&self, task_id: &str) -> Result<Task> {
        let task: Task = self.read_record("task", task_id).await?;
        if task.deleted_at.is_some() {
            return Err(StoreError::not_found("task", task_id));
        }
        Ok(task)
    }

    async fn read_live_group(&self, group_id: &str) -> Result<GroupRecord> {
        let record: GroupRecord = self.read_record("job", group_id).await?;
        if record.deleted_at.is_some() {
            return Err(StoreError::not_found("job", group_id));
        }
        Ok(record)
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn get_task(&self, task_id: &str) -> Result<Task> {
        let _lock = self.lock.read().await;
        self.read_live_task(task_id).await
    }

    async fn update_task(&self, task_id: &str, update: &UpdateTask) -> Result<Task> {
        let _lock = self.lock.write().await;
        let mut task = self.read_live_task(task_id).await?;
        task.apply(update);
        self.write_record("task", task_id, &task).await?;
        Ok(task)
    }

    async fn get_group(&self, group_id: &str) -> Result<Group> {
        let _lock = self.lock.read().await;
        let record = self.read_live_group(group_id).await?;

        let mut tasks = Vec::with_capacity(record.task_ids.len());
        for task_id in &record.task_ids {
            match self.read_live_task(task_id).await {
                Ok(task) => tasks.push(task),
                // A member that is missing or deleted is simply not visible yet.
                Err(StoreError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(record.assemble(tasks))
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        let _lock = self.lock.write().await;
        let mut task = self.read_live_task(task_id).await?;
        task.deleted_at = Some(Utc::now());
        self.write_record("task", task_id, &task).await
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        let _lock = self.lock.write().await;
        let mut record = self.read_live_group(group_id).await?;
        record.deleted_at = Some(Utc::now());
        self.write_record("job", group_id, &record).await
    }

    async fn provision_task(&self, task: &Task) -> Result<Task> {
        let _lock = self.lock.write().await;
        let task = prepare_task(task, Utc::now());
        self.write_record("task", &task.id, &task).await?;
        Ok(task)
    }

    async fn provision_group(&self, group: &Group) -> Result<Group> {
        let _lock = self.lock.write().await;
        let (record, tasks) = prepare_group(group);
        for task in &tasks {
            self.write_record("task", &task.id, task).await?;
        }
        self.write_record("job", &record.id, &record).await?;
        Ok(record.assemble(tasks))
    }
}
