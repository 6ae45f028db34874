use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::engine::types::*;
use crate::storage::records::{GroupRecord, prepare_group, prepare_task};
use crate::storage::{Result, StateStore, StoreError};

#[derive(Default)]
struct Records {
    tasks: HashMap<String, Task>,
    groups: HashMap<String, GroupRecord>,
}

impl Records {
    fn live_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id).filter(|t| t.deleted_at.is_none())
    }
}

/// In-memory state store.
/// Holds records only for the lifetime of the store instance.
pub struct MemoryStateStore {
    records: RwLock<Records>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records::default()),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_task(&self, task_id: &str) -> Result<Task> {
        let records = self.records.read().await;
        records
            .live_task(task_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", task_id))
    }

    async fn update_task(&self, task_id: &str, update: &UpdateTask) -> Result<Task> {
        let mut records = self.records.write().await;
        let task = records
            .tasks
            .get_mut(task_id)
            .filter(|t| t.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("task", task_id))?;
        task.apply(update);
        Ok(task.clone())
    }

    async fn get_group(&self, group_id: &str) -> Result<Group> {
        let records = self.records.read().await;
        let record = records
            .groups
            .get(group_id)
            .filter(|g| g.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("job", group_id))?;

        let tasks = record
            .task_ids
            .iter()
            .filter_map(|id| records.live_task(id).cloned())
            .collect();

        Ok(record.assemble(tasks))
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        match records
            .tasks
            .get_mut(task_id)
            .filter(|t| t.deleted_at.is_none())
        {
            Some(task) => {
                task.deleted_at = Some(Utc::now());
                Ok(())
            }
            None => Err(StoreError::not_found("task", task_id)),
        }
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        match records
            .groups
            .get_mut(group_id)
            .filter(|g| g.deleted_at.is_none())
        {
            Some(group) => {
                group.deleted_at = Some(Utc::now());
                Ok(())
            }
            None => Err(StoreError::not_found("job", group_id)),
        }
    }

    async fn provision_task(&self, task: &Task) -> Result<Task> {
        let task = prepare_task(task, Utc::now());
        self.records
            .write()
            .await
            .tasks
            .insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn provision_group(&self, group: &Group) -> Result<Group> {
        let (record, tasks) = prepare_group(group);
        let mut records = self.records.write().await;
        for task in &tasks {
            records.tasks.insert(task.id.clone(), task.clone());
        }
        let assembled = record.assemble(tasks);
        records.groups.insert(record.id.clone(), record);
        Ok(assembled)
    }
}
