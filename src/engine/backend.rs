use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::types::*;
use crate::storage::{Result, StateStore};

/// What `init_group` does with the group it is handed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum GroupInitMode {
    /// The group and its tasks were provisioned beforehand; nothing to do.
    #[default]
    AssumeProvisioned,
}

/// What `trigger_chord` does once a group has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChordMode {
    /// Report the chord as triggered without any remote effect.
    #[default]
    Acknowledge,
}

/// What the purge operations do with stored records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PurgeMode {
    /// Leave retention to the store.
    #[default]
    Retain,
    /// Delete the record; an id the store does not know counts as purged.
    Delete,
}

/// Task/group state backend consumed by the task-execution runtime.
///
/// Holds no mutable state of its own: every operation is one independent
/// exchange with the underlying [`StateStore`], so clones can be shared
/// freely across workers.
#[derive(Clone)]
pub struct StateBackend {
    store: Arc<dyn StateStore>,
    group_init: GroupInitMode,
    chord: ChordMode,
    purge: PurgeMode,
}

impl StateBackend {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            group_init: GroupInitMode::default(),
            chord: ChordMode::default(),
            purge: PurgeMode::default(),
        }
    }

    pub fn with_group_init(mut self, mode: GroupInitMode) -> Self {
        self.group_init = mode;
        self
    }

    pub fn with_chord(mut self, mode: ChordMode) -> Self {
        self.chord = mode;
        self
    }

    pub fn with_purge(mut self, mode: PurgeMode) -> Self {
        self.purge = mode;
        self
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    // --- Task state ---

    /// Record `status` for a task.
    ///
    /// `results` is only sent with `Success` and `error` only with `Failure`;
    /// the other combinations are dropped. No transition check is made and
    /// the last writer wins.
    pub async fn set_state(
        &self,
        task_id: &str,
        status: TaskStatus,
        results: Option<Vec<TaskResult>>,
        error: Option<String>,
    ) -> Result<()> {
        self.apply(task_id, UpdateTask::new(status, results, error))
            .await
    }

    pub async fn set_state_pending(&self, task_id: &str) -> Result<()> {
        self.apply(task_id, UpdateTask::status(TaskStatus::Pending))
            .await
    }

    pub async fn set_state_received(&self, task_id: &str) -> Result<()> {
        self.apply(task_id, UpdateTask::status(TaskStatus::Received))
            .await
    }

    pub async fn set_state_started(&self, task_id: &str) -> Result<()> {
        self.apply(task_id, UpdateTask::status(TaskStatus::Started))
            .await
    }

    pub async fn set_state_retry(&self, task_id: &str) -> Result<()> {
        self.apply(task_id, UpdateTask::status(TaskStatus::Retry))
            .await
    }

    pub async fn set_state_success(&self, task_id: &str, results: Vec<TaskResult>) -> Result<()> {
        self.apply(task_id, UpdateTask::success(results)).await
    }

    pub async fn set_state_failure(&self, task_id: &str, error: &str) -> Result<()> {
        self.apply(task_id, UpdateTask::failure(error)).await
    }

    async fn apply(&self, task_id: &str, update: UpdateTask) -> Result<()> {
        debug!(task_id = %task_id, status = %update.status, "Setting task state");
        self.store.update_task(task_id, &update).await?;
        Ok(())
    }

    /// Current state of a task, as of this call.
    pub async fn get_state(&self, task_id: &str) -> Result<TaskState> {
        let task = self.store.get_task(task_id).await?;
        Ok(TaskState::from(task))
    }

    // --- Groups ---

    /// Assert that a group and its tasks exist. Always succeeds.
    pub async fn init_group(&self, group_id: &str, task_ids: &[String]) -> Result<()> {
        match self.group_init {
            GroupInitMode::AssumeProvisioned => {
                debug!(group_id = %group_id, tasks = task_ids.len(), "Group assumed provisioned");
                Ok(())
            }
        }
    }

    /// True when exactly `expected_task_count` distinct member tasks are in
    /// `Success` or `Failure`.
    ///
    /// Only the count is compared, not which tasks make it up; the caller is
    /// responsible for `expected_task_count` matching the group's size. A
    /// group whose members are not all visible yet reports incomplete.
    pub async fn is_group_complete(&self, group_id: &str, expected_task_count: usize) -> Result<bool> {
        let group = self.store.get_group(group_id).await?;

        let finished: HashSet<&str> = group
            .tasks
            .iter()
            .filter(|t| t.status.is_terminal())
            .map(|t| t.id.as_str())
            .collect();

        debug!(
            group_id = %group_id,
            finished = finished.len(),
            expected = expected_task_count,
            "Checked group completion"
        );

        Ok(finished.len() == expected_task_count)
    }

    /// Per-task states of a group, in the order the store reports them.
    ///
    /// `expected_task_count` is accepted for symmetry with
    /// [`is_group_complete`](Self::is_group_complete) and not used.
    pub async fn list_task_states(&self, group_id: &str, _expected_task_count: usize) -> Result<Vec<TaskState>> {
        let group = self.store.get_group(group_id).await?;
        Ok(group.tasks.into_iter().map(TaskState::from).collect())
    }

    /// Fire the group's chord callback. Calling it again for the same group
    /// has no further effect.
    pub async fn trigger_chord(&self, group_id: &str) -> Result<bool> {
        match self.chord {
            ChordMode::Acknowledge => {
                info!(group_id = %group_id, "Chord acknowledged");
                Ok(true)
            }
        }
    }

    // --- Purging ---

    /// Purge a task's stored state. Never fails for an unknown id.
    pub async fn purge_task_state(&self, task_id: &str) -> Result<()> {
        match self.purge {
            PurgeMode::Retain => Ok(()),
            PurgeMode::Delete => match self.store.delete_task(task_id).await {
                Err(e) if e.is_not_found() => {
                    debug!(task_id = %task_id, "Task already gone");
                    Ok(())
                }
                other => other,
            },
        }
    }

    /// Purge a group's stored metadata. Never fails for an unknown id.
    pub async fn purge_group_state(&self, group_id: &str) -> Result<()> {
        match self.purge {
            PurgeMode::Retain => Ok(()),
            PurgeMode::Delete => match self.store.delete_group(group_id).await {
                Err(e) if e.is_not_found() => {
                    debug!(group_id = %group_id, "Group already gone");
                    Ok(())
                }
                other => other,
            },
        }
    }
}
