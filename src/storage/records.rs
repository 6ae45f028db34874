use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::types::*;

/// Group header as kept by the local stores: members are referenced by id
/// and resolved against the task records on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GroupRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub kind: GroupKind,
    pub task_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl GroupRecord {
    pub fn assemble(&self, tasks: Vec<Task>) -> Group {
        Group {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status.clone(),
            tasks,
            kind: self.kind,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Stamp a task for first insertion, assigning an id when the caller left it blank.
pub(crate) fn prepare_task(task: &Task, now: DateTime<Utc>) -> Task {
    let mut task = task.clone();
    if task.id.is_empty() {
        task.id = Uuid::new_v4().to_string();
    }
    task.created_at = now;
    task.updated_at = now;
    task.deleted_at = None;
    task
}

/// Split a group into its header record and its member tasks, in declared order.
///
/// Each member gets the group back-reference and its position as
/// `sequence_index`. A repeated task id keeps its first position and the
/// last definition.
pub(crate) fn prepare_group(group: &Group) -> (GroupRecord, Vec<Task>) {
    let now = Utc::now();
    let group_id = if group.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        group.id.clone()
    };

    let mut task_ids: Vec<String> = Vec::with_capacity(group.tasks.len());
    let mut tasks: Vec<Task> = Vec::with_capacity(group.tasks.len());

    for task in &group.tasks {
        let mut task = prepare_task(task, now);
        task.group_id = Some(group_id.clone());

        match task_ids.iter().position(|id| id == &task.id) {
            Some(index) => {
                task.sequence_index = index as i64;
                tasks[index] = task;
            }
            None => {
                task.sequence_index = task_ids.len() as i64;
                task_ids.push(task.id.clone());
                tasks.push(task);
            }
        }
    }

    let record = GroupRecord {
        id: group_id,
        name: group.name.clone(),
        status: group.status.clone(),
        kind: group.kind,
        task_ids,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    (record, tasks)
}
