pub mod api_store;
pub mod error;
pub mod json_store;
pub mod memory_store;
mod records;

use async_trait::async_trait;

use crate::engine::types::*;

pub use error::{Result, StoreError};

/// Trait for the authoritative task/group record store.
///
/// Every method is one independent exchange with the store. Implementations
/// hold no per-call state, so a single instance can serve concurrent callers.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch a task record.
    async fn get_task(&self, task_id: &str) -> Result<Task>;

    /// Partially update a task and return the record as stored afterwards.
    async fn update_task(&self, task_id: &str, update: &UpdateTask) -> Result<Task>;

    /// Fetch a group with its member task snapshots.
    async fn get_group(&self, group_id: &str) -> Result<Group>;

    /// Delete a task record.
    async fn delete_task(&self, task_id: &str) -> Result<()>;

    /// Delete a group record. Member tasks are left in place.
    async fn delete_group(&self, group_id: &str) -> Result<()>;

    /// Create a standalone task record.
    async fn provision_task(&self, task: &Task) -> Result<Task>;

    /// Create a group together with its member tasks.
    async fn provision_group(&self, group: &Group) -> Result<Group>;
}
