//! Remote state backend for distributed task execution.
//!
//! [`engine::StateBackend`] records task lifecycle state and answers group
//! completion queries against a [`storage::StateStore`]. The HTTP-backed
//! [`storage::api_store::ApiStateStore`] is the production store; the memory
//! and JSON stores back the reference server in [`api`].

pub mod api;
pub mod cli;
pub mod engine;
pub mod storage;
