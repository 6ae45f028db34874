use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::engine::types::*;
use crate::storage::{Result, StateStore, StoreError};

/// State store backed by a remote HTTP API.
///
/// Resources live at `{base_url}/tasks/{id}` and `{base_url}/jobs/{id}`.
/// Every call is a single request; anything other than `200 OK` is an error.
#[derive(Clone)]
pub struct ApiStateStore {
    client: reqwest::Client,
    base_url: String,
}

impl ApiStateStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Build a store whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and return the raw response body.
    ///
    /// `body` is only attached for methods other than GET and HEAD.
    pub async fn request<B>(&self, path: &str, method: Method, body: Option<&B>) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(body) = body
            && !is_read(&method)
        {
            let bytes = serde_json::to_vec(body).map_err(|source| StoreError::Encode {
                method: method.clone(),
                path: path.to_string(),
                source,
            })?;
            request = request.body(bytes);
        }

        debug!(method = %method, path = %path, "Sending store request");

        let response = request
            .send()
            .await
            .map_err(|source| StoreError::Connection {
                method: method.clone(),
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(method = %method, path = %path, status = status.as_u16(), "Store rejected request");
            return Err(StoreError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| StoreError::Connection {
                method,
                path: path.to_string(),
                source,
            })?;

        Ok(bytes.to_vec())
    }

    async fn fetch<T, B>(
        &self,
        resource: &'static str,
        id: &str,
        method: Method,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bytes = self.request(&resource_path(resource, id), method, body).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            resource,
            id: id.to_string(),
            source,
        })
    }
}

fn is_read(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn resource_path(resource: &str, id: &str) -> String {
    match resource {
        "task" => format!("/tasks/{}", id),
        _ => format!("/jobs/{}", id),
    }
}

#[async_trait]
impl StateStore for ApiStateStore {
    async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.fetch::<_, ()>("task", task_id, Method::GET, None).await
    }

    async fn update_task(&self, task_id: &str, update: &UpdateTask) -> Result<Task> {
        self.fetch("task", task_id, Method::PUT, Some(update)).await
    }

    async fn get_group(&self, group_id: &str) -> Result<Group> {
        self.fetch::<_, ()>("job", group_id, Method::GET, None).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.request::<()>(&resource_path("task", task_id), Method::DELETE, None)
            .await
            .map(|_| ())
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        self.request::<()>(&resource_path("job", group_id), Method::DELETE, None)
            .await
            .map(|_| ())
    }

    async fn provision_task(&self, task: &Task) -> Result<Task> {
        let bytes = self.request("/tasks", Method::POST, Some(task)).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            resource: "task",
            id: task.id.clone(),
            source,
        })
    }

    async fn provision_group(&self, group: &Group) -> Result<Group> {
        let bytes = self.request("/jobs", Method::POST, Some(group)).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            resource: "job",
            id: group.id.clone(),
            source,
        })
    }
}
