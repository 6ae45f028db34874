use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque key/value parameter records attached to a task.
pub type TaskArguments = Vec<serde_json::Map<String, serde_json::Value>>;

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lifecycle state of a single task.
///
/// `Pending → Received → Started → {Success, Failure, Retry}`. The backend
/// mirrors whatever state the caller asserts and never rejects a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Received,
    Started,
    Success,
    Failure,
    Retry,
}

impl TaskStatus {
    /// `Success` and `Failure` count toward group completion. `Retry` does not.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Received => write!(f, "RECEIVED"),
            TaskStatus::Started => write!(f, "STARTED"),
            TaskStatus::Success => write!(f, "SUCCESS"),
            TaskStatus::Failure => write!(f, "FAILURE"),
            TaskStatus::Retry => write!(f, "RETRY"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "RECEIVED" => Ok(TaskStatus::Received),
            "STARTED" => Ok(TaskStatus::Started),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILURE" => Ok(TaskStatus::Failure),
            "RETRY" => Ok(TaskStatus::Retry),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// A single typed result value produced by a successful task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Value")]
    pub value: serde_json::Value,
}

impl TaskResult {
    pub fn new(kind: &str, value: serde_json::Value) -> Self {
        Self {
            kind: kind.to_string(),
            value,
        }
    }
}

/// One unit of work as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "UUID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Status", default)]
    pub status: TaskStatus,
    #[serde(rename = "Args", default, deserialize_with = "null_as_default")]
    pub arguments: TaskArguments,
    #[serde(rename = "Result", default, deserialize_with = "null_as_default")]
    pub results: Vec<TaskResult>,
    #[serde(rename = "Error", default, deserialize_with = "null_as_default")]
    pub error: String,
    /// Owning group; `None` for a standalone task.
    #[serde(rename = "JobUUID", default)]
    pub group_id: Option<String>,
    /// Position within the owning group's declared execution order.
    #[serde(rename = "ExecutionOrder", default)]
    pub sequence_index: i64,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: &str, name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: TaskStatus::Pending,
            arguments: Vec::new(),
            results: Vec::new(),
            error: String::new(),
            group_id: None,
            sequence_index: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Apply a partial update: fields absent from `update` stay untouched.
    pub fn apply(&mut self, update: &UpdateTask) {
        self.status = update.status;
        if let Some(ref results) = update.results {
            self.results = results.clone();
        }
        if let Some(ref error) = update.error {
            self.error = error.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Execution semantics of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupKind {
    #[default]
    Group,
    Chain,
    Chord,
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKind::Group => write!(f, "GROUP"),
            GroupKind::Chain => write!(f, "CHAIN"),
            GroupKind::Chord => write!(f, "CHORD"),
        }
    }
}

/// A named collection of tasks sharing a lifecycle ("job" on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "UUID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Status", default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(rename = "Tasks", default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
    #[serde(rename = "Type", default)]
    pub kind: GroupKind,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn new(id: &str, name: &str, kind: GroupKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: String::new(),
            tasks: Vec::new(),
            kind,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Partial task update sent with `PUT /tasks/{id}`.
///
/// Terminal updates carry both payload fields so the branch that does not
/// apply is cleared: `Success` sends an empty error and `Failure` sends an
/// empty result list. Non-terminal updates carry only the status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(rename = "Status")]
    pub status: TaskStatus,
    #[serde(rename = "Result", default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TaskResult>>,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateTask {
    /// Build an update for `status`, keeping only the payload that state allows.
    pub fn new(status: TaskStatus, results: Option<Vec<TaskResult>>, error: Option<String>) -> Self {
        match status {
            TaskStatus::Success => Self {
                status,
                results: Some(results.unwrap_or_default()),
                error: Some(String::new()),
            },
            TaskStatus::Failure => Self {
                status,
                results: Some(Vec::new()),
                error: Some(error.unwrap_or_default()),
            },
            _ => Self {
                status,
                results: None,
                error: None,
            },
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self::new(status, None, None)
    }

    pub fn success(results: Vec<TaskResult>) -> Self {
        Self::new(TaskStatus::Success, Some(results), None)
    }

    pub fn failure(error: &str) -> Self {
        Self::new(TaskStatus::Failure, None, Some(error.to_string()))
    }
}

/// Normalized view of a task's state, identical in shape for every state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: String,
    pub state: TaskStatus,
    pub results: Vec<TaskResult>,
    pub error: String,
}

impl From<&Task> for TaskState {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            state: task.status,
            results: task.results.clone(),
            error: task.error.clone(),
        }
    }
}

impl From<Task> for TaskState {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id,
            state: task.status,
            results: task.results,
            error: task.error,
        }
    }
}
