//! Tests for task/group types and their wire representation.

use taskstate::engine::types::*;

// --- TaskStatus ---

#[test]
fn task_status_display() {
    assert_eq!(TaskStatus::Pending.to_string(), "PENDING");
    assert_eq!(TaskStatus::Received.to_string(), "RECEIVED");
    assert_eq!(TaskStatus::Started.to_string(), "STARTED");
    assert_eq!(TaskStatus::Success.to_string(), "SUCCESS");
    assert_eq!(TaskStatus::Failure.to_string(), "FAILURE");
    assert_eq!(TaskStatus::Retry.to_string(), "RETRY");
}

#[test]
fn task_status_serializes_upper_case() {
    let json = serde_json::to_string(&TaskStatus::Received).unwrap();
    assert_eq!(json, "\"RECEIVED\"");

    let status: TaskStatus = serde_json::from_str("\"FAILURE\"").unwrap();
    assert_eq!(status, TaskStatus::Failure);
}

#[test]
fn task_status_parses_case_insensitively() {
    assert_eq!("success".parse::<TaskStatus>().unwrap(), TaskStatus::Success);
    assert_eq!("Retry".parse::<TaskStatus>().unwrap(), TaskStatus::Retry);
    assert!("finished".parse::<TaskStatus>().is_err());
}

#[test]
fn only_success_and_failure_are_terminal() {
    assert!(TaskStatus::Success.is_terminal());
    assert!(TaskStatus::Failure.is_terminal());
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Received.is_terminal());
    assert!(!TaskStatus::Started.is_terminal());
    assert!(!TaskStatus::Retry.is_terminal());
}

// --- Task wire format ---

#[test]
fn task_decodes_from_store_json() {
    let json = r#"{
        "UUID": "task_1",
        "Name": "resize",
        "Status": "SUCCESS",
        "Args": [{"Type": "string", "Value": "a.png"}],
        "Result": [{"Type": "int64", "Value": 42}],
        "Error": "",
        "JobUUID": "g1",
        "ExecutionOrder": 2,
        "CreatedAt": "2024-05-01T10:00:00Z",
        "UpdatedAt": "2024-05-01T10:00:05Z",
        "DeletedAt": null
    }"#;

    let task: Task = serde_json::from_str(json).unwrap();

    assert_eq!(task.id, "task_1");
    assert_eq!(task.name, "resize");
    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.arguments.len(), 1);
    assert_eq!(task.results, vec![TaskResult::new("int64", serde_json::json!(42))]);
    assert_eq!(task.group_id.as_deref(), Some("g1"));
    assert_eq!(task.sequence_index, 2);
    assert!(task.deleted_at.is_none());
}

#[test]
fn task_null_collections_decode_as_empty() {
    let json = r#"{
        "UUID": "task_2",
        "Name": "noop",
        "Status": "PENDING",
        "Args": null,
        "Result": null,
        "Error": null,
        "JobUUID": null
    }"#;

    let task: Task = serde_json::from_str(json).unwrap();

    assert!(task.arguments.is_empty());
    assert!(task.results.is_empty());
    assert_eq!(task.error, "");
    assert!(task.group_id.is_none());
    assert_eq!(task.sequence_index, 0);
}

#[test]
fn task_accepts_negative_execution_order() {
    let json = r#"{"UUID": "t", "Status": "PENDING", "ExecutionOrder": -1}"#;
    let task: Task = serde_json::from_str(json).unwrap();
    assert_eq!(task.sequence_index, -1);
}

#[test]
fn task_with_unknown_status_fails_to_decode() {
    let json = r#"{"UUID": "t", "Status": "EXPLODED"}"#;
    assert!(serde_json::from_str::<Task>(json).is_err());
}

#[test]
fn task_apply_is_partial() {
    let mut task = Task::new("t1", "work");
    task.apply(&UpdateTask::success(vec![TaskResult::new("bool", serde_json::json!(true))]));
    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.results.len(), 1);

    // Status-only update leaves the results in place
    task.apply(&UpdateTask::status(TaskStatus::Retry));
    assert_eq!(task.status, TaskStatus::Retry);
    assert_eq!(task.results.len(), 1);
    assert_eq!(task.error, "");
}

// --- Group wire format ---

#[test]
fn group_decodes_with_embedded_tasks() {
    let json = r#"{
        "UUID": "g1",
        "Name": "thumbnails",
        "Status": "RUNNING",
        "Type": "CHORD",
        "Tasks": [
            {"UUID": "a", "Name": "x", "Status": "SUCCESS"},
            {"UUID": "b", "Name": "x", "Status": "STARTED"}
        ]
    }"#;

    let group: Group = serde_json::from_str(json).unwrap();

    assert_eq!(group.id, "g1");
    assert_eq!(group.kind, GroupKind::Chord);
    assert_eq!(group.tasks.len(), 2);
    assert_eq!(group.tasks[1].status, TaskStatus::Started);
}

#[test]
fn group_null_tasks_decode_as_empty() {
    let group: Group = serde_json::from_str(r#"{"UUID": "g", "Tasks": null}"#).unwrap();
    assert!(group.tasks.is_empty());
    assert_eq!(group.kind, GroupKind::Group);
}

// --- UpdateTask ---

#[test]
fn update_omits_absent_fields() {
    let json = serde_json::to_value(UpdateTask::status(TaskStatus::Started)).unwrap();
    assert_eq!(json, serde_json::json!({ "Status": "STARTED" }));
}

#[test]
fn update_success_clears_error() {
    let update = UpdateTask::success(vec![TaskResult::new("string", serde_json::json!("ok"))]);
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "Status": "SUCCESS",
            "Result": [{ "Type": "string", "Value": "ok" }],
            "Error": ""
        })
    );
}

#[test]
fn update_failure_clears_results() {
    let json = serde_json::to_value(UpdateTask::failure("boom")).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "Status": "FAILURE", "Result": [], "Error": "boom" })
    );
}

#[test]
fn terminal_update_replaces_previous_outcome() {
    let mut task = Task::new("t1", "work");
    task.apply(&UpdateTask::failure("boom"));
    task.apply(&UpdateTask::status(TaskStatus::Retry));
    assert_eq!(task.error, "boom");

    task.apply(&UpdateTask::success(vec![TaskResult::new("int64", serde_json::json!(1))]));
    assert_eq!(task.results.len(), 1);
    assert_eq!(task.error, "");

    task.apply(&UpdateTask::failure("late"));
    assert!(task.results.is_empty());
    assert_eq!(task.error, "late");
}

#[test]
fn update_new_drops_payload_the_state_does_not_allow() {
    let update = UpdateTask::new(
        TaskStatus::Started,
        Some(vec![TaskResult::new("int64", serde_json::json!(1))]),
        Some("ignored".to_string()),
    );
    assert!(update.results.is_none());
    assert!(update.error.is_none());

    let update = UpdateTask::new(
        TaskStatus::Failure,
        Some(vec![TaskResult::new("int64", serde_json::json!(1))]),
        Some("kept".to_string()),
    );
    assert_eq!(update.results, Some(Vec::new()));
    assert_eq!(update.error.as_deref(), Some("kept"));
}

// --- TaskState ---

#[test]
fn task_state_projects_task() {
    let mut task = Task::new("t9", "work");
    task.status = TaskStatus::Failure;
    task.error = "disk full".to_string();

    let state = TaskState::from(&task);

    assert_eq!(state.task_id, "t9");
    assert_eq!(state.state, TaskStatus::Failure);
    assert!(state.results.is_empty());
    assert_eq!(state.error, "disk full");
}
