// Integration tests for the typed task endpoints and the task board

mod common;

use chrono::NaiveDate;
use mockito::Matcher;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use common::{harness, page_json, task_json};
use tasks_client::models::{NewTask, TaskStatus};
use tasks_client::TaskBoard;

// ==================================================================================================
// Endpoints
// ==================================================================================================

#[tokio::test]
async fn test_create_task_formats_due_date() {
    let mut server = mockito::Server::new_async().await;

    let create = server
        .mock("POST", "/api/tasks/")
        .match_header("authorization", "Bearer a1")
        .match_body(Matcher::Json(json!({
            "title": "Write report",
            "description": "quarterly",
            "due_date": "2024-01-05",
            "status": "pending",
            "assigned_to": 1
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(task_json(12, "Write report").to_string())
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));
    let new_task = NewTask::new("Write report", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 1)
        .with_description("quarterly");

    let task = assert_ok!(h.api.create_task(&new_task).await);
    assert_eq!(task.id, 12);
    assert_eq!(task.assigned_to_username, "admin");

    create.assert_async().await;
}

#[tokio::test]
async fn test_update_task_sends_full_task_and_ignores_body() {
    let mut server = mockito::Server::new_async().await;

    let mut updated = task_json(7, "Renamed");
    updated["status"] = json!("completed");

    let patch = server
        .mock("PATCH", "/api/tasks/7/")
        .match_body(Matcher::PartialJson(json!({
            "id": 7,
            "title": "Renamed",
            "status": "completed",
            "due_date": "2024-01-05",
            "assigned_to_username": "admin"
        })))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));
    let task = serde_json::from_value(updated).unwrap();

    assert_ok!(h.api.update_task(&task).await);
    patch.assert_async().await;
}

#[tokio::test]
async fn test_delete_task() {
    let mut server = mockito::Server::new_async().await;

    let delete = server
        .mock("DELETE", "/api/tasks/7/")
        .match_header("authorization", "Bearer a1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));

    assert_ok!(h.api.delete_task(7).await);
    delete.assert_async().await;
}

#[tokio::test]
async fn test_get_users() {
    let mut server = mockito::Server::new_async().await;

    let _users = server
        .mock("GET", "/api/users/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1, "username": "admin"}, {"id": 2, "username": "ana"}]"#)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));

    let users = assert_ok!(h.api.get_users().await);
    assert_eq!(users.len(), 2);
    assert_eq!(users[1].id, 2);
}

#[tokio::test]
async fn test_cursor_is_followed_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let next = format!("{}/api/tasks/archive/?page=2", server.url());

    let _first = server
        .mock("GET", "/api/tasks/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(Some(next.clone()), vec![task_json(1, "One")]))
        .create_async()
        .await;

    let second = server
        .mock("GET", Matcher::Regex(r"^/api/tasks/archive/".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(None, vec![task_json(2, "Two")]))
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));

    let page = assert_ok!(h.api.get_tasks(None).await);
    assert_eq!(page.next.as_deref(), Some(next.as_str()));

    let page = assert_ok!(h.api.get_tasks(page.next.as_deref()).await);
    assert_eq!(page.results[0].id, 2);
    assert!(page.next.is_none());

    second.assert_async().await;
}

#[tokio::test]
async fn test_validation_error_is_surfaced_with_status() {
    let mut server = mockito::Server::new_async().await;

    let _create = server
        .mock("POST", "/api/tasks/")
        .with_status(400)
        .with_body(r#"{"title": ["This field may not be blank."]}"#)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));
    let new_task = NewTask::new("", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 1);

    let err = assert_err!(h.api.create_task(&new_task).await);
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("may not be blank"));
}

// ==================================================================================================
// Task board
// ==================================================================================================

#[tokio::test]
async fn test_board_pagination_skips_duplicates() {
    let mut server = mockito::Server::new_async().await;
    let next = format!("{}/api/tasks/archive/?page=2", server.url());

    let _first = server
        .mock("GET", "/api/tasks/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(
            Some(next),
            vec![task_json(1, "One"), task_json(2, "Two")],
        ))
        .create_async()
        .await;

    let _second = server
        .mock("GET", Matcher::Regex(r"^/api/tasks/archive/".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(
            None,
            vec![task_json(2, "Two again"), task_json(3, "Three")],
        ))
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));
    let mut board = TaskBoard::new(h.api.clone());

    assert_ok!(board.load().await);
    assert_eq!(board.tasks().len(), 2);
    assert!(board.has_more());

    assert!(assert_ok!(board.load_more().await));
    let ids: Vec<u64> = board.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(board.tasks()[1].title, "Two");

    // Nothing left to load
    assert!(!board.has_more());
    assert!(!assert_ok!(board.load_more().await));
    assert!(board.error().is_none());
}

#[tokio::test]
async fn test_board_local_updates_follow_successful_calls() {
    let mut server = mockito::Server::new_async().await;

    let _list = server
        .mock("GET", "/api/tasks/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(None, vec![task_json(1, "One"), task_json(2, "Two")]))
        .create_async()
        .await;

    let _create = server
        .mock("POST", "/api/tasks/")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(task_json(3, "Three").to_string())
        .create_async()
        .await;

    let _delete = server
        .mock("DELETE", "/api/tasks/1/")
        .with_status(204)
        .create_async()
        .await;

    let _patch = server
        .mock("PATCH", "/api/tasks/2/")
        .with_status(200)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));
    let mut board = TaskBoard::new(h.api.clone());
    assert_ok!(board.load().await);

    let new_task = NewTask::new("Three", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 1);
    assert_ok!(board.create(&new_task).await);
    assert_eq!(board.tasks()[0].id, 3);

    assert_ok!(board.delete(1).await);
    let ids: Vec<u64> = board.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let mut task = board.tasks()[1].clone();
    task.status = TaskStatus::Completed;
    assert_ok!(board.update(task).await);
    assert_eq!(board.tasks()[1].status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_board_keeps_state_and_records_error_on_failure() {
    let mut server = mockito::Server::new_async().await;

    let _list = server
        .mock("GET", "/api/tasks/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(None, vec![task_json(1, "One")]))
        .create_async()
        .await;

    let _delete = server
        .mock("DELETE", "/api/tasks/1/")
        .with_status(500)
        .create_async()
        .await;

    let _create = server
        .mock("POST", "/api/tasks/")
        .with_status(400)
        .with_body(r#"{"assigned_to": ["Invalid pk"]}"#)
        .create_async()
        .await;

    let h = harness(&server.url(), Some("a1"), Some("r1"));
    let mut board = TaskBoard::new(h.api.clone());
    assert_ok!(board.load().await);

    assert_err!(board.delete(1).await);
    assert_eq!(board.tasks().len(), 1);
    assert!(board.error().unwrap().starts_with("Failed to delete the task."));

    let new_task = NewTask::new("Orphan", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 99);
    assert_err!(board.create(&new_task).await);
    assert_eq!(board.tasks().len(), 1);
    assert!(board
        .error()
        .unwrap()
        .starts_with("Failed to save the task. Please try again."));

    // A successful operation clears the previous error
    assert_ok!(board.load().await);
    assert!(board.error().is_none());
}
