//! Integration tests for HttpService against an in-process fake ClickUp API.
//!
//! Each test spawns an axum server on 127.0.0.1:0 that serves canned
//! ClickUp-shaped payloads, then exercises the HTTP client layer through the
//! full request/response cycle.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use clickup_core::task::{CreateTask, UpdateTask};
use clickup_service::{ByteStream, ClickUpService, HttpService, ServiceError};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const TOKEN: &str = "pk_test_token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == TOKEN)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"err": "Token invalid", "ECODE": "OAUTH_025"})),
    )
        .into_response()
}

async fn get_task(
    State(base): State<String>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match id.as_str() {
        "9hx" => {
            let mut task = json!({
                "id": "9hx",
                "name": "Root task",
                "status": {"status": "open"},
                "team_id": "w1",
                "folder": {"id": "f1"},
                "list": {"id": "l1"},
                "parent": null,
                "attachments": [
                    {"id": "a1", "title": "notes.txt", "url": format!("{base}/files/notes.txt")}
                ]
            });
            if params.get("include_subtasks").map(String::as_str) == Some("true") {
                task["subtasks"] = json!([{"id": "9hy", "name": "Child"}]);
            }
            Json(task).into_response()
        }
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"id": "slow", "name": "late"})).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"err": "Task not found, deleted", "ECODE": "ITEM_013"})),
        )
            .into_response(),
    }
}

async fn update_task(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    Json(json!({
        "id": id,
        "name": body["name"].as_str().unwrap_or("unchanged"),
        "status": {"status": body["status"].as_str().unwrap_or("open")}
    }))
    .into_response()
}

async fn task_comments(Path(id): Path<String>) -> Response {
    if id != "9hx" {
        return Json(json!({"comments": []})).into_response();
    }
    Json(json!({
        "comments": [
            {"id": "c1", "comment_text": "first", "user": {"id": 1, "username": "ana"}, "date": "1700000000000"},
            {"id": "c2", "comment_text": "second", "user": {"id": 2, "username": "bo"}, "date": "1700000100000"}
        ]
    }))
    .into_response()
}

async fn create_comment(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    if body["comment_text"].as_str().unwrap_or("").is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"err": "Comment text is required", "ECODE": "COMM_001"})),
        )
            .into_response();
    }
    Json(json!({"id": 458, "hist_id": format!("h-{id}"), "date": 1700000200000u64})).into_response()
}

async fn replies(Path(id): Path<String>) -> Response {
    let reply = json!({"id": format!("{id}-r1"), "comment_text": "reply"});
    match id.as_str() {
        "bare" => Json(json!([reply])).into_response(),
        "wrapped-comments" => Json(json!({"comments": [reply]})).into_response(),
        "wrapped-replies" => Json(json!({"replies": [reply]})).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "reply store unavailable").into_response(),
    }
}

async fn file(Path(name): Path<String>, headers: HeaderMap) -> Response {
    // attachment downloads must not carry the API token
    if headers.contains_key("authorization") {
        return (StatusCode::BAD_REQUEST, "unexpected credentials").into_response();
    }
    match name.as_str() {
        "notes.txt" => "attachment body".into_response(),
        // 4 KiB in 1 KiB chunks, 400 ms apart
        "trickle.bin" => {
            let chunks = stream::iter(0..4).then(|_| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; 1024]))
            });
            Body::from_stream(chunks).into_response()
        }
        // first chunk, then silence
        "stall.bin" => {
            let chunks = stream::once(async { Ok::<_, std::io::Error>(Bytes::from_static(b"partial")) })
                .chain(stream::pending());
            Body::from_stream(chunks).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "no such file").into_response(),
    }
}

async fn list_tasks(
    Path(list_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let page = params.get("page").map(String::as_str);
    match (list_id.as_str(), page) {
        ("l1", Some("0")) => Json(json!({
            "tasks": [{"id": "9hx", "name": "Root task"}, {"id": "9hz", "name": "Other"}],
            "last_page": false
        }))
        .into_response(),
        ("l1", Some("1")) => Json(json!({"tasks": [], "last_page": true})).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"err": "List not found", "ECODE": "SUBCAT_013"})),
        )
            .into_response(),
    }
}

async fn search_tasks(
    Path(workspace_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let query = params.get("search_text").cloned().unwrap_or_default();
    let page = params.get("page").cloned().unwrap_or_default();
    Json(json!({
        "tasks": [{"id": "s1", "name": format!("{query} in {workspace_id}, page {page}")}]
    }))
    .into_response()
}

async fn teams(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"teams": [{"id": "w1", "name": "Acme"}]})).into_response()
}

async fn spaces() -> Response {
    Json(json!({"spaces": [{"id": 900, "name": "Engineering", "private": false}]})).into_response()
}

async fn folders() -> Response {
    Json(json!({"folders": [{"id": "f1", "name": "Product", "hidden": false}]})).into_response()
}

async fn folder_lists() -> Response {
    Json(json!({"lists": [{"id": "l1", "name": "Backlog", "task_count": 3}]})).into_response()
}

async fn space_lists() -> Response {
    Json(json!({"lists": []})).into_response()
}

async fn create_task(Path(list_id): Path<String>, Json(body): Json<Value>) -> Response {
    Json(json!({
        "id": "new1",
        "name": body["name"],
        "description": body.get("description").cloned().unwrap_or(Value::Null),
        "list": {"id": list_id}
    }))
    .into_response()
}

async fn upload_attachment(
    State(base): State<String>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != "9hx" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"err": "Task not found, deleted", "ECODE": "ITEM_013"})),
        )
            .into_response();
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("attachment") {
            continue;
        }
        let name = field.file_name().unwrap_or("").to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        // the real API omits size; it is echoed here so tests can check the body
        return Json(json!({
            "id": "att-1",
            "version": "0",
            "date": 1700000300000u64,
            "title": name,
            "extension": name.rsplit_once('.').map(|(_, ext)| ext),
            "size": data.len(),
            "url": format!("{base}/files/{name}")
        }))
        .into_response();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"err": "No attachment supplied", "ECODE": "UPLOAD_002"})),
    )
        .into_response()
}

async fn spawn_fake_clickup() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let app = Router::new()
        .route("/task/{id}", get(get_task).put(update_task))
        .route("/task/{id}/comment", get(task_comments).post(create_comment))
        .route("/task/{id}/attachment", post(upload_attachment))
        .route("/comment/{id}/reply", get(replies))
        .route("/files/{name}", get(file))
        .route("/team", get(teams))
        .route("/team/{id}/task", get(search_tasks))
        .route("/team/{id}/space", get(spaces))
        .route("/space/{id}/folder", get(folders))
        .route("/space/{id}/list", get(space_lists))
        .route("/folder/{id}/list", get(folder_lists))
        .route("/list/{id}/task", get(list_tasks).post(create_task))
        .with_state(base_url.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base_url
}

fn service(base_url: &str) -> HttpService {
    HttpService::new(base_url, TOKEN.into()).unwrap()
}

async fn read_all(mut body: ByteStream) -> Result<Vec<u8>, ServiceError> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

#[tokio::test]
async fn get_task_honours_subtask_flag() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);

    let with = svc.get_task("9hx", true).await.unwrap();
    assert_eq!(with.subtasks.as_ref().unwrap().len(), 1);
    assert_eq!(with.team_id.as_deref(), Some("w1"));

    let without = svc.get_task("9hx", false).await.unwrap();
    assert!(without.subtasks.is_none());
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let url = spawn_fake_clickup().await;
    let err = service(&url).get_task("nope", false).await.unwrap_err();
    match err {
        ServiceError::NotFound(msg) => assert_eq!(msg, "Task not found, deleted"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let url = spawn_fake_clickup().await;
    let svc = HttpService::new(&url, "pk_wrong".into()).unwrap();
    let err = svc.list_workspaces().await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn comments_are_unwrapped_in_order() {
    let url = spawn_fake_clickup().await;
    let comments = service(&url).get_task_comments("9hx").await.unwrap();
    let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert_eq!(comments[0].user.as_ref().unwrap().id.as_deref(), Some("1"));
}

#[tokio::test]
async fn every_reply_shape_decodes() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);
    for id in ["bare", "wrapped-comments", "wrapped-replies"] {
        let replies = svc.get_comment_replies(id).await.unwrap().into_comments();
        assert_eq!(replies.len(), 1, "shape {id}");
        assert_eq!(replies[0].id, format!("{id}-r1"));
    }
}

#[tokio::test]
async fn reply_server_error_keeps_status() {
    let url = spawn_fake_clickup().await;
    let err = service(&url).get_comment_replies("broken").await.unwrap_err();
    match err {
        ServiceError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "reply store unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn attachment_download_returns_bytes_without_token() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);
    let body = svc
        .download_attachment(&format!("{url}/files/notes.txt"))
        .await
        .unwrap();
    assert_eq!(read_all(body).await.unwrap(), b"attachment body");

    let err = svc
        .download_attachment(&format!("{url}/files/gone.bin"))
        .await
        .err()
        .expect("expected download of missing file to fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn download_outlasting_timeout_completes_while_data_flows() {
    let url = spawn_fake_clickup().await;
    let svc = HttpService::with_timeout(&url, TOKEN.into(), Duration::from_secs(1)).unwrap();
    let body = svc
        .download_attachment(&format!("{url}/files/trickle.bin"))
        .await
        .unwrap();
    let data = read_all(body).await.unwrap();
    assert_eq!(data.len(), 4096);
}

#[tokio::test]
async fn stalled_download_fails() {
    let url = spawn_fake_clickup().await;
    let svc = HttpService::with_timeout(&url, TOKEN.into(), Duration::from_millis(300)).unwrap();
    let body = svc
        .download_attachment(&format!("{url}/files/stall.bin"))
        .await
        .unwrap();
    let err = read_all(body).await.unwrap_err();
    assert!(
        matches!(err, ServiceError::Timeout(_) | ServiceError::Transport(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn ids_cannot_reach_other_endpoints() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);
    for id in ["../team", "x?include_subtasks=true", "9hx/comment"] {
        let err = svc.get_task(id, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)), "{id}: got {err:?}");
    }
}

#[tokio::test]
async fn list_tasks_pages() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);

    let first = svc.list_tasks("l1", 0).await.unwrap();
    let ids: Vec<&str> = first.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["9hx", "9hz"]);
    assert!(svc.list_tasks("l1", 1).await.unwrap().is_empty());

    let err = svc.list_tasks("nope", 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn search_sends_encoded_query() {
    let url = spawn_fake_clickup().await;
    let found = service(&url)
        .search_tasks("w1", "login & signup", 2)
        .await
        .unwrap();
    assert_eq!(found[0].name, "login & signup in w1, page 2");
}

#[tokio::test]
async fn slow_response_times_out() {
    let url = spawn_fake_clickup().await;
    let svc = HttpService::with_timeout(&url, TOKEN.into(), Duration::from_millis(200)).unwrap();
    let err = svc.get_task("slow", false).await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let svc = HttpService::new("http://127.0.0.1:1", TOKEN.into()).unwrap();
    let err = svc.list_workspaces().await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn container_lookups() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);

    let teams = svc.list_workspaces().await.unwrap();
    assert_eq!(teams[0].name, "Acme");

    let spaces = svc.list_spaces("w1").await.unwrap();
    assert_eq!(spaces[0].id, "900");

    let folders = svc.list_folders("900").await.unwrap();
    assert_eq!(folders[0].name, "Product");

    let lists = svc.list_lists("f1").await.unwrap();
    assert_eq!(lists[0].task_count.as_deref(), Some("3"));

    assert!(svc.list_folderless_lists("900").await.unwrap().is_empty());
}

#[tokio::test]
async fn create_and_update_task() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);

    let created = svc
        .create_task(
            "l1",
            &CreateTask {
                name: "Write docs".into(),
                description: Some("all of them".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, "new1");
    assert_eq!(created.list.as_ref().unwrap().id, "l1");

    let updated = svc
        .update_task(
            "new1",
            &UpdateTask {
                status: Some("done".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status_name(), "done");
}

#[tokio::test]
async fn create_comment_round_trip_and_validation() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);

    let created = svc.create_task_comment("9hx", "looks good").await.unwrap();
    assert_eq!(created.id, "458");
    assert_eq!(created.hist_id.as_deref(), Some("h-9hx"));

    let err = svc.create_task_comment("9hx", "").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn upload_sends_file_as_multipart_attachment() {
    let url = spawn_fake_clickup().await;
    let svc = service(&url);

    let att = svc
        .upload_attachment("9hx", "report.pdf", Bytes::from_static(b"%PDF-1.7 body"))
        .await
        .unwrap();
    assert_eq!(att.id, "att-1");
    assert_eq!(att.title, "report.pdf");
    assert_eq!(att.extension.as_deref(), Some("pdf"));
    assert_eq!(att.size.as_deref(), Some("13"));
    assert_eq!(att.date.as_deref(), Some("1700000300000"));
    assert!(att.url.ends_with("/files/report.pdf"));

    let err = svc
        .upload_attachment("nope", "report.pdf", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let bad_token = HttpService::new(&url, "pk_wrong".into()).unwrap();
    let err = bad_token
        .upload_attachment("9hx", "report.pdf", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}
