//! Entity stores talking to a real collection server over HTTP.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use taskboard::client::{CollectionApi, HttpCollection};
use taskboard::db::Database;
use taskboard::entity::{Entity, Field, FieldValue, FieldValues, Project, Task};
use taskboard::fields::{DeletePolicy, Priority, Status};
use taskboard::server::{serve_on, AppState};
use taskboard::store::EntityStore;
use taskboard::tui::popover::standard_actions;

async fn spawn_server(db: Database, delete_policy: DeletePolicy) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(listener, AppState { db, delete_policy }));
    format!("http://{addr}")
}

async fn server(delete_policy: DeletePolicy) -> String {
    spawn_server(Database::open_in_memory().unwrap(), delete_policy).await
}

fn store<E: Entity>(base_url: &str) -> EntityStore<E> {
    let api: Arc<dyn CollectionApi<E>> = Arc::new(HttpCollection::<E>::new(reqwest::Client::new(), base_url));
    EntityStore::new(api)
}

fn text(field: Field, s: &str) -> (Field, FieldValue) {
    (field, FieldValue::Text(s.into()))
}

/// Smallest body the server accepts: a title and a description.
fn titled(title: &str) -> FieldValues {
    [text(Field::Title, title), text(Field::Description, "")].into_iter().collect()
}

#[tokio::test]
async fn add_then_fetch_yields_one_matching_entity() {
    let url = server(DeletePolicy::Idempotent).await;
    let mut tasks = store::<Task>(&url);
    tasks
        .add(
            [text(Field::Title, "Write spec"), text(Field::Description, "")]
                .into_iter()
                .chain([(Field::Status, FieldValue::Status(Status::Todo))])
                .collect(),
        )
        .await;
    assert_eq!(tasks.error(), None);
    assert!(!tasks.is_loading());

    let mut fresh = store::<Task>(&url);
    fresh.fetch_all().await;
    let items = fresh.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Write spec");
    assert_eq!(items[0].description, "");
    assert_eq!(items[0].status, Status::Todo);
    assert!(!items[0].id.is_empty());
    assert_eq!(items[0].created_at, items[0].updated_at);
    assert_eq!(&items[0], &tasks.items()[0]);
}

#[tokio::test]
async fn update_overwrites_only_patched_keys() {
    let url = server(DeletePolicy::Idempotent).await;
    let mut projects = store::<Project>(&url);
    projects
        .add(
            FieldValues::new()
                .with(Field::Title, FieldValue::Text("Launch".into()))
                .with(Field::Description, FieldValue::Text("site".into()))
                .with(Field::Priority, FieldValue::Priority(Priority::High))
                .with(Field::Progress, FieldValue::Progress(20)),
        )
        .await;
    let before = projects.items()[0].clone();

    projects
        .update(&before.id, FieldValues::new().with(Field::Progress, FieldValue::Progress(30)))
        .await;
    assert_eq!(projects.error(), None);

    let after = projects.get(&before.id).unwrap();
    assert_eq!(after.progress, 30);
    assert_eq!(after.priority, Priority::High);
    assert_eq!(after.description, "site");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn repeat_delete_is_silent_when_idempotent() {
    let url = server(DeletePolicy::Idempotent).await;
    let mut tasks = store::<Task>(&url);
    tasks.add(titled("a")).await;
    tasks.add(titled("b")).await;
    let id = tasks.items()[0].id.clone();

    tasks.delete(&id).await;
    assert_eq!(tasks.items().len(), 1);
    tasks.delete(&id).await;
    assert_eq!(tasks.error(), None);
    assert_eq!(tasks.items().len(), 1);
}

#[tokio::test]
async fn repeat_delete_fails_when_strict() {
    let url = server(DeletePolicy::Strict).await;
    let mut tasks = store::<Task>(&url);
    tasks.add(titled("a")).await;
    let id = tasks.items()[0].id.clone();

    tasks.delete(&id).await;
    assert_eq!(tasks.error(), None);
    tasks.delete(&id).await;
    assert_eq!(tasks.error(), Some("Failed to delete task"));
    assert!(tasks.items().is_empty());
}

#[tokio::test]
async fn mark_complete_twice_stays_completed() {
    let url = server(DeletePolicy::Idempotent).await;
    let mut tasks = store::<Task>(&url);
    tasks.add(titled("a")).await;
    let item = tasks.items()[0].clone();

    let complete = standard_actions::<Task>()
        .into_iter()
        .find(|a| a.label == "Mark Complete")
        .unwrap();
    for _ in 0..2 {
        let mut target = tasks.get(&item.id).unwrap().clone();
        target.set_status(Status::Completed);
        let cmd = (complete.action)(&target).into_command().unwrap();
        tasks.execute(cmd).await;
        assert_eq!(tasks.error(), None);
    }
    assert_eq!(tasks.items()[0].status, Status::Completed);
}

#[tokio::test]
async fn update_progress_clamps_at_one_hundred() {
    let url = server(DeletePolicy::Idempotent).await;
    let mut projects = store::<Project>(&url);
    projects
        .add(
            titled("Launch")
                .with(Field::Progress, FieldValue::Progress(95)),
        )
        .await;

    let bump = standard_actions::<Project>()
        .into_iter()
        .find(|a| a.label == "Update Progress")
        .unwrap();
    let cmd = (bump.action)(&projects.items()[0]).into_command().unwrap();
    projects.execute(cmd).await;
    assert_eq!(projects.items()[0].progress, 100);
}

#[tokio::test]
async fn date_toggled_off_is_not_sent() {
    use taskboard::tui::date_fields::DateFieldSet;

    let url = server(DeletePolicy::Idempotent).await;
    let mut pending = FieldValues::new();
    let mut dates = DateFieldSet::for_entity::<Project>();
    dates.toggle(0, &mut pending);
    dates.set_date(0, chrono::NaiveDate::from_ymd_opt(2030, 1, 1), &mut pending);
    dates.toggle(0, &mut pending);

    let mut body = titled("Launch");
    body.merge(&pending);
    assert!(!body.to_json().contains_key("dueDate"));

    let mut projects = store::<Project>(&url);
    projects.add(body).await;
    assert_eq!(projects.items()[0].due_date, None);
}

#[tokio::test]
async fn missing_title_is_a_store_error() {
    let url = server(DeletePolicy::Idempotent).await;
    let mut tasks = store::<Task>(&url);
    tasks.add(FieldValues::new()).await;
    assert_eq!(tasks.error(), Some("Failed to add task"));
    assert!(tasks.items().is_empty());
}

#[tokio::test]
async fn corrupt_stored_enum_surfaces_as_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.db");
    let url = spawn_server(Database::open(&path).unwrap(), DeletePolicy::Idempotent).await;

    let mut tasks = store::<Task>(&url);
    tasks.add(titled("a")).await;
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("UPDATE tasks SET status = 'archived'", []).unwrap();

    tasks.fetch_all().await;
    assert_eq!(tasks.error(), Some("Failed to fetch tasks"));
    assert_eq!(tasks.items().len(), 1, "failed fetch keeps the cached list");
}

#[tokio::test]
async fn client_rejects_unknown_enum_in_response() {
    let stub = Router::new().route(
        "/api/tasks",
        get(|| async {
            Json(json!([{
                "id": "x",
                "title": "t",
                "description": "",
                "status": "archived",
                "createdAt": "2025-01-01T00:00:00Z",
                "updatedAt": "2025-01-01T00:00:00Z"
            }]))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, stub).await });

    let mut tasks = store::<Task>(&format!("http://{addr}"));
    tasks.fetch_all().await;
    assert_eq!(tasks.error(), Some("Failed to fetch tasks"));
    assert!(tasks.items().is_empty());
}
