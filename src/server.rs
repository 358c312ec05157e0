//! HTTP collection endpoints, one resource per entity kind.
//!
//! ```text
//! GET    /api/<kind>s        list, newest first
//! POST   /api/<kind>s        create from a field map
//! PATCH  /api/<kind>s/{id}   merge a partial field map
//! DELETE /api/<kind>s/{id}   hard delete, 204
//! GET    /api/health
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::db::Database;
use crate::entity::{Entity, FieldValues, Objective, Project, Task};
use crate::error::ServiceError;
use crate::fields::DeletePolicy;

pub struct AppState {
    pub db: Database,
    pub delete_policy: DeletePolicy,
}

type SharedState = Arc<AppState>;

/// A failed request: a generic message for the client plus the underlying cause.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub cause: ServiceError,
}

impl ApiError {
    fn new(message: String, cause: ServiceError) -> Self {
        ApiError { message, cause }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.cause.status_code();
        warn!(status = status.as_u16(), cause = %self.cause, "{}", self.message);
        let body = serde_json::json!({
            "error": self.message,
            "details": self.cause.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(collection::<Task>())
        .merge(collection::<Project>())
        .merge(collection::<Objective>())
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(state))
}

fn collection<E: Entity>() -> Router<SharedState> {
    let base = format!("/api/{}", E::KIND.collection());
    Router::new()
        .route(&base, get(list_items::<E>).post(create_item::<E>))
        .route(
            &format!("{base}/{{id}}"),
            patch(update_item::<E>).delete(delete_item::<E>),
        )
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

pub async fn serve_on(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(
        addr = %listener.local_addr()?,
        delete_policy = ?state.delete_policy,
        "collection server listening"
    );
    axum::serve(listener, router(state)).await
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let resp = next.run(req).await;
    info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    resp
}

fn decode_body<E: Entity>(body: &Bytes) -> Result<FieldValues, ServiceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServiceError::Validation(format!("invalid JSON body: {e}")))?;
    Ok(FieldValues::from_json(E::fields(), &value)?)
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// GET /api/<kind>s
// ---------------------------------------------------------------------------

async fn list_items<E: Entity>(State(state): State<SharedState>) -> Result<Json<Vec<E>>, ApiError> {
    state
        .db
        .list::<E>()
        .map(Json)
        .map_err(|e| ApiError::new(format!("Failed to fetch {}", E::KIND.collection()), e))
}

// ---------------------------------------------------------------------------
// POST /api/<kind>s
// ---------------------------------------------------------------------------

async fn create_item<E: Entity>(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<E>, ApiError> {
    decode_body::<E>(&body)
        .and_then(|values| state.db.insert::<E>(&values))
        .map(Json)
        .map_err(|e| ApiError::new(format!("Failed to create {}", E::KIND.noun()), e))
}

// ---------------------------------------------------------------------------
// PATCH /api/<kind>s/{id}
// ---------------------------------------------------------------------------

async fn update_item<E: Entity>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<E>, ApiError> {
    decode_body::<E>(&body)
        .and_then(|patch| state.db.update::<E>(&id, &patch))
        .map(Json)
        .map_err(|e| ApiError::new(format!("Failed to update {}", E::KIND.noun()), e))
}

// ---------------------------------------------------------------------------
// DELETE /api/<kind>s/{id}
// ---------------------------------------------------------------------------

async fn delete_item<E: Entity>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let fail = |e| ApiError::new(format!("Failed to delete {}", E::KIND.noun()), e);
    let existed = state.db.delete::<E>(&id).map_err(fail)?;
    if !existed && state.delete_policy == DeletePolicy::Strict {
        return Err(fail(ServiceError::not_found(E::KIND.noun(), &id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(policy: DeletePolicy) -> Router {
        router(AppState {
            db: Database::open_in_memory().unwrap(),
            delete_policy: policy,
        })
    }

    async fn api(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
            None => Body::empty(),
        };
        let resp = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_probe() {
        let (status, body) = api(&app(DeletePolicy::Idempotent), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_then_list() {
        let r = app(DeletePolicy::Idempotent);
        let (status, created) = api(
            &r,
            "POST",
            "/api/tasks",
            Some(serde_json::json!({"title": "Write spec", "description": "", "status": "todo"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!created["id"].as_str().unwrap().is_empty());
        assert_eq!(created["createdAt"], created["updatedAt"]);

        let (status, list) = api(&r, "GET", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["title"], "Write spec");
    }

    #[tokio::test]
    async fn bad_enum_is_a_500_with_details() {
        let r = app(DeletePolicy::Idempotent);
        let (status, body) = api(
            &r,
            "POST",
            "/api/projects",
            Some(serde_json::json!({"title": "x", "description": "y", "priority": "urgent"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to create project");
        assert!(body["details"].as_str().unwrap().contains("urgent"));
    }

    #[tokio::test]
    async fn malformed_json_uses_the_error_body() {
        let r = app(DeletePolicy::Idempotent);
        let req = Request::builder()
            .method("POST")
            .uri("/api/objectives")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = r.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn patch_unknown_id_is_404() {
        let r = app(DeletePolicy::Idempotent);
        let (status, body) =
            api(&r, "PATCH", "/api/tasks/nope", Some(serde_json::json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Failed to update task");
    }

    #[tokio::test]
    async fn delete_policy_controls_missing_ids() {
        let (status, body) = api(&app(DeletePolicy::Idempotent), "DELETE", "/api/tasks/nope", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = api(&app(DeletePolicy::Strict), "DELETE", "/api/tasks/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Failed to delete task");
    }
}
