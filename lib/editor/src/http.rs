//! HTTP binding of the workflow backend.

use crate::api::{ApiError, ApiResult, WorkflowApi};
use crate::config::ApiConfig;
use crate::wire::{ExecutionHandle, ExecutionStatusRecord, WorkflowPayload, WorkflowRecord};
use async_trait::async_trait;
use pagecraft_core::{ExecutionId, WorkflowId};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

/// Workflow backend reached over HTTP.
///
/// Endpoints:
/// - `POST {base}/workflows`
/// - `PUT {base}/workflows/{id}`
/// - `POST {base}/workflows/{id}/execute`
/// - `GET {base}/executions/{id}`
#[derive(Clone)]
pub struct HttpWorkflowApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpWorkflowApi {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: String,
    ) -> ApiResult<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| ApiError::Transport {
            reason: e.to_string(),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "backend responded");

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { resource }.into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse {
                reason: e.to_string(),
            })?)
    }
}

#[async_trait]
impl WorkflowApi for HttpWorkflowApi {
    #[instrument(skip(self, payload), fields(workflow = %payload.name))]
    async fn create_workflow(&self, payload: &WorkflowPayload) -> ApiResult<WorkflowRecord> {
        let request = self.client.post(self.url("/workflows")).json(payload);
        self.send(request, "workflows".to_string()).await
    }

    #[instrument(skip(self, payload), fields(workflow = %id))]
    async fn update_workflow(
        &self,
        id: WorkflowId,
        payload: &WorkflowPayload,
    ) -> ApiResult<WorkflowRecord> {
        let request = self
            .client
            .put(self.url(&format!("/workflows/{}", id.as_ulid())))
            .json(payload);
        self.send(request, id.to_string()).await
    }

    #[instrument(skip(self, input), fields(workflow = %id))]
    async fn execute_workflow(
        &self,
        id: WorkflowId,
        input: JsonValue,
    ) -> ApiResult<ExecutionHandle> {
        let request = self
            .client
            .post(self.url(&format!("/workflows/{}/execute", id.as_ulid())))
            .json(&input);
        self.send(request, id.to_string()).await
    }

    #[instrument(skip(self), fields(execution = %execution_id))]
    async fn execution_status(
        &self,
        execution_id: ExecutionId,
    ) -> ApiResult<ExecutionStatusRecord> {
        let request = self
            .client
            .get(self.url(&format!("/executions/{}", execution_id.as_ulid())));
        self.send(request, execution_id.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ExecutionState;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use pagecraft_workflow::WorkflowSettings;

    const TOKEN: &str = "test-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    fn record_from(id: WorkflowId, payload: WorkflowPayload) -> WorkflowRecord {
        WorkflowRecord {
            id,
            name: payload.name,
            description: Some(payload.description),
            category: Some(payload.category),
            component_id: payload.component_id,
            nodes: payload.nodes,
            connections: payload.connections,
            settings: payload.settings,
            status: "active".to_string(),
            trigger_count: 4,
            success_count: 3,
            created_at: None,
        }
    }

    async fn create(
        headers: HeaderMap,
        Json(payload): Json<WorkflowPayload>,
    ) -> Result<Json<WorkflowRecord>, AxumStatus> {
        if !authorized(&headers) {
            return Err(AxumStatus::UNAUTHORIZED);
        }
        Ok(Json(record_from(WorkflowId::new(), payload)))
    }

    async fn update(
        Path(id): Path<String>,
        Json(payload): Json<WorkflowPayload>,
    ) -> Result<Json<WorkflowRecord>, AxumStatus> {
        let id: WorkflowId = id.parse().map_err(|_| AxumStatus::NOT_FOUND)?;
        Ok(Json(record_from(id, payload)))
    }

    async fn execute(Path(_id): Path<String>) -> Json<ExecutionHandle> {
        Json(ExecutionHandle {
            execution_id: ExecutionId::new(),
            state: ExecutionState::Queued,
        })
    }

    async fn status(Path(id): Path<String>) -> Result<Json<ExecutionStatusRecord>, AxumStatus> {
        let execution_id: ExecutionId = id.parse().map_err(|_| AxumStatus::NOT_FOUND)?;
        Ok(Json(ExecutionStatusRecord {
            execution_id,
            state: ExecutionState::Completed,
            progress: Some(100),
            node_results: Vec::new(),
            error: None,
        }))
    }

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}/api")
    }

    fn backend() -> Router {
        Router::new()
            .route("/api/workflows", post(create))
            .route("/api/workflows/{id}", put(update))
            .route("/api/workflows/{id}/execute", post(execute))
            .route("/api/executions/{id}", get(status))
    }

    fn client(base_url: String, token: Option<&str>) -> HttpWorkflowApi {
        HttpWorkflowApi::new(&ApiConfig {
            base_url,
            token: token.map(str::to_string),
            timeout_seconds: 5,
        })
        .expect("client")
    }

    fn payload() -> WorkflowPayload {
        WorkflowPayload {
            name: "Welcome series".to_string(),
            description: String::new(),
            category: "automation".to_string(),
            trigger_type: "manual".to_string(),
            component_id: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            settings: WorkflowSettings::default(),
        }
    }

    #[tokio::test]
    async fn create_update_execute_and_poll() {
        let base = spawn_backend(backend()).await;
        let api = client(base, Some(TOKEN));

        let created = api.create_workflow(&payload()).await.expect("create");
        assert_eq!(created.name, "Welcome series");
        assert_eq!(created.trigger_count, 4);

        let updated = api
            .update_workflow(created.id, &payload())
            .await
            .expect("update");
        assert_eq!(updated.id, created.id);

        let handle = api
            .execute_workflow(created.id, JsonValue::Null)
            .await
            .expect("execute");
        let status = api
            .execution_status(handle.execution_id)
            .await
            .expect("status");
        assert_eq!(status.execution_id, handle.execution_id);
        assert!(status.state.is_finished());
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_ignored() {
        let base = spawn_backend(backend()).await;
        let api = client(format!("{base}/"), Some(TOKEN));
        assert!(api.create_workflow(&payload()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_token_surfaces_status_error() {
        let base = spawn_backend(backend()).await;
        let api = client(base, None);

        let err = api.create_workflow(&payload()).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            ApiError::Status { status: 401, .. }
        ));
    }

    #[tokio::test]
    async fn unknown_route_maps_to_not_found() {
        let base = spawn_backend(Router::new()).await;
        let api = client(base, Some(TOKEN));

        let err = api
            .execution_status(ExecutionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err.current_context(), ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let app = Router::new().route(
            "/api/workflows",
            post(|| async { Json(serde_json::json!({ "unexpected": true })) }),
        );
        let base = spawn_backend(app).await;
        let api = client(base, Some(TOKEN));

        let err = api.create_workflow(&payload()).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            ApiError::InvalidResponse { .. }
        ));
    }
}
