//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::auth::AuthUser;
use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::analysis::{analyze, AnalyzeTaskRequest, TaskSuggestion};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /analyzeTask`
pub async fn analyze_task(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    payload: std::result::Result<Json<AnalyzeTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskSuggestion>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    tracing::info!(
        user = %email,
        item = %request.item_id,
        members = request.team_members.len(),
        "analyzeTask"
    );

    let suggestion = analyze(state.provider(), &request).await?;
    Ok(Json(suggestion))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::analysis::{BoxedProvider, StaticProvider};
    use crate::model::User;
    use crate::server::auth::issue_session;
    use crate::server::{router, AppState};
    use crate::storage::SqliteStorage;

    const REPLY: &str = r#"{"assignTo":"bo@acme.io","priority":5,"subtasks":["Draft"],"sextant":2,"confidence":70,"reasoning":"Bo is free"}"#;
    const BODY: &str = r#"{"itemId":"item_1","itemTitle":"Launch post","itemDescription":null,"teamMembers":[{"email":"bo@acme.io","activeTasks":1,"completionRate":90}],"dueDate":null}"#;

    fn state(provider: StaticProvider) -> (AppState, String) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_user(&User::new("ana@acme.io"), "ana@acme.io").unwrap();
        let token = issue_session(&mut storage, "ana@acme.io", "ana@acme.io").unwrap();
        (AppState::new(storage, BoxedProvider::new(provider)), token)
    }

    fn analyze_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/analyzeTask")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state(StaticProvider::replying("{}"));
        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let (state, _) = state(StaticProvider::replying(REPLY));
        let response = router(state).oneshot(analyze_request(None, BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, serde_json::json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_unknown_token_is_401() {
        let (state, _) = state(StaticProvider::replying(REPLY));
        let response = router(state)
            .oneshot(analyze_request(Some("vt_nope"), BODY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_success_returns_clamped_suggestion() {
        let (state, token) = state(StaticProvider::replying(REPLY));
        let response = router(state)
            .oneshot(analyze_request(Some(&token), BODY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["assignTo"], "bo@acme.io");
        assert_eq!(body["priority"], 3);
        assert_eq!(body["subtasks"][0], "Draft");
    }

    #[tokio::test]
    async fn test_provider_failure_is_500() {
        let (state, token) = state(StaticProvider::failing("model offline"));
        let response = router(state)
            .oneshot(analyze_request(Some(&token), BODY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("model offline"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (state, token) = state(StaticProvider::replying(REPLY));
        let response = router(state)
            .oneshot(analyze_request(Some(&token), r#"{"itemTitle":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }
}
