//! Chat proxy endpoint
//!
//! Forwards chat questions to the hosted prediction endpoint and relays its
//! answer. Upstream errors are relayed with the upstream's own status and
//! JSON body; anything else that goes wrong becomes a generic 500.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Conversation id sent when the caller supplies none
pub const DEFAULT_SESSION_ID: &str = "userid";

const CONTEXT: &str = "Error handling chat request";

/// Handle `POST /api/chat`
pub async fn handle_chat(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::internal(CONTEXT, e))?;

    validate_question(&payload)?;

    if !state.prediction.is_configured() {
        return Err(ApiError::MissingConfiguration);
    }

    let outbound = with_default_session_id(payload, DEFAULT_SESSION_ID);

    let response = state
        .prediction
        .predict(&outbound)
        .await
        .map_err(|e| ApiError::internal(CONTEXT, e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::internal(CONTEXT, e))?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::internal(CONTEXT, e))?;

        tracing::warn!(status = %status, "Prediction endpoint returned an error");

        let status =
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err(ApiError::Upstream { status, body });
    }

    let data: Value = response
        .json()
        .await
        .map_err(|e| ApiError::internal(CONTEXT, e))?;

    Ok(Json(data))
}

/// The payload must be an object whose `question` is a non-empty string
pub fn validate_question(payload: &Value) -> ApiResult<()> {
    match payload.get("question").and_then(Value::as_str) {
        Some(question) if !question.is_empty() => Ok(()),
        _ => Err(ApiError::InvalidQuestion),
    }
}

/// Set `overrideConfig.sessionId` to `default` unless the caller already
/// supplied a truthy one. Everything else in the payload is kept as is.
pub fn with_default_session_id(mut payload: Value, default: &str) -> Value {
    let Some(object) = payload.as_object_mut() else {
        return payload;
    };

    let override_config = object
        .entry("overrideConfig")
        .or_insert_with(|| Value::Object(Map::new()));
    if !override_config.is_object() {
        *override_config = Value::Object(Map::new());
    }

    if let Some(config) = override_config.as_object_mut() {
        let supplied = config.get("sessionId").is_some_and(is_truthy);
        if !supplied {
            config.insert("sessionId".to_string(), json!(default));
        }
    }

    payload
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::create_router;
    use axum::{body::Body, http::Request, Router};
    use flowdesk_shared::PredictionClient;
    use mockito::Matcher;
    use tower::ServiceExt;

    fn app(endpoint: String, api_key: Option<&str>) -> Router {
        let config = Config::for_tests();
        let prediction = PredictionClient::new(endpoint, api_key.map(String::from));
        let state = AppState::from_parts(config, prediction, None);
        create_router(state)
    }

    async fn post_chat(app: Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // =========================================================================
    // Session id defaulting
    // =========================================================================

    #[test]
    fn test_default_session_id_added() {
        let out = with_default_session_id(json!({"question": "hi"}), DEFAULT_SESSION_ID);
        assert_eq!(
            out,
            json!({"question": "hi", "overrideConfig": {"sessionId": "userid"}})
        );
    }

    #[test]
    fn test_caller_session_id_wins() {
        let payload = json!({
            "question": "hi",
            "overrideConfig": {"sessionId": "abc-123", "temperature": 0.2}
        });
        let out = with_default_session_id(payload.clone(), DEFAULT_SESSION_ID);
        assert_eq!(out, payload);
    }

    #[test]
    fn test_falsy_session_id_replaced_and_siblings_kept() {
        let out = with_default_session_id(
            json!({"question": "hi", "history": [], "overrideConfig": {"sessionId": "", "topK": 3}}),
            DEFAULT_SESSION_ID,
        );
        assert_eq!(out["overrideConfig"], json!({"sessionId": "userid", "topK": 3}));
        assert_eq!(out["history"], json!([]));

        let out = with_default_session_id(
            json!({"question": "hi", "overrideConfig": {"sessionId": null}}),
            DEFAULT_SESSION_ID,
        );
        assert_eq!(out["overrideConfig"]["sessionId"], "userid");
    }

    #[test]
    fn test_non_object_override_config_replaced() {
        let out = with_default_session_id(
            json!({"question": "hi", "overrideConfig": "nope"}),
            DEFAULT_SESSION_ID,
        );
        assert_eq!(out["overrideConfig"], json!({"sessionId": "userid"}));
    }

    #[test]
    fn test_validate_question() {
        assert!(validate_question(&json!({"question": "hi"})).is_ok());
        assert!(validate_question(&json!({"question": ""})).is_err());
        assert!(validate_question(&json!({"question": 42})).is_err());
        assert!(validate_question(&json!({"question": null})).is_err());
        assert!(validate_question(&json!({})).is_err());
        assert!(validate_question(&json!(["question"])).is_err());
        assert!(validate_question(&json!("question")).is_err());
    }

    // =========================================================================
    // Handler
    // =========================================================================

    #[tokio::test]
    async fn test_invalid_question_never_reaches_upstream() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/prediction")
            .expect(0)
            .create_async()
            .await;

        for body in [
            r#"{}"#,
            r#"{"question": ""}"#,
            r#"{"question": 7}"#,
            r#"{"question": ["a"]}"#,
            r#"[]"#,
        ] {
            let app = app(format!("{}/prediction", server.url()), Some("key"));
            let (status, json) = post_chat(app, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(json, json!({"error": "Invalid question"}));
        }

        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_api_key_is_misconfiguration() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/prediction")
            .expect(0)
            .create_async()
            .await;

        let app = app(format!("{}/prediction", server.url()), None);
        let (status, json) = post_chat(app, r#"{"question": "hello"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Missing configuration"}));
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_json_is_internal_error() {
        let app = app("http://127.0.0.1:9/prediction".to_string(), Some("key"));
        let (status, json) = post_chat(app, "{not json").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_success_relayed_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/prediction")
            .match_header("authorization", "Bearer key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "question": "hello",
                "overrideConfig": {"sessionId": "userid"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"hi"}"#)
            .create_async()
            .await;

        let app = app(format!("{}/prediction", server.url()), Some("key"));
        let (status, json) = post_chat(app, r#"{"question": "hello"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"text": "hi"}));
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_caller_session_id_forwarded_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/prediction")
            .match_body(Matcher::PartialJson(json!({
                "overrideConfig": {"sessionId": "conversation-42"}
            })))
            .with_status(200)
            .with_body(r#"{"text":"again","sessionId":"conversation-42"}"#)
            .create_async()
            .await;

        let app = app(format!("{}/prediction", server.url()), Some("key"));
        let (status, _) = post_chat(
            app,
            r#"{"question": "hello", "overrideConfig": {"sessionId": "conversation-42"}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_error_relayed_with_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/prediction")
            .with_status(422)
            .with_body(r#"{"msg":"x"}"#)
            .create_async()
            .await;

        let app = app(format!("{}/prediction", server.url()), Some("key"));
        let (status, json) = post_chat(app, r#"{"question": "hello"}"#).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json, json!({"msg": "x"}));
    }

    #[tokio::test]
    async fn test_upstream_error_without_json_collapses_to_500() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/prediction")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let app = app(format!("{}/prediction", server.url()), Some("key"));
        let (status, json) = post_chat(app, r#"{"question": "hello"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_internal_error() {
        // Port 9 (discard) is not listening in test environments
        let app = app("http://127.0.0.1:9/prediction".to_string(), Some("key"));
        let (status, json) = post_chat(app, r#"{"question": "hello"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Internal Server Error"}));
    }
}
