pub mod edit;
pub mod generate;
pub mod health;
pub mod posts;

use axum::{Json, Router, http::StatusCode};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::DbError;
use crate::llm::LlmError;
use crate::state::AppState;

pub use edit::edit_routes;
pub use generate::generate_routes;
pub use health::health_routes;
pub use posts::posts_routes;

pub type ApiError = (StatusCode, Json<Value>);

/// Full HTTP application with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health_routes())
        .merge(generate_routes())
        .merge(edit_routes())
        .merge(posts_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(json!({ "detail": detail.into() })))
}

pub(crate) fn internal_error<E: ToString>(error: E) -> ApiError {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

/// Every storage failure surfaced by a handler passes through here so it is logged once.
pub(crate) fn db_error(error: DbError) -> ApiError {
    tracing::error!("Database error: {}", error);
    internal_error(error)
}

pub(crate) fn bad_request(detail: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, detail)
}

pub(crate) fn not_found(detail: impl Into<String>) -> ApiError {
    error_response(StatusCode::NOT_FOUND, detail)
}

/// Unknown providers are the caller's fault; everything else is a server-side failure.
pub(crate) fn llm_error(error: LlmError) -> ApiError {
    match error {
        LlmError::UnsupportedProvider(_) => bad_request(error.to_string()),
        other => internal_error(other),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn db_errors_are_logged_and_become_500() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let (status, Json(body)) = tracing::subscriber::with_default(subscriber, || {
            db_error(DbError::Sqlx(sqlx::Error::PoolClosed))
        });

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("database error"));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ERROR"));
        assert!(output.contains("Database error: database error"));
    }

    #[test]
    fn unknown_provider_is_a_client_error() {
        let (status, _) = llm_error(LlmError::UnsupportedProvider("cohere".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = llm_error(LlmError::MissingApiKey("GROQ_API_KEY"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
