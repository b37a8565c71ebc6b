use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Bad or empty input caught before any network interaction.
    #[error("{0}")]
    Validation(String),

    /// A collaborator call failed or was unreachable.
    #[error("transport error: {0}")]
    Transport(String),

    /// A collaborator responded with a structured failure; the message is
    /// passed through verbatim.
    #[error("{0}")]
    Upstream(String),

    #[error("No test session has been started")]
    NoSession,

    #[error("No exportable configuration is available")]
    NoExport,

    #[error("Remote store is not configured")]
    StoreNotConfigured,

    #[error("Database error: {0}")]
    Db(String),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::Transport(_) => StatusCode::BAD_GATEWAY,
            DashboardError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DashboardError::NoSession => StatusCode::NOT_FOUND,
            DashboardError::NoExport => StatusCode::CONFLICT,
            DashboardError::StoreNotConfigured => StatusCode::PRECONDITION_FAILED,
            DashboardError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
