use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every failure a request can end with. The variant decides the HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business-rule violation.
    #[error("{0}")]
    Client(String),

    /// Malformed body, query or field; the detail goes into `error`.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Client(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Message for a unique-constraint hit, keyed by constraint name (see migrations).
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "Email already in use",
        Some("examinations_appointment_id_key") => "Examination for this appointment already exists",
        Some("patients_user_id_key") | Some("doctors_user_id_key") => "Profile already exists",
        _ => "Resource already exists",
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let db_err = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<sqlx::Error>())
            .and_then(|e| e.as_database_error());

        if let Some(db_err) = db_err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(unique_violation_message(db_err.constraint()).into());
            }
        }
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        anyhow::Error::new(err).into()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled error");
                ErrorBody {
                    status: false,
                    message: "Internal Server Errors.".into(),
                    error: None,
                }
            }
            AppError::Validation(detail) => ErrorBody {
                status: false,
                message: "Validation error".into(),
                error: Some(detail),
            },
            AppError::Client(m)
            | AppError::Authentication(m)
            | AppError::Authorization(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m) => ErrorBody {
                status: false,
                message: m,
                error: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::client("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Authentication("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn plain_anyhow_error_becomes_internal() {
        let err: AppError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn non_database_sqlx_error_becomes_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn unique_violation_messages_by_constraint() {
        assert_eq!(unique_violation_message(Some("users_email_key")), "Email already in use");
        assert_eq!(
            unique_violation_message(Some("examinations_appointment_id_key")),
            "Examination for this appointment already exists"
        );
        assert_eq!(unique_violation_message(None), "Resource already exists");
    }

    #[derive(Debug)]
    struct UniqueViolation(&'static str);

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn unique_violation(constraint: &'static str, context: &'static str) -> AppError {
        let db_err = sqlx::Error::Database(Box::new(UniqueViolation(constraint)));
        anyhow::Error::new(db_err).context(context).into()
    }

    #[test]
    fn lost_insert_race_is_conflict() {
        let err = unique_violation("examinations_appointment_id_key", "insert examination");
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Examination for this appointment already exists");

        let err = unique_violation("users_email_key", "insert user");
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Email already in use");
    }

    #[tokio::test]
    async fn internal_error_hides_message() {
        let res = AppError::Internal(anyhow::anyhow!("secret db detail")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], false);
        assert_eq!(body["message"], "Internal Server Errors.");
        assert!(!bytes.windows(6).any(|w| w == b"secret"));
    }

    #[tokio::test]
    async fn validation_error_carries_detail() {
        let res = AppError::Validation("size must be at most 100".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "size must be at most 100");
    }
}
