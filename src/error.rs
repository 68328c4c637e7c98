use actix_web::{body, http::StatusCode, HttpResponse};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    State(String),
    #[error("database error")]
    Database(DbErr),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl actix_web::error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        if let ApiError::Database(err) = self {
            tracing::error!(%err, "request failed on a storage error");
        }

        HttpResponse::build(self.status_code())
            .json(ErrorBody {
                success: false,
                message: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::State(_) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbErr> for ApiError {
    /// Unique-index violations are the race backstop for the check-then-insert
    /// paths, so they surface as a conflict rather than a server fault.
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return ApiError::Conflict("record already exists".to_string());
        }

        // Postgres exclusion violations (the leave non-overlap backstop) are
        // not classified by `sql_err`
        if err.to_string().contains("violates exclusion constraint") {
            return ApiError::Conflict("an overlapping record already exists".to_string());
        }

        ApiError::Database(err)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        ApiError::Forbidden
    }
}
