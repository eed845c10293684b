use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("You do not have permission to perform this action")]
    NotAuthorized,

    #[error("Moderators may only remove ordinary members")]
    InsufficientRole,

    #[error("You are not a member of this community")]
    NotAMember,

    #[error("{0} not found")]
    NotFound(String),

    #[error("No user with that username exists")]
    UserNotFound,

    #[error("You have no pending request for this community")]
    NoPendingRequest,

    #[error("A community with this name already exists")]
    NameTaken,

    #[error("Already a member of this community")]
    AlreadyMember,

    #[error("A request to join this community is already pending")]
    AlreadyRequested,

    #[error("This user already has a pending invitation")]
    AlreadyInvited,

    #[error("This {0} has already been handled")]
    AlreadyHandled(&'static str),

    #[error("Cannot leave: you are the only admin. Transfer ownership first.")]
    LastAdminCannotLeave,

    #[error("A community must retain at least one admin")]
    LastAdmin,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Too many invitation targets (maximum {0} per request)")]
    TooManyTargets(usize),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Stable machine-readable code carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "not_authenticated",
            AppError::NotAuthorized => "not_authorized",
            AppError::InsufficientRole => "insufficient_role",
            AppError::NotAMember => "not_a_member",
            AppError::NotFound(_) => "not_found",
            AppError::UserNotFound => "user_not_found",
            AppError::NoPendingRequest => "no_pending_request",
            AppError::NameTaken => "name_taken",
            AppError::AlreadyMember => "already_member",
            AppError::AlreadyRequested => "already_requested",
            AppError::AlreadyInvited => "already_invited",
            AppError::AlreadyHandled(_) => "already_handled",
            AppError::LastAdminCannotLeave => "last_admin_cannot_leave",
            AppError::LastAdmin => "last_admin",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation_error",
            AppError::TooManyTargets(_) => "too_many_targets",
            AppError::Internal(_) | AppError::Database(_) => "internal",
            AppError::Jwt(_) => "not_authenticated",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::NotAuthorized | AppError::InsufficientRole | AppError::NotAMember => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) | AppError::UserNotFound | AppError::NoPendingRequest => {
                StatusCode::NOT_FOUND
            }
            AppError::NameTaken
            | AppError::AlreadyMember
            | AppError::AlreadyRequested
            | AppError::AlreadyInvited
            | AppError::AlreadyHandled(_)
            | AppError::LastAdminCannotLeave
            | AppError::LastAdmin
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::TooManyTargets(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Something went wrong, please retry".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Something went wrong, please retry".to_string()
            }
            AppError::Jwt(_) => "Invalid token".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Translate a unique-constraint violation into the matching conflict error,
/// leaving every other database failure untouched.
pub fn on_unique_violation(err: sqlx::Error, conflict: AppError) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
        _ => AppError::Database(err),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
