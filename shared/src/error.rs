use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // 参加登録まわりのドメインエラー
    #[error("Event not found")]
    EventNotFound,
    #[error("Event is at full capacity")]
    CapacityExceeded,
    #[error("You have already RSVP'd to this event")]
    DuplicateRegistration,
    #[error("You have not RSVP'd to this event")]
    NotRegistered,
    #[error("Capacity cannot be lower than the number of confirmed attendees ({0})")]
    CapacityBelowConfirmed(usize),
    // リトライ上限まで競合が続いた場合
    #[error("storage conflict persisted after {0} attempts")]
    StorageConflict(u32),

    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error(transparent)]
    InvalidRequestBody(#[from] JsonRejection),
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("ログインが必要です。")]
    UnauthenticatedError,
    #[error("認可情報が誤っています。")]
    UnauthorizedError,
    #[error("許可されていない操作です。")]
    ForbiddenOperation,
}

impl AppError {
    // 競合によるリトライ対象かどうか
    // 40001: serialization_failure, 40P01: deadlock_detected, 23505: unique_violation
    pub fn is_storage_conflict(&self) -> bool {
        let (Self::TransactionError(e) | Self::SpecificOperationError(e)) = self else {
            return false;
        };
        e.as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| matches!(code.as_ref(), "40001" | "40P01" | "23505"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::EventNotFound | AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::CapacityExceeded => StatusCode::NOT_ACCEPTABLE,
            AppError::DuplicateRegistration | AppError::ForbiddenOperation => {
                StatusCode::FORBIDDEN
            }
            AppError::NotRegistered
            | AppError::CapacityBelowConfirmed(_)
            | AppError::ValidationError(_)
            | AppError::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnauthenticatedError | AppError::UnauthorizedError => {
                StatusCode::UNAUTHORIZED
            }
            e @ (AppError::StorageConflict(_)
            | AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::ConversionEntityError(_)) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Unexpected error happened"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let body = match self {
            AppError::ValidationError(report) => {
                let errors: serde_json::Map<String, serde_json::Value> = report
                    .iter()
                    .map(|(path, error)| (path.to_string(), json!(error.message())))
                    .collect();
                json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                })
            }
            // 型が合わない・JSON として読めないボディもバリデーションエラーと同じ形で返す
            AppError::InvalidRequestBody(rejection) => json!({
                "success": false,
                "message": "Validation failed",
                "errors": { "body": rejection.body_text() },
            }),
            // 想定外のエラーは詳細をクライアントに返さない
            _ if status_code.is_server_error() => json!({
                "success": false,
                "message": "Internal server error",
            }),
            e => json!({
                "success": false,
                "message": e.to_string(),
            }),
        };
        (status_code, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (AppError::EventNotFound, StatusCode::NOT_FOUND),
            (AppError::CapacityExceeded, StatusCode::NOT_ACCEPTABLE),
            (AppError::DuplicateRegistration, StatusCode::FORBIDDEN),
            (AppError::NotRegistered, StatusCode::BAD_REQUEST),
            (AppError::CapacityBelowConfirmed(3), StatusCode::BAD_REQUEST),
            (AppError::StorageConflict(5), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::UnauthenticatedError, StatusCode::UNAUTHORIZED),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        assert!(!AppError::CapacityExceeded.is_storage_conflict());
        assert!(!AppError::SpecificOperationError(sqlx::Error::RowNotFound).is_storage_conflict());
    }
}
