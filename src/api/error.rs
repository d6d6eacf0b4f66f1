use crate::application::borrowing::{BorrowingError, ErrorKind};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// 競合時に利用者へ返すメッセージ
pub const CONFLICT_MESSAGE: &str = "item no longer available, please retry";

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    /// アプリケーション層のエラー
    Borrowing(BorrowingError),
    /// リクエストの形式エラー（ヘッダー欠落、列挙値の誤りなど）
    BadRequest(String),
}

impl From<BorrowingError> for ApiError {
    fn from(err: BorrowingError) -> Self {
        ApiError::Borrowing(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Borrowing(err) => match err.kind() {
                // 404 Not Found - IDが解決できない
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),

                // 403 Forbidden - 貸出停止・貸出方針（理由はそのまま返す）
                ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),

                // 400 Bad Request - 入力値・状態遷移の誤り
                ErrorKind::BadRequest => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
                }

                // 409 Conflict - 同時要求に負けた
                ErrorKind::Conflict => {
                    (StatusCode::CONFLICT, "CONFLICT", CONFLICT_MESSAGE.to_string())
                }

                // 500 Internal Server Error - システム障害
                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                ErrorKind::Internal => {
                    match &err {
                        BorrowingError::Storage(source) => {
                            tracing::error!(error = %source, "Storage error")
                        }
                        other => tracing::error!(error = %other, "Internal error"),
                    }
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An unexpected error occurred".to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
