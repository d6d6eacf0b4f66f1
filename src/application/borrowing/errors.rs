use crate::domain::{CopyRef, CopyState, LedgerError, MAX_RENEWAL_DAYS, policy::PolicyViolation};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// エラーの分類
///
/// API層はこの分類だけを見てHTTPステータスを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// ID が解決できない
    NotFound,
    /// 貸出停止中、または貸出方針による拒否
    Forbidden,
    /// 不正な入力値・不正な状態遷移の要求
    BadRequest,
    /// 台帳の条件付き更新の競合
    Conflict,
    /// ストレージ障害
    Internal,
}

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum BorrowingError {
    /// 利用者が存在しない
    #[error("Borrower not found")]
    BorrowerNotFound,

    /// 所蔵品が存在しない
    #[error("Copy not found")]
    CopyNotFound,

    /// 貸出が存在しない
    #[error("Loan not found")]
    LoanNotFound,

    /// 予約が存在しない
    #[error("Reservation not found")]
    ReservationNotFound,

    /// 予約が保留中ではない（管理者の確定・取消）
    #[error("Reservation not found or not pending")]
    ReservationNotPending,

    /// 利用者が貸出停止中
    #[error("Borrower is suspended until {0}")]
    BorrowerSuspended(DateTime<Utc>),

    /// 貸出方針による拒否
    #[error("{0}")]
    PolicyViolation(PolicyViolation),

    /// 他の利用者の予約
    #[error("Reservation belongs to another borrower")]
    NotReservationOwner,

    /// 予約が既に確定・取消済み（本人による取消）
    #[error("Reservation is no longer pending")]
    ReservationClosed,

    /// 所蔵品が貸出可能ではない
    #[error("Copy is not available (current state: {})", .0.as_str())]
    CopyNotAvailable(CopyState),

    /// 貸出が既に返却済み
    #[error("Loan has already been returned")]
    LoanAlreadyReturned,

    /// 延長日数が1以上・上限以下の整数ではない
    #[error("Renewal days must be a positive integer up to {max} (got {0})", max = MAX_RENEWAL_DAYS)]
    InvalidRenewalDays(i64),

    /// 台帳操作の検証エラー（管理者操作）
    #[error("{}", describe_ledger_error(.0))]
    InvalidCopyOperation(LedgerError),

    /// その他の入力値エラー
    #[error("{0}")]
    InvalidInput(String),

    /// 条件付き更新の競合（同時要求に負けた）
    #[error("Item no longer available, please retry")]
    Conflict { copy: CopyRef },

    /// 読み込み後に貸出・予約が他の操作で更新されていた
    #[error("Record was changed by another request, please retry")]
    StaleRecord,

    /// ポート層のI/Oエラー
    #[error("Storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BorrowingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BorrowingError::BorrowerNotFound
            | BorrowingError::CopyNotFound
            | BorrowingError::LoanNotFound
            | BorrowingError::ReservationNotFound
            | BorrowingError::ReservationNotPending => ErrorKind::NotFound,

            BorrowingError::BorrowerSuspended(_)
            | BorrowingError::PolicyViolation(_)
            | BorrowingError::NotReservationOwner => ErrorKind::Forbidden,

            BorrowingError::ReservationClosed
            | BorrowingError::CopyNotAvailable(_)
            | BorrowingError::LoanAlreadyReturned
            | BorrowingError::InvalidRenewalDays(_)
            | BorrowingError::InvalidCopyOperation(_)
            | BorrowingError::InvalidInput(_) => ErrorKind::BadRequest,

            BorrowingError::Conflict { .. } | BorrowingError::StaleRecord => ErrorKind::Conflict,

            BorrowingError::Storage(_) => ErrorKind::Internal,
        }
    }
}

fn describe_ledger_error(err: &LedgerError) -> String {
    match err {
        LedgerError::InvalidTransition { from, to } => format!(
            "Invalid copy state transition: {} -> {}",
            from.as_str(),
            to.as_str()
        ),
        LedgerError::MaintenanceRequiresResource => {
            "Only resource instances can be put into maintenance".to_string()
        }
        LedgerError::InUse(state) => {
            format!("Copy is currently {} and cannot be changed", state.as_str())
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, BorrowingError>;
