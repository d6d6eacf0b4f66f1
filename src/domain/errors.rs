use super::{CopyState, RenewalDaysError};

/// 所蔵品台帳のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// 遷移表にない状態遷移
    InvalidTransition { from: CopyState, to: CopyState },
    /// 整備中にできるのは備品の個体のみ
    MaintenanceRequiresResource,
    /// 貸出中・予約中のため操作不可
    InUse(CopyState),
}

/// 延長のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewLoanError {
    /// 既に返却済み
    AlreadyReturned,
    /// 延長日数が1以上・上限以下の整数ではない
    InvalidDays(i64),
}

impl From<RenewalDaysError> for RenewLoanError {
    fn from(err: RenewalDaysError) -> Self {
        match err {
            RenewalDaysError::NotPositive(days) | RenewalDaysError::TooLarge(days) => {
                RenewLoanError::InvalidDays(days)
            }
        }
    }
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLoanError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 予約のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// 保留中ではない（確定済み・取消済み）
    NotPending,
}

/// 利用者登録のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowerError {
    /// 生徒には学級（course）が必須
    CourseRequired,
    /// 生徒以外は学級を持たない
    CourseNotAllowed,
}
