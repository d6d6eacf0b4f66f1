use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BorrowerId, CopyRef, CopyState, ItemKind, LoanId, ReservationId, ReturnCondition, TitleId};

/// コマンド：所蔵品を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoan {
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：貸出を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
    pub final_state: ReturnCondition,
    /// 所蔵品に記録する備考（破損の状況など）
    pub notes: Option<String>,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：貸出を延長する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewLoan {
    pub loan_id: LoanId,
    /// 延長日数（未検証の入力値）
    pub extra_days: i64,
    pub renewed_at: DateTime<Utc>,
}

/// コマンド：所蔵品を予約する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservation {
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：予約を確定する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReservation {
    pub reservation_id: ReservationId,
    pub confirmed_at: DateTime<Utc>,
}

/// コマンド：予約を取り消す
///
/// `requested_by` が指定された場合は本人による取消として扱い、所有者を検証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
    pub requested_by: Option<BorrowerId>,
    pub cancelled_at: DateTime<Utc>,
}

/// コマンド：タイトルに所蔵品を追加する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCopies {
    pub title_id: TitleId,
    pub kind: ItemKind,
    pub count: u32,
    pub added_at: DateTime<Utc>,
}

/// コマンド：所蔵品の状態を変更する（管理者操作）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideCopyState {
    pub copy: CopyRef,
    pub to: CopyState,
    pub notes: Option<String>,
}
