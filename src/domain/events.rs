use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BorrowerId, CopyRef, CopyState, LoanId, ReservationId};

/// イベント：貸出が開始された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOpened {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// 予約確定による貸出の場合の元予約
    pub reservation_id: Option<ReservationId>,
}

/// イベント：貸出が延長された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRenewed {
    pub loan_id: LoanId,
    pub old_due_date: DateTime<Utc>,
    pub new_due_date: DateTime<Utc>,
    pub extra_days: u32,
    pub renewed_at: DateTime<Utc>,
}

/// イベント：貸出が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub returned_at: DateTime<Utc>,
    pub final_state: CopyState,
    pub was_overdue: bool,
}

/// イベント：延滞返却により貸出停止が科された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionApplied {
    pub borrower_id: BorrowerId,
    pub loan_id: LoanId,
    pub overdue_days: i64,
    pub suspended_until: DateTime<Utc>,
    pub applied_at: DateTime<Utc>,
}

/// イベント：貸出停止が解除された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionCleared {
    pub borrower_id: BorrowerId,
    pub cleared_at: DateTime<Utc>,
}

/// イベント：予約が作成された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationPlaced {
    pub reservation_id: ReservationId,
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// イベント：予約が確定（貸出に変換）された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfirmed {
    pub reservation_id: ReservationId,
    pub loan_id: LoanId,
    pub confirmed_at: DateTime<Utc>,
}

/// 予約取消の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// 管理者による取消
    ByAdmin,
    /// 利用者本人による取消
    ByBorrower,
    /// 保持期限切れ
    Expired,
}

/// イベント：予約が取り消された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCancelled {
    pub reservation_id: ReservationId,
    pub copy: CopyRef,
    pub reason: CancellationReason,
    pub cancelled_at: DateTime<Utc>,
}

/// ドメインイベント統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    LoanOpened(LoanOpened),
    LoanRenewed(LoanRenewed),
    LoanReturned(LoanReturned),
    SanctionApplied(SanctionApplied),
    SanctionCleared(SanctionCleared),
    ReservationPlaced(ReservationPlaced),
    ReservationConfirmed(ReservationConfirmed),
    ReservationCancelled(ReservationCancelled),
}

impl DomainEvent {
    /// イベントが属する集約のID
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            DomainEvent::LoanOpened(e) => e.loan_id.value(),
            DomainEvent::LoanRenewed(e) => e.loan_id.value(),
            DomainEvent::LoanReturned(e) => e.loan_id.value(),
            DomainEvent::SanctionApplied(e) => e.borrower_id.value(),
            DomainEvent::SanctionCleared(e) => e.borrower_id.value(),
            DomainEvent::ReservationPlaced(e) => e.reservation_id.value(),
            DomainEvent::ReservationConfirmed(e) => e.reservation_id.value(),
            DomainEvent::ReservationCancelled(e) => e.reservation_id.value(),
        }
    }

    /// 集約の種別
    pub fn aggregate_type(&self) -> &'static str {
        match self {
            DomainEvent::LoanOpened(_)
            | DomainEvent::LoanRenewed(_)
            | DomainEvent::LoanReturned(_) => "Loan",
            DomainEvent::SanctionApplied(_) | DomainEvent::SanctionCleared(_) => "Borrower",
            DomainEvent::ReservationPlaced(_)
            | DomainEvent::ReservationConfirmed(_)
            | DomainEvent::ReservationCancelled(_) => "Reservation",
        }
    }

    /// イベント種別の識別子
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::LoanOpened(_) => "LoanOpened",
            DomainEvent::LoanRenewed(_) => "LoanRenewed",
            DomainEvent::LoanReturned(_) => "LoanReturned",
            DomainEvent::SanctionApplied(_) => "SanctionApplied",
            DomainEvent::SanctionCleared(_) => "SanctionCleared",
            DomainEvent::ReservationPlaced(_) => "ReservationPlaced",
            DomainEvent::ReservationConfirmed(_) => "ReservationConfirmed",
            DomainEvent::ReservationCancelled(_) => "ReservationCancelled",
        }
    }

    /// イベントの発生日時
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::LoanOpened(e) => e.start_date,
            DomainEvent::LoanRenewed(e) => e.renewed_at,
            DomainEvent::LoanReturned(e) => e.returned_at,
            DomainEvent::SanctionApplied(e) => e.applied_at,
            DomainEvent::SanctionCleared(e) => e.cleared_at,
            DomainEvent::ReservationPlaced(e) => e.created_at,
            DomainEvent::ReservationConfirmed(e) => e.confirmed_at,
            DomainEvent::ReservationCancelled(e) => e.cancelled_at,
        }
    }
}
