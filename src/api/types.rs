use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::borrowing::LoanReturnOutcome;
use crate::domain::{
    Borrower, BorrowerId, CopyId, CopyRecord, CopyRef, DomainEvent, ItemKind, Loan, NewBorrower,
    Reservation, Role, commands::*, loan,
};

// ============================================================================
// Requests
// ============================================================================

/// 貸出・予約の作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub borrower_id: Uuid,
    pub copy_id: Uuid,
    /// book_copy | resource_instance
    pub copy_type: ItemKind,
}

impl BorrowRequest {
    fn copy(&self) -> CopyRef {
        CopyRef::new(self.copy_type, CopyId::from_uuid(self.copy_id))
    }

    pub fn to_loan_command(&self, requested_at: DateTime<Utc>) -> CreateLoan {
        CreateLoan {
            borrower_id: BorrowerId::from_uuid(self.borrower_id),
            copy: self.copy(),
            requested_at,
        }
    }

    pub fn to_reservation_command(&self, requested_at: DateTime<Utc>) -> CreateReservation {
        CreateReservation {
            borrower_id: BorrowerId::from_uuid(self.borrower_id),
            copy: self.copy(),
            requested_at,
        }
    }
}

/// 返却リクエスト
///
/// final_state は未検証の文字列として受け取り、400で検証エラーを返す。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLoanRequest {
    pub final_state: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 延長リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewLoanRequest {
    /// 延長日数（営業日）。整数以外も受け取り、400で検証エラーを返す
    #[serde(alias = "days")]
    pub extra_days: serde_json::Value,
}

/// 利用者登録リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBorrowerRequest {
    pub name: String,
    pub national_id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub course: Option<String>,
}

impl From<RegisterBorrowerRequest> for NewBorrower {
    fn from(req: RegisterBorrowerRequest) -> Self {
        NewBorrower {
            name: req.name,
            national_id: req.national_id,
            email: req.email,
            role: req.role,
            course: req.course,
        }
    }
}

/// 所蔵品追加リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCopiesRequest {
    pub kind: ItemKind,
    pub count: u32,
}

/// 所蔵品の状態変更リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideCopyStateRequest {
    pub state: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 利用者IDでの絞り込み（GET /loans, GET /reservations）
#[derive(Debug, Deserialize)]
pub struct BorrowerQuery {
    pub borrower_id: Option<Uuid>,
}

// ============================================================================
// Responses
// ============================================================================

/// 貸出レスポンス
///
/// status は表示用の状態（active | overdue | returned）で、読み取り時に導出する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub borrower_id: Uuid,
    pub copy_id: Uuid,
    pub copy_type: ItemKind,
    pub reservation_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: String,
}

impl LoanResponse {
    pub fn from_loan(loan: &Loan, now: DateTime<Utc>) -> Self {
        Self {
            loan_id: loan.loan_id.value(),
            borrower_id: loan.borrower_id.value(),
            copy_id: loan.copy.id().value(),
            copy_type: loan.copy.kind(),
            reservation_id: loan.reservation_id.map(|id| id.value()),
            start_date: loan.start_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            status: loan::display_status(loan, now).as_str().to_string(),
        }
    }
}

/// 延滞返却で科された貸出停止
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanctionResponse {
    pub overdue_days: i64,
    pub suspended_until: DateTime<Utc>,
}

/// 返却レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanReturnedResponse {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub sanction: Option<SanctionResponse>,
}

impl LoanReturnedResponse {
    pub fn from_outcome(outcome: &LoanReturnOutcome, now: DateTime<Utc>) -> Self {
        Self {
            loan: LoanResponse::from_loan(&outcome.loan, now),
            sanction: outcome.sanction.as_ref().map(|s| SanctionResponse {
                overdue_days: s.overdue_days,
                suspended_until: s.suspended_until,
            }),
        }
    }
}

/// 予約レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub reservation_id: Uuid,
    pub borrower_id: Uuid,
    pub copy_id: Uuid,
    pub copy_type: ItemKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
}

impl From<&Reservation> for ReservationResponse {
    fn from(reservation: &Reservation) -> Self {
        Self {
            reservation_id: reservation.reservation_id.value(),
            borrower_id: reservation.borrower_id.value(),
            copy_id: reservation.copy.id().value(),
            copy_type: reservation.copy.kind(),
            created_at: reservation.created_at,
            expires_at: reservation.expires_at,
            status: reservation.state.as_str().to_string(),
        }
    }
}

/// 利用者レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerResponse {
    pub borrower_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub course: Option<String>,
    pub suspended_until: Option<DateTime<Utc>>,
}

impl From<&Borrower> for BorrowerResponse {
    fn from(borrower: &Borrower) -> Self {
        Self {
            borrower_id: borrower.borrower_id.value(),
            name: borrower.name.clone(),
            email: borrower.email.clone(),
            role: borrower.role,
            course: borrower.course.clone(),
            suspended_until: borrower.suspended_until,
        }
    }
}

/// 所蔵品レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyResponse {
    pub copy_id: Uuid,
    pub kind: ItemKind,
    pub title_id: Uuid,
    pub number: u32,
    pub state: String,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&CopyRecord> for CopyResponse {
    fn from(record: &CopyRecord) -> Self {
        Self {
            copy_id: record.copy.id().value(),
            kind: record.copy.kind(),
            title_id: record.title_id.value(),
            number: record.number,
            state: record.state.as_str().to_string(),
            notes: record.notes.clone(),
            updated_at: record.updated_at,
        }
    }
}

/// ジャーナルの1件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub event: DomainEvent,
}

impl From<DomainEvent> for HistoryEntryResponse {
    fn from(event: DomainEvent) -> Self {
        Self {
            event_type: event.event_type().to_string(),
            occurred_at: event.occurred_at(),
            event,
        }
    }
}

/// 期限切れ処理の結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpireReservationsResponse {
    pub expired: usize,
}

/// エラーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// エラーコード（NOT_FOUND, FORBIDDEN, ...）
    pub error: String,
    /// 利用者にそのまま表示できる理由
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
