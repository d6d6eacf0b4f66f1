use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BorrowerId, CancellationReason, CopyRef, LendingTerms, Loan, LoanOpened, ReservationCancelled,
    ReservationConfirmed, ReservationError, ReservationId, ReservationPlaced, calendar, loan,
};

/// 予約の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// 保留中（所蔵品を確保している）
    Pending,
    /// 確定済み（貸出に変換された）
    Completed,
    /// 取消済み
    Cancelled,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Pending => "pending",
            ReservationState::Completed => "completed",
            ReservationState::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ReservationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationState::Pending),
            "completed" => Ok(ReservationState::Completed),
            "cancelled" => Ok(ReservationState::Cancelled),
            _ => Err(format!("Invalid reservation state: {}", s)),
        }
    }
}

/// Reservation集約 - 所蔵品1点の一時的な確保
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub created_at: DateTime<Utc>,
    /// 保持期限（作成から2営業日）
    pub expires_at: DateTime<Utc>,
    pub state: ReservationState,
}

impl Reservation {
    pub fn is_pending(&self) -> bool {
        self.state == ReservationState::Pending
    }
}

/// 純粋関数：予約を作成する
///
/// ビジネスルール：
/// - 状態はPending
/// - 保持期限 = 作成時刻 + 2営業日（現地時刻で判定）
pub fn place_reservation(
    borrower_id: BorrowerId,
    copy: CopyRef,
    now: DateTime<Utc>,
    terms: &LendingTerms,
) -> (Reservation, ReservationPlaced) {
    let reservation_id = ReservationId::new();
    let local_now = calendar::to_local(now, terms.utc_offset);
    let expires_at = calendar::add_business_days(local_now, terms.reservation_hold_business_days)
        .with_timezone(&Utc);

    let reservation = Reservation {
        reservation_id,
        borrower_id,
        copy,
        created_at: now,
        expires_at,
        state: ReservationState::Pending,
    };

    let event = ReservationPlaced {
        reservation_id,
        borrower_id,
        copy,
        created_at: now,
        expires_at,
    };

    (reservation, event)
}

/// 純粋関数：予約を確定し、貸出に変換する
///
/// ビジネスルール：
/// - 保留中のみ確定可能
/// - 同じ利用者・同じ所蔵品の貸出を開始する
/// - 返却期限は確定時点で通常の貸出と同じ規則で計算する
/// - 貸出方針は予約作成時に評価済みのため再評価しない
pub fn confirm_reservation(
    reservation: &Reservation,
    confirmed_at: DateTime<Utc>,
    terms: &LendingTerms,
) -> Result<(Reservation, Loan, ReservationConfirmed, LoanOpened), ReservationError> {
    if !reservation.is_pending() {
        return Err(ReservationError::NotPending);
    }

    let (new_loan, opened) = loan::open_loan(
        reservation.borrower_id,
        reservation.copy,
        Some(reservation.reservation_id),
        confirmed_at,
        terms,
    );

    let completed = Reservation {
        state: ReservationState::Completed,
        ..reservation.clone()
    };

    let event = ReservationConfirmed {
        reservation_id: reservation.reservation_id,
        loan_id: new_loan.loan_id,
        confirmed_at,
    };

    Ok((completed, new_loan, event, opened))
}

/// 純粋関数：予約を取り消す
///
/// 保留中のみ取消可能。所蔵品の解放は呼び出し側が台帳に対して行う。
pub fn cancel_reservation(
    reservation: &Reservation,
    reason: CancellationReason,
    cancelled_at: DateTime<Utc>,
) -> Result<(Reservation, ReservationCancelled), ReservationError> {
    if !reservation.is_pending() {
        return Err(ReservationError::NotPending);
    }

    let cancelled = Reservation {
        state: ReservationState::Cancelled,
        ..reservation.clone()
    };

    let event = ReservationCancelled {
        reservation_id: reservation.reservation_id,
        copy: reservation.copy,
        reason,
        cancelled_at,
    };

    Ok((cancelled, event))
}

/// 純粋関数：保持期限切れか判定する
pub fn is_expired(reservation: &Reservation, now: DateTime<Utc>) -> bool {
    reservation.is_pending() && reservation.expires_at < now
}
