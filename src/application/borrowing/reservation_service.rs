use crate::domain::{
    self, BorrowerId, CancellationReason, CopyState, DomainEvent, Loan, Reservation,
    ReservationError, ReservationId, ReservationState, commands::*,
};
use chrono::{DateTime, Utc};

use super::ServiceDependencies;
use super::eligibility::check_eligibility;
use super::errors::{BorrowingError, Result};
use super::{journal, ledger};

async fn load_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    deps.reservation_repository
        .get_by_id(reservation_id)
        .await
        .map_err(BorrowingError::Storage)?
        .ok_or(BorrowingError::ReservationNotFound)
}

/// 所蔵品を予約する
///
/// ビジネスルール：
/// - 貸出と同じ利用者の検証・貸出方針を適用する
/// - 所蔵品が貸出可能であること
/// - 保持期限は作成から2営業日
pub async fn create_reservation(
    deps: &ServiceDependencies,
    cmd: CreateReservation,
) -> Result<Reservation> {
    // 1. 事前検証（副作用なし）
    let eligible = check_eligibility(deps, cmd.borrower_id, cmd.copy, cmd.requested_at).await?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (reservation, event) = domain::reservation::place_reservation(
        eligible.borrower.borrower_id,
        cmd.copy,
        cmd.requested_at,
        &deps.terms,
    );

    // 3. 台帳を更新（available → reserved）
    let transition = ledger::mark_reserved(&deps.copy_ledger, cmd.copy, cmd.requested_at).await?;

    // 4. 予約を保存（失敗時は補償）
    if let Err(e) = deps.reservation_repository.insert(reservation.clone()).await {
        ledger::revert(&deps.copy_ledger, &transition, cmd.requested_at).await;
        return Err(BorrowingError::Storage(e));
    }

    journal::record(deps, vec![DomainEvent::ReservationPlaced(event)]).await;

    tracing::info!(
        reservation_id = %reservation.reservation_id,
        borrower_id = %reservation.borrower_id,
        copy_id = %reservation.copy.id(),
        expires_at = %reservation.expires_at,
        "Reservation created"
    );

    Ok(reservation)
}

/// 予約を確定し、貸出に変換する
///
/// ビジネスルール：
/// - 予約が保留中であること（それ以外は NotFound）
/// - 返却期限は確定時点から通常の貸出と同じ規則で計算する
/// - 貸出方針は再評価しない（予約時に評価済み）
///
/// 書き込み順は 予約 → 台帳 → 貸出。予約の条件付き更新に勝った要求だけが先へ進み、
/// 後続の失敗時は台帳と予約を元に戻して再試行できる状態にする。
pub async fn confirm_reservation(deps: &ServiceDependencies, cmd: ConfirmReservation) -> Result<Loan> {
    let reservation = load_reservation(deps, cmd.reservation_id).await?;

    let (completed, loan, confirmed, opened) =
        domain::reservation::confirm_reservation(&reservation, cmd.confirmed_at, &deps.terms)
            .map_err(|e| match e {
                ReservationError::NotPending => BorrowingError::ReservationNotPending,
            })?;

    // 1. 予約を確定（pending → completed）
    close_pending(deps, completed).await?;

    // 2. 台帳を更新（reserved → loaned）
    let transition = match ledger::mark_loaned(
        &deps.copy_ledger,
        reservation.copy,
        CopyState::Reserved,
        cmd.confirmed_at,
    )
    .await
    {
        Ok(transition) => transition,
        Err(e) => {
            reopen(deps, &reservation, ReservationState::Completed).await;
            return Err(e);
        }
    };

    // 3. 貸出を保存
    if let Err(e) = deps.loan_repository.insert(loan.clone()).await {
        ledger::revert(&deps.copy_ledger, &transition, cmd.confirmed_at).await;
        reopen(deps, &reservation, ReservationState::Completed).await;
        return Err(BorrowingError::Storage(e));
    }

    journal::record_each(
        deps,
        vec![
            DomainEvent::ReservationConfirmed(confirmed),
            DomainEvent::LoanOpened(opened),
        ],
    )
    .await;

    tracing::info!(
        reservation_id = %reservation.reservation_id,
        loan_id = %loan.loan_id,
        due_date = %loan.due_date,
        "Reservation confirmed"
    );

    Ok(loan)
}

/// 保留中の予約を確定・取消状態にする
///
/// 既に他の操作で閉じられていれば NotPending。
async fn close_pending(deps: &ServiceDependencies, closed: Reservation) -> Result<()> {
    let reservation_id = closed.reservation_id;
    let updated = deps
        .reservation_repository
        .update(closed, ReservationState::Pending)
        .await
        .map_err(BorrowingError::Storage)?;

    if !updated {
        tracing::warn!(%reservation_id, "Reservation closed concurrently");
        return Err(BorrowingError::ReservationNotPending);
    }
    Ok(())
}

/// 補償処理：閉じた予約を保留中に戻す
async fn reopen(deps: &ServiceDependencies, pending: &Reservation, from: ReservationState) {
    let reservation_id = pending.reservation_id;
    match deps.reservation_repository.update(pending.clone(), from).await {
        Ok(true) => tracing::warn!(%reservation_id, "Reopened reservation after failed write"),
        Ok(false) => tracing::error!(
            %reservation_id,
            "Could not reopen reservation: state changed in the meantime"
        ),
        Err(e) => tracing::error!(
            %reservation_id,
            error = %e,
            "Could not reopen reservation"
        ),
    }
}

/// 予約を取り消す（管理者操作）
///
/// 保留中でなければ NotFound。所蔵品は貸出可能に戻る。
pub async fn cancel_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
    cancelled_at: DateTime<Utc>,
) -> Result<Reservation> {
    cancel(
        deps,
        CancelReservation {
            reservation_id,
            requested_by: None,
            cancelled_at,
        },
    )
    .await
}

/// 自分の予約を取り消す（本人操作）
///
/// - 予約が存在しなければ NotFound
/// - 他の利用者の予約であれば Forbidden
/// - 保留中でなければ BadRequest
pub async fn cancel_my_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
    requester: BorrowerId,
    cancelled_at: DateTime<Utc>,
) -> Result<Reservation> {
    cancel(
        deps,
        CancelReservation {
            reservation_id,
            requested_by: Some(requester),
            cancelled_at,
        },
    )
    .await
}

async fn cancel(deps: &ServiceDependencies, cmd: CancelReservation) -> Result<Reservation> {
    let reservation = load_reservation(deps, cmd.reservation_id).await?;

    let reason = match cmd.requested_by {
        Some(requester) => {
            if reservation.borrower_id != requester {
                tracing::warn!(
                    reservation_id = %reservation.reservation_id,
                    %requester,
                    "Rejected cancellation of another borrower's reservation"
                );
                return Err(BorrowingError::NotReservationOwner);
            }
            CancellationReason::ByBorrower
        }
        None => CancellationReason::ByAdmin,
    };

    let cancelled = release(deps, &reservation, reason, cmd.cancelled_at)
        .await
        .map_err(|e| match (e, cmd.requested_by) {
            (BorrowingError::ReservationNotPending, Some(_)) => BorrowingError::ReservationClosed,
            (e, _) => e,
        })?;

    Ok(cancelled)
}

/// 予約を取り消し、所蔵品を解放する
///
/// 取消系の操作（管理者・本人・期限切れ）で共通。
/// 予約の条件付き更新を先に行うため、古い読み込み結果による取消は
/// 所蔵品に触れる前に NotPending で止まる。
pub(super) async fn release(
    deps: &ServiceDependencies,
    reservation: &Reservation,
    reason: CancellationReason,
    cancelled_at: DateTime<Utc>,
) -> Result<Reservation> {
    let (cancelled, event) =
        domain::reservation::cancel_reservation(reservation, reason, cancelled_at).map_err(
            |e| match e {
                ReservationError::NotPending => BorrowingError::ReservationNotPending,
            },
        )?;

    // 1. 予約を取消（pending → cancelled）
    close_pending(deps, cancelled.clone()).await?;

    // 2. 台帳を更新（reserved → available）
    if let Err(e) = ledger::mark_available(
        &deps.copy_ledger,
        reservation.copy,
        CopyState::Reserved,
        cancelled_at,
    )
    .await
    {
        reopen(deps, reservation, ReservationState::Cancelled).await;
        return Err(e);
    }

    journal::record(deps, vec![DomainEvent::ReservationCancelled(event)]).await;

    tracing::info!(
        reservation_id = %cancelled.reservation_id,
        copy_id = %cancelled.copy.id(),
        reason = ?reason,
        "Reservation cancelled"
    );

    Ok(cancelled)
}

/// 予約の履歴（作成・確定・取消）を記録順に取得する
pub async fn get_reservation_history(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Vec<DomainEvent>> {
    let reservation = load_reservation(deps, reservation_id).await?;
    journal::history(deps, reservation.reservation_id.value()).await
}

/// 保留中の予約一覧（新しい順）
pub async fn list_pending_reservations(deps: &ServiceDependencies) -> Result<Vec<Reservation>> {
    deps.reservation_repository
        .find_pending()
        .await
        .map_err(BorrowingError::Storage)
}

/// 利用者の保留中の予約一覧（新しい順）
pub async fn list_reservations_for_borrower(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
) -> Result<Vec<Reservation>> {
    deps.reservation_repository
        .find_pending_for_borrower(borrower_id)
        .await
        .map_err(BorrowingError::Storage)
}
