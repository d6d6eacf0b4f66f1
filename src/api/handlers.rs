use crate::application::borrowing::{self, ServiceDependencies};
use crate::domain::{
    BorrowerId, CopyId, CopyRef, CopyState, ItemKind, LoanId, MAX_RENEWAL_DAYS, ReservationId,
    ReturnCondition, TitleId, commands::*,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{error::ApiError, types::*};

/// 本人操作の利用者IDを運ぶヘッダー（上流の認証層が設定する）
pub const BORROWER_ID_HEADER: &str = "x-borrower-id";

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_copy_ref(kind: &str, id: Uuid) -> Result<CopyRef, ApiError> {
    let kind: ItemKind = kind.parse().map_err(ApiError::BadRequest)?;
    Ok(CopyRef::new(kind, CopyId::from_uuid(id)))
}

fn requester_from_headers(headers: &HeaderMap) -> Result<BorrowerId, ApiError> {
    let value = headers
        .get(BORROWER_ID_HEADER)
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {} header", BORROWER_ID_HEADER)))?;

    value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(BorrowerId::from_uuid)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} header", BORROWER_ID_HEADER)))
}

/// 延長日数を検証する（JSONの整数のみ受け付ける）
fn parse_extra_days(value: &serde_json::Value) -> Result<i64, ApiError> {
    value.as_i64().ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Renewal days must be a positive integer up to {} (got {})",
            MAX_RENEWAL_DAYS, value
        ))
    })
}

// ============================================================================
// Loans
// ============================================================================

/// POST /loans - 新しい貸出を作成
///
/// 強制されるビジネスルール:
/// - 利用者が存在し、貸出停止中でないこと
/// - 役割ごとの貸出方針を満たすこと
/// - 所蔵品が貸出可能であること
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let now = Utc::now();
    let loan = borrowing::create_loan(&state.service_deps, req.to_loan_command(now)).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from_loan(&loan, now))))
}

/// POST /loans/:id/return - 貸出を返却
///
/// 延滞返却の場合は貸出停止が科され、レスポンスに含まれる。
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<ReturnLoanRequest>,
) -> Result<Json<LoanReturnedResponse>, ApiError> {
    let final_state: ReturnCondition = req.final_state.parse().map_err(ApiError::BadRequest)?;
    let now = Utc::now();

    let cmd = ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
        final_state,
        notes: req.notes,
        returned_at: now,
    };

    let outcome = borrowing::return_loan(&state.service_deps, cmd).await?;

    Ok(Json(LoanReturnedResponse::from_outcome(&outcome, now)))
}

/// POST /loans/:id/renew - 貸出を延長
pub async fn renew_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<RenewLoanRequest>,
) -> Result<Json<LoanResponse>, ApiError> {
    let extra_days = parse_extra_days(&req.extra_days)?;
    let now = Utc::now();

    let cmd = RenewLoan {
        loan_id: LoanId::from_uuid(loan_id),
        extra_days,
        renewed_at: now,
    };

    let loan = borrowing::renew_loan(&state.service_deps, cmd).await?;

    Ok(Json(LoanResponse::from_loan(&loan, now)))
}

/// GET /loans/:id - 貸出詳細をIDで取得
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = borrowing::get_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;

    Ok(Json(LoanResponse::from_loan(&loan, Utc::now())))
}

/// GET /loans/:id/history - 貸出の履歴
pub async fn get_loan_history(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let events =
        borrowing::get_loan_history(&state.service_deps, LoanId::from_uuid(loan_id)).await?;

    Ok(Json(events.into_iter().map(HistoryEntryResponse::from).collect()))
}

/// GET /loans?borrower_id= - 利用者の貸出一覧（新しい順）
///
/// borrower_id は必須。
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BorrowerQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let borrower_id = query.borrower_id.ok_or_else(|| {
        ApiError::BadRequest("borrower_id query parameter is required".to_string())
    })?;

    let loans =
        borrowing::list_loans_for_borrower(&state.service_deps, BorrowerId::from_uuid(borrower_id))
            .await?;

    let now = Utc::now();
    Ok(Json(
        loans
            .iter()
            .map(|loan| LoanResponse::from_loan(loan, now))
            .collect(),
    ))
}

/// GET /loans/overdue - 延滞中の貸出一覧（返却期限の古い順）
pub async fn list_overdue_loans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let now = Utc::now();
    let loans = borrowing::list_overdue_loans(&state.service_deps, now).await?;

    Ok(Json(
        loans
            .iter()
            .map(|loan| LoanResponse::from_loan(loan, now))
            .collect(),
    ))
}

// ============================================================================
// Reservations
// ============================================================================

/// POST /reservations - 所蔵品を予約
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let cmd = req.to_reservation_command(Utc::now());
    let reservation = borrowing::create_reservation(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::from(&reservation)),
    ))
}

/// GET /reservations - 保留中の予約一覧
///
/// borrower_id が指定された場合はその利用者の予約のみ。
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BorrowerQuery>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let reservations = match query.borrower_id {
        Some(borrower_id) => {
            borrowing::list_reservations_for_borrower(
                &state.service_deps,
                BorrowerId::from_uuid(borrower_id),
            )
            .await?
        }
        None => borrowing::list_pending_reservations(&state.service_deps).await?,
    };

    Ok(Json(
        reservations.iter().map(ReservationResponse::from).collect(),
    ))
}

/// GET /reservations/:id/history - 予約の履歴
pub async fn get_reservation_history(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let events = borrowing::get_reservation_history(
        &state.service_deps,
        ReservationId::from_uuid(reservation_id),
    )
    .await?;

    Ok(Json(events.into_iter().map(HistoryEntryResponse::from).collect()))
}

/// POST /reservations/:id/confirm - 予約を確定し貸出を作成
pub async fn confirm_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let now = Utc::now();
    let cmd = ConfirmReservation {
        reservation_id: ReservationId::from_uuid(reservation_id),
        confirmed_at: now,
    };

    let loan = borrowing::confirm_reservation(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from_loan(&loan, now))))
}

/// POST /reservations/:id/cancel - 予約を取り消す（管理者）
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = borrowing::cancel_reservation(
        &state.service_deps,
        ReservationId::from_uuid(reservation_id),
        Utc::now(),
    )
    .await?;

    Ok(Json(ReservationResponse::from(&reservation)))
}

/// DELETE /reservations/:id - 自分の予約を取り消す
///
/// 要求者は x-borrower-id ヘッダーで渡される。
pub async fn cancel_my_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let requester = requester_from_headers(&headers)?;

    borrowing::cancel_my_reservation(
        &state.service_deps,
        ReservationId::from_uuid(reservation_id),
        requester,
        Utc::now(),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /reservations/expire - 期限切れの予約を取り消す
pub async fn expire_reservations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExpireReservationsResponse>, ApiError> {
    let expired = borrowing::expire_reservations(&state.service_deps, Utc::now()).await?;

    Ok(Json(ExpireReservationsResponse { expired }))
}

// ============================================================================
// Borrowers
// ============================================================================

/// POST /borrowers - 利用者を登録
pub async fn register_borrower(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterBorrowerRequest>,
) -> Result<(StatusCode, Json<BorrowerResponse>), ApiError> {
    let borrower = borrowing::register_borrower(&state.service_deps, req.into()).await?;

    Ok((StatusCode::CREATED, Json(BorrowerResponse::from(&borrower))))
}

/// GET /borrowers/sanctioned - 貸出停止中の利用者一覧
pub async fn list_sanctioned_borrowers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BorrowerResponse>>, ApiError> {
    let borrowers = borrowing::list_sanctioned_borrowers(&state.service_deps, Utc::now()).await?;

    Ok(Json(borrowers.iter().map(BorrowerResponse::from).collect()))
}

/// DELETE /borrowers/:id/sanction - 貸出停止を解除
pub async fn clear_sanction(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<Uuid>,
) -> Result<Json<BorrowerResponse>, ApiError> {
    let borrower = borrowing::clear_sanction(
        &state.service_deps,
        BorrowerId::from_uuid(borrower_id),
        Utc::now(),
    )
    .await?;

    Ok(Json(BorrowerResponse::from(&borrower)))
}

// ============================================================================
// Inventory
// ============================================================================

/// POST /titles/:id/copies - タイトルに所蔵品を追加
pub async fn add_copies(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<Uuid>,
    Json(req): Json<AddCopiesRequest>,
) -> Result<(StatusCode, Json<Vec<CopyResponse>>), ApiError> {
    let cmd = AddCopies {
        title_id: TitleId::from_uuid(title_id),
        kind: req.kind,
        count: req.count,
        added_at: Utc::now(),
    };

    let copies = borrowing::add_copies(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(copies.iter().map(CopyResponse::from).collect()),
    ))
}

/// PUT /copies/:kind/:id/state - 所蔵品の状態を変更（管理者）
pub async fn override_copy_state(
    State(state): State<Arc<AppState>>,
    Path((kind, copy_id)): Path<(String, Uuid)>,
    Json(req): Json<OverrideCopyStateRequest>,
) -> Result<Json<CopyResponse>, ApiError> {
    let copy = parse_copy_ref(&kind, copy_id)?;
    let to: CopyState = req.state.parse().map_err(ApiError::BadRequest)?;

    let cmd = OverrideCopyState {
        copy,
        to,
        notes: req.notes,
    };

    let record = borrowing::override_copy_state(&state.service_deps, cmd, Utc::now()).await?;

    Ok(Json(CopyResponse::from(&record)))
}

/// DELETE /copies/:kind/:id - 所蔵品を除籍
pub async fn decommission_copy(
    State(state): State<Arc<AppState>>,
    Path((kind, copy_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let copy = parse_copy_ref(&kind, copy_id)?;

    borrowing::decommission_copy(&state.service_deps, copy).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /inventory/attention - 要対応の所蔵品一覧
pub async fn items_for_attention(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CopyResponse>>, ApiError> {
    let copies = borrowing::items_for_attention(&state.service_deps).await?;

    Ok(Json(copies.iter().map(CopyResponse::from).collect()))
}
