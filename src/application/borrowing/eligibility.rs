use crate::domain::{
    Borrower, BorrowerId, CopyRecord, CopyRef,
    policy::{self, Candidate, OutstandingItem},
    sanction,
};
use chrono::{DateTime, Utc};

use super::ServiceDependencies;
use super::errors::{BorrowingError, Result};

/// 貸出・予約の可否を判定した結果
pub(super) struct Eligible {
    pub borrower: Borrower,
    pub copy: CopyRecord,
}

/// 貸出・予約の事前検証
///
/// 貸出と予約で共通。台帳を変更する前に必ず呼び出す（失敗時は副作用なし）。
///
/// 検証の順序：
/// 1. 利用者の存在（NotFound）
/// 2. 貸出停止中でないこと（Forbidden）
/// 3. 所蔵品の存在（NotFound）
/// 4. 貸出方針（Forbidden、理由はそのまま返す）
/// 5. 所蔵品が貸出可能であること（BadRequest）
pub(super) async fn check_eligibility(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
    copy: CopyRef,
    now: DateTime<Utc>,
) -> Result<Eligible> {
    // 1. 利用者の存在確認
    let borrower = deps
        .borrower_repository
        .get_by_id(borrower_id)
        .await
        .map_err(BorrowingError::Storage)?
        .ok_or(BorrowingError::BorrowerNotFound)?;

    // 2. 貸出停止の確認
    if sanction::is_suspended(&borrower, now) {
        if let Some(until) = borrower.suspended_until {
            tracing::warn!(%borrower_id, %until, "Rejected request from suspended borrower");
            return Err(BorrowingError::BorrowerSuspended(until));
        }
    }

    // 3. 所蔵品の存在確認
    let record = deps
        .copy_ledger
        .get(copy)
        .await
        .map_err(BorrowingError::Storage)?
        .ok_or(BorrowingError::CopyNotFound)?;

    // 4. 貸出方針の評価
    let outstanding = outstanding_items(deps, borrower_id).await?;
    let candidate = Candidate {
        copy,
        title_id: record.title_id,
    };

    if let Err(violation) = policy::check(borrower.role, &outstanding, &candidate) {
        tracing::warn!(
            %borrower_id,
            role = borrower.role.as_str(),
            reason = violation.reason(),
            "Borrowing policy rejected request"
        );
        return Err(BorrowingError::PolicyViolation(violation));
    }

    // 5. 貸出可能性の確認
    if !record.is_borrowable() {
        return Err(BorrowingError::CopyNotAvailable(record.state));
    }

    Ok(Eligible {
        borrower,
        copy: record,
    })
}

/// 利用者が保持中の所蔵品（有効な貸出 + 保留中の予約）
///
/// 教員の同一タイトル判定のため、各所蔵品を親タイトルに解決する。
async fn outstanding_items(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
) -> Result<Vec<OutstandingItem>> {
    let loans = deps
        .loan_repository
        .find_active_for_borrower(borrower_id)
        .await
        .map_err(BorrowingError::Storage)?;

    let reservations = deps
        .reservation_repository
        .find_pending_for_borrower(borrower_id)
        .await
        .map_err(BorrowingError::Storage)?;

    let held = loans
        .iter()
        .map(|l| l.copy)
        .chain(reservations.iter().map(|r| r.copy));

    let mut items = Vec::new();
    for copy in held {
        match deps
            .copy_ledger
            .get(copy)
            .await
            .map_err(BorrowingError::Storage)?
        {
            Some(record) => items.push(OutstandingItem {
                copy,
                title_id: record.title_id,
            }),
            None => tracing::warn!(
                %borrower_id,
                copy_id = %copy.id(),
                "Outstanding item refers to a copy missing from the ledger"
            ),
        }
    }

    Ok(items)
}
