use crate::domain::{
    self, Borrower, BorrowerError, BorrowerId, DomainEvent, NewBorrower, sanction,
};
use chrono::{DateTime, Utc};

use super::ServiceDependencies;
use super::errors::{BorrowingError, Result};
use super::journal;

/// 利用者を登録する
///
/// ビジネスルール：
/// - 学級は生徒の場合のみ、かつ必須
/// - 国民ID・メールアドレスは一意
pub async fn register_borrower(deps: &ServiceDependencies, input: NewBorrower) -> Result<Borrower> {
    let borrower = domain::borrower::register_borrower(input).map_err(|e| {
        BorrowingError::InvalidInput(
            match e {
                BorrowerError::CourseRequired => "Students must have a course",
                BorrowerError::CourseNotAllowed => "Only students may have a course",
            }
            .to_string(),
        )
    })?;

    let taken = deps
        .borrower_repository
        .identity_taken(&borrower.national_id, &borrower.email)
        .await
        .map_err(BorrowingError::Storage)?;

    if taken {
        return Err(BorrowingError::InvalidInput(
            "A borrower with this national id or email already exists".to_string(),
        ));
    }

    deps.borrower_repository
        .save(borrower.clone())
        .await
        .map_err(BorrowingError::Storage)?;

    tracing::info!(
        borrower_id = %borrower.borrower_id,
        role = borrower.role.as_str(),
        "Borrower registered"
    );

    Ok(borrower)
}

/// 貸出停止を解除する（管理者操作）
pub async fn clear_sanction(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
    cleared_at: DateTime<Utc>,
) -> Result<Borrower> {
    let borrower = deps
        .borrower_repository
        .get_by_id(borrower_id)
        .await
        .map_err(BorrowingError::Storage)?
        .ok_or(BorrowingError::BorrowerNotFound)?;

    let previous = borrower.suspended_until;
    let (cleared, event) = sanction::clear_sanction(&borrower, cleared_at);

    deps.borrower_repository
        .save(cleared.clone())
        .await
        .map_err(BorrowingError::Storage)?;

    journal::record(deps, vec![DomainEvent::SanctionCleared(event)]).await;

    tracing::info!(%borrower_id, previous = ?previous, "Sanction cleared");

    Ok(cleared)
}

/// 貸出停止中の利用者一覧（停止期限の近い順）
pub async fn list_sanctioned_borrowers(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> Result<Vec<Borrower>> {
    deps.borrower_repository
        .find_sanctioned(now)
        .await
        .map_err(BorrowingError::Storage)
}
