use crate::domain::{CopyRef, CopyState, CopyTransition, copy};
use crate::ports::CopyLedger;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::errors::{BorrowingError, Result};

/// 台帳の状態を遷移させる
///
/// 遷移表で検証したのち、`from` を期待値とする条件付き更新を行う。
/// 現在の状態が `from` でなければ（同時要求に負けた場合を含む）Conflict。
async fn apply(
    ledger: &Arc<dyn CopyLedger>,
    copy: CopyRef,
    from: CopyState,
    to: CopyState,
    notes: Option<&str>,
    at: DateTime<Utc>,
) -> Result<CopyTransition> {
    let transition =
        copy::plan_transition(copy, from, to).map_err(BorrowingError::InvalidCopyOperation)?;

    let applied = ledger
        .compare_and_set(&transition, notes, at)
        .await
        .map_err(BorrowingError::Storage)?;

    if !applied {
        tracing::warn!(
            copy_id = %copy.id(),
            kind = copy.kind().as_str(),
            from = from.as_str(),
            to = to.as_str(),
            "Copy state changed concurrently"
        );
        return Err(BorrowingError::Conflict { copy });
    }

    Ok(transition)
}

/// available / reserved → loaned
pub(super) async fn mark_loaned(
    ledger: &Arc<dyn CopyLedger>,
    copy: CopyRef,
    from: CopyState,
    at: DateTime<Utc>,
) -> Result<CopyTransition> {
    apply(ledger, copy, from, CopyState::Loaned, None, at).await
}

/// available → reserved
pub(super) async fn mark_reserved(
    ledger: &Arc<dyn CopyLedger>,
    copy: CopyRef,
    at: DateTime<Utc>,
) -> Result<CopyTransition> {
    apply(ledger, copy, CopyState::Available, CopyState::Reserved, None, at).await
}

/// reserved / loaned / damaged / lost / maintenance → available
pub(super) async fn mark_available(
    ledger: &Arc<dyn CopyLedger>,
    copy: CopyRef,
    from: CopyState,
    at: DateTime<Utc>,
) -> Result<CopyTransition> {
    apply(ledger, copy, from, CopyState::Available, None, at).await
}

/// 任意の状態へ（返却時の最終状態・管理者操作）
pub(super) async fn mark_state(
    ledger: &Arc<dyn CopyLedger>,
    copy: CopyRef,
    from: CopyState,
    to: CopyState,
    notes: Option<&str>,
    at: DateTime<Utc>,
) -> Result<CopyTransition> {
    apply(ledger, copy, from, to, notes, at).await
}

/// 補償処理：適用済みの遷移を元に戻す
///
/// 後続の保存が失敗したときに呼ぶ。遷移表は経由しない。
pub(super) async fn revert(
    ledger: &Arc<dyn CopyLedger>,
    applied: &CopyTransition,
    at: DateTime<Utc>,
) {
    let undo = CopyTransition {
        copy: applied.copy,
        from: applied.to,
        to: applied.from,
    };

    match ledger.compare_and_set(&undo, None, at).await {
        Ok(true) => tracing::warn!(
            copy_id = %applied.copy.id(),
            restored = applied.from.as_str(),
            "Reverted copy state after failed write"
        ),
        Ok(false) => tracing::error!(
            copy_id = %applied.copy.id(),
            "Could not revert copy state: state changed in the meantime"
        ),
        Err(e) => tracing::error!(
            copy_id = %applied.copy.id(),
            error = %e,
            "Could not revert copy state"
        ),
    }
}
