use crate::domain::DomainEvent;
use uuid::Uuid;

use super::ServiceDependencies;
use super::errors::{BorrowingError, Result};

/// 貸出ジャーナルにイベントを記録する
///
/// 集約の状態は既に保存済みのため、記録の失敗は操作全体を失敗させない。
pub(super) async fn record(deps: &ServiceDependencies, events: Vec<DomainEvent>) {
    let Some(first) = events.first() else {
        return;
    };
    let aggregate_id = first.aggregate_id();
    let event_type = first.event_type();

    if let Err(e) = deps.event_store.append(aggregate_id, events).await {
        tracing::warn!(
            %aggregate_id,
            event_type,
            error = %e,
            "Failed to append borrowing journal entry"
        );
    }
}

/// 集約IDごとにまとめて記録する
///
/// 1つの操作で複数の集約に跨るイベント（予約確定 + 貸出開始など）に使用する。
pub(super) async fn record_each(deps: &ServiceDependencies, events: Vec<DomainEvent>) {
    for event in events {
        record(deps, vec![event]).await;
    }
}

/// 集約のジャーナルを記録順に読み込む
///
/// 記録とは異なり、読み込みの失敗はそのままエラーとして返す。
pub(super) async fn history(deps: &ServiceDependencies, aggregate_id: Uuid) -> Result<Vec<DomainEvent>> {
    deps.event_store
        .load(aggregate_id)
        .await
        .map_err(BorrowingError::Storage)
}
