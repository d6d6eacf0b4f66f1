use crate::domain::{CopyRecord, CopyRef, CopyState, commands::*, copy};
use chrono::{DateTime, Utc};

use super::ServiceDependencies;
use super::errors::{BorrowingError, Result};
use super::ledger;

/// 一度に追加できる所蔵品の上限
const MAX_COPIES_PER_REQUEST: u32 = 500;

/// 要対応の状態
const ATTENTION_STATES: [CopyState; 3] =
    [CopyState::Damaged, CopyState::Lost, CopyState::Maintenance];

async fn load_copy(deps: &ServiceDependencies, copy: CopyRef) -> Result<CopyRecord> {
    deps.copy_ledger
        .get(copy)
        .await
        .map_err(BorrowingError::Storage)?
        .ok_or(BorrowingError::CopyNotFound)
}

/// タイトルに所蔵品を追加する
///
/// 連番は既存の最大番号の次から振る。
pub async fn add_copies(deps: &ServiceDependencies, cmd: AddCopies) -> Result<Vec<CopyRecord>> {
    if cmd.count == 0 || cmd.count > MAX_COPIES_PER_REQUEST {
        return Err(BorrowingError::InvalidInput(format!(
            "Copy count must be between 1 and {}",
            MAX_COPIES_PER_REQUEST
        )));
    }

    let highest = deps
        .copy_ledger
        .highest_number(cmd.title_id, cmd.kind)
        .await
        .map_err(BorrowingError::Storage)?;

    let copies = copy::new_copies(cmd.title_id, cmd.kind, highest, cmd.count, cmd.added_at);

    deps.copy_ledger
        .insert(copies.clone())
        .await
        .map_err(BorrowingError::Storage)?;

    tracing::info!(
        title_id = %cmd.title_id,
        kind = cmd.kind.as_str(),
        count = cmd.count,
        "Copies added"
    );

    Ok(copies)
}

/// 所蔵品の状態を変更する（管理者操作）
///
/// ビジネスルール：
/// - 遷移表に従う（整備中は備品のみ）
/// - 貸出中・予約中は貸出・予約の操作でのみ変化する。管理者は変更できない
pub async fn override_copy_state(
    deps: &ServiceDependencies,
    cmd: OverrideCopyState,
    at: DateTime<Utc>,
) -> Result<CopyRecord> {
    let current = load_copy(deps, cmd.copy).await?;

    for state in [current.state, cmd.to] {
        if matches!(state, CopyState::Loaned | CopyState::Reserved) {
            return Err(BorrowingError::InvalidInput(format!(
                "Copy state {} is managed by loans and reservations",
                state.as_str()
            )));
        }
    }

    ledger::mark_state(
        &deps.copy_ledger,
        cmd.copy,
        current.state,
        cmd.to,
        cmd.notes.as_deref(),
        at,
    )
    .await?;

    tracing::info!(
        copy_id = %cmd.copy.id(),
        from = current.state.as_str(),
        to = cmd.to.as_str(),
        "Copy state overridden"
    );

    load_copy(deps, cmd.copy).await
}

/// 所蔵品を除籍する
///
/// 貸出中・予約中の所蔵品は除籍できない。
pub async fn decommission_copy(deps: &ServiceDependencies, copy: CopyRef) -> Result<()> {
    let current = load_copy(deps, copy).await?;

    copy::check_decommission(&current).map_err(BorrowingError::InvalidCopyOperation)?;

    let removed = deps
        .copy_ledger
        .remove(copy, current.state)
        .await
        .map_err(BorrowingError::Storage)?;

    if !removed {
        return Err(BorrowingError::Conflict { copy });
    }

    tracing::info!(
        copy_id = %copy.id(),
        title_id = %current.title_id,
        number = current.number,
        "Copy decommissioned"
    );

    Ok(())
}

/// 要対応（破損・紛失・整備中）の所蔵品一覧
pub async fn items_for_attention(deps: &ServiceDependencies) -> Result<Vec<CopyRecord>> {
    deps.copy_ledger
        .find_by_states(&ATTENTION_STATES)
        .await
        .map_err(BorrowingError::Storage)
}
