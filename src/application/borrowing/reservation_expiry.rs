use crate::domain::{CancellationReason, reservation};
use chrono::{DateTime, Utc};

use super::ServiceDependencies;
use super::errors::{BorrowingError, ErrorKind, Result};
use super::reservation_service::release;

/// 予約の期限切れ処理バッチ
///
/// 保持期限（expires_at）を過ぎた保留中の予約を取り消し、所蔵品を解放する。
/// 明示的に呼び出すか、設定がある場合のみ定期実行される。
///
/// ビジネスルール：
/// - 保留中かつ expires_at < now の予約のみ対象
/// - 処理中に他の操作で確定・取消された予約はスキップする
///
/// # 戻り値
/// 期限切れとして取り消した予約の件数
pub async fn expire_reservations(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let mut expired_count = 0;

    // 1. 期限切れ候補を取得
    let candidates = deps
        .reservation_repository
        .find_expired(now)
        .await
        .map_err(BorrowingError::Storage)?;

    // 2. 各候補を取り消す
    for candidate in candidates {
        if !reservation::is_expired(&candidate, now) {
            continue;
        }

        match release(deps, &candidate, CancellationReason::Expired, now).await {
            Ok(_) => expired_count += 1,
            // 同時に確定・取消された場合はスキップ
            Err(e) if matches!(e.kind(), ErrorKind::Conflict | ErrorKind::NotFound) => {
                tracing::warn!(
                    reservation_id = %candidate.reservation_id,
                    error = %e,
                    "Skipped expiring reservation"
                );
            }
            Err(e) => return Err(e),
        }
    }

    if expired_count > 0 {
        tracing::info!(expired_count, "Expired pending reservations");
    }

    Ok(expired_count)
}
