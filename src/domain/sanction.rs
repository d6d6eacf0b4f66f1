use chrono::{DateTime, Duration, Utc};

use super::{Borrower, LoanId, SanctionApplied, SanctionCleared};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// 純粋関数：貸出停止中か判定する
///
/// suspended_until が設定され、かつ `at` より後の場合のみ停止中。
pub fn is_suspended(borrower: &Borrower, at: DateTime<Utc>) -> bool {
    borrower.suspended_until.is_some_and(|until| until > at)
}

/// 純粋関数：延滞日数を求める
///
/// 返却日時と返却期限の差を日単位で切り上げる。期限内なら0。
pub fn overdue_days(due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    let late_millis = (returned_at - due_date).num_milliseconds();
    if late_millis <= 0 {
        return 0;
    }
    (late_millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// 純粋関数：延滞返却の貸出停止を適用する
///
/// ビジネスルール：
/// - 停止期間は延滞日数と同じ暦日数（営業日ではない）
/// - 起点は返却処理の時刻
/// - 既存の停止期限の方が遅い場合は短縮しない（加算もしない）
///
/// 延滞していない場合は `None` を返す。
pub fn apply_late_return_sanction(
    borrower: &Borrower,
    loan_id: LoanId,
    due_date: DateTime<Utc>,
    returned_at: DateTime<Utc>,
) -> Option<(Borrower, SanctionApplied)> {
    let days = overdue_days(due_date, returned_at);
    if days == 0 {
        return None;
    }

    let sanction_end = returned_at + Duration::days(days);
    let suspended_until = match borrower.suspended_until {
        Some(existing) if existing > sanction_end => existing,
        _ => sanction_end,
    };

    let updated = Borrower {
        suspended_until: Some(suspended_until),
        ..borrower.clone()
    };

    let event = SanctionApplied {
        borrower_id: borrower.borrower_id,
        loan_id,
        overdue_days: days,
        suspended_until,
        applied_at: returned_at,
    };

    Some((updated, event))
}

/// 純粋関数：貸出停止を解除する（管理者操作）
pub fn clear_sanction(borrower: &Borrower, cleared_at: DateTime<Utc>) -> (Borrower, SanctionCleared) {
    let updated = Borrower {
        suspended_until: None,
        ..borrower.clone()
    };

    let event = SanctionCleared {
        borrower_id: borrower.borrower_id,
        cleared_at,
    };

    (updated, event)
}
