use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BorrowerId, CopyRef, CopyState, ItemKind, LendingTerms, LoanId, LoanOpened, LoanRenewed,
    LoanReturned, RenewLoanError, RenewalDays, ReservationId, ReturnCondition, ReturnLoanError,
    calendar,
};

/// 貸出の状態（永続化される値）
///
/// 延滞は保存しない。読み取り時に `display_status` で導出する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    /// 貸出中
    Active,
    /// 返却済み
    Returned,
}

impl LoanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Active => "active",
            LoanState::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanState::Active),
            "returned" => Ok(LoanState::Returned),
            _ => Err(format!("Invalid loan state: {}", s)),
        }
    }
}

/// 表示用の貸出状態（延滞を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanDisplayStatus {
    Active,
    Overdue,
    Returned,
}

impl LoanDisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanDisplayStatus::Active => "active",
            LoanDisplayStatus::Overdue => "overdue",
            LoanDisplayStatus::Returned => "returned",
        }
    }
}

/// Loan集約 - 1点の所蔵品の1回の貸出
///
/// 削除されず、履歴として残る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    // 識別子
    pub loan_id: LoanId,

    // 他の集約への参照（IDのみ）
    pub borrower_id: BorrowerId,
    pub copy: CopyRef,
    pub reservation_id: Option<ReservationId>,

    // 貸出管理の責務
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub state: LoanState,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 純粋関数：返却期限を計算する
///
/// ビジネスルール：
/// - 書籍：貸出時刻から10営業日後
/// - 備品：17時前なら当日17時、それ以降なら翌営業日の17時
///
/// 判定はすべて図書館の現地時刻で行う。
pub fn compute_due_date(kind: ItemKind, now: DateTime<Utc>, terms: &LendingTerms) -> DateTime<Utc> {
    let local_now = calendar::to_local(now, terms.utc_offset);

    let due = match kind {
        ItemKind::BookCopy => {
            calendar::add_business_days(local_now, terms.book_loan_business_days)
        }
        ItemKind::ResourceInstance => {
            let cutoff_today = calendar::at_local_hour(
                local_now.date_naive(),
                terms.resource_due_hour,
                terms.utc_offset,
            );
            if local_now < cutoff_today {
                cutoff_today
            } else {
                let next_day = calendar::add_business_days(local_now, 1);
                calendar::at_local_hour(
                    next_day.date_naive(),
                    terms.resource_due_hour,
                    terms.utc_offset,
                )
            }
        }
    };

    due.with_timezone(&Utc)
}

/// 純粋関数：貸出を開始する
///
/// ビジネスルール：
/// - 状態はActive、開始日時は now
/// - 返却期限は `compute_due_date` に従う
///
/// 副作用なし。新しいLoanとイベントを返す。
pub fn open_loan(
    borrower_id: BorrowerId,
    copy: CopyRef,
    reservation_id: Option<ReservationId>,
    now: DateTime<Utc>,
    terms: &LendingTerms,
) -> (Loan, LoanOpened) {
    let loan_id = LoanId::new();
    let due_date = compute_due_date(copy.kind(), now, terms);

    let loan = Loan {
        loan_id,
        borrower_id,
        copy,
        reservation_id,
        start_date: now,
        due_date,
        return_date: None,
        state: LoanState::Active,
        created_at: now,
        updated_at: now,
    };

    let event = LoanOpened {
        loan_id,
        borrower_id,
        copy,
        start_date: now,
        due_date,
        reservation_id,
    };

    (loan, event)
}

/// 純粋関数：貸出を延長する
///
/// ビジネスルール：
/// - 延長日数は1以上の整数
/// - 返却済みは延長不可（延滞中のActiveは延長可）
/// - 新しい返却期限 = 現在の返却期限 + 延長日数（営業日）
/// - 貸出上限の再評価はしない（新規の貸出ではないため）
///
/// 副作用なし。新しいLoanとイベントを返す。
pub fn renew_loan(
    loan: &Loan,
    extra_days: i64,
    renewed_at: DateTime<Utc>,
    terms: &LendingTerms,
) -> Result<(Loan, LoanRenewed), RenewLoanError> {
    // バリデーション：延長日数
    let days = RenewalDays::try_from(extra_days)?;

    // バリデーション：返却済みは延長不可
    if loan.state == LoanState::Returned {
        return Err(RenewLoanError::AlreadyReturned);
    }

    let old_due_date = loan.due_date;
    let local_due = calendar::to_local(old_due_date, terms.utc_offset);
    let new_due_date = calendar::add_business_days(local_due, days.value()).with_timezone(&Utc);

    let new_loan = Loan {
        due_date: new_due_date,
        updated_at: renewed_at,
        ..loan.clone()
    };

    let event = LoanRenewed {
        loan_id: loan.loan_id,
        old_due_date,
        new_due_date,
        extra_days: days.value(),
        renewed_at,
    };

    Ok((new_loan, event))
}

/// 純粋関数：貸出を返却する
///
/// ビジネスルール：
/// - 延滞していても返却は受け付ける（貸出停止は sanction 側の責務）
/// - 所蔵品の最終状態は 利用可能・破損・紛失 から選ぶ
///
/// 副作用なし。新しいLoanとイベントを返す。
pub fn return_loan(
    loan: &Loan,
    returned_at: DateTime<Utc>,
    final_state: ReturnCondition,
) -> Result<(Loan, LoanReturned), ReturnLoanError> {
    // バリデーション：既に返却済みは不可
    if loan.state == LoanState::Returned {
        return Err(ReturnLoanError::AlreadyReturned);
    }

    let was_overdue = returned_at > loan.due_date;

    let new_loan = Loan {
        return_date: Some(returned_at),
        state: LoanState::Returned,
        updated_at: returned_at,
        ..loan.clone()
    };

    let event = LoanReturned {
        loan_id: loan.loan_id,
        borrower_id: loan.borrower_id,
        copy: loan.copy,
        returned_at,
        final_state: CopyState::from(final_state),
        was_overdue,
    };

    Ok((new_loan, event))
}

/// 純粋関数：延滞判定
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.state == LoanState::Active && loan.due_date < now
}

/// 純粋関数：表示用の状態を導出する
///
/// 保存はしない。常に現在時刻と整合する。
pub fn display_status(loan: &Loan, now: DateTime<Utc>) -> LoanDisplayStatus {
    match loan.state {
        LoanState::Returned => LoanDisplayStatus::Returned,
        LoanState::Active if is_overdue(loan, now) => LoanDisplayStatus::Overdue,
        LoanState::Active => LoanDisplayStatus::Active,
    }
}
