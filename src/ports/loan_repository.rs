use crate::domain::{BorrowerId, Loan, LoanId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 貸出リポジトリポート
///
/// 延滞は保存しない。延滞の判定は読み取り時に行う。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 新しい貸出を追加する
    async fn insert(&self, loan: Loan) -> Result<()>;

    /// 貸出を条件付きで更新する
    ///
    /// 保存済みの state と due_date が `expected` と一致する場合のみ書き込み、`true` を返す。
    /// 読み込み後に他の操作（返却・延長）が先に確定していた場合は何もせず `false` を返す。
    async fn update(&self, loan: Loan, expected: &Loan) -> Result<bool>;

    /// IDで貸出を取得する
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 利用者の貸出中の貸出を取得する
    ///
    /// 貸出方針の評価（保持中の所蔵品）に使用される。
    async fn find_active_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>>;

    /// 利用者の全貸出を新しい順に取得する
    async fn find_by_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>>;

    /// 延滞中の貸出を返却期限の古い順に取得する
    ///
    /// state が active かつ due_date < now の貸出。
    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>>;
}
