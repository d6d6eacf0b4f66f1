use crate::domain::{Borrower, BorrowerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 利用者リポジトリポート
///
/// 貸出コンテキストが参照する利用者情報と、貸出停止期限を保持する。
#[async_trait]
pub trait BorrowerRepository: Send + Sync {
    /// IDで利用者を取得する
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>>;

    /// 利用者を保存する（新規はINSERT、既存はUPDATE）
    async fn save(&self, borrower: Borrower) -> Result<()>;

    /// 国民IDまたはメールアドレスが既に登録されているか
    async fn identity_taken(&self, national_id: &str, email: &str) -> Result<bool>;

    /// `at` 時点で貸出停止中の利用者を、停止期限の近い順に返す
    async fn find_sanctioned(&self, at: DateTime<Utc>) -> Result<Vec<Borrower>>;
}
