use crate::domain::{CopyRecord, CopyRef, CopyState, CopyTransition, ItemKind, TitleId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 所蔵品台帳ポート
///
/// 所蔵品ごとの状態を保持する。
/// 「1点につき有効な貸出・予約は高々1つ」という不変条件は、
/// アプリケーション側のロックではなく、この台帳の条件付き更新で守る。
#[async_trait]
pub trait CopyLedger: Send + Sync {
    /// 所蔵品を取得する
    async fn get(&self, copy: CopyRef) -> Result<Option<CopyRecord>>;

    /// 条件付きで状態を更新する（compare-and-set）
    ///
    /// 現在の状態が `transition.from` の場合のみ `transition.to` に更新し、`true` を返す。
    /// 他の状態だった場合（競合）は何もせず `false` を返す。
    /// `notes` が指定された場合は備考も同時に更新する。
    ///
    /// 遷移表の検証は呼び出し側の責務。
    async fn compare_and_set(
        &self,
        transition: &CopyTransition,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 所蔵品を追加する
    async fn insert(&self, copies: Vec<CopyRecord>) -> Result<()>;

    /// タイトル内の最大の連番
    async fn highest_number(&self, title_id: TitleId, kind: ItemKind) -> Result<Option<u32>>;

    /// 所蔵品を台帳から除く（除籍）
    ///
    /// 現在の状態が `expected` の場合のみ削除し、`true` を返す。
    async fn remove(&self, copy: CopyRef, expected: CopyState) -> Result<bool>;

    /// 指定した状態のいずれかにある所蔵品を返す
    async fn find_by_states(&self, states: &[CopyState]) -> Result<Vec<CopyRecord>>;
}
