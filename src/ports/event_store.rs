use crate::domain::DomainEvent;
use async_trait::async_trait;
use uuid::Uuid;

use super::Result;

/// イベントストアポート（貸出ジャーナル）
///
/// 貸出・予約・貸出停止の各遷移をドメインイベントとして記録する。
/// イベントは追記専用ログに保存される不変の事実。
/// 集約の現在状態は各リポジトリが持ち、ここは履歴の記録に専念する。
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 集約のイベントを追加する
    ///
    /// イベントの順序は保持される。
    async fn append(&self, aggregate_id: Uuid, events: Vec<DomainEvent>) -> Result<()>;

    /// 集約のすべてのイベントを追加された順に読み込む
    ///
    /// 貸出・予約の履歴照会に使用される。
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<DomainEvent>>;
}
