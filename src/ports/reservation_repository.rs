use crate::domain::{BorrowerId, Reservation, ReservationId, ReservationState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 予約リポジトリポート
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// 新しい予約を追加する
    async fn insert(&self, reservation: Reservation) -> Result<()>;

    /// 予約を条件付きで更新する
    ///
    /// 保存済みの状態が `expected` の場合のみ書き込み、`true` を返す。
    /// 既に確定・取消された予約を古い読み込み結果で上書きしない。
    async fn update(&self, reservation: Reservation, expected: ReservationState) -> Result<bool>;

    /// IDで予約を取得する
    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    /// 利用者の保留中の予約を新しい順に取得する
    async fn find_pending_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Reservation>>;

    /// 保留中の予約をすべて新しい順に取得する
    async fn find_pending(&self) -> Result<Vec<Reservation>>;

    /// 保持期限切れ（expires_at < now）の保留中の予約を取得する
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>>;
}
