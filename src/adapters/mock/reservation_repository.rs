use crate::domain::{BorrowerId, Reservation, ReservationId, ReservationState};
use crate::ports::{ReservationRepository as ReservationRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;

/// ReservationRepositoryのインメモリ実装
pub struct ReservationRepository {
    reservations: Mutex<HashMap<ReservationId, Reservation>>,
}

impl ReservationRepository {
    pub fn new() -> Self {
        Self {
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// 保留中の予約を新しい順に取得する
    fn pending_newest_first(
        &self,
        filter: impl Fn(&Reservation) -> bool,
    ) -> Result<Vec<Reservation>> {
        let mut found: Vec<Reservation> = lock(&self.reservations)?
            .values()
            .filter(|r| r.is_pending() && filter(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

impl Default for ReservationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationRepositoryTrait for ReservationRepository {
    async fn insert(&self, reservation: Reservation) -> Result<()> {
        let mut reservations = lock(&self.reservations)?;
        if reservations.contains_key(&reservation.reservation_id) {
            return Err(
                format!("reservation {} already exists", reservation.reservation_id).into(),
            );
        }
        reservations.insert(reservation.reservation_id, reservation);
        Ok(())
    }

    async fn update(&self, reservation: Reservation, expected: ReservationState) -> Result<bool> {
        let mut reservations = lock(&self.reservations)?;
        match reservations.get_mut(&reservation.reservation_id) {
            Some(current) if current.state == expected => {
                *current = reservation;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        Ok(lock(&self.reservations)?.get(&reservation_id).cloned())
    }

    async fn find_pending_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Reservation>> {
        self.pending_newest_first(|r| r.borrower_id == borrower_id)
    }

    async fn find_pending(&self) -> Result<Vec<Reservation>> {
        self.pending_newest_first(|_| true)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let mut expired = self.pending_newest_first(|r| r.expires_at < now)?;
        expired.sort_by_key(|r| r.expires_at);
        Ok(expired)
    }
}
