use crate::domain::{BorrowerId, Reservation, ReservationId, ReservationState};
use crate::ports::{ReservationRepository as ReservationRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{copy_ref_from_row, parse_column};

/// PostgreSQLの行データをReservationに変換する
fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    Ok(Reservation {
        reservation_id: ReservationId::from_uuid(row.try_get("reservation_id")?),
        borrower_id: BorrowerId::from_uuid(row.try_get("borrower_id")?),
        copy: copy_ref_from_row(row, "copy_kind", "copy_id")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
        state: parse_column(row, "state")?,
    })
}

/// ReservationRepositoryのPostgreSQL実装
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepositoryTrait for ReservationRepository {
    async fn insert(&self, reservation: Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id, borrower_id, copy_kind, copy_id, created_at, expires_at, state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.borrower_id.value())
        .bind(reservation.copy.kind().as_str())
        .bind(reservation.copy.id().value())
        .bind(reservation.created_at)
        .bind(reservation.expires_at)
        .bind(reservation.state.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 状態を条件付きで更新（state = expected の行のみ）
    async fn update(&self, reservation: Reservation, expected: ReservationState) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET state = $2
            WHERE reservation_id = $1 AND state = $3
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.state.as_str())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT reservation_id, borrower_id, copy_kind, copy_id, created_at, expires_at, state
            FROM reservations
            WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn find_pending_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, borrower_id, copy_kind, copy_id, created_at, expires_at, state
            FROM reservations
            WHERE borrower_id = $1 AND state = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(borrower_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }

    async fn find_pending(&self) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, borrower_id, copy_kind, copy_id, created_at, expires_at, state
            FROM reservations
            WHERE state = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }

    /// (expires_at) WHERE pending の部分インデックスを使用
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, borrower_id, copy_kind, copy_id, created_at, expires_at, state
            FROM reservations
            WHERE state = 'pending' AND expires_at < $1
            ORDER BY expires_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }
}
