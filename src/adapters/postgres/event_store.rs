use crate::domain::DomainEvent;
use crate::ports::{EventStore as EventStoreTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of EventStore
///
/// Stores the borrowing journal in an append-only table.
/// Events are serialized as JSONB for flexible schema evolution.
pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    /// Create a new EventStore with a PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStoreTrait for EventStore {
    /// Append events for one aggregate
    ///
    /// All events of a call are stored atomically within a transaction and
    /// numbered with consecutive aggregate versions.
    async fn append(&self, aggregate_id: Uuid, events: Vec<DomainEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        // COALESCE handles NULL when no events exist for this aggregate
        let current_version: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(aggregate_version), 0)
            FROM borrowing_events
            WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut versions = Vec::with_capacity(events.len());
        let mut aggregate_types = Vec::with_capacity(events.len());
        let mut event_types = Vec::with_capacity(events.len());
        let mut event_data_list = Vec::with_capacity(events.len());
        let mut occurred_at_list = Vec::with_capacity(events.len());

        for (i, event) in events.iter().enumerate() {
            versions.push(current_version + (i as i32) + 1);
            aggregate_types.push(event.aggregate_type());
            event_types.push(event.event_type());
            event_data_list.push(serde_json::to_value(event)?);
            occurred_at_list.push(event.occurred_at());
        }

        sqlx::query(
            r#"
            INSERT INTO borrowing_events (
                aggregate_id,
                aggregate_version,
                aggregate_type,
                event_type,
                event_data,
                occurred_at
            )
            SELECT $1, * FROM UNNEST($2::int[], $3::varchar[], $4::varchar[], $5::jsonb[], $6::timestamptz[])
            "#,
        )
        .bind(aggregate_id)
        .bind(&versions)
        .bind(&aggregate_types)
        .bind(&event_types)
        .bind(&event_data_list)
        .bind(&occurred_at_list)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Load the journal of one loan, reservation or borrower in append order
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<DomainEvent>> {
        let payloads: Vec<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT event_data
            FROM borrowing_events
            WHERE aggregate_id = $1
            ORDER BY aggregate_version ASC
            "#,
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await?;

        payloads
            .into_iter()
            .map(|payload| serde_json::from_value(payload).map_err(Into::into))
            .collect()
    }
}
