use crate::domain::{CopyRecord, CopyRef, CopyState, CopyTransition, ItemKind, TitleId};
use crate::ports::{CopyLedger as CopyLedgerTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{copy_ref_from_row, invalid_data, parse_column};

/// PostgreSQLの行データをCopyRecordに変換する
fn map_row_to_copy(row: &PgRow) -> Result<CopyRecord> {
    let number: i32 = row.try_get("number")?;
    let number = u32::try_from(number)
        .map_err(|_| invalid_data(format!("copy number out of range: {}", number)))?;

    Ok(CopyRecord {
        copy: copy_ref_from_row(row, "kind", "copy_id")?,
        title_id: TitleId::from_uuid(row.try_get("title_id")?),
        number,
        state: parse_column(row, "state")?,
        notes: row.try_get("notes")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// CopyLedgerのPostgreSQL実装
///
/// 状態の更新は1文の条件付きUPDATEで行い、影響行数で成否を判定する。
pub struct CopyLedger {
    pool: PgPool,
}

impl CopyLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CopyLedgerTrait for CopyLedger {
    async fn get(&self, copy: CopyRef) -> Result<Option<CopyRecord>> {
        let row = sqlx::query(
            r#"
            SELECT copy_id, kind, title_id, number, state, notes, updated_at
            FROM copies
            WHERE copy_id = $1 AND kind = $2
            "#,
        )
        .bind(copy.id().value())
        .bind(copy.kind().as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_copy).transpose()
    }

    async fn compare_and_set(
        &self,
        transition: &CopyTransition,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE copies
            SET state = $3,
                notes = COALESCE($5, notes),
                updated_at = $6
            WHERE copy_id = $1 AND kind = $2 AND state = $4
            "#,
        )
        .bind(transition.copy.id().value())
        .bind(transition.copy.kind().as_str())
        .bind(transition.to.as_str())
        .bind(transition.from.as_str())
        .bind(notes)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 所蔵品をまとめて追加（1トランザクション）
    async fn insert(&self, copies: Vec<CopyRecord>) -> Result<()> {
        if copies.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for record in &copies {
            sqlx::query(
                r#"
                INSERT INTO copies (copy_id, kind, title_id, number, state, notes, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(record.copy.id().value())
            .bind(record.copy.kind().as_str())
            .bind(record.title_id.value())
            .bind(i32::try_from(record.number)?)
            .bind(record.state.as_str())
            .bind(&record.notes)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn highest_number(&self, title_id: TitleId, kind: ItemKind) -> Result<Option<u32>> {
        let highest: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT MAX(number)
            FROM copies
            WHERE title_id = $1 AND kind = $2
            "#,
        )
        .bind(title_id.value())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        highest
            .map(|n| u32::try_from(n).map_err(|_| invalid_data(format!("copy number out of range: {}", n))))
            .transpose()
    }

    async fn remove(&self, copy: CopyRef, expected: CopyState) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM copies
            WHERE copy_id = $1 AND kind = $2 AND state = $3
            "#,
        )
        .bind(copy.id().value())
        .bind(copy.kind().as_str())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_states(&self, states: &[CopyState]) -> Result<Vec<CopyRecord>> {
        let states: Vec<&str> = states.iter().map(CopyState::as_str).collect();

        let rows = sqlx::query(
            r#"
            SELECT copy_id, kind, title_id, number, state, notes, updated_at
            FROM copies
            WHERE state = ANY($1)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(&states)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_copy).collect()
    }
}
