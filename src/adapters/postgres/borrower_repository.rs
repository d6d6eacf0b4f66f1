use crate::domain::{Borrower, BorrowerId};
use crate::ports::{BorrowerRepository as BorrowerRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::parse_column;

/// PostgreSQLの行データをBorrowerに変換する
fn map_row_to_borrower(row: &PgRow) -> Result<Borrower> {
    Ok(Borrower {
        borrower_id: BorrowerId::from_uuid(row.try_get("borrower_id")?),
        name: row.try_get("name")?,
        national_id: row.try_get("national_id")?,
        email: row.try_get("email")?,
        role: parse_column(row, "role")?,
        course: row.try_get("course")?,
        suspended_until: row.try_get("suspended_until")?,
    })
}

/// BorrowerRepositoryのPostgreSQL実装
pub struct BorrowerRepository {
    pool: PgPool,
}

impl BorrowerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowerRepositoryTrait for BorrowerRepository {
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>> {
        let row = sqlx::query(
            r#"
            SELECT borrower_id, name, national_id, email, role, course, suspended_until
            FROM borrowers
            WHERE borrower_id = $1
            "#,
        )
        .bind(borrower_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    /// 利用者を保存（upsert）
    async fn save(&self, borrower: Borrower) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO borrowers (
                borrower_id, name, national_id, email, role, course, suspended_until
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (borrower_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                national_id = EXCLUDED.national_id,
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                course = EXCLUDED.course,
                suspended_until = EXCLUDED.suspended_until
            "#,
        )
        .bind(borrower.borrower_id.value())
        .bind(&borrower.name)
        .bind(&borrower.national_id)
        .bind(&borrower.email)
        .bind(borrower.role.as_str())
        .bind(&borrower.course)
        .bind(borrower.suspended_until)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn identity_taken(&self, national_id: &str, email: &str) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM borrowers WHERE national_id = $1 OR email = $2
            )
            "#,
        )
        .bind(national_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    /// 貸出停止中の利用者を停止期限の近い順に取得
    async fn find_sanctioned(&self, at: DateTime<Utc>) -> Result<Vec<Borrower>> {
        let rows = sqlx::query(
            r#"
            SELECT borrower_id, name, national_id, email, role, course, suspended_until
            FROM borrowers
            WHERE suspended_until > $1
            ORDER BY suspended_until ASC
            "#,
        )
        .bind(at)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_borrower).collect()
    }
}
