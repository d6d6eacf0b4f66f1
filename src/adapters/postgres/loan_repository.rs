use crate::domain::{BorrowerId, Loan, LoanId, ReservationId};
use crate::ports::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{copy_ref_from_row, parse_column};

const LOAN_COLUMNS: &str = r#"
    loan_id,
    borrower_id,
    copy_kind,
    copy_id,
    reservation_id,
    start_date,
    due_date,
    return_date,
    state,
    created_at,
    updated_at
"#;

/// PostgreSQLの行データをLoanに変換する
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let reservation_id: Option<Uuid> = row.try_get("reservation_id")?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        borrower_id: BorrowerId::from_uuid(row.try_get("borrower_id")?),
        copy: copy_ref_from_row(row, "copy_kind", "copy_id")?,
        reservation_id: reservation_id.map(ReservationId::from_uuid),
        start_date: row.try_get("start_date")?,
        due_date: row.try_get("due_date")?,
        return_date: row.try_get("return_date")?,
        state: parse_column(row, "state")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// LoanRepositoryのPostgreSQL実装
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn insert(&self, loan: Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                borrower_id,
                copy_kind,
                copy_id,
                reservation_id,
                start_date,
                due_date,
                return_date,
                state,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.borrower_id.value())
        .bind(loan.copy.kind().as_str())
        .bind(loan.copy.id().value())
        .bind(loan.reservation_id.map(|id| id.value()))
        .bind(loan.start_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.state.as_str())
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 貸出を条件付きで更新
    ///
    /// 読み込み時の state と due_date を WHERE 句に含め、
    /// 他の操作が先に書き込んでいれば0行更新となる。
    async fn update(&self, loan: Loan, expected: &Loan) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET due_date = $2,
                return_date = $3,
                state = $4,
                updated_at = $5
            WHERE loan_id = $1
              AND state = $6
              AND due_date = $7
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.state.as_str())
        .bind(loan.updated_at)
        .bind(expected.state.as_str())
        .bind(expected.due_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM loans WHERE loan_id = $1",
            LOAN_COLUMNS
        ))
        .bind(loan_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// (borrower_id, state) のインデックスを使用
    async fn find_active_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM loans WHERE borrower_id = $1 AND state = 'active' ORDER BY start_date DESC",
            LOAN_COLUMNS
        ))
        .bind(borrower_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_by_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM loans WHERE borrower_id = $1 ORDER BY start_date DESC",
            LOAN_COLUMNS
        ))
        .bind(borrower_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    /// 延滞中の貸出（active の due_date 部分インデックスを使用）
    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM loans WHERE state = 'active' AND due_date < $1 ORDER BY due_date ASC",
            LOAN_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }
}
