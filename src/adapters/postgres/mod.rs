pub mod borrower_repository;
pub mod copy_ledger;
pub mod event_store;
pub mod loan_repository;
pub mod reservation_repository;

// パブリックに型を再エクスポート
pub use borrower_repository::BorrowerRepository as PostgresBorrowerRepository;
pub use copy_ledger::CopyLedger as PostgresCopyLedger;
pub use event_store::EventStore as PostgresEventStore;
pub use loan_repository::LoanRepository as PostgresLoanRepository;
pub use reservation_repository::ReservationRepository as PostgresReservationRepository;

use crate::domain::{CopyId, CopyRef, ItemKind};
use crate::ports::Result;
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

/// 不正な行データをエラーに変換する
fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

/// 文字列カラムを列挙型に変換する
fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let value: &str = row.try_get(column)?;
    T::from_str(value).map_err(invalid_data)
}

/// (kind, id) のカラム組を所蔵品参照に変換する
fn copy_ref_from_row(row: &PgRow, kind_column: &str, id_column: &str) -> Result<CopyRef> {
    let kind: ItemKind = parse_column(row, kind_column)?;
    let id = CopyId::from_uuid(row.try_get(id_column)?);
    Ok(CopyRef::new(kind, id))
}
