//! ポートのインメモリ実装
//!
//! テストと `storage.backend = "memory"` の実行時に使用する。

pub mod borrower_repository;
pub mod copy_ledger;
pub mod event_store;
pub mod loan_repository;
pub mod reservation_repository;

pub use borrower_repository::BorrowerRepository;
pub use copy_ledger::CopyLedger;
pub use event_store::EventStore;
pub use loan_repository::LoanRepository;
pub use reservation_repository::ReservationRepository;

use crate::ports::Result;
use std::sync::{Mutex, MutexGuard};

/// ロックを取得する（poisonedの場合はエラーとして返す）
fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| "in-memory store lock poisoned".into())
}
