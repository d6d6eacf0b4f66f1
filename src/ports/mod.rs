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

/// ポート共通のResult型
///
/// アダプターの失敗はそのままアプリケーション層へ渡し、そこで分類する。
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
