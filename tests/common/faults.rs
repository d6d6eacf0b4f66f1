//! 書き込みの失敗と古い読み込みを再現するアダプター
//!
//! インメモリ実装を包み、指定した回数だけ書き込みを失敗させる。
//! 読み込みは固定したスナップショットを返すこともできる。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use school_library_lending::adapters::mock;
use school_library_lending::domain::{
    Borrower, BorrowerId, CopyRecord, CopyRef, CopyState, CopyTransition, ItemKind, Loan, LoanId,
    Reservation, ReservationId, ReservationState, TitleId,
};
use school_library_lending::ports::{
    BorrowerRepository, CopyLedger, LoanRepository, ReservationRepository, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 次のN回の書き込みを失敗させるカウンター
#[derive(Default)]
pub struct WriteFailures(AtomicUsize);

impl WriteFailures {
    pub fn fail_next(&self, count: usize) {
        self.0.store(count, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        let failed = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err("simulated write failure".into())
        } else {
            Ok(())
        }
    }
}

pub struct FlakyBorrowerRepository {
    pub inner: Arc<mock::BorrowerRepository>,
    pub failures: Arc<WriteFailures>,
}

#[async_trait]
impl BorrowerRepository for FlakyBorrowerRepository {
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>> {
        self.inner.get_by_id(borrower_id).await
    }

    async fn save(&self, borrower: Borrower) -> Result<()> {
        self.failures.check()?;
        self.inner.save(borrower).await
    }

    async fn identity_taken(&self, national_id: &str, email: &str) -> Result<bool> {
        self.inner.identity_taken(national_id, email).await
    }

    async fn find_sanctioned(&self, at: DateTime<Utc>) -> Result<Vec<Borrower>> {
        self.inner.find_sanctioned(at).await
    }
}

pub struct FlakyCopyLedger {
    pub inner: Arc<mock::CopyLedger>,
    pub failures: Arc<WriteFailures>,
}

#[async_trait]
impl CopyLedger for FlakyCopyLedger {
    async fn get(&self, copy: CopyRef) -> Result<Option<CopyRecord>> {
        self.inner.get(copy).await
    }

    async fn compare_and_set(
        &self,
        transition: &CopyTransition,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.failures.check()?;
        self.inner.compare_and_set(transition, notes, at).await
    }

    async fn insert(&self, copies: Vec<CopyRecord>) -> Result<()> {
        self.failures.check()?;
        self.inner.insert(copies).await
    }

    async fn highest_number(&self, title_id: TitleId, kind: ItemKind) -> Result<Option<u32>> {
        self.inner.highest_number(title_id, kind).await
    }

    async fn remove(&self, copy: CopyRef, expected: CopyState) -> Result<bool> {
        self.failures.check()?;
        self.inner.remove(copy, expected).await
    }

    async fn find_by_states(&self, states: &[CopyState]) -> Result<Vec<CopyRecord>> {
        self.inner.find_by_states(states).await
    }
}

pub struct FlakyLoanRepository {
    pub inner: Arc<mock::LoanRepository>,
    pub failures: Arc<WriteFailures>,
    /// 設定されている間、get_by_id はこの貸出を返す
    pub stale: Mutex<Option<Loan>>,
}

#[async_trait]
impl LoanRepository for FlakyLoanRepository {
    async fn insert(&self, loan: Loan) -> Result<()> {
        self.failures.check()?;
        self.inner.insert(loan).await
    }

    async fn update(&self, loan: Loan, expected: &Loan) -> Result<bool> {
        self.failures.check()?;
        self.inner.update(loan, expected).await
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let stale = self.stale.lock().map_err(|_| "lock poisoned")?.clone();
        match stale {
            Some(loan) if loan.loan_id == loan_id => Ok(Some(loan)),
            _ => self.inner.get_by_id(loan_id).await,
        }
    }

    async fn find_active_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        self.inner.find_active_for_borrower(borrower_id).await
    }

    async fn find_by_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        self.inner.find_by_borrower(borrower_id).await
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        self.inner.find_overdue(now).await
    }
}

pub struct FlakyReservationRepository {
    pub inner: Arc<mock::ReservationRepository>,
    pub failures: Arc<WriteFailures>,
    /// 設定されている間、get_by_id はこの予約を返す
    pub stale: Mutex<Option<Reservation>>,
}

#[async_trait]
impl ReservationRepository for FlakyReservationRepository {
    async fn insert(&self, reservation: Reservation) -> Result<()> {
        self.failures.check()?;
        self.inner.insert(reservation).await
    }

    async fn update(&self, reservation: Reservation, expected: ReservationState) -> Result<bool> {
        self.failures.check()?;
        self.inner.update(reservation, expected).await
    }

    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let stale = self.stale.lock().map_err(|_| "lock poisoned")?.clone();
        match stale {
            Some(reservation) if reservation.reservation_id == reservation_id => {
                Ok(Some(reservation))
            }
            _ => self.inner.get_by_id(reservation_id).await,
        }
    }

    async fn find_pending_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Reservation>> {
        self.inner.find_pending_for_borrower(borrower_id).await
    }

    async fn find_pending(&self) -> Result<Vec<Reservation>> {
        self.inner.find_pending().await
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        self.inner.find_expired(now).await
    }
}
