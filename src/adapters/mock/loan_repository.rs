use crate::domain::{BorrowerId, Loan, LoanId, LoanState};
use crate::ports::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;

/// LoanRepositoryのインメモリ実装
pub struct LoanRepository {
    loans: Mutex<HashMap<LoanId, Loan>>,
}

impl LoanRepository {
    pub fn new() -> Self {
        Self {
            loans: Mutex::new(HashMap::new()),
        }
    }

    fn collect(&self, filter: impl Fn(&Loan) -> bool) -> Result<Vec<Loan>> {
        Ok(lock(&self.loans)?
            .values()
            .filter(|loan| filter(loan))
            .cloned()
            .collect())
    }
}

impl Default for LoanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn insert(&self, loan: Loan) -> Result<()> {
        let mut loans = lock(&self.loans)?;
        if loans.contains_key(&loan.loan_id) {
            return Err(format!("loan {} already exists", loan.loan_id).into());
        }
        loans.insert(loan.loan_id, loan);
        Ok(())
    }

    async fn update(&self, loan: Loan, expected: &Loan) -> Result<bool> {
        let mut loans = lock(&self.loans)?;
        match loans.get_mut(&loan.loan_id) {
            Some(current)
                if current.state == expected.state && current.due_date == expected.due_date =>
            {
                *current = loan;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(lock(&self.loans)?.get(&loan_id).cloned())
    }

    async fn find_active_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        self.collect(|l| l.borrower_id == borrower_id && l.state == LoanState::Active)
    }

    async fn find_by_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        let mut loans = self.collect(|l| l.borrower_id == borrower_id)?;
        loans.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(loans)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let mut loans = self.collect(|l| l.state == LoanState::Active && l.due_date < now)?;
        loans.sort_by_key(|l| l.due_date);
        Ok(loans)
    }
}
