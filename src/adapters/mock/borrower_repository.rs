use crate::domain::{Borrower, BorrowerId, sanction};
use crate::ports::{BorrowerRepository as BorrowerRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;

/// BorrowerRepositoryのインメモリ実装
pub struct BorrowerRepository {
    borrowers: Mutex<HashMap<BorrowerId, Borrower>>,
}

impl BorrowerRepository {
    pub fn new() -> Self {
        Self {
            borrowers: Mutex::new(HashMap::new()),
        }
    }

    /// テスト用に利用者を登録
    pub fn add_borrower(&self, borrower: Borrower) {
        if let Ok(mut borrowers) = self.borrowers.lock() {
            borrowers.insert(borrower.borrower_id, borrower);
        }
    }
}

impl Default for BorrowerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BorrowerRepositoryTrait for BorrowerRepository {
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>> {
        Ok(lock(&self.borrowers)?.get(&borrower_id).cloned())
    }

    async fn save(&self, borrower: Borrower) -> Result<()> {
        lock(&self.borrowers)?.insert(borrower.borrower_id, borrower);
        Ok(())
    }

    async fn identity_taken(&self, national_id: &str, email: &str) -> Result<bool> {
        Ok(lock(&self.borrowers)?
            .values()
            .any(|b| b.national_id == national_id || b.email == email))
    }

    async fn find_sanctioned(&self, at: DateTime<Utc>) -> Result<Vec<Borrower>> {
        let mut sanctioned: Vec<Borrower> = lock(&self.borrowers)?
            .values()
            .filter(|b| sanction::is_suspended(b, at))
            .cloned()
            .collect();
        sanctioned.sort_by_key(|b| b.suspended_until);
        Ok(sanctioned)
    }
}
