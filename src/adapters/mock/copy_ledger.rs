use crate::domain::{CopyRecord, CopyRef, CopyState, CopyTransition, ItemKind, TitleId};
use crate::ports::{CopyLedger as CopyLedgerTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;

/// CopyLedgerのインメモリ実装
///
/// 条件付き更新は1つのロックの中で比較と更新を行うため、
/// 同じ所蔵品への同時要求のうち成功するのは1つだけになる。
pub struct CopyLedger {
    copies: Mutex<HashMap<CopyRef, CopyRecord>>,
}

impl CopyLedger {
    pub fn new() -> Self {
        Self {
            copies: Mutex::new(HashMap::new()),
        }
    }

    /// テスト用に所蔵品を登録
    pub fn add_copy(&self, record: CopyRecord) {
        if let Ok(mut copies) = self.copies.lock() {
            copies.insert(record.copy, record);
        }
    }
}

impl Default for CopyLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CopyLedgerTrait for CopyLedger {
    async fn get(&self, copy: CopyRef) -> Result<Option<CopyRecord>> {
        Ok(lock(&self.copies)?.get(&copy).cloned())
    }

    async fn compare_and_set(
        &self,
        transition: &CopyTransition,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut copies = lock(&self.copies)?;
        match copies.get_mut(&transition.copy) {
            Some(record) if record.state == transition.from => {
                record.state = transition.to;
                if let Some(notes) = notes {
                    record.notes = notes.to_string();
                }
                record.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert(&self, new_copies: Vec<CopyRecord>) -> Result<()> {
        let mut copies = lock(&self.copies)?;
        for record in new_copies {
            copies.insert(record.copy, record);
        }
        Ok(())
    }

    async fn highest_number(&self, title_id: TitleId, kind: ItemKind) -> Result<Option<u32>> {
        Ok(lock(&self.copies)?
            .values()
            .filter(|c| c.title_id == title_id && c.copy.kind() == kind)
            .map(|c| c.number)
            .max())
    }

    async fn remove(&self, copy: CopyRef, expected: CopyState) -> Result<bool> {
        let mut copies = lock(&self.copies)?;
        let matches = copies.get(&copy).is_some_and(|r| r.state == expected);
        if matches {
            copies.remove(&copy);
        }
        Ok(matches)
    }

    async fn find_by_states(&self, states: &[CopyState]) -> Result<Vec<CopyRecord>> {
        let mut found: Vec<CopyRecord> = lock(&self.copies)?
            .values()
            .filter(|c| states.contains(&c.state))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }
}
