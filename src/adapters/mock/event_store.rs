use crate::domain::DomainEvent;
use crate::ports::{EventStore as EventStoreTrait, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

use super::lock;

/// EventStoreのインメモリ実装
///
/// (集約ID, イベント) を挿入順に保持する追記専用ログ。
pub struct EventStore {
    log: Mutex<Vec<(Uuid, DomainEvent)>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
        }
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStoreTrait for EventStore {
    async fn append(&self, aggregate_id: Uuid, events: Vec<DomainEvent>) -> Result<()> {
        let mut log = lock(&self.log)?;
        log.extend(events.into_iter().map(|event| (aggregate_id, event)));
        Ok(())
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<DomainEvent>> {
        Ok(lock(&self.log)?
            .iter()
            .filter(|(id, _)| *id == aggregate_id)
            .map(|(_, event)| event.clone())
            .collect())
    }
}
