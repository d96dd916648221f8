//! Match record storage.

use crate::models::MatchRecord;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Persistence for canonical match records. At most one record exists per team heading.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn find_by_team_heading(&self, team_heading: &str) -> Result<Option<MatchRecord>>;

    async fn find_by_id(&self, match_id: i64) -> Result<Option<MatchRecord>>;

    /// Insert (assigning `match_id`) or update; returns the stored record.
    async fn save(&self, record: MatchRecord) -> Result<MatchRecord>;

    async fn find_all(&self) -> Result<Vec<MatchRecord>>;
}

/// Process-local store, used with `STORE_BACKEND=memory` and in tests.
#[derive(Debug)]
pub struct InMemoryMatchStore {
    records: RwLock<HashMap<i64, MatchRecord>>,
    next_id: AtomicI64,
    writes: AtomicU64,
}

impl Default for InMemoryMatchStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            writes: AtomicU64::new(0),
        }
    }
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn find_by_team_heading(&self, team_heading: &str) -> Result<Option<MatchRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.team_heading == team_heading)
            .cloned())
    }

    async fn find_by_id(&self, match_id: i64) -> Result<Option<MatchRecord>> {
        Ok(self.records.read().get(&match_id).cloned())
    }

    async fn save(&self, mut record: MatchRecord) -> Result<MatchRecord> {
        let mut records = self.records.write();
        self.writes.fetch_add(1, Ordering::SeqCst);

        // Same upsert key as the database: the heading decides identity
        let existing_id = records
            .values()
            .find(|r| r.team_heading == record.team_heading)
            .and_then(|r| r.match_id);

        let id = match existing_id.or(record.match_id) {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        record.match_id = Some(id);
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_all(&self) -> Result<Vec<MatchRecord>> {
        let mut all: Vec<MatchRecord> = self.records.read().values().cloned().collect();
        all.sort_by_key(|r| r.match_id);
        Ok(all)
    }
}
