use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::SqlitePool;
use std::time::Duration;

const DEFAULT_CAPACITY: u64 = 100_000;
const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// student_id => exists on the roster
///
/// Holds negative answers too, so repeated kiosk scans of an unknown id
/// do not hit the database.
#[derive(Clone)]
pub struct RosterCache {
    inner: Cache<String, bool>,
}

impl Default for RosterCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl RosterCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, student_id: &str) -> Option<bool> {
        self.inner.get(student_id).await
    }

    pub async fn mark(&self, student_id: &str, exists: bool) {
        self.inner.insert(student_id.to_string(), exists).await;
    }

    /// Batch mark students as present on the roster
    async fn batch_mark(&self, student_ids: &[String]) {
        let futures: Vec<_> = student_ids
            .iter()
            .map(|id| self.inner.insert(id.clone(), true))
            .collect();

        futures::future::join_all(futures).await;
    }

    /// Stream every student id into the cache in batches.
    pub async fn warmup(&self, pool: &SqlitePool, batch_size: usize) -> Result<usize> {
        let mut stream =
            sqlx::query_as::<_, (String,)>("SELECT student_id FROM students").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (student_id,) = row?;
            batch.push(student_id);
            total += 1;

            if batch.len() >= batch_size {
                self.batch_mark(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.batch_mark(&batch).await;
        }

        tracing::info!(total, "Roster cache warmup complete");
        Ok(total)
    }
}
