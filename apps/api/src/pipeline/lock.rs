//! Per-upload advisory lock. Two concurrent process calls for the same id
//! would otherwise both pass the status check and race the final write; the
//! lock serializes them for the duration of the processing attempt.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;

#[async_trait]
pub trait ProcessLock: Send + Sync {
    /// Returns `false` when the lock is already held.
    async fn try_acquire(&self, id: Uuid) -> Result<bool, AppError>;
    async fn release(&self, id: Uuid);
}

const LOCK_TTL_SECS: u64 = 300;

/// Redis `SET NX EX` lock. The TTL bounds how long a crashed worker can keep
/// an upload locked.
pub struct RedisProcessLock {
    client: redis::Client,
}

impl RedisProcessLock {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(id: Uuid) -> String {
        format!("cvchat:process-lock:{id}")
    }
}

#[async_trait]
impl ProcessLock for RedisProcessLock {
    async fn try_acquire(&self, id: Uuid) -> Result<bool, AppError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Lock(format!("redis connect: {e}")))?;

        let acquired: Option<String> = redis::cmd("SET")
            .arg(Self::key(id))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(LOCK_TTL_SECS)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Lock(format!("redis SET NX: {e}")))?;

        Ok(acquired.is_some())
    }

    async fn release(&self, id: Uuid) {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            tracing::warn!("Could not release process lock for {id}: redis unavailable");
            return;
        };
        let released: Result<(), redis::RedisError> = redis::cmd("DEL")
            .arg(Self::key(id))
            .query_async(&mut conn)
            .await;
        if let Err(e) = released {
            tracing::warn!("Could not release process lock for {id}: {e}");
        }
    }
}

/// In-process lock for tests and single-node deployments without redis.
#[derive(Default)]
pub struct LocalProcessLock {
    held: Mutex<HashSet<Uuid>>,
}

#[async_trait]
impl ProcessLock for LocalProcessLock {
    async fn try_acquire(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.held.lock().await.insert(id))
    }

    async fn release(&self, id: Uuid) {
        self.held.lock().await.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_lock_is_exclusive_until_released() {
        let lock = LocalProcessLock::default();
        let id = Uuid::new_v4();

        assert!(lock.try_acquire(id).await.unwrap());
        assert!(!lock.try_acquire(id).await.unwrap());

        // A different upload is unaffected.
        assert!(lock.try_acquire(Uuid::new_v4()).await.unwrap());

        lock.release(id).await;
        assert!(lock.try_acquire(id).await.unwrap());
    }
}
