use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per instructor so mutations of a single queue never interleave.
#[derive(Clone, Default)]
pub struct InstructorLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl InstructorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, instructor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Prune locks nobody holds or waits on.
            locks.retain(|id, lock| *id == instructor_id || Arc::strong_count(lock) > 1);
            locks
                .entry(instructor_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
