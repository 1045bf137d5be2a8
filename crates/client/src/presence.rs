use officehours_core::models::presence::{PresenceRecord, PresenceStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Read-only presence snapshot for the students in a queue.
///
/// Replaced wholesale on every bulk fetch. Users without a record are
/// reported as offline.
#[derive(Debug, Clone, Default)]
pub struct PresenceOverlay {
    records: HashMap<Uuid, PresenceRecord>,
}

impl PresenceOverlay {
    pub fn replace(&mut self, records: Vec<PresenceRecord>) {
        self.records = records.into_iter().map(|r| (r.user_id, r)).collect();
    }

    pub fn status_of(&self, user_id: Uuid) -> PresenceStatus {
        self.records
            .get(&user_id)
            .map(|r| r.status)
            .unwrap_or(PresenceStatus::Offline)
    }

    pub fn activity_of(&self, user_id: Uuid) -> Option<&str> {
        self.records.get(&user_id).and_then(|r| r.activity.as_deref())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
