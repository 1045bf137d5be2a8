use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    errors::{QueueError, QueueResult},
    events::{ChannelEvent, EventPublisher, PresenceChanged},
    models::presence::{PresenceRecord, PresenceStatus},
    store::PresenceStore,
};

/// Longest free-text activity a user may advertise.
pub const MAX_ACTIVITY_LEN: usize = 255;
/// Upper bound for the online-users listing.
pub const MAX_ONLINE_LIMIT: usize = 200;

#[derive(Clone)]
pub struct PresenceService {
    store: Arc<dyn PresenceStore>,
    publisher: Arc<dyn EventPublisher>,
    offline_after: Duration,
}

impl PresenceService {
    pub fn new(store: Arc<dyn PresenceStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            offline_after: Duration::minutes(5),
        }
    }

    /// Users not seen for longer than `offline_after` are swept to offline.
    /// A non-positive duration keeps the default.
    pub fn with_offline_after(mut self, offline_after: Duration) -> Self {
        if offline_after > Duration::zero() {
            self.offline_after = offline_after;
        }
        self
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        activity: Option<String>,
    ) -> QueueResult<PresenceRecord> {
        let activity = normalize_activity(activity)?;
        let record = self
            .store
            .upsert_presence(user_id, status, activity, Utc::now())
            .await?;
        debug!("User {} is now {}", user_id, record.status);
        self.announce(&record);
        Ok(record)
    }

    /// Refreshes `last_seen_at` without changing the advertised status.
    pub async fn heartbeat(&self, user_id: Uuid) -> QueueResult<PresenceRecord> {
        Ok(self.store.touch_presence(user_id, Utc::now()).await?)
    }

    /// Marks a user online on connect. A deliberate `away` or `busy` is kept.
    pub async fn set_online(&self, user_id: Uuid) -> QueueResult<PresenceRecord> {
        let now = Utc::now();
        if let Some(existing) = self.store.get_presence(user_id).await? {
            if matches!(existing.status, PresenceStatus::Away | PresenceStatus::Busy) {
                let record = self.store.touch_presence(user_id, now).await?;
                self.announce(&record);
                return Ok(record);
            }
        }
        let record = self
            .store
            .upsert_presence(user_id, PresenceStatus::Online, None, now)
            .await?;
        self.announce(&record);
        Ok(record)
    }

    pub async fn set_offline(&self, user_id: Uuid) -> QueueResult<PresenceRecord> {
        let record = self
            .store
            .upsert_presence(user_id, PresenceStatus::Offline, None, Utc::now())
            .await?;
        self.announce(&record);
        Ok(record)
    }

    pub async fn get(&self, user_id: Uuid) -> QueueResult<Option<PresenceRecord>> {
        Ok(self.store.get_presence(user_id).await?)
    }

    /// Records for the requested users that have one; users without a record
    /// are simply absent and should be treated as offline.
    pub async fn bulk(&self, user_ids: Vec<Uuid>) -> QueueResult<Vec<PresenceRecord>> {
        let mut user_ids = user_ids;
        user_ids.sort();
        user_ids.dedup();
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.bulk_presence(user_ids).await?)
    }

    pub async fn online(&self, limit: usize) -> QueueResult<Vec<PresenceRecord>> {
        let limit = limit.clamp(1, MAX_ONLINE_LIMIT);
        Ok(self.store.online_presence(limit).await?)
    }

    /// Marks everyone not seen since `now - offline_after` as offline and
    /// announces each change.
    pub async fn sweep_inactive(&self, now: DateTime<Utc>) -> QueueResult<Vec<PresenceRecord>> {
        let Some(threshold) = now.checked_sub_signed(self.offline_after) else {
            return Ok(Vec::new());
        };
        let changed = self.store.mark_inactive_offline(threshold, now).await?;
        if !changed.is_empty() {
            info!("Marked {} inactive users offline", changed.len());
        }
        for record in &changed {
            self.announce(record);
        }
        Ok(changed)
    }

    fn announce(&self, record: &PresenceRecord) {
        self.publisher
            .publish(ChannelEvent::PresenceChanged(PresenceChanged {
                user_id: record.user_id,
                status: record.status,
                activity: record.activity.clone(),
                updated_at: record.updated_at,
            }));
    }
}

fn normalize_activity(activity: Option<String>) -> QueueResult<Option<String>> {
    let Some(activity) = activity else {
        return Ok(None);
    };
    let trimmed = activity.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_ACTIVITY_LEN {
        return Err(QueueError::Validation(format!(
            "Activity must be at most {} characters",
            MAX_ACTIVITY_LEN
        )));
    }
    Ok(Some(trimmed.to_string()))
}
