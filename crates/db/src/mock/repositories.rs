use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use officehours_core::{
    models::{
        presence::{PresenceRecord, PresenceStatus},
        queue::{QueueEntry, QueueStatus},
        schedule::OfficeHoursSchedule,
    },
    store::{NewQueueEntry, NewSchedule, PresenceStore, QueueStore, ScheduleStore},
};
use uuid::Uuid;

mock! {
    pub QueueRepo {}

    #[async_trait]
    impl QueueStore for QueueRepo {
        async fn insert_entry(&self, entry: NewQueueEntry) -> eyre::Result<Option<QueueEntry>>;

        async fn get_entry(&self, id: Uuid) -> eyre::Result<Option<QueueEntry>>;

        async fn find_active_entry(
            &self,
            instructor_id: Uuid,
            student_id: Uuid,
        ) -> eyre::Result<Option<QueueEntry>>;

        async fn active_entries(&self, instructor_id: Uuid) -> eyre::Result<Vec<QueueEntry>>;

        async fn transition(
            &self,
            id: Uuid,
            expected: QueueStatus,
            to: QueueStatus,
            at: DateTime<Utc>,
        ) -> eyre::Result<Option<QueueEntry>>;

        async fn cancel_all_active(&self, instructor_id: Uuid, at: DateTime<Utc>) -> eyre::Result<u64>;

        async fn average_wait_minutes(
            &self,
            instructor_id: Uuid,
            since: Option<DateTime<Utc>>,
        ) -> eyre::Result<Option<f64>>;
    }
}

mock! {
    pub ScheduleRepo {}

    #[async_trait]
    impl ScheduleStore for ScheduleRepo {
        async fn insert_schedule(&self, schedule: NewSchedule) -> eyre::Result<OfficeHoursSchedule>;

        async fn get_schedule(&self, id: Uuid) -> eyre::Result<Option<OfficeHoursSchedule>>;

        async fn list_schedules(&self, instructor_id: Uuid) -> eyre::Result<Vec<OfficeHoursSchedule>>;

        async fn save_schedule(&self, schedule: OfficeHoursSchedule) -> eyre::Result<OfficeHoursSchedule>;

        async fn soft_delete_schedule(&self, id: Uuid) -> eyre::Result<()>;
    }
}

mock! {
    pub PresenceRepo {}

    #[async_trait]
    impl PresenceStore for PresenceRepo {
        async fn upsert_presence(
            &self,
            user_id: Uuid,
            status: PresenceStatus,
            activity: Option<String>,
            at: DateTime<Utc>,
        ) -> eyre::Result<PresenceRecord>;

        async fn touch_presence(&self, user_id: Uuid, at: DateTime<Utc>) -> eyre::Result<PresenceRecord>;

        async fn get_presence(&self, user_id: Uuid) -> eyre::Result<Option<PresenceRecord>>;

        async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> eyre::Result<Vec<PresenceRecord>>;

        async fn online_presence(&self, limit: usize) -> eyre::Result<Vec<PresenceRecord>>;

        async fn mark_inactive_offline(
            &self,
            threshold: DateTime<Utc>,
            at: DateTime<Utc>,
        ) -> eyre::Result<Vec<PresenceRecord>>;
    }
}
