//! mockall doubles of the client seams.

use async_trait::async_trait;
use mockall::mock;
use officehours_core::models::{
    presence::PresenceRecord,
    queue::{JoinQueueRequest, JoinQueueResponse, MyQueueStatus, QueueEntry, QueueSnapshot},
};
use uuid::Uuid;

use crate::{api::QueueApi, error::ClientResult, notify::Notifier};

mock! {
    pub Api {}

    #[async_trait]
    impl QueueApi for Api {
        async fn get_queue(&self, instructor_id: Uuid) -> ClientResult<QueueSnapshot>;

        async fn join(&self, request: JoinQueueRequest) -> ClientResult<JoinQueueResponse>;

        async fn my_entry(&self, instructor_id: Uuid) -> ClientResult<MyQueueStatus>;

        async fn admit(&self, queue_id: Uuid) -> ClientResult<QueueEntry>;

        async fn complete(&self, queue_id: Uuid) -> ClientResult<QueueEntry>;

        async fn cancel(&self, queue_id: Uuid) -> ClientResult<QueueEntry>;

        async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> ClientResult<Vec<PresenceRecord>>;
    }
}

mock! {
    pub Notifier {}

    impl Notifier for Notifier {
        fn success(&self, message: &str);

        fn error(&self, message: &str);
    }
}
