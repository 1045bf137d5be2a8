use async_trait::async_trait;
use officehours_client::{
    api::QueueApi,
    channel::RealtimeChannel,
    error::{ClientError, ClientResult},
    mock::{MockApi, MockNotifier},
    notify::TracingNotifier,
    view::{controls_for, ActionControl, EntryAction, QueueView, ViewStatus},
};
use officehours_core::events::ClientMessage;
use officehours_core::models::{
    actor::Actor,
    presence::{PresenceRecord, PresenceStatus},
    queue::{JoinQueueRequest, JoinQueueResponse, MyQueueStatus, QueueEntry, QueueSnapshot, QueueStatus},
};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::support::{entry, eventually, queue_updated, FakeProvider};

const DEBOUNCE: Duration = Duration::from_millis(5);

fn snapshot(entries: Vec<QueueEntry>) -> QueueSnapshot {
    QueueSnapshot::from_active(entries, None)
}

fn presence(user_id: Uuid, status: PresenceStatus) -> PresenceRecord {
    PresenceRecord {
        user_id,
        status,
        activity: None,
        last_seen_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn test_load_renders_rows_with_presence_and_controls() {
    let instructor = Uuid::new_v4();
    let admitted = entry(instructor, QueueStatus::Admitted, 20);
    let waiting = entry(instructor, QueueStatus::Waiting, 5);
    let busy_student = waiting.student_id;
    let queue = snapshot(vec![waiting.clone(), admitted.clone()]);

    let mut api = MockApi::new();
    api.expect_get_queue()
        .returning(move |_| Ok(queue.clone()));
    api.expect_bulk_presence()
        .returning(move |_| Ok(vec![presence(busy_student, PresenceStatus::Busy)]));

    let view = QueueView::new(
        Arc::new(api),
        instructor,
        Actor::instructor(instructor),
        Arc::new(TracingNotifier),
        DEBOUNCE,
    );
    assert_eq!(view.status(), ViewStatus::Idle);

    view.load().await;
    assert_eq!(view.status(), ViewStatus::Ready);
    assert_eq!(view.stats().waiting, 1);
    assert_eq!(view.stats().admitted, 1);

    eventually(|| view.rows().iter().any(|r| r.presence == PresenceStatus::Busy)).await;
    let rows = view.rows();
    assert_eq!(rows[0].queue_id, admitted.id);
    assert_eq!(rows[0].position, None);
    assert_eq!(rows[0].presence, PresenceStatus::Offline);
    assert_eq!(rows[1].queue_id, waiting.id);
    assert_eq!(rows[1].position, Some(1));
    assert_eq!(
        rows[1].controls,
        vec![
            ActionControl { action: EntryAction::Admit, enabled: true },
            ActionControl { action: EntryAction::Cancel, enabled: true },
        ]
    );
}

#[tokio::test]
async fn test_successful_action_refetches_from_server() {
    let instructor = Uuid::new_v4();
    let waiting = entry(instructor, QueueStatus::Waiting, 3);
    let mut admitted = waiting.clone();
    admitted.status = QueueStatus::Admitted;

    let before = snapshot(vec![waiting.clone()]);
    let after = snapshot(vec![admitted.clone()]);
    let fetches = Arc::new(AtomicUsize::new(0));

    let mut api = MockApi::new();
    let counter = fetches.clone();
    api.expect_get_queue().returning(move |_| {
        match counter.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(before.clone()),
            _ => Ok(after.clone()),
        }
    });
    let returned = admitted.clone();
    api.expect_admit()
        .withf(move |id| *id == waiting.id)
        .times(1)
        .returning(move |_| Ok(returned.clone()));
    api.expect_bulk_presence().returning(|_| Ok(Vec::new()));

    let mut notifier = MockNotifier::new();
    notifier.expect_success().times(1).return_const(());
    notifier.expect_error().never();

    let view = QueueView::new(
        Arc::new(api),
        instructor,
        Actor::instructor(instructor),
        Arc::new(notifier),
        DEBOUNCE,
    );
    view.load().await;
    assert_eq!(view.rows()[0].status, QueueStatus::Waiting);

    let result = view.perform(admitted.id, EntryAction::Admit).await.unwrap();
    assert_eq!(result.status, QueueStatus::Admitted);
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert_eq!(view.rows()[0].status, QueueStatus::Admitted);
    assert!(!view.is_busy(admitted.id));
}

#[tokio::test]
async fn test_failed_action_leaves_state_untouched() {
    let instructor = Uuid::new_v4();
    let waiting = entry(instructor, QueueStatus::Waiting, 3);
    let queue = snapshot(vec![waiting.clone()]);

    let mut api = MockApi::new();
    api.expect_get_queue()
        .times(1)
        .returning(move |_| Ok(queue.clone()));
    api.expect_complete().times(1).returning(|_| {
        Err(ClientError::Api {
            status: StatusCode::CONFLICT,
            code: "invalid_transition".to_string(),
            message: "Invalid transition: cannot complete an entry that is waiting".to_string(),
        })
    });
    api.expect_bulk_presence().returning(|_| Ok(Vec::new()));

    let mut notifier = MockNotifier::new();
    notifier.expect_success().never();
    notifier.expect_error().times(1).return_const(());

    let view = QueueView::new(
        Arc::new(api),
        instructor,
        Actor::instructor(instructor),
        Arc::new(notifier),
        DEBOUNCE,
    );
    view.load().await;
    let rows_before = view.rows();

    let error = view
        .perform(waiting.id, EntryAction::Complete)
        .await
        .unwrap_err();
    assert_eq!(error.code(), Some("invalid_transition"));
    assert_eq!(view.rows(), rows_before);
    assert_eq!(view.status(), ViewStatus::Ready);
}

#[tokio::test]
async fn test_load_failure_then_recovery() {
    let instructor = Uuid::new_v4();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut api = MockApi::new();
    let counter = calls.clone();
    api.expect_get_queue().returning(move |_| {
        match counter.fetch_add(1, Ordering::SeqCst) {
            0 => Err(ClientError::Transport("connection refused".to_string())),
            _ => Ok(QueueSnapshot::default()),
        }
    });

    let view = QueueView::new(
        Arc::new(api),
        instructor,
        Actor::student(Uuid::new_v4()),
        Arc::new(TracingNotifier),
        DEBOUNCE,
    );

    view.load().await;
    assert!(matches!(view.status(), ViewStatus::Error(_)));

    view.refresh();
    assert_eq!(view.status(), ViewStatus::Loading);
    eventually(|| view.status() == ViewStatus::Ready).await;
    assert!(view.rows().is_empty());
}

/// Serves one fixed queue; `admit` blocks until released.
struct GatedApi {
    queue: QueueSnapshot,
    gate: Arc<Notify>,
    fetches: AtomicUsize,
}

#[async_trait]
impl QueueApi for GatedApi {
    async fn get_queue(&self, _instructor_id: Uuid) -> ClientResult<QueueSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.queue.clone())
    }

    async fn join(&self, _request: JoinQueueRequest) -> ClientResult<JoinQueueResponse> {
        Err(ClientError::Transport("not served".to_string()))
    }

    async fn my_entry(&self, _instructor_id: Uuid) -> ClientResult<MyQueueStatus> {
        Err(ClientError::Transport("not served".to_string()))
    }

    async fn admit(&self, queue_id: Uuid) -> ClientResult<QueueEntry> {
        self.gate.notified().await;
        let mut entry = self
            .queue
            .queue
            .iter()
            .find(|p| p.entry.id == queue_id)
            .map(|p| p.entry.clone())
            .ok_or_else(|| ClientError::Transport("unknown entry".to_string()))?;
        entry.status = QueueStatus::Admitted;
        Ok(entry)
    }

    async fn complete(&self, _queue_id: Uuid) -> ClientResult<QueueEntry> {
        Err(ClientError::Transport("not served".to_string()))
    }

    async fn cancel(&self, _queue_id: Uuid) -> ClientResult<QueueEntry> {
        Err(ClientError::Transport("not served".to_string()))
    }

    async fn bulk_presence(&self, _user_ids: Vec<Uuid>) -> ClientResult<Vec<PresenceRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_pending_action_only_blocks_its_own_entry() {
    let instructor = Uuid::new_v4();
    let first = entry(instructor, QueueStatus::Waiting, 10);
    let second = entry(instructor, QueueStatus::Waiting, 5);
    let gate = Arc::new(Notify::new());
    let api = Arc::new(GatedApi {
        queue: snapshot(vec![first.clone(), second.clone()]),
        gate: gate.clone(),
        fetches: AtomicUsize::new(0),
    });

    let view = QueueView::new(
        api.clone(),
        instructor,
        Actor::instructor(instructor),
        Arc::new(TracingNotifier),
        DEBOUNCE,
    );
    view.load().await;

    let pending = tokio::spawn({
        let view = view.clone();
        let id = first.id;
        async move { view.perform(id, EntryAction::Admit).await }
    });
    eventually(|| view.is_busy(first.id)).await;

    let rows = view.rows();
    assert!(rows[0].controls.iter().all(|c| !c.enabled));
    assert!(rows[1].controls.iter().all(|c| c.enabled));

    let again = view.perform(first.id, EntryAction::Cancel).await;
    assert!(matches!(again, Err(ClientError::InFlight(id)) if id == first.id));

    gate.notify_one();
    let admitted = pending.await.unwrap().unwrap();
    assert_eq!(admitted.status, QueueStatus::Admitted);
    assert!(!view.is_busy(first.id));
    assert_eq!(api.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_channel_signals_trigger_refetch() {
    let instructor = Uuid::new_v4();
    let api = Arc::new(GatedApi {
        queue: snapshot(vec![entry(instructor, QueueStatus::Waiting, 1)]),
        gate: Arc::new(Notify::new()),
        fetches: AtomicUsize::new(0),
    });
    let (provider, mut servers) = FakeProvider::with_links(1);
    let channel = RealtimeChannel::new(Arc::new(provider), Duration::from_millis(10));

    let view = QueueView::new(
        api.clone(),
        instructor,
        Actor::student(Uuid::new_v4()),
        Arc::new(TracingNotifier),
        DEBOUNCE,
    );
    let listener = view.attach(&channel);
    let handle = channel.start();

    // Connecting counts as a change.
    eventually(|| api.fetches.load(Ordering::SeqCst) >= 1).await;
    eventually(|| view.status() == ViewStatus::Ready).await;
    let seen = api.fetches.load(Ordering::SeqCst);

    let server = servers.remove(0);
    server.events.send(queue_updated(Uuid::new_v4())).unwrap();
    server.events.send(queue_updated(instructor)).unwrap();
    eventually(|| api.fetches.load(Ordering::SeqCst) == seen + 1).await;

    channel.shutdown();
    listener.abort();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_dropping_view_leaves_room() {
    let instructor = Uuid::new_v4();
    let mut api = MockApi::new();
    api.expect_get_queue()
        .returning(|_| Ok(snapshot(Vec::new())));
    api.expect_bulk_presence().returning(|_| Ok(Vec::new()));

    let (provider, mut servers) = FakeProvider::with_links(1);
    let channel = RealtimeChannel::new(Arc::new(provider), Duration::from_millis(10));
    let view = QueueView::new(
        Arc::new(api),
        instructor,
        Actor::student(Uuid::new_v4()),
        Arc::new(TracingNotifier),
        DEBOUNCE,
    );
    let listener = view.attach(&channel);
    let handle = channel.start();
    let mut server = servers.remove(0);
    assert_eq!(server.next_frame().await, ClientMessage::join(instructor));

    // No further traffic arrives in the room; dropping alone must leave it.
    drop(view);
    assert_eq!(server.next_frame().await, ClientMessage::leave(instructor));
    listener.await.unwrap();

    channel.shutdown();
    handle.await.unwrap();
}

#[rstest]
#[case::instructor_waiting(true, QueueStatus::Waiting, vec![EntryAction::Admit, EntryAction::Cancel])]
#[case::instructor_admitted(true, QueueStatus::Admitted, vec![EntryAction::Complete, EntryAction::Cancel])]
#[case::student_own_waiting(false, QueueStatus::Waiting, vec![EntryAction::Cancel])]
#[case::student_own_admitted(false, QueueStatus::Admitted, vec![])]
fn test_controls_follow_role_and_status(
    #[case] as_instructor: bool,
    #[case] status: QueueStatus,
    #[case] expected: Vec<EntryAction>,
) {
    let instructor = Uuid::new_v4();
    let queue_entry = entry(instructor, status, 1);
    let viewer = if as_instructor {
        Actor::instructor(instructor)
    } else {
        Actor::student(queue_entry.student_id)
    };

    let actions: Vec<EntryAction> = controls_for(viewer, &queue_entry, false)
        .into_iter()
        .map(|c| c.action)
        .collect();
    assert_eq!(actions, expected);
}

#[test]
fn test_strangers_get_no_controls() {
    let instructor = Uuid::new_v4();
    let queue_entry = entry(instructor, QueueStatus::Waiting, 1);

    assert!(controls_for(Actor::student(Uuid::new_v4()), &queue_entry, false).is_empty());
    assert!(controls_for(Actor::instructor(Uuid::new_v4()), &queue_entry, false).is_empty());
}

#[test]
fn test_busy_entries_disable_controls() {
    let instructor = Uuid::new_v4();
    let queue_entry = entry(instructor, QueueStatus::Admitted, 1);
    let controls = controls_for(Actor::instructor(instructor), &queue_entry, true);
    assert_eq!(controls.len(), 2);
    assert!(controls.iter().all(|c| !c.enabled));
}
