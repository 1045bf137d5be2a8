//! Headless model of one instructor's live queue.
//!
//! The view never applies mutations locally. Actions call the API, and on
//! success the whole queue is re-fetched; realtime signals do the same.
//! Fetches go through [`DebouncedFetch`] so a slow, superseded response can
//! never overwrite a newer one.

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use officehours_core::{
    events::ChannelEvent,
    models::{
        actor::Actor,
        presence::{PresenceRecord, PresenceStatus},
        queue::{QueueEntry, QueueSnapshot, QueueStats, QueueStatus},
    },
};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    api::QueueApi,
    channel::{ChannelSignal, RealtimeChannel, Topic},
    error::{ClientError, ClientResult},
    notify::Notifier,
    presence::PresenceOverlay,
    staleness::DebouncedFetch,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewStatus {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryAction {
    Admit,
    Complete,
    Cancel,
}

impl EntryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryAction::Admit => "admit",
            EntryAction::Complete => "complete",
            EntryAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for EntryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionControl {
    pub action: EntryAction,
    /// False while an action on the same entry is in flight.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub queue_id: Uuid,
    pub student_id: Uuid,
    pub status: QueueStatus,
    pub position: Option<u32>,
    pub question: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub presence: PresenceStatus,
    pub controls: Vec<ActionControl>,
}

/// Controls `viewer` may use on `entry`.
///
/// The instructor owning the queue can admit or cancel waiting entries and
/// complete or cancel admitted ones. A student can only cancel their own
/// waiting entry.
pub fn controls_for(viewer: Actor, entry: &QueueEntry, busy: bool) -> Vec<ActionControl> {
    let owns_queue = viewer.can_teach() && viewer.user_id == entry.instructor_id;
    let actions: &[EntryAction] = match entry.status {
        QueueStatus::Waiting if owns_queue => &[EntryAction::Admit, EntryAction::Cancel],
        QueueStatus::Admitted if owns_queue => &[EntryAction::Complete, EntryAction::Cancel],
        QueueStatus::Waiting if entry.student_id == viewer.user_id => &[EntryAction::Cancel],
        _ => &[],
    };
    actions
        .iter()
        .map(|&action| ActionControl {
            action,
            enabled: !busy,
        })
        .collect()
}

struct ViewState {
    status: ViewStatus,
    snapshot: Option<QueueSnapshot>,
    presence: PresenceOverlay,
    in_flight: HashSet<Uuid>,
}

struct ViewInner {
    api: Arc<dyn QueueApi>,
    instructor_id: Uuid,
    viewer: Actor,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ViewState>,
    queue_fetch: DebouncedFetch<QueueSnapshot>,
    presence_fetch: DebouncedFetch<Vec<PresenceRecord>>,
    changes: watch::Sender<u64>,
    /// Cancelled when the last view handle goes away, ending `attach` tasks.
    detached: CancellationToken,
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        self.detached.cancel();
    }
}

impl ViewInner {
    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn changed(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    fn mark_loading(&self) {
        self.state().status = ViewStatus::Loading;
        self.changed();
    }

    fn apply_snapshot(&self, result: ClientResult<QueueSnapshot>) {
        match result {
            Ok(snapshot) => {
                debug!(
                    "Queue for {} has {} open entries",
                    self.instructor_id, snapshot.count
                );
                {
                    let mut state = self.state();
                    state.snapshot = Some(snapshot);
                    state.status = ViewStatus::Ready;
                }
                self.presence_fetch.trigger();
            }
            Err(e) => {
                warn!("Failed to load queue for {}: {}", self.instructor_id, e);
                self.state().status = ViewStatus::Error(e.to_string());
            }
        }
        self.changed();
    }

    fn apply_presence(&self, result: ClientResult<Vec<PresenceRecord>>) {
        match result {
            Ok(records) => {
                self.state().presence.replace(records);
                self.changed();
            }
            Err(e) => warn!("Failed to load presence: {}", e),
        }
    }

    fn student_ids(&self) -> Vec<Uuid> {
        self.state()
            .snapshot
            .as_ref()
            .map(QueueSnapshot::student_ids)
            .unwrap_or_default()
    }

    fn refresh(&self) {
        self.mark_loading();
        self.queue_fetch.trigger();
    }
}

#[derive(Clone)]
pub struct QueueView {
    inner: Arc<ViewInner>,
}

impl QueueView {
    pub fn new(
        api: Arc<dyn QueueApi>,
        instructor_id: Uuid,
        viewer: Actor,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ViewInner>| {
            let queue_api = api.clone();
            let queue_sink = weak.clone();
            let queue_fetch = DebouncedFetch::new(
                debounce,
                move || {
                    let api = queue_api.clone();
                    async move { api.get_queue(instructor_id).await }.boxed()
                },
                move |result| {
                    if let Some(inner) = queue_sink.upgrade() {
                        inner.apply_snapshot(result);
                    }
                },
            );

            let presence_api = api.clone();
            let presence_source = weak.clone();
            let presence_sink = weak.clone();
            let presence_fetch = DebouncedFetch::new(
                debounce,
                move || {
                    let api = presence_api.clone();
                    let ids = presence_source
                        .upgrade()
                        .map(|inner| inner.student_ids())
                        .unwrap_or_default();
                    async move {
                        if ids.is_empty() {
                            return Ok(Vec::new());
                        }
                        api.bulk_presence(ids).await
                    }
                    .boxed()
                },
                move |result| {
                    if let Some(inner) = presence_sink.upgrade() {
                        inner.apply_presence(result);
                    }
                },
            );

            ViewInner {
                api,
                instructor_id,
                viewer,
                notifier,
                state: Mutex::new(ViewState {
                    status: ViewStatus::Idle,
                    snapshot: None,
                    presence: PresenceOverlay::default(),
                    in_flight: HashSet::new(),
                }),
                queue_fetch,
                presence_fetch,
                changes: watch::channel(0).0,
                detached: CancellationToken::new(),
            }
        });

        Self { inner }
    }

    pub fn instructor_id(&self) -> Uuid {
        self.inner.instructor_id
    }

    /// Loads the queue immediately and waits for the result.
    pub async fn load(&self) {
        self.inner.mark_loading();
        self.inner.queue_fetch.fetch_now().await;
    }

    /// Schedules a debounced re-fetch.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Runs an action against one entry, then re-fetches on success.
    ///
    /// Only the entry being acted on is marked busy; a second action on the
    /// same entry while the first is pending fails with
    /// [`ClientError::InFlight`]. Failures are reported to the notifier and
    /// leave the rendered queue untouched.
    pub async fn perform(&self, queue_id: Uuid, action: EntryAction) -> ClientResult<QueueEntry> {
        if !self.inner.state().in_flight.insert(queue_id) {
            return Err(ClientError::InFlight(queue_id));
        }
        self.inner.changed();

        let api = &self.inner.api;
        let result = match action {
            EntryAction::Admit => api.admit(queue_id).await,
            EntryAction::Complete => api.complete(queue_id).await,
            EntryAction::Cancel => api.cancel(queue_id).await,
        };

        self.inner.state().in_flight.remove(&queue_id);
        self.inner.changed();

        match &result {
            Ok(_) => {
                self.inner
                    .notifier
                    .success(&format!("Queue entry {}: {} succeeded", queue_id, action));
                self.load().await;
            }
            Err(e) => {
                self.inner
                    .notifier
                    .error(&format!("Could not {} queue entry: {}", action, e));
            }
        }

        result
    }

    pub fn status(&self) -> ViewStatus {
        self.inner.state().status.clone()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner
            .state()
            .snapshot
            .as_ref()
            .map(|s| s.stats.clone())
            .unwrap_or_default()
    }

    pub fn is_busy(&self, queue_id: Uuid) -> bool {
        self.inner.state().in_flight.contains(&queue_id)
    }

    /// Rows in server order, with presence and the viewer's controls.
    pub fn rows(&self) -> Vec<QueueRow> {
        let state = self.inner.state();
        let Some(snapshot) = &state.snapshot else {
            return Vec::new();
        };
        snapshot
            .queue
            .iter()
            .map(|positioned| {
                let entry = &positioned.entry;
                QueueRow {
                    queue_id: entry.id,
                    student_id: entry.student_id,
                    status: entry.status,
                    position: positioned.position,
                    question: entry.question.clone(),
                    joined_at: entry.joined_at,
                    presence: state.presence.status_of(entry.student_id),
                    controls: controls_for(
                        self.inner.viewer,
                        entry,
                        state.in_flight.contains(&entry.id),
                    ),
                }
            })
            .collect()
    }

    /// A counter bumped on every state change, for re-rendering.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Re-fetches whenever the channel reports activity for this queue, or a
    /// presence change for one of its students.
    ///
    /// The returned task ends when the view is dropped or the channel goes
    /// away. Ending it drops the subscriptions, leaving the room.
    pub fn attach(&self, channel: &RealtimeChannel) -> JoinHandle<()> {
        let mut queue_signals = channel.subscribe(Topic::Queue(self.inner.instructor_id));
        let mut presence_signals = channel.subscribe(Topic::Presence);
        let view = Arc::downgrade(&self.inner);
        let detached = self.inner.detached.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = detached.cancelled() => break,
                    signal = queue_signals.recv() => {
                        let Some(signal) = signal else { break };
                        let Some(inner) = view.upgrade() else { break };
                        debug!("Queue signal {:?}, refreshing", signal);
                        inner.refresh();
                    }
                    signal = presence_signals.recv() => {
                        let Some(signal) = signal else { break };
                        let Some(inner) = view.upgrade() else { break };
                        if let ChannelSignal::Event(ChannelEvent::PresenceChanged(change)) = signal {
                            if inner.student_ids().contains(&change.user_id) {
                                inner.presence_fetch.trigger();
                            }
                        }
                    }
                }
            }
        })
    }
}
