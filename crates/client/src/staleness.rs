//! Out-of-order protection for repeated fetches.
//!
//! Every dispatch takes a ticket from a [`StalenessGuard`]. When the response
//! arrives it is applied only if no later dispatch happened in the meantime,
//! so the rendered state always reflects the most recently *dispatched*
//! fetch. Superseded results, errors included, are dropped.

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ClientResult;

/// Sequence number handed out at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Default)]
pub struct StalenessGuard {
    latest: Arc<AtomicU64>,
}

impl StalenessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags a new dispatch, superseding every earlier ticket.
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, ClientResult<T>> + Send + Sync>;
type Sink<T> = Arc<dyn Fn(ClientResult<T>) + Send + Sync>;

/// A fetch that is debounced on trigger and staleness-guarded on delivery.
///
/// `trigger` restarts the debounce timer; when it fires, the fetcher runs and
/// its result reaches the sink only if it is still the latest dispatch.
/// Dropping the `DebouncedFetch` aborts a pending timer.
pub struct DebouncedFetch<T> {
    guard: StalenessGuard,
    delay: Duration,
    fetcher: Fetcher<T>,
    sink: Sink<T>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> DebouncedFetch<T> {
    pub fn new<F, S>(delay: Duration, fetcher: F, sink: S) -> Self
    where
        F: Fn() -> BoxFuture<'static, ClientResult<T>> + Send + Sync + 'static,
        S: Fn(ClientResult<T>) + Send + Sync + 'static,
    {
        Self {
            guard: StalenessGuard::new(),
            delay,
            fetcher: Arc::new(fetcher),
            sink: Arc::new(sink),
            timer: Mutex::new(None),
        }
    }

    /// Schedules a fetch after the debounce delay, replacing any pending one.
    pub fn trigger(&self) {
        let guard = self.guard.clone();
        let fetcher = self.fetcher.clone();
        let sink = self.sink.clone();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatch(&guard, &fetcher, &sink).await;
        });

        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pending) = timer.replace(handle) {
            pending.abort();
        }
    }

    /// Fetches immediately, skipping the debounce. Resolves once the result
    /// has been delivered or discarded.
    pub async fn fetch_now(&self) {
        self.cancel_pending();
        dispatch(&self.guard, &self.fetcher, &self.sink).await;
    }

    pub fn cancel_pending(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pending) = timer.take() {
            pending.abort();
        }
    }
}

impl<T> Drop for DebouncedFetch<T> {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(pending) = timer.take() {
            pending.abort();
        }
    }
}

async fn dispatch<T>(guard: &StalenessGuard, fetcher: &Fetcher<T>, sink: &Sink<T>) {
    let ticket = guard.begin();
    let result = fetcher().await;
    if guard.is_current(ticket) {
        sink(result);
    } else {
        debug!("Discarding superseded fetch {:?}", ticket);
    }
}
