use chrono::Utc;
use officehours_client::channel::{ChannelSignal, RealtimeChannel, Subscription, Topic};
use officehours_core::{
    events::{ChannelEvent, ClientMessage, PresenceChanged},
    models::presence::PresenceStatus,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::support::{eventually, queue_updated, FakeProvider};

const RETRY: Duration = Duration::from_millis(10);

async fn next_signal(subscription: &mut Subscription) -> ChannelSignal {
    timeout(Duration::from_secs(2), subscription.recv())
        .await
        .expect("timed out waiting for a signal")
        .expect("channel closed")
}

async fn assert_silent(subscription: &mut Subscription) {
    assert!(
        timeout(Duration::from_millis(50), subscription.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_joins_rooms_and_routes_events_by_room() {
    let (provider, mut servers) = FakeProvider::with_links(1);
    let channel = RealtimeChannel::new(Arc::new(provider), RETRY);
    let (mine, other) = (Uuid::new_v4(), Uuid::new_v4());

    let mut subscription = channel.subscribe(Topic::Queue(mine));
    let handle = channel.start();
    let mut server = servers.remove(0);

    assert_eq!(server.next_frame().await, ClientMessage::join(mine));
    assert_eq!(next_signal(&mut subscription).await, ChannelSignal::Reconnected);
    assert!(channel.is_connected());

    server.events.send(queue_updated(other)).unwrap();
    server.events.send(queue_updated(mine)).unwrap();
    match next_signal(&mut subscription).await {
        ChannelSignal::Event(event) => assert_eq!(event.room(), Some(mine)),
        other => panic!("unexpected signal {:?}", other),
    }
    assert_silent(&mut subscription).await;

    channel.shutdown();
    handle.await.unwrap();
    assert_eq!(server.next_frame().await, ClientMessage::leave(mine));
}

#[tokio::test]
async fn test_reconnect_rejoins_rooms_and_signals_refetch() {
    let (provider, mut servers) = FakeProvider::with_links(2);
    let channel = RealtimeChannel::new(Arc::new(provider), RETRY);
    let room = Uuid::new_v4();

    let mut subscription = channel.subscribe(Topic::Queue(room));
    let handle = channel.start();

    let mut first = servers.remove(0);
    assert_eq!(first.next_frame().await, ClientMessage::join(room));
    assert_eq!(next_signal(&mut subscription).await, ChannelSignal::Reconnected);

    // Server goes away.
    drop(first);

    let mut second = servers.remove(0);
    assert_eq!(second.next_frame().await, ClientMessage::join(room));
    assert_eq!(next_signal(&mut subscription).await, ChannelSignal::Reconnected);

    second.events.send(queue_updated(room)).unwrap();
    assert!(matches!(
        next_signal(&mut subscription).await,
        ChannelSignal::Event(ChannelEvent::QueueUpdated(_))
    ));

    channel.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_room_membership_follows_subscribers() {
    let (provider, mut servers) = FakeProvider::with_links(1);
    let channel = RealtimeChannel::new(Arc::new(provider), RETRY);
    let room = Uuid::new_v4();

    let mut presence = channel.subscribe(Topic::Presence);
    let handle = channel.start();
    assert_eq!(next_signal(&mut presence).await, ChannelSignal::Reconnected);
    let mut server = servers.remove(0);

    let first = channel.subscribe(Topic::Queue(room));
    let second = channel.subscribe(Topic::Queue(room));
    assert_eq!(server.next_frame().await, ClientMessage::join(room));

    drop(first);
    drop(second);
    // Exactly one join was sent, so the next frame is the leave.
    assert_eq!(server.next_frame().await, ClientMessage::leave(room));

    channel.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_presence_events_are_global() {
    let (provider, mut servers) = FakeProvider::with_links(1);
    let channel = RealtimeChannel::new(Arc::new(provider), RETRY);

    let mut queue = channel.subscribe(Topic::Queue(Uuid::new_v4()));
    let mut presence = channel.subscribe(Topic::Presence);
    let handle = channel.start();
    let server = servers.remove(0);
    assert_eq!(next_signal(&mut queue).await, ChannelSignal::Reconnected);
    assert_eq!(next_signal(&mut presence).await, ChannelSignal::Reconnected);

    let change = ChannelEvent::PresenceChanged(PresenceChanged {
        user_id: Uuid::new_v4(),
        status: PresenceStatus::Away,
        activity: None,
        updated_at: Utc::now(),
    });
    server.events.send(change.clone()).unwrap();

    assert_eq!(next_signal(&mut presence).await, ChannelSignal::Event(change));
    assert_silent(&mut queue).await;

    channel.shutdown();
    handle.await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_unreachable_server_is_not_fatal() {
    let (provider, _servers) = FakeProvider::with_links(0);
    let channel = RealtimeChannel::new(Arc::new(provider), RETRY);
    let mut subscription = channel.subscribe(Topic::Queue(Uuid::new_v4()));
    let handle = channel.start();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!channel.is_connected());
    assert_silent(&mut subscription).await;

    channel.shutdown();
    eventually(|| handle.is_finished()).await;
}
