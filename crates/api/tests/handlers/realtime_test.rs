use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use officehours_api::{build_router, config::ApiConfig, ApiState};
use chrono::Utc;
use officehours_core::{
    events::{ChannelEvent, ClientMessage, EventPublisher, PresenceChanged, QueueAction},
    models::presence::PresenceStatus,
    models::queue::JoinQueueRequest,
};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

async fn serve() -> (String, Arc<ApiState>) {
    serve_with(ApiConfig::default()).await
}

async fn serve_with(config: ApiConfig) -> (String, Arc<ApiState>) {
    let state = Arc::new(ApiState::in_memory(&config));
    let app = build_router(state.clone(), &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    (format!("ws://{addr}/ws"), state)
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a socket the way the gateway forwards it, with identity headers.
async fn connect_as(url: &str, user: Uuid) -> Socket {
    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        "x-user-id",
        HeaderValue::from_str(&user.to_string()).unwrap(),
    );
    request
        .headers_mut()
        .insert("x-user-role", HeaderValue::from_static("student"));
    let (socket, _) = connect_async(request).await.unwrap();
    socket
}

async fn next_event<S>(stream: &mut S, wanted: &str) -> ChannelEvent
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for event")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            let event: ChannelEvent = serde_json::from_str(&text).unwrap();
            if event.name() == wanted {
                return event;
            }
        }
    }
}

#[tokio::test]
async fn test_room_members_receive_queue_updates() {
    let (url, state) = serve().await;
    let (instructor, student) = (Uuid::new_v4(), Uuid::new_v4());

    let mut socket = connect_as(&url, instructor).await;
    let join = serde_json::to_string(&ClientMessage::join(instructor)).unwrap();
    socket.send(Message::Text(join)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    state
        .queue
        .join(
            student,
            JoinQueueRequest {
                instructor_id: instructor,
                schedule_id: None,
                question: None,
            },
        )
        .await
        .unwrap();

    match next_event(&mut socket, "queue-updated").await {
        ChannelEvent::QueueUpdated(update) => {
            assert_eq!(update.action, QueueAction::Joined);
            assert_eq!(update.instructor_id, instructor);
            assert_eq!(update.position, Some(1));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_connecting_marks_user_online_until_last_socket_closes() {
    let (url, state) = serve().await;
    let user = Uuid::new_v4();

    let first = connect_as(&url, user).await;
    let second = connect_as(&url, user).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let presence = state.presence.get(user).await.unwrap().unwrap();
    assert_eq!(presence.status.as_str(), "online");

    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let presence = state.presence.get(user).await.unwrap().unwrap();
    assert_eq!(presence.status.as_str(), "online");

    drop(second);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let presence = state.presence.get(user).await.unwrap().unwrap();
    assert_eq!(presence.status.as_str(), "offline");
}

#[tokio::test]
async fn test_query_identity_does_not_touch_presence() {
    let (url, state) = serve().await;
    let victim = Uuid::new_v4();

    let (socket, _) = connect_async(format!("{url}?userId={victim}")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.presence.get(victim).await.unwrap().is_none());

    state.presence.set_online(victim).await.unwrap();
    drop(socket);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let presence = state.presence.get(victim).await.unwrap().unwrap();
    assert_eq!(presence.status.as_str(), "online");
}

#[tokio::test]
async fn test_lagging_session_is_closed_for_resync() {
    let (url, state) = serve_with(ApiConfig {
        broadcast_capacity: 1,
        ..ApiConfig::default()
    })
    .await;
    let mut socket = connect_as(&url, Uuid::new_v4()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The current-thread runtime cannot run the session between these sends.
    for _ in 0..8 {
        state.hub.publish(ChannelEvent::PresenceChanged(PresenceChanged {
            user_id: Uuid::new_v4(),
            status: PresenceStatus::Away,
            activity: None,
            updated_at: Utc::now(),
        }));
    }

    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for close")
            .expect("socket ended without a close frame")
            .expect("socket error");
        if let Message::Close(frame) = frame {
            let frame = frame.expect("close frame carries a code");
            assert_eq!(u16::from(frame.code), 1013);
            break;
        }
    }
}
