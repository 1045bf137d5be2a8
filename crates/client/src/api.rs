//! HTTP access to the office-hours API.

use async_trait::async_trait;
use officehours_core::models::{
    actor::Actor,
    presence::{BulkPresenceRequest, BulkPresenceResponse, PresenceRecord},
    queue::{JoinQueueRequest, JoinQueueResponse, MyQueueStatus, QueueEntry, QueueEntryResponse, QueueSnapshot},
};
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// The calls the queue view depends on.
#[async_trait]
pub trait QueueApi: Send + Sync {
    async fn get_queue(&self, instructor_id: Uuid) -> ClientResult<QueueSnapshot>;

    async fn join(&self, request: JoinQueueRequest) -> ClientResult<JoinQueueResponse>;

    async fn my_entry(&self, instructor_id: Uuid) -> ClientResult<MyQueueStatus>;

    async fn admit(&self, queue_id: Uuid) -> ClientResult<QueueEntry>;

    async fn complete(&self, queue_id: Uuid) -> ClientResult<QueueEntry>;

    async fn cancel(&self, queue_id: Uuid) -> ClientResult<QueueEntry>;

    async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> ClientResult<Vec<PresenceRecord>>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

/// [`QueueApi`] over reqwest, sending the gateway identity headers.
#[derive(Clone)]
pub struct HttpQueueApi {
    client: reqwest::Client,
    base_url: String,
    actor: Actor,
}

impl HttpQueueApi {
    pub fn new(base_url: impl Into<String>, actor: Actor) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            actor,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-user-id", self.actor.user_id.to_string())
            .header("x-user-role", self.actor.role.as_str())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        decode(response).await
    }

    async fn entry_action(&self, queue_id: Uuid, action: &str) -> ClientResult<QueueEntry> {
        debug!("POST {} on queue entry {}", action, queue_id);
        let response: QueueEntryResponse = self
            .send(self.request(
                Method::POST,
                &format!("/api/office-hours/queue/{}/{}", queue_id, action),
            ))
            .await?;
        Ok(response.queue_entry)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<ErrorBody>(&body) {
            Ok(error) => ClientError::Api {
                status,
                code: error.code,
                message: error.error,
            },
            Err(_) => ClientError::Api {
                status,
                code: "unknown".to_string(),
                message: body,
            },
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl QueueApi for HttpQueueApi {
    async fn get_queue(&self, instructor_id: Uuid) -> ClientResult<QueueSnapshot> {
        self.send(self.request(
            Method::GET,
            &format!("/api/office-hours/queue/{}", instructor_id),
        ))
        .await
    }

    async fn join(&self, request: JoinQueueRequest) -> ClientResult<JoinQueueResponse> {
        self.send(
            self.request(Method::POST, "/api/office-hours/queue/join")
                .json(&request),
        )
        .await
    }

    async fn my_entry(&self, instructor_id: Uuid) -> ClientResult<MyQueueStatus> {
        self.send(self.request(
            Method::GET,
            &format!("/api/office-hours/my-queue/{}", instructor_id),
        ))
        .await
    }

    async fn admit(&self, queue_id: Uuid) -> ClientResult<QueueEntry> {
        self.entry_action(queue_id, "admit").await
    }

    async fn complete(&self, queue_id: Uuid) -> ClientResult<QueueEntry> {
        self.entry_action(queue_id, "complete").await
    }

    async fn cancel(&self, queue_id: Uuid) -> ClientResult<QueueEntry> {
        self.entry_action(queue_id, "cancel").await
    }

    async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> ClientResult<Vec<PresenceRecord>> {
        let response: BulkPresenceResponse = self
            .send(
                self.request(Method::POST, "/api/presence/bulk")
                    .json(&BulkPresenceRequest { user_ids }),
            )
            .await?;
        Ok(response.presences)
    }
}
