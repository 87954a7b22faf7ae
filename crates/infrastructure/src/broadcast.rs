use std::collections::HashSet;
use std::time::Duration;

use application::{BroadcastError, RealtimeTransport, RoomEvent};
use async_trait::async_trait;
use domain::Room;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// 进程内的房间事件总线。每个连接订阅后按自己加入的房间过滤
#[derive(Clone)]
pub struct LocalRoomTransport {
    sender: broadcast::Sender<RoomEvent>,
}

impl LocalRoomTransport {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self, rooms: impl IntoIterator<Item = Room>) -> RoomSubscription {
        RoomSubscription {
            receiver: self.sender.subscribe(),
            rooms: rooms.into_iter().map(|room| room.to_string()).collect(),
        }
    }

    /// 没有订阅者时直接丢弃
    pub fn deliver(&self, event: RoomEvent) -> Result<(), BroadcastError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(event)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RealtimeTransport for LocalRoomTransport {
    async fn publish(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), BroadcastError> {
        self.deliver(RoomEvent::new(room, event, payload))
    }
}

/// 订阅端收到的内容
#[derive(Debug, Clone)]
pub enum RoomDelivery {
    Event(RoomEvent),
    /// 订阅端落后于总线，中间有 `skipped` 条事件（含其他房间）被丢弃
    Lagged { skipped: u64 },
}

/// 某个连接的房间订阅
pub struct RoomSubscription {
    receiver: broadcast::Receiver<RoomEvent>,
    rooms: HashSet<String>,
}

impl RoomSubscription {
    pub fn is_member(&self, room: &Room) -> bool {
        self.rooms.contains(&room.to_string())
    }

    /// 下一条属于已加入房间的事件或一次落后通知，总线关闭时返回 None
    pub async fn recv(&mut self) -> Option<RoomDelivery> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.rooms.contains(&event.room) => {
                    return Some(RoomDelivery::Event(event))
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "room subscription lagged, events dropped");
                    return Some(RoomDelivery::Lagged { skipped });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// 跳过落后通知，只取事件
    pub async fn recv_event(&mut self) -> Option<RoomEvent> {
        loop {
            match self.recv().await? {
                RoomDelivery::Event(event) => return Some(event),
                RoomDelivery::Lagged { .. } => continue,
            }
        }
    }
}

/// 通过 Redis 频道发布房间事件，多个实例共享同一组房间
#[derive(Clone)]
pub struct RedisRoomTransport {
    connection: ConnectionManager,
    channel: String,
}

impl RedisRoomTransport {
    pub async fn connect(redis_url: &str, channel: impl Into<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self {
            connection,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl RealtimeTransport for RedisRoomTransport {
    async fn publish(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), BroadcastError> {
        let message = serde_json::to_string(&RoomEvent::new(room, event, payload))
            .map_err(|err| BroadcastError::failed(err.to_string()))?;

        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(message)
            .query_async(&mut conn)
            .await
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

const RELAY_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// 订阅 Redis 频道并把事件转交给本地总线。连接断开后按指数退避重连
pub fn spawn_redis_relay(
    client: redis::Client,
    channel: String,
    local: LocalRoomTransport,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = Duration::from_millis(500);
        loop {
            match relay_once(&client, &channel, &local).await {
                Ok(()) => {
                    tracing::warn!(channel = %channel, "redis relay stream ended, reconnecting");
                    backoff = Duration::from_millis(500);
                }
                Err(err) => {
                    tracing::error!(channel = %channel, error = %err, "redis relay failed");
                }
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(RELAY_MAX_BACKOFF);
        }
    })
}

async fn relay_once(
    client: &redis::Client,
    channel: &str,
    local: &LocalRoomTransport,
) -> Result<(), redis::RedisError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    tracing::info!(channel, "redis relay subscribed");

    let mut messages = pubsub.on_message();
    while let Some(message) = messages.next().await {
        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "unreadable relay payload");
                continue;
            }
        };

        match serde_json::from_str::<RoomEvent>(&payload) {
            Ok(event) => {
                if let Err(err) = local.deliver(event) {
                    tracing::warn!(error = %err, "failed to deliver relayed event");
                }
            }
            Err(err) => tracing::warn!(error = %err, "malformed relay payload"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::SessionId;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscription_only_sees_joined_rooms() {
        let transport = LocalRoomTransport::new(16);
        let session = SessionId::from(Uuid::new_v4());
        let mut student = transport.subscribe([Room::Session(session)]);
        let mut instructor =
            transport.subscribe([Room::Session(session), Room::Instructors(session)]);

        transport
            .publish(&Room::Instructors(session), "question:created", json!({ "n": 1 }))
            .await
            .unwrap();
        transport
            .publish(&Room::Session(session), "question:created", json!({ "n": 2 }))
            .await
            .unwrap();

        assert_eq!(student.recv_event().await.unwrap().payload["n"], 2);
        assert_eq!(instructor.recv_event().await.unwrap().payload["n"], 1);
        assert_eq!(instructor.recv_event().await.unwrap().payload["n"], 2);
        assert!(student.is_member(&Room::Session(session)));
        assert!(!student.is_member(&Room::Instructors(session)));
    }

    #[tokio::test]
    async fn other_sessions_are_filtered_out() {
        let transport = LocalRoomTransport::new(16);
        let mine = SessionId::from(Uuid::new_v4());
        let other = SessionId::from(Uuid::new_v4());
        let mut subscription = transport.subscribe([Room::Session(mine)]);

        transport
            .publish(&Room::Session(other), "question:created", json!({ "n": 1 }))
            .await
            .unwrap();
        transport
            .publish(&Room::Session(mine), "question:created", json!({ "n": 2 }))
            .await
            .unwrap();

        let event = subscription.recv_event().await.unwrap();
        assert_eq!(event.room, Room::Session(mine).to_string());
        assert_eq!(event.payload["n"], 2);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_ok() {
        let transport = LocalRoomTransport::new(4);
        transport
            .publish(
                &Room::Session(SessionId::from(Uuid::new_v4())),
                "question:created",
                json!({}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_how_many_events_it_missed() {
        let transport = LocalRoomTransport::new(2);
        let session = SessionId::from(Uuid::new_v4());
        let mut subscription = transport.subscribe([Room::Session(session)]);

        for n in 1..=4 {
            transport
                .publish(&Room::Session(session), "question:created", json!({ "n": n }))
                .await
                .unwrap();
        }

        match subscription.recv().await {
            Some(RoomDelivery::Lagged { skipped }) => assert_eq!(skipped, 2),
            other => panic!("expected lag notice, got {other:?}"),
        }
        assert_eq!(subscription.recv_event().await.unwrap().payload["n"], 3);
        assert_eq!(subscription.recv_event().await.unwrap().payload["n"], 4);
    }
}
