//! 基础设施层实现。
//!
//! 提供 PostgreSQL 仓储、Redis 计数器与房间事件传输等适配器，实现应用层定义的接口。

pub mod broadcast;
pub mod builder;
pub mod counter_store;
pub mod migrations;
pub mod repository;

pub use broadcast::{
    spawn_redis_relay, LocalRoomTransport, RedisRoomTransport, RoomDelivery, RoomSubscription,
};
pub use builder::{Infrastructure, InfrastructureConfig, InfrastructureError};
pub use counter_store::RedisCounterStore;
pub use migrations::MIGRATOR;
pub use repository::{create_pg_pool, PgQuestionRepository, PgSessionRepository, PgStorage};
