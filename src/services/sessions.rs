//! Anonymous per-visitor sessions and the visit counter

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use redis::Client;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Session identified by the cookie value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    /// Minted on this request; the cookie must be set on the response
    pub is_new: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            is_new: true,
        }
    }

    /// Resume from a cookie value, or start over if it is not a session id
    pub fn from_cookie(value: Option<&str>) -> Self {
        match value.and_then(|v| Uuid::parse_str(v).ok()) {
            Some(id) => Self { id, is_new: false },
            None => Self::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session counters
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Increment a counter and return the new value
    async fn increment(&self, session_id: Uuid, key: &str) -> AppResult<i64>;
}

fn counter_key(session_id: Uuid, key: &str) -> String {
    format!("session:{}:{}", session_id, key)
}

/// Session counters kept in Redis with a sliding TTL
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Create a new Redis session store and check the connection
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client, ttl_seconds })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn increment(&self, session_id: Uuid, key: &str) -> AppResult<i64> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))?;

        let key = counter_key(session_id, key);
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&key)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Failed to increment {}: {}", key, e)))?;

        Ok(count)
    }
}

/// Session counters kept in process memory
pub struct MemorySessionStore {
    counters: Mutex<HashMap<String, (i64, Instant)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn increment(&self, session_id: Uuid, key: &str) -> AppResult<i64> {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;
        counters.retain(|_, (_, expires)| *expires > now);

        let entry = counters
            .entry(counter_key(session_id, key))
            .or_insert((0, now));
        entry.0 += 1;
        entry.1 = now + self.ttl;
        Ok(entry.0)
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Count a visit and return how many visits preceded it
    pub async fn record_visit(&self, session: &Session) -> AppResult<i64> {
        let visits = self.store.increment(session.id, "num_visits").await?;
        Ok(visits - 1)
    }
}
