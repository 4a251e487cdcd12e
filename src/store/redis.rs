//! Redis-backed counter store.
//!
//! Uses `redis::aio::ConnectionManager`: a single long-lived, self-healing
//! connection shared by every request task. Redis serializes commands, so
//! the manager is safe for concurrent use without extra pooling discipline.
//!
//! Every operation is bounded by a timeout; a call that does not return in
//! time is reported as [`StoreError::Unavailable`] rather than left pending.
//! No operation is retried here.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::{CounterStore, StoreError, TtlState};

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCounterStore {
    /// Connect to the store.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_timeout(url, DEFAULT_OP_TIMEOUT).await
    }

    /// Connect with a custom per-operation timeout.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the initial connection fails.
    pub async fn connect_with_timeout(url: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|err| StoreError::Unavailable {
            reason: format!("invalid store URL: {err}"),
        })?;
        let manager = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Unavailable {
                reason: format!("connect timed out after {op_timeout:?}"),
            })?
            .map_err(|err| StoreError::Unavailable {
                reason: format!("failed to connect: {err}"),
            })?;

        debug!("Connected to counter store");

        Ok(Self {
            manager,
            op_timeout,
        })
    }

    async fn run<T, F>(&self, op: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(StoreError::Unavailable {
                reason: format!("{op} failed: {err}"),
            }),
            Err(_) => Err(StoreError::Unavailable {
                reason: format!("{op} timed out after {:?}", self.op_timeout),
            }),
        }
    }
}

#[async_trait::async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.manager.clone();
        self.run("INCR", async move { conn.incr(key, 1).await }).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self.run("EXPIRE", async move { conn.expire(key, seconds).await })
            .await
    }

    async fn ttl_remaining(&self, key: &str) -> Result<TtlState, StoreError> {
        let mut conn = self.manager.clone();
        let ttl: i64 = self.run("TTL", async move { conn.ttl(key).await }).await?;
        Ok(match ttl {
            -2 => TtlState::Missing,
            -1 => TtlState::NoExpiry,
            seconds => TtlState::Remaining(u64::try_from(seconds).unwrap_or(0)),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        self.run("GET", async move { conn.get(key).await }).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        self.run("SET", async move { conn.set(key, value).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        self.run("DEL", async move { conn.del(key).await }).await
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Accepts connections and reads forever without ever replying.
    async fn stalled_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    while let Ok(n) = socket.read(&mut buf).await {
                        if n == 0 {
                            return;
                        }
                    }
                });
            }
        });
        format!("redis://{addr}")
    }

    #[tokio::test]
    async fn stalled_operation_becomes_unavailable_within_the_timeout() {
        let url = stalled_server().await;
        let op_timeout = Duration::from_millis(200);
        let store = RedisCounterStore::connect_with_timeout(&url, op_timeout)
            .await
            .unwrap();

        let start = Instant::now();
        let result = store.increment("throttle:signin:10.0.0.1").await;
        let elapsed = start.elapsed();

        match result {
            Err(StoreError::Unavailable { reason }) => {
                assert!(reason.contains("timed out"), "unexpected reason: {reason}");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert!(elapsed >= op_timeout);
        assert!(elapsed < Duration::from_secs(2));
    }
}
