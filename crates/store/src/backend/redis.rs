use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo, Script};
use tokio::sync::OnceCell;

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::r#trait::{AdmitOutcome, AdmitRequest, TtlValue, WindowStore};

/// KEYS[1] window set; ARGV now_ms, window_ms, limit, member, expire_ms.
/// Returns {admitted, count, oldest_score or -1}.
const ADMIT_SCRIPT_SRC: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]
local expire_ms = tonumber(ARGV[5])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local admitted = 0
if count < limit then
  redis.call('ZADD', key, now, member)
  redis.call('PEXPIRE', key, expire_ms)
  count = count + 1
  admitted = 1
end

local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
local oldest_score = -1
if oldest[2] then
  oldest_score = tonumber(oldest[2])
end
return {admitted, count, oldest_score}
"#;

#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    manager: Arc<OnceCell<ConnectionManager>>,
    prefix: Arc<String>,
    admit_script: Arc<Script>,
}

impl RedisStore {
    /// Checks the URL only. The connection opens on first use; a failed
    /// attempt surfaces as `STORE.UNAVAILABLE` and the next call retries.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut info = config
            .url
            .as_str()
            .into_connection_info()
            .map_err(|err| StoreError::unavailable("connect", &format!("redis url: {err}")))?;
        if let Some(password) = config.password.as_ref().filter(|p| !p.is_empty()) {
            info.redis.password = Some(password.clone());
        }
        let client = redis::Client::open(info)
            .map_err(|err| StoreError::unavailable("connect", &format!("redis client: {err}")))?;
        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
            prefix: Arc::new(config.key_prefix.clone()),
            admit_script: Arc::new(Script::new(ADMIT_SCRIPT_SRC)),
        })
    }

    async fn conn(&self, op: &'static str) -> Result<ConnectionManager, StoreError> {
        self.manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .cloned()
            .map_err(|err| StoreError::unavailable(op, &format!("redis connect: {err}")))
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

fn unavailable(op: &'static str) -> impl Fn(redis::RedisError) -> StoreError {
    move |err| StoreError::unavailable(op, &format!("redis {op}: {err}"))
}

#[async_trait]
impl WindowStore for RedisStore {
    async fn admit(&self, key: &str, req: AdmitRequest) -> Result<AdmitOutcome, StoreError> {
        let mut conn = self.conn("admit").await?;
        let reply: Vec<i64> = self
            .admit_script
            .key(self.namespaced(key))
            .arg(req.now_ms)
            .arg(req.window_ms)
            .arg(req.limit)
            .arg(req.member)
            .arg(req.expire_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable("admit"))?;

        let [admitted, count, oldest] = reply.as_slice() else {
            return Err(StoreError::codec(
                "admit",
                &format!("unexpected admit reply: {reply:?}"),
            ));
        };
        Ok(AdmitOutcome {
            admitted: *admitted == 1,
            count: (*count).max(0) as u64,
            oldest_ms: (*oldest >= 0).then_some(*oldest),
        })
    }

    async fn count(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<u64, StoreError> {
        let mut conn = self.conn("count").await?;
        let cutoff = format!("({}", now_ms - window_ms);
        let count: u64 = conn
            .zcount(self.namespaced(key), cutoff, "+inf")
            .await
            .map_err(unavailable("count"))?;
        Ok(count)
    }

    async fn purge_expired(&self, key: &str, cutoff_ms: i64) -> Result<u64, StoreError> {
        let mut conn = self.conn("purge_expired").await?;
        let removed: u64 = conn
            .zrembyscore(self.namespaced(key), "-inf", cutoff_ms)
            .await
            .map_err(unavailable("purge_expired"))?;
        Ok(removed)
    }

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn("set_ttl").await?;
        redis::cmd("SET")
            .arg(self.namespaced(key))
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable("set_ttl"))
    }

    async fn get_ttl(&self, key: &str) -> Result<Option<TtlValue>, StoreError> {
        let mut conn = self.conn("get_ttl").await?;
        let namespaced = self.namespaced(key);
        let (value, ttl_ms): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(&namespaced)
            .cmd("PTTL")
            .arg(&namespaced)
            .query_async(&mut conn)
            .await
            .map_err(unavailable("get_ttl"))?;
        // PTTL is -2 when the key vanished between commands and -1 without expiry.
        Ok(match value {
            Some(value) if ttl_ms != -2 => Some(TtlValue { value, ttl_ms }),
            _ => None,
        })
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: usize) -> Result<(), StoreError> {
        let mut conn = self.conn("push_capped").await?;
        let namespaced = self.namespaced(key);
        let stop = max_len.saturating_sub(1) as isize;
        redis::pipe()
            .atomic()
            .lpush(&namespaced, value)
            .ignore()
            .ltrim(&namespaced, 0, stop)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable("push_capped"))
    }

    async fn list_recent(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn("list_recent").await?;
        conn.lrange(self.namespaced(key), 0, limit as isize - 1)
            .await
            .map_err(unavailable("list_recent"))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn("ping").await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(unavailable("ping"))
    }
}
