//! Redis Tier Module
//!
//! Remote tier backed by Redis. Population runs in a `MULTI/EXEC` pipeline and
//! the range read runs as one Lua script, so neither can interleave with a
//! concurrent sweep.

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::{AsyncCommands, Script, Value};
use tracing::{debug, info};

use crate::cache::tier::{RangeReply, RangeWrite, RemoteTier, EXPIRE_INDEX_KEY, HIT_COUNT_KEY};
use crate::error::{Result, ServiceError};

/// KEYS: sorted set, hashmap, expiration index, hit-count table.
/// ARGV: rank start, rank end, serialized location.
const RANGE_SCRIPT: &str = r#"
local k = redis.call('ZRANGE', KEYS[1], ARGV[1], ARGV[2])
if (#k > 0) then
    redis.call('ZINCRBY', KEYS[3], 3600, ARGV[3])
    return {redis.call('HMGET', KEYS[4], KEYS[1]), redis.call('HMGET', KEYS[2], unpack(k))}
else
    return {0, k}
end
"#;

/// Creates a Redis connection pool and verifies connectivity.
pub async fn create_pool(url: &str, max_size: usize) -> Result<Pool> {
    info!("Creating Redis connection pool...");

    let pool = PoolConfig::from_url(url)
        .builder()
        .map_err(|e| ServiceError::Internal(format!("Invalid Redis config: {}", e)))?
        .max_size(max_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| ServiceError::Internal(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection pool created successfully");
    Ok(pool)
}

// == Redis Tier ==
/// Remote tier talking to Redis through a shared pool.
pub struct RedisTier {
    pool: Pool,
    range_script: Script,
}

impl RedisTier {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            range_script: Script::new(RANGE_SCRIPT),
        }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn put_range(&self, write: RangeWrite<'_>) -> Result<()> {
        let mut conn = self.conn().await?;

        let members: Vec<(f64, &str)> = write
            .members
            .iter()
            .map(|m| (m.score, m.member.as_str()))
            .collect();
        let fields: Vec<(&str, &str)> = write
            .fields
            .iter()
            .map(|(f, v)| (f.as_str(), v.as_str()))
            .collect();

        let mut pipe = redis::pipe();
        pipe.atomic();
        if !members.is_empty() {
            pipe.zadd_multiple(write.sort_key, &members).ignore();
        }
        pipe.zadd(EXPIRE_INDEX_KEY, write.location_member, write.expire_at)
            .ignore();
        if !fields.is_empty() {
            pipe.hset_multiple(write.data_key, &fields).ignore();
        }
        pipe.hset(HIT_COUNT_KEY, write.sort_key, write.total).ignore();

        let _: () = pipe.query_async(&mut *conn).await?;
        debug!(
            sort_key = %write.sort_key,
            data_key = %write.data_key,
            members = members.len(),
            "Range population committed"
        );
        Ok(())
    }

    async fn range(
        &self,
        sort_key: &str,
        data_key: &str,
        start: i64,
        end: i64,
        location_member: &str,
    ) -> Result<RangeReply> {
        let mut conn = self.conn().await?;

        let value: Value = self
            .range_script
            .key(sort_key)
            .key(data_key)
            .key(EXPIRE_INDEX_KEY)
            .key(HIT_COUNT_KEY)
            .arg(start)
            .arg(end)
            .arg(location_member)
            .invoke_async(&mut *conn)
            .await?;

        Ok(parse_range_reply(value))
    }

    async fn expired_members(&self, now: i64) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.zrangebyscore(EXPIRE_INDEX_KEY, 0i64, now).await?)
    }

    async fn sorted_page(&self, key: &str, offset: usize, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let start = offset as isize;
        let stop = start + count as isize - 1;
        Ok(conn.zrange(key, start, stop).await?)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let _: () = conn.hdel(key, fields.to_vec()).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn remove_expiration(&self, member: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.zrem(EXPIRE_INDEX_KEY, member).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut *conn).await?;
        Ok(())
    }
}

/// Interprets the script reply: `{0, {}}` on no match, otherwise
/// `{{total}, {record, ...}}`. Any other shape is reported as unexpected.
fn parse_range_reply(value: Value) -> RangeReply {
    let Value::Array(mut parts) = value else {
        return RangeReply::Unexpected;
    };
    if parts.len() != 2 {
        return RangeReply::Unexpected;
    }
    let (totals, records) = match (parts.remove(0), parts.remove(0)) {
        (Value::Int(_), Value::Array(members)) if members.is_empty() => {
            return RangeReply::Empty;
        }
        pair => pair,
    };

    let totals: Vec<Option<String>> = match redis::from_redis_value(&totals) {
        Ok(totals) => totals,
        Err(_) => return RangeReply::Unexpected,
    };
    let records: Vec<Option<String>> = match redis::from_redis_value(&records) {
        Ok(records) => records,
        Err(_) => return RangeReply::Unexpected,
    };
    if totals.len() != 1 {
        return RangeReply::Unexpected;
    }

    RangeReply::Hit {
        total: totals.into_iter().next().flatten(),
        records,
    }
}
