/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */
use deadpool::managed::{Metrics, Object, RecycleError, RecycleResult, Timeouts};
use deadpool::Runtime;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::connection::{build_connection_info, none_if_zero};
use crate::errors::{RedPoolError, RedPoolResult};

/// Connection factory for the async pool. Staleness and lifetime enforcement
/// live in `recycle`, which deadpool runs before reusing an idle connection.
pub struct AsyncRedisConnectionManager {
    client: Client,
    test_on_borrow: Duration,
    max_lifetime: Duration,
}

impl deadpool::managed::Manager for AsyncRedisConnectionManager {
    type Type = MultiplexedConnection;
    type Error = RedisError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        // AUTH and SELECT ride on the client's connection info
        self.client.get_multiplexed_async_connection().await
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        metrics: &Metrics,
    ) -> RecycleResult<Self::Error> {
        if !self.max_lifetime.is_zero() && metrics.created.elapsed() >= self.max_lifetime {
            return Err(RecycleError::Message(
                "connection exceeded max lifetime".into(),
            ));
        }

        let idle = metrics
            .recycled
            .map(|t| t.elapsed())
            .unwrap_or_else(|| metrics.created.elapsed());
        if self.test_on_borrow.is_zero() || idle < self.test_on_borrow {
            return Ok(());
        }

        debug!(idle_ms = idle.as_millis() as u64, "revalidating stale connection");
        match redis::cmd("PING").query_async::<String>(conn).await {
            Ok(pong) if pong == "PONG" => Ok(()),
            Ok(_) => Err(RecycleError::Message("Invalid PONG response".into())),
            Err(e) => Err(RecycleError::Backend(e)),
        }
    }
}

/// Async counterpart of [`crate::RedisPool`], backed by deadpool on the
/// Tokio runtime. Same contract: constructed only by `dial`, PING-verified
/// before it is returned, borrowed connections return on guard drop.
pub struct AsyncRedisPool {
    name: String,
    addr: String,
    pool: deadpool::managed::Pool<AsyncRedisConnectionManager>,
    is_closed: AtomicBool,
}

impl std::fmt::Debug for AsyncRedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRedisPool")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("is_closed", &self.is_closed)
            .finish_non_exhaustive()
    }
}

impl AsyncRedisPool {
    pub async fn dial(config: &PoolConfig) -> RedPoolResult<Self> {
        config.validate()?;

        let conn_info = build_connection_info(config);
        let client = Client::open(conn_info).map_err(|e| RedPoolError::PoolError(e.to_string()))?;

        let manager = AsyncRedisConnectionManager {
            client,
            test_on_borrow: config.test_on_borrow,
            max_lifetime: config.max_conn_lifetime,
        };

        let create_timeout =
            none_if_zero(config.conn_timeout).unwrap_or(Duration::from_secs(10));
        // poolWait = false maps to a zero wait timeout: a saturated borrow
        // errors out instead of queueing
        let wait_timeout = if config.pool_wait {
            Some(create_timeout)
        } else {
            Some(Duration::ZERO)
        };

        let pool = deadpool::managed::Pool::builder(manager)
            .max_size(config.max_active_conn as usize)
            .timeouts(Timeouts {
                wait: wait_timeout,
                create: Some(create_timeout),
                recycle: Some(Duration::from_secs(5)),
            })
            .runtime(Runtime::Tokio1)
            .build()?;

        let pool = Self {
            name: config.name.clone(),
            addr: config.addr(),
            pool,
            is_closed: AtomicBool::new(false),
        };

        pool.ping().await?;
        info!(name = %pool.name, addr = %pool.addr, "redis pool dialed");
        Ok(pool)
    }

    pub async fn get(&self) -> RedPoolResult<Object<AsyncRedisConnectionManager>> {
        if self.is_closed.load(Ordering::Acquire) {
            return Err(RedPoolError::PoolClosed);
        }
        self.pool.get().await.map_err(RedPoolError::from)
    }

    /// Borrows one connection, issues PING and releases it on every exit path.
    pub async fn ping(&self) -> RedPoolResult<()> {
        if self.is_closed.load(Ordering::Acquire) {
            return Err(RedPoolError::PoolClosed);
        }

        let mut conn = self.pool.get().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn close(&self) {
        self.is_closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }
}
