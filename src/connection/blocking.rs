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
use r2d2::{Pool, PooledConnection};
use redis::{Client, Connection, ConnectionLike, RedisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::connection::{build_connection_info, none_if_zero};
use crate::errors::{RedPoolError, RedPoolResult};

/// A pooled connection together with the instant it was last borrowed.
/// The timestamp drives the staleness check; it is refreshed on every
/// checkout, so the measured interval is always at least the true idle time.
pub struct TrackedConnection {
    conn: Connection,
    last_used: Instant,
}

impl std::fmt::Debug for TrackedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedConnection")
            .field("last_used", &self.last_used)
            .finish_non_exhaustive()
    }
}

impl ConnectionLike for TrackedConnection {
    fn req_packed_command(&mut self, cmd: &[u8]) -> redis::RedisResult<redis::Value> {
        self.conn.req_packed_command(cmd)
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> redis::RedisResult<Vec<redis::Value>> {
        self.conn.req_packed_commands(cmd, offset, count)
    }

    fn get_db(&self) -> i64 {
        self.conn.get_db()
    }

    fn check_connection(&mut self) -> bool {
        self.conn.check_connection()
    }

    fn is_open(&self) -> bool {
        self.conn.is_open()
    }
}

/// Connection factory for the blocking pool: opens an authenticated TCP
/// connection, selects the configured database (both carried by the
/// connection info) and applies the socket timeouts.
pub struct RedisConnectionManager {
    client: Client,
    conn_timeout: Duration,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    test_on_borrow: Duration,
}

impl r2d2::ManageConnection for RedisConnectionManager {
    type Connection = TrackedConnection;
    type Error = RedisError;

    fn connect(&self) -> Result<TrackedConnection, RedisError> {
        let conn = self.client.get_connection_with_timeout(self.conn_timeout)?;
        conn.set_read_timeout(self.read_timeout)?;
        conn.set_write_timeout(self.write_timeout)?;
        Ok(TrackedConnection {
            conn,
            last_used: Instant::now(),
        })
    }

    fn is_valid(&self, conn: &mut TrackedConnection) -> Result<(), RedisError> {
        let idle = conn.last_used.elapsed();
        conn.last_used = Instant::now();

        if self.test_on_borrow.is_zero() || idle < self.test_on_borrow {
            return Ok(());
        }

        debug!(idle_ms = idle.as_millis() as u64, "revalidating stale connection");
        redis::cmd("PING").query::<String>(&mut conn.conn)?;
        Ok(())
    }

    fn has_broken(&self, conn: &mut TrackedConnection) -> bool {
        !conn.conn.is_open()
    }
}

/// A verified blocking connection pool bound to one Redis instance.
///
/// Only [`RedisPool::dial`] constructs one, and it never returns before a
/// borrowed connection has answered PING, so a handle in caller hands is
/// always live-verified. Borrowed connections return to the pool when the
/// [`PooledConnection`] guard drops, on every exit path.
pub struct RedisPool {
    name: String,
    addr: String,
    pool: Pool<RedisConnectionManager>,
    wait: bool,
    max_active: u32,
    checkout_timeout: Duration,
    is_closed: AtomicBool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("wait", &self.wait)
            .field("is_closed", &self.is_closed)
            .finish_non_exhaustive()
    }
}

impl RedisPool {
    /// Builds the pool for `config` and verifies reachability with a PING
    /// round-trip before handing it out.
    pub fn dial(config: &PoolConfig) -> RedPoolResult<Self> {
        config.validate()?;

        let conn_info = build_connection_info(config);
        let client = Client::open(conn_info).map_err(|e| RedPoolError::PoolError(e.to_string()))?;

        let checkout_timeout =
            none_if_zero(config.conn_timeout).unwrap_or(Duration::from_secs(10));

        let manager = RedisConnectionManager {
            client,
            conn_timeout: checkout_timeout,
            read_timeout: none_if_zero(config.read_timeout),
            write_timeout: none_if_zero(config.write_timeout),
            test_on_borrow: config.test_on_borrow,
        };

        let pool = Pool::builder()
            .max_size(config.max_active_conn)
            .min_idle(Some(config.max_idle_conn.min(config.max_active_conn)))
            .connection_timeout(checkout_timeout)
            .max_lifetime(none_if_zero(config.max_conn_lifetime))
            .idle_timeout(none_if_zero(config.idle_timeout))
            .test_on_check_out(true)
            .build(manager)?;

        let pool = Self {
            name: config.name.clone(),
            addr: config.addr(),
            pool,
            wait: config.pool_wait,
            max_active: config.max_active_conn,
            checkout_timeout,
            is_closed: AtomicBool::new(false),
        };

        pool.ping()?;
        info!(name = %pool.name, addr = %pool.addr, "redis pool dialed");
        Ok(pool)
    }

    /// Borrows a connection. With `poolWait = true` this blocks up to the
    /// configured checkout timeout when the active bound is saturated; with
    /// `poolWait = false` a saturated borrow fails immediately, while a
    /// borrow below the bound still opens a fresh connection.
    pub fn get(&self) -> RedPoolResult<PooledConnection<RedisConnectionManager>> {
        if self.is_closed.load(Ordering::Acquire) {
            return Err(RedPoolError::PoolClosed);
        }

        if self.wait {
            return self.pool.get().map_err(RedPoolError::from);
        }
        if let Some(conn) = self.pool.try_get() {
            return Ok(conn);
        }
        // no idle connection, but the active bound is not reached yet:
        // open a fresh one, bounded by the checkout timeout
        if self.pool.state().connections < self.max_active {
            return self
                .pool
                .get_timeout(self.checkout_timeout)
                .map_err(RedPoolError::from);
        }
        Err(RedPoolError::PoolError(
            "connection pool exhausted".to_string(),
        ))
    }

    /// Borrows one connection, issues PING and releases it. The connection
    /// goes back to the pool whether or not the command succeeds.
    pub fn ping(&self) -> RedPoolResult<()> {
        if self.is_closed.load(Ordering::Acquire) {
            return Err(RedPoolError::PoolClosed);
        }

        let mut conn = self.pool.get()?;
        redis::cmd("PING").query::<String>(&mut *conn)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Shutdown hook: later borrows fail with `PoolClosed`. Idle connections
    /// are dropped with the pool itself.
    pub fn close(&self) {
        self.is_closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }
}
