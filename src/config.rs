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
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{RedPoolError, RedPoolResult};

/// Name under which a single-instance pool is registered, and the name the
/// registry resolves when a lookup omits one.
pub const DEFAULT_POOL_NAME: &str = "default";

/// Configuration for one Redis instance and the pool bound to it.
///
/// All duration fields are expressed in milliseconds at the configuration
/// boundary: a config file feeds integer millisecond values and serde turns
/// them into `Duration`s. A zero duration disables the corresponding bound
/// (no read timeout, no lifetime cap, no staleness check).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    /// Pool name, unique within a registry
    pub name: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// AUTH credential
    pub password: Option<String>,
    /// Logical database selected on connect
    pub database: i64,
    /// Connect / pool checkout timeout
    #[serde(with = "millis")]
    pub conn_timeout: Duration,
    /// Socket read timeout
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    /// Socket write timeout
    #[serde(with = "millis")]
    pub write_timeout: Duration,
    /// Idle connections kept warm
    pub max_idle_conn: u32,
    /// Upper bound on open connections
    pub max_active_conn: u32,
    /// Maximum lifetime of a single connection
    #[serde(with = "millis")]
    pub max_conn_lifetime: Duration,
    /// Idle eviction duration
    #[serde(with = "millis")]
    pub idle_timeout: Duration,
    /// Staleness threshold: a connection idle longer than this is re-verified
    /// with PING when borrowed; zero disables the check
    #[serde(with = "millis")]
    pub test_on_borrow: Duration,
    /// Whether a borrow blocks (true) or fails immediately (false) once the
    /// active bound is saturated
    pub pool_wait: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_POOL_NAME.to_string(),
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            database: 0,
            conn_timeout: Duration::from_millis(10_000),
            read_timeout: Duration::from_millis(10_000),
            write_timeout: Duration::from_millis(10_000),
            max_idle_conn: 10,
            max_active_conn: 20,
            max_conn_lifetime: Duration::ZERO,
            idle_timeout: Duration::from_millis(60_000),
            test_on_borrow: Duration::ZERO,
            pool_wait: false,
        }
    }
}

impl PoolConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_database(mut self, db: i64) -> Self {
        self.database = db;
        self
    }

    pub fn with_conn_timeout(mut self, timeout: Duration) -> Self {
        self.conn_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_idle_conn(mut self, count: u32) -> Self {
        self.max_idle_conn = count;
        self
    }

    pub fn with_max_active_conn(mut self, count: u32) -> Self {
        self.max_active_conn = count;
        self
    }

    pub fn with_max_conn_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_conn_lifetime = lifetime;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_test_on_borrow(mut self, threshold: Duration) -> Self {
        self.test_on_borrow = threshold;
        self
    }

    pub fn with_pool_wait(mut self, wait: bool) -> Self {
        self.pool_wait = wait;
        self
    }

    pub(crate) fn validate(&self) -> RedPoolResult<()> {
        if self.host.is_empty() {
            return Err(RedPoolError::ConfigError(
                "host cannot be empty".to_string(),
            ));
        }
        if self.max_active_conn == 0 {
            return Err(RedPoolError::ConfigError(
                "maxActiveConn cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shape of the configuration section feeding a registry: not present at
/// all, one instance, or an ordered sequence of named instances.
#[derive(Debug, Clone)]
pub enum PoolSource {
    Absent,
    Single(PoolConfig),
    Multiple(Vec<PoolConfig>),
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
