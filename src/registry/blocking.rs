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
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::{PoolConfig, PoolSource, DEFAULT_POOL_NAME};
use crate::connection::RedisPool;
use crate::errors::{RedPoolError, RedPoolResult};
use crate::registry::validate_names;

/// Name → pool mapping; the entry named `"default"` doubles as the default
/// pool, which [`RedisRegistry::default_pool`] resolves through the map.
///
/// Built once during startup and read many times after; the map tolerates
/// concurrent lookups and insertions. Constructed explicitly and handed to
/// consumers rather than living in a process global.
#[derive(Default)]
pub struct RedisRegistry {
    pools: RwLock<HashMap<String, Arc<RedisPool>>>,
}

impl RedisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a config source into dialed pools.
    ///
    /// `Absent` is a no-op. `Single` registers one pool under `"default"`,
    /// or registers nothing on failure. `Multiple` dials in declaration
    /// order and registers each pool as soon as its dial succeeds; the first
    /// failure aborts the remaining instances while earlier registrations
    /// stay in place. Duplicate names are last-write-wins, for the map and
    /// for the default pointer alike.
    pub fn initialize(&self, source: PoolSource) -> RedPoolResult<()> {
        match source {
            PoolSource::Absent => Ok(()),
            PoolSource::Single(conf) => {
                let pool = Arc::new(self.dial(&conf)?);
                self.pools
                    .write()
                    .insert(DEFAULT_POOL_NAME.to_string(), pool);
                Ok(())
            }
            PoolSource::Multiple(confs) => {
                validate_names(&confs)?;

                for conf in &confs {
                    let pool = Arc::new(self.dial(conf)?);
                    self.pools.write().insert(conf.name.clone(), pool);
                }
                Ok(())
            }
        }
    }

    fn dial(&self, conf: &PoolConfig) -> RedPoolResult<RedisPool> {
        RedisPool::dial(conf).map_err(|e| {
            warn!(name = %conf.name, addr = %conf.addr(), error = %e, "redis dial failed");
            match e {
                RedPoolError::ConfigError(_) => e,
                other => RedPoolError::DialError {
                    name: conf.name.clone(),
                    reason: other.to_string(),
                },
            }
        })
    }

    /// Fetches a pool by name; `None` resolves to `"default"`. A miss is a
    /// `NotConnected` error naming the pool that was asked for.
    pub fn lookup(&self, name: Option<&str>) -> RedPoolResult<Arc<RedisPool>> {
        let name = name.unwrap_or(DEFAULT_POOL_NAME);
        self.pools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RedPoolError::NotConnected(name.to_string()))
    }

    /// Equivalent to `lookup(None)`.
    pub fn default_pool(&self) -> RedPoolResult<Arc<RedisPool>> {
        self.lookup(None)
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Shutdown hook: marks every registered pool closed.
    pub fn close(&self) {
        for pool in self.pools.read().values() {
            pool.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spawn_fake_server;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn reachable(addr: SocketAddr, name: &str) -> PoolConfig {
        PoolConfig::new("127.0.0.1", addr.port())
            .with_name(name)
            .with_conn_timeout(Duration::from_millis(500))
            .with_max_idle_conn(1)
            .with_max_active_conn(2)
    }

    fn unreachable(name: &str) -> PoolConfig {
        PoolConfig::new("127.0.0.1", 1)
            .with_name(name)
            .with_conn_timeout(Duration::from_millis(200))
            .with_max_idle_conn(0)
            .with_max_active_conn(2)
    }

    #[test]
    fn test_absent_source_is_noop() {
        let registry = RedisRegistry::new();
        registry.initialize(PoolSource::Absent).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.default_pool(),
            Err(RedPoolError::NotConnected(_))
        ));
    }

    #[test]
    fn test_lookup_miss_is_not_connected() {
        let registry = RedisRegistry::new();
        let err = registry.lookup(Some("session")).unwrap_err();
        match err {
            RedPoolError::NotConnected(name) => assert_eq!(name, "session"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lookup_none_resolves_default_name() {
        let registry = RedisRegistry::new();
        match registry.lookup(None).unwrap_err() {
            RedPoolError::NotConnected(name) => assert_eq!(name, DEFAULT_POOL_NAME),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_single_dial_failure_registers_nothing() {
        let registry = RedisRegistry::new();
        let err = registry
            .initialize(PoolSource::Single(unreachable("default")))
            .unwrap_err();
        assert!(matches!(err, RedPoolError::DialError { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_multi_fails_fast_on_first_unreachable() {
        let registry = RedisRegistry::new();
        let err = registry
            .initialize(PoolSource::Multiple(vec![
                unreachable("first"),
                unreachable("second"),
            ]))
            .unwrap_err();

        // the failure is attributed to the first instance, in dial order
        match err {
            RedPoolError::DialError { name, .. } => assert_eq!(name, "first"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            registry.lookup(Some("first")),
            Err(RedPoolError::NotConnected(_))
        ));
        assert!(matches!(
            registry.lookup(Some("second")),
            Err(RedPoolError::NotConnected(_))
        ));
    }

    #[test]
    fn test_multi_rejects_unnamed_instance_before_dialing() {
        let registry = RedisRegistry::new();
        // unreachable addresses: validation must reject before any dial
        let err = registry
            .initialize(PoolSource::Multiple(vec![
                unreachable("first"),
                unreachable(""),
            ]))
            .unwrap_err();
        assert!(matches!(err, RedPoolError::ConfigError(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_multi_sets_default_from_named_entry() {
        let addr = spawn_fake_server();
        let registry = RedisRegistry::new();
        registry
            .initialize(PoolSource::Multiple(vec![
                reachable(addr, "cache"),
                reachable(addr, "default"),
            ]))
            .unwrap();

        assert_eq!(registry.len(), 2);
        let by_default = registry.default_pool().unwrap();
        let by_name = registry.lookup(Some(DEFAULT_POOL_NAME)).unwrap();
        assert!(Arc::ptr_eq(&by_default, &by_name));
        assert_eq!(registry.lookup(Some("cache")).unwrap().name(), "cache");
    }

    #[test]
    fn test_duplicate_default_is_last_write_wins() {
        let first = spawn_fake_server();
        let second = spawn_fake_server();
        let registry = RedisRegistry::new();
        registry
            .initialize(PoolSource::Multiple(vec![
                reachable(first, "default"),
                reachable(second, "default"),
            ]))
            .unwrap();

        // one entry survives, and both accessors resolve to the later one
        assert_eq!(registry.len(), 1);
        let pool = registry.default_pool().unwrap();
        assert_eq!(pool.addr(), format!("127.0.0.1:{}", second.port()));
        assert!(Arc::ptr_eq(
            &pool,
            &registry.lookup(Some(DEFAULT_POOL_NAME)).unwrap()
        ));
    }

    #[test]
    fn test_concurrent_lookups_never_tear() {
        let registry = Arc::new(RedisRegistry::new());
        registry.initialize(PoolSource::Absent).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        // a pool is either absent or fully usable, never torn
                        match registry.lookup(None) {
                            Ok(pool) => assert!(!pool.addr().is_empty()),
                            Err(RedPoolError::NotConnected(name)) => {
                                assert_eq!(name, DEFAULT_POOL_NAME)
                            }
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    #[ignore]
    fn test_single_instance_live_roundtrip() {
        // requires a redis server on 127.0.0.1:6379
        let registry = RedisRegistry::new();
        registry
            .initialize(PoolSource::Single(PoolConfig::default()))
            .unwrap();

        let by_default = registry.lookup(None).unwrap();
        let by_name = registry.lookup(Some(DEFAULT_POOL_NAME)).unwrap();
        assert!(Arc::ptr_eq(&by_default, &by_name));
        assert_eq!(by_default.addr(), "127.0.0.1:6379");
        by_default.ping().unwrap();

        registry.close();
        assert!(matches!(by_name.ping(), Err(RedPoolError::PoolClosed)));
    }
}
