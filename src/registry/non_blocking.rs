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
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::{PoolConfig, PoolSource, DEFAULT_POOL_NAME};
use crate::connection::AsyncRedisPool;
use crate::errors::{RedPoolError, RedPoolResult};
use crate::registry::validate_names;

/// Async counterpart of [`crate::RedisRegistry`], same initialize/lookup
/// contract over [`AsyncRedisPool`].
#[derive(Default)]
pub struct AsyncRedisRegistry {
    pools: RwLock<HashMap<String, Arc<AsyncRedisPool>>>,
}

impl AsyncRedisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances of a `Multiple` source are dialed strictly in sequence so a
    /// failure surfaces the unreachable instance and aborts the rest, with
    /// already-dialed pools left registered.
    pub async fn initialize(&self, source: PoolSource) -> RedPoolResult<()> {
        match source {
            PoolSource::Absent => Ok(()),
            PoolSource::Single(conf) => {
                let pool = Arc::new(self.dial(&conf).await?);
                self.pools
                    .write()
                    .await
                    .insert(DEFAULT_POOL_NAME.to_string(), pool);
                Ok(())
            }
            PoolSource::Multiple(confs) => {
                validate_names(&confs)?;

                for conf in &confs {
                    let pool = Arc::new(self.dial(conf).await?);
                    self.pools.write().await.insert(conf.name.clone(), pool);
                }
                Ok(())
            }
        }
    }

    async fn dial(&self, conf: &PoolConfig) -> RedPoolResult<AsyncRedisPool> {
        AsyncRedisPool::dial(conf).await.map_err(|e| {
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

    pub async fn lookup(&self, name: Option<&str>) -> RedPoolResult<Arc<AsyncRedisPool>> {
        let name = name.unwrap_or(DEFAULT_POOL_NAME);
        self.pools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RedPoolError::NotConnected(name.to_string()))
    }

    pub async fn default_pool(&self) -> RedPoolResult<Arc<AsyncRedisPool>> {
        self.lookup(None).await
    }

    pub async fn len(&self) -> usize {
        self.pools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pools.read().await.is_empty()
    }

    /// Shutdown hook: marks every registered pool closed.
    pub async fn close(&self) {
        for pool in self.pools.read().await.values() {
            pool.close();
        }
    }
}
