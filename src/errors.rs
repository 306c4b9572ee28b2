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

use redis::RedisError;
use thiserror::Error;

pub type RedPoolResult<T> = std::result::Result<T, RedPoolError>;

/// Initialization errors (`ConfigError`, `DialError`) are fatal to startup;
/// `NotConnected` and `DecodeError` are recoverable and leave the registry
/// and every pool untouched. No variant triggers an automatic retry.
#[derive(Error, Debug)]
pub enum RedPoolError {
    #[error("Redis error: {0}")]
    RedisError(#[from] RedisError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("redis {name}: dial failed: {reason}")]
    DialError { name: String, reason: String },

    #[error("redis {0} is not connected")]
    NotConnected(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Connection pool error: {0}")]
    PoolError(String),

    #[error("Connection pool is closed")]
    PoolClosed,
}

impl From<r2d2::Error> for RedPoolError {
    fn from(err: r2d2::Error) -> Self {
        RedPoolError::PoolError(err.to_string())
    }
}

impl From<deadpool::managed::PoolError<RedisError>> for RedPoolError {
    fn from(err: deadpool::managed::PoolError<RedisError>) -> Self {
        RedPoolError::PoolError(err.to_string())
    }
}

impl From<deadpool::managed::BuildError> for RedPoolError {
    fn from(err: deadpool::managed::BuildError) -> Self {
        RedPoolError::PoolError(err.to_string())
    }
}

impl From<serde_json::Error> for RedPoolError {
    fn from(err: serde_json::Error) -> Self {
        RedPoolError::DecodeError(err.to_string())
    }
}
