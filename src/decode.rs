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
use redis::{FromRedisValue, Value};
use serde::de::DeserializeOwned;

use crate::errors::{RedPoolError, RedPoolResult};

/// Destination shape for [`scan_json`]: a single record or a vector of
/// records. The tag makes the dispatch exhaustive, so an unsupported
/// destination is a type error rather than a silent no-op.
pub enum ScanTarget<'a, T> {
    Record(&'a mut T),
    Sequence(&'a mut Vec<T>),
}

/// Decodes a raw Redis reply into `target` by shape.
///
/// Decoding operates on an already-retrieved reply value; it never borrows
/// a connection and never touches a registry or pool.
pub fn scan_json<T: DeserializeOwned>(reply: Value, target: ScanTarget<'_, T>) -> RedPoolResult<()> {
    match target {
        ScanTarget::Record(dest) => scan_json_record(reply, dest),
        ScanTarget::Sequence(dest) => scan_json_sequence(reply, dest),
    }
}

/// Converts the reply to one byte payload and parses it as JSON into `dest`.
pub fn scan_json_record<T: DeserializeOwned>(reply: Value, dest: &mut T) -> RedPoolResult<()> {
    let payload = Vec::<u8>::from_owned_redis_value(reply)
        .map_err(|e| RedPoolError::DecodeError(e.to_string()))?;
    *dest = serde_json::from_slice(&payload)?;
    Ok(())
}

/// Converts the reply to a sequence of byte payloads and parses each as one
/// JSON element of `dest`, in reply order.
///
/// An empty sequence leaves `dest` untouched and succeeds. Otherwise `dest`
/// is cleared first, and the first malformed payload aborts the call —
/// elements parsed before it stay appended (no rollback contract).
pub fn scan_json_sequence<T: DeserializeOwned>(
    reply: Value,
    dest: &mut Vec<T>,
) -> RedPoolResult<()> {
    let payloads = Vec::<Vec<u8>>::from_owned_redis_value(reply)
        .map_err(|e| RedPoolError::DecodeError(e.to_string()))?;

    if payloads.is_empty() {
        return Ok(());
    }

    dest.clear();
    for payload in &payloads {
        dest.push(serde_json::from_slice(payload)?);
    }
    Ok(())
}
