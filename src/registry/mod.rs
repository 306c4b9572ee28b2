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
mod blocking;
mod non_blocking;

pub use blocking::*;
pub use non_blocking::*;

use crate::config::PoolConfig;
use crate::errors::{RedPoolError, RedPoolResult};

/// Every instance of a multi-instance source must carry a name, otherwise
/// its pool would be unreachable through the registry.
pub(crate) fn validate_names(confs: &[PoolConfig]) -> RedPoolResult<()> {
    if confs.iter().any(|c| c.name.is_empty()) {
        return Err(RedPoolError::ConfigError(
            "every instance in a multi-instance config needs a name".to_string(),
        ));
    }
    Ok(())
}
