//
// Copyright (c) 2022 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
//! Internal crate for zenoh: parsing/formatting helpers and the periodic
//! timer used for lease and keep-alive tasks.

pub mod timer;

use std::time::Duration;

/// Parses a `humantime`-compatible duration string ("100ms", "10s", "1m"),
/// as accepted by every `*_timeout`/`*_lease` configuration key.
pub fn parse_duration(s: &str) -> zenoh_core::Result<Duration> {
    humantime::parse_duration(s).map_err(|e| zenoh_core::Error::msg(e.to_string()))
}
