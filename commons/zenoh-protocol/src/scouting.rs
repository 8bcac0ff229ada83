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
//! SCOUT/HELLO (spec.md §4.8): a tiny, independent exchange over its own
//! short-lived multicast socket, not multiplexed into [`crate::transport`]'s
//! established-session message set.

use crate::core::ZenohId;

/// Sent to discover reachable peers/routers. `what` is a bitmask of
/// `WHATAMI_ROUTER`/`WHATAMI_PEER`/`WHATAMI_CLIENT` (crate::core),
/// identifying which roles the caller wants to hear back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scout {
    pub version: u8,
    pub what: u8,
}

/// One responder's self-announcement, collected by a scout's bounded
/// listening window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub version: u8,
    pub whatami: crate::core::WhatAmI,
    pub zid: ZenohId,
    pub locators: Vec<String>,
}
