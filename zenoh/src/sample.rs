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
//! [`Sample`]: the value delivered to a subscriber callback or returned as
//! part of a query [`crate::query::Reply`] (spec.md §3: "Sample =
//! (keyexpr, payload, kind, encoding, timestamp?, source-info, attachment?, qos)").

use zenoh_keyexpr::KeyExpr;
use zenoh_protocol::core::{CongestionControl, Priority, Timestamp, ZenohId};

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Put,
    Delete,
}

/// Where a sample came from, when the originating link identified itself.
/// `source_sn` is left unpopulated: no per-key sequence number exists at the
/// network-message layer, only the per-link FRAME sn the transport already
/// consumes for ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub source_id: Option<ZenohId>,
    pub source_sn: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct QoS {
    pub priority: Priority,
    pub congestion_control: CongestionControl,
    pub express: bool,
}

impl Default for QoS {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            congestion_control: CongestionControl::default(),
            express: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub key_expr: KeyExpr,
    pub value: Value,
    pub kind: SampleKind,
    pub timestamp: Option<Timestamp>,
    pub source_info: SourceInfo,
    pub attachment: Option<Vec<u8>>,
    pub qos: QoS,
}

impl Sample {
    pub fn payload(&self) -> &[u8] {
        &self.value.payload
    }
}
