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
//! The transport-layer message set: the handshake (INIT/OPEN), keep-alive,
//! close, join (multicast), and the FRAME/FRAGMENT envelopes that carry
//! network messages over a link. Field shapes follow spec.md §4.2/§4.5/§4.6
//! and `examples/other_examples/0ab8b4f5_XxChang-zenoh-client-rs__src-protocol-transport-init.rs.rs`
//! for the INIT message specifically.

use crate::core::{Priority, Reliability, WhatAmI, ZInt, ZenohId};
use crate::network::NetworkMessage;

pub const ZENOH_PROTO_VERSION: u8 = 0x08;

/// An opaque anti-spoofing token a responder hands back in `InitAck` and
/// that the initiator must echo unmodified in `OpenSyn` (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSyn {
    pub version: u8,
    pub whatami: WhatAmI,
    pub zid: ZenohId,
    pub resolution: Resolution,
    pub batch_size: u16,
    pub qos: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitAck {
    pub version: u8,
    pub whatami: WhatAmI,
    pub zid: ZenohId,
    pub resolution: Resolution,
    pub batch_size: u16,
    pub qos: bool,
    pub cookie: Cookie,
}

/// The sequence-number and request-id resolution (in bits) the two ends of
/// a transport agree on during INIT; mirrors the `seq_num_res`/`req_id_res`
/// nibble pair in the C reference's `InitSyn`/`InitAck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub seq_num_bits: u8,
    pub req_id_bits: u8,
}

impl Default for Resolution {
    fn default() -> Self {
        // 2 => 28 bits, matching zenoh-pico's default VLE-backed resolution.
        Self {
            seq_num_bits: 28,
            req_id_bits: 28,
        }
    }
}

impl Resolution {
    /// The modulus sequence numbers on this conduit wrap around at.
    pub fn sn_resolution(&self) -> ZInt {
        1u64 << self.seq_num_bits
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSyn {
    pub lease: ZInt,
    pub initial_sn: ZInt,
    pub cookie: Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAck {
    pub lease: ZInt,
    pub initial_sn: ZInt,
}

/// The periodic multicast announcement used to discover and refresh peers
/// on a multicast link (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub version: u8,
    pub whatami: WhatAmI,
    pub zid: ZenohId,
    pub resolution: Resolution,
    pub batch_size: u16,
    pub lease: ZInt,
    pub next_sn: (ZInt, ZInt),
    pub qos: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Generic,
    Unsupported,
    Invalid,
    MaxTransports,
    MaxSessions,
    MaxLinks,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Close {
    pub zid: Option<ZenohId>,
    pub reason: CloseReason,
    /// `true` closes a single link of a multi-link transport rather than the
    /// whole transport.
    pub link_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive;

/// The content of a `Frame`: either a batch of already-framed network
/// messages, or one slice of a payload too large to fit a single message,
/// with `is_final` marking the last slice (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Messages { messages: Vec<NetworkMessage> },
    Fragment { buffer: Vec<u8>, is_final: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub reliability: Reliability,
    pub priority: Priority,
    pub sn: ZInt,
    pub payload: FramePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportBody {
    InitSyn(InitSyn),
    InitAck(InitAck),
    OpenSyn(OpenSyn),
    OpenAck(OpenAck),
    Join(Join),
    Close(Close),
    KeepAlive(KeepAlive),
    Frame(Frame),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub body: TransportBody,
}

impl TransportMessage {
    pub fn keep_alive() -> Self {
        Self {
            body: TransportBody::KeepAlive(KeepAlive),
        }
    }

    pub fn close(zid: Option<ZenohId>, reason: CloseReason, link_only: bool) -> Self {
        Self {
            body: TransportBody::Close(Close {
                zid,
                reason,
                link_only,
            }),
        }
    }
}
