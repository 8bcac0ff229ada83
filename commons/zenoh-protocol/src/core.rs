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
//! The data model shared by every message on the wire: variable-length
//! integers, the zenoh id, encodings, timestamps and the small enums
//! (priority, reliability, congestion control, consolidation...) carried by
//! more than one message type.

use std::fmt;

/// The concrete error taxonomy of spec.md §7. `zenoh-core::Error` (an
/// `anyhow::Error`) carries the human-readable message everywhere; this enum
/// is attached via [`ZErrorKind::context`] wherever a caller needs to
/// dispatch on *why* an operation failed rather than just log it — codec
/// errors and the open handshake's three failure modes in particular.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZErrorKind {
    OutOfMemory,
    InvalidArgument,
    NotAvailable,
    BufferNoSpace,
    NotEnoughBytes,
    MessageDeserialization,
    IoGeneric,
    OpenSnResolution,
    OpenVersionMismatch,
    OpenOther,
    ConnectionClosed,
    KeyExprInvalid,
    Timeout,
}

impl fmt::Display for ZErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for ZErrorKind {}

/// A zenoh variable-length integer: 1 to 9 bytes, 7 continuation bits per
/// byte, the 9th byte (if reached) carrying the remaining 8 bits unmasked.
/// See `zenoh-codec` for the wire encoding itself; this is just the logical
/// type it encodes.
pub type ZInt = u64;
pub type ZSize = usize;

pub const WHATAMI_ROUTER: u8 = 0b001;
pub const WHATAMI_PEER: u8 = 0b010;
pub const WHATAMI_CLIENT: u8 = 0b100;

/// The three roles a zenoh process can start in. This crate only ever
/// originates `Client` and `Peer` traffic; `Router` is accepted on the wire
/// (a remote may identify as one) but never forwarded through — there is no
/// router role implemented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhatAmI {
    Router,
    Peer,
    Client,
}

impl WhatAmI {
    pub fn to_bits(self) -> u8 {
        match self {
            WhatAmI::Router => WHATAMI_ROUTER,
            WhatAmI::Peer => WHATAMI_PEER,
            WhatAmI::Client => WHATAMI_CLIENT,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            WHATAMI_ROUTER => Some(WhatAmI::Router),
            WHATAMI_PEER => Some(WhatAmI::Peer),
            WHATAMI_CLIENT => Some(WhatAmI::Client),
            _ => None,
        }
    }
}

impl fmt::Display for WhatAmI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WhatAmI::Router => "router",
            WhatAmI::Peer => "peer",
            WhatAmI::Client => "client",
        };
        f.write_str(s)
    }
}

/// A zenoh process identifier: 1 to 16 bytes, carried on the wire with a
/// length nibble the way the INIT/OPEN handshake describes (spec §4.2/§4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZenohId(Vec<u8>);

impl ZenohId {
    pub fn rand() -> Self {
        let uuid = uuid::Uuid::new_v4();
        Self(uuid.as_bytes().to_vec())
    }

    pub fn from_slice(bytes: &[u8]) -> zenoh_core::Result<Self> {
        if bytes.is_empty() || bytes.len() > 16 {
            zenoh_core::bail!("a ZenohId must be between 1 and 16 bytes, got {}", bytes.len());
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ZenohId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// A HLC timestamp, re-exported from `uhlc` the way the teacher's own
/// `zenoh_protocol_core` does, plus the 16-byte source id that travels with
/// it on the wire.
pub type Timestamp = uhlc::Timestamp;

/// The payload encoding carried by `Put`/`Reply` messages: a registered
/// numeric id plus an optional free-form suffix, matching
/// `protocol/codec.c`'s `_z_encoding_encode` (bit 0 of the encoded id flags
/// "a suffix follows").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encoding {
    pub id: ZInt,
    pub schema: Option<Vec<u8>>,
}

impl Encoding {
    pub const EMPTY: ZInt = 0;
    pub const APP_OCTET_STREAM: ZInt = 1;
    pub const TEXT_PLAIN: ZInt = 2;
    pub const APP_JSON: ZInt = 3;

    pub fn new(id: ZInt) -> Self {
        Self { id, schema: None }
    }

    pub fn with_schema(id: ZInt, schema: Vec<u8>) -> Self {
        Self {
            id,
            schema: Some(schema),
        }
    }
}

/// The delivery guarantee requested for a flow of `Frame`s (spec §4.5): a
/// `Reliable` conduit enforces strict sequence-number monotonicity and a
/// defragmentation buffer; a `BestEffort` one accepts and silently drops
/// gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reliability {
    BestEffort,
    Reliable,
}

impl Default for Reliability {
    fn default() -> Self {
        Reliability::BestEffort
    }
}

/// One of the five priority lanes a QoS-aware transport multiplexes frames
/// over; `Data` is the default when a transport is not QoS-capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    RealTime = 1,
    InteractiveHigh = 2,
    InteractiveLow = 3,
    DataHigh = 4,
    Data = 5,
    DataLow = 6,
    Background = 7,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Data
    }
}

impl Priority {
    pub const NUM: usize = 7;

    pub fn index(self) -> usize {
        self as usize - 1
    }
}

/// What a full send buffer does to a new message: `Block` waits for room,
/// `Drop` discards the message rather than stall the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CongestionControl {
    Drop,
    Block,
}

impl Default for CongestionControl {
    fn default() -> Self {
        CongestionControl::Drop
    }
}

/// How a subscriber wants data pushed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubMode {
    Push,
    Pull,
}

impl Default for SubMode {
    fn default() -> Self {
        SubMode::Push
    }
}

/// A periodic re-declaration interval, expressed in milliseconds, attached
/// to a `SubMode::Pull` subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub origin: ZInt,
    pub period: ZInt,
    pub duration: ZInt,
}

/// How replies to a `get()` are merged, per spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsolidationMode {
    /// Replies are delivered as they arrive, no deduplication.
    None,
    /// Only strictly newer replies for an already-seen key are forwarded.
    Monotonic,
    /// Only the single newest reply per key is forwarded, once the query
    /// window closes.
    Latest,
    /// `Latest` if the selector has no time range, `None` otherwise.
    #[allow(clippy::enum_variant_names)]
    Auto,
}

impl Default for ConsolidationMode {
    fn default() -> Self {
        ConsolidationMode::Auto
    }
}

/// Which queryables a `get()` addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    BestMatching,
    All,
    AllComplete,
}

impl Default for QueryTarget {
    fn default() -> Self {
        QueryTarget::BestMatching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatami_roundtrips_through_bits() {
        for w in [WhatAmI::Router, WhatAmI::Peer, WhatAmI::Client] {
            assert_eq!(WhatAmI::from_bits(w.to_bits()), Some(w));
        }
    }

    #[test]
    fn zenoh_id_rejects_oversized_ids() {
        assert!(ZenohId::from_slice(&[0u8; 17]).is_err());
        assert!(ZenohId::from_slice(&[0u8; 16]).is_ok());
    }
}
