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
//! The "session-back-ref" spec.md §3 lists on every transport: the seam the
//! read task delivers decoded network messages across, and the session
//! layer implements to receive them. Kept a plain trait object rather than
//! a concrete session type so this crate has no upward dependency on
//! `zenoh`.

use zenoh_core::Result as ZResult;
use zenoh_protocol::core::ZenohId;
use zenoh_protocol::network::NetworkMessage;

/// Identifies which remote a network message or peer-lifecycle event came
/// from, in the transport's own id space (spec.md §3's "remote-declared
/// (keyed by `(peer-id, id)`)"). A unicast transport has exactly one remote
/// and always reports `0`; a multicast transport allocates one per
/// [`crate::multicast`] `PeerEntry` as JOINs are received.
pub type PeerId = usize;

/// The single remote of a unicast transport.
pub const UNICAST_PEER: PeerId = 0;

/// What a transport invokes on the owning session as events occur. Every
/// method runs on the read or lease task — no transport lock is held while
/// calling in, matching spec.md §5 ("callbacks are invoked with no session
/// locks held").
pub trait TransportEventHandler: Send + Sync {
    /// One network message decoded out of a FRAME or reassembled out of a
    /// FRAGMENT. Returning an error only logs; per spec.md §7 propagation
    /// policy, it never tears down the transport.
    fn handle_message(&self, msg: NetworkMessage, peer: PeerId) -> ZResult<()>;

    /// A new remote was admitted (multicast JOIN from an unseen address, or
    /// the single remote of a freshly-opened unicast transport). Default
    /// no-op: most handlers only care once a message actually arrives.
    fn new_peer(&self, _peer: PeerId, _zid: ZenohId) {}

    /// A remote was evicted — multicast lease expiry or an explicit CLOSE.
    /// The session must drop that peer's remote-declared resources,
    /// subscribers-as-seen-matching-this-peer, and pending interests.
    fn del_peer(&self, _peer: PeerId) {}

    /// The whole transport closed: locally, by peer CLOSE, or link EOF.
    /// Called exactly once, after the read and lease tasks have both
    /// stopped.
    fn closed(&self);
}

/// A handler that drops every message and ignores lifecycle events, for
/// tests and for transports opened before a session has attached.
#[derive(Debug, Default)]
pub struct DummyEventHandler;

impl TransportEventHandler for DummyEventHandler {
    fn handle_message(&self, _msg: NetworkMessage, _peer: PeerId) -> ZResult<()> {
        Ok(())
    }

    fn closed(&self) {}
}
