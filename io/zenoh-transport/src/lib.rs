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
//! Unicast and multicast transports (spec.md §4.5–§4.7): sequence numbers,
//! fragmentation, the open/join handshakes, and the read/lease tasks that
//! sit between a [`zenoh_link_commons`] link and the session layer.

pub mod common;
pub mod manager;
pub mod multicast;
pub mod primitives;
pub mod unicast;

pub use common::{Defragmentation, SeqNum, TransportChannelRx, TransportChannelTx, FRAG_MAX_SIZE};
pub use manager::{TransportManager, DEFAULT_BATCH_SIZE};
pub use multicast::{TransportConfigMulticast, TransportMulticast};
pub use primitives::{DummyEventHandler, PeerId, TransportEventHandler, UNICAST_PEER};
pub use unicast::{TransportConfigUnicast, TransportUnicast};
