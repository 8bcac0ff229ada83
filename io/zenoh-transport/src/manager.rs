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
//! Ties a [`zenoh_config::Config`] to the transport constructors: the single
//! place that turns tuning knobs (`transport/link/tx/lease`, `batch_size`,
//! ...) and a local identity into the parameters `unicast::open_client`/
//! `multicast::join` need.

use std::sync::Arc;
use std::time::Duration;

use zenoh_config::Config;
use zenoh_core::Result as ZResult;
use zenoh_link_commons::{LinkMulticast, LinkUnicast};
use zenoh_protocol::core::{Resolution, WhatAmI, ZenohId};

use crate::multicast::{self, TransportConfigMulticast, TransportMulticast};
use crate::primitives::TransportEventHandler;
use crate::unicast::{self, TransportConfigUnicast, TransportUnicast};

/// Default batch size a transport proposes during the handshake and uses to
/// decide when a network message must be fragmented; bounded by the
/// 65535-byte stream-framing limit of spec.md §4.2.
pub const DEFAULT_BATCH_SIZE: u16 = 65_000;

/// Builds unicast and multicast transports bound to one local identity and
/// [`Config`]. Holding no link list or open-transport table of its own —
/// that bookkeeping belongs to the session layer — it is purely a
/// constructor seam.
#[derive(Clone)]
pub struct TransportManager {
    zid: ZenohId,
    whatami: WhatAmI,
    resolution: Resolution,
    batch_size: u16,
    lease: Duration,
    keep_alive: Duration,
}

impl TransportManager {
    pub fn new(zid: ZenohId, config: &Config) -> Self {
        Self {
            zid,
            whatami: config.mode,
            resolution: Resolution::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            lease: config.transport.lease,
            keep_alive: config.transport.keep_alive,
        }
    }

    pub fn zid(&self) -> &ZenohId {
        &self.zid
    }

    /// Opens a unicast transport as the initiating (client) side of the
    /// handshake over an already-connected link.
    pub async fn open_transport_unicast(
        &self,
        link: LinkUnicast,
        handler: Arc<dyn TransportEventHandler>,
    ) -> ZResult<TransportUnicast> {
        let config = TransportConfigUnicast {
            zid: self.zid.clone(),
            whatami: self.whatami,
            resolution: self.resolution,
            batch_size: self.batch_size,
            qos: false,
            lease: self.lease,
            keep_alive: self.keep_alive,
        };
        unicast::open_client(link, config, handler).await
    }

    /// Starts a multicast transport: joins the group on `link` and begins
    /// the periodic JOIN/lease cycle of spec.md §4.6.
    pub async fn open_transport_multicast(
        &self,
        link: LinkMulticast,
        handler: Arc<dyn TransportEventHandler>,
    ) -> ZResult<TransportMulticast> {
        let config = TransportConfigMulticast {
            zid: self.zid.clone(),
            whatami: self.whatami,
            resolution: self.resolution,
            batch_size: self.batch_size,
            qos: false,
            lease: self.lease,
            join_interval: self.lease / 4,
        };
        multicast::join(link, config, handler).await
    }
}
