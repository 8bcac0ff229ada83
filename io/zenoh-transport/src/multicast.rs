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
//! Group transport (spec.md §4.6): the periodic JOIN announcement, the
//! per-peer state table built from observed JOINs, and the RX demux/TX
//! broadcast over one [`zenoh_link_commons::LinkMulticast`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_std::sync::Mutex;
use futures::{select, FutureExt};
use log::{debug, warn};
use rand::Rng;

use zenoh_buffers::{Reader, WBuf, Writer};
use zenoh_codec::{read_transport_message, write_network_message, write_transport_message};
use zenoh_core::{bail, Result as ZResult};
use zenoh_link_commons::{LinkMulticast, Locator};
use zenoh_protocol::core::{CongestionControl, Priority, Reliability, WhatAmI, ZInt, ZenohId};
use zenoh_protocol::network::NetworkMessage;
use zenoh_protocol::transport::{
    Join, Resolution, TransportBody, TransportMessage,
};
use zenoh_sync::{Signal, WaitGroup};

use crate::common::{TransportChannelRx, TransportChannelTx};
use crate::primitives::{PeerId, TransportEventHandler};

/// Parameters fixed for the lifetime of one multicast transport.
#[derive(Debug, Clone)]
pub struct TransportConfigMulticast {
    pub zid: ZenohId,
    pub whatami: WhatAmI,
    pub resolution: Resolution,
    pub batch_size: u16,
    pub qos: bool,
    pub lease: Duration,
    /// How often this peer re-announces itself with JOIN (spec.md §4.6); the
    /// same period also drives the per-peer lease countdown tick.
    pub join_interval: Duration,
}

/// One remote discovered via JOIN. The `(resolution, batch_size)` pair is
/// compared on every subsequent JOIN from the same address: a mismatch
/// means the peer restarted with new parameters, and spec.md §4.6 calls for
/// dropping (not patching) the stale entry.
struct PeerEntry {
    id: PeerId,
    zid: ZenohId,
    resolution: Resolution,
    batch_size: u16,
    rx: TransportChannelRx,
    lease: Duration,
    next_lease: Duration,
    received: bool,
}

/// A handle to a running multicast transport. Cheaply cloned; every clone
/// shares the same peer table, read/lease tasks and link.
#[derive(Clone)]
pub struct TransportMulticast {
    inner: Arc<TransportMulticastInner>,
}

struct TransportMulticastInner {
    link: LinkMulticast,
    config: TransportConfigMulticast,
    tx: Mutex<TransportChannelTx>,
    peers: Mutex<HashMap<Locator, PeerEntry>>,
    next_peer_id: std::sync::atomic::AtomicUsize,
    handler: Arc<dyn TransportEventHandler>,
    signal: Signal,
    transmitted: AtomicBool,
    tasks: Mutex<Option<WaitGroup>>,
}

async fn link_write_message(link: &LinkMulticast, msg: &TransportMessage) -> ZResult<()> {
    let mut wbuf = WBuf::new(u16::MAX as usize, true);
    if !write_transport_message(&mut wbuf, msg) {
        bail!("transport message does not fit in the link's batch size");
    }
    let bytes = wbuf.contiguous().into_vec();
    link.write(&bytes).await.map(|_| ())
}

fn decode_message(bytes: &[u8]) -> ZResult<TransportMessage> {
    let mut reader: &[u8] = bytes;
    read_transport_message(&mut reader)
        .map_err(|e| zenoh_core::Error::msg(format!("transport message decode error: {:?}", e)))
}

/// Joins the group on `link`: sends the first JOIN and starts the read and
/// lease tasks. Unlike unicast `open`, there is no handshake to fail — a
/// multicast link either accepts the initial write or it doesn't.
pub async fn join(
    link: LinkMulticast,
    config: TransportConfigMulticast,
    handler: Arc<dyn TransportEventHandler>,
) -> ZResult<TransportMulticast> {
    let sn_res = config.resolution.sn_resolution();
    let initial_reliable = rand::thread_rng().gen_range(0..sn_res);
    let initial_best_effort = rand::thread_rng().gen_range(0..sn_res);
    let tx = TransportChannelTx::new(initial_reliable, initial_best_effort, sn_res);

    let inner = Arc::new(TransportMulticastInner {
        link,
        config,
        tx: Mutex::new(tx),
        peers: Mutex::new(HashMap::new()),
        next_peer_id: std::sync::atomic::AtomicUsize::new(1),
        handler,
        signal: Signal::new(),
        transmitted: AtomicBool::new(false),
        tasks: Mutex::new(None),
    });
    inner.send_join().await?;
    inner.start_tasks().await;

    Ok(TransportMulticast { inner })
}

impl TransportMulticastInner {
    async fn send_join(&self) -> ZResult<()> {
        let tx = self.tx.lock().await;
        let join = Join {
            version: zenoh_protocol::transport::ZENOH_PROTO_VERSION,
            whatami: self.config.whatami,
            zid: self.config.zid.clone(),
            resolution: self.config.resolution,
            batch_size: self.config.batch_size,
            lease: self.config.lease.as_millis() as ZInt,
            next_sn: (tx.reliable.value(), tx.best_effort.value()),
            qos: self.config.qos,
        };
        drop(tx);
        self.transmitted.store(true, Ordering::SeqCst);
        link_write_message(
            &self.link,
            &TransportMessage {
                body: TransportBody::Join(join),
            },
        )
        .await
    }

    async fn start_tasks(self: &Arc<Self>) {
        let wait_group = WaitGroup::new();
        let read_worker = wait_group.worker();
        let lease_worker = wait_group.worker();

        let read_inner = self.clone();
        async_std::task::spawn(async move {
            read_inner.run_read_task().await;
            drop(read_worker);
        });

        let lease_inner = self.clone();
        async_std::task::spawn(async move {
            lease_inner.run_lease_task().await;
            drop(lease_worker);
        });

        *self.tasks.lock().await = Some(wait_group);
    }

    async fn run_read_task(self: Arc<Self>) {
        loop {
            let mut buf = vec![0u8; self.link.get_mtu() as usize];
            let read_fut = self.link.read(&mut buf).fuse();
            let stop_fut = self.signal.wait().fuse();
            futures::pin_mut!(read_fut, stop_fut);
            let (n, from) = select! {
                r = read_fut => match r {
                    Ok(ok) => ok,
                    Err(e) => {
                        debug!("multicast read task stopping: {}", e);
                        self.signal.trigger();
                        break;
                    }
                },
                _ = stop_fut => break,
            };
            match decode_message(&buf[..n]) {
                Ok(msg) => {
                    if let Err(e) = self.handle_transport_message(from, msg).await {
                        warn!("dropping malformed or unhandled multicast message: {}", e);
                    }
                }
                Err(e) => warn!("dropping undecodable multicast datagram: {:?}", e),
            }
        }
        self.handler.closed();
    }

    async fn handle_transport_message(&self, from: Locator, msg: TransportMessage) -> ZResult<()> {
        match msg.body {
            TransportBody::Join(join) => {
                self.handle_join(from, join).await;
                Ok(())
            }
            TransportBody::Frame(frame) => self.handle_frame(from, frame).await,
            TransportBody::KeepAlive(_) => {
                self.touch_peer(&from).await;
                Ok(())
            }
            TransportBody::Close(_) => {
                self.evict_peer(&from).await;
                Ok(())
            }
            // INIT/OPEN have no place on a multicast link.
            TransportBody::InitSyn(_)
            | TransportBody::InitAck(_)
            | TransportBody::OpenSyn(_)
            | TransportBody::OpenAck(_) => Ok(()),
        }
    }

    /// Creates, refreshes, or (on a reconfiguration) drops-and-recreates the
    /// `PeerEntry` for `from`, per spec.md §4.6.
    async fn handle_join(&self, from: Locator, join: Join) {
        if join.zid == self.config.zid {
            // Our own JOIN looped back by the group (common on loopback
            // multicast); never register ourselves as a peer.
            return;
        }
        let mut peers = self.peers.lock().await;
        if let Some(peer) = peers.get(&from) {
            let reconfigured = peer.resolution != join.resolution || peer.batch_size != join.batch_size;
            if reconfigured {
                peers.remove(&from);
            }
        }
        let sn_res = join.resolution.sn_resolution();
        let lease = Duration::from_millis(join.lease);
        match peers.get_mut(&from) {
            Some(peer) => {
                peer.received = true;
                peer.next_lease = lease;
                peer.lease = lease;
            }
            None => {
                let id = self.next_peer_id.fetch_add(1, Ordering::SeqCst);
                let zid = join.zid.clone();
                peers.insert(
                    from,
                    PeerEntry {
                        id,
                        zid: zid.clone(),
                        resolution: join.resolution,
                        batch_size: join.batch_size,
                        rx: TransportChannelRx::new_pair(join.next_sn.0, join.next_sn.1, sn_res),
                        lease,
                        next_lease: lease,
                        received: true,
                    },
                );
                drop(peers);
                self.handler.new_peer(id, zid);
            }
        }
    }

    async fn touch_peer(&self, from: &Locator) {
        if let Some(peer) = self.peers.lock().await.get_mut(from) {
            peer.received = true;
            peer.next_lease = peer.lease;
        }
    }

    async fn evict_peer(&self, from: &Locator) {
        if let Some(peer) = self.peers.lock().await.remove(from) {
            self.handler.del_peer(peer.id);
        }
    }

    async fn handle_frame(&self, from: Locator, frame: zenoh_protocol::transport::Frame) -> ZResult<()> {
        let mut peers = self.peers.lock().await;
        let peer = match peers.get_mut(&from) {
            Some(peer) => peer,
            None => bail!("FRAME from an address with no prior JOIN"),
        };
        peer.received = true;
        peer.next_lease = peer.lease;
        let peer_id = peer.id;
        let (sn_state, defrag) = match frame.reliability {
            Reliability::Reliable => (&mut peer.rx.reliable, &mut peer.rx.defrag_reliable),
            Reliability::BestEffort => (&mut peer.rx.best_effort, &mut peer.rx.defrag_best_effort),
        };
        if !sn_state.precedes(frame.sn) {
            defrag.clear();
            bail!("out-of-order sequence number from multicast peer");
        }
        sn_state.set(frame.sn);

        match frame.payload {
            zenoh_protocol::transport::FramePayload::Messages { messages } => {
                drop(peers);
                for msg in messages {
                    self.handler.handle_message(msg, peer_id)?;
                }
                Ok(())
            }
            zenoh_protocol::transport::FramePayload::Fragment { buffer, is_final } => {
                let reassembled = defrag.push(&buffer, is_final);
                drop(peers);
                if let Some(bytes) = reassembled {
                    let mut reader: &[u8] = &bytes;
                    match zenoh_codec::read_network_message(&mut reader) {
                        Ok(msg) => self.handler.handle_message(msg, peer_id)?,
                        Err(e) => warn!("dropping malformed reassembled message: {:?}", e),
                    }
                }
                Ok(())
            }
        }
    }

    async fn run_lease_task(self: Arc<Self>) {
        let tick = self.config.join_interval;
        loop {
            let sleep_fut = async_std::task::sleep(tick).fuse();
            let stop_fut = self.signal.wait().fuse();
            futures::pin_mut!(sleep_fut, stop_fut);
            select! {
                _ = sleep_fut => {},
                _ = stop_fut => break,
            }
            if self.signal.is_triggered() {
                break;
            }

            let mut evicted = Vec::new();
            {
                let mut peers = self.peers.lock().await;
                peers.retain(|_, peer| {
                    if peer.received {
                        peer.received = false;
                        peer.next_lease = peer.lease;
                        true
                    } else {
                        peer.next_lease = peer.next_lease.saturating_sub(tick);
                        if peer.next_lease.is_zero() {
                            evicted.push(peer.id);
                            false
                        } else {
                            true
                        }
                    }
                });
            }
            for id in evicted {
                debug!("multicast peer {} evicted: lease expired", id);
                self.handler.del_peer(id);
            }

            if !self.transmitted.swap(false, Ordering::SeqCst) {
                let _ = link_write_message(&self.link, &TransportMessage::keep_alive()).await;
            }
            let _ = self.send_join().await;
        }
    }

    async fn send_network_message(
        &self,
        msg: NetworkMessage,
        reliability: Reliability,
        congestion: CongestionControl,
        priority: Priority,
    ) -> ZResult<()> {
        let mut tx = match congestion {
            CongestionControl::Drop => match self.tx.try_lock() {
                Some(guard) => guard,
                None => return Ok(()),
            },
            CongestionControl::Block => self.tx.lock().await,
        };

        let mut encoded = Vec::new();
        if !write_network_message(&mut encoded, &msg) {
            bail!("failed to encode network message");
        }

        const HEADER_OVERHEAD: usize = 32;
        let budget = (self.config.batch_size as usize).saturating_sub(HEADER_OVERHEAD);

        if encoded.len() <= budget {
            let sn = match reliability {
                Reliability::Reliable => tx.reliable.increment(),
                Reliability::BestEffort => tx.best_effort.increment(),
            };
            let frame = TransportMessage {
                body: TransportBody::Frame(zenoh_protocol::transport::Frame {
                    reliability,
                    priority,
                    sn,
                    payload: zenoh_protocol::transport::FramePayload::Messages { messages: vec![msg] },
                }),
            };
            self.transmitted.store(true, Ordering::SeqCst);
            return link_write_message(&self.link, &frame).await;
        }

        let chunk_size = budget.max(1);
        let chunks: Vec<&[u8]> = encoded.chunks(chunk_size).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let is_final = i + 1 == chunks.len();
            let sn = match reliability {
                Reliability::Reliable => tx.reliable.increment(),
                Reliability::BestEffort => tx.best_effort.increment(),
            };
            let fragment = TransportMessage {
                body: TransportBody::Frame(zenoh_protocol::transport::Frame {
                    reliability,
                    priority,
                    sn,
                    payload: zenoh_protocol::transport::FramePayload::Fragment {
                        buffer: chunk.to_vec(),
                        is_final,
                    },
                }),
            };
            self.transmitted.store(true, Ordering::SeqCst);
            link_write_message(&self.link, &fragment).await?;
        }
        Ok(())
    }

    async fn close(&self) -> ZResult<()> {
        if self.signal.is_triggered() {
            return Ok(());
        }
        let _ = link_write_message(
            &self.link,
            &TransportMessage::close(Some(self.config.zid.clone()), zenoh_protocol::transport::CloseReason::Generic, false),
        )
        .await;
        self.signal.trigger();
        if let Some(wait_group) = self.tasks.lock().await.take() {
            wait_group.wait().await;
        }
        self.link.close().await
    }
}

impl TransportMulticast {
    pub async fn send_network_message(
        &self,
        msg: NetworkMessage,
        reliability: Reliability,
        congestion: CongestionControl,
        priority: Priority,
    ) -> ZResult<()> {
        self.inner
            .send_network_message(msg, reliability, congestion, priority)
            .await
    }

    pub async fn close(&self) -> ZResult<()> {
        self.inner.close().await
    }

    pub async fn peer_count(&self) -> usize {
        self.inner.peers.lock().await.len()
    }

    pub fn config(&self) -> &TransportConfigMulticast {
        &self.inner.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_std::sync::Mutex as AsyncMutex;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use zenoh_link_commons::LinkMulticastTrait;

    /// A shared in-memory "group": every `MockGroupLink::write` appends to a
    /// common queue tagged with the sender's address; `read` pops entries
    /// not authored by `self`, mimicking loopback suppression a real
    /// multicast socket configuration would apply.
    struct MockGroupLink {
        me: Locator,
        mtu: u16,
        inbox: AsyncMutex<VecDeque<(Locator, Vec<u8>)>>,
    }

    #[async_trait]
    impl LinkMulticastTrait for MockGroupLink {
        async fn write(&self, buffer: &[u8]) -> ZResult<usize> {
            self.inbox
                .lock()
                .await
                .push_back((self.me.clone(), buffer.to_vec()));
            Ok(buffer.len())
        }

        async fn read(&self, buffer: &mut [u8]) -> ZResult<(usize, Locator)> {
            loop {
                let mut inbox = self.inbox.lock().await;
                if let Some(pos) = inbox.iter().position(|(from, _)| from != &self.me) {
                    let (from, bytes) = inbox.remove(pos).unwrap();
                    let n = bytes.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&bytes[..n]);
                    return Ok((n, from));
                }
                drop(inbox);
                async_std::task::yield_now().await;
            }
        }

        fn get_src(&self) -> &Locator {
            &self.me
        }

        fn get_mtu(&self) -> u16 {
            self.mtu
        }

        fn is_reliable(&self) -> bool {
            false
        }

        async fn close(&self) -> ZResult<()> {
            Ok(())
        }
    }

    fn resolution() -> Resolution {
        Resolution {
            seq_num_bits: 8,
            req_id_bits: 8,
        }
    }

    fn config(zid: ZenohId) -> TransportConfigMulticast {
        TransportConfigMulticast {
            zid,
            whatami: WhatAmI::Peer,
            resolution: resolution(),
            batch_size: 1500,
            qos: false,
            lease: Duration::from_millis(400),
            join_interval: Duration::from_millis(100),
        }
    }

    fn push_join(inbox: &mut VecDeque<(Locator, Vec<u8>)>, from: &Locator, join: Join) {
        let mut wbuf = WBuf::new(u16::MAX as usize, true);
        let msg = TransportMessage {
            body: TransportBody::Join(join),
        };
        assert!(write_transport_message(&mut wbuf, &msg));
        inbox.push_back((from.clone(), wbuf.contiguous().into_vec()));
    }

    #[test]
    fn join_from_a_new_address_creates_a_peer_entry() {
        async_std::task::block_on(async {
            let me: Locator = "udp/224.0.0.224:7446".parse().unwrap();
            let remote: Locator = "udp/224.0.0.224:7446#iface=a".parse().unwrap();
            let link = Arc::new(MockGroupLink {
                me: me.clone(),
                mtu: 1500,
                inbox: AsyncMutex::new(VecDeque::new()),
            });

            let handler: Arc<dyn TransportEventHandler> = Arc::new(crate::primitives::DummyEventHandler);
            let transport = join(link.clone(), config(ZenohId::rand()), handler).await.unwrap();

            {
                let mut inbox = link.inbox.lock().await;
                inbox.clear();
                push_join(
                    &mut inbox,
                    &remote,
                    Join {
                        version: zenoh_protocol::transport::ZENOH_PROTO_VERSION,
                        whatami: WhatAmI::Peer,
                        zid: ZenohId::rand(),
                        resolution: resolution(),
                        batch_size: 1500,
                        lease: 400,
                        next_sn: (0, 0),
                        qos: false,
                    },
                );
            }

            // give the read task a chance to observe the JOIN
            for _ in 0..50 {
                if transport.peer_count().await == 1 {
                    break;
                }
                async_std::task::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(transport.peer_count().await, 1);
            transport.close().await.unwrap();
        });
    }

    #[test]
    fn peer_evicted_once_lease_expires_without_traffic() {
        async_std::task::block_on(async {
            let me: Locator = "udp/224.0.0.224:7446".parse().unwrap();
            let remote: Locator = "udp/224.0.0.224:7446#iface=b".parse().unwrap();
            let link = Arc::new(MockGroupLink {
                me: me.clone(),
                mtu: 1500,
                inbox: AsyncMutex::new(VecDeque::new()),
            });

            let handler: Arc<dyn TransportEventHandler> = Arc::new(crate::primitives::DummyEventHandler);
            let mut cfg = config(ZenohId::rand());
            cfg.lease = Duration::from_millis(60);
            cfg.join_interval = Duration::from_millis(20);
            let transport = join(link.clone(), cfg, handler).await.unwrap();

            {
                let mut inbox = link.inbox.lock().await;
                inbox.clear();
                push_join(
                    &mut inbox,
                    &remote,
                    Join {
                        version: zenoh_protocol::transport::ZENOH_PROTO_VERSION,
                        whatami: WhatAmI::Peer,
                        zid: ZenohId::rand(),
                        resolution: resolution(),
                        batch_size: 1500,
                        lease: 60,
                        next_sn: (0, 0),
                        qos: false,
                    },
                );
            }
            for _ in 0..50 {
                if transport.peer_count().await == 1 {
                    break;
                }
                async_std::task::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(transport.peer_count().await, 1);

            // no further traffic from the remote: it must be evicted once
            // the lease (a few join_interval ticks) elapses.
            for _ in 0..50 {
                if transport.peer_count().await == 0 {
                    break;
                }
                async_std::task::sleep(Duration::from_millis(10)).await;
            }
            assert_eq!(transport.peer_count().await, 0);
            transport.close().await.unwrap();
        });
    }
}
