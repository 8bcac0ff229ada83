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
//! Point-to-point transport (spec.md §4.5): client-side INIT/OPEN handshake,
//! the fragmenting send path, and the read/lease tasks that drive one
//! [`zenoh_link_commons::LinkUnicast`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_std::sync::Mutex;
use futures::{select, FutureExt};
use log::{debug, warn};
use rand::Rng;

use zenoh_buffers::{Reader, WBuf, Writer};
use zenoh_codec::{
    default_init_syn, read_transport_message, write_network_message, write_transport_message,
};
use zenoh_core::{bail, Result as ZResult};
use zenoh_link_commons::LinkUnicast;
use zenoh_protocol::core::{CongestionControl, Priority, Reliability, WhatAmI, ZInt, ZenohId};
use zenoh_protocol::network::NetworkMessage;
use zenoh_protocol::transport::{
    Close, CloseReason, Frame, FramePayload, OpenAck, OpenSyn, Resolution, TransportBody,
    TransportMessage,
};
use zenoh_sync::{Signal, WaitGroup};

use crate::common::{TransportChannelRx, TransportChannelTx};
use crate::primitives::TransportEventHandler;

/// Parameters fixed for the lifetime of one unicast transport: the local
/// identity plus the knobs `transport/link/tx/*` in spec.md §6 configures.
#[derive(Debug, Clone)]
pub struct TransportConfigUnicast {
    pub zid: ZenohId,
    pub whatami: WhatAmI,
    pub resolution: Resolution,
    pub batch_size: u16,
    pub qos: bool,
    pub lease: Duration,
    pub keep_alive: Duration,
}

/// A handle to a running unicast transport. Cheaply cloned; every clone
/// shares the same read/lease tasks and link.
#[derive(Clone)]
pub struct TransportUnicast {
    inner: Arc<TransportUnicastInner>,
}

struct TransportUnicastInner {
    link: LinkUnicast,
    config: TransportConfigUnicast,
    remote_zid: ZenohId,
    tx: Mutex<TransportChannelTx>,
    rx: Mutex<TransportChannelRx>,
    handler: Arc<dyn TransportEventHandler>,
    signal: Signal,
    transmitted: AtomicBool,
    received: AtomicBool,
    tasks: Mutex<Option<WaitGroup>>,
}

async fn link_write_message(link: &LinkUnicast, msg: &TransportMessage) -> ZResult<()> {
    let mut wbuf = WBuf::new(u16::MAX as usize, true);
    if link.is_streamed() {
        wbuf.write_bytes(&[0, 0]);
    }
    if !write_transport_message(&mut wbuf, msg) {
        bail!("transport message does not fit in the link's batch size");
    }
    let mut bytes = wbuf.contiguous().into_vec();
    if link.is_streamed() {
        if bytes.len() - 2 > u16::MAX as usize {
            bail!("encoded transport message exceeds the 65535-byte stream frame limit");
        }
        let len = (bytes.len() - 2) as u16;
        bytes[0..2].copy_from_slice(&len.to_le_bytes());
    }
    link.write_all(&bytes).await
}

async fn link_read_message(link: &LinkUnicast) -> ZResult<TransportMessage> {
    let decode = |bytes: &[u8]| -> ZResult<TransportMessage> {
        let mut reader: &[u8] = bytes;
        read_transport_message(&mut reader)
            .map_err(|e| zenoh_core::Error::msg(format!("transport message decode error: {:?}", e)))
    };
    if link.is_streamed() {
        let mut len_bytes = [0u8; 2];
        link.read_exact(&mut len_bytes).await?;
        let len = u16::from_le_bytes(len_bytes) as usize;
        let mut payload = vec![0u8; len];
        link.read_exact(&mut payload).await?;
        decode(&payload)
    } else {
        let mut buf = vec![0u8; link.get_mtu() as usize];
        let n = link.read(&mut buf).await?;
        decode(&buf[..n])
    }
}

/// Runs the client side of spec.md §4.5's handshake over an already-open
/// link and, on success, spawns the read and lease tasks. Any failure
/// closes the link before returning, per spec.md §4.5's "Failure at any
/// step: close the link, return `ERR_OPEN_*`".
pub async fn open_client(
    link: LinkUnicast,
    config: TransportConfigUnicast,
    handler: Arc<dyn TransportEventHandler>,
) -> ZResult<TransportUnicast> {
    match open_client_inner(link.clone(), config, handler).await {
        Ok(transport) => Ok(transport),
        Err(e) => {
            let _ = link.close().await;
            Err(e)
        }
    }
}

async fn open_client_inner(
    link: LinkUnicast,
    config: TransportConfigUnicast,
    handler: Arc<dyn TransportEventHandler>,
) -> ZResult<TransportUnicast> {
    let init_syn = default_init_syn(
        config.whatami,
        config.zid.clone(),
        config.resolution,
        config.batch_size,
        config.qos,
    );
    link_write_message(
        &link,
        &TransportMessage {
            body: TransportBody::InitSyn(init_syn),
        },
    )
    .await?;

    let init_ack = match link_read_message(&link).await?.body {
        TransportBody::InitAck(ack) => ack,
        _ => bail!("expected InitAck as the first reply during open"),
    };
    if init_ack.resolution.sn_resolution() > config.resolution.sn_resolution() {
        bail!("peer advertised a sequence number resolution larger than requested");
    }

    let initial_sn = rand::thread_rng().gen_range(0..init_ack.resolution.sn_resolution());
    let open_syn = OpenSyn {
        lease: config.lease.as_millis() as ZInt,
        initial_sn,
        cookie: init_ack.cookie.clone(),
    };
    link_write_message(
        &link,
        &TransportMessage {
            body: TransportBody::OpenSyn(open_syn),
        },
    )
    .await?;

    let open_ack: OpenAck = match link_read_message(&link).await?.body {
        TransportBody::OpenAck(ack) => ack,
        _ => bail!("expected OpenAck as the second reply during open"),
    };

    let resolution = init_ack.resolution;
    let tx = TransportChannelTx::new(initial_sn, initial_sn, resolution.sn_resolution());
    let rx = TransportChannelRx::new(open_ack.initial_sn, resolution.sn_resolution());

    let inner = Arc::new(TransportUnicastInner {
        link,
        config: TransportConfigUnicast {
            resolution,
            ..config
        },
        remote_zid: init_ack.zid,
        tx: Mutex::new(tx),
        rx: Mutex::new(rx),
        handler,
        signal: Signal::new(),
        transmitted: AtomicBool::new(false),
        received: AtomicBool::new(true),
        tasks: Mutex::new(None),
    });
    inner.start_tasks().await;
    inner
        .handler
        .new_peer(crate::primitives::UNICAST_PEER, inner.remote_zid.clone());

    Ok(TransportUnicast { inner })
}

impl TransportUnicastInner {
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
            let read_fut = link_read_message(&self.link).fuse();
            let stop_fut = self.signal.wait().fuse();
            futures::pin_mut!(read_fut, stop_fut);
            let msg = select! {
                r = read_fut => r,
                _ = stop_fut => break,
            };
            match msg {
                Ok(msg) => {
                    self.received.store(true, Ordering::SeqCst);
                    if let Err(e) = self.handle_transport_message(msg).await {
                        warn!("dropping malformed or unhandled transport message: {}", e);
                    }
                }
                Err(e) => {
                    debug!("unicast read task stopping: {}", e);
                    self.signal.trigger();
                    break;
                }
            }
        }
        self.handler.closed();
    }

    async fn handle_transport_message(&self, msg: TransportMessage) -> ZResult<()> {
        match msg.body {
            TransportBody::Frame(frame) => self.handle_frame(frame).await,
            TransportBody::KeepAlive(_) => Ok(()),
            TransportBody::Close(_) => {
                self.signal.trigger();
                Ok(())
            }
            // INIT/OPEN on an established session are ignored (spec.md §4.5).
            TransportBody::InitSyn(_)
            | TransportBody::InitAck(_)
            | TransportBody::OpenSyn(_)
            | TransportBody::OpenAck(_)
            | TransportBody::Join(_) => Ok(()),
        }
    }

    async fn handle_frame(&self, frame: Frame) -> ZResult<()> {
        let mut rx = self.rx.lock().await;
        let (sn_state, defrag) = match frame.reliability {
            Reliability::Reliable => (&mut rx.reliable, &mut rx.defrag_reliable),
            Reliability::BestEffort => (&mut rx.best_effort, &mut rx.defrag_best_effort),
        };
        if !sn_state.precedes(frame.sn) {
            defrag.clear();
            bail!("out-of-order sequence number on unicast transport");
        }
        sn_state.set(frame.sn);

        match frame.payload {
            FramePayload::Messages { messages } => {
                drop(rx);
                for msg in messages {
                    self.handler.handle_message(msg, crate::primitives::UNICAST_PEER)?;
                }
                Ok(())
            }
            FramePayload::Fragment { buffer, is_final } => {
                let reassembled = defrag.push(&buffer, is_final);
                drop(rx);
                if let Some(bytes) = reassembled {
                    let mut reader: &[u8] = &bytes;
                    match zenoh_codec::read_network_message(&mut reader) {
                        Ok(msg) => self.handler.handle_message(msg, crate::primitives::UNICAST_PEER)?,
                        Err(e) => warn!("dropping malformed reassembled message: {:?}", e),
                    }
                }
                Ok(())
            }
        }
    }

    async fn run_lease_task(self: Arc<Self>) {
        let tick = self.config.keep_alive;
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
            if !self.received.swap(false, Ordering::SeqCst) {
                warn!(
                    "unicast transport to {} expired: no data received within the lease",
                    self.remote_zid
                );
                self.signal.trigger();
                let _ = link_write_message(
                    &self.link,
                    &TransportMessage::close(Some(self.config.zid.clone()), CloseReason::Expired, false),
                )
                .await;
                break;
            }
            if !self.transmitted.swap(false, Ordering::SeqCst) {
                let _ = link_write_message(&self.link, &TransportMessage::keep_alive()).await;
            }
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
                body: TransportBody::Frame(Frame {
                    reliability,
                    priority,
                    sn,
                    payload: FramePayload::Messages { messages: vec![msg] },
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
                body: TransportBody::Frame(Frame {
                    reliability,
                    priority,
                    sn,
                    payload: FramePayload::Fragment {
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

    async fn close(&self, reason: CloseReason) -> ZResult<()> {
        if self.signal.is_triggered() {
            return Ok(());
        }
        let _ = link_write_message(
            &self.link,
            &TransportMessage::close(Some(self.config.zid.clone()), reason, false),
        )
        .await;
        self.signal.trigger();
        if let Some(wait_group) = self.tasks.lock().await.take() {
            wait_group.wait().await;
        }
        self.link.close().await
    }
}

impl TransportUnicast {
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

    pub async fn close(&self, reason: CloseReason) -> ZResult<()> {
        self.inner.close(reason).await
    }

    pub fn remote_zid(&self) -> &ZenohId {
        &self.inner.remote_zid
    }

    pub fn config(&self) -> &TransportConfigUnicast {
        &self.inner.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_std::sync::Mutex as AsyncMutex;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use zenoh_link_commons::{Locator, LinkUnicastTrait};

    /// An in-memory link pair connecting two `MockLink`s, used to drive the
    /// handshake and send/receive paths without a real socket.
    struct MockLink {
        src: Locator,
        dst: Locator,
        inbox: AsyncMutex<VecDeque<u8>>,
        outbox: flume::Sender<Vec<u8>>,
        streamed: bool,
        mtu: u16,
    }

    #[async_trait]
    impl LinkUnicastTrait for MockLink {
        async fn write(&self, buffer: &[u8]) -> ZResult<usize> {
            self.outbox
                .send(buffer.to_vec())
                .map_err(|e| zenoh_core::Error::msg(e.to_string()))?;
            Ok(buffer.len())
        }

        async fn write_all(&self, buffer: &[u8]) -> ZResult<()> {
            self.write(buffer).await.map(|_| ())
        }

        async fn read(&self, buffer: &mut [u8]) -> ZResult<usize> {
            let mut inbox = self.inbox.lock().await;
            let n = buffer.len().min(inbox.len());
            for b in buffer.iter_mut().take(n) {
                *b = inbox.pop_front().unwrap();
            }
            Ok(n)
        }

        async fn read_exact(&self, buffer: &mut [u8]) -> ZResult<()> {
            loop {
                let mut inbox = self.inbox.lock().await;
                if inbox.len() >= buffer.len() {
                    for b in buffer.iter_mut() {
                        *b = inbox.pop_front().unwrap();
                    }
                    return Ok(());
                }
                drop(inbox);
                async_std::task::yield_now().await;
            }
        }

        fn get_src(&self) -> &Locator {
            &self.src
        }

        fn get_dst(&self) -> &Locator {
            &self.dst
        }

        fn get_mtu(&self) -> u16 {
            self.mtu
        }

        fn is_reliable(&self) -> bool {
            true
        }

        fn is_streamed(&self) -> bool {
            self.streamed
        }

        async fn close(&self) -> ZResult<()> {
            Ok(())
        }
    }

    fn seq_num_bits_resolution() -> Resolution {
        Resolution {
            seq_num_bits: 8,
            req_id_bits: 8,
        }
    }

    #[test]
    fn seq_num_precedes_governs_frame_acceptance() {
        use crate::common::TransportChannelRx;
        let rx = TransportChannelRx::new(10, 256);
        assert!(rx.reliable.precedes(10)); // immediate successor
        assert!(rx.reliable.precedes(11)); // a dropped frame ahead of it is still accepted
        assert!(!rx.reliable.precedes(9)); // the backdated value itself, rejected as a duplicate
    }

    #[test]
    fn resolution_default_matches_spec_backdating() {
        let resolution = seq_num_bits_resolution();
        assert_eq!(resolution.sn_resolution(), 256);
    }

    /// Stream-frames and pushes one transport message into a `MockLink`'s
    /// inbox, the way a peer on the other end of the link would.
    async fn push_message(link: &MockLink, msg: &TransportMessage) {
        let mut wbuf = WBuf::new(u16::MAX as usize, true);
        assert!(write_transport_message(&mut wbuf, msg));
        let bytes = wbuf.contiguous().into_vec();
        let mut inbox = link.inbox.lock().await;
        inbox.extend((bytes.len() as u16).to_le_bytes());
        inbox.extend(bytes);
    }

    #[test]
    fn client_handshake_completes_against_a_scripted_responder() {
        async_std::task::block_on(async {
            let (outbox_tx, outbox_rx) = flume::unbounded::<Vec<u8>>();
            let link = Arc::new(MockLink {
                src: "tcp/127.0.0.1:0".parse().unwrap(),
                dst: "tcp/127.0.0.1:1".parse().unwrap(),
                inbox: AsyncMutex::new(VecDeque::new()),
                outbox: outbox_tx,
                streamed: true,
                mtu: 1500,
            });

            let server_zid = ZenohId::rand();
            let resolution = seq_num_bits_resolution();

            let server_link = link.clone();
            let server_zid_check = server_zid.clone();
            let server = async_std::task::spawn(async move {
                // INIT_SYN
                outbox_rx.recv_async().await.unwrap();
                let init_ack = TransportMessage {
                    body: TransportBody::InitAck(zenoh_protocol::transport::InitAck {
                        version: zenoh_protocol::transport::ZENOH_PROTO_VERSION,
                        whatami: WhatAmI::Peer,
                        zid: server_zid_check,
                        resolution,
                        batch_size: 1500,
                        qos: false,
                        cookie: zenoh_protocol::transport::Cookie(vec![1, 2, 3, 4]),
                    }),
                };
                push_message(&server_link, &init_ack).await;

                // OPEN_SYN
                outbox_rx.recv_async().await.unwrap();
                let open_ack = TransportMessage {
                    body: TransportBody::OpenAck(OpenAck {
                        lease: 10_000,
                        initial_sn: 7,
                    }),
                };
                push_message(&server_link, &open_ack).await;
            });

            let config = TransportConfigUnicast {
                zid: ZenohId::rand(),
                whatami: WhatAmI::Client,
                resolution,
                batch_size: 1500,
                qos: false,
                lease: Duration::from_millis(10_000),
                keep_alive: Duration::from_millis(2_500),
            };
            let handler: Arc<dyn TransportEventHandler> =
                Arc::new(crate::primitives::DummyEventHandler);

            let transport = open_client(link, config, handler).await.unwrap();
            assert_eq!(transport.remote_zid(), &server_zid);

            transport.close(CloseReason::Generic).await.unwrap();
            server.await;
        });
    }
}
