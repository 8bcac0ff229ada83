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
//! The session layer (spec.md §4.3–§4.4): ties zero or more already-opened
//! links to one local identity, keeps the local subscriber/queryable/
//! publisher/querier tables and their remote-declared counterparts, and
//! routes `Push`/`Request`/`Response` traffic between them.
//!
//! Concrete link drivers are out of scope, so `Session` never dials a
//! socket itself: a caller opens a link some other way and hands it to
//! [`Session::add_unicast`]/[`Session::add_multicast`], mirroring
//! `TransportManager::open_transport_unicast`/`open_transport_multicast`'s
//! own "already-connected link in" signature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_std::sync::Mutex as AsyncMutex;
use log::{debug, warn};

use zenoh_collections::LruCache;
use zenoh_config::Config;
use zenoh_core::{bail, Result as ZResult};
use zenoh_keyexpr::KeyExpr;
use zenoh_link_commons::{LinkMulticast, LinkUnicast};
use zenoh_protocol::core::{
    CongestionControl, ConsolidationMode, Encoding, Priority, QueryTarget, Reliability, SubMode,
    WhatAmI, ZInt, ZenohId,
};
use zenoh_protocol::network::{
    Declare, DeclareQueryable, DeclareSubscriber, EntityId, NetworkBody, NetworkMessage, Push,
    PushKind, Request, Response, ResponseFinal, Undeclare, UndeclareQueryable, UndeclareSubscriber,
};
use zenoh_protocol::transport::CloseReason;
use zenoh_transport::{PeerId, TransportEventHandler, TransportManager, TransportMulticast, TransportUnicast};

use crate::publisher::{Publisher, PublisherBuilder, PublisherState};
use crate::query::{GetBuilder, Query, Reply, ReplyTarget, RequestCompletion};
use crate::querier::{Querier, QuerierBuilder, QuerierState};
use crate::queryable::{Queryable, QueryableBuilder, QueryableState};
use crate::sample::{QoS, Sample, SampleKind, SourceInfo};
use crate::subscriber::{Subscriber, SubscriberBuilder, SubscriberState};
use crate::value::Value;

/// How many matched queryables a fresh query hash-hits against before
/// falling back to a full intersection scan (spec.md §9).
const QUERYABLE_CACHE_CAPACITY: usize = 256;

/// One attached transport, addressed by its position in
/// `SessionInner::links` (the `link_index` half of a remote's identity —
/// spec.md §3's "remote-declared (keyed by `(peer-id, id)`)" extended with
/// which link the peer-id is local to, since a session may have more than
/// one transport attached at once).
enum RemoteLink {
    Unicast(TransportUnicast),
    Multicast(TransportMulticast),
}

impl RemoteLink {
    async fn send(&self, msg: NetworkMessage) -> ZResult<()> {
        match self {
            RemoteLink::Unicast(t) => {
                t.send_network_message(msg, Reliability::Reliable, CongestionControl::Block, Priority::Data)
                    .await
            }
            RemoteLink::Multicast(t) => {
                t.send_network_message(msg, Reliability::Reliable, CongestionControl::Block, Priority::Data)
                    .await
            }
        }
    }
}

/// A remote-declared resource, as seen from one `(link_index, peer)` pair.
#[derive(Debug, Clone)]
struct RemoteSubscriber {
    key_expr: KeyExpr,
}

#[derive(Debug, Clone)]
struct RemoteQueryable {
    key_expr: KeyExpr,
}

struct PendingQuery {
    sender: flume::Sender<Reply>,
    consolidation: ConsolidationMode,
    /// For `Latest`/`Auto`: buffered candidates, flushed once `outstanding`
    /// reaches zero. For `Monotonic`, each reply is sent through as soon as
    /// it's accepted, so this only ever holds the per-key timestamp
    /// watermark used to reject older-timestamped replies — never
    /// re-sent. Unused for `None`.
    seen: HashMap<String, Reply>,
    outstanding: usize,
}

/// Everything mutated by message dispatch or a declare/undeclare call.
/// Guarded by a blocking `std::sync::Mutex`: every access is a short,
/// synchronous lookup or table edit, never held across an `.await`, so the
/// transport's synchronous `TransportEventHandler` callbacks can update it
/// directly instead of spawning a task per message (preserving the order
/// messages arrive in, within one read task).
#[derive(Default)]
struct SessionState {
    next_entity_id: ZInt,
    next_request_id: ZInt,
    subscribers: HashMap<EntityId, SubscriberState>,
    queryables: HashMap<EntityId, QueryableState>,
    publishers: HashMap<EntityId, PublisherState>,
    queriers: HashMap<EntityId, QuerierState>,
    remote_subscribers: HashMap<(usize, PeerId, EntityId), RemoteSubscriber>,
    remote_queryables: HashMap<(usize, PeerId, EntityId), RemoteQueryable>,
    peer_zids: HashMap<(usize, PeerId), ZenohId>,
    pending_queries: HashMap<ZInt, PendingQuery>,
    queryable_cache: LruCache<String, Vec<EntityId>>,
}

impl SessionState {
    fn fresh_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    fn fresh_request_id(&mut self) -> ZInt {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    fn matching_queryables(&mut self, key_expr: &KeyExpr) -> Vec<(EntityId, QueryableState)> {
        if let Some(ids) = self.queryable_cache.get(&key_expr.as_str().to_string()).cloned() {
            return ids
                .into_iter()
                .filter_map(|id| self.queryables.get(&id).map(|q| (id, q.clone())))
                .collect();
        }
        let matches: Vec<(EntityId, QueryableState)> = self
            .queryables
            .iter()
            .filter(|(_, q)| q.key_expr.intersects(key_expr))
            .map(|(id, q)| (*id, q.clone()))
            .collect();
        self.queryable_cache.insert(
            key_expr.as_str().to_string(),
            matches.iter().map(|(id, _)| *id).collect(),
        );
        matches
    }

    fn invalidate_queryable_cache(&mut self) {
        self.queryable_cache = LruCache::new(QUERYABLE_CACHE_CAPACITY);
    }
}

pub(crate) struct SessionInner {
    zid: ZenohId,
    manager: TransportManager,
    links: AsyncMutex<Vec<RemoteLink>>,
    state: StdMutex<SessionState>,
}

impl SessionInner {
    fn next_link_index(links: &[RemoteLink]) -> usize {
        links.len()
    }

    /// Re-sends every locally-declared subscriber/queryable to the link
    /// just attached. Replaces the `DeclareInterest`/ack exchange the wire
    /// format supports but this session never originates: the full set is
    /// small and a fresh link starts from nothing, so replaying everything
    /// once is simpler than tracking who already asked for what.
    async fn announce_to(&self, link: &RemoteLink) {
        let (subs, qables): (Vec<_>, Vec<_>) = {
            let state = self.state.lock().unwrap();
            (
                state
                    .subscribers
                    .iter()
                    .map(|(id, s)| (*id, s.key_expr.clone(), s.reliability))
                    .collect(),
                state
                    .queryables
                    .iter()
                    .map(|(id, q)| (*id, q.key_expr.clone(), q.complete))
                    .collect(),
            )
        };
        for (id, key_expr, reliability) in subs {
            let declare = Declare::Subscriber(DeclareSubscriber {
                id,
                key_expr: key_expr.as_str().to_string(),
                reliability,
                mode: SubMode::Push,
            });
            if let Err(e) = link.send(NetworkBody::Declare(declare).into()).await {
                warn!("failed to replay subscriber declaration to new link: {e}");
            }
        }
        for (id, key_expr, complete) in qables {
            let declare = Declare::Queryable(DeclareQueryable {
                id,
                key_expr: key_expr.as_str().to_string(),
                complete,
                distance: 0,
            });
            if let Err(e) = link.send(NetworkBody::Declare(declare).into()).await {
                warn!("failed to replay queryable declaration to new link: {e}");
            }
        }
    }

    async fn broadcast(&self, msg: NetworkMessage) {
        let links = self.links.lock().await;
        for link in links.iter() {
            if let Err(e) = link.send(msg.clone()).await {
                warn!("failed to broadcast network message: {e}");
            }
        }
    }

    pub(crate) async fn send_response(
        &self,
        link_index: usize,
        request_id: ZInt,
        sample: &Sample,
    ) -> ZResult<()> {
        let links = self.links.lock().await;
        let link = links
            .get(link_index)
            .ok_or_else(|| zenoh_core::Error::msg("link no longer attached"))?;
        let response = Response {
            request_id,
            key_expr: sample.key_expr.as_str().to_string(),
            payload: sample.value.payload.clone(),
            encoding: sample.value.encoding.clone(),
            timestamp: sample.timestamp,
            attachment: sample.attachment.clone(),
        };
        link.send(NetworkBody::Response(response).into()).await
    }

    pub(crate) async fn send_response_final(&self, link_index: usize, request_id: ZInt) -> ZResult<()> {
        let links = self.links.lock().await;
        let link = links
            .get(link_index)
            .ok_or_else(|| zenoh_core::Error::msg("link no longer attached"))?;
        link.send(NetworkBody::ResponseFinal(ResponseFinal { request_id }).into())
            .await
    }

    /// Applies one incoming or locally-produced reply to the consolidation
    /// policy recorded for `request_id`. `None` and `Monotonic` forward the
    /// reply to the `get()` caller's channel immediately (`Monotonic` only
    /// records a per-key timestamp watermark in `seen` to reject
    /// older-timestamped replies, never replaying it); `Latest`/`Auto`
    /// instead buffer it in `seen`, replaced on a newer timestamp, until
    /// [`Self::finalize_request`]/[`Self::timeout_request`] flushes it.
    fn forward_reply(&self, request_id: ZInt, reply: Reply) {
        let mut state = self.state.lock().unwrap();
        let Some(pending) = state.pending_queries.get_mut(&request_id) else {
            return;
        };
        match pending.consolidation {
            ConsolidationMode::None => {
                let _ = pending.sender.send(reply);
            }
            ConsolidationMode::Monotonic => {
                let key = reply.sample.key_expr.as_str().to_string();
                let is_newer = match pending.seen.get(&key) {
                    Some(prev) => is_newer_reply(&reply, prev),
                    None => true,
                };
                if is_newer {
                    pending.seen.insert(key, reply.clone());
                    let _ = pending.sender.send(reply);
                }
            }
            ConsolidationMode::Latest | ConsolidationMode::Auto => {
                let key = reply.sample.key_expr.as_str().to_string();
                let replace = match pending.seen.get(&key) {
                    Some(prev) => is_newer_reply(&reply, prev),
                    None => true,
                };
                if replace {
                    pending.seen.insert(key, reply);
                }
            }
        }
    }

    pub(crate) fn deliver_local_reply(&self, request_id: ZInt, reply: Reply) {
        self.forward_reply(request_id, reply);
    }

    /// One of the `outstanding` responders for `request_id` (a remote link
    /// or the local dispatch) has finished; once the count reaches zero any
    /// buffered `Latest`/`Auto` replies are flushed and the channel is
    /// closed by dropping its sender.
    pub(crate) fn finalize_request(&self, request_id: ZInt) {
        let mut state = self.state.lock().unwrap();
        let done = match state.pending_queries.get_mut(&request_id) {
            Some(pending) => {
                pending.outstanding = pending.outstanding.saturating_sub(1);
                pending.outstanding == 0
            }
            None => false,
        };
        if done {
            if let Some(pending) = state.pending_queries.remove(&request_id) {
                flush_buffered_replies(pending);
            }
        }
    }

    /// Fires once `timeout` elapses with `request_id` still pending: drops
    /// it early, flushing any `Latest`/`Auto` replies buffered so far, so a
    /// remote link that never sends `RESPONSE_FINAL` doesn't leave the
    /// `get()` caller's channel open forever (spec.md §4.4/§7 `Timeout`). A
    /// no-op if the request already finished normally before the timer
    /// fired.
    fn timeout_request(&self, request_id: ZInt) {
        let mut state = self.state.lock().unwrap();
        if let Some(pending) = state.pending_queries.remove(&request_id) {
            flush_buffered_replies(pending);
        }
    }

    fn peer_zid(&self, link_index: usize, peer: PeerId) -> Option<ZenohId> {
        self.state.lock().unwrap().peer_zids.get(&(link_index, peer)).cloned()
    }

    fn handle_declare(&self, link_index: usize, peer: PeerId, declare: Declare) {
        let mut state = self.state.lock().unwrap();
        match declare {
            Declare::Subscriber(d) => {
                let Ok(key_expr) = KeyExpr::new(&d.key_expr) else {
                    return;
                };
                state
                    .remote_subscribers
                    .insert((link_index, peer, d.id), RemoteSubscriber { key_expr });
            }
            Declare::Queryable(d) => {
                let Ok(key_expr) = KeyExpr::new(&d.key_expr) else {
                    return;
                };
                state
                    .remote_queryables
                    .insert((link_index, peer, d.id), RemoteQueryable { key_expr });
            }
            Declare::KeyExpr(_) | Declare::Interest(_) => {
                // No resource-id aliasing or explicit interest tracking at
                // this layer: declarations always carry their full key
                // expression, and matching listeners recompute from the
                // remote tables above rather than from interest state.
            }
        }
    }

    fn handle_undeclare(&self, link_index: usize, peer: PeerId, undeclare: Undeclare) {
        let mut state = self.state.lock().unwrap();
        match undeclare {
            Undeclare::Subscriber(UndeclareSubscriber { id }) => {
                state.remote_subscribers.remove(&(link_index, peer, id));
            }
            Undeclare::Queryable(UndeclareQueryable { id }) => {
                state.remote_queryables.remove(&(link_index, peer, id));
            }
            Undeclare::KeyExpr(_) | Undeclare::Interest(_) => {}
        }
    }

    fn handle_push(&self, link_index: usize, peer: PeerId, push: Push) {
        let Ok(key_expr) = KeyExpr::new(&push.key_expr) else {
            warn!("dropping push with invalid key expression: {}", push.key_expr);
            return;
        };
        let source_id = self.peer_zid(link_index, peer);
        let subscribers: Vec<_> = {
            let state = self.state.lock().unwrap();
            state
                .subscribers
                .values()
                .filter(|s| s.key_expr.intersects(&key_expr))
                .map(|s| s.callback.clone())
                .collect()
        };
        if subscribers.is_empty() {
            return;
        }
        let sample = Sample {
            key_expr,
            value: Value {
                payload: push.payload,
                encoding: push.encoding,
            },
            kind: match push.kind {
                PushKind::Put => SampleKind::Put,
                PushKind::Delete => SampleKind::Delete,
            },
            timestamp: push.timestamp,
            source_info: SourceInfo {
                source_id,
                source_sn: None,
            },
            attachment: push.attachment,
            qos: QoS {
                priority: push.priority,
                congestion_control: push.congestion_control,
                express: push.is_express,
            },
        };
        for callback in subscribers {
            callback(sample.clone());
        }
    }

    fn handle_request(self: &Arc<Self>, link_index: usize, request: Request) {
        let Ok(key_expr) = KeyExpr::new(&request.key_expr) else {
            warn!("dropping request with invalid key expression: {}", request.key_expr);
            return;
        };
        let matches = {
            let mut state = self.state.lock().unwrap();
            state.matching_queryables(&key_expr)
        };
        let completion = RequestCompletion::start(
            self.clone(),
            request.id,
            ReplyTarget::Remote { link_index },
            matches.len(),
        );
        let Some(completion) = completion else {
            return;
        };
        let value = request.payload.map(|payload| Value {
            payload,
            encoding: request.encoding.unwrap_or_else(|| Encoding::new(Encoding::EMPTY)),
        });
        for (_, queryable) in matches {
            let query = Query::new(
                self.clone(),
                request.id,
                key_expr.clone(),
                request.parameters.clone(),
                value.clone(),
                completion.clone(),
            );
            (queryable.callback)(query);
        }
    }

    fn handle_response(&self, response: Response) {
        let Ok(key_expr) = KeyExpr::new(&response.key_expr) else {
            return;
        };
        let sample = Sample {
            key_expr,
            value: Value {
                payload: response.payload,
                encoding: response.encoding,
            },
            kind: SampleKind::Put,
            timestamp: response.timestamp,
            source_info: SourceInfo::default(),
            attachment: response.attachment,
            qos: QoS::default(),
        };
        self.forward_reply(response.request_id, Reply { sample });
    }

    pub(crate) async fn get(
        self: &Arc<Self>,
        key_expr: KeyExpr,
        parameters: String,
        value: Option<Value>,
        target: QueryTarget,
        consolidation: ConsolidationMode,
        timeout: Duration,
        attachment: Option<zenoh_protocol::network::Attachment>,
    ) -> ZResult<flume::Receiver<Reply>> {
        let (sender, receiver) = flume::unbounded();
        let request_id = {
            let mut state = self.state.lock().unwrap();
            let id = state.fresh_request_id();
            state.pending_queries.insert(
                id,
                PendingQuery {
                    sender,
                    consolidation,
                    seen: HashMap::new(),
                    // One responder per attached link plus the local dispatch
                    // below; each is accounted for exactly once through
                    // `finalize_request`/`RequestCompletion`.
                    outstanding: 0,
                },
            );
            id
        };

        let link_count = {
            let links = self.links.lock().await;
            links.len()
        };
        {
            let mut state = self.state.lock().unwrap();
            if let Some(pending) = state.pending_queries.get_mut(&request_id) {
                pending.outstanding = link_count + 1;
            }
        }

        let request = Request {
            id: request_id,
            key_expr: key_expr.as_str().to_string(),
            parameters: parameters.clone(),
            target,
            consolidation,
            payload: value.as_ref().map(|v| v.payload.clone()),
            encoding: value.as_ref().map(|v| v.encoding.clone()),
            attachment,
        };
        {
            let links = self.links.lock().await;
            for link in links.iter() {
                if let Err(e) = link.send(NetworkBody::Request(request.clone()).into()).await {
                    warn!("failed to send request over link: {e}");
                    self.finalize_request(request_id);
                }
            }
        }

        let matches = {
            let mut state = self.state.lock().unwrap();
            state.matching_queryables(&key_expr)
        };
        let completion = RequestCompletion::start(
            self.clone(),
            request_id,
            ReplyTarget::Local,
            matches.len(),
        );
        if let Some(completion) = completion {
            for (_, queryable) in matches {
                let query = Query::new(
                    self.clone(),
                    request_id,
                    key_expr.clone(),
                    parameters.clone(),
                    value.clone(),
                    completion.clone(),
                );
                (queryable.callback)(query);
            }
        }

        let session = self.clone();
        async_std::task::spawn(async move {
            async_std::task::sleep(timeout).await;
            session.timeout_request(request_id);
        });

        Ok(receiver)
    }
}

/// Delivers a pending query's buffered replies on completion — only for
/// `Latest`/`Auto`, since `Monotonic` replies are sent through as they
/// arrive and must not be sent again here.
fn flush_buffered_replies(pending: PendingQuery) {
    if matches!(pending.consolidation, ConsolidationMode::Latest | ConsolidationMode::Auto) {
        for reply in pending.seen.into_values() {
            let _ = pending.sender.send(reply);
        }
    }
}

fn is_newer_reply(candidate: &Reply, current: &Reply) -> bool {
    match (candidate.sample.timestamp, current.sample.timestamp) {
        (Some(a), Some(b)) => a > b,
        _ => true,
    }
}

/// Per-link dispatch target: tags every callback from one attached
/// transport with which link it came from before handing off to the
/// session, so a session with several links attached can tell two
/// same-numbered remote peer-ids on different transports apart.
struct LinkHandler {
    session: std::sync::Weak<SessionInner>,
    link_index: usize,
}

impl TransportEventHandler for LinkHandler {
    fn handle_message(&self, msg: NetworkMessage, peer: PeerId) -> ZResult<()> {
        let Some(session) = self.session.upgrade() else {
            return Ok(());
        };
        let link_index = self.link_index;
        match msg.body {
            NetworkBody::Declare(d) => session.handle_declare(link_index, peer, d),
            NetworkBody::Undeclare(u) => session.handle_undeclare(link_index, peer, u),
            NetworkBody::Push(p) => session.handle_push(link_index, peer, p),
            NetworkBody::Request(r) => session.handle_request(link_index, r),
            NetworkBody::Response(r) => session.handle_response(r),
            NetworkBody::ResponseFinal(f) => session.finalize_request(f.request_id),
        }
        Ok(())
    }

    fn new_peer(&self, peer: PeerId, zid: ZenohId) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        session
            .state
            .lock()
            .unwrap()
            .peer_zids
            .insert((self.link_index, peer), zid);
    }

    fn del_peer(&self, peer: PeerId) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let mut state = session.state.lock().unwrap();
        state.peer_zids.remove(&(self.link_index, peer));
        state
            .remote_subscribers
            .retain(|(link, p, _), _| !(*link == self.link_index && *p == peer));
        state
            .remote_queryables
            .retain(|(link, p, _), _| !(*link == self.link_index && *p == peer));
        state.invalidate_queryable_cache();
    }

    fn closed(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let mut state = session.state.lock().unwrap();
        state
            .remote_subscribers
            .retain(|(link, _, _), _| *link != self.link_index);
        state
            .remote_queryables
            .retain(|(link, _, _), _| *link != self.link_index);
        state.invalidate_queryable_cache();
    }
}

/// A zenoh session: the public handle a user holds. Cheaply cloned, since
/// every clone shares the same [`SessionInner`].
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    /// Builds a session with no transport attached yet. Opening concrete
    /// links (dialing a TCP/UDP endpoint, binding a multicast socket) is an
    /// embedder's job; call [`Session::add_unicast`]/[`Session::add_multicast`]
    /// once a link exists.
    pub fn open(config: Config) -> ZResult<Session> {
        let zid = ZenohId::rand();
        let manager = TransportManager::new(zid.clone(), &config);
        let inner = Arc::new(SessionInner {
            zid,
            manager,
            links: AsyncMutex::new(Vec::new()),
            state: StdMutex::new(SessionState {
                queryable_cache: LruCache::new(QUERYABLE_CACHE_CAPACITY),
                ..Default::default()
            }),
        });
        Ok(Session { inner })
    }

    pub fn zid(&self) -> &ZenohId {
        &self.inner.zid
    }

    /// Opens a unicast transport as the client side of the handshake over
    /// an already-connected link and attaches it, replaying every local
    /// declaration to the new peer.
    pub async fn add_unicast(&self, link: LinkUnicast) -> ZResult<()> {
        let link_index = {
            let links = self.inner.links.lock().await;
            SessionInner::next_link_index(&links)
        };
        let handler = Arc::new(LinkHandler {
            session: Arc::downgrade(&self.inner),
            link_index,
        });
        let transport = self.inner.manager.open_transport_unicast(link, handler).await?;
        let remote = RemoteLink::Unicast(transport);
        self.inner.announce_to(&remote).await;
        let mut links = self.inner.links.lock().await;
        links.push(remote);
        Ok(())
    }

    /// Joins a multicast group over an already-bound link and attaches it.
    pub async fn add_multicast(&self, link: LinkMulticast) -> ZResult<()> {
        let link_index = {
            let links = self.inner.links.lock().await;
            SessionInner::next_link_index(&links)
        };
        let handler = Arc::new(LinkHandler {
            session: Arc::downgrade(&self.inner),
            link_index,
        });
        let transport = self.inner.manager.open_transport_multicast(link, handler).await?;
        let remote = RemoteLink::Multicast(transport);
        self.inner.announce_to(&remote).await;
        let mut links = self.inner.links.lock().await;
        links.push(remote);
        Ok(())
    }

    /// Closes every attached link. The session object remains usable
    /// afterwards (matching spec.md's "no persistence across restarts":
    /// closing is a transport-level event, not a teardown of local state).
    pub async fn close(&self) -> ZResult<()> {
        let mut links = self.inner.links.lock().await;
        for link in links.drain(..) {
            let result = match link {
                RemoteLink::Unicast(t) => t.close(CloseReason::Generic).await,
                RemoteLink::Multicast(t) => t.close().await,
            };
            if let Err(e) = result {
                warn!("error closing link: {e}");
            }
        }
        Ok(())
    }

    pub fn put(&self, key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>, value: impl Into<Value>) -> PutBuilder<'_> {
        PutBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            value: value.into(),
            kind: SampleKind::Put,
            congestion_control: CongestionControl::Drop,
            priority: Priority::default(),
            express: false,
            attachment: None,
        }
    }

    pub fn delete(&self, key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>) -> PutBuilder<'_> {
        PutBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            value: Value::new(Vec::new()),
            kind: SampleKind::Delete,
            congestion_control: CongestionControl::Drop,
            priority: Priority::default(),
            express: false,
            attachment: None,
        }
    }

    pub fn get(&self, key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>) -> GetBuilder<'_> {
        GetBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            parameters: String::new(),
            value: None,
            target: QueryTarget::BestMatching,
            consolidation: ConsolidationMode::Auto,
            timeout: Duration::from_millis(10_000),
            attachment: None,
        }
    }

    pub fn declare_subscriber(
        &self,
        key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>,
    ) -> SubscriberBuilder<'_> {
        SubscriberBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            reliability: Reliability::Reliable,
        }
    }

    pub fn declare_queryable(
        &self,
        key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>,
    ) -> QueryableBuilder<'_> {
        QueryableBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            complete: false,
        }
    }

    pub fn declare_publisher(
        &self,
        key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>,
    ) -> PublisherBuilder<'_> {
        PublisherBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            congestion_control: CongestionControl::Drop,
            priority: Priority::default(),
            express: false,
        }
    }

    pub fn declare_querier(
        &self,
        key_expr: impl TryInto<KeyExpr, Error = zenoh_keyexpr::CanonError>,
    ) -> QuerierBuilder<'_> {
        QuerierBuilder {
            session: self,
            key_expr: key_expr.try_into().map_err(|e| zenoh_core::Error::msg(e.to_string())),
            target: QueryTarget::BestMatching,
            consolidation: ConsolidationMode::Auto,
            timeout: Duration::from_millis(10_000),
        }
    }

    pub(crate) async fn register_subscriber(
        &self,
        key_expr: KeyExpr,
        reliability: Reliability,
        callback: Arc<dyn Fn(Sample) + Send + Sync>,
    ) -> ZResult<Subscriber> {
        let id = {
            let mut state = self.inner.state.lock().unwrap();
            let id = state.fresh_entity_id();
            state.subscribers.insert(
                id,
                SubscriberState {
                    key_expr: key_expr.clone(),
                    reliability,
                    callback,
                },
            );
            id
        };
        let declare = Declare::Subscriber(DeclareSubscriber {
            id,
            key_expr: key_expr.as_str().to_string(),
            reliability,
            mode: SubMode::Push,
        });
        self.inner.broadcast(NetworkBody::Declare(declare).into()).await;
        Ok(Subscriber {
            session: self.clone(),
            id,
        })
    }

    pub(crate) async fn unregister_subscriber(&self, id: EntityId) {
        self.inner.state.lock().unwrap().subscribers.remove(&id);
        let undeclare = Undeclare::Subscriber(UndeclareSubscriber { id });
        self.inner.broadcast(NetworkBody::Undeclare(undeclare).into()).await;
    }

    pub(crate) async fn register_queryable(
        &self,
        key_expr: KeyExpr,
        complete: bool,
        callback: Arc<dyn Fn(Query) + Send + Sync>,
    ) -> ZResult<Queryable> {
        let id = {
            let mut state = self.inner.state.lock().unwrap();
            let id = state.fresh_entity_id();
            state.queryables.insert(
                id,
                QueryableState {
                    key_expr: key_expr.clone(),
                    complete,
                    callback,
                },
            );
            state.invalidate_queryable_cache();
            id
        };
        let declare = Declare::Queryable(DeclareQueryable {
            id,
            key_expr: key_expr.as_str().to_string(),
            complete,
            distance: 0,
        });
        self.inner.broadcast(NetworkBody::Declare(declare).into()).await;
        Ok(Queryable {
            session: self.clone(),
            id,
        })
    }

    pub(crate) async fn unregister_queryable(&self, id: EntityId) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.queryables.remove(&id);
            state.invalidate_queryable_cache();
        }
        let undeclare = Undeclare::Queryable(UndeclareQueryable { id });
        self.inner.broadcast(NetworkBody::Undeclare(undeclare).into()).await;
    }

    /// Publishers and queriers are never declared over the wire (spec.md
    /// §4.4's `Declare` set covers subscribers and queryables only): a
    /// publication or a query is simply sent without announcing intent
    /// first, so registering one is local bookkeeping only.
    pub(crate) fn register_publisher(&self, state: PublisherState) -> EntityId {
        let mut guard = self.inner.state.lock().unwrap();
        let id = guard.fresh_entity_id();
        guard.publishers.insert(id, state);
        id
    }

    pub(crate) fn unregister_publisher(&self, id: EntityId) {
        self.inner.state.lock().unwrap().publishers.remove(&id);
    }

    pub(crate) fn register_querier(&self, state: QuerierState) -> EntityId {
        let mut guard = self.inner.state.lock().unwrap();
        let id = guard.fresh_entity_id();
        guard.queriers.insert(id, state);
        id
    }

    pub(crate) fn unregister_querier(&self, id: EntityId) {
        self.inner.state.lock().unwrap().queriers.remove(&id);
    }

    /// Whether any remote-declared subscriber currently intersects
    /// `key_expr` (spec.md §4.4's optional matching-listener facility).
    pub(crate) fn has_matching_subscribers(&self, key_expr: &KeyExpr) -> bool {
        self.inner
            .state
            .lock()
            .unwrap()
            .remote_subscribers
            .values()
            .any(|s| s.key_expr.intersects(key_expr))
    }

    pub(crate) fn has_matching_queryables(&self, key_expr: &KeyExpr) -> bool {
        self.inner
            .state
            .lock()
            .unwrap()
            .remote_queryables
            .values()
            .any(|q| q.key_expr.intersects(key_expr))
    }

    pub(crate) async fn send_push(&self, push: Push) -> ZResult<()> {
        self.inner.broadcast(NetworkBody::Push(push).into()).await;
        Ok(())
    }
}

/// Builds and sends a `put`/`delete` (spec.md §4.4).
pub struct PutBuilder<'a> {
    session: &'a Session,
    key_expr: ZResult<KeyExpr>,
    value: Value,
    kind: SampleKind,
    congestion_control: CongestionControl,
    priority: Priority,
    express: bool,
    attachment: Option<zenoh_protocol::network::Attachment>,
}

impl<'a> PutBuilder<'a> {
    pub fn congestion_control(mut self, congestion_control: CongestionControl) -> Self {
        self.congestion_control = congestion_control;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn express(mut self, express: bool) -> Self {
        self.express = express;
        self
    }

    pub fn attachment(mut self, attachment: Vec<u8>) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

impl zenoh_core::Resolvable for PutBuilder<'_> {
    type To = ZResult<()>;
}

impl zenoh_core::Wait for PutBuilder<'_> {
    fn wait(self) -> ZResult<()> {
        async_std::task::block_on(zenoh_core::AsyncResolve::res_async(self))
    }
}

impl<'a> zenoh_core::AsyncResolve for PutBuilder<'a> {
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = ZResult<()>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let key_expr = self.key_expr?;
            if key_expr.is_wild() {
                bail!("cannot put/delete on a wildcard key expression: {key_expr}");
            }
            let push = Push {
                key_expr: key_expr.as_str().to_string(),
                kind: match self.kind {
                    SampleKind::Put => PushKind::Put,
                    SampleKind::Delete => PushKind::Delete,
                },
                payload: self.value.payload,
                encoding: self.value.encoding,
                timestamp: None,
                congestion_control: self.congestion_control,
                priority: self.priority,
                is_express: self.express,
                attachment: self.attachment,
            };
            self.session.send_push(push).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_starts_with_no_links() {
        let session = Session::open(Config::default()).unwrap();
        assert_eq!(session.inner.state.lock().unwrap().subscribers.len(), 0);
    }

    #[test]
    fn put_rejects_wildcard_key() {
        let session = Session::open(Config::default()).unwrap();
        let err = zenoh_core::Wait::wait(session.put("a/*", "x"));
        assert!(err.is_err());
    }
}
