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
//! `Query`/`Reply` (spec.md §4.4): one `Query` is handed to a queryable's
//! callback per matching `get()`; replying is a builder like every other
//! API entry point. A [`RequestCompletion`] tracks, per request id, how
//! many `Query`s are still outstanding on this node — local dispatch and a
//! remote `Request` both go through it, so `ResponseFinal` (or, for a
//! purely local match, [`crate::session::Session`]'s own bookkeeping) fires
//! exactly once all of them have been answered or dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use zenoh_core::{AsyncResolve, Resolvable, Result as ZResult, Wait};
use zenoh_keyexpr::KeyExpr;
use zenoh_protocol::core::{ConsolidationMode, QueryTarget, Timestamp, ZInt};

use crate::sample::{QoS, Sample, SampleKind, SourceInfo};
use crate::session::{Session, SessionInner};
use crate::value::Value;

/// One reply to a `get()`. The wire's `Response` carries no error variant,
/// so unlike a full `Result<Sample, Value>` this is always a sample — a
/// queryable that wants to signal failure does so by simply not replying.
#[derive(Debug, Clone)]
pub struct Reply {
    pub sample: Sample,
}

pub(crate) enum ReplyTarget {
    Local,
    Remote { link_index: usize },
}

/// Per-request-id outstanding-`Query` counter, shared by every `Query`
/// dispatched for one request on this node.
pub(crate) struct RequestCompletion {
    session: Arc<SessionInner>,
    request_id: ZInt,
    target: ReplyTarget,
    remaining: AtomicUsize,
}

impl RequestCompletion {
    /// Builds the counter for `match_count` queries, or resolves the
    /// completion immediately (no counter kept) if nothing matched.
    pub(crate) fn start(
        session: Arc<SessionInner>,
        request_id: ZInt,
        target: ReplyTarget,
        match_count: usize,
    ) -> Option<Arc<Self>> {
        if match_count == 0 {
            Self::finish(session, request_id, &target);
            return None;
        }
        Some(Arc::new(Self {
            session,
            request_id,
            target,
            remaining: AtomicUsize::new(match_count),
        }))
    }

    fn release(self: &Arc<Self>) {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            Self::finish(self.session.clone(), self.request_id, &self.target);
        }
    }

    fn finish(session: Arc<SessionInner>, request_id: ZInt, target: &ReplyTarget) {
        match target {
            ReplyTarget::Local => session.finalize_request(request_id),
            ReplyTarget::Remote { link_index } => {
                let link_index = *link_index;
                async_std::task::spawn(async move {
                    let _ = session.send_response_final(link_index, request_id).await;
                });
            }
        }
    }
}

struct QueryInner {
    session: Arc<SessionInner>,
    request_id: ZInt,
    key_expr: KeyExpr,
    parameters: String,
    value: Option<Value>,
    completion: Arc<RequestCompletion>,
}

impl Drop for QueryInner {
    fn drop(&mut self) {
        self.completion.release();
    }
}

/// Handed to a queryable's callback once per matching `get()`. Cheaply
/// cloned; replying (any number of times) and eventually dropping the last
/// clone is what lets the requester's channel close.
#[derive(Clone)]
pub struct Query {
    inner: Arc<QueryInner>,
}

impl Query {
    pub(crate) fn new(
        session: Arc<SessionInner>,
        request_id: ZInt,
        key_expr: KeyExpr,
        parameters: String,
        value: Option<Value>,
        completion: Arc<RequestCompletion>,
    ) -> Self {
        Self {
            inner: Arc::new(QueryInner {
                session,
                request_id,
                key_expr,
                parameters,
                value,
                completion,
            }),
        }
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.inner.key_expr
    }

    /// The selector's `<u8;z16>` parameter string, distinct from the plain
    /// key expression (spec.md's original `parameters`/`predicate` split).
    pub fn parameters(&self) -> &str {
        &self.inner.parameters
    }

    pub fn value(&self) -> Option<&Value> {
        self.inner.value.as_ref()
    }

    pub fn reply(&self, value: impl Into<Value>) -> ReplyBuilder {
        ReplyBuilder {
            query: self.clone(),
            value: value.into(),
            timestamp: None,
        }
    }
}

pub struct ReplyBuilder {
    query: Query,
    value: Value,
    timestamp: Option<Timestamp>,
}

impl ReplyBuilder {
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl Resolvable for ReplyBuilder {
    type To = ZResult<()>;
}

impl Wait for ReplyBuilder {
    fn wait(self) -> ZResult<()> {
        async_std::task::block_on(self.res_async())
    }
}

impl AsyncResolve for ReplyBuilder {
    type Future = Pin<Box<dyn Future<Output = ZResult<()>> + Send>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let sample = Sample {
                key_expr: self.query.inner.key_expr.clone(),
                value: self.value,
                kind: SampleKind::Put,
                timestamp: self.timestamp,
                source_info: SourceInfo::default(),
                attachment: None,
                qos: QoS::default(),
            };
            let request_id = self.query.inner.request_id;
            let link_index = match &self.query.inner.completion.target {
                ReplyTarget::Local => None,
                ReplyTarget::Remote { link_index } => Some(*link_index),
            };
            match link_index {
                None => {
                    self.query
                        .inner
                        .session
                        .deliver_local_reply(request_id, Reply { sample });
                    Ok(())
                }
                Some(link_index) => {
                    self.query
                        .inner
                        .session
                        .send_response(link_index, request_id, &sample)
                        .await
                }
            }
        })
    }
}

/// Builds and sends a `get()` (spec.md §4.4): broadcasts a `Request` to
/// every connected link and dispatches to matching local queryables,
/// returning a channel of [`Reply`] that closes once every addressed
/// queryable (local and remote) has finished.
pub struct GetBuilder<'a> {
    pub(crate) session: &'a Session,
    pub(crate) key_expr: ZResult<KeyExpr>,
    pub(crate) parameters: String,
    pub(crate) value: Option<Value>,
    pub(crate) target: QueryTarget,
    pub(crate) consolidation: ConsolidationMode,
    pub(crate) timeout: Duration,
    pub(crate) attachment: Option<Vec<u8>>,
}

impl<'a> GetBuilder<'a> {
    pub fn parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn target(mut self, target: QueryTarget) -> Self {
        self.target = target;
        self
    }

    pub fn consolidation(mut self, consolidation: ConsolidationMode) -> Self {
        self.consolidation = consolidation;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn attachment(mut self, attachment: Vec<u8>) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

impl Resolvable for GetBuilder<'_> {
    type To = ZResult<flume::Receiver<Reply>>;
}

impl Wait for GetBuilder<'_> {
    fn wait(self) -> ZResult<flume::Receiver<Reply>> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for GetBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<flume::Receiver<Reply>>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let key_expr = self.key_expr?;
            self.session
                .inner
                .get(
                    key_expr,
                    self.parameters,
                    self.value,
                    self.target,
                    self.consolidation,
                    self.timeout,
                    self.attachment,
                )
                .await
        })
    }
}
