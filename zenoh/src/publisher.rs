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
//! A publisher (spec.md §4.4, optional): binds a key expression and a
//! default QoS once, so repeated `put`s don't repeat them. Never declared
//! over the wire — `Push` carries its own key expression — so this is
//! purely local convenience plus, if the caller checks
//! [`Publisher::has_matching_subscribers`], the matching-listener facility.

use std::future::Future;
use std::pin::Pin;

use zenoh_core::{AsyncResolve, Resolvable, Result as ZResult, Wait};
use zenoh_keyexpr::{CanonError, KeyExpr};
use zenoh_protocol::core::{CongestionControl, Priority};
use zenoh_protocol::network::{EntityId, Push, PushKind};

use crate::sample::SampleKind;
use crate::session::Session;
use crate::value::Value;

#[derive(Clone)]
pub(crate) struct PublisherState {
    pub key_expr: KeyExpr,
}

pub struct Publisher {
    session: Session,
    id: EntityId,
    key_expr: KeyExpr,
    congestion_control: CongestionControl,
    priority: Priority,
    express: bool,
}

impl Publisher {
    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    pub fn has_matching_subscribers(&self) -> bool {
        self.session.has_matching_subscribers(&self.key_expr)
    }

    pub fn put(&self, value: impl Into<Value>) -> PublisherPutBuilder<'_> {
        PublisherPutBuilder {
            publisher: self,
            value: value.into(),
            kind: SampleKind::Put,
        }
    }

    pub fn delete(&self) -> PublisherPutBuilder<'_> {
        PublisherPutBuilder {
            publisher: self,
            value: Value::new(Vec::new()),
            kind: SampleKind::Delete,
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.session.unregister_publisher(self.id);
    }
}

pub struct PublisherPutBuilder<'a> {
    publisher: &'a Publisher,
    value: Value,
    kind: SampleKind,
}

impl Resolvable for PublisherPutBuilder<'_> {
    type To = ZResult<()>;
}

impl Wait for PublisherPutBuilder<'_> {
    fn wait(self) -> ZResult<()> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for PublisherPutBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<()>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let push = Push {
                key_expr: self.publisher.key_expr.as_str().to_string(),
                kind: match self.kind {
                    SampleKind::Put => PushKind::Put,
                    SampleKind::Delete => PushKind::Delete,
                },
                payload: self.value.payload,
                encoding: self.value.encoding,
                timestamp: None,
                congestion_control: self.publisher.congestion_control,
                priority: self.publisher.priority,
                is_express: self.publisher.express,
                attachment: None,
            };
            self.publisher.session.send_push(push).await
        })
    }
}

pub struct PublisherBuilder<'a> {
    pub(crate) session: &'a Session,
    pub(crate) key_expr: Result<KeyExpr, CanonError>,
    pub(crate) congestion_control: CongestionControl,
    pub(crate) priority: Priority,
    pub(crate) express: bool,
}

impl<'a> PublisherBuilder<'a> {
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
}

impl Resolvable for PublisherBuilder<'_> {
    type To = ZResult<Publisher>;
}

impl Wait for PublisherBuilder<'_> {
    fn wait(self) -> ZResult<Publisher> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for PublisherBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<Publisher>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let key_expr = self.key_expr.map_err(|e| zenoh_core::Error::msg(e.to_string()))?;
            if key_expr.is_wild() {
                zenoh_core::bail!("cannot declare a publisher on a wildcard key expression: {key_expr}");
            }
            let id = self.session.register_publisher(PublisherState {
                key_expr: key_expr.clone(),
            });
            Ok(Publisher {
                session: self.session.clone(),
                id,
                key_expr,
                congestion_control: self.congestion_control,
                priority: self.priority,
                express: self.express,
            })
        })
    }
}
