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
//! Declares a subscriber (spec.md §4.4): a `DeclareSubscriber` is
//! broadcast to every attached link on construction and an `Undeclare` on
//! drop, so remote publishers' matching listeners see the subscription
//! come and go.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use zenoh_core::{AsyncResolve, Resolvable, Result as ZResult, Wait};
use zenoh_keyexpr::{CanonError, KeyExpr};
use zenoh_protocol::core::Reliability;
use zenoh_protocol::network::EntityId;

use crate::sample::Sample;
use crate::session::Session;

#[derive(Clone)]
pub(crate) struct SubscriberState {
    pub key_expr: KeyExpr,
    pub reliability: Reliability,
    pub callback: Arc<dyn Fn(Sample) + Send + Sync>,
}

/// A live subscription. Undeclares itself when dropped.
pub struct Subscriber {
    pub(crate) session: Session,
    pub(crate) id: EntityId,
}

impl Subscriber {
    pub fn undeclare(self) -> UndeclareBuilder {
        UndeclareBuilder {
            session: self.session.clone(),
            id: self.id,
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let session = self.session.clone();
        let id = self.id;
        async_std::task::spawn(async move {
            session.unregister_subscriber(id).await;
        });
    }
}

pub struct UndeclareBuilder {
    session: Session,
    id: EntityId,
}

impl Resolvable for UndeclareBuilder {
    type To = ZResult<()>;
}

impl Wait for UndeclareBuilder {
    fn wait(self) -> ZResult<()> {
        async_std::task::block_on(self.res_async())
    }
}

impl AsyncResolve for UndeclareBuilder {
    type Future = Pin<Box<dyn Future<Output = ZResult<()>> + Send>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            self.session.unregister_subscriber(self.id).await;
            Ok(())
        })
    }
}

/// Builds a [`Subscriber`]. The callback runs directly on whatever task
/// delivered the matching `Push` — keep it short, or hand off to a queue.
pub struct SubscriberBuilder<'a> {
    pub(crate) session: &'a Session,
    pub(crate) key_expr: Result<KeyExpr, CanonError>,
    pub(crate) reliability: Reliability,
}

impl<'a> SubscriberBuilder<'a> {
    pub fn reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn callback<F>(self, callback: F) -> SubscriberCallbackBuilder<'a>
    where
        F: Fn(Sample) + Send + Sync + 'static,
    {
        SubscriberCallbackBuilder {
            session: self.session,
            key_expr: self.key_expr,
            reliability: self.reliability,
            callback: Arc::new(callback),
        }
    }
}

pub struct SubscriberCallbackBuilder<'a> {
    session: &'a Session,
    key_expr: Result<KeyExpr, CanonError>,
    reliability: Reliability,
    callback: Arc<dyn Fn(Sample) + Send + Sync>,
}

impl Resolvable for SubscriberCallbackBuilder<'_> {
    type To = ZResult<Subscriber>;
}

impl Wait for SubscriberCallbackBuilder<'_> {
    fn wait(self) -> ZResult<Subscriber> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for SubscriberCallbackBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<Subscriber>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let key_expr = self.key_expr.map_err(|e| zenoh_core::Error::msg(e.to_string()))?;
            self.session
                .register_subscriber(key_expr, self.reliability, self.callback)
                .await
        })
    }
}
