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
//! A querier (spec.md §4.4, optional): binds a key expression and default
//! query parameters once, the `get()` analogue of [`crate::publisher`].
//! Never declared over the wire, for the same reason a publisher isn't.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use zenoh_core::{AsyncResolve, Resolvable, Result as ZResult, Wait};
use zenoh_keyexpr::{CanonError, KeyExpr};
use zenoh_protocol::core::{ConsolidationMode, QueryTarget};
use zenoh_protocol::network::EntityId;

use crate::query::Reply;
use crate::session::Session;
use crate::value::Value;

#[derive(Clone)]
pub(crate) struct QuerierState {
    pub key_expr: KeyExpr,
}

pub struct Querier {
    session: Session,
    id: EntityId,
    key_expr: KeyExpr,
    target: QueryTarget,
    consolidation: ConsolidationMode,
    timeout: Duration,
}

impl Querier {
    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    pub fn has_matching_queryables(&self) -> bool {
        self.session.has_matching_queryables(&self.key_expr)
    }

    pub fn get(&self) -> QuerierGetBuilder<'_> {
        QuerierGetBuilder {
            querier: self,
            parameters: String::new(),
            value: None,
        }
    }
}

impl Drop for Querier {
    fn drop(&mut self) {
        self.session.unregister_querier(self.id);
    }
}

pub struct QuerierGetBuilder<'a> {
    querier: &'a Querier,
    parameters: String,
    value: Option<Value>,
}

impl<'a> QuerierGetBuilder<'a> {
    pub fn parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl Resolvable for QuerierGetBuilder<'_> {
    type To = ZResult<flume::Receiver<Reply>>;
}

impl Wait for QuerierGetBuilder<'_> {
    fn wait(self) -> ZResult<flume::Receiver<Reply>> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for QuerierGetBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<flume::Receiver<Reply>>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            self.querier
                .session
                .inner
                .get(
                    self.querier.key_expr.clone(),
                    self.parameters,
                    self.value,
                    self.querier.target,
                    self.querier.consolidation,
                    self.querier.timeout,
                    None,
                )
                .await
        })
    }
}

pub struct QuerierBuilder<'a> {
    pub(crate) session: &'a Session,
    pub(crate) key_expr: Result<KeyExpr, CanonError>,
    pub(crate) target: QueryTarget,
    pub(crate) consolidation: ConsolidationMode,
    pub(crate) timeout: Duration,
}

impl<'a> QuerierBuilder<'a> {
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
}

impl Resolvable for QuerierBuilder<'_> {
    type To = ZResult<Querier>;
}

impl Wait for QuerierBuilder<'_> {
    fn wait(self) -> ZResult<Querier> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for QuerierBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<Querier>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let key_expr = self.key_expr.map_err(|e| zenoh_core::Error::msg(e.to_string()))?;
            let id = self.session.register_querier(QuerierState {
                key_expr: key_expr.clone(),
            });
            Ok(Querier {
                session: self.session.clone(),
                id,
                key_expr,
                target: self.target,
                consolidation: self.consolidation,
                timeout: self.timeout,
            })
        })
    }
}
