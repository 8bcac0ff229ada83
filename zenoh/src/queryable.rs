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
//! Declares a queryable (spec.md §4.4): a `DeclareQueryable` is broadcast
//! to every attached link on construction and an `Undeclare` on drop,
//! mirroring [`crate::subscriber`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use zenoh_core::{AsyncResolve, Resolvable, Result as ZResult, Wait};
use zenoh_keyexpr::{CanonError, KeyExpr};
use zenoh_protocol::network::EntityId;

use crate::query::Query;
use crate::session::Session;

#[derive(Clone)]
pub(crate) struct QueryableState {
    pub key_expr: KeyExpr,
    pub complete: bool,
    pub callback: Arc<dyn Fn(Query) + Send + Sync>,
}

/// A live queryable. Undeclares itself when dropped.
pub struct Queryable {
    pub(crate) session: Session,
    pub(crate) id: EntityId,
}

impl Queryable {
    pub fn undeclare(self) -> UndeclareBuilder {
        UndeclareBuilder {
            session: self.session.clone(),
            id: self.id,
        }
    }
}

impl Drop for Queryable {
    fn drop(&mut self) {
        let session = self.session.clone();
        let id = self.id;
        async_std::task::spawn(async move {
            session.unregister_queryable(id).await;
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
            self.session.unregister_queryable(self.id).await;
            Ok(())
        })
    }
}

/// Builds a [`Queryable`]. `complete` advertises (spec.md §4.4) whether
/// this queryable alone can answer its whole key expression — callers
/// combining query results may use it to skip redundant queries, but this
/// layer never enforces it itself.
pub struct QueryableBuilder<'a> {
    pub(crate) session: &'a Session,
    pub(crate) key_expr: Result<KeyExpr, CanonError>,
    pub(crate) complete: bool,
}

impl<'a> QueryableBuilder<'a> {
    pub fn complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    pub fn callback<F>(self, callback: F) -> QueryableCallbackBuilder<'a>
    where
        F: Fn(Query) + Send + Sync + 'static,
    {
        QueryableCallbackBuilder {
            session: self.session,
            key_expr: self.key_expr,
            complete: self.complete,
            callback: Arc::new(callback),
        }
    }
}

pub struct QueryableCallbackBuilder<'a> {
    session: &'a Session,
    key_expr: Result<KeyExpr, CanonError>,
    complete: bool,
    callback: Arc<dyn Fn(Query) + Send + Sync>,
}

impl Resolvable for QueryableCallbackBuilder<'_> {
    type To = ZResult<Queryable>;
}

impl Wait for QueryableCallbackBuilder<'_> {
    fn wait(self) -> ZResult<Queryable> {
        async_std::task::block_on(self.res_async())
    }
}

impl<'a> AsyncResolve for QueryableCallbackBuilder<'a> {
    type Future = Pin<Box<dyn Future<Output = ZResult<Queryable>> + Send + 'a>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let key_expr = self.key_expr.map_err(|e| zenoh_core::Error::msg(e.to_string()))?;
            self.session
                .register_queryable(key_expr, self.complete, self.callback)
                .await
        })
    }
}
