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
//! A client/peer implementation of the zenoh protocol core: wire codec,
//! key-expression engine, unicast and multicast transports, and the
//! session layer (spec.md §1). This crate is the public-facing surface
//! (spec.md component J): thin builders over [`session::Session`]
//! (component H), which in turn drives [`zenoh_transport`] (E/F/G) over an
//! already-open [`zenoh_link_commons`] link.
//!
//! This core has no router/forwarding role (spec.md §1 non-goals): a
//! [`Session`] is always a client or peer leaf. Concrete link drivers
//! (TCP/UDP/TLS/...) are out of scope — see [`zenoh_link_commons`] for the
//! link capability a caller implements and hands to
//! [`Session::add_unicast`]/[`Session::add_multicast`].
//!
//! ```no_run
//! use zenoh::Session;
//! use zenoh_config::Config;
//! use zenoh_core::Wait;
//!
//! # fn example() -> zenoh_core::Result<()> {
//! let session = Session::open(Config::default())?;
//! let _subscriber = session
//!     .declare_subscriber("demo/ex/**")
//!     .callback(|sample| println!("{}: {:?}", sample.key_expr, sample.value))
//!     .wait()?;
//! session.put("demo/ex/a", vec![1, 2, 3, 4]).wait()?;
//! # Ok(())
//! # }
//! ```

pub mod publisher;
pub mod querier;
pub mod query;
pub mod queryable;
pub mod sample;
pub mod scouting;
pub mod session;
pub mod subscriber;
pub mod value;

pub use zenoh_core::Result;
pub use zenoh_keyexpr::{CanonError, KeyExpr};
pub use zenoh_protocol::core::{
    CongestionControl, ConsolidationMode, Encoding, Priority, QueryTarget, Reliability, SubMode,
    WhatAmI, ZenohId,
};

pub use publisher::Publisher;
pub use querier::Querier;
pub use query::{Query, Reply};
pub use queryable::Queryable;
pub use sample::{QoS, Sample, SampleKind, SourceInfo};
pub use scouting::{scout, Scout};
pub use session::{PutBuilder, Session};
pub use subscriber::Subscriber;
pub use value::Value;

/// Glob-importable surface covering every handle and builder method needed
/// to open a session and declare publishers/subscribers/queryables/queriers,
/// mirroring the teacher's own `zenoh::prelude` convention.
pub mod prelude {
    pub use crate::publisher::Publisher;
    pub use crate::querier::Querier;
    pub use crate::query::{Query, Reply};
    pub use crate::queryable::Queryable;
    pub use crate::sample::{QoS, Sample, SampleKind, SourceInfo};
    pub use crate::scouting::{scout, Scout};
    pub use crate::session::Session;
    pub use crate::subscriber::Subscriber;
    pub use crate::value::Value;
    pub use zenoh_config::Config;
    pub use zenoh_core::{AsyncResolve, Resolvable, Wait};
    pub use zenoh_keyexpr::KeyExpr;
    pub use zenoh_protocol::core::{
        CongestionControl, ConsolidationMode, Priority, QueryTarget, Reliability, WhatAmI, ZenohId,
    };
}
