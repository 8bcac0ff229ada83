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
//! Link capability traits and the `Locator`/`EndPoint` address grammar
//! (spec.md §6), shared by the unicast and multicast transport
//! implementations. Concrete link drivers live outside this workspace.

mod link;
mod locator;

pub use link::{LinkMulticast, LinkMulticastTrait, LinkUnicast, LinkUnicastTrait};
pub use locator::{EndPoint, Locator};
