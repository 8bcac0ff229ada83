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
//! The link capability (spec.md §6): the uniform surface transports write
//! encoded frames to and read them back from. Concrete drivers (TCP, UDP,
//! TLS, ...) are out of scope here — this crate only names the trait object
//! the transport layer is built against.

use async_trait::async_trait;
use zenoh_core::Result as ZResult;

use crate::locator::Locator;

/// A point-to-point, possibly-streamed link to exactly one peer.
///
/// `is_streamed() == true` links (TCP, TLS) carry no message boundaries, so
/// the codec layer length-prefixes each batch before writing; datagram
/// links (UDP) preserve write-call boundaries and need no prefix.
#[async_trait]
pub trait LinkUnicastTrait: Send + Sync {
    async fn write(&self, buffer: &[u8]) -> ZResult<usize>;
    async fn write_all(&self, buffer: &[u8]) -> ZResult<()>;
    async fn read(&self, buffer: &mut [u8]) -> ZResult<usize>;
    async fn read_exact(&self, buffer: &mut [u8]) -> ZResult<()>;

    fn get_src(&self) -> &Locator;
    fn get_dst(&self) -> &Locator;
    fn get_mtu(&self) -> u16;
    fn is_reliable(&self) -> bool;
    fn is_streamed(&self) -> bool;

    async fn close(&self) -> ZResult<()>;
}

pub type LinkUnicast = std::sync::Arc<dyn LinkUnicastTrait>;

/// A fan-out link bound to a multicast group: every `write` reaches every
/// current member, and `read` returns whichever member sent next.
#[async_trait]
pub trait LinkMulticastTrait: Send + Sync {
    async fn write(&self, buffer: &[u8]) -> ZResult<usize>;
    async fn read(&self, buffer: &mut [u8]) -> ZResult<(usize, Locator)>;

    fn get_src(&self) -> &Locator;
    fn get_mtu(&self) -> u16;
    fn is_reliable(&self) -> bool;

    async fn close(&self) -> ZResult<()>;
}

pub type LinkMulticast = std::sync::Arc<dyn LinkMulticastTrait>;
