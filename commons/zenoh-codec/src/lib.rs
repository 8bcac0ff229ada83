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
//! The wire codec: encode/decode of every core type and message over
//! [`zenoh_buffers::Reader`]/[`zenoh_buffers::Writer`]. Numeric encodings
//! (`zint`, lengths, the `Encoding` suffix flag) are ported field-for-field
//! from `examples/original_source/src/protocol/codec.c`; message framing
//! follows spec.md §4.2/§4.5.

mod common;
mod network;
mod scouting;
mod transport;
mod zint;

pub use common::*;
pub use network::*;
pub use scouting::*;
pub use transport::*;
pub use zint::*;

use zenoh_protocol::core::ZErrorKind;

pub type ZResult<T> = Result<T, ZErrorKind>;
