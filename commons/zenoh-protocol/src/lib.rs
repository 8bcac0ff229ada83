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
//! The zenoh wire data model: core types (module `core`), network-layer
//! messages (module `network`) and transport-layer messages (module
//! `transport`). `zenoh-codec` implements the actual byte encoding for all
//! of these; this crate only defines their shape.

pub mod core;
pub mod network;
pub mod scouting;
pub mod transport;
