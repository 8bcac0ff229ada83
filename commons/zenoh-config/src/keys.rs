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
//! Every key spec.md §6 recognizes, as a single source of truth for
//! `Config::from_properties`/`Config::to_properties`.

pub const MODE: &str = "mode";
pub const CONNECT_ENDPOINT: &str = "connect/endpoint";
pub const LISTEN_ENDPOINT: &str = "listen/endpoint";

pub const SCOUTING_MULTICAST_ENABLED: &str = "scouting/multicast/enabled";
pub const SCOUTING_MULTICAST_ADDRESS: &str = "scouting/multicast/address";
pub const SCOUTING_MULTICAST_INTERFACE: &str = "scouting/multicast/interface";
pub const SCOUTING_TIMEOUT: &str = "scouting/timeout";

pub const TRANSPORT_LINK_TX_LEASE: &str = "transport/link/tx/lease";
pub const TRANSPORT_LINK_TX_KEEP_ALIVE: &str = "transport/link/tx/keep_alive";
pub const TRANSPORT_LINK_RX_BUFFER_SIZE: &str = "transport/link/rx/buffer_size";

pub const TLS_ROOT_CA_CERTIFICATE: &str = "tls/root_ca_certificate";
pub const TLS_ROOT_CA_CERTIFICATE_BASE64: &str = "tls/root_ca_certificate_base64";
pub const TLS_LISTEN_PRIVATE_KEY: &str = "tls/listen_private_key";
pub const TLS_LISTEN_PRIVATE_KEY_BASE64: &str = "tls/listen_private_key_base64";
pub const TLS_LISTEN_CERTIFICATE: &str = "tls/listen_certificate";
pub const TLS_LISTEN_CERTIFICATE_BASE64: &str = "tls/listen_certificate_base64";
pub const TLS_CONNECT_PRIVATE_KEY: &str = "tls/connect_private_key";
pub const TLS_CONNECT_PRIVATE_KEY_BASE64: &str = "tls/connect_private_key_base64";
pub const TLS_CONNECT_CERTIFICATE: &str = "tls/connect_certificate";
pub const TLS_CONNECT_CERTIFICATE_BASE64: &str = "tls/connect_certificate_base64";
pub const TLS_ENABLE_MTLS: &str = "tls/enable_mtls";
pub const TLS_VERIFY_NAME_ON_CONNECT: &str = "tls/verify_name_on_connect";
