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
//! Configuration, spec.md §6/§4.8. The wire-level contract is a flat string
//! property bag ([`Properties`]); `Config` is the typed view over it, built
//! either from that flat map or from a nested `json5` document the way a
//! user-facing `zenoh.json5` file is laid out.

mod keys;
mod properties;

pub use properties::Properties;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use zenoh_protocol::core::WhatAmI;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutingConfig {
    pub multicast_enabled: bool,
    pub multicast_address: String,
    pub multicast_interface: Option<String>,
    pub timeout: Duration,
}

impl Default for ScoutingConfig {
    fn default() -> Self {
        Self {
            multicast_enabled: true,
            multicast_address: "224.0.0.224:7446".to_string(),
            multicast_interface: None,
            timeout: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub lease: Duration,
    pub keep_alive: Duration,
    pub rx_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            lease: Duration::from_millis(10_000),
            keep_alive: Duration::from_millis(2_500),
            rx_buffer_size: 65_535,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub root_ca_certificate: Option<String>,
    pub root_ca_certificate_base64: Option<String>,
    pub listen_private_key: Option<String>,
    pub listen_private_key_base64: Option<String>,
    pub listen_certificate: Option<String>,
    pub listen_certificate_base64: Option<String>,
    pub connect_private_key: Option<String>,
    pub connect_private_key_base64: Option<String>,
    pub connect_certificate: Option<String>,
    pub connect_certificate_base64: Option<String>,
    pub enable_mtls: bool,
    pub verify_name_on_connect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: WhatAmI,
    pub connect_endpoints: Vec<String>,
    pub listen_endpoints: Vec<String>,
    pub scouting: ScoutingConfig,
    pub transport: TransportConfig,
    pub tls: TlsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: WhatAmI::Client,
            connect_endpoints: Vec::new(),
            listen_endpoints: Vec::new(),
            scouting: ScoutingConfig::default(),
            transport: TransportConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

fn parse_bool(key: &str, s: &str) -> zenoh_core::Result<bool> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        other => zenoh_core::bail!("invalid boolean value for '{key}': '{other}'"),
    }
}

fn parse_mode(s: &str) -> zenoh_core::Result<WhatAmI> {
    match s {
        "client" => Ok(WhatAmI::Client),
        "peer" => Ok(WhatAmI::Peer),
        other => zenoh_core::bail!("invalid 'mode': '{other}' (expected 'client' or 'peer')"),
    }
}

impl Config {
    /// Builds a `Config` from the flat property bag of spec.md §6,
    /// overlaying onto [`Config::default`] wherever a key is absent.
    pub fn from_properties(props: &Properties) -> zenoh_core::Result<Config> {
        let mut cfg = Config::default();

        if let Some(s) = props.get(keys::MODE) {
            cfg.mode = parse_mode(s)?;
        }
        cfg.connect_endpoints = props.get_list(keys::CONNECT_ENDPOINT);
        cfg.listen_endpoints = props.get_list(keys::LISTEN_ENDPOINT);

        if let Some(s) = props.get(keys::SCOUTING_MULTICAST_ENABLED) {
            cfg.scouting.multicast_enabled = parse_bool(keys::SCOUTING_MULTICAST_ENABLED, s)?;
        }
        if let Some(s) = props.get(keys::SCOUTING_MULTICAST_ADDRESS) {
            cfg.scouting.multicast_address = s.to_string();
        }
        if let Some(s) = props.get(keys::SCOUTING_MULTICAST_INTERFACE) {
            cfg.scouting.multicast_interface = Some(s.to_string());
        }
        if let Some(s) = props.get(keys::SCOUTING_TIMEOUT) {
            cfg.scouting.timeout = zenoh_util::parse_duration(s)?;
        }

        if let Some(s) = props.get(keys::TRANSPORT_LINK_TX_LEASE) {
            cfg.transport.lease = zenoh_util::parse_duration(s)?;
        }
        if let Some(s) = props.get(keys::TRANSPORT_LINK_TX_KEEP_ALIVE) {
            cfg.transport.keep_alive = zenoh_util::parse_duration(s)?;
        }
        if let Some(s) = props.get(keys::TRANSPORT_LINK_RX_BUFFER_SIZE) {
            cfg.transport.rx_buffer_size = s
                .parse()
                .map_err(|_| zenoh_core::Error::msg(format!("invalid buffer size '{s}'")))?;
        }

        cfg.tls.root_ca_certificate = props.get(keys::TLS_ROOT_CA_CERTIFICATE).map(str::to_string);
        cfg.tls.root_ca_certificate_base64 = props
            .get(keys::TLS_ROOT_CA_CERTIFICATE_BASE64)
            .map(str::to_string);
        cfg.tls.listen_private_key = props.get(keys::TLS_LISTEN_PRIVATE_KEY).map(str::to_string);
        cfg.tls.listen_private_key_base64 = props
            .get(keys::TLS_LISTEN_PRIVATE_KEY_BASE64)
            .map(str::to_string);
        cfg.tls.listen_certificate = props.get(keys::TLS_LISTEN_CERTIFICATE).map(str::to_string);
        cfg.tls.listen_certificate_base64 = props
            .get(keys::TLS_LISTEN_CERTIFICATE_BASE64)
            .map(str::to_string);
        cfg.tls.connect_private_key = props.get(keys::TLS_CONNECT_PRIVATE_KEY).map(str::to_string);
        cfg.tls.connect_private_key_base64 = props
            .get(keys::TLS_CONNECT_PRIVATE_KEY_BASE64)
            .map(str::to_string);
        cfg.tls.connect_certificate = props.get(keys::TLS_CONNECT_CERTIFICATE).map(str::to_string);
        cfg.tls.connect_certificate_base64 = props
            .get(keys::TLS_CONNECT_CERTIFICATE_BASE64)
            .map(str::to_string);
        if let Some(s) = props.get(keys::TLS_ENABLE_MTLS) {
            cfg.tls.enable_mtls = parse_bool(keys::TLS_ENABLE_MTLS, s)?;
        }
        if let Some(s) = props.get(keys::TLS_VERIFY_NAME_ON_CONNECT) {
            cfg.tls.verify_name_on_connect = parse_bool(keys::TLS_VERIFY_NAME_ON_CONNECT, s)?;
        }

        Ok(cfg)
    }

    /// Flattens a `Config` back into the property bag, the inverse of
    /// [`Config::from_properties`].
    pub fn to_properties(&self) -> Properties {
        let mut p = Properties::new();
        p.insert(
            keys::MODE,
            match self.mode {
                WhatAmI::Client => "client",
                WhatAmI::Peer => "peer",
                WhatAmI::Router => "peer",
            },
        );
        if !self.connect_endpoints.is_empty() {
            p.insert_list(keys::CONNECT_ENDPOINT, &self.connect_endpoints);
        }
        if !self.listen_endpoints.is_empty() {
            p.insert_list(keys::LISTEN_ENDPOINT, &self.listen_endpoints);
        }
        p.insert(
            keys::SCOUTING_MULTICAST_ENABLED,
            self.scouting.multicast_enabled.to_string(),
        );
        p.insert(keys::SCOUTING_MULTICAST_ADDRESS, self.scouting.multicast_address.clone());
        if let Some(iface) = &self.scouting.multicast_interface {
            p.insert(keys::SCOUTING_MULTICAST_INTERFACE, iface.clone());
        }
        p.insert(
            keys::SCOUTING_TIMEOUT,
            humantime::format_duration(self.scouting.timeout).to_string(),
        );
        p.insert(
            keys::TRANSPORT_LINK_TX_LEASE,
            humantime::format_duration(self.transport.lease).to_string(),
        );
        p.insert(
            keys::TRANSPORT_LINK_TX_KEEP_ALIVE,
            humantime::format_duration(self.transport.keep_alive).to_string(),
        );
        p.insert(
            keys::TRANSPORT_LINK_RX_BUFFER_SIZE,
            self.transport.rx_buffer_size.to_string(),
        );
        p
    }

    /// Builds a `Config` from a nested `json5` document, the shape a
    /// user-facing `zenoh.json5` file takes (`{"mode": "peer", "connect":
    /// {"endpoints": [...]}, ...}`).
    pub fn from_json5(s: &str) -> zenoh_core::Result<Config> {
        let raw: RawConfig =
            json5::from_str(s).map_err(|e| zenoh_core::Error::msg(e.to_string()))?;
        raw.try_into()
    }

    /// Serializes back to a JSON document (a valid `json5` document is a
    /// superset of JSON, so this round-trips through [`Config::from_json5`]).
    pub fn to_json5(&self) -> zenoh_core::Result<String> {
        serde_json::to_string_pretty(&self.to_raw()).map_err(|e| zenoh_core::Error::msg(e.to_string()))
    }

    fn to_raw(&self) -> RawConfig {
        RawConfig {
            mode: Some(
                match self.mode {
                    WhatAmI::Client => "client",
                    WhatAmI::Peer | WhatAmI::Router => "peer",
                }
                .to_string(),
            ),
            connect: RawEndpoints {
                endpoints: self.connect_endpoints.clone(),
            },
            listen: RawEndpoints {
                endpoints: self.listen_endpoints.clone(),
            },
            scouting: RawScouting {
                multicast: RawMulticast {
                    enabled: Some(self.scouting.multicast_enabled),
                    address: Some(self.scouting.multicast_address.clone()),
                    interface: self.scouting.multicast_interface.clone(),
                },
                timeout: Some(humantime::format_duration(self.scouting.timeout).to_string()),
            },
            transport: RawTransport {
                link: RawLink {
                    tx: RawTx {
                        lease: Some(humantime::format_duration(self.transport.lease).to_string()),
                        keep_alive: Some(
                            humantime::format_duration(self.transport.keep_alive).to_string(),
                        ),
                    },
                    rx: RawRx {
                        buffer_size: Some(self.transport.rx_buffer_size),
                    },
                },
            },
            tls: RawTls {
                root_ca_certificate: self.tls.root_ca_certificate.clone(),
                root_ca_certificate_base64: self.tls.root_ca_certificate_base64.clone(),
                listen_private_key: self.tls.listen_private_key.clone(),
                listen_private_key_base64: self.tls.listen_private_key_base64.clone(),
                listen_certificate: self.tls.listen_certificate.clone(),
                listen_certificate_base64: self.tls.listen_certificate_base64.clone(),
                connect_private_key: self.tls.connect_private_key.clone(),
                connect_private_key_base64: self.tls.connect_private_key_base64.clone(),
                connect_certificate: self.tls.connect_certificate.clone(),
                connect_certificate_base64: self.tls.connect_certificate_base64.clone(),
                enable_mtls: Some(self.tls.enable_mtls),
                verify_name_on_connect: Some(self.tls.verify_name_on_connect),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawEndpoints {
    endpoints: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawMulticast {
    enabled: Option<bool>,
    address: Option<String>,
    interface: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawScouting {
    multicast: RawMulticast,
    timeout: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawTx {
    lease: Option<String>,
    keep_alive: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawRx {
    buffer_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawLink {
    tx: RawTx,
    rx: RawRx,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawTransport {
    link: RawLink,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawTls {
    root_ca_certificate: Option<String>,
    root_ca_certificate_base64: Option<String>,
    listen_private_key: Option<String>,
    listen_private_key_base64: Option<String>,
    listen_certificate: Option<String>,
    listen_certificate_base64: Option<String>,
    connect_private_key: Option<String>,
    connect_private_key_base64: Option<String>,
    connect_certificate: Option<String>,
    connect_certificate_base64: Option<String>,
    enable_mtls: Option<bool>,
    verify_name_on_connect: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawConfig {
    mode: Option<String>,
    connect: RawEndpoints,
    listen: RawEndpoints,
    scouting: RawScouting,
    transport: RawTransport,
    tls: RawTls,
}

impl TryFrom<RawConfig> for Config {
    type Error = zenoh_core::Error;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let mut cfg = Config::default();
        if let Some(mode) = raw.mode {
            cfg.mode = parse_mode(&mode)?;
        }
        cfg.connect_endpoints = raw.connect.endpoints;
        cfg.listen_endpoints = raw.listen.endpoints;

        if let Some(enabled) = raw.scouting.multicast.enabled {
            cfg.scouting.multicast_enabled = enabled;
        }
        if let Some(address) = raw.scouting.multicast.address {
            cfg.scouting.multicast_address = address;
        }
        cfg.scouting.multicast_interface = raw.scouting.multicast.interface;
        if let Some(timeout) = raw.scouting.timeout {
            cfg.scouting.timeout = zenoh_util::parse_duration(&timeout)?;
        }

        if let Some(lease) = raw.transport.link.tx.lease {
            cfg.transport.lease = zenoh_util::parse_duration(&lease)?;
        }
        if let Some(keep_alive) = raw.transport.link.tx.keep_alive {
            cfg.transport.keep_alive = zenoh_util::parse_duration(&keep_alive)?;
        }
        if let Some(buffer_size) = raw.transport.link.rx.buffer_size {
            cfg.transport.rx_buffer_size = buffer_size;
        }

        cfg.tls.root_ca_certificate = raw.tls.root_ca_certificate;
        cfg.tls.root_ca_certificate_base64 = raw.tls.root_ca_certificate_base64;
        cfg.tls.listen_private_key = raw.tls.listen_private_key;
        cfg.tls.listen_private_key_base64 = raw.tls.listen_private_key_base64;
        cfg.tls.listen_certificate = raw.tls.listen_certificate;
        cfg.tls.listen_certificate_base64 = raw.tls.listen_certificate_base64;
        cfg.tls.connect_private_key = raw.tls.connect_private_key;
        cfg.tls.connect_private_key_base64 = raw.tls.connect_private_key_base64;
        cfg.tls.connect_certificate = raw.tls.connect_certificate;
        cfg.tls.connect_certificate_base64 = raw.tls.connect_certificate_base64;
        cfg.tls.enable_mtls = raw.tls.enable_mtls.unwrap_or(false);
        cfg.tls.verify_name_on_connect = raw.tls.verify_name_on_connect.unwrap_or(false);

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_client_mode() {
        let cfg = Config::default();
        assert_eq!(cfg.mode, WhatAmI::Client);
        assert!(cfg.connect_endpoints.is_empty());
    }

    #[test]
    fn from_properties_overlays_recognized_keys() {
        let mut props = Properties::new();
        props.insert(keys::MODE, "peer");
        props.insert_list(
            keys::CONNECT_ENDPOINT,
            &["tcp/127.0.0.1:7447".to_string(), "tcp/127.0.0.1:7448".to_string()],
        );
        props.insert(keys::TRANSPORT_LINK_TX_LEASE, "5s");
        let cfg = Config::from_properties(&props).unwrap();
        assert_eq!(cfg.mode, WhatAmI::Peer);
        assert_eq!(cfg.connect_endpoints.len(), 2);
        assert_eq!(cfg.transport.lease, Duration::from_secs(5));
    }

    #[test]
    fn rejects_router_mode() {
        let mut props = Properties::new();
        props.insert(keys::MODE, "router");
        assert!(Config::from_properties(&props).is_err());
    }

    #[test]
    fn from_json5_parses_nested_document() {
        let doc = r#"{
            mode: "peer",
            connect: { endpoints: ["tcp/10.0.0.1:7447"] },
            scouting: { multicast: { enabled: false }, timeout: "1500ms" },
            transport: { link: { tx: { lease: "20s" }, rx: { buffer_size: 8192 } } },
        }"#;
        let cfg = Config::from_json5(doc).unwrap();
        assert_eq!(cfg.mode, WhatAmI::Peer);
        assert_eq!(cfg.connect_endpoints, vec!["tcp/10.0.0.1:7447".to_string()]);
        assert!(!cfg.scouting.multicast_enabled);
        assert_eq!(cfg.scouting.timeout, Duration::from_millis(1500));
        assert_eq!(cfg.transport.lease, Duration::from_secs(20));
        assert_eq!(cfg.transport.rx_buffer_size, 8192);
    }

    #[test]
    fn to_json5_round_trips_through_from_json5() {
        let mut cfg = Config::default();
        cfg.mode = WhatAmI::Peer;
        cfg.connect_endpoints = vec!["tcp/127.0.0.1:7447".to_string()];
        let doc = cfg.to_json5().unwrap();
        let cfg2 = Config::from_json5(&doc).unwrap();
        assert_eq!(cfg, cfg2);
    }

    #[test]
    fn to_properties_round_trips_through_from_properties() {
        let cfg = Config::default();
        let props = cfg.to_properties();
        let cfg2 = Config::from_properties(&props).unwrap();
        assert_eq!(cfg.mode, cfg2.mode);
        assert_eq!(cfg.transport, cfg2.transport);
    }
}
