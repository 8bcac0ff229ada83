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
//! `<proto>/<address>[:<port>][#key=value[;key=value…]]` (spec.md §6): the
//! only shape the core understands of a link address. Everything past the
//! protocol tag and address is opaque to us — concrete link drivers (not in
//! scope here) are the only code that interprets the metadata pairs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use zenoh_core::Error as ZError;

const METADATA_SEP: char = '#';
const METADATA_PAIR_SEP: char = ';';
const METADATA_KV_SEP: char = '=';
const PROTO_SEP: char = '/';

/// A parsed link address: `tcp/127.0.0.1:7447`, `udp/224.0.0.224:7446#iface=eth0`.
///
/// Locators compare and hash by their canonical string form, so two locators
/// built from differently-ordered metadata pairs are equal iff every pair
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    protocol: String,
    address: String,
    metadata: BTreeMap<String, String>,
}

impl Locator {
    pub fn new(
        protocol: impl Into<String>,
        address: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            address: address.into(),
            metadata,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

impl FromStr for Locator {
    type Err = ZError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, metadata) = match s.split_once(METADATA_SEP) {
            Some((head, tail)) => (head, parse_metadata(tail)?),
            None => (s, BTreeMap::new()),
        };
        let (protocol, address) = head.split_once(PROTO_SEP).ok_or_else(|| {
            ZError::msg(format!("locator '{}' is missing a '/proto' prefix", s))
        })?;
        if protocol.is_empty() || address.is_empty() {
            return Err(ZError::msg(format!(
                "locator '{}' has an empty protocol or address",
                s
            )));
        }
        Ok(Self {
            protocol: protocol.to_string(),
            address: address.to_string(),
            metadata,
        })
    }
}

fn parse_metadata(tail: &str) -> Result<BTreeMap<String, String>, ZError> {
    let mut metadata = BTreeMap::new();
    if tail.is_empty() {
        return Ok(metadata);
    }
    for pair in tail.split(METADATA_PAIR_SEP) {
        let (k, v) = pair.split_once(METADATA_KV_SEP).ok_or_else(|| {
            ZError::msg(format!("malformed locator metadata pair '{}'", pair))
        })?;
        metadata.insert(k.to_string(), v.to_string());
    }
    Ok(metadata)
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.protocol, PROTO_SEP, self.address)?;
        if !self.metadata.is_empty() {
            write!(f, "{}", METADATA_SEP)?;
            for (i, (k, v)) in self.metadata.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", METADATA_PAIR_SEP)?;
                }
                write!(f, "{}{}{}", k, METADATA_KV_SEP, v)?;
            }
        }
        Ok(())
    }
}

/// An endpoint is the address a `listen`/`connect` call is given; the core
/// never distinguishes it from the locator a link eventually reports as its
/// own address, so the two share a representation.
pub type EndPoint = Locator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_proto_and_address() {
        let loc: Locator = "tcp/127.0.0.1:7447".parse().unwrap();
        assert_eq!(loc.protocol(), "tcp");
        assert_eq!(loc.address(), "127.0.0.1:7447");
        assert!(loc.metadata().is_empty());
    }

    #[test]
    fn parses_metadata_pairs() {
        let loc: Locator = "udp/224.0.0.224:7446#iface=eth0;ttl=1".parse().unwrap();
        assert_eq!(loc.address(), "224.0.0.224:7446");
        assert_eq!(loc.metadata().get("iface").map(String::as_str), Some("eth0"));
        assert_eq!(loc.metadata().get("ttl").map(String::as_str), Some("1"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let original = "tls/example.org:7447#verify=true";
        let loc: Locator = original.parse().unwrap();
        let reparsed: Locator = loc.to_string().parse().unwrap();
        assert_eq!(loc, reparsed);
    }

    #[test]
    fn rejects_missing_proto_separator() {
        assert!("127.0.0.1:7447".parse::<Locator>().is_err());
    }

    #[test]
    fn rejects_malformed_metadata() {
        assert!("tcp/127.0.0.1:7447#noequals".parse::<Locator>().is_err());
    }
}
