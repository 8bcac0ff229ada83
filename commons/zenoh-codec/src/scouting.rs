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
//! Encode/decode of SCOUT/HELLO (spec.md §4.8). Framed as plain datagrams,
//! no length prefix: a scout socket is always a datagram (UDP multicast)
//! link, never streamed.

use crate::zint::{read_zsize, write_zint};
use crate::ZResult;
use zenoh_buffers::{Reader, Writer};
use zenoh_protocol::core::{WhatAmI, ZErrorKind, ZenohId};
use zenoh_protocol::scouting::{Hello, Scout};

const ID_SCOUT: u8 = 0x01;
const ID_HELLO: u8 = 0x02;

fn write_zid<W: Writer>(writer: &mut W, zid: &ZenohId) -> bool {
    writer.write_u8(zid.size() as u8) && writer.write_bytes(zid.as_bytes())
}

fn read_zid<R: Reader>(reader: &mut R) -> ZResult<ZenohId> {
    let len = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)? as usize;
    let bytes = reader.read_bytes(len).ok_or(ZErrorKind::NotEnoughBytes)?;
    ZenohId::from_slice(&bytes).map_err(|_| ZErrorKind::MessageDeserialization)
}

pub fn write_scout<W: Writer>(writer: &mut W, scout: &Scout) -> bool {
    writer.write_u8(ID_SCOUT) && writer.write_u8(scout.version) && writer.write_u8(scout.what)
}

pub fn read_scout<R: Reader>(reader: &mut R) -> ZResult<Scout> {
    let id = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    if id != ID_SCOUT {
        return Err(ZErrorKind::MessageDeserialization);
    }
    let version = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let what = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    Ok(Scout { version, what })
}

pub fn write_hello<W: Writer>(writer: &mut W, hello: &Hello) -> bool {
    writer.write_u8(ID_HELLO)
        && writer.write_u8(hello.version)
        && writer.write_u8(hello.whatami.to_bits())
        && write_zid(writer, &hello.zid)
        && write_zint(writer, hello.locators.len() as u64)
        && hello.locators.iter().all(|l| {
            write_zint(writer, l.len() as u64) && writer.write_bytes(l.as_bytes())
        })
}

pub fn read_hello<R: Reader>(reader: &mut R) -> ZResult<Hello> {
    let id = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    if id != ID_HELLO {
        return Err(ZErrorKind::MessageDeserialization);
    }
    let version = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let whatami_byte = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let whatami = WhatAmI::from_bits(whatami_byte).ok_or(ZErrorKind::MessageDeserialization)?;
    let zid = read_zid(reader)?;
    let count = read_zsize(reader)?;
    let mut locators = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_zsize(reader)?;
        let bytes = reader.read_bytes(len).ok_or(ZErrorKind::NotEnoughBytes)?;
        locators.push(String::from_utf8(bytes).map_err(|_| ZErrorKind::MessageDeserialization)?);
    }
    Ok(Hello {
        version,
        whatami,
        zid,
        locators,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scout_roundtrips() {
        let scout = Scout {
            version: zenoh_protocol::transport::ZENOH_PROTO_VERSION,
            what: zenoh_protocol::core::WHATAMI_PEER | zenoh_protocol::core::WHATAMI_ROUTER,
        };
        let mut buf = Vec::new();
        assert!(write_scout(&mut buf, &scout));
        let mut slice = buf.as_slice();
        assert_eq!(read_scout(&mut slice).unwrap(), scout);
    }

    #[test]
    fn hello_roundtrips_with_locators() {
        let hello = Hello {
            version: zenoh_protocol::transport::ZENOH_PROTO_VERSION,
            whatami: WhatAmI::Peer,
            zid: ZenohId::rand(),
            locators: vec!["tcp/127.0.0.1:7447".to_string(), "udp/127.0.0.1:7447".to_string()],
        };
        let mut buf = Vec::new();
        assert!(write_hello(&mut buf, &hello));
        let mut slice = buf.as_slice();
        assert_eq!(read_hello(&mut slice).unwrap(), hello);
        assert!(slice.is_empty());
    }

    #[test]
    fn read_scout_rejects_wrong_id() {
        let mut buf = Vec::new();
        buf.push(ID_HELLO);
        let mut slice = buf.as_slice();
        assert!(read_scout(&mut slice).is_err());
    }
}
