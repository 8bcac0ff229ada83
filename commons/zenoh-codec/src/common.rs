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
//! Codecs for the small shared types: length-prefixed slices and strings,
//! `Encoding`, `Timestamp` and `ZenohId`. Slice/string framing (a `zsize`
//! length prefix, no terminator on the wire) and the `Encoding` suffix flag
//! follow `_z_bytes_encode`/`_z_str_encode`/`_z_encoding_encode` in
//! `examples/original_source/src/protocol/codec.c`.

use crate::zint::{read_zint, read_zsize, write_zint};
use crate::ZResult;
use zenoh_buffers::{Reader, Writer};
use zenoh_protocol::core::{Encoding, ZErrorKind, ZenohId};

pub fn write_bytes<W: Writer>(writer: &mut W, bytes: &[u8]) -> bool {
    write_zint(writer, bytes.len() as u64) && writer.write_bytes(bytes)
}

pub fn read_bytes<R: Reader>(reader: &mut R) -> ZResult<Vec<u8>> {
    let len = read_zsize(reader)?;
    reader.read_bytes(len).ok_or(ZErrorKind::NotEnoughBytes)
}

pub fn write_str<W: Writer>(writer: &mut W, s: &str) -> bool {
    write_bytes(writer, s.as_bytes())
}

pub fn read_str<R: Reader>(reader: &mut R) -> ZResult<String> {
    let bytes = read_bytes(reader)?;
    String::from_utf8(bytes).map_err(|_| ZErrorKind::MessageDeserialization)
}

/// `id = (prefix << 1) | has_schema`, zint-encoded, followed by the schema
/// bytes (length-prefixed) only if the low bit was set.
pub fn write_encoding<W: Writer>(writer: &mut W, encoding: &Encoding) -> bool {
    let has_schema = encoding.schema.is_some();
    let flagged = (encoding.id << 1) | (has_schema as u64);
    if !write_zint(writer, flagged) {
        return false;
    }
    match &encoding.schema {
        Some(schema) => write_bytes(writer, schema),
        None => true,
    }
}

pub fn read_encoding<R: Reader>(reader: &mut R) -> ZResult<Encoding> {
    let flagged = read_zint(reader)?;
    let has_schema = (flagged & 0x01) != 0;
    let id = flagged >> 1;
    let schema = if has_schema {
        Some(read_bytes(reader)?)
    } else {
        None
    };
    Ok(Encoding { id, schema })
}

pub fn write_zenoh_id<W: Writer>(writer: &mut W, zid: &ZenohId) -> bool {
    // the length nibble itself travels in the INIT/OPEN header (spec §4.2);
    // here we just write the raw id bytes.
    writer.write_bytes(zid.as_bytes())
}

pub fn read_zenoh_id<R: Reader>(reader: &mut R, len: usize) -> ZResult<ZenohId> {
    let bytes = reader.read_bytes(len).ok_or(ZErrorKind::NotEnoughBytes)?;
    ZenohId::from_slice(&bytes).map_err(|_| ZErrorKind::MessageDeserialization)
}

pub fn write_timestamp<W: Writer>(writer: &mut W, ts: &uhlc::Timestamp) -> bool {
    let time = ts.get_time().as_u64();
    let id = ts.get_id().to_le_bytes();
    write_zint(writer, time) && writer.write_u8(id.len() as u8) && writer.write_bytes(&id)
}

pub fn read_timestamp<R: Reader>(reader: &mut R) -> ZResult<uhlc::Timestamp> {
    let time = read_zint(reader)?;
    let id_len = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)? as usize;
    let id_bytes = reader.read_bytes(id_len).ok_or(ZErrorKind::NotEnoughBytes)?;
    let id = uhlc::ID::try_from(id_bytes.as_slice()).map_err(|_| ZErrorKind::MessageDeserialization)?;
    Ok(uhlc::Timestamp::new(uhlc::NTP64(time), id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrips_without_a_wire_terminator() {
        let mut buf = Vec::new();
        assert!(write_str(&mut buf, "hello"));
        // zsize(5) + 5 bytes, no trailing nul
        assert_eq!(buf.len(), 1 + 5);
        let mut slice = buf.as_slice();
        assert_eq!(read_str(&mut slice).unwrap(), "hello");
    }

    #[test]
    fn encoding_without_schema_has_low_bit_clear() {
        let mut buf = Vec::new();
        write_encoding(&mut buf, &Encoding::new(3));
        assert_eq!(buf[0], 3 << 1);
        let mut slice = buf.as_slice();
        let decoded = read_encoding(&mut slice).unwrap();
        assert_eq!(decoded, Encoding::new(3));
    }

    #[test]
    fn encoding_with_schema_roundtrips() {
        let mut buf = Vec::new();
        let enc = Encoding::with_schema(9, b"csv".to_vec());
        write_encoding(&mut buf, &enc);
        let mut slice = buf.as_slice();
        assert_eq!(read_encoding(&mut slice).unwrap(), enc);
    }
}
