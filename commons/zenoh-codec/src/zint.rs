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
//! The zenoh variable-length integer: 1 to 9 bytes, 7 continuation bits per
//! byte (MSB set means "more bytes follow"), except the 9th byte, which
//! carries the remaining 8 bits of a `u64` with no continuation bit at all.
//! Ported field-for-field from `_z_zint64_encode`/`_z_zint64_decode` in
//! `examples/original_source/src/protocol/codec.c`.

use crate::ZResult;
use zenoh_buffers::{Reader, Writer};
use zenoh_protocol::core::{ZInt, ZErrorKind};

/// Number of bytes `_z_zint_len` would report for encoding `v`.
pub fn zint_len(v: ZInt) -> usize {
    let mut len = 1;
    let mut lv = v;
    while lv > 0x7f && len < 9 {
        lv >>= 7;
        len += 1;
    }
    len
}

pub fn write_zint<W: Writer>(writer: &mut W, v: ZInt) -> bool {
    let mut lv = v;
    let mut len = 1;
    while (lv & !0x7f) != 0 && len < 9 {
        if !writer.write_u8(((lv & 0x7f) | 0x80) as u8) {
            return false;
        }
        lv >>= 7;
        len += 1;
    }
    // The 9th byte, if reached, carries the rest of the value unmasked and
    // without a continuation bit — matching the C encoder's behavior of
    // never setting the continuation bit on the final byte of a max-length
    // encoding.
    writer.write_u8(lv as u8)
}

pub fn read_zint<R: Reader>(reader: &mut R) -> ZResult<ZInt> {
    let mut v: ZInt = 0;
    let mut i = 0u32;
    loop {
        let b = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
        if (b & 0x80) != 0 && i != 7 * 8 {
            v |= ((b & 0x7f) as ZInt) << i;
            i += 7;
        } else {
            v |= (b as ZInt) << i;
            break;
        }
    }
    Ok(v)
}

pub fn read_zint16<R: Reader>(reader: &mut R) -> ZResult<u16> {
    let v = read_zint(reader)?;
    u16::try_from(v).map_err(|_| ZErrorKind::MessageDeserialization)
}

pub fn read_zint32<R: Reader>(reader: &mut R) -> ZResult<u32> {
    let v = read_zint(reader)?;
    u32::try_from(v).map_err(|_| ZErrorKind::MessageDeserialization)
}

pub fn read_zsize<R: Reader>(reader: &mut R) -> ZResult<usize> {
    let v = read_zint(reader)?;
    usize::try_from(v).map_err(|_| ZErrorKind::MessageDeserialization)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: ZInt) {
        let mut buf = Vec::new();
        assert!(write_zint(&mut buf, v));
        assert_eq!(buf.len(), zint_len(v));
        let mut slice = buf.as_slice();
        assert_eq!(read_zint(&mut slice).unwrap(), v);
        assert!(slice.is_empty());
    }

    #[test]
    fn roundtrips_boundary_values() {
        for v in [
            0,
            1,
            0x7f,
            0x80,
            0x3fff,
            0x4000,
            u32::MAX as ZInt,
            ZInt::MAX,
        ] {
            roundtrip(v);
        }
    }

    #[test]
    fn single_byte_below_0x80() {
        let mut buf = Vec::new();
        write_zint(&mut buf, 42);
        assert_eq!(buf, vec![42]);
    }

    #[test]
    fn two_bytes_at_0x80() {
        let mut buf = Vec::new();
        write_zint(&mut buf, 0x80);
        assert_eq!(buf, vec![0x80, 0x01]);
    }

    #[test]
    fn nine_byte_max_value_has_no_continuation_on_last_byte() {
        let mut buf = Vec::new();
        write_zint(&mut buf, ZInt::MAX);
        assert_eq!(buf.len(), 9);
        assert_eq!(buf[8], 0xff);
    }

    #[test]
    fn truncated_input_is_not_enough_bytes() {
        let mut slice: &[u8] = &[0x80];
        assert_eq!(read_zint(&mut slice), Err(ZErrorKind::NotEnoughBytes));
    }
}
