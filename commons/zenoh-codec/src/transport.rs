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
//! Encode/decode of the transport-layer messages of spec.md §4.2/§4.5/§4.6:
//! INIT/OPEN handshake, JOIN, CLOSE, KEEP_ALIVE and the FRAME envelope (which
//! also carries FRAGMENT payloads, distinguished by a header flag rather than
//! a separate MID, the way `Frame`/`FramePayload` are modeled as one Rust
//! type in `zenoh-protocol::transport`).

use crate::network::{read_network_message, write_network_message};
use crate::zint::{read_zint, read_zint16, read_zsize, write_zint};
use crate::ZResult;
use zenoh_buffers::{Reader, Writer};
use zenoh_protocol::core::{Priority, Reliability, WhatAmI, ZErrorKind, ZenohId};
use zenoh_protocol::transport::{
    Close, CloseReason, Cookie, Frame, FramePayload, InitAck, InitSyn, Join, KeepAlive, OpenAck,
    OpenSyn, Resolution, TransportBody, TransportMessage, ZENOH_PROTO_VERSION,
};

const ID_INIT: u8 = 0x01;
const ID_OPEN: u8 = 0x02;
const ID_JOIN: u8 = 0x03;
const ID_CLOSE: u8 = 0x04;
const ID_KEEP_ALIVE: u8 = 0x05;
const ID_FRAME: u8 = 0x06;

const FLAG_ACK: u8 = 1 << 5;
const FLAG_QOS: u8 = 1 << 6;

const FLAG_CLOSE_ZID: u8 = 1 << 5;
const FLAG_CLOSE_LINK_ONLY: u8 = 1 << 6;

const FLAG_FRAME_RELIABLE: u8 = 1 << 5;
const FLAG_FRAME_FRAGMENT: u8 = 1 << 6;
const FLAG_FRAME_MORE: u8 = 1 << 7;

fn write_zid<W: Writer>(writer: &mut W, zid: &ZenohId) -> bool {
    writer.write_u8(zid.size() as u8) && writer.write_bytes(zid.as_bytes())
}

fn read_zid<R: Reader>(reader: &mut R) -> ZResult<ZenohId> {
    let len = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)? as usize;
    let bytes = reader.read_bytes(len).ok_or(ZErrorKind::NotEnoughBytes)?;
    ZenohId::from_slice(&bytes).map_err(|_| ZErrorKind::MessageDeserialization)
}

fn whatami_to_byte(w: WhatAmI) -> u8 {
    w.to_bits()
}

fn whatami_from_byte(b: u8) -> ZResult<WhatAmI> {
    WhatAmI::from_bits(b).ok_or(ZErrorKind::MessageDeserialization)
}

fn write_resolution<W: Writer>(writer: &mut W, r: &Resolution) -> bool {
    writer.write_u8(r.seq_num_bits) && writer.write_u8(r.req_id_bits)
}

fn read_resolution<R: Reader>(reader: &mut R) -> ZResult<Resolution> {
    let seq_num_bits = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let req_id_bits = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    Ok(Resolution {
        seq_num_bits,
        req_id_bits,
    })
}

fn write_init_syn<W: Writer>(writer: &mut W, syn: &InitSyn) -> bool {
    writer.write_u8(syn.version)
        && writer.write_u8(whatami_to_byte(syn.whatami))
        && write_zid(writer, &syn.zid)
        && write_resolution(writer, &syn.resolution)
        && write_zint(writer, syn.batch_size as u64)
}

fn read_init_syn<R: Reader>(reader: &mut R, qos: bool) -> ZResult<InitSyn> {
    let version = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let whatami = whatami_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let zid = read_zid(reader)?;
    let resolution = read_resolution(reader)?;
    let batch_size = read_zint16(reader)?;
    Ok(InitSyn {
        version,
        whatami,
        zid,
        resolution,
        batch_size,
        qos,
    })
}

fn write_init_ack<W: Writer>(writer: &mut W, ack: &InitAck) -> bool {
    writer.write_u8(ack.version)
        && writer.write_u8(whatami_to_byte(ack.whatami))
        && write_zid(writer, &ack.zid)
        && write_resolution(writer, &ack.resolution)
        && write_zint(writer, ack.batch_size as u64)
        && write_zint(writer, ack.cookie.0.len() as u64)
        && writer.write_bytes(&ack.cookie.0)
}

fn read_init_ack<R: Reader>(reader: &mut R, qos: bool) -> ZResult<InitAck> {
    let version = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let whatami = whatami_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let zid = read_zid(reader)?;
    let resolution = read_resolution(reader)?;
    let batch_size = read_zint16(reader)?;
    let cookie_len = read_zsize(reader)?;
    let cookie = reader
        .read_bytes(cookie_len)
        .ok_or(ZErrorKind::NotEnoughBytes)?;
    Ok(InitAck {
        version,
        whatami,
        zid,
        resolution,
        batch_size,
        qos,
        cookie: Cookie(cookie),
    })
}

fn write_open_syn<W: Writer>(writer: &mut W, syn: &OpenSyn) -> bool {
    write_zint(writer, syn.lease)
        && write_zint(writer, syn.initial_sn)
        && write_zint(writer, syn.cookie.0.len() as u64)
        && writer.write_bytes(&syn.cookie.0)
}

fn read_open_syn<R: Reader>(reader: &mut R) -> ZResult<OpenSyn> {
    let lease = read_zint(reader)?;
    let initial_sn = read_zint(reader)?;
    let cookie_len = read_zsize(reader)?;
    let cookie = reader
        .read_bytes(cookie_len)
        .ok_or(ZErrorKind::NotEnoughBytes)?;
    Ok(OpenSyn {
        lease,
        initial_sn,
        cookie: Cookie(cookie),
    })
}

fn write_open_ack<W: Writer>(writer: &mut W, ack: &OpenAck) -> bool {
    write_zint(writer, ack.lease) && write_zint(writer, ack.initial_sn)
}

fn read_open_ack<R: Reader>(reader: &mut R) -> ZResult<OpenAck> {
    Ok(OpenAck {
        lease: read_zint(reader)?,
        initial_sn: read_zint(reader)?,
    })
}

fn write_join<W: Writer>(writer: &mut W, join: &Join) -> bool {
    writer.write_u8(join.version)
        && writer.write_u8(whatami_to_byte(join.whatami))
        && write_zid(writer, &join.zid)
        && write_resolution(writer, &join.resolution)
        && write_zint(writer, join.batch_size as u64)
        && write_zint(writer, join.lease)
        && write_zint(writer, join.next_sn.0)
        && write_zint(writer, join.next_sn.1)
}

fn read_join<R: Reader>(reader: &mut R, qos: bool) -> ZResult<Join> {
    let version = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let whatami = whatami_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let zid = read_zid(reader)?;
    let resolution = read_resolution(reader)?;
    let batch_size = read_zint16(reader)?;
    let lease = read_zint(reader)?;
    let next_sn_reliable = read_zint(reader)?;
    let next_sn_best_effort = read_zint(reader)?;
    Ok(Join {
        version,
        whatami,
        zid,
        resolution,
        batch_size,
        lease,
        next_sn: (next_sn_reliable, next_sn_best_effort),
        qos,
    })
}

fn close_reason_to_byte(r: CloseReason) -> u8 {
    match r {
        CloseReason::Generic => 0,
        CloseReason::Unsupported => 1,
        CloseReason::Invalid => 2,
        CloseReason::MaxTransports => 3,
        CloseReason::MaxSessions => 4,
        CloseReason::MaxLinks => 5,
        CloseReason::Expired => 6,
    }
}

fn close_reason_from_byte(b: u8) -> ZResult<CloseReason> {
    match b {
        0 => Ok(CloseReason::Generic),
        1 => Ok(CloseReason::Unsupported),
        2 => Ok(CloseReason::Invalid),
        3 => Ok(CloseReason::MaxTransports),
        4 => Ok(CloseReason::MaxSessions),
        5 => Ok(CloseReason::MaxLinks),
        6 => Ok(CloseReason::Expired),
        _ => Err(ZErrorKind::MessageDeserialization),
    }
}

fn write_close<W: Writer>(writer: &mut W, close: &Close) -> bool {
    writer.write_u8(close_reason_to_byte(close.reason))
        && match &close.zid {
            Some(zid) => write_zid(writer, zid),
            None => true,
        }
}

fn read_close<R: Reader>(reader: &mut R, flags: u8) -> ZResult<Close> {
    let reason = close_reason_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let zid = if flags & FLAG_CLOSE_ZID != 0 {
        Some(read_zid(reader)?)
    } else {
        None
    };
    Ok(Close {
        zid,
        reason,
        link_only: flags & FLAG_CLOSE_LINK_ONLY != 0,
    })
}

fn priority_to_byte(p: Priority) -> u8 {
    p as u8
}

fn priority_from_byte(b: u8) -> ZResult<Priority> {
    match b {
        1 => Ok(Priority::RealTime),
        2 => Ok(Priority::InteractiveHigh),
        3 => Ok(Priority::InteractiveLow),
        4 => Ok(Priority::DataHigh),
        5 => Ok(Priority::Data),
        6 => Ok(Priority::DataLow),
        7 => Ok(Priority::Background),
        _ => Err(ZErrorKind::MessageDeserialization),
    }
}

fn write_frame<W: Writer>(writer: &mut W, frame: &Frame) -> bool {
    write_zint(writer, frame.sn)
        && writer.write_u8(priority_to_byte(frame.priority))
        && match &frame.payload {
            FramePayload::Messages { messages } => {
                write_zint(writer, messages.len() as u64)
                    && messages.iter().all(|m| write_network_message(writer, m))
            }
            FramePayload::Fragment { buffer, .. } => {
                write_zint(writer, buffer.len() as u64) && writer.write_bytes(buffer)
            }
        }
}

fn read_frame<R: Reader>(reader: &mut R, flags: u8) -> ZResult<Frame> {
    let sn = read_zint(reader)?;
    let priority = priority_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let reliability = if flags & FLAG_FRAME_RELIABLE != 0 {
        Reliability::Reliable
    } else {
        Reliability::BestEffort
    };
    let payload = if flags & FLAG_FRAME_FRAGMENT != 0 {
        let len = read_zsize(reader)?;
        let buffer = reader.read_bytes(len).ok_or(ZErrorKind::NotEnoughBytes)?;
        FramePayload::Fragment {
            buffer,
            is_final: flags & FLAG_FRAME_MORE == 0,
        }
    } else {
        let count = read_zsize(reader)?;
        let mut messages = Vec::with_capacity(count);
        for _ in 0..count {
            messages.push(read_network_message(reader)?);
        }
        FramePayload::Messages { messages }
    };
    Ok(Frame {
        reliability,
        priority,
        sn,
        payload,
    })
}

pub fn write_transport_message<W: Writer>(writer: &mut W, msg: &TransportMessage) -> bool {
    match &msg.body {
        TransportBody::InitSyn(s) => writer.write_u8(ID_INIT | if s.qos { FLAG_QOS } else { 0 }) && write_init_syn(writer, s),
        TransportBody::InitAck(a) => {
            writer.write_u8(ID_INIT | FLAG_ACK | if a.qos { FLAG_QOS } else { 0 }) && write_init_ack(writer, a)
        }
        TransportBody::OpenSyn(s) => writer.write_u8(ID_OPEN) && write_open_syn(writer, s),
        TransportBody::OpenAck(a) => writer.write_u8(ID_OPEN | FLAG_ACK) && write_open_ack(writer, a),
        TransportBody::Join(j) => {
            writer.write_u8(ID_JOIN | if j.qos { FLAG_QOS } else { 0 }) && write_join(writer, j)
        }
        TransportBody::Close(c) => {
            let flags = if c.zid.is_some() { FLAG_CLOSE_ZID } else { 0 }
                | if c.link_only { FLAG_CLOSE_LINK_ONLY } else { 0 };
            writer.write_u8(ID_CLOSE | flags) && write_close(writer, c)
        }
        TransportBody::KeepAlive(KeepAlive) => writer.write_u8(ID_KEEP_ALIVE),
        TransportBody::Frame(f) => {
            let is_fragment = matches!(f.payload, FramePayload::Fragment { .. });
            let more = matches!(&f.payload, FramePayload::Fragment { is_final, .. } if !is_final);
            let flags = if matches!(f.reliability, Reliability::Reliable) {
                FLAG_FRAME_RELIABLE
            } else {
                0
            } | if is_fragment { FLAG_FRAME_FRAGMENT } else { 0 }
                | if more { FLAG_FRAME_MORE } else { 0 };
            writer.write_u8(ID_FRAME | flags) && write_frame(writer, f)
        }
    }
}

pub fn read_transport_message<R: Reader>(reader: &mut R) -> ZResult<TransportMessage> {
    let header = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let id = header & 0x1f;
    let flags = header & !0x1f;
    let qos = flags & FLAG_QOS != 0;
    let body = match id {
        ID_INIT if flags & FLAG_ACK != 0 => TransportBody::InitAck(read_init_ack(reader, qos)?),
        ID_INIT => TransportBody::InitSyn(read_init_syn(reader, qos)?),
        ID_OPEN if flags & FLAG_ACK != 0 => TransportBody::OpenAck(read_open_ack(reader)?),
        ID_OPEN => TransportBody::OpenSyn(read_open_syn(reader)?),
        ID_JOIN => TransportBody::Join(read_join(reader, qos)?),
        ID_CLOSE => TransportBody::Close(read_close(reader, flags)?),
        ID_KEEP_ALIVE => TransportBody::KeepAlive(KeepAlive),
        ID_FRAME => TransportBody::Frame(read_frame(reader, flags)?),
        _ => return Err(ZErrorKind::MessageDeserialization),
    };
    Ok(TransportMessage { body })
}

/// Builds a default `InitSyn` carrying the current protocol version, used by
/// both the unicast client handshake and tests.
pub fn default_init_syn(whatami: WhatAmI, zid: ZenohId, resolution: Resolution, batch_size: u16, qos: bool) -> InitSyn {
    InitSyn {
        version: ZENOH_PROTO_VERSION,
        whatami,
        zid,
        resolution,
        batch_size,
        qos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenoh_protocol::core::Encoding;
    use zenoh_protocol::network::{NetworkBody, NetworkMessage, Push, PushKind};

    fn roundtrip(msg: TransportMessage) {
        let mut buf = Vec::new();
        assert!(write_transport_message(&mut buf, &msg));
        let mut slice = buf.as_slice();
        assert_eq!(read_transport_message(&mut slice).unwrap(), msg);
        assert!(slice.is_empty());
    }

    #[test]
    fn init_syn_ack_roundtrip() {
        let zid = ZenohId::rand();
        let syn = InitSyn {
            version: ZENOH_PROTO_VERSION,
            whatami: WhatAmI::Client,
            zid: zid.clone(),
            resolution: Resolution::default(),
            batch_size: 1500,
            qos: true,
        };
        roundtrip(TransportMessage {
            body: TransportBody::InitSyn(syn),
        });
        let ack = InitAck {
            version: ZENOH_PROTO_VERSION,
            whatami: WhatAmI::Peer,
            zid,
            resolution: Resolution::default(),
            batch_size: 1500,
            qos: false,
            cookie: Cookie(vec![1, 2, 3, 4]),
        };
        roundtrip(TransportMessage {
            body: TransportBody::InitAck(ack),
        });
    }

    #[test]
    fn open_syn_ack_roundtrip() {
        roundtrip(TransportMessage {
            body: TransportBody::OpenSyn(OpenSyn {
                lease: 10_000,
                initial_sn: 42,
                cookie: Cookie(vec![9, 9]),
            }),
        });
        roundtrip(TransportMessage {
            body: TransportBody::OpenAck(OpenAck {
                lease: 10_000,
                initial_sn: 7,
            }),
        });
    }

    #[test]
    fn keep_alive_has_no_body() {
        let mut buf = Vec::new();
        write_transport_message(&mut buf, &TransportMessage::keep_alive());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn close_roundtrips_with_and_without_zid() {
        roundtrip(TransportMessage::close(Some(ZenohId::rand()), CloseReason::Expired, false));
        roundtrip(TransportMessage::close(None, CloseReason::Generic, true));
    }

    #[test]
    fn join_roundtrips() {
        let join = Join {
            version: ZENOH_PROTO_VERSION,
            whatami: WhatAmI::Peer,
            zid: ZenohId::rand(),
            resolution: Resolution::default(),
            batch_size: 2048,
            lease: 5000,
            next_sn: (1, 1),
            qos: true,
        };
        roundtrip(TransportMessage {
            body: TransportBody::Join(join),
        });
    }

    #[test]
    fn frame_with_messages_roundtrips() {
        let push = NetworkMessage {
            body: NetworkBody::Push(Push {
                key_expr: "demo/ex/a".into(),
                kind: PushKind::Put,
                payload: vec![1, 2, 3, 4],
                encoding: Encoding::new(Encoding::APP_OCTET_STREAM),
                timestamp: None,
                congestion_control: Default::default(),
                priority: Default::default(),
                is_express: false,
                attachment: None,
            }),
        };
        let frame = Frame {
            reliability: Reliability::Reliable,
            priority: Priority::Data,
            sn: 1,
            payload: FramePayload::Messages {
                messages: vec![push],
            },
        };
        roundtrip(TransportMessage {
            body: TransportBody::Frame(frame),
        });
    }

    #[test]
    fn frame_with_fragment_roundtrips_more_flag() {
        let frame = Frame {
            reliability: Reliability::BestEffort,
            priority: Priority::Data,
            sn: 3,
            payload: FramePayload::Fragment {
                buffer: vec![0u8; 64],
                is_final: false,
            },
        };
        roundtrip(TransportMessage {
            body: TransportBody::Frame(frame),
        });
    }
}
