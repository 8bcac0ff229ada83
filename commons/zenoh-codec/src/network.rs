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
//! Encode/decode of the network-layer messages carried inside a `Frame`'s
//! `Messages` payload: one id byte (low 5 bits select the message, high 3
//! bits are per-message option flags) followed by the fields spec.md §4.4
//! lists for that message.

use crate::common::{
    read_bytes, read_encoding, read_str, read_timestamp, read_zenoh_id, write_bytes,
    write_encoding, write_str, write_timestamp, write_zenoh_id,
};
use crate::zint::{read_zint, write_zint};
use crate::ZResult;
use zenoh_buffers::{Reader, Writer};
use zenoh_protocol::core::{
    CongestionControl, ConsolidationMode, Encoding, Priority, QueryTarget, Reliability, SubMode,
    ZErrorKind,
};
use zenoh_protocol::network::{
    Declare, DeclareInterest, DeclareKeyExpr, DeclareQueryable, DeclareSubscriber, NetworkBody,
    NetworkMessage, Push, PushKind, Request, Response, ResponseFinal, Undeclare,
    UndeclareInterest, UndeclareKeyExpr, UndeclareQueryable, UndeclareSubscriber,
};

const ID_DECLARE: u8 = 0x01;
const ID_UNDECLARE: u8 = 0x02;
const ID_PUSH: u8 = 0x03;
const ID_REQUEST: u8 = 0x04;
const ID_RESPONSE: u8 = 0x05;
const ID_RESPONSE_FINAL: u8 = 0x06;

const DECL_KEY_EXPR: u8 = 0;
const DECL_SUBSCRIBER: u8 = 1;
const DECL_QUERYABLE: u8 = 2;
const DECL_INTEREST: u8 = 3;

const FLAG_PUT: u8 = 1 << 5;
const FLAG_TIMESTAMP: u8 = 1 << 6;
const FLAG_ATTACHMENT: u8 = 1 << 7;

const FLAG_SUB_RELIABLE: u8 = 1 << 5;
const FLAG_SUB_PULL: u8 = 1 << 6;

const FLAG_QUERYABLE_COMPLETE: u8 = 1 << 5;

const FLAG_INTEREST_SUBSCRIBERS: u8 = 1 << 5;
const FLAG_INTEREST_QUERYABLES: u8 = 1 << 6;

const FLAG_REQUEST_VALUE: u8 = 1 << 5;
const FLAG_REQUEST_ATTACHMENT: u8 = 1 << 6;

const FLAG_RESPONSE_TIMESTAMP: u8 = 1 << 5;
const FLAG_RESPONSE_ATTACHMENT: u8 = 1 << 6;

fn write_attachment<W: Writer>(writer: &mut W, attachment: &Option<Vec<u8>>) -> bool {
    match attachment {
        Some(a) => write_bytes(writer, a),
        None => true,
    }
}

fn read_attachment<R: Reader>(reader: &mut R, present: bool) -> ZResult<Option<Vec<u8>>> {
    if present {
        Ok(Some(read_bytes(reader)?))
    } else {
        Ok(None)
    }
}

fn reliability_to_bit(r: Reliability) -> bool {
    matches!(r, Reliability::Reliable)
}

fn reliability_from_bit(b: bool) -> Reliability {
    if b {
        Reliability::Reliable
    } else {
        Reliability::BestEffort
    }
}

fn sub_mode_to_bit(m: SubMode) -> bool {
    matches!(m, SubMode::Pull)
}

fn sub_mode_from_bit(b: bool) -> SubMode {
    if b {
        SubMode::Pull
    } else {
        SubMode::Push
    }
}

fn query_target_to_byte(t: QueryTarget) -> u8 {
    match t {
        QueryTarget::BestMatching => 0,
        QueryTarget::All => 1,
        QueryTarget::AllComplete => 2,
    }
}

fn query_target_from_byte(b: u8) -> ZResult<QueryTarget> {
    match b {
        0 => Ok(QueryTarget::BestMatching),
        1 => Ok(QueryTarget::All),
        2 => Ok(QueryTarget::AllComplete),
        _ => Err(ZErrorKind::MessageDeserialization),
    }
}

fn consolidation_to_byte(c: ConsolidationMode) -> u8 {
    match c {
        ConsolidationMode::None => 0,
        ConsolidationMode::Monotonic => 1,
        ConsolidationMode::Latest => 2,
        ConsolidationMode::Auto => 3,
    }
}

fn consolidation_from_byte(b: u8) -> ZResult<ConsolidationMode> {
    match b {
        0 => Ok(ConsolidationMode::None),
        1 => Ok(ConsolidationMode::Monotonic),
        2 => Ok(ConsolidationMode::Latest),
        3 => Ok(ConsolidationMode::Auto),
        _ => Err(ZErrorKind::MessageDeserialization),
    }
}

fn write_declare_body<W: Writer>(writer: &mut W, declare: &Declare) -> bool {
    match declare {
        Declare::KeyExpr(d) => {
            writer.write_u8(DECL_KEY_EXPR) && write_zint(writer, d.id) && write_str(writer, &d.key_expr)
        }
        Declare::Subscriber(d) => {
            let flags = if reliability_to_bit(d.reliability) {
                FLAG_SUB_RELIABLE
            } else {
                0
            } | if sub_mode_to_bit(d.mode) { FLAG_SUB_PULL } else { 0 };
            writer.write_u8(DECL_SUBSCRIBER | flags)
                && write_zint(writer, d.id)
                && write_str(writer, &d.key_expr)
        }
        Declare::Queryable(d) => {
            let flags = if d.complete { FLAG_QUERYABLE_COMPLETE } else { 0 };
            writer.write_u8(DECL_QUERYABLE | flags)
                && write_zint(writer, d.id)
                && write_str(writer, &d.key_expr)
                && write_zint(writer, d.distance)
        }
        Declare::Interest(d) => {
            let flags = if d.subscribers { FLAG_INTEREST_SUBSCRIBERS } else { 0 }
                | if d.queryables { FLAG_INTEREST_QUERYABLES } else { 0 };
            writer.write_u8(DECL_INTEREST | flags)
                && write_zint(writer, d.id)
                && write_str(writer, &d.key_expr)
        }
    }
}

fn read_declare_body<R: Reader>(reader: &mut R) -> ZResult<Declare> {
    let header = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let kind = header & 0x1f;
    let flags = header & !0x1f;
    match kind {
        DECL_KEY_EXPR => {
            let id = read_zint(reader)?;
            let key_expr = read_str(reader)?;
            Ok(Declare::KeyExpr(DeclareKeyExpr { id, key_expr }))
        }
        DECL_SUBSCRIBER => {
            let id = read_zint(reader)?;
            let key_expr = read_str(reader)?;
            Ok(Declare::Subscriber(DeclareSubscriber {
                id,
                key_expr,
                reliability: reliability_from_bit(flags & FLAG_SUB_RELIABLE != 0),
                mode: sub_mode_from_bit(flags & FLAG_SUB_PULL != 0),
            }))
        }
        DECL_QUERYABLE => {
            let id = read_zint(reader)?;
            let key_expr = read_str(reader)?;
            let distance = read_zint(reader)?;
            Ok(Declare::Queryable(DeclareQueryable {
                id,
                key_expr,
                complete: flags & FLAG_QUERYABLE_COMPLETE != 0,
                distance,
            }))
        }
        DECL_INTEREST => {
            let id = read_zint(reader)?;
            let key_expr = read_str(reader)?;
            Ok(Declare::Interest(DeclareInterest {
                id,
                key_expr,
                subscribers: flags & FLAG_INTEREST_SUBSCRIBERS != 0,
                queryables: flags & FLAG_INTEREST_QUERYABLES != 0,
            }))
        }
        _ => Err(ZErrorKind::MessageDeserialization),
    }
}

fn write_undeclare_body<W: Writer>(writer: &mut W, undeclare: &Undeclare) -> bool {
    let (kind, id) = match undeclare {
        Undeclare::KeyExpr(u) => (DECL_KEY_EXPR, u.id),
        Undeclare::Subscriber(u) => (DECL_SUBSCRIBER, u.id),
        Undeclare::Queryable(u) => (DECL_QUERYABLE, u.id),
        Undeclare::Interest(u) => (DECL_INTEREST, u.id),
    };
    writer.write_u8(kind) && write_zint(writer, id)
}

fn read_undeclare_body<R: Reader>(reader: &mut R) -> ZResult<Undeclare> {
    let kind = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)? & 0x1f;
    let id = read_zint(reader)?;
    match kind {
        DECL_KEY_EXPR => Ok(Undeclare::KeyExpr(UndeclareKeyExpr { id })),
        DECL_SUBSCRIBER => Ok(Undeclare::Subscriber(UndeclareSubscriber { id })),
        DECL_QUERYABLE => Ok(Undeclare::Queryable(UndeclareQueryable { id })),
        DECL_INTEREST => Ok(Undeclare::Interest(UndeclareInterest { id })),
        _ => Err(ZErrorKind::MessageDeserialization),
    }
}

pub fn write_network_message<W: Writer>(writer: &mut W, msg: &NetworkMessage) -> bool {
    match &msg.body {
        NetworkBody::Declare(d) => writer.write_u8(ID_DECLARE) && write_declare_body(writer, d),
        NetworkBody::Undeclare(u) => {
            writer.write_u8(ID_UNDECLARE) && write_undeclare_body(writer, u)
        }
        NetworkBody::Push(p) => write_push(writer, p),
        NetworkBody::Request(r) => write_request(writer, r),
        NetworkBody::Response(r) => write_response(writer, r),
        NetworkBody::ResponseFinal(r) => {
            writer.write_u8(ID_RESPONSE_FINAL) && write_zint(writer, r.request_id)
        }
    }
}

fn congestion_control_to_byte(c: CongestionControl) -> u8 {
    match c {
        CongestionControl::Drop => 0,
        CongestionControl::Block => 1,
    }
}

fn congestion_control_from_byte(b: u8) -> ZResult<CongestionControl> {
    match b {
        0 => Ok(CongestionControl::Drop),
        1 => Ok(CongestionControl::Block),
        _ => Err(ZErrorKind::MessageDeserialization),
    }
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

fn write_push<W: Writer>(writer: &mut W, p: &Push) -> bool {
    let flags = if matches!(p.kind, PushKind::Put) { FLAG_PUT } else { 0 }
        | if p.timestamp.is_some() { FLAG_TIMESTAMP } else { 0 }
        | if p.attachment.is_some() { FLAG_ATTACHMENT } else { 0 };
    writer.write_u8(ID_PUSH | flags)
        && write_str(writer, &p.key_expr)
        && writer.write_u8(congestion_control_to_byte(p.congestion_control))
        && writer.write_u8(priority_to_byte(p.priority))
        && writer.write_u8(p.is_express as u8)
        && (p.timestamp.as_ref().map_or(true, |ts| write_timestamp(writer, ts)))
        && write_attachment(writer, &p.attachment)
        && write_encoding(writer, &p.encoding)
        && write_bytes(writer, &p.payload)
}

fn read_push<R: Reader>(reader: &mut R, flags: u8) -> ZResult<Push> {
    let key_expr = read_str(reader)?;
    let congestion_control = congestion_control_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let priority = priority_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let is_express = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)? != 0;
    let timestamp = if flags & FLAG_TIMESTAMP != 0 {
        Some(read_timestamp(reader)?)
    } else {
        None
    };
    let attachment = read_attachment(reader, flags & FLAG_ATTACHMENT != 0)?;
    let encoding = read_encoding(reader)?;
    let payload = read_bytes(reader)?;
    Ok(Push {
        key_expr,
        kind: if flags & FLAG_PUT != 0 { PushKind::Put } else { PushKind::Delete },
        payload,
        encoding,
        timestamp,
        congestion_control,
        priority,
        is_express,
        attachment,
    })
}

fn write_request<W: Writer>(writer: &mut W, r: &Request) -> bool {
    let flags = if r.payload.is_some() { FLAG_REQUEST_VALUE } else { 0 }
        | if r.attachment.is_some() { FLAG_REQUEST_ATTACHMENT } else { 0 };
    writer.write_u8(ID_REQUEST | flags)
        && write_zint(writer, r.id)
        && write_str(writer, &r.key_expr)
        && write_str(writer, &r.parameters)
        && writer.write_u8(query_target_to_byte(r.target))
        && writer.write_u8(consolidation_to_byte(r.consolidation))
        && write_attachment(writer, &r.attachment)
        && match (&r.payload, &r.encoding) {
            (Some(payload), Some(encoding)) => {
                write_encoding(writer, encoding) && write_bytes(writer, payload)
            }
            _ => true,
        }
}

fn read_request<R: Reader>(reader: &mut R, flags: u8) -> ZResult<Request> {
    let id = read_zint(reader)?;
    let key_expr = read_str(reader)?;
    let parameters = read_str(reader)?;
    let target = query_target_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let consolidation = consolidation_from_byte(reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?)?;
    let attachment = read_attachment(reader, flags & FLAG_REQUEST_ATTACHMENT != 0)?;
    let (payload, encoding) = if flags & FLAG_REQUEST_VALUE != 0 {
        let encoding = read_encoding(reader)?;
        let payload = read_bytes(reader)?;
        (Some(payload), Some(encoding))
    } else {
        (None, None)
    };
    Ok(Request {
        id,
        key_expr,
        parameters,
        target,
        consolidation,
        payload,
        encoding,
        attachment,
    })
}

fn write_response<W: Writer>(writer: &mut W, r: &Response) -> bool {
    let flags = if r.timestamp.is_some() { FLAG_RESPONSE_TIMESTAMP } else { 0 }
        | if r.attachment.is_some() { FLAG_RESPONSE_ATTACHMENT } else { 0 };
    writer.write_u8(ID_RESPONSE | flags)
        && write_zint(writer, r.request_id)
        && write_str(writer, &r.key_expr)
        && (r.timestamp.as_ref().map_or(true, |ts| write_timestamp(writer, ts)))
        && write_attachment(writer, &r.attachment)
        && write_encoding(writer, &r.encoding)
        && write_bytes(writer, &r.payload)
}

fn read_response<R: Reader>(reader: &mut R, flags: u8) -> ZResult<Response> {
    let request_id = read_zint(reader)?;
    let key_expr = read_str(reader)?;
    let timestamp = if flags & FLAG_RESPONSE_TIMESTAMP != 0 {
        Some(read_timestamp(reader)?)
    } else {
        None
    };
    let attachment = read_attachment(reader, flags & FLAG_RESPONSE_ATTACHMENT != 0)?;
    let encoding = read_encoding(reader)?;
    let payload = read_bytes(reader)?;
    Ok(Response {
        request_id,
        key_expr,
        payload,
        encoding,
        timestamp,
        attachment,
    })
}

pub fn read_network_message<R: Reader>(reader: &mut R) -> ZResult<NetworkMessage> {
    let header = reader.read_u8().ok_or(ZErrorKind::NotEnoughBytes)?;
    let kind = header & 0x1f;
    let flags = header & !0x1f;
    let body = match kind {
        ID_DECLARE => NetworkBody::Declare(read_declare_body(reader)?),
        ID_UNDECLARE => NetworkBody::Undeclare(read_undeclare_body(reader)?),
        ID_PUSH => NetworkBody::Push(read_push(reader, flags)?),
        ID_REQUEST => NetworkBody::Request(read_request(reader, flags)?),
        ID_RESPONSE => NetworkBody::Response(read_response(reader, flags)?),
        ID_RESPONSE_FINAL => NetworkBody::ResponseFinal(ResponseFinal {
            request_id: read_zint(reader)?,
        }),
        _ => return Err(ZErrorKind::MessageDeserialization),
    };
    Ok(NetworkMessage { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenoh_protocol::core::ZenohId;
    use zenoh_protocol::network::NetworkBody;

    #[test]
    fn push_roundtrips_with_timestamp_and_attachment() {
        let id = ZenohId::rand();
        let ts = uhlc::Timestamp::new(uhlc::NTP64(42), uhlc::ID::try_from(id.as_bytes()).unwrap());
        let push = Push {
            key_expr: "demo/example".into(),
            kind: PushKind::Put,
            payload: vec![1, 2, 3],
            encoding: Encoding::new(Encoding::APP_OCTET_STREAM),
            timestamp: Some(ts),
            congestion_control: CongestionControl::Block,
            priority: Priority::DataHigh,
            is_express: true,
            attachment: Some(vec![9, 9]),
        };
        let msg: NetworkMessage = NetworkBody::Push(push.clone()).into();
        let mut buf = Vec::new();
        assert!(write_network_message(&mut buf, &msg));
        let mut slice = buf.as_slice();
        let decoded = read_network_message(&mut slice).unwrap();
        assert_eq!(decoded, msg);
        if let NetworkBody::Push(decoded_push) = decoded.body {
            assert_eq!(decoded_push, push);
        } else {
            panic!("expected Push");
        }
    }

    #[test]
    fn declare_subscriber_roundtrips() {
        let decl = Declare::Subscriber(DeclareSubscriber {
            id: 7,
            key_expr: "a/b/*".into(),
            reliability: Reliability::Reliable,
            mode: SubMode::Pull,
        });
        let msg: NetworkMessage = NetworkBody::Declare(decl).into();
        let mut buf = Vec::new();
        assert!(write_network_message(&mut buf, &msg));
        let mut slice = buf.as_slice();
        assert_eq!(read_network_message(&mut slice).unwrap(), msg);
    }

    #[test]
    fn request_without_value_roundtrips() {
        let req = Request {
            id: 1,
            key_expr: "a/b".into(),
            parameters: "".into(),
            target: QueryTarget::All,
            consolidation: ConsolidationMode::Latest,
            payload: None,
            encoding: None,
            attachment: None,
        };
        let msg: NetworkMessage = NetworkBody::Request(req.clone()).into();
        let mut buf = Vec::new();
        assert!(write_network_message(&mut buf, &msg));
        let mut slice = buf.as_slice();
        let decoded = read_network_message(&mut slice).unwrap();
        if let NetworkBody::Request(decoded_req) = decoded.body {
            assert_eq!(decoded_req, req);
        } else {
            panic!("expected Request");
        }
    }
}
