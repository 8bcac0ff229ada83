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
//! A payload paired with its [`Encoding`] (spec.md §3's Sample/Query/Reply
//! "payload, encoding" pair), independent of which message it eventually
//! rides inside.

use zenoh_protocol::core::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub payload: Vec<u8>,
    pub encoding: Encoding,
}

impl Value {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            encoding: Encoding::new(Encoding::APP_OCTET_STREAM),
        }
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self {
            payload: s.as_bytes().to_vec(),
            encoding: Encoding::new(Encoding::TEXT_PLAIN),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self {
            payload: s.into_bytes(),
            encoding: Encoding::new(Encoding::TEXT_PLAIN),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(payload: Vec<u8>) -> Self {
        Self {
            payload,
            encoding: Encoding::new(Encoding::APP_OCTET_STREAM),
        }
    }
}
