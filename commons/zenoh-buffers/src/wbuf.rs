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
use crate::{Writer, ZBuf};

/// A write buffer made of chained, fixed-size slices. Encoding a message
/// into a `WBuf` never needs to `memmove` already-written bytes to grow, the
/// way a single `Vec<u8>` would on reallocation; a new slice of
/// `expansion_step` bytes is appended instead.
#[derive(Debug, Clone)]
pub struct WBuf {
    slices: Vec<Vec<u8>>,
    expansion_step: usize,
    capacity: Option<usize>,
}

impl WBuf {
    /// `expansion_step` is the size of each newly appended slice once the
    /// current tail is full.
    pub fn new(expansion_step: usize, expandable: bool) -> Self {
        Self {
            slices: vec![Vec::with_capacity(expansion_step)],
            expansion_step,
            capacity: if expandable { None } else { Some(expansion_step) },
        }
    }

    pub fn len(&self) -> usize {
        self.slices.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn space_left(&self) -> Option<usize> {
        self.capacity.map(|cap| cap.saturating_sub(self.len()))
    }

    pub fn reset(&mut self) {
        self.slices.clear();
        self.slices.push(Vec::with_capacity(self.expansion_step));
    }

    /// Overwrites a single already-written byte, used to patch in a length
    /// prefix once the framed payload's size is known.
    pub fn put(&mut self, byte: u8, pos: usize) -> bool {
        let mut remaining = pos;
        for slice in &mut self.slices {
            if remaining < slice.len() {
                slice[remaining] = byte;
                return true;
            }
            remaining -= slice.len();
        }
        false
    }

    /// Copies every chained slice out into one contiguous [`ZBuf`].
    pub fn contiguous(&self) -> ZBuf {
        let mut out = Vec::with_capacity(self.len());
        for slice in &self.slices {
            out.extend_from_slice(slice);
        }
        ZBuf::from(out)
    }

    fn grow_if_full(&mut self) -> bool {
        let tail_full = self
            .slices
            .last()
            .map(|s| s.len() == s.capacity() && s.capacity() > 0)
            .unwrap_or(true);
        if !tail_full {
            return true;
        }
        if let Some(cap) = self.capacity {
            if self.len() >= cap {
                return false;
            }
        }
        self.slices.push(Vec::with_capacity(self.expansion_step));
        true
    }
}

impl Writer for WBuf {
    fn write_u8(&mut self, byte: u8) -> bool {
        if let Some(cap) = self.capacity {
            if self.len() >= cap {
                return false;
            }
        }
        let tail = self.slices.last_mut().unwrap();
        if tail.len() < self.expansion_step {
            tail.push(byte);
            true
        } else if self.grow_if_full() {
            self.slices.last_mut().unwrap().push(byte);
            true
        } else {
            false
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> bool {
        for b in bytes {
            if !self.write_u8(*b) {
                return false;
            }
        }
        true
    }

    fn len(&self) -> usize {
        WBuf::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_slices_past_expansion_step() {
        let mut wbuf = WBuf::new(4, true);
        for b in 0..10u8 {
            assert!(wbuf.write_u8(b));
        }
        assert_eq!(wbuf.len(), 10);
        assert_eq!(wbuf.contiguous().as_slice(), &(0..10u8).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn non_expandable_buffer_refuses_overflow() {
        let mut wbuf = WBuf::new(2, false);
        assert!(wbuf.write_bytes(&[1, 2]));
        assert!(!wbuf.write_u8(3));
    }

    #[test]
    fn put_patches_a_written_byte() {
        let mut wbuf = WBuf::new(4, true);
        wbuf.write_bytes(&[0, 0, 0]);
        assert!(wbuf.put(0xff, 1));
        assert_eq!(wbuf.contiguous().as_slice(), &[0, 0xff, 0]);
    }
}
