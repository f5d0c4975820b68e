//! Pre-sized buffer writer (spec §4.2).
//!
//! A `Writer` is handed the exact byte count a value will occupy (from that
//! value's `wire_size`), allocates once, and then every primitive advances an
//! index into that buffer. There is no resize or reflow mid-write: writing
//! past the allocated length is a caller bug, not a recoverable error, and is
//! left to panic via slice indexing.

use byteorder::{ByteOrder, LittleEndian};

use crate::varint::{write_uvarint, write_varint};

/// VarInt used as a `size` value in [`Writer::uint`]/[`Reader::uint`](super::Reader::uint).
pub const VAR_SENTINEL: usize = crate::varint::MAX_LEN;

pub struct Writer {
    buf: Vec<u8>,
    size: usize,
    idx: usize,
}

impl Writer {
    /// Creates a writer that will hold exactly `size` bytes once [`ensure`](Self::ensure) runs.
    pub fn with_size(size: usize) -> Self {
        let mut w = Writer {
            buf: Vec::new(),
            size,
            idx: 0,
        };
        w.ensure();
        w
    }

    /// Allocates `size - buf.len()` additional bytes if that's positive.
    pub fn ensure(&mut self) {
        if self.size > self.buf.len() {
            self.buf.resize(self.size, 0);
        }
    }

    pub fn len(&self) -> usize {
        self.idx
    }

    /// Consumes the writer, returning the finished buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf[self.idx] = v;
        self.idx += 1;
    }

    pub fn i8(&mut self, v: i8) {
        self.u8(v as u8);
    }

    pub fn u16(&mut self, v: u16) {
        LittleEndian::write_u16(&mut self.buf[self.idx..self.idx + 2], v);
        self.idx += 2;
    }

    pub fn u32(&mut self, v: u32) {
        LittleEndian::write_u32(&mut self.buf[self.idx..self.idx + 4], v);
        self.idx += 4;
    }

    pub fn u64(&mut self, v: u64) {
        LittleEndian::write_u64(&mut self.buf[self.idx..self.idx + 8], v);
        self.idx += 8;
    }

    pub fn i16(&mut self, v: i16) {
        self.u16(v as u16);
    }

    pub fn i32(&mut self, v: i32) {
        self.u32(v as u32);
    }

    pub fn i64(&mut self, v: i64) {
        self.u64(v as u64);
    }

    pub fn f32(&mut self, v: f32) {
        self.u32(v.to_bits());
    }

    pub fn f64(&mut self, v: f64) {
        self.u64(v.to_bits());
    }

    pub fn bytes(&mut self, b: &[u8]) {
        self.buf[self.idx..self.idx + b.len()].copy_from_slice(b);
        self.idx += b.len();
    }

    pub fn string(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    pub fn varuint(&mut self, x: u64) {
        let mut tmp = Vec::with_capacity(crate::varint::MAX_LEN);
        write_uvarint(&mut tmp, x);
        self.bytes(&tmp);
    }

    pub fn varint(&mut self, x: i64) {
        let mut tmp = Vec::with_capacity(crate::varint::MAX_LEN);
        write_varint(&mut tmp, x);
        self.bytes(&tmp);
    }

    /// Writes `value` using a fixed width of 1, 2, 4 or 8 bytes, or
    /// [`VAR_SENTINEL`] to dispatch to the VarInt encoding.
    pub fn uint(&mut self, size: usize, value: u64) {
        match size {
            1 => self.u8(value as u8),
            2 => self.u16(value as u16),
            4 => self.u32(value as u32),
            8 => self.u64(value),
            VAR_SENTINEL => self.varuint(value),
            other => panic!("invalid fixed width {other}"),
        }
    }
}
