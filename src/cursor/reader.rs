//! Borrowing buffer reader, the mirror of [`super::Writer`] (spec §4.2).

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::varint::{read_uvarint, read_varint};

use super::writer::VAR_SENTINEL;

pub struct Reader<'a> {
    buf: &'a [u8],
    idx: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, idx: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.idx
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.idx.checked_add(n).ok_or(Error::UnexpectedEnd)?;
        let slice = self.buf.get(self.idx..end).ok_or(Error::UnexpectedEnd)?;
        self.idx = end;
        Ok(slice)
    }

    /// Carves the next `n` bytes off as an independent child cursor.
    pub fn sub(&mut self, n: usize) -> Result<Reader<'a>> {
        Ok(Reader::new(self.take(n)?))
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(self.u16()? as i16)
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(self.u32()? as i32)
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(self.u64()? as i64)
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    pub fn string(&mut self, n: usize) -> Result<String> {
        Ok(String::from_utf8(self.bytes(n)?)?)
    }

    pub fn varuint(&mut self) -> Result<u64> {
        read_uvarint(self.buf, &mut self.idx)
    }

    pub fn varint(&mut self) -> Result<i64> {
        read_varint(self.buf, &mut self.idx)
    }

    /// Reads a value written by [`super::Writer::uint`] with the same `size`.
    pub fn uint(&mut self, size: usize) -> Result<u64> {
        match size {
            1 => Ok(self.u8()? as u64),
            2 => Ok(self.u16()? as u64),
            4 => Ok(self.u32()? as u64),
            8 => self.u64(),
            VAR_SENTINEL => self.varuint(),
            other => panic!("invalid fixed width {other}"),
        }
    }
}
