//! Prefixers bracket `Vec<Vec<u8>>` with length framing for callers that have
//! no per-value structure of their own (spec §4.3).
//!
//! Two flavors: [`StaticPrefixer`] frames a fixed number of runs, one header
//! spec per run; [`DynamicPrefixer`] frames an unknown number of runs behind
//! one outer count header and one shared inner length header.

use crate::cursor::{Reader, Writer, VAR_SENTINEL};
use crate::error::{Error, Result};
use crate::varint::size_uvarint;

/// Sentinel header value selecting a VarInt length header, equal to the
/// maximum VarInt length (spec §4.1's `CompactSize`, reused here exactly as
/// the original codec reuses it for both purposes).
pub const VAR: i32 = VAR_SENTINEL as i32;

fn is_valid_positive_header(h: i32) -> bool {
    matches!(h, 1 | 2 | 4 | 8) || h == VAR
}

/// A fixed sequence of per-run header specs.
///
/// Each spec is one of: `1`/`2`/`4`/`8` (a fixed-width length header of that
/// many bytes), [`VAR`] (a VarInt length header), a negative value `-k` (the
/// run is exactly `k` bytes with no header at all), or `0` — legal only in
/// the last position — meaning "no header, this run is everything left".
pub struct StaticPrefixer {
    headers: Vec<i32>,
}

impl StaticPrefixer {
    pub fn new(headers: &[i32]) -> Self {
        for (i, &h) in headers.iter().enumerate() {
            if h > 0 {
                assert!(
                    is_valid_positive_header(h),
                    "positive header size must be 1, 2, 4, 8 or VAR_SENTINEL"
                );
            } else if h == 0 && i != headers.len() - 1 {
                panic!("header value of 0 is only valid in the last position");
            }
        }
        StaticPrefixer {
            headers: headers.to_vec(),
        }
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if self.headers.len() != got {
            return Err(Error::SizeMismatch {
                expected: self.headers.len(),
                got,
            });
        }
        Ok(())
    }

    pub fn size(&self, data: &[Vec<u8>]) -> Result<usize> {
        self.check_len(data.len())?;
        let mut sum = 0;
        for (h, d) in self.headers.iter().zip(data) {
            if *h == VAR {
                sum += size_uvarint(d.len() as u64);
            } else if *h > 0 {
                sum += *h as usize;
            }
            sum += d.len();
        }
        Ok(sum)
    }

    pub fn serialize(&self, w: &mut Writer, data: &[Vec<u8>]) -> Result<()> {
        self.check_len(data.len())?;
        for (h, d) in self.headers.iter().zip(data) {
            if *h > 0 {
                if *h == VAR {
                    w.varuint(d.len() as u64);
                } else {
                    w.uint(*h as usize, d.len() as u64);
                }
            }
            w.bytes(d);
        }
        Ok(())
    }

    pub fn deserialize(&self, r: &mut Reader) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(self.headers.len());
        for (i, &h) in self.headers.iter().enumerate() {
            if h == 0 {
                let rest = r.bytes(r.remaining())?;
                out.push(rest);
                debug_assert_eq!(i, self.headers.len() - 1);
                return Ok(out);
            }
            let len = if h == VAR {
                r.varuint()? as usize
            } else if h > 0 {
                r.uint(h as usize)? as usize
            } else {
                (-h) as usize
            };
            out.push(r.bytes(len)?);
        }
        Ok(out)
    }
}

/// One outer header framing a run count, one shared inner header framing
/// each run's length.
///
/// A negative `outer`/`inner` means "fixed, no header written", with a
/// count/length equal to the absolute value.
pub struct DynamicPrefixer {
    outer: i32,
    inner: i32,
}

impl DynamicPrefixer {
    pub fn new(outer: i32, inner: i32) -> Self {
        assert!(
            outer < 0 || is_valid_positive_header(outer),
            "outer header must be 1, 2, 4, 8, VAR_SENTINEL or negative"
        );
        assert!(
            inner < 0 || is_valid_positive_header(inner),
            "inner header must be 1, 2, 4, 8, VAR_SENTINEL or negative"
        );
        DynamicPrefixer { outer, inner }
    }

    pub fn size(&self, data: &[Vec<u8>]) -> Result<usize> {
        let mut size = if self.outer > 0 {
            if self.outer == VAR {
                size_uvarint(data.len() as u64)
            } else {
                self.outer as usize
            }
        } else {
            0
        };
        let fixed_inner = if self.inner > 0 { self.inner as usize } else { 0 };
        for b in data {
            if self.inner == VAR {
                size += size_uvarint(b.len() as u64) + b.len();
            } else {
                size += fixed_inner + b.len();
            }
        }
        Ok(size)
    }

    pub fn serialize(&self, w: &mut Writer, data: &[Vec<u8>]) -> Result<()> {
        if self.outer > 0 {
            if self.outer == VAR {
                w.varuint(data.len() as u64);
            } else {
                w.uint(self.outer as usize, data.len() as u64);
            }
        }
        for b in data {
            if self.inner > 0 {
                if self.inner == VAR {
                    w.varuint(b.len() as u64);
                } else {
                    w.uint(self.inner as usize, b.len() as u64);
                }
            }
            w.bytes(b);
        }
        Ok(())
    }

    pub fn deserialize(&self, r: &mut Reader) -> Result<Vec<Vec<u8>>> {
        let outer = if self.outer > 0 {
            if self.outer == VAR {
                r.varuint()? as usize
            } else {
                r.uint(self.outer as usize)? as usize
            }
        } else {
            (-self.outer) as usize
        };

        let mut data = Vec::with_capacity(outer);
        for _ in 0..outer {
            let inner = if self.inner > 0 {
                if self.inner == VAR {
                    r.varuint()? as usize
                } else {
                    r.uint(self.inner as usize)? as usize
                }
            } else {
                (-self.inner) as usize
            };
            data.push(r.bytes(inner)?);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(headers: &[i32], data: Vec<Vec<u8>>) {
        let p = StaticPrefixer::new(headers);
        let size = p.size(&data).unwrap();
        let mut w = Writer::with_size(size);
        p.serialize(&mut w, &data).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), size);
        let mut r = Reader::new(&bytes);
        let back = p.deserialize(&mut r).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn static_prefixer_roundtrip() {
        roundtrip(
            &[2, VAR, -6, 0],
            vec![
                b"ab".to_vec(),
                b"hello world".to_vec(),
                b"abcdef".to_vec(),
                b"tail goes here".to_vec(),
            ],
        );
    }

    #[test]
    fn static_prefixer_size_mismatch() {
        let p = StaticPrefixer::new(&[1, 1]);
        let err = p.size(&[b"x".to_vec()]).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 2, got: 1 }));
    }

    #[test]
    #[should_panic]
    fn static_prefixer_rejects_mid_zero() {
        StaticPrefixer::new(&[0, 1]);
    }

    #[test]
    fn dynamic_prefixer_roundtrip_varint() {
        let p = DynamicPrefixer::new(1, VAR);
        let data = vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()];
        let size = p.size(&data).unwrap();
        let mut w = Writer::with_size(size);
        p.serialize(&mut w, &data).unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(p.deserialize(&mut r).unwrap(), data);
    }

    #[test]
    fn dynamic_prefixer_fixed_inner() {
        let p = DynamicPrefixer::new(VAR, -32);
        let data = vec![vec![1u8; 32], vec![2u8; 32]];
        let size = p.size(&data).unwrap();
        let mut w = Writer::with_size(size);
        p.serialize(&mut w, &data).unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(p.deserialize(&mut r).unwrap(), data);
    }
}
