// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical CBOR subset used for columnar payloads and wire messages.
//!
//! Rules enforced on both sides:
//!
//! - definite lengths only, no tags, no simple values beyond bool/null
//! - integers and lengths use the shortest head
//! - floats use the narrowest width that round-trips; integral floats inside
//!   the 64-bit integer range are written as integers
//! - map keys are sorted by their encoded bytes and must be unique
//!
//! Two equal values always encode to the same bytes, which is what lets the
//! chart layer hash payloads into stable widget identities.

use ciborium::value::{Integer, Value};
use half::f16;

/// Nesting limit for decoding untrusted input.
pub const MAX_DEPTH: usize = 128;

/// Errors raised by the canonical encoder/decoder.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CanonError {
    /// Input ended in the middle of a value.
    #[error("incomplete input")]
    Incomplete,
    /// Bytes remained after the top-level value.
    #[error("trailing bytes after value")]
    Trailing,
    /// Tagged values are not part of the subset.
    #[error("tags not allowed")]
    Tag,
    /// Indefinite-length items are not part of the subset.
    #[error("indefinite length not allowed")]
    Indefinite,
    /// An integer or length used a wider head than necessary.
    #[error("non-canonical integer width")]
    NonCanonicalInt,
    /// A float used a wider encoding than necessary.
    #[error("non-canonical float width")]
    NonCanonicalFloat,
    /// A float carried an integral value that must be written as an integer.
    #[error("float encodes integral value; must be integer")]
    FloatShouldBeInt,
    /// Map keys were not in ascending encoded order.
    #[error("map keys not strictly increasing")]
    MapKeyOrder,
    /// The same map key appeared twice.
    #[error("duplicate map key")]
    MapKeyDuplicate,
    /// Nesting exceeded [`MAX_DEPTH`].
    #[error("nesting deeper than {MAX_DEPTH}")]
    TooDeep,
    /// Anything else that is not representable.
    #[error("decode error: {0}")]
    Decode(String),
}

type Result<T> = std::result::Result<T, CanonError>;

/// Encode `value` into canonical bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut sink = Sink::default();
    sink.value(value)?;
    Ok(sink.out)
}

/// Decode canonical bytes, rejecting any non-canonical form.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let value = cursor.value(0)?;
    if cursor.pos != bytes.len() {
        return Err(CanonError::Trailing);
    }
    Ok(value)
}

#[derive(Default)]
struct Sink {
    out: Vec<u8>,
}

impl Sink {
    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.out.push(0xf6),
            Value::Bool(b) => self.out.push(if *b { 0xf5 } else { 0xf4 }),
            Value::Integer(n) => self.int(i128::from(*n)),
            Value::Float(f) => self.float(*f),
            Value::Bytes(b) => {
                self.head(2, b.len() as u64);
                self.out.extend_from_slice(b);
            }
            Value::Text(s) => {
                self.head(3, s.len() as u64);
                self.out.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => {
                self.head(4, items.len() as u64);
                for item in items {
                    self.value(item)?;
                }
            }
            Value::Map(entries) => self.map(entries)?,
            Value::Tag(..) => return Err(CanonError::Tag),
            _ => return Err(CanonError::Decode("unsupported simple value".into())),
        }
        Ok(())
    }

    fn map(&mut self, entries: &[(Value, Value)]) -> Result<()> {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            encoded.push((encode_value(key)?, value));
        }
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        if encoded.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(CanonError::MapKeyDuplicate);
        }
        self.head(5, encoded.len() as u64);
        for (key_bytes, value) in encoded {
            self.out.extend_from_slice(&key_bytes);
            self.value(value)?;
        }
        Ok(())
    }

    fn int(&mut self, n: i128) {
        if n >= 0 {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            self.head(0, n as u64);
        } else {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            self.head(1, (-1 - n) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn float(&mut self, f: f64) {
        if f.is_nan() {
            self.half(f16::NAN);
            return;
        }
        if f.is_infinite() {
            self.half(if f.is_sign_positive() {
                f16::INFINITY
            } else {
                f16::NEG_INFINITY
            });
            return;
        }
        // -2^63 ..= 2^64 - 1 is the integer range CBOR heads can carry.
        if f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 18_446_744_073_709_551_616.0 {
            self.int(f as i128);
            return;
        }
        let h = f16::from_f64(f);
        if h.to_f64() == f {
            self.half(h);
        } else if f64::from(f as f32) == f {
            self.out.push(0xfa);
            self.out.extend_from_slice(&(f as f32).to_be_bytes());
        } else {
            self.out.push(0xfb);
            self.out.extend_from_slice(&f.to_be_bytes());
        }
    }

    fn half(&mut self, h: f16) {
        self.out.push(0xf9);
        self.out.extend_from_slice(&h.to_bits().to_be_bytes());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn head(&mut self, major: u8, n: u64) {
        let major = major << 5;
        if n < 24 {
            self.out.push(major | n as u8);
        } else if n <= 0xff {
            self.out.extend_from_slice(&[major | 24, n as u8]);
        } else if n <= 0xffff {
            self.out.push(major | 25);
            self.out.extend_from_slice(&(n as u16).to_be_bytes());
        } else if n <= 0xffff_ffff {
            self.out.push(major | 26);
            self.out.extend_from_slice(&(n as u32).to_be_bytes());
        } else {
            self.out.push(major | 27);
            self.out.extend_from_slice(&n.to_be_bytes());
        }
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CanonError::Incomplete)?;
        let slice = self.bytes.get(self.pos..end).ok_or(CanonError::Incomplete)?;
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn uint(&mut self, width: usize) -> Result<u64> {
        Ok(self
            .take(width)?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// Reads the argument of a head, enforcing the shortest form.
    fn argument(&mut self, info: u8) -> Result<u64> {
        let (n, floor) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (self.uint(1)?, 24),
            25 => (self.uint(2)?, 0x100),
            26 => (self.uint(4)?, 0x1_0000),
            27 => (self.uint(8)?, 0x1_0000_0000),
            31 => return Err(CanonError::Indefinite),
            _ => return Err(CanonError::Decode("invalid length info".into())),
        };
        if n < floor {
            return Err(CanonError::NonCanonicalInt);
        }
        Ok(n)
    }

    fn length(&mut self, info: u8) -> Result<usize> {
        let n = self.argument(info)?;
        usize::try_from(n).map_err(|_| CanonError::Decode("length overflows usize".into()))
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(CanonError::TooDeep);
        }
        let start = self.pos;
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;
        match major {
            0 => Ok(Value::Integer(Integer::from(self.argument(info)?))),
            1 => {
                let n = self.argument(info)?;
                let value = -1 - i128::from(n);
                let int = Integer::try_from(value)
                    .map_err(|_| CanonError::Decode("integer out of range".into()))?;
                Ok(Value::Integer(int))
            }
            2 => {
                let len = self.length(info)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            3 => {
                let len = self.length(info)?;
                let raw = self.take(len)?;
                let text = std::str::from_utf8(raw)
                    .map_err(|e| CanonError::Decode(format!("utf8: {e}")))?;
                Ok(Value::Text(text.to_owned()))
            }
            4 => {
                let len = self.length(info)?;
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            5 => {
                let len = self.length(info)?;
                let mut entries = Vec::with_capacity(len.min(self.remaining()));
                let mut previous: Option<&'a [u8]> = None;
                for _ in 0..len {
                    let key_start = self.pos;
                    let key = self.value(depth + 1)?;
                    let all = self.bytes;
                    let key_bytes = &all[key_start..self.pos];
                    if let Some(prev) = previous {
                        if key_bytes == prev {
                            return Err(CanonError::MapKeyDuplicate);
                        }
                        if key_bytes < prev {
                            return Err(CanonError::MapKeyOrder);
                        }
                    }
                    previous = Some(key_bytes);
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
            6 => Err(CanonError::Tag),
            _ => self.simple(info, start),
        }
    }

    fn simple(&mut self, info: u8, start: usize) -> Result<Value> {
        let f = match info {
            20 => return Ok(Value::Bool(false)),
            21 => return Ok(Value::Bool(true)),
            22 => return Ok(Value::Null),
            25 => {
                let raw = self.take(2)?;
                f16::from_bits(u16::from_be_bytes([raw[0], raw[1]])).to_f64()
            }
            26 => {
                let raw = self.take(4)?;
                f64::from(f32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            27 => {
                let raw = self.take(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                f64::from_be_bytes(buf)
            }
            31 => return Err(CanonError::Indefinite),
            _ => return Err(CanonError::Decode("simple value not supported".into())),
        };
        let mut canonical = Sink::default();
        canonical.float(f);
        if canonical.out.as_slice() != &self.bytes[start..self.pos] {
            return Err(if canonical.out[0] >> 5 == 7 {
                CanonError::NonCanonicalFloat
            } else {
                CanonError::FloatShouldBeInt
            });
        }
        Ok(Value::Float(f))
    }
}
