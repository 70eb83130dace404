//! Typed numeric values read from and written to target memory.

mod parse;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

/// The closed set of value kinds the scanner understands.
///
/// Declaration order is the cross-kind ordering used by
/// [`TypedValue::compare`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ValueKind {
    /// Byte width of the in-memory representation
    pub fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Literal suffix used when rendering a value of this kind
    pub fn literal_suffix(self) -> &'static str {
        match self {
            Self::I8 => "o",
            Self::U8 => "uo",
            Self::I16 => "h",
            Self::U16 => "uh",
            Self::I32 => "",
            Self::U32 => "u",
            Self::I64 => "q",
            Self::U64 => "uq",
            Self::F32 => "f",
            Self::F64 => "",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl TypedValue {
    /// Parse a value literal (`255uo`, `-3h`, `0x10`, `1.5f`, ...)
    pub fn parse(text: &str) -> Result<Self> {
        parse::parse_literal(text)
    }

    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::I8 => Self::I8(0),
            ValueKind::U8 => Self::U8(0),
            ValueKind::I16 => Self::I16(0),
            ValueKind::U16 => Self::U16(0),
            ValueKind::I32 => Self::I32(0),
            ValueKind::U32 => Self::U32(0),
            ValueKind::I64 => Self::I64(0),
            ValueKind::U64 => Self::U64(0),
            ValueKind::F32 => Self::F32(0.0),
            ValueKind::F64 => Self::F64(0.0),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::I8(_) => ValueKind::I8,
            Self::U8(_) => ValueKind::U8,
            Self::I16(_) => ValueKind::I16,
            Self::U16(_) => ValueKind::U16,
            Self::I32(_) => ValueKind::I32,
            Self::U32(_) => ValueKind::U32,
            Self::I64(_) => ValueKind::I64,
            Self::U64(_) => ValueKind::U64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
        }
    }

    pub fn width(&self) -> usize {
        self.kind().width()
    }

    /// Decode a value of `kind` from the start of `bytes` (little-endian).
    ///
    /// Returns `None` if `bytes` is shorter than the kind's width.
    pub fn decode(kind: ValueKind, bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..kind.width())?;
        Some(match kind {
            ValueKind::I8 => Self::I8(i8::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::U8 => Self::U8(raw[0]),
            ValueKind::I16 => Self::I16(i16::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::U16 => Self::U16(u16::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::I32 => Self::I32(i32::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::U32 => Self::U32(u32::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::I64 => Self::I64(i64::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::U64 => Self::U64(u64::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::F32 => Self::F32(f32::from_le_bytes(raw.try_into().ok()?)),
            ValueKind::F64 => Self::F64(f64::from_le_bytes(raw.try_into().ok()?)),
        })
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            Self::I8(v) => v.to_le_bytes().to_vec(),
            Self::U8(v) => vec![v],
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Order two values.
    ///
    /// Values of different kinds are ordered by kind, never numerically.
    /// Unordered floats (NaN) compare equal.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::I8(a), Self::I8(b)) => a.cmp(b),
            (Self::U8(a), Self::U8(b)) => a.cmp(b),
            (Self::I16(a), Self::I16(b)) => a.cmp(b),
            (Self::U16(a), Self::U16(b)) => a.cmp(b),
            (Self::I32(a), Self::I32(b)) => a.cmp(b),
            (Self::U32(a), Self::U32(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::U64(a), Self::U64(b)) => a.cmp(b),
            (Self::F32(a), Self::F32(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::F64(a), Self::F64(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for TypedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl FromStr for TypedValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.kind().literal_suffix();
        match self {
            Self::I8(v) => write!(f, "{}{}", v, suffix),
            Self::U8(v) => write!(f, "{}{}", v, suffix),
            Self::I16(v) => write!(f, "{}{}", v, suffix),
            Self::U16(v) => write!(f, "{}{}", v, suffix),
            Self::I32(v) => write!(f, "{}{}", v, suffix),
            Self::U32(v) => write!(f, "{}{}", v, suffix),
            Self::I64(v) => write!(f, "{}{}", v, suffix),
            Self::U64(v) => write!(f, "{}{}", v, suffix),
            // Debug formatting keeps a decimal point so the literal stays a float
            Self::F32(v) => write!(f, "{:?}{}", v, suffix),
            Self::F64(v) => write!(f, "{:?}{}", v, suffix),
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
