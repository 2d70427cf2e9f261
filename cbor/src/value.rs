use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::Deref;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use uuid::Uuid;

/// A single CBOR data item.
///
/// Integers within the 64-bit wire range keep the major-type split of the
/// encoding: [`Value::Unsigned`] for major type 0 and [`Value::Negative`]
/// for major type 1, where `Negative(n)` represents `-1 - n`. Integers
/// outside that range travel as [`Value::Big`] and are framed with tag 2
/// or 3 on the wire.
///
/// [`Value::Shareable`] and [`Value::SharedRef`] carry tags 28 and 29:
/// a shareable node may be referenced by any later (or, for cycles,
/// enclosed) `SharedRef` whose index counts shareable nodes in pre-order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Negative(u64),
    Big(BigInt),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    Map(CborMap),
    Tag(u64, Box<Value>),
    Bool(bool),
    Null,
    Undefined,
    Simple(u8),
    Float(f64),
    Break,
    Shareable(Box<Value>),
    SharedRef(u64),
    DateTime(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
    Date(NaiveDate),
    Decimal(BigDecimal),
    Rational(Rational),
    Regex(Pattern),
    Mime(MimeMessage),
    Uuid(Uuid),
    Address(IpAddr),
    Network(IpNet),
    Set(Vec<Value>),
    Complex(Complex),
}

impl Value {
    /// Build an integer value, normalizing to the native wire form when the
    /// magnitude fits 64 bits.
    pub fn integer(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        if let Some(n) = value.to_u64() {
            return Value::Unsigned(n);
        }
        if let Some(n) = (-&value - BigInt::from(1)).to_u64() {
            return Value::Negative(n);
        }
        Value::Big(value)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Unsigned(n) => i64::try_from(*n).ok(),
            Value::Negative(n) => i64::try_from(*n).ok().map(|n| -1 - n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Unsigned(n) => Some(*n as f64),
            Value::Negative(n) => Some(-1.0 - *n as f64),
            _ => None,
        }
    }

    /// The integer this value holds, at any magnitude.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Unsigned(n) => Some(BigInt::from(*n)),
            Value::Negative(n) => Some(-BigInt::from(*n) - 1),
            Value::Big(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// A short noun for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unsigned(_) => "unsigned integer",
            Value::Negative(_) => "negative integer",
            Value::Big(_) => "big integer",
            Value::Bytes(_) => "byte string",
            Value::Text(_) => "text string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Tag(..) => "tag",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Simple(_) => "simple value",
            Value::Float(_) => "float",
            Value::Break => "break marker",
            Value::Shareable(_) => "shareable value",
            Value::SharedRef(_) => "shared reference",
            Value::DateTime(_) => "datetime",
            Value::NaiveDateTime(_) => "naive datetime",
            Value::Date(_) => "date",
            Value::Decimal(_) => "decimal",
            Value::Rational(_) => "rational",
            Value::Regex(_) => "regular expression",
            Value::Mime(_) => "MIME message",
            Value::Uuid(_) => "UUID",
            Value::Address(_) => "IP address",
            Value::Network(_) => "IP network",
            Value::Set(_) => "set",
            Value::Complex(_) => "complex number",
        }
    }
}

/// An insertion-ordered map of CBOR keys to values.
///
/// Keys keep the order of their first appearance; inserting an existing key
/// replaces its value in place (last one wins, mirroring the decoder's
/// duplicate-key rule).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CborMap(Vec<(Value, Value)>);

impl CborMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        for (k, v) in &mut self.0 {
            if *k == key {
                return Some(std::mem::replace(v, value));
            }
        }
        self.0.push((key, value));
        None
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.0.iter()
    }
}

impl FromIterator<(Value, Value)> for CborMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = CborMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for CborMap {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Tag 30 payload: an exact ratio of two integers.
#[derive(Debug, Clone, PartialEq)]
pub struct Rational {
    pub numerator: BigInt,
    pub denominator: BigInt,
}

/// Tag 43000 payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

/// Tag 36 payload: the raw RFC 2822 text of a MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage(pub String);

/// A compiled regular expression (tag 35) comparing equal by pattern text.
#[derive(Debug, Clone)]
pub struct Pattern(pub regex::Regex);

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Deref for Pattern {
    type Target = regex::Regex;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::Unsigned(value as u64)
            }
        }
    )*};
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                let value = value as i64;
                if value >= 0 {
                    Value::Unsigned(value as u64)
                } else {
                    Value::Negative(value.unsigned_abs() - 1)
                }
            }
        }
    )*};
}

impl_from_unsigned!(u8, u16, u32, u64, usize);
impl_from_signed!(i8, i16, i32, i64, isize);

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Value::integer(BigInt::from(value))
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::integer(BigInt::from(value))
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<CborMap> for Value {
    fn from(value: CborMap) -> Self {
        Value::Map(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::NaiveDateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<Rational> for Value {
    fn from(value: Rational) -> Self {
        Value::Rational(value)
    }
}

impl From<regex::Regex> for Value {
    fn from(value: regex::Regex) -> Self {
        Value::Regex(Pattern(value))
    }
}

impl From<Pattern> for Value {
    fn from(value: Pattern) -> Self {
        Value::Regex(value)
    }
}

impl From<MimeMessage> for Value {
    fn from(value: MimeMessage) -> Self {
        Value::Mime(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<IpAddr> for Value {
    fn from(value: IpAddr) -> Self {
        Value::Address(value)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(value: Ipv4Addr) -> Self {
        Value::Address(IpAddr::V4(value))
    }
}

impl From<Ipv6Addr> for Value {
    fn from(value: Ipv6Addr) -> Self {
        Value::Address(IpAddr::V6(value))
    }
}

impl From<IpNet> for Value {
    fn from(value: IpNet) -> Self {
        Value::Network(value)
    }
}

impl From<Ipv4Net> for Value {
    fn from(value: Ipv4Net) -> Self {
        Value::Network(IpNet::V4(value))
    }
}

impl From<Ipv6Net> for Value {
    fn from(value: Ipv6Net) -> Self {
        Value::Network(IpNet::V6(value))
    }
}

impl From<Complex> for Value {
    fn from(value: Complex) -> Self {
        Value::Complex(value)
    }
}
