use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};
use half::f16;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use thiserror::Error;
use uuid::Uuid;

use crate::value::{CborMap, Complex, MimeMessage, Pattern, Rational, Value};

const BUFFER_FLUSH_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot encode type {0}")]
    UnsupportedType(String),

    #[error("{0}")]
    Value(String),

    #[error("invalid encoder configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn value_error<T>(msg: impl Into<String>) -> Result<T, Error> {
    Err(Error::Value(msg.into()))
}

#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Encode datetimes as tag 1 numeric timestamps instead of tag 0 strings.
    pub datetime_as_timestamp: bool,
    /// Default zone applied to naive datetimes; without one they fail.
    pub timezone: Option<FixedOffset>,
    /// Emit tags 28/29 for shareable values and shared references.
    pub value_sharing: bool,
    /// RFC 8949 deterministic encoding: shortest forms, sorted map keys.
    pub canonical: bool,
    /// Promote dates to midnight datetimes before encoding.
    pub date_as_datetime: bool,
    /// Compress repeated strings with tags 25/256.
    pub string_referencing: bool,
    /// Emit arrays, maps and strings in indefinite-length framing.
    pub indefinite_containers: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datetime_as_timestamp(mut self, on: bool) -> Self {
        self.datetime_as_timestamp = on;
        self
    }

    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn value_sharing(mut self, on: bool) -> Self {
        self.value_sharing = on;
        self
    }

    pub fn canonical(mut self, on: bool) -> Self {
        self.canonical = on;
        self
    }

    pub fn date_as_datetime(mut self, on: bool) -> Self {
        self.date_as_datetime = on;
        self
    }

    pub fn string_referencing(mut self, on: bool) -> Self {
        self.string_referencing = on;
        self
    }

    pub fn indefinite_containers(mut self, on: bool) -> Self {
        self.indefinite_containers = on;
        self
    }
}

type AnyEncodeFn<W> = Rc<dyn Fn(&mut Encoder<W>, &dyn Any) -> Result<(), Error>>;

#[derive(Default)]
struct StringRefs {
    text: HashMap<String, u64>,
    bytes: HashMap<Vec<u8>, u64>,
    count: u64,
}

// A string only enters the reference table when a tag 25 reference to the
// index it would receive is shorter than repeating the string itself.
fn stringref_eligible(table_size: u64, length: usize) -> bool {
    match table_size {
        0..24 => length >= 3,
        24..256 => length >= 4,
        256..65536 => length >= 5,
        65536..4294967296 => length >= 6,
        _ => length >= 11,
    }
}

/// A CBOR encoder over a byte sink.
///
/// Output accumulates in an internal buffer flushed to the sink as it fills
/// and at the end of every [`encode`] call. The shareable registry and
/// string-reference namespaces live for a single top-level `encode`.
///
/// [`encode`]: Encoder::encode
pub struct Encoder<W> {
    sink: W,
    buffer: Vec<u8>,
    options: EncodeOptions,
    default: Option<AnyEncodeFn<W>>,
    encoders: HashMap<TypeId, AnyEncodeFn<W>>,
    shared_count: u64,
    shared_any: HashMap<usize, Option<u64>>,
    stringrefs: Option<StringRefs>,
    scratch_depth: usize,
}

impl<W: Write> Encoder<W> {
    pub fn new(sink: W, options: EncodeOptions) -> Result<Self, Error> {
        if options.canonical && options.indefinite_containers {
            return Err(Error::Config(
                "canonical encoding cannot use indefinite length containers".into(),
            ));
        }
        Ok(Self {
            sink,
            buffer: Vec::new(),
            options,
            default: None,
            encoders: HashMap::new(),
            shared_count: 0,
            shared_any: HashMap::new(),
            stringrefs: None,
            scratch_depth: 0,
        })
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Register an encoder for a user type, overriding any built-in
    /// handling. Lookup is by exact type; there is no subtype fallback.
    pub fn register<T: Any>(
        &mut self,
        encoder: impl Fn(&mut Encoder<W>, &T) -> Result<(), Error> + 'static,
    ) {
        self.encoders.insert(
            TypeId::of::<T>(),
            Rc::new(move |this, any| {
                let value = any
                    .downcast_ref::<T>()
                    .expect("registry keyed by TypeId");
                encoder(this, value)
            }),
        );
    }

    /// Register an encoder that participates in value sharing: the first
    /// emission of a value is wrapped in tag 28, repeats become tag 29
    /// references, and recursion without sharing enabled is an error.
    pub fn register_shared<T: Any>(
        &mut self,
        encoder: impl Fn(&mut Encoder<W>, &T) -> Result<(), Error> + 'static,
    ) {
        let encoder = Rc::new(encoder);
        self.register::<T>(move |this, value| {
            let encoder = encoder.clone();
            this.encode_shared(value, move |this, value| (*encoder)(this, value))
        });
    }

    /// Fallback invoked when no encoder matches in [`encode_any`]. The
    /// callback must emit exactly one item through the encoder.
    ///
    /// [`encode_any`]: Encoder::encode_any
    pub fn set_default(
        &mut self,
        hook: impl Fn(&mut Encoder<W>, &dyn Any) -> Result<(), Error> + 'static,
    ) {
        self.default = Some(Rc::new(hook));
    }

    /// Flush buffered output to the sink.
    pub fn flush(&mut self) -> Result<(), Error> {
        if !self.buffer.is_empty() {
            self.sink.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    fn maybe_flush(&mut self) -> Result<(), Error> {
        if self.scratch_depth == 0 && self.buffer.len() >= BUFFER_FLUSH_SIZE {
            self.flush()
        } else {
            Ok(())
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.buffer.push(byte);
        self.maybe_flush()
    }

    /// Append raw bytes to the output.
    pub fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.buffer.extend_from_slice(data);
        self.maybe_flush()
    }

    /// Emit a header for the given major type and argument, in shortest form.
    pub fn emit_header(&mut self, major_type: u8, value: u64) -> Result<(), Error> {
        let major_type = major_type << 5;
        if value < 24 {
            self.write_byte(major_type | value as u8)
        } else if value <= u8::MAX as u64 {
            self.write_byte(major_type | 24)?;
            self.write_byte(value as u8)
        } else if value <= u16::MAX as u64 {
            self.write_byte(major_type | 25)?;
            self.write(&(value as u16).to_be_bytes())
        } else if value <= u32::MAX as u64 {
            self.write_byte(major_type | 26)?;
            self.write(&(value as u32).to_be_bytes())
        } else {
            self.write_byte(major_type | 27)?;
            self.write(&value.to_be_bytes())
        }
    }

    fn emit_indefinite(&mut self, major_type: u8) -> Result<(), Error> {
        self.write_byte((major_type << 5) | 31)
    }

    /// Emit the break stop code for indefinite containers.
    pub fn emit_break(&mut self) -> Result<(), Error> {
        self.write_byte(0xff)
    }

    /// Encode one value and flush the output.
    pub fn encode(&mut self, value: &Value) -> Result<(), Error> {
        let result = self.encode_root(value);
        // Registries only live for one top-level item
        self.stringrefs = None;
        self.shared_count = 0;
        self.shared_any.clear();
        match result {
            Ok(()) => self.flush(),
            Err(e) => {
                self.buffer.clear();
                Err(e)
            }
        }
    }

    fn encode_root(&mut self, value: &Value) -> Result<(), Error> {
        if self.options.string_referencing {
            self.emit_header(6, 256)?;
            self.stringrefs = Some(StringRefs::default());
        }
        self.encode_item(value)
    }

    /// Encode a value of any type: user-registered encoders first, then the
    /// built-in types, then the `default` fallback.
    pub fn encode_any<T: Any>(&mut self, value: &T) -> Result<(), Error> {
        if let Some(encoder) = self.encoders.get(&TypeId::of::<T>()).cloned() {
            return (*encoder)(self, value);
        }
        let any = value as &dyn Any;
        if let Some(value) = any.downcast_ref::<Value>() {
            return self.encode_item(value);
        }
        if let Some(converted) = builtin_value(any) {
            return self.encode_item(&converted);
        }
        if let Some(default) = self.default.clone() {
            return (*default)(self, any);
        }
        Err(Error::UnsupportedType(std::any::type_name::<T>().into()))
    }

    /// Identity-keyed value sharing for user encoders: writes tag 28 around
    /// the first emission of `value` and tag 29 references after that.
    pub fn encode_shared<T: Any>(
        &mut self,
        value: &T,
        f: impl FnOnce(&mut Self, &T) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let address = value as *const T as usize;
        match self.shared_any.get(&address).copied() {
            Some(Some(index)) => {
                self.emit_header(6, 29)?;
                self.emit_header(0, index)
            }
            Some(None) => value_error(
                "cyclic data structure detected but value sharing is disabled",
            ),
            None => {
                if self.options.value_sharing {
                    let index = self.shared_count;
                    self.shared_count += 1;
                    self.shared_any.insert(address, Some(index));
                    self.emit_header(6, 28)?;
                    f(self, value)
                } else {
                    self.shared_any.insert(address, None);
                    let result = f(self, value);
                    self.shared_any.remove(&address);
                    result
                }
            }
        }
    }

    /// Encode one value without the top-level bookkeeping of [`encode`].
    ///
    /// [`encode`]: Encoder::encode
    pub fn encode_item(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::Unsigned(n) => self.emit_header(0, *n),
            Value::Negative(n) => self.emit_header(1, *n),
            Value::Big(n) => self.encode_bigint(n),
            Value::Bytes(b) => self.encode_bytes(b),
            Value::Text(s) => self.encode_text(s),
            Value::Array(items) => {
                self.mark_shareable()?;
                self.encode_array(items)
            }
            Value::Map(map) => {
                self.mark_shareable()?;
                self.encode_map(map)
            }
            Value::Set(items) => {
                self.mark_shareable()?;
                self.encode_set(items)
            }
            Value::Tag(tag, inner) => self.encode_semantic(*tag, inner),
            Value::Bool(b) => self.write_byte(if *b { 0xf5 } else { 0xf4 }),
            Value::Null => self.write_byte(0xf6),
            Value::Undefined => self.write_byte(0xf7),
            Value::Simple(v) => self.encode_simple(*v),
            Value::Float(f) => self.encode_float(*f),
            Value::Break => self.emit_break(),
            Value::Shareable(inner) => self.encode_shareable(inner),
            Value::SharedRef(index) => self.encode_sharedref(*index),
            Value::DateTime(dt) => self.encode_datetime(dt),
            Value::NaiveDateTime(dt) => self.encode_naive_datetime(dt),
            Value::Date(date) => self.encode_date(date),
            Value::Decimal(decimal) => self.encode_decimal(decimal),
            Value::Rational(rational) => self.encode_rational(rational),
            Value::Regex(pattern) => self.encode_regexp(pattern),
            Value::Mime(message) => self.encode_mime(message),
            Value::Uuid(uuid) => self.encode_uuid(uuid),
            Value::Address(address) => self.encode_address(address),
            Value::Network(network) => self.encode_network(network),
            Value::Complex(complex) => self.encode_complex(complex),
        }
    }

    // With value sharing enabled every container is marked shareable so a
    // decoder can reconstruct references into it.
    fn mark_shareable(&mut self) -> Result<(), Error> {
        if self.options.value_sharing {
            self.emit_header(6, 28)?;
            self.shared_count += 1;
        }
        Ok(())
    }

    fn encode_to_scratch(&mut self, value: &Value) -> Result<Vec<u8>, Error> {
        let saved = std::mem::take(&mut self.buffer);
        self.scratch_depth += 1;
        let result = self.encode_item(value);
        self.scratch_depth -= 1;
        let scratch = std::mem::replace(&mut self.buffer, saved);
        result.map(|_| scratch)
    }

    fn encode_bigint(&mut self, value: &BigInt) -> Result<(), Error> {
        if let Some(n) = value.to_u64() {
            return self.emit_header(0, n);
        }
        if value.is_negative() {
            let magnitude: BigInt = -value - 1;
            if let Some(n) = magnitude.to_u64() {
                return self.emit_header(1, n);
            }
            self.emit_header(6, 3)?;
            self.encode_bytes(&magnitude.to_bytes_be().1)
        } else {
            self.emit_header(6, 2)?;
            self.encode_bytes(&value.to_bytes_be().1)
        }
    }

    fn stringref_for_bytes(&self, value: &[u8]) -> Option<u64> {
        self.stringrefs
            .as_ref()
            .and_then(|refs| refs.bytes.get(value).copied())
    }

    fn stringref_for_text(&self, value: &str) -> Option<u64> {
        self.stringrefs
            .as_ref()
            .and_then(|refs| refs.text.get(value).copied())
    }

    fn emit_stringref(&mut self, index: u64) -> Result<(), Error> {
        self.emit_header(6, 25)?;
        self.emit_header(0, index)
    }

    fn encode_bytes(&mut self, value: &[u8]) -> Result<(), Error> {
        if let Some(index) = self.stringref_for_bytes(value) {
            return self.emit_stringref(index);
        }
        if let Some(refs) = self.stringrefs.as_mut()
            && stringref_eligible(refs.count, value.len())
        {
            refs.bytes.insert(value.to_vec(), refs.count);
            refs.count += 1;
        }
        if self.options.indefinite_containers {
            self.emit_indefinite(2)?;
            self.emit_header(2, value.len() as u64)?;
            self.write(value)?;
            self.emit_break()
        } else {
            self.emit_header(2, value.len() as u64)?;
            self.write(value)
        }
    }

    fn encode_text(&mut self, value: &str) -> Result<(), Error> {
        if let Some(index) = self.stringref_for_text(value) {
            return self.emit_stringref(index);
        }
        if let Some(refs) = self.stringrefs.as_mut()
            && stringref_eligible(refs.count, value.len())
        {
            refs.text.insert(value.to_owned(), refs.count);
            refs.count += 1;
        }
        if self.options.indefinite_containers {
            self.emit_indefinite(3)?;
            self.emit_header(3, value.len() as u64)?;
            self.write(value.as_bytes())?;
            self.emit_break()
        } else {
            self.emit_header(3, value.len() as u64)?;
            self.write(value.as_bytes())
        }
    }

    fn encode_array(&mut self, items: &[Value]) -> Result<(), Error> {
        if self.options.indefinite_containers {
            self.emit_indefinite(4)?;
        } else {
            self.emit_header(4, items.len() as u64)?;
        }
        for item in items {
            self.encode_item(item)?;
        }
        if self.options.indefinite_containers {
            self.emit_break()?;
        }
        Ok(())
    }

    fn encode_map(&mut self, map: &CborMap) -> Result<(), Error> {
        if self.options.canonical {
            return self.encode_canonical_map(map);
        }
        if self.options.indefinite_containers {
            self.emit_indefinite(5)?;
        } else {
            self.emit_header(5, map.len() as u64)?;
        }
        for (key, value) in map.iter() {
            self.encode_item(key)?;
            self.encode_item(value)?;
        }
        if self.options.indefinite_containers {
            self.emit_break()?;
        }
        Ok(())
    }

    fn encode_canonical_map(&mut self, map: &CborMap) -> Result<(), Error> {
        self.emit_header(5, map.len() as u64)?;
        let mut pairs = Vec::with_capacity(map.len());
        for (key, value) in map.iter() {
            pairs.push((self.encode_to_scratch(key)?, value));
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        for window in pairs.windows(2) {
            if window[0].0 == window[1].0 {
                return value_error("duplicate keys in canonical map");
            }
        }
        for (key_bytes, value) in pairs {
            self.write(&key_bytes)?;
            self.encode_item(value)?;
        }
        Ok(())
    }

    fn encode_set(&mut self, items: &[Value]) -> Result<(), Error> {
        // Semantic tag 258
        self.emit_header(6, 258)?;
        if self.options.canonical {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                encoded.push(self.encode_to_scratch(item)?);
            }
            encoded.sort();
            self.emit_header(4, encoded.len() as u64)?;
            for item in encoded {
                self.write(&item)?;
            }
            Ok(())
        } else {
            self.encode_array(items)
        }
    }

    /// Encode a tagged value.
    pub fn encode_semantic(&mut self, tag: u64, value: &Value) -> Result<(), Error> {
        self.emit_header(6, tag)?;
        if tag == 256 {
            // A nested namespace scopes its own reference indices
            let saved = self.stringrefs.replace(StringRefs::default());
            let result = self.encode_item(value);
            self.stringrefs = saved;
            result
        } else {
            self.encode_item(value)
        }
    }

    fn encode_simple(&mut self, value: u8) -> Result<(), Error> {
        match value {
            20..=31 => value_error(format!("invalid simple value {value}")),
            0..=19 => self.write_byte(0xe0 | value),
            _ => {
                self.write_byte(0xf8)?;
                self.write_byte(value)
            }
        }
    }

    fn encode_float(&mut self, value: f64) -> Result<(), Error> {
        if value.is_nan() {
            return self.write(&[0xf9, 0x7e, 0x00]);
        }
        if value.is_infinite() {
            return self.write(if value.is_sign_positive() {
                &[0xf9, 0x7c, 0x00]
            } else {
                &[0xf9, 0xfc, 0x00]
            });
        }
        if self.options.canonical {
            // Find the shortest form that loses no precision
            let single = value as f32;
            if f64::from(single) == value {
                let half = f16::from_f32(single);
                if f32::from(half) == single {
                    self.write_byte(0xf9)?;
                    return self.write(&half.to_be_bytes());
                }
                self.write_byte(0xfa)?;
                return self.write(&single.to_be_bytes());
            }
        }
        self.write_byte(0xfb)?;
        self.write(&value.to_be_bytes())
    }

    fn encode_shareable(&mut self, inner: &Value) -> Result<(), Error> {
        // Semantic tag 28; mark_shareable covers containers, so descend
        // directly to avoid a double marker
        if !self.options.value_sharing {
            return self.encode_item(inner);
        }
        match inner {
            Value::Array(_) | Value::Map(_) | Value::Set(_) => self.encode_item(inner),
            other => {
                self.emit_header(6, 28)?;
                self.shared_count += 1;
                self.encode_item(other)
            }
        }
    }

    fn encode_sharedref(&mut self, index: u64) -> Result<(), Error> {
        // Semantic tag 29
        if !self.options.value_sharing {
            return value_error("cyclic data structure detected but value sharing is disabled");
        }
        if index >= self.shared_count {
            return value_error(format!("shared reference {index} not found"));
        }
        self.emit_header(6, 29)?;
        self.emit_header(0, index)
    }

    fn encode_i64(&mut self, value: i64) -> Result<(), Error> {
        if value >= 0 {
            self.emit_header(0, value as u64)
        } else {
            self.emit_header(1, value.unsigned_abs() - 1)
        }
    }

    fn encode_datetime(&mut self, value: &DateTime<FixedOffset>) -> Result<(), Error> {
        // Semantic tags 0 and 1
        if self.options.datetime_as_timestamp {
            self.emit_header(6, 1)?;
            if value.timestamp_subsec_nanos() == 0 {
                self.encode_i64(value.timestamp())
            } else {
                self.encode_float(value.timestamp_micros() as f64 / 1e6)
            }
        } else {
            self.emit_header(6, 0)?;
            let text = value.to_rfc3339_opts(SecondsFormat::AutoSi, true);
            self.encode_text(&text)
        }
    }

    fn encode_naive_datetime(&mut self, value: &NaiveDateTime) -> Result<(), Error> {
        let Some(timezone) = self.options.timezone else {
            return value_error("naive datetime encountered and no default timezone has been set");
        };
        let Some(aware) = timezone.from_local_datetime(value).single() else {
            return value_error("naive datetime does not exist in the default timezone");
        };
        self.encode_datetime(&aware)
    }

    fn encode_date(&mut self, value: &NaiveDate) -> Result<(), Error> {
        if self.options.date_as_datetime {
            self.encode_naive_datetime(&value.and_time(NaiveTime::MIN))
        } else if self.options.datetime_as_timestamp {
            // Semantic tag 100: days since the Unix epoch
            self.emit_header(6, 100)?;
            self.encode_i64(value.num_days_from_ce() as i64 - 719_163)
        } else {
            // Semantic tag 1004
            self.emit_header(6, 1004)?;
            self.encode_text(&value.format("%Y-%m-%d").to_string())
        }
    }

    fn encode_decimal(&mut self, value: &BigDecimal) -> Result<(), Error> {
        // Semantic tag 4: [exponent, mantissa]
        let (mantissa, scale) = value.as_bigint_and_exponent();
        let Some(exponent) = scale.checked_neg() else {
            return value_error("decimal exponent out of range");
        };
        self.emit_header(6, 4)?;
        self.emit_header(4, 2)?;
        self.encode_i64(exponent)?;
        self.encode_bigint(&mantissa)
    }

    fn encode_rational(&mut self, value: &Rational) -> Result<(), Error> {
        // Semantic tag 30: [numerator, denominator]
        self.emit_header(6, 30)?;
        self.emit_header(4, 2)?;
        self.encode_bigint(&value.numerator)?;
        self.encode_bigint(&value.denominator)
    }

    fn encode_regexp(&mut self, value: &Pattern) -> Result<(), Error> {
        // Semantic tag 35
        self.emit_header(6, 35)?;
        self.encode_text(value.0.as_str())
    }

    fn encode_mime(&mut self, value: &MimeMessage) -> Result<(), Error> {
        // Semantic tag 36
        self.emit_header(6, 36)?;
        self.encode_text(&value.0)
    }

    fn encode_uuid(&mut self, value: &Uuid) -> Result<(), Error> {
        // Semantic tag 37
        self.emit_header(6, 37)?;
        self.encode_bytes(value.as_bytes())
    }

    fn encode_address(&mut self, value: &IpAddr) -> Result<(), Error> {
        // Semantic tags 52 and 54
        match value {
            IpAddr::V4(addr) => {
                self.emit_header(6, 52)?;
                self.encode_bytes(&addr.octets())
            }
            IpAddr::V6(addr) => {
                self.emit_header(6, 54)?;
                self.encode_bytes(&addr.octets())
            }
        }
    }

    // Networks (host bits clear) use the [prefixlen, addr] shape with
    // trailing zero bytes stripped; interfaces use [addr, prefixlen].
    fn encode_network_parts(&mut self, octets: &[u8], prefix: u8, host: bool) -> Result<(), Error> {
        self.emit_header(4, 2)?;
        if host {
            self.encode_bytes(octets)?;
            self.emit_header(0, prefix as u64)
        } else {
            self.emit_header(0, prefix as u64)?;
            let end = octets
                .iter()
                .rposition(|b| *b != 0)
                .map(|i| i + 1)
                .unwrap_or(0);
            self.encode_bytes(&octets[..end])
        }
    }

    fn encode_network(&mut self, value: &IpNet) -> Result<(), Error> {
        // Semantic tags 52 and 54
        match value {
            IpNet::V4(net) => {
                self.emit_header(6, 52)?;
                let host = net.addr() != net.network();
                self.encode_network_parts(&net.addr().octets(), net.prefix_len(), host)
            }
            IpNet::V6(net) => {
                self.emit_header(6, 54)?;
                let host = net.addr() != net.network();
                self.encode_network_parts(&net.addr().octets(), net.prefix_len(), host)
            }
        }
    }

    fn encode_complex(&mut self, value: &Complex) -> Result<(), Error> {
        // Semantic tag 43000: [re, im]
        self.emit_header(6, 43000)?;
        self.emit_header(4, 2)?;
        self.encode_float(value.re)?;
        self.encode_float(value.im)
    }
}

macro_rules! downcast_into {
    ($any:expr, $($t:ty),* $(,)?) => {
        $(if let Some(v) = $any.downcast_ref::<$t>() {
            return Some(Value::from(v.clone()));
        })*
    };
}

fn builtin_value(any: &dyn Any) -> Option<Value> {
    downcast_into!(
        any, bool, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, u128, i128, BigInt, f32,
        f64, &'static str, String, Vec<u8>, Vec<Value>, CborMap, NaiveDateTime, NaiveDate,
        BigDecimal, Rational, regex::Regex, Pattern, MimeMessage, Uuid, IpAddr, Ipv4Addr,
        Ipv6Addr, IpNet, Ipv4Net, Ipv6Net, Complex,
    );
    downcast_into!(any, DateTime<FixedOffset>, DateTime<Utc>);
    None
}
