use std::io::Read;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use half::f16;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use thiserror::Error;
use uuid::Uuid;

use crate::value::{CborMap, Complex, MimeMessage, Pattern, Rational, Value};

pub const DEFAULT_READ_SIZE: usize = 4096;
pub const DEFAULT_MAX_DEPTH: usize = 1000;

#[derive(Error, Debug)]
pub enum Error {
    #[error("premature end of stream (expected to read at least {expected} bytes, got {got} instead)")]
    Eof { expected: usize, got: usize },

    #[error("{0}")]
    Value(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn value_error<T>(msg: impl Into<String>) -> Result<T, Error> {
    Err(Error::Value(msg.into()))
}

/// Policy for invalid UTF-8 in text strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrErrors {
    /// Fail the decode.
    #[default]
    Strict,
    /// Substitute U+FFFD for each invalid sequence.
    Replace,
    /// Drop invalid bytes.
    Ignore,
}

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// UTF-8 policy for text strings.
    pub str_errors: StrErrors,
    /// Readahead window pulled from the source; 0 reads exact amounts.
    pub read_size: usize,
    /// Nesting limit for containers and tags.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            str_errors: StrErrors::Strict,
            read_size: DEFAULT_READ_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn str_errors(mut self, str_errors: StrErrors) -> Self {
        self.str_errors = str_errors;
        self
    }

    pub fn read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

pub type TagHook<R> = Rc<dyn Fn(&mut Decoder<R>, u64, Value) -> Result<Value, Error>>;
pub type ObjectHook<R> = Rc<dyn Fn(&mut Decoder<R>, CborMap) -> Result<Value, Error>>;

/// A CBOR decoder over a byte source.
///
/// One decoder decodes a stream of items in sequence; the shareable registry
/// and string-reference namespaces live for a single top-level [`decode`]
/// call. Unconsumed readahead stays buffered for the next item.
///
/// [`decode`]: Decoder::decode
pub struct Decoder<R> {
    source: R,
    buffer: Vec<u8>,
    detached: bool,
    str_errors: StrErrors,
    read_size: usize,
    max_depth: usize,
    tag_hook: Option<TagHook<R>>,
    object_hook: Option<ObjectHook<R>>,
    depth: usize,
    immutable: bool,
    shareable_count: u64,
    stringref_namespace: Option<Vec<Value>>,
}

impl<R: Read> Decoder<R> {
    pub fn new(source: R) -> Self {
        Self::with_options(source, DecodeOptions::default())
    }

    pub fn with_options(source: R, options: DecodeOptions) -> Self {
        Self {
            source,
            buffer: Vec::with_capacity(options.read_size),
            detached: false,
            str_errors: options.str_errors,
            read_size: options.read_size,
            max_depth: options.max_depth,
            tag_hook: None,
            object_hook: None,
            depth: 0,
            immutable: false,
            shareable_count: 0,
            stringref_namespace: None,
        }
    }

    /// Fallback invoked for tags with no built-in handler. The hook receives
    /// the tag number and the (already decoded) inner value; its return value
    /// substitutes for the tag in the output.
    pub fn set_tag_hook(
        &mut self,
        hook: impl Fn(&mut Decoder<R>, u64, Value) -> Result<Value, Error> + 'static,
    ) {
        self.tag_hook = Some(Rc::new(hook));
    }

    /// Invoked for every decoded map; its return value substitutes for the
    /// map in the output.
    pub fn set_object_hook(
        &mut self,
        hook: impl Fn(&mut Decoder<R>, CborMap) -> Result<Value, Error> + 'static,
    ) {
        self.object_hook = Some(Rc::new(hook));
    }

    /// Whether the decoder is currently inside an immutable context (a map
    /// key, set contents, or the payload of a structured tag).
    pub fn immutable(&self) -> bool {
        self.immutable
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn read_to_buffer(&mut self, minimum: usize) -> Result<(), Error> {
        if self.detached {
            return Err(Error::Eof {
                expected: minimum,
                got: 0,
            });
        }
        let goal = minimum.max(self.read_size);
        let mut chunk = vec![0u8; goal];
        let mut filled = 0;
        while filled < minimum {
            let n = self.source.read(&mut chunk[filled..])?;
            if n == 0 {
                return Err(Error::Eof {
                    expected: minimum,
                    got: filled,
                });
            }
            filled += n;
        }
        self.buffer.extend_from_slice(&chunk[..filled]);
        Ok(())
    }

    /// Read bytes from the data stream.
    pub fn read(&mut self, amount: usize) -> Result<Vec<u8>, Error> {
        if amount > self.buffer.len() {
            self.read_to_buffer(amount - self.buffer.len())?;
        }
        Ok(self.buffer.drain(..amount).collect())
    }

    fn read_exact_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        if N > self.buffer.len() {
            self.read_to_buffer(N - self.buffer.len())?;
        }
        let mut output = [0u8; N];
        output.copy_from_slice(self.buffer.drain(..N).as_slice());
        Ok(output)
    }

    fn read_major_and_subtype(&mut self) -> Result<(u8, u8), Error> {
        let initial = self.read_exact_array::<1>()?[0];
        Ok((initial >> 5, initial & 31))
    }

    /// Decode the next value from the stream.
    pub fn decode(&mut self) -> Result<Value, Error> {
        let result = self.decode_item();
        if self.depth == 0 {
            // Registries only live for one top-level item
            self.shareable_count = 0;
            self.stringref_namespace = None;
        }
        match result {
            Ok(Value::Break) => value_error("break marker outside indefinite length container"),
            other => other,
        }
    }

    /// Decode one item from the given buffer, sharing this decoder's
    /// registries. Intended for tag hooks that contain embedded CBOR.
    pub fn decode_from_bytes(&mut self, buf: &[u8]) -> Result<Value, Error> {
        let saved_buffer = std::mem::replace(&mut self.buffer, buf.to_vec());
        let saved_detached = self.detached;
        self.detached = true;
        let result = self.decode_item();
        self.buffer = saved_buffer;
        self.detached = saved_detached;
        match result {
            Ok(Value::Break) => value_error("break marker outside indefinite length container"),
            other => other,
        }
    }

    fn decode_item(&mut self) -> Result<Value, Error> {
        let (major_type, subtype) = self.read_major_and_subtype()?;
        if self.depth == self.max_depth {
            return value_error("maximum recursion depth exceeded");
        }
        self.depth += 1;
        let result = match major_type {
            0 => self.decode_uint(subtype),
            1 => self.decode_negint(subtype),
            2 => self.decode_bytestring(subtype),
            3 => self.decode_string(subtype),
            4 => self.decode_array(subtype),
            5 => self.decode_map(subtype),
            6 => self.decode_semantic(subtype),
            7 => self.decode_special(subtype),
            _ => unreachable!(),
        };
        self.depth -= 1;
        result
    }

    // Like decode_item, but a break marker is an error.
    fn decode_child(&mut self) -> Result<Value, Error> {
        match self.decode_item()? {
            Value::Break => value_error("break marker outside indefinite length container"),
            value => Ok(value),
        }
    }

    fn decode_immutable(&mut self) -> Result<Value, Error> {
        let saved = self.immutable;
        self.immutable = true;
        let result = self.decode_child();
        self.immutable = saved;
        result
    }

    // Map keys may legitimately be the break marker of an indefinite map.
    fn decode_key(&mut self) -> Result<Value, Error> {
        let saved = self.immutable;
        self.immutable = true;
        let result = self.decode_item();
        self.immutable = saved;
        result
    }

    //
    // Decoders for major types 0-7
    //

    fn decode_length(&mut self, subtype: u8) -> Result<Option<u64>, Error> {
        match subtype {
            0..24 => Ok(Some(subtype as u64)),
            24 => Ok(Some(self.read_exact_array::<1>()?[0] as u64)),
            25 => Ok(Some(u16::from_be_bytes(self.read_exact_array()?) as u64)),
            26 => Ok(Some(u32::from_be_bytes(self.read_exact_array()?) as u64)),
            27 => Ok(Some(u64::from_be_bytes(self.read_exact_array()?))),
            31 => Ok(None),
            _ => value_error(format!("unknown unsigned integer subtype 0x{subtype:x}")),
        }
    }

    fn decode_length_finite(&mut self, subtype: u8) -> Result<u64, Error> {
        match self.decode_length(subtype)? {
            Some(length) => Ok(length),
            None => value_error("indefinite length not allowed here"),
        }
    }

    fn usize_length(&self, length: u64) -> Result<usize, Error> {
        usize::try_from(length)
            .map_err(|_| Error::Value(format!("length {length} exceeds platform limits")))
    }

    fn decode_uint(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 0
        Ok(Value::Unsigned(self.decode_length_finite(subtype)?))
    }

    fn decode_negint(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 1: represented value is -1 - n
        Ok(Value::Negative(self.decode_length_finite(subtype)?))
    }

    fn register_string(&mut self, value: &Value, length: usize) {
        if let Some(namespace) = self.stringref_namespace.as_mut() {
            let eligible = match namespace.len() as u64 {
                0..24 => length >= 3,
                24..256 => length >= 4,
                256..65536 => length >= 5,
                65536..4294967296 => length >= 6,
                _ => length >= 11,
            };
            if eligible {
                namespace.push(value.clone());
            }
        }
    }

    fn decode_bytestring(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 2
        let (bytes, length) = match self.decode_length(subtype)? {
            None => {
                let mut bytes = Vec::new();
                loop {
                    let (major_type, subtype) = self.read_major_and_subtype()?;
                    match (major_type, subtype) {
                        (7, 31) => break,
                        (2, _) => {
                            let length = self.decode_length_finite(subtype)?;
                            let length = self.usize_length(length)?;
                            bytes.extend_from_slice(&self.read(length)?);
                        }
                        _ => {
                            return value_error(format!(
                                "non-byte string (major type {major_type}) found in indefinite \
                                 length byte string"
                            ));
                        }
                    }
                }
                let length = bytes.len();
                (bytes, length)
            }
            Some(length) => {
                let length = self.usize_length(length)?;
                (self.read(length)?, length)
            }
        };
        let value = Value::Bytes(bytes);
        self.register_string(&value, length);
        Ok(value)
    }

    fn decode_text_chunk(&mut self, bytes: Vec<u8>) -> Result<String, Error> {
        match self.str_errors {
            StrErrors::Strict => String::from_utf8(bytes)
                .map_err(|e| Error::Value(format!("error decoding text string: {e}"))),
            StrErrors::Replace => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            StrErrors::Ignore => {
                let mut output = String::with_capacity(bytes.len());
                let mut rest = bytes.as_slice();
                loop {
                    match std::str::from_utf8(rest) {
                        Ok(valid) => {
                            output.push_str(valid);
                            break;
                        }
                        Err(e) => {
                            let (valid, after) = rest.split_at(e.valid_up_to());
                            output
                                .push_str(std::str::from_utf8(valid).expect("valid_up_to boundary"));
                            match e.error_len() {
                                Some(skip) => rest = &after[skip..],
                                None => break,
                            }
                        }
                    }
                }
                Ok(output)
            }
        }
    }

    fn decode_string(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 3
        let (string, length) = match self.decode_length(subtype)? {
            None => {
                let mut string = String::new();
                loop {
                    let (major_type, subtype) = self.read_major_and_subtype()?;
                    match (major_type, subtype) {
                        (7, 31) => break,
                        (3, _) => {
                            let length = self.decode_length_finite(subtype)?;
                            let length = self.usize_length(length)?;
                            let chunk = self.read(length)?;
                            string.push_str(&self.decode_text_chunk(chunk)?);
                        }
                        _ => {
                            return value_error(format!(
                                "non-text string (major type {major_type}) found in indefinite \
                                 length text string"
                            ));
                        }
                    }
                }
                let length = string.len();
                (string, length)
            }
            Some(length) => {
                let length = self.usize_length(length)?;
                let chunk = self.read(length)?;
                (self.decode_text_chunk(chunk)?, length)
            }
        };
        let value = Value::Text(string);
        self.register_string(&value, length);
        Ok(value)
    }

    fn decode_array(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 4
        match self.decode_length(subtype)? {
            None => {
                let mut items = Vec::new();
                loop {
                    match self.decode_item()? {
                        Value::Break => break,
                        value => items.push(value),
                    }
                }
                Ok(Value::Array(items))
            }
            Some(length) => {
                let length = self.usize_length(length)?;
                let mut items = Vec::with_capacity(length.min(65536));
                for _ in 0..length {
                    items.push(self.decode_child()?);
                }
                Ok(Value::Array(items))
            }
        }
    }

    fn decode_map(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 5
        let mut map = CborMap::new();
        match self.decode_length(subtype)? {
            None => loop {
                let key = self.decode_key()?;
                if matches!(key, Value::Break) {
                    break;
                }
                let value = self.decode_child()?;
                map.insert(key, value);
            },
            Some(length) => {
                let length = self.usize_length(length)?;
                for _ in 0..length {
                    let key = self.decode_immutable()?;
                    let value = self.decode_child()?;
                    map.insert(key, value);
                }
            }
        }
        match self.object_hook.clone() {
            Some(hook) => (*hook)(self, map),
            None => Ok(Value::Map(map)),
        }
    }

    fn decode_semantic(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 6
        let tag = self.decode_length_finite(subtype)?;
        match tag {
            0 => self.decode_datetime_string(),
            1 => self.decode_epoch_datetime(),
            2 => self.decode_bignum(false),
            3 => self.decode_bignum(true),
            4 => self.decode_decimal_fraction(),
            5 => self.decode_bigfloat(),
            25 => self.decode_stringref(),
            28 => self.decode_shareable(),
            29 => self.decode_sharedref(),
            30 => self.decode_rational(),
            35 => self.decode_regexp(),
            36 => self.decode_mime(),
            37 => self.decode_uuid(),
            52 => self.decode_ipv4(),
            54 => self.decode_ipv6(),
            100 => self.decode_epoch_date(),
            256 => self.decode_stringref_namespace(),
            258 => self.decode_set(),
            260 => self.decode_ipaddress(),
            261 => self.decode_ipnetwork(),
            1004 => self.decode_date_string(),
            43000 => self.decode_complex(),
            55799 => self.decode_child(),
            _ => {
                let value = self.decode_immutable()?;
                match self.tag_hook.clone() {
                    Some(hook) => (*hook)(self, tag, value),
                    None => Ok(Value::Tag(tag, Box::new(value))),
                }
            }
        }
    }

    fn decode_special(&mut self, subtype: u8) -> Result<Value, Error> {
        // Major type 7
        match subtype {
            0..20 => Ok(Value::Simple(subtype)),
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            23 => Ok(Value::Undefined),
            24 => {
                let value = self.read_exact_array::<1>()?[0];
                if value < 32 {
                    return value_error(format!("invalid simple value {value}"));
                }
                Ok(Value::Simple(value))
            }
            25 => {
                let value = f16::from_be_bytes(self.read_exact_array()?);
                Ok(Value::Float(value.into()))
            }
            26 => {
                let value = f32::from_be_bytes(self.read_exact_array()?);
                Ok(Value::Float(value.into()))
            }
            27 => {
                let value = f64::from_be_bytes(self.read_exact_array()?);
                Ok(Value::Float(value))
            }
            31 => Ok(Value::Break),
            _ => value_error(format!(
                "undefined reserved major type 7 subtype 0x{subtype:x}"
            )),
        }
    }

    //
    // Decoders for semantic tags (major type 6)
    //

    fn decode_datetime_string(&mut self) -> Result<Value, Error> {
        // Semantic tag 0
        let value = self.decode_child()?;
        let Value::Text(text) = value else {
            return value_error(format!(
                "expected string for datetime tag, got {} instead",
                value.kind()
            ));
        };
        DateTime::parse_from_rfc3339(&text)
            .map(Value::DateTime)
            .map_err(|e| Error::Value(format!("invalid datetime string '{text}': {e}")))
    }

    fn decode_epoch_datetime(&mut self) -> Result<Value, Error> {
        // Semantic tag 1
        let value = self.decode_child()?;
        let timestamp = match &value {
            Value::Float(f) => {
                if !f.is_finite() {
                    return value_error("error decoding datetime from epoch: non-finite timestamp");
                }
                let mut seconds = f.floor();
                let mut nanos = ((f - seconds) * 1e9).round();
                if nanos >= 1e9 {
                    seconds += 1.0;
                    nanos = 0.0;
                }
                i64::try_from(seconds as i128)
                    .ok()
                    .map(|s| (s, nanos as u32))
            }
            value => value.as_i64().map(|s| (s, 0)),
        };
        let Some((seconds, nanos)) = timestamp else {
            return value_error(format!(
                "error decoding datetime from epoch: invalid timestamp {}",
                value.kind()
            ));
        };
        match Utc.timestamp_opt(seconds, nanos).single() {
            Some(datetime) => Ok(Value::DateTime(datetime.fixed_offset())),
            None => value_error("error decoding datetime from epoch: timestamp out of range"),
        }
    }

    fn decode_bignum(&mut self, negative: bool) -> Result<Value, Error> {
        // Semantic tags 2 and 3
        let value = self.decode_child()?;
        let Value::Bytes(bytes) = value else {
            return value_error(format!(
                "expected byte string for bignum tag, got {} instead",
                value.kind()
            ));
        };
        let mut int = BigInt::from_bytes_be(Sign::Plus, &bytes);
        if negative {
            int = -int - 1;
        }
        Ok(Value::integer(int))
    }

    fn two_element_array(&mut self, what: &str) -> Result<[Value; 2], Error> {
        let value = self.decode_immutable()?;
        let Value::Array(items) = value else {
            return value_error(format!("error decoding {what}: input value must be an array"));
        };
        <[Value; 2]>::try_from(items).map_err(|_| {
            Error::Value(format!(
                "error decoding {what}: array must have exactly two elements"
            ))
        })
    }

    fn decode_decimal_fraction(&mut self) -> Result<Value, Error> {
        // Semantic tag 4
        let [exp, mantissa] = self.two_element_array("decimal fraction")?;
        let (Some(exponent), Some(mantissa)) = (exp.as_i64(), mantissa.to_bigint()) else {
            return value_error("error decoding decimal fraction: invalid exponent or mantissa");
        };
        let Some(scale) = exponent.checked_neg() else {
            return value_error("error decoding decimal fraction: exponent out of range");
        };
        Ok(Value::Decimal(BigDecimal::new(mantissa, scale)))
    }

    fn decode_bigfloat(&mut self) -> Result<Value, Error> {
        // Semantic tag 5: mantissa * 2^exp
        let [exp, mantissa] = self.two_element_array("bigfloat")?;
        let (Some(exponent), Some(mantissa)) = (exp.as_i64(), mantissa.to_bigint()) else {
            return value_error("error decoding bigfloat: invalid exponent or mantissa");
        };
        let decimal = if exponent >= 0 {
            let Ok(exponent) = usize::try_from(exponent) else {
                return value_error("error decoding bigfloat: exponent out of range");
            };
            BigDecimal::from(mantissa * num_traits::pow(BigInt::from(2), exponent))
        } else {
            // 2^-k == 5^k * 10^-k, which is exact in decimal
            let Ok(scale) = usize::try_from(exponent.unsigned_abs()) else {
                return value_error("error decoding bigfloat: exponent out of range");
            };
            BigDecimal::new(
                mantissa * num_traits::pow(BigInt::from(5), scale),
                scale as i64,
            )
        };
        Ok(Value::Decimal(decimal))
    }

    fn decode_stringref(&mut self) -> Result<Value, Error> {
        // Semantic tag 25
        let value = self.decode_child()?;
        let Some(index) = value.as_u64() else {
            return value_error(format!(
                "expected unsigned integer for string reference, got {} instead",
                value.kind()
            ));
        };
        let Some(namespace) = self.stringref_namespace.as_ref() else {
            return value_error("string reference outside of namespace");
        };
        match usize::try_from(index).ok().and_then(|i| namespace.get(i)) {
            Some(value) => Ok(value.clone()),
            None => value_error(format!("string reference {index} not found")),
        }
    }

    fn decode_shareable(&mut self) -> Result<Value, Error> {
        // Semantic tag 28: the slot is allocated before the inner value is
        // decoded so self-references resolve
        self.shareable_count += 1;
        let inner = self.decode_child()?;
        Ok(Value::Shareable(Box::new(inner)))
    }

    fn decode_sharedref(&mut self) -> Result<Value, Error> {
        // Semantic tag 29
        let value = self.decode_child()?;
        let Some(index) = value.as_u64() else {
            return value_error(format!(
                "expected unsigned integer for shared reference, got {} instead",
                value.kind()
            ));
        };
        if index < self.shareable_count {
            Ok(Value::SharedRef(index))
        } else {
            value_error(format!("shared reference {index} not found"))
        }
    }

    fn decode_rational(&mut self) -> Result<Value, Error> {
        // Semantic tag 30
        let [numerator, denominator] = self.two_element_array("rational")?;
        let (Some(numerator), Some(denominator)) = (numerator.to_bigint(), denominator.to_bigint())
        else {
            return value_error("error decoding rational: elements must be integers");
        };
        if denominator.is_zero() {
            return value_error("error decoding rational: denominator is zero");
        }
        Ok(Value::Rational(Rational {
            numerator,
            denominator,
        }))
    }

    fn decode_regexp(&mut self) -> Result<Value, Error> {
        // Semantic tag 35
        let value = self.decode_child()?;
        let Value::Text(pattern) = value else {
            return value_error(format!(
                "expected string for regular expression tag, got {} instead",
                value.kind()
            ));
        };
        regex::Regex::new(&pattern)
            .map(|re| Value::Regex(Pattern(re)))
            .map_err(|e| Error::Value(format!("error decoding regular expression: {e}")))
    }

    fn decode_mime(&mut self) -> Result<Value, Error> {
        // Semantic tag 36
        let value = self.decode_child()?;
        let Value::Text(text) = value else {
            return value_error(format!(
                "expected string for MIME message tag, got {} instead",
                value.kind()
            ));
        };
        Ok(Value::Mime(MimeMessage(text)))
    }

    fn decode_uuid(&mut self) -> Result<Value, Error> {
        // Semantic tag 37
        let value = self.decode_child()?;
        let Value::Bytes(bytes) = value else {
            return value_error(format!(
                "expected byte string for UUID tag, got {} instead",
                value.kind()
            ));
        };
        Uuid::from_slice(&bytes)
            .map(Value::Uuid)
            .map_err(|e| Error::Value(format!("error decoding UUID value: {e}")))
    }

    fn prefix_len(value: &Value) -> Option<u8> {
        value.as_u64().and_then(|n| u8::try_from(n).ok())
    }

    fn decode_ipv4(&mut self) -> Result<Value, Error> {
        // Semantic tag 52
        let value = self.decode_immutable()?;
        match value {
            Value::Bytes(bytes) => {
                let Ok(octets) = <[u8; 4]>::try_from(bytes.as_slice()) else {
                    return value_error("error decoding IPv4: address must be 4 bytes");
                };
                Ok(Value::Address(Ipv4Addr::from(octets).into()))
            }
            Value::Array(items) => {
                let Ok([first, second]) = <[Value; 2]>::try_from(items) else {
                    return value_error(
                        "error decoding IPv4: input value must be a bytestring or an array of \
                         2 elements",
                    );
                };
                let (octets, prefix) = match (&first, &second) {
                    // (prefix, addr) is a network with trailing zeroes stripped
                    (Value::Unsigned(_), Value::Bytes(addr)) if addr.len() <= 4 => {
                        let mut octets = [0u8; 4];
                        octets[..addr.len()].copy_from_slice(addr);
                        (octets, Self::prefix_len(&first))
                    }
                    // (addr, prefix) is an interface
                    (Value::Bytes(addr), Value::Unsigned(_)) if addr.len() == 4 => {
                        let mut octets = [0u8; 4];
                        octets.copy_from_slice(addr);
                        (octets, Self::prefix_len(&second))
                    }
                    _ => return value_error("error decoding IPv4: invalid types in input array"),
                };
                let Some(prefix) = prefix else {
                    return value_error("error decoding IPv4: invalid prefix length");
                };
                Ipv4Net::new(Ipv4Addr::from(octets), prefix)
                    .map(|net| Value::Network(IpNet::V4(net)))
                    .map_err(|e| Error::Value(format!("error decoding IPv4: {e}")))
            }
            _ => value_error(
                "error decoding IPv4: input value must be a bytestring or an array of 2 elements",
            ),
        }
    }

    fn decode_ipv6(&mut self) -> Result<Value, Error> {
        // Semantic tag 54
        let value = self.decode_immutable()?;
        match value {
            Value::Bytes(bytes) => {
                let Ok(octets) = <[u8; 16]>::try_from(bytes.as_slice()) else {
                    return value_error("error decoding IPv6: address must be 16 bytes");
                };
                Ok(Value::Address(Ipv6Addr::from(octets).into()))
            }
            Value::Array(items) if items.len() == 3 => {
                // Zone identifiers have no std representation; keep the tag
                Ok(Value::Tag(54, Box::new(Value::Array(items))))
            }
            Value::Array(items) => {
                let Ok([first, second]) = <[Value; 2]>::try_from(items) else {
                    return value_error(
                        "error decoding IPv6: input value must be a bytestring or an array of \
                         2 elements",
                    );
                };
                let (octets, prefix) = match (&first, &second) {
                    (Value::Unsigned(_), Value::Bytes(addr)) if addr.len() <= 16 => {
                        let mut octets = [0u8; 16];
                        octets[..addr.len()].copy_from_slice(addr);
                        (octets, Self::prefix_len(&first))
                    }
                    (Value::Bytes(addr), Value::Unsigned(_)) if addr.len() == 16 => {
                        let mut octets = [0u8; 16];
                        octets.copy_from_slice(addr);
                        (octets, Self::prefix_len(&second))
                    }
                    _ => return value_error("error decoding IPv6: invalid types in input array"),
                };
                let Some(prefix) = prefix else {
                    return value_error("error decoding IPv6: invalid prefix length");
                };
                Ipv6Net::new(Ipv6Addr::from(octets), prefix)
                    .map(|net| Value::Network(IpNet::V6(net)))
                    .map_err(|e| Error::Value(format!("error decoding IPv6: {e}")))
            }
            _ => value_error(
                "error decoding IPv6: input value must be a bytestring or an array of 2 elements",
            ),
        }
    }

    fn decode_epoch_date(&mut self) -> Result<Value, Error> {
        // Semantic tag 100: days since 1970-01-01
        let value = self.decode_child()?;
        let days = value
            .as_i64()
            .and_then(|d| d.checked_add(719_163))
            .and_then(|d| i32::try_from(d).ok());
        match days.and_then(NaiveDate::from_num_days_from_ce_opt) {
            Some(date) => Ok(Value::Date(date)),
            None => value_error("error decoding date from epoch: value out of range"),
        }
    }

    fn decode_stringref_namespace(&mut self) -> Result<Value, Error> {
        // Semantic tag 256
        let saved = self.stringref_namespace.take();
        self.stringref_namespace = Some(Vec::new());
        let result = self.decode_child();
        self.stringref_namespace = saved;
        result
    }

    fn decode_set(&mut self) -> Result<Value, Error> {
        // Semantic tag 258
        let value = self.decode_immutable()?;
        let Value::Array(items) = value else {
            return value_error(format!(
                "expected array for set tag, got {} instead",
                value.kind()
            ));
        };
        let mut set: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !set.contains(&item) {
                set.push(item);
            }
        }
        Ok(Value::Set(set))
    }

    fn decode_ipaddress(&mut self) -> Result<Value, Error> {
        // Semantic tag 260 (deprecated)
        let value = self.decode_child()?;
        let Value::Bytes(bytes) = value else {
            return value_error("invalid IP address");
        };
        match bytes.len() {
            4 => {
                let octets = <[u8; 4]>::try_from(bytes.as_slice()).expect("length checked");
                Ok(Value::Address(Ipv4Addr::from(octets).into()))
            }
            16 => {
                let octets = <[u8; 16]>::try_from(bytes.as_slice()).expect("length checked");
                Ok(Value::Address(Ipv6Addr::from(octets).into()))
            }
            // MAC addresses have no native representation
            6 => Ok(Value::Tag(260, Box::new(Value::Bytes(bytes)))),
            length => value_error(format!("invalid IP address length ({length})")),
        }
    }

    fn decode_ipnetwork(&mut self) -> Result<Value, Error> {
        // Semantic tag 261 (deprecated)
        let value = self.decode_child()?;
        let Value::Map(map) = value else {
            return value_error("error decoding IP network: input value must be a map");
        };
        if map.len() != 1 {
            return value_error(format!(
                "invalid input map length for IP network: {}",
                map.len()
            ));
        }
        let (addr, mask) = map.into_iter().next().expect("length checked");
        let (Value::Bytes(bytes), Some(prefix)) = (&addr, Self::prefix_len(&mask)) else {
            return value_error("error decoding IP network: invalid address or mask");
        };
        match bytes.len() {
            4 => {
                let octets = <[u8; 4]>::try_from(bytes.as_slice()).expect("length checked");
                Ipv4Net::new(Ipv4Addr::from(octets), prefix)
                    .map(|net| Value::Network(IpNet::V4(net)))
                    .map_err(|e| Error::Value(format!("error decoding IP network: {e}")))
            }
            16 => {
                let octets = <[u8; 16]>::try_from(bytes.as_slice()).expect("length checked");
                Ipv6Net::new(Ipv6Addr::from(octets), prefix)
                    .map(|net| Value::Network(IpNet::V6(net)))
                    .map_err(|e| Error::Value(format!("error decoding IP network: {e}")))
            }
            length => value_error(format!("invalid IP network address length ({length})")),
        }
    }

    fn decode_date_string(&mut self) -> Result<Value, Error> {
        // Semantic tag 1004
        let value = self.decode_child()?;
        let Value::Text(text) = value else {
            return value_error(format!(
                "expected string for date tag, got {} instead",
                value.kind()
            ));
        };
        NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| Error::Value(format!("invalid date string '{text}': {e}")))
    }

    fn decode_complex(&mut self) -> Result<Value, Error> {
        // Semantic tag 43000
        let [re, im] = self.two_element_array("complex")?;
        let (Some(re), Some(im)) = (re.as_f64(), im.as_f64()) else {
            return value_error("error decoding complex: elements must be numbers");
        };
        Ok(Value::Complex(Complex { re, im }))
    }
}
