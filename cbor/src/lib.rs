//! A fully featured CBOR (RFC 8949) encoder and decoder.
//!
//! Beyond the base data model this crate handles the registered semantic
//! tags for dates and times, bignums, decimal fractions, bigfloats,
//! rationals, regular expressions, MIME messages, UUIDs, IP addresses and
//! networks, sets and complex numbers, as well as value sharing (tags
//! 28/29, including cyclic graphs), string referencing (tags 25/256) and
//! canonical deterministic encoding.

pub mod decode;
pub mod encode;
pub mod value;

#[cfg(test)]
mod decode_tests;


use std::io::{Read, Write};

pub use crate::decode::{DecodeOptions, Decoder, StrErrors};
pub use crate::encode::{EncodeOptions, Encoder};
pub use crate::value::{CborMap, Complex, MimeMessage, Pattern, Rational, Value};

/// Encode a value to a byte vector with default options.
pub fn to_vec(value: &Value) -> Result<Vec<u8>, encode::Error> {
    to_vec_with(value, EncodeOptions::default())
}

/// Encode a value to a byte vector.
pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>, encode::Error> {
    let mut output = Vec::new();
    Encoder::new(&mut output, options)?.encode(value)?;
    Ok(output)
}

/// Encode a value to a byte sink with default options.
pub fn to_writer<W: Write>(value: &Value, sink: W) -> Result<(), encode::Error> {
    to_writer_with(value, sink, EncodeOptions::default())
}

/// Encode a value to a byte sink.
pub fn to_writer_with<W: Write>(
    value: &Value,
    sink: W,
    options: EncodeOptions,
) -> Result<(), encode::Error> {
    Encoder::new(sink, options)?.encode(value)
}

/// Decode one value from a byte slice with default options.
pub fn from_slice(data: &[u8]) -> Result<Value, decode::Error> {
    Decoder::new(data).decode()
}

/// Decode one value from a byte slice.
pub fn from_slice_with(data: &[u8], options: DecodeOptions) -> Result<Value, decode::Error> {
    Decoder::with_options(data, options).decode()
}

/// Decode one value from a byte source with default options.
pub fn from_reader<R: Read>(source: R) -> Result<Value, decode::Error> {
    Decoder::new(source).decode()
}

/// Decode one value from a byte source.
pub fn from_reader_with<R: Read>(
    source: R,
    options: DecodeOptions,
) -> Result<Value, decode::Error> {
    Decoder::with_options(source, options).decode()
}
