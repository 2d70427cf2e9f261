#![cfg(test)]
use chrono::{NaiveDate, TimeZone, Utc};
use hex_literal::hex;
use num_bigint::BigInt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::decode::{DecodeOptions, Decoder, Error, StrErrors};
use crate::value::{CborMap, Complex, MimeMessage, Rational, Value};
use crate::{from_slice, from_slice_with};

fn decode(data: &[u8]) -> Value {
    from_slice(data).unwrap()
}

fn decode_err(data: &[u8]) -> Error {
    from_slice(data).unwrap_err()
}

fn text(s: &str) -> Value {
    Value::Text(s.into())
}

fn map(entries: Vec<(Value, Value)>) -> Value {
    Value::Map(entries.into_iter().collect::<CborMap>())
}

#[test]
fn rfc_integers() {
    // RFC 8949, Appendix A:
    // https://www.rfc-editor.org/rfc/rfc8949.html#section-appendix.a
    assert_eq!(decode(&hex!("00")), Value::Unsigned(0));
    assert_eq!(decode(&hex!("01")), Value::Unsigned(1));
    assert_eq!(decode(&hex!("0a")), Value::Unsigned(10));
    assert_eq!(decode(&hex!("17")), Value::Unsigned(23));
    assert_eq!(decode(&hex!("1818")), Value::Unsigned(24));
    assert_eq!(decode(&hex!("1864")), Value::Unsigned(100));
    assert_eq!(decode(&hex!("1903e8")), Value::Unsigned(1000));
    assert_eq!(decode(&hex!("1a000f4240")), Value::Unsigned(1000000));
    assert_eq!(
        decode(&hex!("1b000000e8d4a51000")),
        Value::Unsigned(1000000000000)
    );
    assert_eq!(
        decode(&hex!("1bffffffffffffffff")),
        Value::Unsigned(u64::MAX)
    );
    assert_eq!(decode(&hex!("20")), Value::Negative(0));
    assert_eq!(decode(&hex!("29")), Value::Negative(9));
    assert_eq!(decode(&hex!("3863")), Value::Negative(99));
    assert_eq!(decode(&hex!("3903e7")), Value::Negative(999));

    // Non-shortest header forms are accepted
    assert_eq!(decode(&hex!("1800")), Value::Unsigned(0));
    assert_eq!(decode(&hex!("1b0000000000000001")), Value::Unsigned(1));
}

#[test]
fn rfc_bignums() {
    assert_eq!(
        decode(&hex!("c249010000000000000000")),
        Value::Big(BigInt::from(u64::MAX) + 1)
    );
    assert_eq!(
        decode(&hex!("c349010000000000000000")),
        Value::Big(-BigInt::from(u64::MAX) - 2)
    );
    // Bignums inside the native range normalize to it
    assert_eq!(decode(&hex!("c24101")), Value::Unsigned(1));
    assert_eq!(decode(&hex!("c34101")), Value::Negative(1));
}

#[test]
fn rfc_floats() {
    assert_eq!(decode(&hex!("f90000")), Value::Float(0.0));
    assert_eq!(decode(&hex!("f98000")), Value::Float(-0.0));
    assert_eq!(decode(&hex!("f93c00")), Value::Float(1.0));
    assert_eq!(decode(&hex!("fb3ff199999999999a")), Value::Float(1.1));
    assert_eq!(decode(&hex!("f93e00")), Value::Float(1.5));
    assert_eq!(decode(&hex!("f97bff")), Value::Float(65504.0));
    assert_eq!(decode(&hex!("fa47c35000")), Value::Float(100000.0));
    assert_eq!(
        decode(&hex!("fa7f7fffff")),
        Value::Float(3.4028234663852886e38)
    );
    assert_eq!(decode(&hex!("fb7e37e43c8800759c")), Value::Float(1.0e300));
    assert_eq!(decode(&hex!("f90001")), Value::Float(5.960464477539063e-8));
    assert_eq!(decode(&hex!("f90400")), Value::Float(0.00006103515625));
    assert_eq!(decode(&hex!("f9c400")), Value::Float(-4.0));
    assert_eq!(decode(&hex!("fbc010666666666666")), Value::Float(-4.1));
    assert_eq!(decode(&hex!("f97c00")), Value::Float(f64::INFINITY));
    assert_eq!(decode(&hex!("f9fc00")), Value::Float(f64::NEG_INFINITY));
    assert!(matches!(decode(&hex!("f97e00")), Value::Float(f) if f.is_nan()));
    assert!(matches!(decode(&hex!("fa7fc00000")), Value::Float(f) if f.is_nan()));
    assert!(matches!(decode(&hex!("fb7ff8000000000000")), Value::Float(f) if f.is_nan()));
}

#[test]
fn rfc_simple_values() {
    assert_eq!(decode(&hex!("f4")), Value::Bool(false));
    assert_eq!(decode(&hex!("f5")), Value::Bool(true));
    assert_eq!(decode(&hex!("f6")), Value::Null);
    assert_eq!(decode(&hex!("f7")), Value::Undefined);
    assert_eq!(decode(&hex!("f0")), Value::Simple(16));
    assert_eq!(decode(&hex!("f8ff")), Value::Simple(255));
    assert_eq!(decode(&hex!("f820")), Value::Simple(32));
}

#[test]
fn rfc_strings() {
    assert_eq!(decode(&hex!("40")), Value::Bytes(vec![]));
    assert_eq!(decode(&hex!("4401020304")), Value::Bytes(vec![1, 2, 3, 4]));
    assert_eq!(decode(&hex!("60")), text(""));
    assert_eq!(decode(&hex!("6161")), text("a"));
    assert_eq!(decode(&hex!("6449455446")), text("IETF"));
    assert_eq!(decode(&hex!("62225c")), text("\"\\"));
    assert_eq!(decode(&hex!("62c3bc")), text("\u{fc}"));
    assert_eq!(decode(&hex!("63e6b0b4")), text("\u{6c34}"));
}

#[test]
fn rfc_arrays_and_maps() {
    assert_eq!(decode(&hex!("80")), Value::Array(vec![]));
    assert_eq!(
        decode(&hex!("83010203")),
        Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2), Value::Unsigned(3)])
    );
    assert_eq!(decode(&hex!("a0")), map(vec![]));
    assert_eq!(
        decode(&hex!("a201020304")),
        map(vec![
            (Value::Unsigned(1), Value::Unsigned(2)),
            (Value::Unsigned(3), Value::Unsigned(4)),
        ])
    );
    assert_eq!(
        decode(&hex!("a26161016162820203")),
        map(vec![
            (text("a"), Value::Unsigned(1)),
            (
                text("b"),
                Value::Array(vec![Value::Unsigned(2), Value::Unsigned(3)])
            ),
        ])
    );
    // Duplicate keys are allowed; the last value wins
    assert_eq!(
        decode(&hex!("a2616101616102")),
        map(vec![(text("a"), Value::Unsigned(2))])
    );
}

#[test]
fn indefinite_lengths() {
    assert_eq!(
        decode(&hex!("5f42010243030405ff")),
        Value::Bytes(vec![1, 2, 3, 4, 5])
    );
    assert_eq!(decode(&hex!("7f657374726561646d696e67ff")), text("streaming"));
    assert_eq!(decode(&hex!("9fff")), Value::Array(vec![]));
    assert_eq!(
        decode(&hex!("9f018202039f0405ffff")),
        Value::Array(vec![
            Value::Unsigned(1),
            Value::Array(vec![Value::Unsigned(2), Value::Unsigned(3)]),
            Value::Array(vec![Value::Unsigned(4), Value::Unsigned(5)]),
        ])
    );
    assert_eq!(
        decode(&hex!("bf61610161629f0203ffff")),
        map(vec![
            (text("a"), Value::Unsigned(1)),
            (
                text("b"),
                Value::Array(vec![Value::Unsigned(2), Value::Unsigned(3)])
            ),
        ])
    );
}

#[test]
fn datetime_tags() {
    let expected = Utc
        .with_ymd_and_hms(2013, 3, 21, 20, 4, 0)
        .unwrap()
        .fixed_offset();
    assert_eq!(
        decode(&hex!("c074323031332d30332d32315432303a30343a30305a")),
        Value::DateTime(expected)
    );
    assert_eq!(decode(&hex!("c11a514b67b0")), Value::DateTime(expected));
    let with_fraction = Utc.timestamp_opt(1363896240, 500_000_000).unwrap();
    assert_eq!(
        decode(&hex!("c1fb41d452d9ec200000")),
        Value::DateTime(with_fraction.fixed_offset())
    );
    // Tag 55799 is inert
    assert_eq!(
        decode(&hex!("d9d9f7c074323031332d30332d32315432303a30343a30305a")),
        Value::DateTime(expected)
    );
    assert!(matches!(decode_err(&hex!("c001")), Error::Value(_)));
}

#[test]
fn date_tags() {
    let date = NaiveDate::from_ymd_opt(2013, 3, 21).unwrap();
    assert_eq!(
        decode(&hex!("d903ec6a323031332d30332d3231")),
        Value::Date(date)
    );
    assert_eq!(decode(&hex!("d864193da9")), Value::Date(date));
    assert_eq!(
        decode(&hex!("d86400")),
        Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    );
    assert_eq!(
        decode(&hex!("d86420")),
        Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap())
    );
}

#[test]
fn decimal_tags() {
    assert_eq!(
        decode(&hex!("c48221196ab3")),
        Value::Decimal("273.15".parse().unwrap())
    );
    // Bigfloat 1.5 = 3 * 2^-1
    assert_eq!(
        decode(&hex!("c5822003")),
        Value::Decimal("1.5".parse().unwrap())
    );
    // Bigfloat with a positive exponent: 3 * 2^2
    assert_eq!(
        decode(&hex!("c5820203")),
        Value::Decimal("12".parse().unwrap())
    );
    assert!(matches!(decode_err(&hex!("c401")), Error::Value(_)));
    assert!(matches!(decode_err(&hex!("c483010203")), Error::Value(_)));
}

#[test]
fn rational_tag() {
    assert_eq!(
        decode(&hex!("d81e820102")),
        Value::Rational(Rational {
            numerator: BigInt::from(1),
            denominator: BigInt::from(2),
        })
    );
    // Zero denominator is rejected
    assert!(matches!(decode_err(&hex!("d81e820100")), Error::Value(_)));
}

#[test]
fn regex_and_mime_tags() {
    let value = decode(&hex!("d82365685c642b24"));
    let Value::Regex(pattern) = value else {
        panic!("expected a regex, got {value:?}");
    };
    assert_eq!(pattern.as_str(), "h\\d+$");
    assert!(pattern.is_match("h123"));
    assert!(matches!(decode_err(&hex!("d8236328282a")), Error::Value(_)));
}

#[test]
fn uuid_tag() {
    assert_eq!(
        decode(&hex!("d82550000102030405060708090a0b0c0d0e0f")),
        Value::Uuid(uuid::Uuid::from_bytes([
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15
        ]))
    );
    assert!(matches!(decode_err(&hex!("d8254101")), Error::Value(_)));
}

#[test]
fn ip_address_tags() {
    assert_eq!(
        decode(&hex!("d83444c0a80001")),
        Value::Address(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)))
    );
    assert_eq!(
        decode(&hex!("d8365000000000000000000000000000000001")),
        Value::Address(IpAddr::V6(Ipv6Addr::LOCALHOST))
    );
    // Network form: [prefixlen, addr] with trailing zeroes stripped
    assert_eq!(
        decode(&hex!("d83482181842c0a8")),
        Value::Network("192.168.0.0/24".parse().unwrap())
    );
    // Interface form: [addr, prefixlen]
    assert_eq!(
        decode(&hex!("d8348244c0a800011818")),
        Value::Network("192.168.0.1/24".parse().unwrap())
    );
    // Deprecated tag 260 addresses
    assert_eq!(
        decode(&hex!("d9010444c00a0a01")),
        Value::Address(IpAddr::V4(Ipv4Addr::new(192, 10, 10, 1)))
    );
    // A 6-byte payload is a MAC address and stays tagged
    assert_eq!(
        decode(&hex!("d9010446010203040506")),
        Value::Tag(260, Box::new(Value::Bytes(vec![1, 2, 3, 4, 5, 6])))
    );
    // Deprecated tag 261 networks
    assert_eq!(
        decode(&hex!("d90105a144c0a800001818")),
        Value::Network("192.168.0.0/24".parse().unwrap())
    );
    assert!(matches!(decode_err(&hex!("d83443c0a800")), Error::Value(_)));
}

#[test]
fn set_tag() {
    assert_eq!(
        decode(&hex!("d9010283010203")),
        Value::Set(vec![Value::Unsigned(1), Value::Unsigned(2), Value::Unsigned(3)])
    );
    // Duplicate elements collapse
    assert_eq!(
        decode(&hex!("d901028401010202")),
        Value::Set(vec![Value::Unsigned(1), Value::Unsigned(2)])
    );
}

#[test]
fn complex_tag() {
    assert_eq!(
        decode(&hex!("d9a7f882f93c00f94000")),
        Value::Complex(Complex { re: 1.0, im: 2.0 })
    );
}

#[test]
fn unknown_tags() {
    assert_eq!(
        decode(&hex!("d904d26568656c6c6f")),
        Value::Tag(1234, Box::new(text("hello")))
    );
    assert_eq!(
        decode(&hex!("d904d2d904d301")),
        Value::Tag(1234, Box::new(Value::Tag(1235, Box::new(Value::Unsigned(1)))))
    );
}

#[test]
fn shareable_tags() {
    assert_eq!(
        decode(&hex!("d81c81d81d00")),
        Value::Shareable(Box::new(Value::Array(vec![Value::SharedRef(0)])))
    );
    assert_eq!(
        decode(&hex!("82d81c816161d81d00")),
        Value::Array(vec![
            Value::Shareable(Box::new(Value::Array(vec![text("a")]))),
            Value::SharedRef(0),
        ])
    );
    // References must point at an allocated slot
    assert!(matches!(decode_err(&hex!("d81d00")), Error::Value(_)));
    assert!(matches!(
        decode_err(&hex!("82d81c816161d81d01")),
        Error::Value(_)
    ));
}

#[test]
fn string_references() {
    assert_eq!(
        decode(&hex!("d901008263616263d81900")),
        Value::Array(vec![text("abc"), text("abc")])
    );
    // Bytes and text share one index space
    assert_eq!(
        decode(&hex!("d90100844341414163616263d81900d81901")),
        Value::Array(vec![
            Value::Bytes(b"AAA".to_vec()),
            text("abc"),
            Value::Bytes(b"AAA".to_vec()),
            text("abc"),
        ])
    );
    // Strings shorter than 3 bytes are not registered
    assert!(matches!(
        decode_err(&hex!("d9010082626162d81900")),
        Error::Value(_)
    ));
    // A reference outside any namespace fails
    assert!(matches!(decode_err(&hex!("d81900")), Error::Value(_)));
    // Inner namespaces do not leak into the outer one
    assert!(matches!(
        decode_err(&hex!("d9010082d901008263616263d81900")),
        Error::Value(_)
    ));
}

#[test]
fn utf8_policies() {
    assert!(matches!(decode_err(&hex!("62c328")), Error::Value(_)));
    assert_eq!(
        from_slice_with(
            &hex!("62c328"),
            DecodeOptions::new().str_errors(StrErrors::Replace)
        )
        .unwrap(),
        text("\u{fffd}(")
    );
    assert_eq!(
        from_slice_with(
            &hex!("62c328"),
            DecodeOptions::new().str_errors(StrErrors::Ignore)
        )
        .unwrap(),
        text("(")
    );
}

#[test]
fn decode_errors() {
    // Stray break marker
    assert!(matches!(decode_err(&hex!("ff")), Error::Value(_)));
    assert!(matches!(decode_err(&hex!("8301ff03")), Error::Value(_)));
    // Truncated input
    assert!(matches!(decode_err(&hex!("18")), Error::Eof { .. }));
    assert!(matches!(decode_err(&hex!("1903")), Error::Eof { .. }));
    assert!(matches!(decode_err(&hex!("81")), Error::Eof { .. }));
    assert!(matches!(decode_err(&hex!("a101")), Error::Eof { .. }));
    assert!(matches!(decode_err(&hex!("62e6")), Error::Eof { .. }));
    // Reserved subtypes
    assert!(matches!(decode_err(&hex!("1c")), Error::Value(_)));
    assert!(matches!(decode_err(&hex!("fc")), Error::Value(_)));
    // Two-byte simple values below 32 are invalid
    assert!(matches!(decode_err(&hex!("f81f")), Error::Value(_)));
    // Indefinite chunks must match the outer major type
    assert!(matches!(decode_err(&hex!("5f41016161ff")), Error::Value(_)));
    assert!(matches!(decode_err(&hex!("7f4101ff")), Error::Value(_)));
    // Indefinite lengths are not valid for integers or tags
    assert!(matches!(decode_err(&hex!("1f")), Error::Value(_)));
    assert!(matches!(decode_err(&hex!("3f")), Error::Value(_)));
}

#[test]
fn recursion_limit() {
    let mut data = vec![0x81u8; 1100];
    data.push(0x01);
    let err = from_slice(&data).unwrap_err();
    assert!(matches!(err, Error::Value(ref msg) if msg.contains("recursion")));

    let mut shallow = vec![0x81u8; 100];
    shallow.push(0x01);
    assert!(
        from_slice_with(&shallow, DecodeOptions::new().max_depth(10)).is_err()
    );
}

#[test]
fn sequences_share_the_buffer() {
    let data = hex!("0102830405066161");
    let mut decoder = Decoder::new(&data[..]);
    assert_eq!(decoder.decode().unwrap(), Value::Unsigned(1));
    assert_eq!(decoder.decode().unwrap(), Value::Unsigned(2));
    assert_eq!(
        decoder.decode().unwrap(),
        Value::Array(vec![Value::Unsigned(4), Value::Unsigned(5), Value::Unsigned(6)])
    );
    assert_eq!(decoder.decode().unwrap(), text("a"));
    assert!(matches!(decoder.decode(), Err(Error::Eof { .. })));
}

#[test]
fn exact_reads_leave_the_source() {
    let data = hex!("8301020304");
    let mut remaining = &data[..];
    let mut decoder = Decoder::with_options(&mut remaining, DecodeOptions::new().read_size(0));
    decoder.decode().unwrap();
    drop(decoder);
    assert_eq!(remaining, hex!("04"));
}

#[test]
fn tag_hook() {
    let mut decoder = Decoder::new(&hex!("d904d26568656c6c6f")[..]);
    decoder.set_tag_hook(|_, tag, value| {
        Ok(Value::Array(vec![Value::Unsigned(tag), value]))
    });
    assert_eq!(
        decoder.decode().unwrap(),
        Value::Array(vec![Value::Unsigned(1234), text("hello")])
    );
}

#[test]
fn tag_hook_embedded_cbor() {
    let mut decoder = Decoder::new(&hex!("d904d24483010203")[..]);
    decoder.set_tag_hook(|decoder, _, value| match value {
        Value::Bytes(bytes) => decoder.decode_from_bytes(&bytes),
        other => Ok(other),
    });
    assert_eq!(
        decoder.decode().unwrap(),
        Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2), Value::Unsigned(3)])
    );
}

#[test]
fn object_hook() {
    let mut decoder = Decoder::new(&hex!("a26161016162a16163f5")[..]);
    decoder.set_object_hook(|_, map| Ok(Value::Unsigned(map.len() as u64)));
    assert_eq!(decoder.decode().unwrap(), Value::Unsigned(2));
}

#[test]
fn immutable_contexts() {
    // Maps, tuples and tagged payloads are decodable as map keys
    assert_eq!(
        decode(&hex!("a1820102f5")),
        map(vec![(
            Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2)]),
            Value::Bool(true)
        )])
    );
    let mut decoder = Decoder::new(&hex!("a1d904d20101")[..]);
    decoder.set_tag_hook(|decoder, tag, value| {
        assert!(decoder.immutable());
        Ok(Value::Tag(tag, Box::new(value)))
    });
    decoder.decode().unwrap();
}

#[test]
fn mime_tag() {
    assert_eq!(
        decode(&hex!("d82464613a2062")),
        Value::Mime(MimeMessage("a: b".into()))
    );
}
