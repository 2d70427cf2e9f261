/*!
Lossy conversion from CBOR values to JSON
*/

use base64::prelude::*;
use cobre_cbor::Value;
use serde_json::json;

/// Render a decoded CBOR value as JSON. Byte strings become base64 text,
/// bignums become decimal strings, tags not listed in `ignore_tags` become
/// `{"tag": n, "value": v}` objects and non-text map keys are stringified.
pub fn to_json(value: &Value, ignore_tags: &[u64], sort_keys: bool) -> serde_json::Value {
    match value {
        Value::Unsigned(n) => json!(n),
        Value::Negative(n) => match i64::try_from(*n) {
            Ok(n) => json!(-1 - n),
            Err(_) => json!(format!("-{}", u128::from(*n) + 1)),
        },
        Value::Big(n) => json!(n.to_string()),
        Value::Bytes(bytes) => json!(BASE64_STANDARD.encode(bytes)),
        Value::Text(text) => json!(text),
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| to_json(item, ignore_tags, sort_keys))
                .collect(),
        ),
        Value::Map(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map
                .iter()
                .map(|(key, value)| {
                    let key = match key {
                        Value::Text(text) => text.clone(),
                        other => to_json(other, ignore_tags, sort_keys).to_string(),
                    };
                    (key, to_json(value, ignore_tags, sort_keys))
                })
                .collect();
            if sort_keys {
                entries.sort_by(|a, b| a.0.cmp(&b.0));
            }
            serde_json::Value::Object(entries.into_iter().collect())
        }
        Value::Tag(tag, inner) if ignore_tags.contains(tag) => {
            to_json(inner, ignore_tags, sort_keys)
        }
        Value::Tag(tag, inner) => json!({
            "tag": tag,
            "value": to_json(inner, ignore_tags, sort_keys),
        }),
        Value::Bool(b) => json!(b),
        Value::Null | Value::Undefined => serde_json::Value::Null,
        Value::Simple(v) => json!(format!("simple({v})")),
        Value::Float(f) if f.is_nan() => json!("NaN"),
        Value::Float(f) if *f == f64::INFINITY => json!("Infinity"),
        Value::Float(f) if *f == f64::NEG_INFINITY => json!("-Infinity"),
        Value::Float(f) => json!(f),
        Value::Break => json!("break"),
        Value::Shareable(inner) => to_json(inner, ignore_tags, sort_keys),
        Value::SharedRef(index) => json!({ "shared_ref": index }),
        Value::DateTime(dt) => json!(dt.to_rfc3339()),
        Value::NaiveDateTime(dt) => json!(dt.to_string()),
        Value::Date(date) => json!(date.format("%Y-%m-%d").to_string()),
        Value::Decimal(decimal) => json!(decimal.to_string()),
        Value::Rational(rational) => {
            json!(format!("{}/{}", rational.numerator, rational.denominator))
        }
        Value::Regex(pattern) => json!(pattern.as_str()),
        Value::Mime(message) => json!(message.0),
        Value::Uuid(uuid) => json!(uuid.to_string()),
        Value::Address(address) => json!(address.to_string()),
        Value::Network(network) => json!(network.to_string()),
        Value::Set(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| to_json(item, ignore_tags, sort_keys))
                .collect(),
        ),
        Value::Complex(complex) => json!({ "real": complex.re, "imag": complex.im }),
    }
}

#[cfg(test)]
mod tests {
    use super::to_json;
    use cobre_cbor::from_slice;
    use hex_literal::hex;

    fn dump(data: &[u8]) -> String {
        to_json(&from_slice(data).unwrap(), &[], false).to_string()
    }

    #[test]
    fn scalars() {
        assert_eq!(dump(&hex!("01")), "1");
        assert_eq!(dump(&hex!("20")), "-1");
        assert_eq!(dump(&hex!("f5")), "true");
        assert_eq!(dump(&hex!("f6")), "null");
        assert_eq!(dump(&hex!("6161")), "\"a\"");
        assert_eq!(dump(&hex!("4101")), "\"AQ==\"");
        assert_eq!(dump(&hex!("c249010000000000000000")), "\"18446744073709551616\"");
    }

    #[test]
    fn containers() {
        assert_eq!(dump(&hex!("83010203")), "[1,2,3]");
        assert_eq!(dump(&hex!("a26161016102f5")), "{\"a\":1,\"2\":true}");
    }

    #[test]
    fn tags() {
        assert_eq!(
            dump(&hex!("d904d26161")),
            "{\"tag\":1234,\"value\":\"a\"}"
        );
        assert_eq!(
            to_json(&from_slice(&hex!("d904d26161")).unwrap(), &[1234], false).to_string(),
            "\"a\""
        );
    }

    #[test]
    fn sorted_keys() {
        assert_eq!(
            to_json(&from_slice(&hex!("a2616201616101")).unwrap(), &[], true).to_string(),
            "{\"a\":1,\"b\":1}"
        );
    }
}
