//! Type-tagging codec
//!
//! Hash fields live in a string-only representation on both backends, so a
//! field written as one kind must come back as that kind. Every value is
//! encoded as `"<kind>:<payload>"` and the tag drives reconstruction on the
//! way out. Both backends use this module, which keeps field encodings
//! bit-identical whether they sit in process memory or in the remote store.
//!
//! Decoding is forgiving on purpose: strings with no tag, or with a tag this
//! version does not know, pass through unchanged. A tagged payload that
//! fails its parse falls back to the raw payload string rather than erroring.

use crate::error::{CacheError, Result};
use crate::value::CacheValue;

const TAG_BOOL: &str = "bool";
const TAG_INT: &str = "int";
const TAG_FLOAT: &str = "float";
const TAG_STRING: &str = "string";
const TAG_BYTES: &str = "bytes";
const TAG_JSON: &str = "json";

// == Encode ==
/// Encodes a value into its tagged string form.
///
/// Bytes are hex-encoded; structured values are serialized to JSON. Fails
/// with [`CacheError::Encoding`] only when JSON serialization itself fails.
pub fn encode(value: &CacheValue) -> Result<String> {
    let tagged = match value {
        CacheValue::Bool(true) => format!("{}:true", TAG_BOOL),
        CacheValue::Bool(false) => format!("{}:false", TAG_BOOL),
        CacheValue::Int(i) => format!("{}:{}", TAG_INT, i),
        CacheValue::Float(f) => format!("{}:{}", TAG_FLOAT, f),
        CacheValue::Str(s) => format!("{}:{}", TAG_STRING, s),
        CacheValue::Bytes(b) => format!("{}:{}", TAG_BYTES, hex::encode(b)),
        CacheValue::Json(v) => {
            let payload =
                serde_json::to_string(v).map_err(|e| CacheError::Encoding(e.to_string()))?;
            format!("{}:{}", TAG_JSON, payload)
        }
    };
    Ok(tagged)
}

// == Decode ==
/// Decodes a tagged string back into a value.
///
/// Splits on the first `:`. Unknown or missing tags return the input
/// unchanged as a string, so data written by a newer version still reads.
pub fn decode(tagged: &str) -> CacheValue {
    let Some((tag, payload)) = tagged.split_once(':') else {
        return CacheValue::Str(tagged.to_string());
    };

    match tag {
        TAG_BOOL => CacheValue::Bool(payload == "true"),
        TAG_INT => match payload.parse::<i64>() {
            Ok(i) => CacheValue::Int(i),
            Err(_) => CacheValue::Str(payload.to_string()),
        },
        TAG_FLOAT => match payload.parse::<f64>() {
            Ok(f) => CacheValue::Float(f),
            Err(_) => CacheValue::Str(payload.to_string()),
        },
        TAG_STRING => CacheValue::Str(payload.to_string()),
        TAG_BYTES => match hex::decode(payload) {
            Ok(b) => CacheValue::Bytes(b),
            Err(_) => CacheValue::Str(payload.to_string()),
        },
        TAG_JSON => match serde_json::from_str(payload) {
            Ok(v) => CacheValue::Json(v),
            // Unparseable JSON keeps the raw payload; callers tolerate this.
            Err(_) => CacheValue::Str(payload.to_string()),
        },
        _ => CacheValue::Str(tagged.to_string()),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_bool() {
        assert_eq!(encode(&CacheValue::Bool(true)).unwrap(), "bool:true");
        assert_eq!(encode(&CacheValue::Bool(false)).unwrap(), "bool:false");
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&CacheValue::Int(-17)).unwrap(), "int:-17");
        assert_eq!(encode(&CacheValue::Float(100.5)).unwrap(), "float:100.5");
        assert_eq!(
            encode(&CacheValue::Str("hello".into())).unwrap(),
            "string:hello"
        );
        assert_eq!(
            encode(&CacheValue::Bytes(vec![0xde, 0xad])).unwrap(),
            "bytes:dead"
        );
    }

    #[test]
    fn test_encode_json() {
        let v = CacheValue::Json(serde_json::json!({"a": 1}));
        assert_eq!(encode(&v).unwrap(), r#"json:{"a":1}"#);
    }

    #[test]
    fn test_decode_known_tags() {
        assert_eq!(decode("bool:true"), CacheValue::Bool(true));
        assert_eq!(decode("int:42"), CacheValue::Int(42));
        assert_eq!(decode("float:2.5"), CacheValue::Float(2.5));
        assert_eq!(decode("string:plain"), CacheValue::Str("plain".into()));
        assert_eq!(decode("bytes:dead"), CacheValue::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn test_decode_string_payload_containing_colon() {
        // Only the first colon separates tag from payload.
        assert_eq!(
            decode("string:a:b:c"),
            CacheValue::Str("a:b:c".to_string())
        );
    }

    #[test]
    fn test_decode_untagged_passes_through() {
        assert_eq!(decode("no tag here"), CacheValue::Str("no tag here".into()));
    }

    #[test]
    fn test_decode_unknown_tag_passes_through() {
        assert_eq!(
            decode("uuid:1234"),
            CacheValue::Str("uuid:1234".to_string())
        );
    }

    #[test]
    fn test_decode_malformed_payload_falls_back_to_string() {
        assert_eq!(decode("int:abc"), CacheValue::Str("abc".to_string()));
        assert_eq!(decode("bytes:zz"), CacheValue::Str("zz".to_string()));
    }

    #[test]
    fn test_decode_unparseable_json_falls_back_to_payload() {
        assert_eq!(
            decode("json:{broken"),
            CacheValue::Str("{broken".to_string())
        );
    }

    #[test]
    fn test_decode_valid_json() {
        assert_eq!(
            decode(r#"json:[1,2,3]"#),
            CacheValue::Json(serde_json::json!([1, 2, 3]))
        );
    }

    // == Round-trip Properties ==
    proptest! {
        #[test]
        fn prop_round_trip_int(i in any::<i64>()) {
            let v = CacheValue::Int(i);
            prop_assert_eq!(decode(&encode(&v).unwrap()), v);
        }

        #[test]
        fn prop_round_trip_float(f in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let v = CacheValue::Float(f);
            prop_assert_eq!(decode(&encode(&v).unwrap()), v);
        }

        #[test]
        fn prop_round_trip_string(s in "[a-zA-Z0-9 :_/-]{0,64}") {
            let v = CacheValue::Str(s);
            prop_assert_eq!(decode(&encode(&v).unwrap()), v);
        }

        #[test]
        fn prop_round_trip_bytes(b in proptest::collection::vec(any::<u8>(), 0..64)) {
            let v = CacheValue::Bytes(b);
            prop_assert_eq!(decode(&encode(&v).unwrap()), v);
        }

        #[test]
        fn prop_round_trip_bool(b in any::<bool>()) {
            let v = CacheValue::Bool(b);
            prop_assert_eq!(decode(&encode(&v).unwrap()), v);
        }
    }
}
