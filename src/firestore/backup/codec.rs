//! Conversion between store-native values and the portable JSON representation.
//!
//! Plain JSON covers null, booleans, numbers, strings, arrays and maps. Every
//! other type is wrapped in a tag object:
//!
//! ```text
//! {"__datatype__": "timestamp", "value": "2024-05-01T12:00:00.000000001Z"}
//! {"__datatype__": "geopoint", "value": {"latitude": 48.85, "longitude": 2.35}}
//! {"__datatype__": "documentReferenceField", "value": "users/u1"}
//! {"__datatype__": "bytes", "value": "3q2+7w=="}
//! {"__datatype__": "double", "value": "NaN"}
//! ```
//!
//! Timestamps are RFC 3339 strings in UTC with nanosecond precision.

use std::collections::BTreeMap;

use serde_json::{json, Map as JsonMap, Number, Value as JsonValue};

use crate::firestore::error::{invalid_argument, unsupported_type, FirestoreResult};
use crate::firestore::model::{GeoPoint, Timestamp};
use crate::firestore::value::{BytesValue, FirestoreValue, MapValue, ValueKind};

pub const DATATYPE_KEY: &str = "__datatype__";
pub const DATATYPE_VALUE_KEY: &str = "value";

const TIMESTAMP_TAG: &str = "timestamp";
const GEO_POINT_TAG: &str = "geopoint";
const REFERENCE_TAG: &str = "documentReferenceField";
const BYTES_TAG: &str = "bytes";
const DOUBLE_TAG: &str = "double";

/// Encodes a single value into its portable form.
pub fn encode_value(value: &FirestoreValue) -> FirestoreResult<JsonValue> {
    Ok(match value.kind() {
        ValueKind::Null => JsonValue::Null,
        ValueKind::Boolean(boolean) => JsonValue::Bool(*boolean),
        ValueKind::Integer(integer) => JsonValue::Number((*integer).into()),
        ValueKind::Double(double) => match Number::from_f64(*double) {
            Some(number) => JsonValue::Number(number),
            None => tagged(DOUBLE_TAG, JsonValue::String(non_finite_name(*double).into())),
        },
        ValueKind::Timestamp(timestamp) => {
            tagged(TIMESTAMP_TAG, JsonValue::String(timestamp.to_rfc3339()?))
        }
        ValueKind::String(string) => JsonValue::String(string.clone()),
        ValueKind::Bytes(bytes) => tagged(BYTES_TAG, JsonValue::String(bytes.to_base64())),
        ValueKind::Reference(path) => tagged(REFERENCE_TAG, JsonValue::String(path.clone())),
        ValueKind::GeoPoint(point) => tagged(
            GEO_POINT_TAG,
            json!({
                "latitude": point.latitude(),
                "longitude": point.longitude(),
            }),
        ),
        ValueKind::Array(array) => JsonValue::Array(
            array
                .values()
                .iter()
                .map(encode_value)
                .collect::<FirestoreResult<Vec<_>>>()?,
        ),
        ValueKind::Map(map) => {
            if map.fields().contains_key(DATATYPE_KEY) {
                return Err(unsupported_type(format!(
                    "Map field '{DATATYPE_KEY}' collides with the special-type tag"
                )));
            }
            JsonValue::Object(encode_fields(map)?)
        }
        ValueKind::Sentinel(sentinel) => {
            return Err(unsupported_type(format!(
                "Write-only sentinel {sentinel:?} has no portable representation"
            )))
        }
    })
}

/// Encodes the fields of a document (or map value) into a JSON object.
pub fn encode_fields(map: &MapValue) -> FirestoreResult<JsonMap<String, JsonValue>> {
    let mut fields = JsonMap::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value)?);
    }
    Ok(fields)
}

/// Decodes a portable value back into the store-native form.
pub fn decode_value(value: &JsonValue) -> FirestoreResult<FirestoreValue> {
    match value {
        JsonValue::Null => Ok(FirestoreValue::null()),
        JsonValue::Bool(boolean) => Ok(FirestoreValue::from_bool(*boolean)),
        JsonValue::Number(number) => decode_number(number),
        JsonValue::String(string) => Ok(FirestoreValue::from_string(string.clone())),
        JsonValue::Array(values) => Ok(FirestoreValue::from_array(
            values
                .iter()
                .map(decode_value)
                .collect::<FirestoreResult<Vec<_>>>()?,
        )),
        JsonValue::Object(object) => match object.get(DATATYPE_KEY) {
            Some(tag) => decode_tagged(tag, object.get(DATATYPE_VALUE_KEY)),
            None => Ok(FirestoreValue::from_map(decode_fields(object)?.into_fields())),
        },
    }
}

/// Decodes a JSON object into document fields.
pub fn decode_fields(object: &JsonMap<String, JsonValue>) -> FirestoreResult<MapValue> {
    let mut fields = BTreeMap::new();
    for (key, value) in object {
        fields.insert(key.clone(), decode_value(value)?);
    }
    Ok(MapValue::new(fields))
}

fn tagged(tag: &str, payload: JsonValue) -> JsonValue {
    let mut object = JsonMap::new();
    object.insert(DATATYPE_KEY.to_string(), JsonValue::String(tag.to_string()));
    object.insert(DATATYPE_VALUE_KEY.to_string(), payload);
    JsonValue::Object(object)
}

fn non_finite_name(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn decode_number(number: &Number) -> FirestoreResult<FirestoreValue> {
    if let Some(integer) = number.as_i64() {
        return Ok(FirestoreValue::from_integer(integer));
    }
    if number.is_u64() {
        return Err(unsupported_type(format!(
            "Integer {number} does not fit in a signed 64-bit value"
        )));
    }
    number
        .as_f64()
        .map(FirestoreValue::from_double)
        .ok_or_else(|| invalid_argument(format!("Invalid number {number}")))
}

fn decode_tagged(tag: &JsonValue, payload: Option<&JsonValue>) -> FirestoreResult<FirestoreValue> {
    let tag = tag
        .as_str()
        .ok_or_else(|| invalid_argument(format!("{DATATYPE_KEY} must be a string")))?;
    let payload =
        payload.ok_or_else(|| invalid_argument(format!("Tagged '{tag}' value has no payload")))?;

    match tag {
        TIMESTAMP_TAG => {
            let text = expect_str(tag, payload)?;
            Ok(FirestoreValue::from_timestamp(Timestamp::parse_rfc3339(text)?))
        }
        GEO_POINT_TAG => {
            let latitude = payload
                .get("latitude")
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| invalid_argument("geopoint latitude must be a number"))?;
            let longitude = payload
                .get("longitude")
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| invalid_argument("geopoint longitude must be a number"))?;
            Ok(FirestoreValue::from_geo_point(GeoPoint::new(
                latitude, longitude,
            )?))
        }
        REFERENCE_TAG => Ok(FirestoreValue::from_reference(expect_str(tag, payload)?)),
        BYTES_TAG => {
            let encoded = expect_str(tag, payload)?;
            let bytes = BytesValue::from_base64(encoded)
                .map_err(|err| invalid_argument(format!("Invalid base64 payload: {err}")))?;
            Ok(FirestoreValue::from_bytes(bytes))
        }
        DOUBLE_TAG => match expect_str(tag, payload)? {
            "NaN" => Ok(FirestoreValue::from_double(f64::NAN)),
            "Infinity" => Ok(FirestoreValue::from_double(f64::INFINITY)),
            "-Infinity" => Ok(FirestoreValue::from_double(f64::NEG_INFINITY)),
            other => Err(invalid_argument(format!("Invalid special double '{other}'"))),
        },
        other => Err(unsupported_type(format!("Unknown {DATATYPE_KEY} '{other}'"))),
    }
}

fn expect_str<'a>(tag: &str, payload: &'a JsonValue) -> FirestoreResult<&'a str> {
    payload
        .as_str()
        .ok_or_else(|| invalid_argument(format!("Tagged '{tag}' payload must be a string")))
}
