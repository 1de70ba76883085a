use crate::errors::Error;
use crate::types::{Element, Value};
use serde_json::{Map, Value as JsonValue};

use super::{ProjectionOptions, to_json};

fn conversion(expected: &'static str, reason: impl Into<String>) -> Error {
    Error::Conversion {
        expected,
        reason: reason.into(),
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn parse_bool(text: &str) -> Result<bool, Error> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(conversion(
            "Bool",
            format!("`{}` is not one of true/false/1/0/yes/no/on/off", other),
        )),
    }
}

fn parse_number(expected: &'static str, text: &str) -> Result<f64, Error> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| conversion(expected, format!("`{}`: {}", text, e)))
}

/// Guess a value for text typed into a slot that held `null` or `undefined`
fn infer_scalar(text: &str) -> Value {
    match text.trim() {
        "null" => return Value::Null,
        "undefined" => return Value::Undefined,
        _ => {}
    }
    match serde_json::from_str::<JsonValue>(text) {
        Ok(json @ (JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_))) => {
            infer(&json)
        }
        _ => Value::String(text.to_string()),
    }
}

/// Parse `text` into a value of the same kind as `original`
///
/// Scalars are parsed directly, composite values take JSON that has the same shape as the original
pub fn convert_text(original: &Value, text: &str) -> Result<Value, Error> {
    match original {
        Value::AMF3(inner) => Ok(Value::AMF3(Box::new(convert_text(inner, text)?))),
        Value::Bool(_) => parse_bool(text).map(Value::Bool),
        Value::Integer(_) => text
            .trim()
            .parse::<i32>()
            .map(Value::Integer)
            .map_err(|e| conversion("Integer", format!("`{}`: {}", text, e))),
        Value::Number(_) => parse_number("Number", text).map(Value::Number),
        Value::Date(_, time_zone) => parse_number("Date", text).map(|ms| Value::Date(ms, *time_zone)),
        Value::String(_) => Ok(Value::String(text.to_string())),
        Value::XML(_, e4x) => Ok(Value::XML(text.to_string(), *e4x)),
        Value::Null | Value::Undefined => Ok(infer_scalar(text)),
        Value::Unsupported(_) => Err(conversion(
            "Unsupported",
            "skipped values can't be edited",
        )),
        composite => {
            let json: JsonValue = serde_json::from_str(text)
                .map_err(|e| conversion(composite.kind(), format!("invalid JSON: {}", e)))?;
            from_json(composite, &json)
        }
    }
}

/// Build a value from JSON without a template
///
/// Numbers become `Number`, arrays `StrictArray` and objects anonymous `Object`s
pub fn infer(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::StrictArray(items.iter().map(infer).collect()),
        JsonValue::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Element::new(k.clone(), infer(v)))
                .collect(),
            None,
        ),
    }
}

fn members_from_json(
    original: &[Element],
    map: &Map<String, JsonValue>,
) -> Result<Vec<Element>, Error> {
    map.iter()
        .map(|(k, v)| {
            let value = match original.iter().find(|e| &e.name == k) {
                Some(e) => from_json(&e.value, v)?,
                None => infer(v),
            };
            Ok(Element::new(k.clone(), value))
        })
        .collect()
}

/// Elements at an existing position follow the original, extra elements are inferred
fn items_from_json(original: &[Value], items: &[JsonValue]) -> Result<Vec<Value>, Error> {
    items
        .iter()
        .enumerate()
        .map(|(i, json)| match original.get(i) {
            Some(template) => from_json(template, json),
            None => Ok(infer(json)),
        })
        .collect()
}

fn numbers_from_json<T>(
    expected: &'static str,
    items: &[JsonValue],
    convert: impl Fn(&serde_json::Number) -> Option<T>,
) -> Result<Vec<T>, Error> {
    items
        .iter()
        .map(|json| match json {
            JsonValue::Number(n) => {
                convert(n).ok_or_else(|| conversion(expected, format!("{} is out of range", n)))
            }
            other => Err(conversion(
                expected,
                format!("expected a number but found {}", json_kind(other)),
            )),
        })
        .collect()
}

/// Build a value from JSON, following the shape of `original`
pub fn from_json(original: &Value, json: &JsonValue) -> Result<Value, Error> {
    let mismatch = || conversion(original.kind(), format!("found {}", json_kind(json)));

    Ok(match (original, json) {
        (Value::AMF3(inner), json) => Value::AMF3(Box::new(from_json(inner, json)?)),
        (Value::Null | Value::Undefined, JsonValue::Null) => original.clone(),
        (Value::Null | Value::Undefined, json) => infer(json),
        (Value::Bool(_), JsonValue::Bool(b)) => Value::Bool(*b),
        (Value::Number(_), JsonValue::Number(n)) => Value::Number(n.as_f64().ok_or_else(mismatch)?),
        (Value::Integer(_), JsonValue::Number(n)) => Value::Integer(
            n.as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| conversion("Integer", format!("{} is not a 32 bit integer", n)))?,
        ),
        (Value::Date(_, time_zone), JsonValue::Number(n)) => {
            Value::Date(n.as_f64().ok_or_else(mismatch)?, *time_zone)
        }
        (Value::String(_), JsonValue::String(s)) => Value::String(s.clone()),
        (Value::XML(_, e4x), JsonValue::String(s)) => Value::XML(s.clone(), *e4x),
        (Value::Object(members, class_def), JsonValue::Object(map)) => {
            let members = members_from_json(members, map)?;
            if let Some(def) = class_def {
                def.check_members(&members)
                    .map_err(|reason| conversion("Object", reason))?;
            }
            Value::Object(members, class_def.clone())
        }
        (Value::StrictArray(items), JsonValue::Array(json_items)) => {
            Value::StrictArray(items_from_json(items, json_items)?)
        }
        (Value::ECMAArray(dense, assoc, length), JsonValue::Array(json_items)) if assoc.is_empty() => {
            Value::ECMAArray(items_from_json(dense, json_items)?, Vec::new(), *length)
        }
        (Value::ECMAArray(dense, assoc, length), JsonValue::Object(map)) if dense.is_empty() => {
            Value::ECMAArray(Vec::new(), members_from_json(assoc, map)?, *length)
        }
        (Value::ECMAArray(dense, assoc, length), JsonValue::Object(map)) => {
            let new_dense = match map.get("dense") {
                Some(JsonValue::Array(items)) => items_from_json(dense, items)?,
                _ => return Err(conversion("ECMAArray", "expected a `dense` array")),
            };
            let new_assoc = match map.get("associative") {
                Some(JsonValue::Object(members)) => members_from_json(assoc, members)?,
                None => Vec::new(),
                _ => return Err(conversion("ECMAArray", "expected an `associative` object")),
            };
            Value::ECMAArray(new_dense, new_assoc, *length)
        }
        (Value::VectorObject(items, type_name, fixed), JsonValue::Array(json_items)) => {
            let new_items = items_from_json(items, json_items)?;
            if *fixed && new_items.len() != items.len() {
                return Err(conversion("VectorObject", "fixed length vectors can't change size"));
            }
            Value::VectorObject(new_items, type_name.clone(), *fixed)
        }
        (Value::ByteArray(_), JsonValue::Array(items)) => Value::ByteArray(numbers_from_json(
            "ByteArray",
            items,
            |n| n.as_u64().and_then(|x| u8::try_from(x).ok()),
        )?),
        (Value::VectorInt(_, fixed), JsonValue::Array(items)) => Value::VectorInt(
            numbers_from_json("VectorInt", items, |n| {
                n.as_i64().and_then(|x| i32::try_from(x).ok())
            })?,
            *fixed,
        ),
        (Value::VectorUInt(_, fixed), JsonValue::Array(items)) => Value::VectorUInt(
            numbers_from_json("VectorUInt", items, |n| {
                n.as_u64().and_then(|x| u32::try_from(x).ok())
            })?,
            *fixed,
        ),
        (Value::VectorDouble(_, fixed), JsonValue::Array(items)) => {
            Value::VectorDouble(numbers_from_json("VectorDouble", items, |n| n.as_f64())?, *fixed)
        }
        (Value::Dictionary(pairs, weak_keys), JsonValue::Array(items)) => {
            let new_pairs = items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    JsonValue::Array(pair) if pair.len() == 2 => match pairs.get(i) {
                        Some((k, v)) => Ok((from_json(k, &pair[0])?, from_json(v, &pair[1])?)),
                        None => Ok((infer(&pair[0]), infer(&pair[1]))),
                    },
                    other => Err(conversion(
                        "Dictionary",
                        format!("expected a [key, value] pair but found {}", json_kind(other)),
                    )),
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Value::Dictionary(new_pairs, *weak_keys)
        }
        _ => return Err(mismatch()),
    })
}

/// The text shown for a value in an editor, scalars as plain text and composites as JSON
///
/// Feeding the result to [`convert_text`] gives back an equal value
pub fn to_text(value: &Value) -> String {
    match value {
        Value::AMF3(inner) => to_text(inner),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) | Value::Date(n, _) => n.to_string(),
        Value::String(s) | Value::XML(s, _) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Undefined => "undefined".to_string(),
        composite => {
            let json = to_json(composite, &ProjectionOptions::default());
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDefinition;
    use enumset::EnumSet;
    use pretty_assertions::assert_eq;

    #[test]
    fn booleans() {
        for text in ["true", "1", "YES", "on", " True "] {
            assert_eq!(convert_text(&Value::Bool(false), text).unwrap(), Value::Bool(true));
        }
        for text in ["false", "0", "No", "OFF"] {
            assert_eq!(convert_text(&Value::Bool(true), text).unwrap(), Value::Bool(false));
        }
        match convert_text(&Value::Bool(true), "maybe") {
            Err(Error::Conversion { expected, .. }) => assert_eq!(expected, "Bool"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(convert_text(&Value::Integer(0), "42").unwrap(), Value::Integer(42));
        assert!(matches!(
            convert_text(&Value::Integer(0), "4.5"),
            Err(Error::Conversion { expected: "Integer", .. })
        ));
        assert!(matches!(
            convert_text(&Value::Integer(0), "99999999999"),
            Err(Error::Conversion { expected: "Integer", .. })
        ));
        assert_eq!(convert_text(&Value::Number(0.0), "4.5").unwrap(), Value::Number(4.5));
        assert!(matches!(
            convert_text(&Value::Number(0.0), "abc"),
            Err(Error::Conversion { expected: "Number", .. })
        ));
        assert_eq!(
            convert_text(&Value::Date(0.0, Some(-60)), "1000").unwrap(),
            Value::Date(1000.0, Some(-60))
        );
    }

    #[test]
    fn strings_are_verbatim() {
        assert_eq!(
            convert_text(&Value::from("x"), " 12 ").unwrap(),
            Value::from(" 12 ")
        );
        assert_eq!(
            convert_text(&Value::XML(String::new(), true), "<a/>").unwrap(),
            Value::XML("<a/>".into(), true)
        );
    }

    #[test]
    fn null_slots_infer() {
        assert_eq!(convert_text(&Value::Null, "12").unwrap(), Value::Number(12.0));
        assert_eq!(convert_text(&Value::Undefined, "true").unwrap(), Value::Bool(true));
        assert_eq!(convert_text(&Value::Null, "hello").unwrap(), Value::from("hello"));
        assert_eq!(convert_text(&Value::Null, "[1]").unwrap(), Value::from("[1]"));
        assert_eq!(convert_text(&Value::Null, "undefined").unwrap(), Value::Undefined);
    }

    #[test]
    fn embedded_values_stay_embedded() {
        let original = Value::AMF3(Box::new(Value::Integer(1)));
        assert_eq!(
            convert_text(&original, "7").unwrap(),
            Value::AMF3(Box::new(Value::Integer(7)))
        );
    }

    #[test]
    fn objects_follow_the_original() {
        let original = Value::object(vec![
            Element::new("level", 1),
            Element::new("name", "axe"),
        ]);
        let out = convert_text(&original, r#"{"level": 4, "name": "saw", "new": 2.5}"#).unwrap();
        assert_eq!(
            out,
            Value::object(vec![
                Element::new("level", 4),
                Element::new("name", "saw"),
                Element::new("new", 2.5),
            ])
        );
        assert!(matches!(
            convert_text(&original, r#"{"level": "high"}"#),
            Err(Error::Conversion { expected: "Integer", .. })
        ));
        assert!(matches!(
            convert_text(&original, "[1, 2]"),
            Err(Error::Conversion { expected: "Object", .. })
        ));
        assert!(matches!(
            convert_text(&original, "{not json"),
            Err(Error::Conversion { expected: "Object", .. })
        ));
    }

    #[test]
    fn sealed_objects_keep_their_shape() {
        let def = ClassDefinition {
            name: "Point".into(),
            attributes: EnumSet::empty(),
            static_properties: vec!["x".into()],
        };
        let original = Value::Object(vec![Element::new("x", 1)], Some(def));
        assert!(convert_text(&original, r#"{"x": 2}"#).is_ok());
        assert!(convert_text(&original, r#"{"x": 2, "y": 3}"#).is_err());
    }

    #[test]
    fn arrays_follow_the_original() {
        let original = Value::StrictArray(vec![Value::Integer(1), Value::from("a")]);
        assert_eq!(
            convert_text(&original, r#"[5, "b", true]"#).unwrap(),
            Value::StrictArray(vec![Value::Integer(5), Value::from("b"), Value::Bool(true)])
        );
        assert_eq!(
            convert_text(&Value::VectorInt(vec![], false), "[1, -2]").unwrap(),
            Value::VectorInt(vec![1, -2], false)
        );
        assert!(convert_text(&Value::ByteArray(vec![]), "[256]").is_err());
    }

    #[test]
    fn text_round_trip() {
        let values = [
            Value::Bool(true),
            Value::Integer(-3),
            Value::Number(0.1),
            Value::from("hi"),
            Value::Null,
            Value::object(vec![Element::new("a", 1), Element::new("b", "c")]),
            Value::StrictArray(vec![Value::Number(1.5)]),
        ];
        for v in values {
            assert_eq!(convert_text(&v, &to_text(&v)).unwrap(), v);
        }
    }
}
