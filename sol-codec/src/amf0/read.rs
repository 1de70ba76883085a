//! Support for decoding AMF0 data
use crate::PADDING;
use crate::amf0::type_marker::TypeMarker;
use crate::amf3::read::AMF3Decoder;
use crate::errors::{DecodeError, ReferenceTable};
use crate::limits::DecodeLimits;
use crate::nom_utils::{AMFResult, expect_bytes, fail, parse_string, take_str};
use crate::types::{ClassDefinition, Element, Value};
use nom::combinator::map;
use nom::multi::many_m_n;
use nom::number::complete::{be_f64, be_i16, be_u8, be_u16, be_u32};

fn parse_element_number(i: &[u8]) -> AMFResult<'_, Value> {
    map(be_f64, Value::Number)(i)
}

fn parse_element_bool(i: &[u8]) -> AMFResult<'_, Value> {
    map(be_u8, |num: u8| Value::Bool(num > 0))(i)
}

fn parse_element_string(i: &[u8]) -> AMFResult<'_, Value> {
    map(parse_string, |s: &str| Value::String(s.to_string()))(i)
}

fn parse_long_string(i: &[u8]) -> AMFResult<'_, &str> {
    let (i, length) = be_u32(i)?;
    take_str(i, length)
}

fn parse_element_long_string(i: &[u8]) -> AMFResult<'_, Value> {
    map(parse_long_string, |s: &str| Value::String(s.to_string()))(i)
}

fn parse_element_xml(i: &[u8]) -> AMFResult<'_, Value> {
    map(parse_long_string, |s: &str| Value::XML(s.to_string(), false))(i)
}

fn parse_element_date(i: &[u8]) -> AMFResult<'_, Value> {
    let (i, millis) = be_f64(i)?;
    let (i, time_zone) = be_i16(i)?;

    Ok((i, Value::Date(millis, Some(time_zone))))
}

fn reserved_marker(i: &[u8], type_: TypeMarker) -> AMFResult<'_, Value> {
    fail(DecodeError::Format(
        i,
        format!("reserved type marker {:?} can't be decoded", type_),
    ))
}

fn read_type_marker(i: &[u8]) -> AMFResult<'_, TypeMarker> {
    let (j, type_) = be_u8(i)?;
    match TypeMarker::try_from(type_) {
        Ok(marker) => Ok((j, marker)),
        Err(()) => fail(DecodeError::Format(
            i,
            format!("unknown amf0 type marker {:#04x}", type_),
        )),
    }
}

/// Decoder for AMF0 bodies
///
/// Objects, typed objects and arrays are recorded in the object reference table as they are opened,
/// so `Reference` markers can be resolved to copies of earlier values
#[derive(Default, Debug)]
pub(crate) struct AMF0Decoder {
    /// Complex values seen so far, `None` while a value is still being decoded
    object_reference_table: Vec<Option<Value>>,

    limits: DecodeLimits,
}

impl AMF0Decoder {
    /// A decoder for an input of `input_len` bytes
    pub(crate) fn new(input_len: usize) -> Self {
        Self {
            object_reference_table: Vec::new(),
            limits: DecodeLimits::for_input(input_len),
        }
    }

    #[cfg(test)]
    pub(crate) fn reference_count(&self) -> usize {
        self.object_reference_table.len()
    }

    fn reserve_reference(&mut self) -> usize {
        self.object_reference_table.push(None);
        self.object_reference_table.len() - 1
    }

    fn complete_reference(&mut self, index: usize, value: &Value) {
        if let Some(slot) = self.object_reference_table.get_mut(index) {
            *slot = Some(value.clone());
        }
    }

    /// Reserve a slot in the object table, run `parser` and store its result in the slot
    fn parse_referenced<'a>(
        &mut self,
        i: &'a [u8],
        parser: impl FnOnce(&mut Self, &'a [u8]) -> AMFResult<'a, Value>,
    ) -> AMFResult<'a, Value> {
        let index = self.reserve_reference();
        let (i, value) = parser(self, i)?;
        self.complete_reference(index, &value);
        Ok((i, value))
    }

    fn parse_element_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_referenced(i, |this, i| {
            let (i, elms) = this.parse_array_element(i)?;
            Ok((i, Value::Object(elms, None)))
        })
    }

    fn parse_element_typed_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_referenced(i, |this, i| {
            let (i, name) = parse_string(i)?;
            let (i, elms) = this.parse_array_element(i)?;
            Ok((
                i,
                Value::Object(elms, Some(ClassDefinition::default_with_name(name))),
            ))
        })
    }

    fn parse_element_mixed_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_referenced(i, |this, i| {
            let (i, array_length) = be_u32(i)?;
            let (i, elms) = this.parse_array_element(i)?;
            Ok((i, Value::ECMAArray(Vec::new(), elms, array_length)))
        })
    }

    fn parse_element_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_referenced(i, |this, i| {
            let (i, length) = be_u32(i)?;
            let length = length as usize;

            // Every element takes at least one byte, this prevents huge allocations from bad counts
            if i.len() < length {
                return fail(DecodeError::Truncated(&i[i.len()..]));
            }

            let (i, elements) = many_m_n(length, length, |i| this.parse_single_element(i))(i)?;
            Ok((i, Value::StrictArray(elements)))
        })
    }

    fn parse_element_reference<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let (j, index) = be_u16(i)?;
        let index = index as usize;
        match self.object_reference_table.get(index) {
            Some(Some(value)) => {
                self.limits.charge(i, value)?;
                Ok((j, value.clone()))
            }
            Some(None) => fail(DecodeError::Reference(
                i,
                index,
                ReferenceTable::Object,
                "points at a value that contains it",
            )),
            None => fail(DecodeError::Reference(
                i,
                index,
                ReferenceTable::Object,
                "is out of range",
            )),
        }
    }

    fn parse_element_amf3<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        // Each embedded value starts with empty amf3 reference tables, the depth and budget carry over
        let mut decoder = AMF3Decoder::with_limits(self.limits.clone());
        let result = decoder.parse_single_element(i);
        self.limits = decoder.into_limits();

        let (i, x) = result?;
        Ok((i, Value::AMF3(Box::new(x))))
    }

    /// Parse a single value, starting at its type marker
    pub(crate) fn parse_single_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.limits.enter(i)?;
        let result = self.parse_value(i);
        self.limits.leave();
        result
    }

    fn parse_value<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let marker_start = i;
        let (i, type_) = read_type_marker(i)?;

        match type_ {
            TypeMarker::Number => parse_element_number(i),
            TypeMarker::Bool => parse_element_bool(i),
            TypeMarker::String => parse_element_string(i),
            TypeMarker::Object => self.parse_element_object(i),
            TypeMarker::Null => Ok((i, Value::Null)),
            TypeMarker::Undefined => Ok((i, Value::Undefined)),
            TypeMarker::Reference => self.parse_element_reference(i),
            TypeMarker::EcmaArray => self.parse_element_mixed_array(i),
            TypeMarker::StrictArray => self.parse_element_array(i),
            TypeMarker::Date => parse_element_date(i),
            TypeMarker::LongString => parse_element_long_string(i),
            TypeMarker::Unsupported => {
                log::warn!(
                    "Skipping unsupported amf0 marker with {} bytes remaining",
                    i.len()
                );
                Ok((i, Value::Unsupported(Vec::new())))
            }
            TypeMarker::Xml => parse_element_xml(i),
            TypeMarker::TypedObject => self.parse_element_typed_object(i),
            TypeMarker::AvmPlus => self.parse_element_amf3(i),
            TypeMarker::MovieClip | TypeMarker::RecordSet => reserved_marker(marker_start, type_),
            TypeMarker::ObjectEnd => fail(DecodeError::Format(
                marker_start,
                "object end marker outside of an object".to_string(),
            )),
        }
    }

    fn parse_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Element> {
        let (i, name) = parse_string(i)?;
        let (i, value) = self.parse_single_element(i)?;

        Ok((i, Element::new(name, value)))
    }

    /// Members of an object up to and including the `00 00 09` terminator
    fn parse_array_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Vec<Element>> {
        let mut out = Vec::new();

        let mut i = i;
        loop {
            let (k, name) = parse_string(i)?;
            if name.is_empty() {
                let (k, next_type) = read_type_marker(k)?;
                if next_type != TypeMarker::ObjectEnd {
                    return fail(DecodeError::Format(
                        i,
                        "empty member name without an object end marker".to_string(),
                    ));
                }
                i = k;
                break;
            }

            let (j, e) = self.parse_element(i)?;
            i = j;

            out.push(e);
        }

        Ok((i, out))
    }

    /// Parse `(name, value, padding)` triples until the input is exhausted
    pub(crate) fn parse_body<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Vec<Element>> {
        let mut out = Vec::new();

        let mut i = i;
        while !i.is_empty() {
            let (j, e) = self.parse_element(i)?;
            let (j, _) = expect_bytes(j, &PADDING, "element padding")?;
            out.push(e);
            i = j;
        }

        Ok((i, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReferenceTable;
    use pretty_assertions::assert_eq;

    fn decode_value(i: &[u8]) -> AMFResult<'_, Value> {
        AMF0Decoder::default().parse_single_element(i)
    }

    #[test]
    fn test_array_element_out_of_memory() {
        let input = [10, 93, 0, 0, 0];
        assert!(matches!(
            decode_value(&input),
            Err(nom::Err::Error(DecodeError::Truncated(_)))
        ));
    }

    #[test]
    fn test_object() {
        let input = [
            3, 0, 1, b'x', 0, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0, 0, 0, 9,
        ];
        let (rest, value) = decode_value(&input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(value, Value::Object(vec![Element::new("x", 1.0)], None));
    }

    #[test]
    fn test_typed_object_keeps_class_name() {
        let input = [
            16, 0, 5, b'P', b'o', b'i', b'n', b't', 0, 1, b'x', 5, 0, 0, 9,
        ];
        let (_, value) = decode_value(&input).unwrap();
        assert_eq!(
            value,
            Value::Object(
                vec![Element::new("x", Value::Null)],
                Some(ClassDefinition::default_with_name("Point"))
            )
        );
    }

    #[test]
    fn test_reference_resolves_to_copy() {
        // [ {}, ref 1 ]
        let input = [10, 0, 0, 0, 2, 3, 0, 0, 9, 7, 0, 1];
        let (_, value) = decode_value(&input).unwrap();
        assert_eq!(
            value,
            Value::StrictArray(vec![Value::object(vec![]), Value::object(vec![])])
        );
    }

    #[test]
    fn test_cyclic_reference() {
        // An object whose member references the object itself
        let input = [3, 0, 1, b's', 7, 0, 0, 0, 0, 9];
        assert!(matches!(
            decode_value(&input),
            Err(nom::Err::Error(DecodeError::Reference(
                _,
                0,
                ReferenceTable::Object,
                _
            )))
        ));
    }

    #[test]
    fn test_reference_out_of_range() {
        let input = [7, 0, 3];
        let err = decode_value(&input).unwrap_err();
        match err {
            nom::Err::Error(e) => assert!(matches!(
                e.into_error(&input),
                crate::Error::Reference { offset: 1, index: 3, .. }
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_marker_is_skipped() {
        let input = [13];
        assert_eq!(
            decode_value(&input),
            Ok((&[][..], Value::Unsupported(Vec::new())))
        );
    }

    #[test]
    fn test_reserved_markers() {
        for marker in [4u8, 14, 0x12, 0xff] {
            let input = [marker];
            match decode_value(&input) {
                Err(nom::Err::Error(e)) => {
                    assert!(matches!(e.into_error(&input), crate::Error::Format { offset: 0, .. }))
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_date_negative_timezone() {
        let mut input = vec![11];
        input.extend_from_slice(&0f64.to_be_bytes());
        input.extend_from_slice(&(-60i16).to_be_bytes());
        assert_eq!(
            decode_value(&input),
            Ok((&[][..], Value::Date(0.0, Some(-60))))
        );
    }

    #[test]
    fn test_object_without_terminator_is_truncated() {
        let input = [3, 0, 1, b'x', 5];
        assert!(matches!(
            decode_value(&input),
            Err(nom::Err::Error(DecodeError::Truncated(_)))
        ));
    }

    #[test]
    fn test_doubling_references_hit_the_budget() {
        // [[], [ref 1, ref 1], [ref 2, ref 2], ...], each level twice the size of the last
        let levels = 40u16;
        let mut input = vec![10, 0, 0, 0, levels as u8 + 1, 10, 0, 0, 0, 0];
        for level in 1..=levels {
            input.extend_from_slice(&[10, 0, 0, 0, 2]);
            for _ in 0..2 {
                input.push(7);
                input.extend_from_slice(&level.to_be_bytes());
            }
        }

        assert!(matches!(
            decode_value(&input),
            Err(nom::Err::Error(DecodeError::Format(_, _)))
        ));
    }

    #[test]
    fn test_shared_references_within_budget() {
        // [{x: 1}, ref 1, ref 1, ...]
        let mut input = vec![10, 0, 0, 1, 0];
        input.extend_from_slice(&[3, 0, 1, b'x', 0, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0, 0, 0, 9]);
        for _ in 1..256 {
            input.extend_from_slice(&[7, 0, 1]);
        }

        let (rest, value) = decode_value(&input).unwrap();
        assert!(rest.is_empty());
        match value {
            Value::StrictArray(items) => {
                assert_eq!(items.len(), 256);
                assert!(items.iter().all(|v| v == &items[0]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        // 200 000 nested one-element strict arrays around a null
        let mut input = [10, 0, 0, 0, 1].repeat(200_000);
        input.push(5);

        let err = decode_value(&input).unwrap_err();
        match err {
            nom::Err::Error(e) => assert!(matches!(
                e.into_error(&input),
                crate::Error::Format { offset, .. } if offset == crate::limits::MAX_DEPTH * 5
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nesting_just_inside_the_limit() {
        let depth = crate::limits::MAX_DEPTH - 1;
        let mut input = [10, 0, 0, 0, 1].repeat(depth);
        input.push(5);

        let (rest, mut value) = decode_value(&input).unwrap();
        assert!(rest.is_empty());
        for _ in 0..depth {
            value = match value {
                Value::StrictArray(mut items) => items.remove(0),
                other => panic!("unexpected {:?}", other),
            };
        }
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_depth_carries_into_embedded_amf3() {
        // Nested amf0 arrays, then an avm+ value holding nested amf3 arrays
        let half = crate::limits::MAX_DEPTH / 2;
        let mut input = [10, 0, 0, 0, 1].repeat(half);
        input.push(17);
        input.extend_from_slice(&[9, 3, 1].repeat(half));
        input.push(1);

        assert!(matches!(
            decode_value(&input),
            Err(nom::Err::Error(DecodeError::Format(_, _)))
        ));
    }

    #[test]
    fn test_embedded_amf3() {
        let input = [17, 4, 5];
        assert_eq!(
            decode_value(&input),
            Ok((&[][..], Value::AMF3(Box::new(Value::Integer(5)))))
        );
    }
}
