//! Handles encoding AMF3
use crate::PADDING;
use crate::amf3::length::Length;
use crate::amf3::type_marker::TypeMarker;
use crate::element_cache::ElementCache;
use crate::errors::Error;
use crate::types::{ClassDefinition, Element, Value};
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io::Write;

/// Smallest value of the amf3 integer type
const MIN_INTEGER: i32 = -(1 << 28);
/// Largest value of the amf3 integer type
const MAX_INTEGER: i32 = (1 << 28) - 1;

/// Write a `U29` in its shortest form
#[allow(clippy::unusual_byte_groupings)]
pub(crate) fn write_u29<W: Write>(writer: &mut W, n: u32) -> Result<(), Error> {
    if n > 0x1fff_ffff {
        return Err(Error::Serialization(format!(
            "{} does not fit in 29 bits",
            n
        )));
    }

    if n > 0x1fffff {
        writer.write_u8(((n >> (7 * 3 + 1)) & 0b01111111 | 0b10000000) as u8)?;
        writer.write_u8(((n >> (7 * 2 + 1)) & 0b01111111 | 0b10000000) as u8)?;
        writer.write_u8(((n >> (7 + 1)) & 0b01111111 | 0b10000000) as u8)?;
        writer.write_u8((n & 0b11111111) as u8)?;
    } else if n > 0x3fff {
        writer.write_u8(((n >> (7 * 2)) & 0b01111111 | 0b10000000) as u8)?;
        writer.write_u8(((n >> 7) & 0b01111111 | 0b10000000) as u8)?;
        writer.write_u8((n & 0b01111111) as u8)?;
    } else if n > 0x7f {
        writer.write_u8(((n >> 7) & 0b01111111 | 0b10000000) as u8)?;
        writer.write_u8((n & 0b01111111) as u8)?;
    } else {
        writer.write_u8((n & 0b01111111) as u8)?;
    }

    Ok(())
}

/// Write a signed integer in the range of the amf3 integer type as a `U29`
pub(crate) fn write_int_signed<W: Write>(writer: &mut W, i: i32) -> Result<(), Error> {
    if !(MIN_INTEGER..=MAX_INTEGER).contains(&i) {
        return Err(Error::Serialization(format!(
            "{} is outside the amf3 integer range",
            i
        )));
    }
    write_u29(writer, (i as u32) & 0x1fff_ffff)
}

fn length_of(len: usize) -> Result<Length, Error> {
    u32::try_from(len)
        .map(Length::Size)
        .map_err(|_| Error::Serialization(format!("{} entries is too many for amf3", len)))
}

/// Handles encoding AMF3
///
/// The reference tables are filled in document order, a value equal to one written earlier
/// becomes a back-reference
#[derive(Default)]
pub(crate) struct AMF3Encoder<'a> {
    /// Strings written inline so far, with their index
    string_reference_table: HashMap<&'a str, usize>,

    /// The table used to cache repeated trait definitions
    trait_reference_table: ElementCache<ClassDefinition>,

    /// The table used to cache repeated complex values
    object_reference_table: ElementCache<&'a Value>,
}

impl<'a> AMF3Encoder<'a> {
    fn write_string<W: Write>(&mut self, writer: &mut W, s: &'a str) -> Result<(), Error> {
        if s.is_empty() {
            return Length::Size(0).write(writer);
        }

        if let Some(&index) = self.string_reference_table.get(s) {
            return Length::Reference(index).write(writer);
        }

        let index = self.string_reference_table.len();
        self.string_reference_table.insert(s, index);
        length_of(s.len())?.write(writer)?;
        writer.write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_type_marker<W: Write>(&self, writer: &mut W, s: TypeMarker) -> Result<(), Error> {
        writer.write_u8(s as u8)?;
        Ok(())
    }

    /// Emit a back-reference and return `true` if `value` was written before, otherwise register it
    fn write_reference<W: Write>(&mut self, writer: &mut W, value: &'a Value) -> Result<bool, Error> {
        match self.object_reference_table.lookup_or_store(value) {
            Some(index) => {
                Length::Reference(index).write(writer)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn write_number_element<W: Write>(&self, writer: &mut W, i: f64) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::Number)?;
        writer.write_f64::<BigEndian>(i)?;
        Ok(())
    }

    fn write_integer_element<W: Write>(&self, writer: &mut W, i: i32) -> Result<(), Error> {
        if !(MIN_INTEGER..=MAX_INTEGER).contains(&i) {
            return self.write_number_element(writer, f64::from(i));
        }
        self.write_type_marker(writer, TypeMarker::Integer)?;
        write_int_signed(writer, i)
    }

    fn write_boolean_element<W: Write>(&self, writer: &mut W, b: bool) -> Result<(), Error> {
        if b {
            self.write_type_marker(writer, TypeMarker::True)
        } else {
            self.write_type_marker(writer, TypeMarker::False)
        }
    }

    fn write_string_element<W: Write>(&mut self, writer: &mut W, s: &'a str) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::String)?;
        self.write_string(writer, s)
    }

    fn write_date_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        millis: f64,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::Date)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        Length::Size(0).write(writer)?;
        writer.write_f64::<BigEndian>(millis)?;
        Ok(())
    }

    fn write_xml_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        content: &'a str,
        e4x: bool,
    ) -> Result<(), Error> {
        if e4x {
            self.write_type_marker(writer, TypeMarker::Xml)?;
        } else {
            self.write_type_marker(writer, TypeMarker::XmlDocument)?;
        }
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(content.len())?.write(writer)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_byte_array<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        bytes: &'a [u8],
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::ByteArray)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(bytes.len())?.write(writer)?;
        writer.write_all(bytes)?;
        Ok(())
    }

    fn write_int_vector<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        items: &'a [i32],
        fixed_length: bool,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::VectorInt)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(items.len())?.write(writer)?;
        writer.write_u8(u8::from(fixed_length))?;
        for item in items {
            writer.write_i32::<BigEndian>(*item)?;
        }
        Ok(())
    }

    fn write_uint_vector<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        items: &'a [u32],
        fixed_length: bool,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::VectorUInt)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(items.len())?.write(writer)?;
        writer.write_u8(u8::from(fixed_length))?;
        for item in items {
            writer.write_u32::<BigEndian>(*item)?;
        }
        Ok(())
    }

    fn write_number_vector<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        items: &'a [f64],
        fixed_length: bool,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::VectorDouble)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(items.len())?.write(writer)?;
        writer.write_u8(u8::from(fixed_length))?;
        for item in items {
            writer.write_f64::<BigEndian>(*item)?;
        }
        Ok(())
    }

    fn write_object_vector<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        items: &'a [Value],
        type_name: &'a str,
        fixed_length: bool,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::VectorObject)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(items.len())?.write(writer)?;
        writer.write_u8(u8::from(fixed_length))?;
        self.write_string(writer, type_name)?;
        for item in items {
            self.write_value_element(writer, item)?;
        }
        Ok(())
    }

    fn write_dictionary_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        pairs: &'a [(Value, Value)],
        weak_keys: bool,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::Dictionary)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(pairs.len())?.write(writer)?;
        writer.write_u8(u8::from(weak_keys))?;
        for (k, v) in pairs {
            self.write_value_element(writer, k)?;
            self.write_value_element(writer, v)?;
        }
        Ok(())
    }

    fn write_strict_array_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        children: &'a [Value],
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::Array)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(children.len())?.write(writer)?;
        // No associative part
        self.write_string(writer, "")?;
        for child in children {
            self.write_value_element(writer, child)?;
        }
        Ok(())
    }

    fn write_ecma_array_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        dense: &'a [Value],
        assoc: &'a [Element],
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::Array)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        length_of(dense.len())?.write(writer)?;
        for element in assoc {
            if element.name.is_empty() {
                return Err(Error::Serialization(
                    "associative array keys can't be empty".to_string(),
                ));
            }
            self.write_string(writer, &element.name)?;
            self.write_value_element(writer, &element.value)?;
        }
        self.write_string(writer, "")?;
        for child in dense {
            self.write_value_element(writer, child)?;
        }
        Ok(())
    }

    fn write_object_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        children: &'a [Element],
        class_def: Option<&'a ClassDefinition>,
    ) -> Result<(), Error> {
        self.write_type_marker(writer, TypeMarker::Object)?;
        if self.write_reference(writer, value)? {
            return Ok(());
        }

        let def = class_def.cloned().unwrap_or_default();
        if def.is_external() {
            return Err(Error::Serialization(format!(
                "externalizable class `{}` can't be written",
                def.name
            )));
        }
        def.check_members(children).map_err(Error::Serialization)?;

        let name: &'a str = class_def.map_or("", |d| d.name.as_str());
        let static_properties: &'a [String] = class_def.map_or(&[][..], |d| d.static_properties.as_slice());

        match self.trait_reference_table.get_index(&def) {
            Some(index) => {
                // U29O-traits-ref
                let index = u32::try_from(index)
                    .map_err(|_| Error::Serialization("too many traits".to_string()))?;
                write_u29(writer, index.checked_mul(4).unwrap_or(u32::MAX) | 0b01)?;
            }
            None => {
                let count = u32::try_from(static_properties.len())
                    .map_err(|_| Error::Serialization("too many sealed members".to_string()))?;
                let encoding = if def.is_dynamic() { 0b10 } else { 0b00 };
                // U29O-traits: count, dynamic, not external, inline trait, inline object
                write_u29(
                    writer,
                    count.checked_mul(16).unwrap_or(u32::MAX) | encoding << 2 | 0b011,
                )?;
                self.write_string(writer, name)?;
                for property in static_properties {
                    self.write_string(writer, property)?;
                }
                self.trait_reference_table.store(def.clone());
            }
        }

        for property in static_properties {
            if let Some(member) = children.iter().find(|c| &c.name == property) {
                self.write_value_element(writer, &member.value)?;
            }
        }

        if def.is_dynamic() {
            for member in children
                .iter()
                .filter(|c| !static_properties.contains(&c.name))
            {
                if member.name.is_empty() {
                    return Err(Error::Serialization(
                        "dynamic member names can't be empty".to_string(),
                    ));
                }
                self.write_string(writer, &member.name)?;
                self.write_value_element(writer, &member.value)?;
            }
            self.write_string(writer, "")?;
        }

        Ok(())
    }

    /// Write a single value, including its type marker
    pub(crate) fn write_value_element<W: Write>(&mut self, writer: &mut W, s: &'a Value) -> Result<(), Error> {
        match s {
            Value::Number(x) => self.write_number_element(writer, *x),
            Value::Bool(b) => self.write_boolean_element(writer, *b),
            Value::String(s) => self.write_string_element(writer, s),
            Value::Object(children, class_def) => {
                self.write_object_element(writer, s, children, class_def.as_ref())
            }
            Value::Null => self.write_type_marker(writer, TypeMarker::Null),
            Value::Undefined => self.write_type_marker(writer, TypeMarker::Undefined),
            Value::ECMAArray(dense, assoc, _) => {
                self.write_ecma_array_element(writer, s, dense, assoc)
            }
            Value::StrictArray(children) => self.write_strict_array_element(writer, s, children),
            Value::Date(time, _) => self.write_date_element(writer, s, *time),
            Value::Unsupported(_) => Err(Error::Serialization(
                "skipped values have no amf3 representation".to_string(),
            )),
            Value::XML(content, e4x) => self.write_xml_element(writer, s, content, *e4x),
            Value::AMF3(inner) => self.write_value_element(writer, inner),
            Value::Integer(i) => self.write_integer_element(writer, *i),
            Value::ByteArray(bytes) => self.write_byte_array(writer, s, bytes),
            Value::VectorInt(items, fixed_length) => {
                self.write_int_vector(writer, s, items, *fixed_length)
            }
            Value::VectorUInt(items, fixed_length) => {
                self.write_uint_vector(writer, s, items, *fixed_length)
            }
            Value::VectorDouble(items, fixed_length) => {
                self.write_number_vector(writer, s, items, *fixed_length)
            }
            Value::VectorObject(items, type_name, fixed_length) => {
                self.write_object_vector(writer, s, items, type_name, *fixed_length)
            }
            Value::Dictionary(pairs, weak_keys) => {
                self.write_dictionary_element(writer, s, pairs, *weak_keys)
            }
        }
    }

    fn write_element<W: Write>(&mut self, writer: &mut W, element: &'a Element) -> Result<(), Error> {
        self.write_string(writer, &element.name)?;
        self.write_value_element(writer, &element.value)
    }

    /// Write `(name, value, padding)` for every element
    pub(crate) fn write_body<W: Write>(&mut self, writer: &mut W, elements: &'a [Element]) -> Result<(), Error> {
        for element in elements {
            self.write_element(writer, element)?;
            writer.write_all(&PADDING)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod write_number_tests {
    use super::*;

    fn encode_int(i: i32) -> Vec<u8> {
        let mut v = vec![];
        write_int_signed(&mut v, i).unwrap();
        v
    }

    #[test]
    fn test_write_1byte_number() {
        assert_eq!(encode_int(0b00101011), &[0b00101011]);
    }

    #[test]
    fn test_write_4byte_number() {
        assert_eq!(
            encode_int(2097280),
            &[0b10000000, 0b11000000, 0b10000000, 0b10000000]
        );
    }

    #[test]
    fn write_neg_number() {
        assert_eq!(encode_int(-268435455), &[192, 128, 128, 1]);
    }

    #[test]
    fn write_boundaries() {
        assert_eq!(encode_int(0x7f), &[0x7f]);
        assert_eq!(encode_int(0x80), &[0x81, 0x00]);
        assert_eq!(encode_int(0x3fff), &[0xff, 0x7f]);
        assert_eq!(encode_int(0x4000), &[0x81, 0x80, 0x00]);
        assert_eq!(encode_int(-1), &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn out_of_range() {
        assert!(write_u29(&mut vec![], 1 << 29).is_err());
        assert!(write_int_signed(&mut vec![], 1 << 28).is_err());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attribute;
    use enumset::EnumSet;
    use pretty_assertions::assert_eq;

    fn encode(v: &Value) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        AMF3Encoder::default().write_value_element(&mut out, v)?;
        Ok(out)
    }

    #[test]
    fn repeated_strings_become_references() {
        let v = Value::StrictArray(vec!["same".into(), "same".into(), "same".into()]);
        assert_eq!(
            encode(&v).unwrap(),
            vec![0x09, 0x07, 0x01, 0x06, 0x09, b's', b'a', b'm', b'e', 0x06, 0x00, 0x06, 0x00]
        );
    }

    #[test]
    fn equal_objects_become_references() {
        let o = Value::object(vec![Element::new("a", 1)]);
        let v = Value::StrictArray(vec![o.clone(), o]);
        assert_eq!(
            encode(&v).unwrap(),
            vec![
                0x09, 0x05, 0x01, // array
                0x0A, 0x0B, 0x01, 0x03, b'a', 0x04, 0x01, 0x01, // first object
                0x0A, 0x02, // reference to object 1
            ]
        );
    }

    #[test]
    fn shared_trait_is_referenced() {
        let v = Value::StrictArray(vec![
            Value::object(vec![Element::new("a", 1)]),
            Value::object(vec![Element::new("a", 2)]),
        ]);
        assert_eq!(
            encode(&v).unwrap(),
            vec![
                0x09, 0x05, 0x01, //
                0x0A, 0x0B, 0x01, 0x03, b'a', 0x04, 0x01, 0x01, //
                0x0A, 0x01, 0x00, 0x04, 0x02, 0x01,
            ]
        );
    }

    #[test]
    fn large_integer_becomes_number() {
        assert_eq!(
            encode(&Value::Integer(1 << 28)).unwrap()[0],
            TypeMarker::Number as u8
        );
        assert_eq!(
            encode(&Value::Integer(-(1 << 28))).unwrap()[0],
            TypeMarker::Integer as u8
        );
    }

    #[test]
    fn unsupported_cannot_be_written() {
        assert!(matches!(
            encode(&Value::Unsupported(vec![])),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn sealed_class_rejects_unknown_members() {
        let def = ClassDefinition {
            name: "Point".to_string(),
            attributes: EnumSet::empty(),
            static_properties: vec!["x".to_string()],
        };
        let ok = Value::Object(vec![Element::new("x", 1)], Some(def.clone()));
        assert_eq!(
            encode(&ok).unwrap(),
            vec![0x0A, 0x13, 0x0B, b'P', b'o', b'i', b'n', b't', 0x03, b'x', 0x04, 0x01]
        );

        let extra = Value::Object(
            vec![Element::new("x", 1), Element::new("z", 2)],
            Some(def.clone()),
        );
        assert!(matches!(encode(&extra), Err(Error::Serialization(_))));

        let missing = Value::Object(vec![], Some(def));
        assert!(matches!(encode(&missing), Err(Error::Serialization(_))));
    }

    #[test]
    fn externalizable_cannot_be_written() {
        let def = ClassDefinition {
            name: "flex.messaging.io.ArrayCollection".to_string(),
            attributes: Attribute::External.into(),
            static_properties: vec![],
        };
        assert!(matches!(
            encode(&Value::Object(vec![], Some(def))),
            Err(Error::Serialization(_))
        ));
    }
}
