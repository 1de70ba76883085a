//! Support for encoding AMF0
use crate::PADDING;
use crate::amf0::type_marker::TypeMarker;
use crate::amf3::write::AMF3Encoder;
use crate::element_cache::ElementCache;
use crate::errors::Error;
use crate::nom_utils::write_string;
use crate::types::{ClassDefinition, Element, Value};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

fn write_type_marker<W: Write>(writer: &mut W, type_: TypeMarker) -> Result<(), Error> {
    writer.write_u8(type_ as u8)?;
    Ok(())
}

fn write_number_element<W: Write>(writer: &mut W, s: f64) -> Result<(), Error> {
    write_type_marker(writer, TypeMarker::Number)?;
    writer.write_f64::<BigEndian>(s)?;
    Ok(())
}

fn write_bool_element<W: Write>(writer: &mut W, s: bool) -> Result<(), Error> {
    write_type_marker(writer, TypeMarker::Bool)?;
    writer.write_u8(u8::from(s))?;
    Ok(())
}

fn write_long_string_content<W: Write>(writer: &mut W, s: &str) -> Result<(), Error> {
    let length = u32::try_from(s.len()).map_err(|_| {
        Error::Serialization(format!("string of {} bytes is too long", s.len()))
    })?;
    writer.write_u32::<BigEndian>(length)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn write_string_element<W: Write>(writer: &mut W, s: &str) -> Result<(), Error> {
    if s.len() > u16::MAX as usize {
        write_type_marker(writer, TypeMarker::LongString)?;
        write_long_string_content(writer, s)
    } else {
        write_type_marker(writer, TypeMarker::String)?;
        write_string(writer, s)
    }
}

fn write_xml_element<W: Write>(writer: &mut W, content: &str) -> Result<(), Error> {
    write_type_marker(writer, TypeMarker::Xml)?;
    write_long_string_content(writer, content)
}

fn write_date_element<W: Write>(writer: &mut W, millis: f64, time_zone: Option<i16>) -> Result<(), Error> {
    write_type_marker(writer, TypeMarker::Date)?;
    writer.write_f64::<BigEndian>(millis)?;
    writer.write_i16::<BigEndian>(time_zone.unwrap_or(0))?;
    Ok(())
}

/// The `0x0D` marker has no payload, so only an empty `Unsupported` can be written
fn write_unsupported_element<W: Write>(writer: &mut W, raw: &[u8]) -> Result<(), Error> {
    if !raw.is_empty() {
        return Err(Error::Serialization(format!(
            "unsupported value with {} bytes of payload can't be written, amf0 stores only the marker",
            raw.len()
        )));
    }
    write_type_marker(writer, TypeMarker::Unsupported)
}

fn write_object_end<W: Write>(writer: &mut W) -> Result<(), Error> {
    writer.write_u16::<BigEndian>(0)?;
    write_type_marker(writer, TypeMarker::ObjectEnd)
}

/// Write a value through the AVM+ marker, with fresh amf3 reference tables
fn write_amf3_element<W: Write>(writer: &mut W, value: &Value) -> Result<(), Error> {
    write_type_marker(writer, TypeMarker::AvmPlus)?;
    AMF3Encoder::default().write_value_element(writer, value)
}

/// Encoder for AMF0 bodies
///
/// Objects and arrays are registered in the object reference table in document order, an
/// object or array equal to an earlier one is written as a `Reference` to it
#[derive(Default)]
pub(crate) struct AMF0Encoder<'a> {
    object_reference_table: ElementCache<&'a Value>,
}

impl<'a> AMF0Encoder<'a> {
    /// Emit a reference and return `true` if `value` was written before, otherwise register it
    fn write_reference<W: Write>(&mut self, writer: &mut W, value: &'a Value) -> Result<bool, Error> {
        match self.object_reference_table.get_index(&value) {
            Some(index) => match u16::try_from(index) {
                Ok(index) => {
                    write_type_marker(writer, TypeMarker::Reference)?;
                    writer.write_u16::<BigEndian>(index)?;
                    Ok(true)
                }
                // Out of reach of a 16 bit reference, the copy is written in full and takes a new slot
                Err(_) => {
                    self.object_reference_table.store(value);
                    Ok(false)
                }
            },
            None => {
                self.object_reference_table.store(value);
                Ok(false)
            }
        }
    }

    fn write_members<W: Write>(&mut self, writer: &mut W, members: &'a [Element]) -> Result<(), Error> {
        for element in members {
            if element.name.is_empty() {
                return Err(Error::Serialization(
                    "object member names can't be empty in amf0".to_string(),
                ));
            }
            self.write_element(writer, element)?;
        }
        write_object_end(writer)
    }

    fn write_object_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        members: &'a [Element],
        class_def: Option<&'a ClassDefinition>,
    ) -> Result<(), Error> {
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        match class_def {
            Some(def) if !def.is_anonymous() => {
                write_type_marker(writer, TypeMarker::TypedObject)?;
                write_string(writer, &def.name)?;
            }
            _ => write_type_marker(writer, TypeMarker::Object)?,
        }
        self.write_members(writer, members)
    }

    fn write_strict_array_element<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        children: &'a [Value],
    ) -> Result<(), Error> {
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        let length = u32::try_from(children.len())
            .map_err(|_| Error::Serialization("array is too long".to_string()))?;
        write_type_marker(writer, TypeMarker::StrictArray)?;
        writer.write_u32::<BigEndian>(length)?;
        for child in children {
            self.write_value(writer, child)?;
        }
        Ok(())
    }

    fn write_mixed_array<W: Write>(
        &mut self,
        writer: &mut W,
        value: &'a Value,
        dense: &'a [Value],
        assoc: &'a [Element],
        length: u32,
    ) -> Result<(), Error> {
        if self.write_reference(writer, value)? {
            return Ok(());
        }
        write_type_marker(writer, TypeMarker::EcmaArray)?;
        if dense.is_empty() {
            writer.write_u32::<BigEndian>(length)?;
        } else {
            let dense_len = u32::try_from(dense.len())
                .map_err(|_| Error::Serialization("array is too long".to_string()))?;
            writer.write_u32::<BigEndian>(dense_len)?;
        }

        // The dense part becomes numbered keys, amf0 has no separate dense section
        for (index, child) in dense.iter().enumerate() {
            write_string(writer, &index.to_string())?;
            self.write_value(writer, child)?;
        }
        self.write_members(writer, assoc)
    }

    /// Write a single value, including its type marker
    pub(crate) fn write_value<W: Write>(&mut self, writer: &mut W, s: &'a Value) -> Result<(), Error> {
        match s {
            Value::Number(x) => write_number_element(writer, *x),
            Value::Bool(b) => write_bool_element(writer, *b),
            Value::String(s) => write_string_element(writer, s),
            Value::Object(members, class_def) => {
                self.write_object_element(writer, s, members, class_def.as_ref())
            }
            Value::Null => write_type_marker(writer, TypeMarker::Null),
            Value::Undefined => write_type_marker(writer, TypeMarker::Undefined),
            Value::ECMAArray(dense, assoc, length) => {
                self.write_mixed_array(writer, s, dense, assoc, *length)
            }
            Value::StrictArray(children) => self.write_strict_array_element(writer, s, children),
            Value::Date(time, tz) => write_date_element(writer, *time, *tz),
            Value::Unsupported(raw) => write_unsupported_element(writer, raw),
            Value::XML(content, _) => write_xml_element(writer, content),
            Value::AMF3(inner) => write_amf3_element(writer, inner),
            Value::Integer(_)
            | Value::ByteArray(_)
            | Value::VectorInt(_, _)
            | Value::VectorUInt(_, _)
            | Value::VectorDouble(_, _)
            | Value::VectorObject(_, _, _)
            | Value::Dictionary(_, _) => write_amf3_element(writer, s),
        }
    }

    fn write_element<W: Write>(&mut self, writer: &mut W, element: &'a Element) -> Result<(), Error> {
        write_string(writer, &element.name)?;
        self.write_value(writer, &element.value)
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
