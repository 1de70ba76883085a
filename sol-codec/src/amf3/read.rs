use crate::PADDING;
use crate::amf3::length::Length;
use crate::amf3::type_marker::TypeMarker;
use crate::errors::{DecodeError, ReferenceTable};
use crate::limits::DecodeLimits;
use crate::nom_utils::{AMFResult, expect_bytes, fail, take_str};
use crate::types::{Attribute, ClassDefinition, Element, Value};
use enumset::EnumSet;
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::multi::many_m_n;
use nom::number::complete::{be_f64, be_i32, be_u8, be_u32};

const REFERENCE_FLAG: u32 = 0x01;

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_read_int_signed(i: &[u8]) -> bool {
    read_int_signed(i).is_ok()
}

#[allow(clippy::unusual_byte_groupings)]
fn read_int_signed(i: &[u8]) -> AMFResult<'_, i32> {
    let (i, value) = read_int(i)?;

    // Sign extend from 29 bits
    let value = if value & 0b000_1000000_0000000_0000000_00000000 != 0 {
        value as i32 - 0b001_0000000_0000000_0000000_00000000
    } else {
        value as i32
    };

    Ok((i, value))
}

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_read_int(i: &[u8]) -> bool {
    read_int(i).is_ok()
}

/// Read a `U29`, 1 to 4 bytes where the first three carry 7 bits and a continuation flag and the fourth carries 8
pub(crate) fn read_int(i: &[u8]) -> AMFResult<'_, u32> {
    // Read the first byte of the number
    let (mut i, num) = be_u8(i)?;
    let mut value = (num & 0b01111111) as u32;
    // Check if we have another byte
    if num & 0b10000000 == 0 {
        return Ok((i, value));
    }

    for _ in 0..2 {
        let (j, num) = be_u8(i)?;
        i = j;
        value = (value << 7) | ((num & 0b01111111) as u32);
        // Check if we have another byte
        if num & 0b10000000 == 0 {
            return Ok((i, value));
        }
    }
    let (i, num) = be_u8(i)?;
    value = (value << 8) | (num as u32);

    Ok((i, value))
}

fn read_length(i: &[u8]) -> AMFResult<'_, Length> {
    map(read_int, Length::from_u29)(i)
}

fn parse_element_int(i: &[u8]) -> AMFResult<'_, Value> {
    map(read_int_signed, Value::Integer)(i)
}

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_parse_string(i: &[u8]) -> bool {
    AMF3Decoder::default().parse_string(i).is_ok()
}

fn parse_element_number(i: &[u8]) -> AMFResult<'_, Value> {
    map(be_f64, Value::Number)(i)
}

/// Fail with truncation unless `i` holds at least `needed` bytes, guards allocations sized from counts in the input
fn require<'a>(i: &'a [u8], needed: usize) -> AMFResult<'a, ()> {
    if i.len() < needed {
        return fail(DecodeError::Truncated(&i[i.len()..]));
    }
    Ok((i, ()))
}

/// Handles decoding AMF3
///
/// The reference tables live as long as the decoder, one decoder is used per body (or per embedded amf0 value)
#[derive(Default, Debug)]
pub(crate) struct AMF3Decoder {
    /// The table used to cache repeated strings, never contains the empty string
    string_reference_table: Vec<String>,

    /// The table used to cache repeated trait definitions
    trait_reference_table: Vec<ClassDefinition>,

    /// The table used to cache repeated complex values, `None` while a value is still being decoded
    object_reference_table: Vec<Option<Value>>,

    limits: DecodeLimits,
}

impl AMF3Decoder {
    /// A decoder for an input of `input_len` bytes
    pub(crate) fn new(input_len: usize) -> Self {
        Self::with_limits(DecodeLimits::for_input(input_len))
    }

    /// A decoder that continues with limits already partly used by an enclosing decoder
    pub(crate) fn with_limits(limits: DecodeLimits) -> Self {
        Self {
            string_reference_table: Vec::new(),
            trait_reference_table: Vec::new(),
            object_reference_table: Vec::new(),
            limits,
        }
    }

    pub(crate) fn into_limits(self) -> DecodeLimits {
        self.limits
    }

    fn parse_element_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let (i, s) = self.parse_string(i)?;
        Ok((i, Value::String(s)))
    }

    fn parse_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, String> {
        let (j, len) = read_length(i)?;

        match len {
            Length::Size(0) => Ok((j, String::new())),
            Length::Size(len) => {
                let (j, s) = take_str(j, len)?;
                self.string_reference_table.push(s.to_string());
                Ok((j, s.to_string()))
            }
            Length::Reference(index) => match self.string_reference_table.get(index) {
                Some(s) => {
                    self.limits.spend(i, s.len())?;
                    Ok((j, s.clone()))
                }
                None => fail(DecodeError::Reference(
                    i,
                    index,
                    ReferenceTable::String,
                    "is out of range",
                )),
            },
        }
    }

    /// Read the trait of an object, `flags` is the object header with the inline-object bit removed
    fn parse_class_def<'a>(&mut self, flags: u32, i: &'a [u8]) -> AMFResult<'a, ClassDefinition> {
        if flags & REFERENCE_FLAG == 0 {
            let index = (flags >> 1) as usize;
            return match self.trait_reference_table.get(index) {
                Some(class_def) => {
                    self.limits.charge_class(i, class_def)?;
                    Ok((i, class_def.clone()))
                }
                None => fail(DecodeError::Reference(
                    i,
                    index,
                    ReferenceTable::Trait,
                    "is out of range",
                )),
            };
        }
        let flags = flags >> 1;

        let (i, name) = self.parse_string(i)?;

        let encoding = (flags & 0x03) as u8;
        let attributes_count = (flags >> 2) as usize;

        let mut attributes = EnumSet::empty();
        if encoding & 0b1 == 1 {
            attributes |= Attribute::External;
        }
        if encoding & 0b10 == 0b10 {
            attributes |= Attribute::Dynamic;
        }

        // Externalizable traits have no member list, their payload format is up to the class
        if attributes.contains(Attribute::External) {
            return fail(DecodeError::Unsupported(format!(
                "externalizable class `{}`",
                name
            )));
        }

        // Each name takes at least one byte
        let (i, _) = require(i, attributes_count)?;
        let (i, static_props) =
            many_m_n(attributes_count, attributes_count, |i| self.parse_string(i))(i)?;

        let class_def = ClassDefinition {
            name,
            attributes,
            static_properties: static_props,
        };

        self.trait_reference_table.push(class_def.clone());
        Ok((i, class_def))
    }

    fn resolve_reference<'a>(&mut self, i: &'a [u8], index: usize) -> AMFResult<'a, Value> {
        match self.object_reference_table.get(index) {
            Some(Some(value)) => {
                self.limits.charge(i, value)?;
                Ok((i, value.clone()))
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

    /// Either resolve a back-reference or reserve a table slot, run `parser` with the inline length and fill the slot
    fn parse_reference_or_val<'a>(
        &mut self,
        i: &'a [u8],
        parser: impl FnOnce(&mut Self, &'a [u8], usize) -> AMFResult<'a, Value>,
    ) -> AMFResult<'a, Value> {
        let (j, len) = read_length(i)?;

        match len {
            Length::Reference(index) => {
                let (_, value) = self.resolve_reference(i, index)?;
                Ok((j, value))
            }
            Length::Size(len) => {
                let index = self.object_reference_table.len();
                self.object_reference_table.push(None);

                let (j, res) = parser(self, j, len as usize)?;

                if let Some(slot) = self.object_reference_table.get_mut(index) {
                    *slot = Some(res.clone());
                }

                Ok((j, res))
            }
        }
    }

    fn parse_object_static<'a>(
        &mut self,
        i: &'a [u8],
        class_def: &ClassDefinition,
    ) -> AMFResult<'a, Vec<Element>> {
        let mut elements = Vec::new();
        let mut i = i;

        for name in class_def.static_properties.iter() {
            let (j, e) = self.parse_single_element(i)?;

            elements.push(Element {
                name: name.clone(),
                value: e,
            });

            i = j;
        }

        Ok((i, elements))
    }

    fn parse_element_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let (j, flags) = read_int(i)?;

        if flags & REFERENCE_FLAG == 0 {
            let (_, value) = self.resolve_reference(i, (flags >> 1) as usize)?;
            return Ok((j, value));
        }

        let index = self.object_reference_table.len();
        self.object_reference_table.push(None);

        let (j, class_def) = self.parse_class_def(flags >> 1, j)?;

        let (mut j, mut elements) = self.parse_object_static(j, &class_def)?;

        if class_def.is_dynamic() {
            loop {
                let (k, name) = self.parse_string(j)?;
                if name.is_empty() {
                    j = k;
                    break;
                }
                let (k, value) = self.parse_single_element(k)?;
                elements.push(Element { name, value });
                j = k;
            }
        }

        let value = Value::Object(elements, Some(class_def));
        if let Some(slot) = self.object_reference_table.get_mut(index) {
            *slot = Some(value.clone());
        }

        Ok((j, value))
    }

    fn parse_element_byte_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |_this, i, len| {
            let (i, bytes) = take(len)(i)?;
            Ok((i, Value::ByteArray(bytes.to_vec())))
        })
    }

    /// A fixed-length flag then `len` items of `width` bytes
    fn parse_numeric_vector<'a, T>(
        &mut self,
        i: &'a [u8],
        width: usize,
        item: fn(&'a [u8]) -> AMFResult<'a, T>,
        build: fn(Vec<T>, bool) -> Value,
    ) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |_this, i, len| {
            let (i, fixed) = be_u8(i)?;
            let (i, _) = require(i, len * width)?;
            let (i, items) = many_m_n(len, len, item)(i)?;
            Ok((i, build(items, fixed == 1)))
        })
    }

    fn parse_element_object_vector<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, len| {
            let (i, fixed_length) = be_u8(i)?;

            let (i, object_type_name) = this.parse_string(i)?;

            let (i, _) = require(i, len)?;
            let (i, elems) = many_m_n(len, len, |i| this.parse_single_element(i))(i)?;

            Ok((
                i,
                Value::VectorObject(elems, object_type_name, fixed_length == 1),
            ))
        })
    }

    fn parse_element_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, length_usize| {
            let mut associative = Vec::new();

            let mut i = i;
            loop {
                let (j, key) = this.parse_string(i)?;
                if key.is_empty() {
                    i = j;
                    break;
                }
                let (j, value) = this.parse_single_element(j)?;
                associative.push(Element { name: key, value });
                i = j;
            }

            // Must parse `length` elements, each at least one byte
            let (i, _) = require(i, length_usize)?;
            let (i, dense) =
                many_m_n(length_usize, length_usize, |i| this.parse_single_element(i))(i)?;

            if associative.is_empty() {
                return Ok((i, Value::StrictArray(dense)));
            }

            let dense_len = dense.len() as u32;
            Ok((i, Value::ECMAArray(dense, associative, dense_len)))
        })
    }

    fn parse_element_dict<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, len| {
            let (i, weak_keys) = be_u8(i)?;

            // Keys and values take at least one byte each
            let (i, _) = require(i, len * 2)?;

            let mut pairs = Vec::with_capacity(len);
            let mut i = i;
            for _ in 0..len {
                let (j, key) = this.parse_single_element(i)?;
                let (j, value) = this.parse_single_element(j)?;
                pairs.push((key, value));
                i = j;
            }

            Ok((i, Value::Dictionary(pairs, weak_keys == 1)))
        })
    }

    fn parse_element_date<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |_this, i, _len| {
            let (i, ms) = be_f64(i)?;
            Ok((i, Value::Date(ms, None)))
        })
    }

    fn parse_element_xml<'a>(&mut self, i: &'a [u8], e4x: bool) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |_this, i, len| {
            let (i, data) = take_str(i, len)?;
            Ok((i, Value::XML(data.to_string(), e4x)))
        })
    }

    fn read_type_marker<'a>(&self, i: &'a [u8]) -> AMFResult<'a, TypeMarker> {
        let (j, type_) = be_u8(i)?;
        match TypeMarker::try_from(type_) {
            Ok(type_) => Ok((j, type_)),
            Err(()) => fail(DecodeError::Format(
                i,
                format!("unknown amf3 type marker {:#04x}", type_),
            )),
        }
    }

    /// Parse a single AMF3 element from the input
    pub(crate) fn parse_single_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.limits.enter(i)?;
        let result = self.parse_value(i);
        self.limits.leave();
        result
    }

    fn parse_value<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let (i, type_) = self.read_type_marker(i)?;

        match type_ {
            TypeMarker::Undefined => Ok((i, Value::Undefined)),
            TypeMarker::Null => Ok((i, Value::Null)),
            TypeMarker::False => Ok((i, Value::Bool(false))),
            TypeMarker::True => Ok((i, Value::Bool(true))),
            TypeMarker::Integer => parse_element_int(i),
            TypeMarker::Number => parse_element_number(i),
            TypeMarker::String => self.parse_element_string(i),
            TypeMarker::XmlDocument => self.parse_element_xml(i, false),
            TypeMarker::Date => self.parse_element_date(i),
            TypeMarker::Array => self.parse_element_array(i),
            TypeMarker::Object => self.parse_element_object(i),
            TypeMarker::Xml => self.parse_element_xml(i, true),
            TypeMarker::ByteArray => self.parse_element_byte_array(i),
            TypeMarker::VectorObject => self.parse_element_object_vector(i),
            TypeMarker::VectorInt => self.parse_numeric_vector(i, 4, be_i32, Value::VectorInt),
            TypeMarker::VectorUInt => self.parse_numeric_vector(i, 4, be_u32, Value::VectorUInt),
            TypeMarker::VectorDouble => {
                self.parse_numeric_vector(i, 8, be_f64, Value::VectorDouble)
            }
            TypeMarker::Dictionary => self.parse_element_dict(i),
        }
    }

    fn parse_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Element> {
        let (i, name) = self.parse_string(i)?;
        let (i, value) = self.parse_single_element(i)?;

        Ok((i, Element { name, value }))
    }

    /// Parse `(name, value, padding)` triples until the input is exhausted
    pub(crate) fn parse_body<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Vec<Element>> {
        let mut elements = Vec::new();

        let mut i = i;
        while !i.is_empty() {
            let (j, e) = self.parse_element(i)?;
            let (j, _) = expect_bytes(j, &PADDING, "element padding")?;
            elements.push(e);
            i = j;
        }

        Ok((i, elements))
    }
}
