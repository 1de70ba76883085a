use super::{ClassDefinition, Element};

/// Any value that can be stored in a shared object
///
/// AMF0 and AMF3 share one model. Variants that only exist in AMF3 are written into AMF0 bodies by
/// switching to AMF3 for that one value, see [`Value::AMF3`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64 bit float, the AMF0 number and AMF3 double
    Number(f64),

    #[allow(missing_docs)]
    Bool(bool),

    /// Text of any length, long AMF0 strings use a different marker on the wire
    String(String),

    /// Members in the order they were read
    ///
    /// `None` for plain AMF0 objects. Typed AMF0 objects only carry the class name, AMF3 objects
    /// always carry their full trait.
    Object(Vec<Element>, Option<ClassDefinition>),

    #[allow(missing_docs)]
    Null,

    #[allow(missing_docs)]
    Undefined,

    /// (dense part, associative part, declared length)
    ///
    /// AMF0 only has the associative part and stores a count that games don't always keep in
    /// sync, so it is carried separately. AMF3 arrays end up here when they have named entries.
    ECMAArray(Vec<Value>, Vec<Element>, u32),

    /// Array with only indexed entries
    StrictArray(Vec<Value>),

    /// (milliseconds since the epoch, timezone offset in minutes), AMF3 dates carry no offset
    Date(f64, Option<i16>),

    /// A slot the player marked as unserializable, kept so it is written back unchanged
    Unsupported(Vec<u8>),

    /// (markup, is E4X), false for the legacy `XMLDocument` type
    XML(String, bool),

    /// An AMF3 value inside an AMF0 body
    AMF3(Box<Value>),

    /// 29 bit signed integer, AMF3 only
    Integer(i32),

    /// Raw bytes, AMF3 only
    ByteArray(Vec<u8>),

    /// (items, fixed length)
    VectorInt(Vec<i32>, bool),

    /// (items, fixed length)
    VectorUInt(Vec<u32>, bool),

    /// (items, fixed length)
    VectorDouble(Vec<f64>, bool),

    /// (items, element class name, fixed length)
    VectorObject(Vec<Value>, String, bool),

    /// (key value pairs, weak keys)
    Dictionary(Vec<(Value, Value)>, bool),
}

impl Value {
    /// An anonymous object with the given members
    pub fn object(members: Vec<Element>) -> Self {
        Value::Object(members, None)
    }

    /// Name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Object(_, _) => "Object",
            Value::Null => "Null",
            Value::Undefined => "Undefined",
            Value::ECMAArray(_, _, _) => "ECMAArray",
            Value::StrictArray(_) => "StrictArray",
            Value::Date(_, _) => "Date",
            Value::Unsupported(_) => "Unsupported",
            Value::XML(_, _) => "XML",
            Value::AMF3(inner) => inner.kind(),
            Value::Integer(_) => "Integer",
            Value::ByteArray(_) => "ByteArray",
            Value::VectorInt(_, _) => "VectorInt",
            Value::VectorUInt(_, _) => "VectorUInt",
            Value::VectorDouble(_, _) => "VectorDouble",
            Value::VectorObject(_, _, _) => "VectorObject",
            Value::Dictionary(_, _) => "Dictionary",
        }
    }

    /// The value with any amf3 embedding removed
    pub fn unwrapped(&self) -> &Value {
        match self {
            Value::AMF3(inner) => inner.unwrapped(),
            other => other,
        }
    }

    /// Mutable version of [`Value::unwrapped`]
    pub fn unwrapped_mut(&mut self) -> &mut Value {
        match self {
            Value::AMF3(inner) => inner.unwrapped_mut(),
            other => other,
        }
    }

    /// True for values that contain other values
    pub fn is_complex(&self) -> bool {
        matches!(
            self.unwrapped(),
            Value::Object(_, _)
                | Value::ECMAArray(_, _, _)
                | Value::StrictArray(_)
                | Value::ByteArray(_)
                | Value::VectorInt(_, _)
                | Value::VectorUInt(_, _)
                | Value::VectorDouble(_, _)
                | Value::VectorObject(_, _, _)
                | Value::Dictionary(_, _)
        )
    }

    /// Look up a member of an object or an associative array entry by name
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self.unwrapped() {
            Value::Object(members, _) | Value::ECMAArray(_, members, _) => members
                .iter()
                .find(|e| e.name == name)
                .map(|e| &e.value),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Element>> for Value {
    fn from(members: Vec<Element>) -> Self {
        Value::Object(members, None)
    }
}
