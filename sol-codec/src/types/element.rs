use super::Value;

/// A named value
///
/// Used for object members, the associative part of ECMA arrays and the top level of a document.
/// Names are compared exactly and kept in the order they were read.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// Member name, may be empty inside ECMA arrays
    pub name: String,

    /// Value stored under `name`
    pub value: Value,
}

impl Element {
    /// Pair a name with anything that converts into a [`Value`]
    #[inline]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    #[allow(missing_docs)]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }
}
