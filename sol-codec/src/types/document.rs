use super::{AMFVersion, Element, Header, Value};
use crate::errors::Error;
use crate::tree::{self, Path, ProjectionOptions};

/// The decoded contents of one `.sol` file
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct Document {
    /// The header of this file
    pub header: Header,

    /// The top level value, an anonymous object holding the body's elements in file order
    pub root: Value,
}

impl Document {
    /// Create a new document with the given name and version and an empty body
    #[inline]
    pub fn new_empty(name: impl Into<String>, version: AMFVersion) -> Self {
        Self::new(Vec::new(), name, version)
    }

    /// Create a new document with the given name, version and body
    #[inline]
    pub fn new(body: Vec<Element>, name: impl Into<String>, version: AMFVersion) -> Self {
        Self {
            header: Header::new(name, version),
            root: Value::Object(body, None),
        }
    }

    /// The shared object name from the header
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// The AMF version of the body
    pub fn version(&self) -> AMFVersion {
        self.header.format_version
    }

    /// The elements of the body, `None` if the root has been replaced by something other than an object
    pub fn body(&self) -> Option<&[Element]> {
        match self.root.unwrapped() {
            Value::Object(members, _) => Some(members),
            _ => None,
        }
    }

    /// Get the value at `path`
    pub fn get(&self, path: &Path) -> Result<&Value, Error> {
        tree::get(&self.root, path)
    }

    /// Replace the value at `path`
    pub fn set(&mut self, path: &Path, value: Value) -> Result<&mut Self, Error> {
        tree::set(&mut self.root, path, value)?;
        Ok(self)
    }

    /// Parse `text` into the variant of the value currently at `path` and store it there
    pub fn set_text(&mut self, path: &Path, text: &str) -> Result<&mut Self, Error> {
        let converted = tree::convert_text(tree::get(&self.root, path)?, text)?;
        self.set(path, converted)
    }

    /// Project the body into plain JSON
    pub fn to_json(&self, options: &ProjectionOptions) -> serde_json::Value {
        tree::to_json(&self.root, options)
    }
}

impl IntoIterator for Document {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        match self.root {
            Value::Object(members, _) => members.into_iter(),
            _ => Vec::new().into_iter(),
        }
    }
}
