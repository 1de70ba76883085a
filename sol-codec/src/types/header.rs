use super::AMFVersion;

/// The header of a `.sol` file
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    /// The number of bytes following the length field, as last read or written
    pub length: u32,

    /// The name of the shared object
    pub name: String,

    /// The version of AMF used to encode the body
    pub format_version: AMFVersion,
}

impl Header {
    /// Create a new header with the given name and version, will have a size of 0 until written
    #[inline]
    pub fn new(name: impl Into<String>, version: AMFVersion) -> Self {
        Self {
            length: 0,
            name: name.into(),
            format_version: version,
        }
    }
}
