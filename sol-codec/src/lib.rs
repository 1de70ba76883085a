//! Read, edit and write Flash Local Shared Object (`.sol`) files
//!
//! ```
//! use sol_codec::tree::Path;
//! use sol_codec::types::{AMFVersion, Document, Element, Value};
//!
//! let mut doc = Document::new(vec![Element::new("coins", 10.0)], "save", AMFVersion::AMF0);
//! doc.set_text(&Path::parse("coins"), "250").unwrap();
//!
//! let bytes = sol_codec::encode(&doc).unwrap();
//! let back = sol_codec::decode(&bytes).unwrap();
//! assert_eq!(back.get(&Path::parse("coins")).unwrap(), &Value::Number(250.0));
//! ```
#![warn(missing_docs)]

const HEADER_VERSION: [u8; 2] = [0x00, 0xbf];
const HEADER_SIGNATURE: [u8; 10] = [0x54, 0x43, 0x53, 0x4f, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00];
const PADDING: [u8; 1] = [0x00];
/// Offset of the first byte counted by the header length field
const LENGTH_FIELD_END: usize = 6;

/// Reading and writing of the AMF0 format
pub mod amf0;
/// Reading and writing of the AMF3 format
pub mod amf3;
mod element_cache;
/// Error types
pub mod errors;
mod limits;
mod nom_utils;
/// Reading of `.sol` files
pub mod read;
/// Navigation, editing, JSON projection and diffing of decoded values
pub mod tree;
/// Types used for representing `.sol` files and their values
pub mod types;
/// Writing of `.sol` files
pub mod write;

pub use errors::Error;
pub use read::decode;
pub use write::encode;

use crate::types::Document;
use std::path::Path;

/// Read and decode the `.sol` file at `path`
pub fn read_file(path: impl AsRef<Path>) -> Result<Document, Error> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    log::debug!("Read {} bytes from {}", data.len(), path.display());
    decode(&data)
}

/// Encode `document` and write it to `path`
///
/// The file is only opened once encoding has succeeded, a failed encode leaves an existing file untouched
pub fn write_file(path: impl AsRef<Path>, document: &Document) -> Result<(), Error> {
    let path = path.as_ref();
    let data = encode(document)?;
    std::fs::write(path, &data)?;
    log::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}
