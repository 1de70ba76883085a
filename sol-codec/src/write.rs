//! Handles writing of LSO files
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

use crate::amf0::write::AMF0Encoder;
use crate::amf3::write::AMF3Encoder;
use crate::errors::Error;
use crate::nom_utils::write_string;
use crate::types::{AMFVersion, Document, Header, Value};
use crate::{HEADER_SIGNATURE, HEADER_VERSION, LENGTH_FIELD_END, PADDING};

/// Handles writing a given LSO
#[derive(Default, Debug)]
pub struct Writer;

impl Writer {
    /// Write a given LSO, returning the length that was stored in the header
    ///
    /// The body is serialized into memory first so nothing reaches `writer` if encoding fails
    pub fn write_full<W: Write>(&mut self, writer: &mut W, lso: &Document) -> Result<u32, Error> {
        let members = match lso.root.unwrapped() {
            Value::Object(members, _) => members,
            other => {
                return Err(Error::Serialization(format!(
                    "the root of a document must be an Object, found {}",
                    other.kind()
                )));
            }
        };

        let mut buffer = Vec::new();
        match lso.header.format_version {
            AMFVersion::AMF0 => AMF0Encoder::default().write_body(&mut buffer, members)?,
            AMFVersion::AMF3 => AMF3Encoder::default().write_body(&mut buffer, members)?,
        }

        let length = u32::try_from(header_length(&lso.header) + buffer.len())
            .map_err(|_| Error::Serialization("file is larger than 4GiB".to_string()))?;

        let header = Header {
            length,
            ..lso.header.clone()
        };
        write_header(writer, &header)?;
        writer.write_all(&buffer)?;
        Ok(length)
    }
}

/// Write the header of a LSO file, `header.length` is written as given
pub fn write_header<W: Write>(writer: &mut W, header: &Header) -> Result<(), Error> {
    writer.write_all(&HEADER_VERSION)?;
    writer.write_u32::<BigEndian>(header.length)?;
    writer.write_all(&HEADER_SIGNATURE)?;
    write_string(writer, &header.name)?;
    writer.write_all(&PADDING)?;
    writer.write_all(&PADDING)?;
    writer.write_all(&PADDING)?;
    writer.write_u8(header.format_version.marker())?;
    Ok(())
}

/// Number of header bytes counted by the length field
fn header_length(header: &Header) -> usize {
    HEADER_SIGNATURE.len() + 2 + header.name.len() + 4
}

/// Encode a document into the bytes of a `.sol` file
pub fn encode(document: &Document) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(LENGTH_FIELD_END + header_length(&document.header));
    Writer.write_full(&mut out, document)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Element;
    use pretty_assertions::assert_eq;

    #[test]
    fn hi_document() {
        let d = Document::new(vec![Element::new("a", "hi")], "test", AMFVersion::AMF0);
        let bytes = encode(&d).unwrap();
        assert_eq!(bytes.len(), 35);
        assert_eq!(&bytes[2..6], &[0, 0, 0, 0x1D]);
        assert_eq!(&bytes[26..], &[0, 1, b'a', 2, 0, 2, b'h', b'i', 0]);
    }

    #[test]
    fn length_matches_for_amf3() {
        let d = Document::new(
            vec![Element::new("a", "hi"), Element::new("b", "hi")],
            "t",
            AMFVersion::AMF3,
        );
        let bytes = encode(&d).unwrap();
        assert_eq!(
            bytes,
            vec![
                0x00, 0xBF, 0x00, 0x00, 0x00, 0x1D, b'T', b'C', b'S', b'O', 0x00, 0x04, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x01, b't', 0x00, 0x00, 0x00, 0x03, //
                0x03, b'a', 0x06, 0x05, b'h', b'i', 0x00, //
                0x03, b'b', 0x06, 0x02, 0x00,
            ]
        );
    }

    #[test]
    fn document_is_not_modified() {
        let d = Document::new(vec![Element::new("a", 1.0)], "x", AMFVersion::AMF0);
        let before = d.clone();
        let mut out = Vec::new();
        let length = Writer.write_full(&mut out, &d).unwrap();
        assert_eq!(d, before);
        assert_eq!(length as usize, out.len() - LENGTH_FIELD_END);
    }

    #[test]
    fn root_must_be_an_object() {
        let mut d = Document::new_empty("x", AMFVersion::AMF0);
        d.root = Value::Null;
        let mut out = Vec::new();
        assert!(matches!(
            Writer.write_full(&mut out, &d),
            Err(Error::Serialization(_))
        ));
        assert!(out.is_empty());
    }
}
