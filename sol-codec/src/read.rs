//! Handles reading of LSO files
use nom::number::complete::be_u32;

use crate::amf0::read::AMF0Decoder;
use crate::amf3::read::AMF3Decoder;
use crate::errors::{DecodeError, Error, from_nom};
use crate::nom_utils::{AMFResult, expect_bytes, fail, parse_string};
use crate::types::{AMFVersion, Document, Header, Value};
use crate::{HEADER_SIGNATURE, HEADER_VERSION, LENGTH_FIELD_END};

/// Bits of the flags word that mark a compressed or encrypted body
const UNSUPPORTED_FLAGS: u32 = 0xffff_ff00;

/// The main entry point of decoding a LSO file
/// Example of use
/// ```
/// use sol_codec::read::Reader;
/// let data = [
///     0x00, 0xBF, 0x00, 0x00, 0x00, 0x1D, b'T', b'C', b'S', b'O', 0x00, 0x04, 0x00, 0x00, 0x00,
///     0x00, 0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, b'a', 0x02,
///     0x00, 0x02, b'h', b'i', 0x00,
/// ];
/// let d = Reader::default().parse(&data).expect("Failed to parse lso file");
/// assert_eq!(d.name(), "test");
/// ```
#[derive(Default, Debug)]
pub struct Reader;

impl Reader {
    pub(crate) fn parse_header<'a>(&self, i: &'a [u8]) -> AMFResult<'a, Header> {
        let (i, _) = expect_bytes(i, &HEADER_VERSION, "version marker")?;
        let (i, length) = be_u32(i)?;
        let (i, _) = expect_bytes(i, &HEADER_SIGNATURE, "signature")?;

        let (i, name) = parse_string(i)?;

        let (j, flags) = be_u32(i)?;
        if flags & UNSUPPORTED_FLAGS != 0 {
            return fail(DecodeError::Unsupported(format!(
                "header flags {:#010x} (compressed or encrypted body)",
                flags
            )));
        }

        let format_version = match AMFVersion::try_from((flags & 0xff) as u8) {
            Ok(version) => version,
            Err(other) => {
                return fail(DecodeError::Format(
                    &i[3..],
                    format!("unknown amf version {}", other),
                ));
            }
        };

        Ok((
            j,
            Header {
                length,
                name: name.to_string(),
                format_version,
            },
        ))
    }

    /// Check the declared length against the real size of `full`
    fn check_length<'a>(&self, full: &'a [u8], header: &Header) -> AMFResult<'a, ()> {
        let declared = header.length as usize;
        let actual = full.len().saturating_sub(LENGTH_FIELD_END);
        if actual < declared {
            return fail(DecodeError::Truncated(&full[full.len()..]));
        }
        if actual > declared {
            return fail(DecodeError::Format(
                &full[LENGTH_FIELD_END + declared..],
                format!(
                    "{} bytes of data after the declared length",
                    actual - declared
                ),
            ));
        }
        Ok((full, ()))
    }

    /// Read the header and body of a LSO file
    pub(crate) fn parse_document<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Document> {
        let (body, header) = self.parse_header(i)?;
        self.check_length(i, &header)?;

        let (rest, members) = match header.format_version {
            AMFVersion::AMF0 => AMF0Decoder::new(body.len()).parse_body(body)?,
            AMFVersion::AMF3 => AMF3Decoder::new(body.len()).parse_body(body)?,
        };

        Ok((
            rest,
            Document {
                header,
                root: Value::Object(members, None),
            },
        ))
    }

    /// Read a given buffer as a LSO
    pub fn parse(&mut self, i: &[u8]) -> Result<Document, Error> {
        if i.is_empty() {
            return Err(Error::EmptyInput);
        }
        self.parse_document(i)
            .map(|(_, document)| document)
            .map_err(|e| from_nom(e, i))
    }
}

/// Read only the header of a LSO file, returning it with the offset at which the body starts
///
/// The declared length is checked against the size of `data`
pub fn read_header(data: &[u8]) -> Result<(Header, usize), Error> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }
    let reader = Reader;
    let checked = reader
        .parse_header(data)
        .and_then(|(body, header)| reader.check_length(data, &header).map(|_| (body, header)));
    checked
        .map(|(body, header)| (header, data.len() - body.len()))
        .map_err(|e| from_nom(e, data))
}

/// Decode a complete `.sol` file
pub fn decode(data: &[u8]) -> Result<Document, Error> {
    Reader.parse(data)
}
