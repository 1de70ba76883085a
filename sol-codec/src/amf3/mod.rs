use crate::errors::{Error, from_nom};
use crate::types::Value;

/// Abstraction over the AMF3 length and reference types
pub(crate) mod length;
/// Reading of AMF3 data
pub(crate) mod read;
/// AMF3 type markers
mod type_marker;
/// Writing of AMF3 data
pub(crate) mod write;

#[cfg(fuzzing)]
pub use read::{fuzz_parse_string, fuzz_read_int, fuzz_read_int_signed};

/// Decode a single AMF3 value, starting at its type marker
///
/// The whole of `data` must be used by the value
pub fn decode_value(data: &[u8]) -> Result<Value, Error> {
    let (rest, value) = read::AMF3Decoder::new(data.len())
        .parse_single_element(data)
        .map_err(|e| from_nom(e, data))?;
    if !rest.is_empty() {
        return Err(Error::Format {
            offset: data.len() - rest.len(),
            reason: format!("{} bytes after the value", rest.len()),
        });
    }
    Ok(value)
}

/// Encode a single value as AMF3, with fresh reference tables
pub fn encode_value(value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write::AMF3Encoder::default().write_value_element(&mut out, value)?;
    Ok(out)
}
