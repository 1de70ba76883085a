use crate::errors::{Error, from_nom};
use crate::types::Value;

/// Support for reading AMF0 data
pub(crate) mod read;
/// AMF0 type markers
mod type_marker;
/// Support for writing AMF0 data
pub(crate) mod write;

/// Decode a single AMF0 value, starting at its type marker
///
/// The whole of `data` must be used by the value
pub fn decode_value(data: &[u8]) -> Result<Value, Error> {
    let (rest, value) = read::AMF0Decoder::new(data.len())
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

/// Encode a single value as AMF0, with a fresh reference table
pub fn encode_value(value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write::AMF0Encoder::default().write_value(&mut out, value)?;
    Ok(out)
}
