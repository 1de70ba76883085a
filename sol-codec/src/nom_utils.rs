use crate::errors::{DecodeError, Error};
use byteorder::{BigEndian, WriteBytesExt};
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::{Err, IResult};
use std::io::Write;

pub(crate) type AMFResult<'a, T> = IResult<&'a [u8], T, DecodeError<'a>>;

/// Fail the current parse with `error`
pub(crate) fn fail<'a, T>(error: DecodeError<'a>) -> AMFResult<'a, T> {
    Err(Err::Error(error))
}

/// Take `length` bytes and check they are valid UTF-8
pub(crate) fn take_str<C: nom::ToUsize>(i: &[u8], length: C) -> AMFResult<'_, &str> {
    let (rest, bytes) = take(length)(i)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok((rest, s)),
        Err(e) => fail(DecodeError::Format(
            &i[e.valid_up_to()..],
            "string is not valid UTF-8".to_string(),
        )),
    }
}

/// Take `expected.len()` bytes and check they match, a short buffer is truncation rather than a mismatch
pub(crate) fn expect_bytes<'a>(
    i: &'a [u8],
    expected: &'static [u8],
    what: &'static str,
) -> AMFResult<'a, ()> {
    let (rest, found) = take(expected.len())(i)?;
    if found != expected {
        return fail(DecodeError::Format(
            i,
            format!("bad {}, expected {:02x?} got {:02x?}", what, expected, found),
        ));
    }
    Ok((rest, ()))
}

/// A u16 length prefixed UTF-8 string
pub(crate) fn parse_string(i: &[u8]) -> AMFResult<'_, &str> {
    let (i, length) = be_u16(i)?;
    take_str(i, length)
}

/// Write a u16 length prefixed string
pub(crate) fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<(), Error> {
    let length = u16::try_from(s.len()).map_err(|_| {
        Error::Serialization(format!(
            "string of {} bytes does not fit a 16 bit length",
            s.len()
        ))
    })?;
    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}
