use crate::amf3::write::write_u29;
use crate::errors::Error;
use std::io::Write;

/// The `U29` header in front of every amf3 string and complex value
///
/// Bit 0 clear means the rest is an index into a reference table, set means the rest is a length (or flags)
#[derive(Copy, Clone, Debug, Eq, Ord, PartialOrd, PartialEq)]
pub(crate) enum Length {
    Size(u32),
    Reference(usize),
}

impl Length {
    pub(crate) fn from_u29(val: u32) -> Self {
        if val & 0b1 == 0 {
            Length::Reference((val >> 1) as usize)
        } else {
            Length::Size(val >> 1)
        }
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        match *self {
            // With the last bit set
            Length::Size(x) => write_u29(writer, x.checked_mul(2).unwrap_or(u32::MAX) | 0b1),
            Length::Reference(x) => {
                let x = u32::try_from(x)
                    .map_err(|_| Error::Serialization(format!("reference index {} is too large", x)))?;
                write_u29(writer, x.checked_mul(2).unwrap_or(u32::MAX) & !0b1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_flag() {
        assert_eq!(Length::from_u29(0b101), Length::Size(2));
        assert_eq!(Length::from_u29(0b100), Length::Reference(2));
    }

    #[test]
    fn write_inline_and_reference() {
        let mut out = Vec::new();
        Length::Size(2).write(&mut out).unwrap();
        Length::Reference(1).write(&mut out).unwrap();
        assert_eq!(out, vec![0x05, 0x02]);
    }

    #[test]
    fn oversized_length_is_rejected() {
        assert!(matches!(
            Length::Size(1 << 28).write(&mut Vec::new()),
            Err(Error::Serialization(_))
        ));
    }
}
