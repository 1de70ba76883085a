use core::fmt;

/// The AMF encoding used for the body of a `.sol` file
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
#[repr(u8)]
pub enum AMFVersion {
    /// AMF0, written by ActionScript 2 content
    #[default]
    AMF0 = 0,

    /// AMF3, written by ActionScript 3 content
    AMF3 = 3,
}

impl AMFVersion {
    /// The byte stored in the low byte of the header flags word
    pub fn marker(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for AMFVersion {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AMF0),
            3 => Ok(Self::AMF3),
            other => Err(other),
        }
    }
}

impl fmt::Display for AMFVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AMFVersion::AMF0 => f.write_str("AMF0"),
            AMFVersion::AMF3 => f.write_str("AMF3"),
        }
    }
}
