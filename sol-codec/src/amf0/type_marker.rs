/// The byte in front of every AMF0 value
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
#[repr(u8)]
pub(crate) enum TypeMarker {
    /// IEEE-754 double
    Number = 0x00,
    Bool = 0x01,
    /// String up to 65535 bytes
    String = 0x02,
    /// Anonymous object, members until an empty name and `ObjectEnd`
    Object = 0x03,
    /// Reserved, never written by Flash
    MovieClip = 0x04,
    Null = 0x05,
    Undefined = 0x06,
    /// u16 index of an earlier object or array
    Reference = 0x07,
    /// Associative array with a declared length
    EcmaArray = 0x08,
    ObjectEnd = 0x09,
    /// u32 count followed by the values
    StrictArray = 0x0A,
    /// Milliseconds and a timezone offset in minutes
    Date = 0x0B,
    /// String with a u32 length
    LongString = 0x0C,
    /// Value the player couldn't serialize, no payload
    Unsupported = 0x0D,
    /// Reserved, never written by Flash
    RecordSet = 0x0E,
    Xml = 0x0F,
    /// Class name followed by the object body
    TypedObject = 0x10,
    /// The next value is AMF3 encoded
    AvmPlus = 0x11,
}

impl TryFrom<u8> for TypeMarker {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => Self::Number,
            0x01 => Self::Bool,
            0x02 => Self::String,
            0x03 => Self::Object,
            0x04 => Self::MovieClip,
            0x05 => Self::Null,
            0x06 => Self::Undefined,
            0x07 => Self::Reference,
            0x08 => Self::EcmaArray,
            0x09 => Self::ObjectEnd,
            0x0A => Self::StrictArray,
            0x0B => Self::Date,
            0x0C => Self::LongString,
            0x0D => Self::Unsupported,
            0x0E => Self::RecordSet,
            0x0F => Self::Xml,
            0x10 => Self::TypedObject,
            0x11 => Self::AvmPlus,
            _ => return Err(()),
        })
    }
}
