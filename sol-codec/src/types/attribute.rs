use enumset::EnumSetType;

/// The flags an AMF3 trait can carry
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(EnumSetType, Debug)]
pub enum Attribute {
    /// Objects built from a dynamic trait may carry members beyond the sealed ones
    Dynamic,

    /// Objects built from an external trait serialize themselves, these are not supported
    External,
}
