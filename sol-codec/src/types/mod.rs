mod amf_version;
mod attribute;
mod class_definition;
mod document;
mod element;
mod header;
mod value;

pub use amf_version::AMFVersion;
pub use attribute::Attribute;
pub use class_definition::ClassDefinition;
pub use document::Document;
pub use element::Element;
pub use header::Header;
pub use value::Value;
