use super::{Attribute, Element};
use enumset::EnumSet;

/// A class definition (trait) describing the shape of an object
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClassDefinition {
    /// The name of the class, empty for anonymous objects
    pub name: String,

    /// The attributes on this trait
    pub attributes: EnumSet<Attribute>,

    /// The names of the sealed members, in wire order
    pub static_properties: Vec<String>,
}

impl Default for ClassDefinition {
    /// The trait of a plain `{}` object: anonymous, dynamic, no sealed members
    fn default() -> Self {
        Self {
            name: String::new(),
            attributes: Attribute::Dynamic.into(),
            static_properties: Vec::new(),
        }
    }
}

impl ClassDefinition {
    /// Creates a dynamic class definition with the given name and no sealed members
    pub fn default_with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True for the trait of plain objects that carry no class name
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    /// True if objects of this class may carry members outside of `static_properties`
    pub fn is_dynamic(&self) -> bool {
        self.attributes.contains(Attribute::Dynamic)
    }

    /// True if the class uses custom (externalizable) serialization
    pub fn is_external(&self) -> bool {
        self.attributes.contains(Attribute::External)
    }

    /// Check that `members` can be written with this trait
    ///
    /// Every sealed member has to be present, and members outside the sealed list need a dynamic trait
    pub fn check_members(&self, members: &[Element]) -> Result<(), String> {
        if let Some(missing) = self
            .static_properties
            .iter()
            .find(|p| !members.iter().any(|m| &m.name == *p))
        {
            return Err(format!(
                "sealed member `{}` of class `{}` is missing",
                missing, self.name
            ));
        }

        if !self.is_dynamic() {
            if let Some(extra) = members
                .iter()
                .find(|m| !self.static_properties.contains(&m.name))
            {
                return Err(format!(
                    "member `{}` is not declared by sealed class `{}`",
                    extra.name, self.name
                ));
            }
        }
        Ok(())
    }
}
