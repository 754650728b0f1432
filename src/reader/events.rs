//! XML Event Types
//!
//! Pull-parser events produced by the fragment reader.

use std::borrow::Cow;

use crate::core::attributes::Attribute;

/// XML parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// `<name attrs...>`
    StartElement(StartElement<'a>),
    /// `</name>`
    EndElement { name: &'a str },
    /// `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    /// Character data with entities decoded
    Text(Cow<'a, str>),
    CData(&'a str),
    Comment(&'a str),
    /// `<?target data?>`
    ProcessingInstruction { target: &'a str, data: &'a str },
}

/// Start or empty element event data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement<'a> {
    /// Qualified name (may include a prefix)
    pub name: &'a str,
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a str, attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    pub fn local_name(&self) -> &'a str {
        self.name.split_once(':').map(|(_, l)| l).unwrap_or(self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

impl<'a> XmlEvent<'a> {
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }

    pub fn is_end_element(&self) -> bool {
        matches!(self, XmlEvent::EndElement { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlEvent::Text(t) => Some(t.as_ref()),
            XmlEvent::CData(t) => Some(t),
            _ => None,
        }
    }
}
