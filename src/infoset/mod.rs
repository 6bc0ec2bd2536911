// src/infoset/mod.rs

//! Versionable attribute storage for content items
//!
//! An infoset is a small ordered document: one element per part type name,
//! one attribute per field, stored as XML text in the content database.
//! Every content item carries two of them, one for unversioned data and one
//! for data that belongs to the current version. The structure enforces the
//! document invariants directly: part names are unique within a document and
//! attribute names are unique within a part, with later stores overwriting
//! earlier ones.

mod value;

pub use value::AttributeValue;

use crate::error::{Error, Result};
use crate::xml::{self, Element};

/// Root element name used for serialized infoset documents.
const DOCUMENT_ROOT: &str = "Data";

/// One part element: the part type name plus its field attributes in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartElement {
    name: String,
    attributes: Vec<(String, String)>,
}

impl PartElement {
    pub fn new(name: impl Into<String>) -> Self {
        PartElement {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw text of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, overwriting any previous value under the same name.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// All attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An ordered set of part elements, unique by part type name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Infoset {
    parts: Vec<PartElement>,
}

impl Infoset {
    pub fn new() -> Self {
        Infoset::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// All parts in insertion order.
    pub fn parts(&self) -> &[PartElement] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&PartElement> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// The part with the given name, inserted empty if not yet present.
    pub fn part_mut_or_insert(&mut self, name: &str) -> &mut PartElement {
        let index = match self.parts.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.parts.push(PartElement::new(name));
                self.parts.len() - 1
            }
        };
        &mut self.parts[index]
    }

    /// Whether the attribute is present, regardless of whether its text
    /// parses as any particular type.
    pub fn has(&self, part_name: &str, attribute: &str) -> bool {
        self.part(part_name)
            .and_then(|p| p.attr(attribute))
            .is_some()
    }

    /// Read a typed attribute. Absence yields the type's absent value;
    /// present but unparsable text is a conversion error.
    pub fn get<T: AttributeValue>(&self, part_name: &str, attribute: &str) -> Result<T> {
        match self.part(part_name).and_then(|p| p.attr(attribute)) {
            None => Ok(T::absent()),
            Some(raw) => T::parse_attr(raw).ok_or_else(|| Error::ConversionError {
                part: part_name.to_string(),
                attribute: attribute.to_string(),
                value: raw.to_string(),
                target: T::TYPE_NAME,
            }),
        }
    }

    /// Write a typed attribute, creating the part element on demand.
    pub fn set<T: AttributeValue>(&mut self, part_name: &str, attribute: &str, value: &T) {
        self.part_mut_or_insert(part_name)
            .set_attr(attribute, value.to_attr());
    }

    /// Copy every attribute of `part` into this document, overwriting
    /// attributes that already exist.
    pub fn merge_part(&mut self, part: &PartElement) {
        let target = self.part_mut_or_insert(&part.name);
        for (name, value) in part.attrs() {
            target.set_attr(name, value);
        }
    }

    /// Serialize to the stored XML form.
    pub fn to_xml(&self) -> Result<String> {
        let mut root = Element::new(DOCUMENT_ROOT);
        for part in &self.parts {
            let mut element = Element::new(part.name.as_str());
            element.attributes = part.attributes.clone();
            root.children.push(element);
        }
        xml::write_document(&root)
    }

    /// Parse a stored XML document back into an infoset.
    ///
    /// Duplicate part elements are merged into the first occurrence so the
    /// uniqueness invariant holds even for documents written by hand.
    pub fn from_xml(text: &str) -> Result<Infoset> {
        let root = xml::parse_document(text)?;
        let mut infoset = Infoset::new();
        for child in &root.children {
            if !child.children.is_empty() {
                return Err(Error::XmlError(format!(
                    "infoset part {} must not contain child elements",
                    child.name
                )));
            }
            let part = infoset.part_mut_or_insert(&child.name);
            for (name, value) in &child.attributes {
                part.set_attr(name, value.as_str());
            }
        }
        Ok(infoset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut doc = Infoset::new();
        doc.set("TitlePart", "Title", &"Home".to_string());
        doc.set("CounterPart", "Count", &42i64);

        let title: String = doc.get("TitlePart", "Title").unwrap();
        let count: i64 = doc.get("CounterPart", "Count").unwrap();
        assert_eq!(title, "Home");
        assert_eq!(count, 42);
    }

    #[test]
    fn absent_attribute_reads_as_absent_value() {
        let doc = Infoset::new();
        let text: String = doc.get("TitlePart", "Title").unwrap();
        let count: i64 = doc.get("TitlePart", "Count").unwrap();
        let flag: bool = doc.get("TitlePart", "Hidden").unwrap();
        assert_eq!(text, "");
        assert_eq!(count, 0);
        assert!(!flag);
    }

    #[test]
    fn unparsable_attribute_is_a_conversion_error() {
        let mut doc = Infoset::new();
        doc.set("CounterPart", "Count", &"twelve".to_string());

        let err = doc.get::<i64>("CounterPart", "Count").unwrap_err();
        match err {
            Error::ConversionError {
                part,
                attribute,
                value,
                target,
            } => {
                assert_eq!(part, "CounterPart");
                assert_eq!(attribute, "Count");
                assert_eq!(value, "twelve");
                assert_eq!(target, "i64");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_set_keeps_one_part_and_one_attribute() {
        let mut doc = Infoset::new();
        doc.set("TitlePart", "Title", &"First".to_string());
        doc.set("TitlePart", "Title", &"Second".to_string());
        doc.set("TitlePart", "Subtitle", &"Sub".to_string());

        assert_eq!(doc.parts().len(), 1);
        let part = doc.part("TitlePart").unwrap();
        assert_eq!(part.attrs().count(), 2);
        assert_eq!(part.attr("Title"), Some("Second"));
    }

    #[test]
    fn has_distinguishes_absent_from_present() {
        let mut doc = Infoset::new();
        assert!(!doc.has("TitlePart", "Title"));
        doc.set("TitlePart", "Title", &String::new());
        assert!(doc.has("TitlePart", "Title"));
    }

    #[test]
    fn xml_round_trip_preserves_order_and_text() {
        let mut doc = Infoset::new();
        doc.set("TitlePart", "Title", &"Tom & Jerry <3".to_string());
        doc.set("BodyPart", "Text", &"\"quoted\"".to_string());

        let xml = doc.to_xml().unwrap();
        let parsed = Infoset::from_xml(&xml).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.parts()[0].name(), "TitlePart");
        assert_eq!(parsed.parts()[1].name(), "BodyPart");
    }

    #[test]
    fn empty_document_serializes_to_bare_root() {
        assert_eq!(Infoset::new().to_xml().unwrap(), "<Data/>");
        assert!(Infoset::from_xml("<Data/>").unwrap().is_empty());
    }

    #[test]
    fn duplicate_parts_merge_into_first() {
        let doc =
            Infoset::from_xml(r#"<Data><A X="1"/><B Y="2"/><A X="3" Z="4"/></Data>"#).unwrap();
        assert_eq!(doc.parts().len(), 2);
        assert_eq!(doc.parts()[0].name(), "A");
        assert_eq!(doc.parts()[0].attr("X"), Some("3"));
        assert_eq!(doc.parts()[0].attr("Z"), Some("4"));
    }

    #[test]
    fn nested_part_children_rejected() {
        assert!(Infoset::from_xml("<Data><A><B/></A></Data>").is_err());
    }

    #[test]
    fn merge_part_overwrites_existing_attributes() {
        let mut doc = Infoset::new();
        doc.set("TitlePart", "Title", &"Old".to_string());

        let mut incoming = PartElement::new("TitlePart");
        incoming.set_attr("Title", "New");
        incoming.set_attr("Subtitle", "Added");
        doc.merge_part(&incoming);

        let part = doc.part("TitlePart").unwrap();
        assert_eq!(part.attr("Title"), Some("New"));
        assert_eq!(part.attr("Subtitle"), Some("Added"));
        assert_eq!(doc.parts().len(), 1);
    }
}
