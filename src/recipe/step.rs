// src/recipe/step.rs

//! Recipe documents and their steps
//!
//! A recipe is an XML document whose root children are steps, executed in
//! document order. A step's children are import units: the element name is
//! the unit's content type, the `Id` attribute its stable identity, the
//! `Requires` attribute a comma or whitespace separated list of identities
//! it depends on, and each child element a part definition whose attributes
//! become field values.
//!
//! ```ignore
//! <Recipe>
//!   <Data BatchSize="50">
//!     <Page Id="page-about" Requires="page-home">
//!       <TitlePart Title="About"/>
//!     </Page>
//!   </Data>
//! </Recipe>
//! ```
//!
//! Unknown attributes and elements below the part level are ignored so the
//! format can grow without breaking older importers.

use crate::error::Result;
use crate::identity::ContentIdentity;
use crate::infoset::PartElement;
use crate::xml::{self, Element};
use std::path::Path;
use tracing::debug;

/// Attribute naming a unit's stable identity.
pub const ID_ATTRIBUTE: &str = "Id";
/// Attribute listing the identities a unit depends on.
const REQUIRES_ATTRIBUTE: &str = "Requires";
/// Step attribute bounding how many units share one transaction scope.
pub const BATCH_SIZE_ATTRIBUTE: &str = "BatchSize";

/// A parsed recipe: an ordered list of steps.
#[derive(Debug, Clone)]
pub struct Recipe {
    steps: Vec<RecipeStep>,
}

impl Recipe {
    /// Parse a recipe document from XML text.
    pub fn parse(text: &str) -> Result<Recipe> {
        let root = xml::parse_document(text)?;
        let steps = root.children.iter().map(RecipeStep::from_element).collect();
        Ok(Recipe { steps })
    }

    /// Parse a recipe document from a file.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Recipe> {
        let text = std::fs::read_to_string(path)?;
        Recipe::parse(&text)
    }

    pub fn steps(&self) -> &[RecipeStep] {
        &self.steps
    }
}

/// One step of a recipe, holding its raw content for handlers to interpret.
#[derive(Debug, Clone)]
pub struct RecipeStep {
    name: String,
    attributes: Vec<(String, String)>,
    content: Vec<Element>,
}

impl RecipeStep {
    fn from_element(element: &Element) -> RecipeStep {
        RecipeStep {
            name: element.name.clone(),
            attributes: element.attributes.clone(),
            content: element.children.clone(),
        }
    }

    /// The step name, matched case-insensitively by handlers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a step-level attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The configured batch size: a positive integer, or `None` when the
    /// attribute is missing, unparsable, or non-positive, meaning the whole
    /// step runs as a single batch.
    pub fn batch_size(&self) -> Option<usize> {
        self.attr(BATCH_SIZE_ATTRIBUTE)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
    }

    /// The step's import units in document order.
    ///
    /// Elements without a usable `Id` are skipped, never fatal: the rest of
    /// the step still imports. When two units share an identity the later
    /// definition replaces the earlier one in place.
    pub fn units(&self) -> Vec<ImportUnit> {
        let mut units: Vec<ImportUnit> = Vec::new();
        for element in &self.content {
            let Some(unit) = parse_unit(element) else {
                continue;
            };
            match units.iter_mut().find(|u| u.identity == unit.identity) {
                Some(existing) => {
                    debug!(
                        "Unit {} redefined later in step, replacing earlier definition",
                        unit.identity
                    );
                    *existing = unit;
                }
                None => units.push(unit),
            }
        }
        units
    }
}

/// One unit of content to import: identity, type, dependencies, and part
/// definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportUnit {
    identity: ContentIdentity,
    type_name: String,
    requires: Vec<ContentIdentity>,
    parts: Vec<PartElement>,
}

impl ImportUnit {
    pub fn new(identity: ContentIdentity, type_name: impl Into<String>) -> Self {
        ImportUnit {
            identity,
            type_name: type_name.into(),
            requires: Vec::new(),
            parts: Vec::new(),
        }
    }

    pub fn identity(&self) -> &ContentIdentity {
        &self.identity
    }

    /// The content type, taken from the unit's element name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Identities this unit depends on.
    pub fn requires(&self) -> &[ContentIdentity] {
        &self.requires
    }

    pub fn parts(&self) -> &[PartElement] {
        &self.parts
    }

    pub fn add_requirement(&mut self, identity: ContentIdentity) {
        self.requires.push(identity);
    }

    pub fn add_part(&mut self, part: PartElement) {
        self.parts.push(part);
    }
}

fn parse_unit(element: &Element) -> Option<ImportUnit> {
    let identity = match element.attr(ID_ATTRIBUTE) {
        Some(raw) => match ContentIdentity::new(raw) {
            Ok(identity) => identity,
            Err(_) => {
                debug!("Skipping {} unit with empty identity", element.name);
                return None;
            }
        },
        None => {
            debug!("Skipping {} unit with no {} attribute", element.name, ID_ATTRIBUTE);
            return None;
        }
    };

    let mut unit = ImportUnit::new(identity, element.name.as_str());

    if let Some(raw) = element.attr(REQUIRES_ATTRIBUTE) {
        for token in raw.split(|c: char| c.is_whitespace() || c == ',') {
            if let Ok(requirement) = ContentIdentity::new(token) {
                unit.add_requirement(requirement);
            }
        }
    }

    for child in &element.children {
        let mut part = PartElement::new(child.name.as_str());
        for (name, value) in &child.attributes {
            part.set_attr(name, value.as_str());
        }
        unit.add_part(part);
    }

    Some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECIPE: &str = r#"
        <Recipe>
          <Data BatchSize="2">
            <Page Id="page-home">
              <TitlePart Title="Home"/>
              <BodyPart Text="Welcome"/>
            </Page>
            <Page Id="page-about" Requires="page-home, term-news">
              <TitlePart Title="About"/>
            </Page>
            <Term Id="term-news"/>
          </Data>
          <Settings Theme="plain"/>
        </Recipe>
    "#;

    #[test]
    fn parse_reads_steps_in_order() {
        let recipe = Recipe::parse(RECIPE).unwrap();
        let names: Vec<&str> = recipe.steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Data", "Settings"]);
        assert_eq!(recipe.steps()[1].attr("Theme"), Some("plain"));
    }

    #[test]
    fn units_carry_identity_type_and_parts() {
        let recipe = Recipe::parse(RECIPE).unwrap();
        let units = recipe.steps()[0].units();
        assert_eq!(units.len(), 3);

        let home = &units[0];
        assert_eq!(home.identity().as_str(), "page-home");
        assert_eq!(home.type_name(), "Page");
        assert_eq!(home.parts().len(), 2);
        assert_eq!(home.parts()[0].attr("Title"), Some("Home"));

        let term = &units[2];
        assert_eq!(term.type_name(), "Term");
        assert!(term.parts().is_empty());
    }

    #[test]
    fn requires_splits_on_commas_and_whitespace() {
        let recipe = Recipe::parse(RECIPE).unwrap();
        let units = recipe.steps()[0].units();
        let about = &units[1];
        let requires: Vec<&str> = about.requires().iter().map(|r| r.as_str()).collect();
        assert_eq!(requires, vec!["page-home", "term-news"]);
    }

    #[test]
    fn units_without_usable_identity_are_skipped() {
        let step_xml = r#"
            <Recipe>
              <Data>
                <Page Id="ok"/>
                <Page/>
                <Page Id=""/>
                <Page Id="   "/>
              </Data>
            </Recipe>
        "#;
        let recipe = Recipe::parse(step_xml).unwrap();
        let units = recipe.steps()[0].units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].identity().as_str(), "ok");
    }

    #[test]
    fn later_duplicate_replaces_earlier_in_place() {
        let step_xml = r#"
            <Recipe>
              <Data>
                <Page Id="a"><TitlePart Title="first"/></Page>
                <Page Id="b"/>
                <Page Id="a"><TitlePart Title="second"/></Page>
              </Data>
            </Recipe>
        "#;
        let recipe = Recipe::parse(step_xml).unwrap();
        let units = recipe.steps()[0].units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].identity().as_str(), "a");
        assert_eq!(units[0].parts()[0].attr("Title"), Some("second"));
    }

    #[test]
    fn batch_size_requires_a_positive_integer() {
        let parse_one = |attrs: &str| {
            let text = format!("<Recipe><Data {attrs}/></Recipe>");
            Recipe::parse(&text).unwrap().steps()[0].batch_size()
        };
        assert_eq!(parse_one(r#"BatchSize="16""#), Some(16));
        assert_eq!(parse_one(r#"BatchSize=" 8 ""#), Some(8));
        assert_eq!(parse_one(""), None);
        assert_eq!(parse_one(r#"BatchSize="0""#), None);
        assert_eq!(parse_one(r#"BatchSize="-3""#), None);
        assert_eq!(parse_one(r#"BatchSize="many""#), None);
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RECIPE.as_bytes()).unwrap();

        let recipe = Recipe::parse_file(file.path()).unwrap();
        assert_eq!(recipe.steps().len(), 2);
    }

    #[test]
    fn empty_recipe_has_no_steps() {
        let recipe = Recipe::parse("<Recipe/>").unwrap();
        assert!(recipe.steps().is_empty());
    }
}
