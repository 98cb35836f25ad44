//! Data-driven style sheet.
//!
//! Rules are `selector → property → value` maps rather than a CSS string, so
//! callers (and tests) substitute styles by key instead of editing text. The
//! same sheet is emitted as the `<style>` block of the HTML intermediate and
//! resolved by `cascade::StyleResolver` for the built-in layout engine.

pub mod cascade;
pub mod css;
pub mod page;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RenderError;

pub use cascade::StyleResolver;
pub use page::PageSetup;

/// Property → value declarations of one rule.
pub type Declarations = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSheet {
    rules: BTreeMap<String, Declarations>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resume sheet: US-letter friendly margins, 10.5px sans body text,
    /// dark teal headings with a rule under section titles, blue links.
    pub fn resume() -> Self {
        StyleSheet::new()
            .with_rule("@page", &[("margin", "0.5in 0.6in 0.5in 0.6in")])
            .with_rule(
                "body",
                &[
                    ("font-family", "Calibri, Arial, sans-serif"),
                    ("line-height", "1.5"),
                    ("color", "#2c3e50"),
                    ("font-size", "10.5px"),
                ],
            )
            .with_rule("h1", &[("color", "#1a4d5c"), ("font-size", "18px")])
            .with_rule(
                "h2",
                &[
                    ("color", "#1a4d5c"),
                    ("font-size", "11px"),
                    ("border-bottom", "1px solid #1a4d5c"),
                ],
            )
            .with_rule("a", &[("color", "#0056b3")])
    }

    pub fn with_rule(mut self, selector: &str, declarations: &[(&str, &str)]) -> Self {
        for (property, value) in declarations {
            self.set(selector, property, value);
        }
        self
    }

    /// Sets one declaration, replacing any previous value for the property.
    pub fn set(&mut self, selector: &str, property: &str, value: &str) {
        self.rules
            .entry(selector.trim().to_ascii_lowercase())
            .or_default()
            .insert(
                property.trim().to_ascii_lowercase(),
                value.trim().to_string(),
            );
    }

    #[cfg(test)]
    pub fn get(&self, selector: &str, property: &str) -> Option<&str> {
        self.rules
            .get(selector)
            .and_then(|d| d.get(property))
            .map(String::as_str)
    }

    pub fn rule(&self, selector: &str) -> Option<&Declarations> {
        self.rules.get(selector)
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Emits the sheet as CSS text, one rule per line, in selector order.
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        for (selector, declarations) in &self.rules {
            if declarations.is_empty() {
                continue;
            }
            css.push_str(selector);
            css.push_str(" {");
            for (property, value) in declarations {
                css.push(' ');
                css.push_str(property);
                css.push_str(": ");
                css.push_str(value);
                css.push(';');
            }
            css.push_str(" }\n");
        }
        css
    }

    /// Parses a sheet from JSON of the form `{"h1": {"color": "#000"}}`.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let parsed: StyleSheet = serde_json::from_str(json)
            .map_err(|e| RenderError::invalid_style("<json>", e.to_string()))?;
        // Re-insert through `set` so keys are normalised.
        let mut sheet = StyleSheet::new();
        for (selector, declarations) in &parsed.rules {
            for (property, value) in declarations {
                sheet.set(selector, property, value);
            }
        }
        Ok(sheet)
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let json = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        Self::from_json(&json)
    }
}
