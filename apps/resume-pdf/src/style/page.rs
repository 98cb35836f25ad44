//! The `@page` box: paper size and page margins.

use crate::errors::RenderError;
use crate::style::cascade::Edges;
use crate::style::css::{parse_edges, parse_length, parse_page_size, Length, LETTER};
use crate::style::Declarations;

const SELECTOR: &str = "@page";
/// Initial font size `em` margins resolve against (16px).
const PAGE_EM: f32 = 12.0;
/// CSS page-box default margin (75px).
const DEFAULT_MARGIN: f32 = 56.25;

#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: Edges,
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup {
            width: LETTER.0,
            height: LETTER.1,
            margin: Edges::uniform(DEFAULT_MARGIN),
        }
    }
}

impl PageSetup {
    pub fn from_declarations(declarations: Option<&Declarations>) -> Result<Self, RenderError> {
        let mut setup = PageSetup::default();
        let Some(declarations) = declarations else {
            return Ok(setup);
        };

        if let Some(size) = declarations.get("size") {
            let (w, h) = parse_page_size(size)
                .ok_or_else(|| RenderError::invalid_style(SELECTOR, format!("bad size '{size}'")))?;
            setup.width = w;
            setup.height = h;
        }

        // Shorthand first so longhands override it.
        if let Some(value) = declarations.get("margin") {
            let [t, r, b, l] = parse_edges(value).ok_or_else(|| {
                RenderError::invalid_style(SELECTOR, format!("bad margin '{value}'"))
            })?;
            setup.margin = Edges {
                top: page_length(t, value)?,
                right: page_length(r, value)?,
                bottom: page_length(b, value)?,
                left: page_length(l, value)?,
            };
        }

        for (property, value) in declarations {
            let slot = match property.as_str() {
                "size" | "margin" => continue,
                "margin-top" => &mut setup.margin.top,
                "margin-right" => &mut setup.margin.right,
                "margin-bottom" => &mut setup.margin.bottom,
                "margin-left" => &mut setup.margin.left,
                other => {
                    return Err(RenderError::invalid_style(
                        SELECTOR,
                        format!("unsupported property '{other}'"),
                    ))
                }
            };
            let length = parse_length(value).ok_or_else(|| {
                RenderError::invalid_style(SELECTOR, format!("bad {property} '{value}'"))
            })?;
            *slot = page_length(length, value)?;
        }

        if setup.content_width() <= 0.0 || setup.content_height() <= 0.0 {
            return Err(RenderError::invalid_style(
                SELECTOR,
                "margins leave no room for content",
            ));
        }
        Ok(setup)
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn content_height(&self) -> f32 {
        self.height - self.margin.top - self.margin.bottom
    }

    /// Distance from the top edge to the bottom of the content area.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin.bottom
    }
}

fn page_length(length: Length, value: &str) -> Result<f32, RenderError> {
    match length {
        Length::Percent(_) => Err(RenderError::invalid_style(
            SELECTOR,
            format!("percentage margins are not supported ('{value}')"),
        )),
        other => Ok(other.to_pt(PAGE_EM)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleSheet;

    #[test]
    fn test_resume_page_margins() {
        let sheet = StyleSheet::resume();
        let page = PageSetup::from_declarations(sheet.rule("@page")).unwrap();
        assert_eq!((page.width, page.height), LETTER);
        assert!((page.margin.top - 36.0).abs() < 1e-3);
        assert!((page.margin.bottom - 36.0).abs() < 1e-3);
        assert!((page.margin.left - 43.2).abs() < 1e-3);
        assert!((page.margin.right - 43.2).abs() < 1e-3);
        assert!((page.content_width() - (612.0 - 86.4)).abs() < 1e-3);
    }

    #[test]
    fn test_defaults_without_page_rule() {
        let page = PageSetup::from_declarations(None).unwrap();
        assert_eq!(page, PageSetup::default());
    }

    #[test]
    fn test_longhand_overrides_shorthand() {
        let sheet = StyleSheet::new()
            .with_rule("@page", &[("margin", "1in"), ("margin-left", "2in"), ("size", "a4")]);
        let page = PageSetup::from_declarations(sheet.rule("@page")).unwrap();
        assert!((page.margin.top - 72.0).abs() < 1e-3);
        assert!((page.margin.left - 144.0).abs() < 1e-3);
        assert!((page.width - 595.28).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_unknown_property_and_bad_values() {
        let unknown = StyleSheet::new().with_rule("@page", &[("bleed", "3mm")]);
        assert!(PageSetup::from_declarations(unknown.rule("@page")).is_err());

        let bad = StyleSheet::new().with_rule("@page", &[("margin", "wide")]);
        assert!(PageSetup::from_declarations(bad.rule("@page")).is_err());

        let percent = StyleSheet::new().with_rule("@page", &[("margin", "10%")]);
        assert!(PageSetup::from_declarations(percent.rule("@page")).is_err());
    }

    #[test]
    fn test_rejects_margins_larger_than_page() {
        let sheet = StyleSheet::new().with_rule("@page", &[("margin", "5in")]);
        let err = PageSetup::from_declarations(sheet.rule("@page")).unwrap_err();
        assert!(err.to_string().contains("no room"), "got {err}");
    }
}
