//! Style resolution: user-agent defaults cascaded under the author sheet,
//! inherited properties flowing from parent to child.
//!
//! Only type selectors are supported. Every author selector, property and
//! value is validated up front by `StyleResolver::new`, so a sheet the engine
//! cannot honour fails before any layout work starts.

use std::sync::OnceLock;

use crate::errors::RenderError;
use crate::layout::font_metrics::{FontFace, FontFamily};
use crate::style::css::{
    font_size_keyword, parse_border, parse_color, parse_edges, parse_font_family, parse_length,
    parse_number, Length, Rgb,
};
use crate::style::page::PageSetup;
use crate::style::{Declarations, StyleSheet};

// ────────────────────────────────────────────────────────────────────────────
// Elements
// ────────────────────────────────────────────────────────────────────────────

/// The HTML elements Markdown produces, each addressable by a type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Body,
    Heading(u8),
    Paragraph,
    UnorderedList,
    OrderedList,
    ListItem,
    Pre,
    BlockQuote,
    Rule,
    Link,
    Strong,
    Emphasis,
    Code,
}

impl Element {
    pub const ALL: [Element; 18] = [
        Element::Body,
        Element::Heading(1),
        Element::Heading(2),
        Element::Heading(3),
        Element::Heading(4),
        Element::Heading(5),
        Element::Heading(6),
        Element::Paragraph,
        Element::UnorderedList,
        Element::OrderedList,
        Element::ListItem,
        Element::Pre,
        Element::BlockQuote,
        Element::Rule,
        Element::Link,
        Element::Strong,
        Element::Emphasis,
        Element::Code,
    ];

    pub fn selector(self) -> &'static str {
        match self {
            Element::Body => "body",
            Element::Heading(1) => "h1",
            Element::Heading(2) => "h2",
            Element::Heading(3) => "h3",
            Element::Heading(4) => "h4",
            Element::Heading(5) => "h5",
            Element::Heading(_) => "h6",
            Element::Paragraph => "p",
            Element::UnorderedList => "ul",
            Element::OrderedList => "ol",
            Element::ListItem => "li",
            Element::Pre => "pre",
            Element::BlockQuote => "blockquote",
            Element::Rule => "hr",
            Element::Link => "a",
            Element::Strong => "strong",
            Element::Emphasis => "em",
            Element::Code => "code",
        }
    }

    pub fn from_selector(selector: &str) -> Option<Self> {
        Element::ALL
            .iter()
            .copied()
            .find(|e| e.selector().eq_ignore_ascii_case(selector.trim()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Computed style
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const fn uniform(v: f32) -> Self {
        Edges {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    Normal,
    /// Unitless multiplier, inherited as a number and re-applied to each font size.
    Factor(f32),
    Fixed(f32),
}

impl LineHeight {
    pub fn resolve(self, font_size: f32) -> f32 {
        match self {
            LineHeight::Normal => 1.2 * font_size,
            LineHeight::Factor(f) => f * font_size,
            LineHeight::Fixed(pt) => pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Disc,
    Circle,
    Square,
    Decimal,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderLine {
    pub width: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub face: FontFace,
    pub font_size: f32,
    pub color: Rgb,
    pub line_height: LineHeight,
    pub text_align: TextAlign,
    pub list_marker: ListMarker,
    pub margin: Edges,
    pub padding: Edges,
    pub border_top: Option<BorderLine>,
    pub border_bottom: Option<BorderLine>,
    pub underline: bool,
}

impl ComputedStyle {
    /// Initial values before any sheet applies: 12pt Times, black.
    pub fn initial() -> Self {
        ComputedStyle {
            face: FontFace::regular(FontFamily::Times),
            font_size: 12.0,
            color: Rgb::BLACK,
            line_height: LineHeight::Normal,
            text_align: TextAlign::Left,
            list_marker: ListMarker::Disc,
            margin: Edges::default(),
            padding: Edges::default(),
            border_top: None,
            border_bottom: None,
            underline: false,
        }
    }

    /// Starting point for a child: inherited properties kept, the rest reset.
    pub(crate) fn inherit(parent: &ComputedStyle) -> Self {
        ComputedStyle {
            margin: Edges::default(),
            padding: Edges::default(),
            border_top: None,
            border_bottom: None,
            underline: false,
            ..parent.clone()
        }
    }

    pub fn line_height_pt(&self) -> f32 {
        self.line_height.resolve(self.font_size)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// User-agent sheet
// ────────────────────────────────────────────────────────────────────────────

fn user_agent_sheet() -> &'static StyleSheet {
    static UA: OnceLock<StyleSheet> = OnceLock::new();
    UA.get_or_init(|| {
        let mut sheet = StyleSheet::new()
            .with_rule(
                "body",
                &[
                    ("margin", "8px"),
                    ("font-family", "serif"),
                    ("font-size", "medium"),
                    ("line-height", "normal"),
                    ("color", "black"),
                ],
            )
            .with_rule("p", &[("margin", "1em 0")])
            .with_rule(
                "ul",
                &[
                    ("margin", "1em 0"),
                    ("padding-left", "40px"),
                    ("list-style-type", "disc"),
                ],
            )
            .with_rule(
                "ol",
                &[
                    ("margin", "1em 0"),
                    ("padding-left", "40px"),
                    ("list-style-type", "decimal"),
                ],
            )
            .with_rule("pre", &[("font-family", "monospace"), ("margin", "1em 0")])
            .with_rule("code", &[("font-family", "monospace")])
            .with_rule("blockquote", &[("margin", "1em 40px")])
            .with_rule(
                "hr",
                &[("margin", "0.5em 0"), ("border-top", "1px solid #808080")],
            )
            .with_rule(
                "a",
                &[("color", "#0000ee"), ("text-decoration", "underline")],
            )
            .with_rule("strong", &[("font-weight", "bold")])
            .with_rule("em", &[("font-style", "italic")]);

        let headings = [
            ("h1", "2em", "0.67em 0"),
            ("h2", "1.5em", "0.83em 0"),
            ("h3", "1.17em", "1em 0"),
            ("h4", "1em", "1.33em 0"),
            ("h5", "0.83em", "1.67em 0"),
            ("h6", "0.67em", "2.33em 0"),
        ];
        for (selector, size, margin) in headings {
            sheet = sheet.with_rule(
                selector,
                &[("font-size", size), ("font-weight", "bold"), ("margin", margin)],
            );
        }
        sheet
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver
// ────────────────────────────────────────────────────────────────────────────

/// Resolves computed styles for elements against a validated author sheet.
#[derive(Debug, Clone)]
pub struct StyleResolver {
    author: StyleSheet,
    page: PageSetup,
    body: ComputedStyle,
}

impl StyleResolver {
    pub fn new(author: &StyleSheet) -> Result<Self, RenderError> {
        for selector in author.selectors() {
            if selector != "@page" && Element::from_selector(selector).is_none() {
                return Err(RenderError::invalid_style(selector, "unsupported selector"));
            }
        }

        let page = PageSetup::from_declarations(author.rule("@page"))?;
        let mut resolver = StyleResolver {
            author: author.clone(),
            page,
            body: ComputedStyle::initial(),
        };
        resolver.body = resolver.resolve(Element::Body, &ComputedStyle::initial())?;

        // Validate every rule once so layout never meets a bad declaration.
        let body = resolver.body.clone();
        for element in Element::ALL {
            resolver.resolve(element, &body)?;
        }
        Ok(resolver)
    }

    pub fn page(&self) -> &PageSetup {
        &self.page
    }

    pub fn body(&self) -> &ComputedStyle {
        &self.body
    }

    /// Computes the style of `element` as a child of `parent`.
    pub fn resolve(
        &self,
        element: Element,
        parent: &ComputedStyle,
    ) -> Result<ComputedStyle, RenderError> {
        let selector = element.selector();
        let layers: [Option<&Declarations>; 2] = [
            user_agent_sheet().rule(selector),
            self.author.rule(selector),
        ];

        let mut style = ComputedStyle::inherit(parent);

        // font-size first: em lengths on every other property depend on it.
        let font_size = layers
            .iter()
            .rev()
            .flatten()
            .find_map(|d| d.get("font-size"));
        if let Some(value) = font_size {
            style.font_size = resolve_font_size(selector, value, parent.font_size)?;
        }

        for declarations in layers.into_iter().flatten() {
            let mut ordered: Vec<(&String, &String)> = declarations.iter().collect();
            ordered.sort_by_key(|(property, _)| property_rank(property.as_str()));
            for (property, value) in ordered {
                apply(&mut style, selector, property, value)?;
            }
        }
        Ok(style)
    }
}

/// Application order within one layer: font-size (already applied), then
/// color and font properties, then shorthands, then longhands.
fn property_rank(property: &str) -> u8 {
    match property {
        "font-size" => 0,
        "color" | "font-family" | "font-weight" | "font-style" | "line-height" => 1,
        "margin" | "padding" | "list-style" => 2,
        _ => 3,
    }
}

fn resolve_font_size(selector: &str, value: &str, parent_size: f32) -> Result<f32, RenderError> {
    let v = value.trim().to_ascii_lowercase();
    let size = match v.as_str() {
        "inherit" => parent_size,
        "larger" => parent_size * 1.2,
        "smaller" => parent_size / 1.2,
        other => match font_size_keyword(other) {
            Some(pt) => pt,
            None => parse_length(other)
                .map(|l| l.to_pt(parent_size))
                .ok_or_else(|| bad_value(selector, "font-size", value))?,
        },
    };
    if size <= 0.0 {
        return Err(bad_value(selector, "font-size", value));
    }
    Ok(size)
}

fn apply(
    style: &mut ComputedStyle,
    selector: &str,
    property: &str,
    value: &str,
) -> Result<(), RenderError> {
    let v = value.trim().to_ascii_lowercase();
    let bad = || bad_value(selector, property, value);

    match property {
        "font-size" => {}
        "color" => style.color = parse_color(&v).ok_or_else(bad)?,
        "font-family" => style.face.family = resolve_family(value)?,
        "font-weight" => {
            style.face.bold = match v.as_str() {
                "normal" | "lighter" => false,
                "bold" | "bolder" => true,
                numeric => numeric.parse::<u16>().map_err(|_| bad())? >= 600,
            }
        }
        "font-style" => {
            style.face.italic = match v.as_str() {
                "normal" => false,
                "italic" | "oblique" => true,
                _ => return Err(bad()),
            }
        }
        "line-height" => {
            let line_height = if v == "normal" {
                LineHeight::Normal
            } else if let Some(n) = parse_number(&v) {
                LineHeight::Factor(n)
            } else {
                match parse_length(&v).ok_or_else(bad)? {
                    Length::Percent(p) => LineHeight::Fixed(p / 100.0 * style.font_size),
                    other => LineHeight::Fixed(other.to_pt(style.font_size)),
                }
            };
            if let LineHeight::Factor(n) | LineHeight::Fixed(n) = line_height {
                if n < 0.0 {
                    return Err(bad());
                }
            }
            style.line_height = line_height;
        }
        "text-align" => {
            style.text_align = match v.as_str() {
                "left" | "start" | "justify" => TextAlign::Left,
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => return Err(bad()),
            }
        }
        "text-decoration" | "text-decoration-line" => {
            style.underline = match v.as_str() {
                "none" => false,
                "underline" => true,
                _ => return Err(bad()),
            }
        }
        "list-style-type" => style.list_marker = parse_marker(&v).ok_or_else(bad)?,
        "list-style" => {
            style.list_marker = v
                .split_whitespace()
                .find_map(parse_marker)
                .ok_or_else(bad)?
        }
        "margin" | "padding" => {
            let [t, r, b, l] = parse_edges(&v).ok_or_else(bad)?;
            let edges = Edges {
                top: box_length(t, style.font_size).ok_or_else(bad)?,
                right: box_length(r, style.font_size).ok_or_else(bad)?,
                bottom: box_length(b, style.font_size).ok_or_else(bad)?,
                left: box_length(l, style.font_size).ok_or_else(bad)?,
            };
            if property == "margin" {
                style.margin = edges;
            } else {
                // Margins may be negative; padding may not.
                if [edges.top, edges.right, edges.bottom, edges.left]
                    .iter()
                    .any(|e| *e < 0.0)
                {
                    return Err(bad());
                }
                style.padding = edges;
            }
        }
        "margin-top" | "margin-right" | "margin-bottom" | "margin-left" | "padding-top"
        | "padding-right" | "padding-bottom" | "padding-left" => {
            let length = parse_length(&v)
                .and_then(|l| box_length(l, style.font_size))
                .ok_or_else(bad)?;
            let (edges, side) = match property.split_once('-') {
                Some(("margin", side)) => (&mut style.margin, side),
                Some((_, _)) if length < 0.0 => return Err(bad()),
                Some((_, side)) => (&mut style.padding, side),
                None => return Err(bad()),
            };
            match side {
                "top" => edges.top = length,
                "right" => edges.right = length,
                "bottom" => edges.bottom = length,
                _ => edges.left = length,
            }
        }
        "border-top" | "border-bottom" => {
            let spec = parse_border(&v).ok_or_else(bad)?;
            let line = (spec.visible && spec.width > 0.0).then(|| BorderLine {
                width: spec.width,
                color: spec.color.unwrap_or(style.color),
            });
            if property == "border-top" {
                style.border_top = line;
            } else {
                style.border_bottom = line;
            }
        }
        other => {
            return Err(RenderError::invalid_style(
                selector,
                format!("unsupported property '{other}'"),
            ))
        }
    }
    Ok(())
}

fn resolve_family(value: &str) -> Result<FontFamily, RenderError> {
    parse_font_family(value)
        .iter()
        .find_map(|name| FontFamily::from_css_name(name))
        .ok_or_else(|| RenderError::UnresolvedFont(value.trim().to_string()))
}

fn parse_marker(value: &str) -> Option<ListMarker> {
    match value {
        "disc" => Some(ListMarker::Disc),
        "circle" => Some(ListMarker::Circle),
        "square" => Some(ListMarker::Square),
        "decimal" => Some(ListMarker::Decimal),
        "none" => Some(ListMarker::None),
        _ => None,
    }
}

/// Box lengths resolve em against the element's own font size; percentages
/// depend on the containing block and are not supported.
fn box_length(length: Length, font_size: f32) -> Option<f32> {
    match length {
        Length::Percent(_) => None,
        other => Some(other.to_pt(font_size)),
    }
}

fn bad_value(selector: &str, property: &str, value: &str) -> RenderError {
    RenderError::invalid_style(selector, format!("bad {property} '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume() -> StyleResolver {
        StyleResolver::new(&StyleSheet::resume()).unwrap()
    }

    #[test]
    fn test_body_resolves_arial_fallback() {
        let r = resume();
        let body = r.body();
        assert_eq!(body.face.family, FontFamily::Helvetica);
        assert!((body.font_size - 7.875).abs() < 1e-4);
        assert_eq!(body.color, Rgb(0x2c, 0x3e, 0x50));
        assert!((body.line_height_pt() - 7.875 * 1.5).abs() < 1e-4);
        assert!((body.margin.top - 6.0).abs() < 1e-4, "UA body margin is 8px");
    }

    #[test]
    fn test_heading_styles_cascade_over_user_agent() {
        let r = resume();
        let h1 = r.resolve(Element::Heading(1), r.body()).unwrap();
        assert!((h1.font_size - 13.5).abs() < 1e-4);
        assert_eq!(h1.color, Rgb(0x1a, 0x4d, 0x5c));
        assert!(h1.face.bold, "UA makes headings bold");
        assert_eq!(h1.face.family, FontFamily::Helvetica, "family inherits from body");
        // 0.67em of the heading's own size.
        assert!((h1.margin.top - 0.67 * 13.5).abs() < 1e-3);

        let h2 = r.resolve(Element::Heading(2), r.body()).unwrap();
        assert!((h2.font_size - 8.25).abs() < 1e-4);
        let border = h2.border_bottom.unwrap();
        assert!((border.width - 0.75).abs() < 1e-4);
        assert_eq!(border.color, Rgb(0x1a, 0x4d, 0x5c));
    }

    #[test]
    fn test_line_height_factor_reapplies_to_child_size() {
        let r = resume();
        let h1 = r.resolve(Element::Heading(1), r.body()).unwrap();
        assert!((h1.line_height_pt() - 13.5 * 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_link_color_and_underline() {
        let r = resume();
        let a = r.resolve(Element::Link, r.body()).unwrap();
        assert_eq!(a.color, Rgb(0x00, 0x56, 0xb3));
        assert!(a.underline);
        assert_eq!(a.margin, Edges::default());
    }

    #[test]
    fn test_inline_marks_stack() {
        let r = resume();
        let strong = r.resolve(Element::Strong, r.body()).unwrap();
        let em = r.resolve(Element::Emphasis, &strong).unwrap();
        assert!(em.face.bold && em.face.italic);
        let code = r.resolve(Element::Code, r.body()).unwrap();
        assert_eq!(code.face.family, FontFamily::Courier);
    }

    #[test]
    fn test_author_shorthand_overrides_user_agent() {
        let sheet = StyleSheet::resume().with_rule("p", &[("margin", "2pt 0 4pt 0")]);
        let r = StyleResolver::new(&sheet).unwrap();
        let p = r.resolve(Element::Paragraph, r.body()).unwrap();
        assert!((p.margin.top - 2.0).abs() < 1e-4);
        assert!((p.margin.bottom - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_longhand_beats_shorthand_in_same_layer() {
        let sheet = StyleSheet::new().with_rule("ul", &[("padding-left", "10pt"), ("padding", "0")]);
        let r = StyleResolver::new(&sheet).unwrap();
        let ul = r.resolve(Element::UnorderedList, r.body()).unwrap();
        assert!((ul.padding.left - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_unresolvable_font_list_fails() {
        let sheet = StyleSheet::new().with_rule("body", &[("font-family", "Calibri, Cambria")]);
        let err = StyleResolver::new(&sheet).unwrap_err();
        assert!(matches!(err, RenderError::UnresolvedFont(_)), "got {err:?}");
    }

    #[test]
    fn test_unsupported_selector_property_and_value_fail() {
        let selector = StyleSheet::new().with_rule("div.card", &[("color", "red")]);
        assert!(StyleResolver::new(&selector).is_err());

        let property = StyleSheet::new().with_rule("h1", &[("display", "flex")]);
        assert!(StyleResolver::new(&property).is_err());

        let value = StyleSheet::new().with_rule("h1", &[("color", "tealish")]);
        let err = StyleResolver::new(&value).unwrap_err();
        assert!(err.to_string().contains("tealish"), "got {err}");
    }

    #[test]
    fn test_negative_line_height_fails() {
        for value in ["-2", "-12px", "-50%"] {
            let sheet = StyleSheet::new().with_rule("body", &[("line-height", value)]);
            let err = StyleResolver::new(&sheet).unwrap_err();
            assert!(matches!(err, RenderError::InvalidStyle { .. }), "{value}: got {err:?}");
        }
        let zero = StyleSheet::new().with_rule("body", &[("line-height", "0")]);
        assert!(StyleResolver::new(&zero).is_ok(), "zero line-height is valid CSS");
    }

    #[test]
    fn test_negative_padding_fails_but_negative_margin_is_allowed() {
        for (property, value) in [("padding", "4px -1px"), ("padding-left", "-3pt")] {
            let sheet = StyleSheet::new().with_rule("p", &[(property, value)]);
            let err = StyleResolver::new(&sheet).unwrap_err();
            assert!(matches!(err, RenderError::InvalidStyle { .. }), "{property}: got {err:?}");
        }
        let margin = StyleSheet::new().with_rule("p", &[("margin-top", "-4px")]);
        assert!(StyleResolver::new(&margin).is_ok());
    }

    #[test]
    fn test_empty_sheet_uses_user_agent_defaults() {
        let r = StyleResolver::new(&StyleSheet::new()).unwrap();
        assert_eq!(r.body().face.family, FontFamily::Times);
        assert!((r.body().font_size - 12.0).abs() < 1e-4);
        let ol = r.resolve(Element::OrderedList, r.body()).unwrap();
        assert_eq!(ol.list_marker, ListMarker::Decimal);
        assert!((ol.padding.left - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_user_agent_sheet_covers_headings() {
        let ua = user_agent_sheet();
        assert_eq!(ua.get("h1", "font-size"), Some("2em"));
        assert_eq!(ua.get("h6", "font-weight"), Some("bold"));
        assert_eq!(ua.get("a", "text-decoration"), Some("underline"));
    }
}
