//! Block flow: turns the Markdown block tree into positioned text and rules
//! on fixed-size pages.
//!
//! Follows the CSS block model closely enough that the result matches what a
//! browser prints for the same HTML and sheet: adjacent vertical margins
//! collapse, margins are dropped after a page break, borders and padding
//! separate margins, and lines never split across pages. Headings are kept
//! with the first line that follows them.
//!
//! All coordinates are in points measured from the top-left corner of the
//! page; the PDF writer flips them.

use std::collections::BTreeSet;

use crate::errors::RenderError;
use crate::layout::font_metrics::FontFace;
use crate::layout::linebreak::{break_lines, break_preformatted, Line, Run, RunStyle};
use crate::markdown::{Block, Document, Inline};
use crate::style::cascade::{ComputedStyle, Element, ListMarker, TextAlign};
use crate::style::css::Rgb;
use crate::style::{PageSetup, StyleResolver};

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub x: f32,
    pub baseline: f32,
    pub face: FontFace,
    pub size: f32,
    pub color: Rgb,
    pub text: String,
}

/// A horizontal stroke: borders, underlines, square list markers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleItem {
    pub x1: f32,
    pub x2: f32,
    /// Centre of the stroke.
    pub y: f32,
    pub thickness: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Text(TextItem),
    Rule(RuleItem),
}

/// Clickable area of a hyperlink.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkArea {
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub items: Vec<DrawItem>,
    pub links: Vec<LinkArea>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub page: PageSetup,
    pub pages: Vec<PageContent>,
}

impl Layout {
    /// Every text item with the index of the page it sits on.
    pub fn text_items(&self) -> impl Iterator<Item = (usize, &TextItem)> {
        self.pages.iter().enumerate().flat_map(|(index, page)| {
            page.items.iter().filter_map(move |item| match item {
                DrawItem::Text(text) => Some((index, text)),
                DrawItem::Rule(_) => None,
            })
        })
    }

    /// Distinct faces drawn anywhere in the document.
    pub fn faces(&self) -> BTreeSet<FontFace> {
        self.text_items().map(|(_, t)| t.face).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Flow state
// ────────────────────────────────────────────────────────────────────────────

/// Horizontal extent available to a box's content.
#[derive(Debug, Clone, Copy)]
struct Area {
    left: f32,
    width: f32,
}

impl Area {
    fn inset(self, style: &ComputedStyle) -> Area {
        let left = style.margin.left + style.padding.left;
        let right = style.margin.right + style.padding.right;
        Area {
            left: self.left + left,
            width: self.width - left - right,
        }
    }

    /// Border box of `style` inside this area: (x1, x2).
    fn border_span(self, style: &ComputedStyle) -> (f32, f32) {
        (
            self.left + style.margin.left,
            self.left + self.width - style.margin.right,
        )
    }
}

enum MarkerGlyph {
    Text(String),
    Square,
}

/// A list marker waiting for the first line of its item.
struct PendingMarker {
    glyph: MarkerGlyph,
    x: f32,
    face: FontFace,
    size: f32,
    color: Rgb,
}

struct Flow<'a> {
    styles: &'a StyleResolver,
    page: PageSetup,
    pages: Vec<PageContent>,
    /// Top of the next line box.
    y: f32,
    /// Collapsed margin not yet applied.
    pending_margin: f32,
    /// Set after a page break until something is placed; margins are dropped.
    fresh_page: bool,
    page_has_content: bool,
    markers: Vec<PendingMarker>,
}

/// Lays the document out onto pages. Always returns at least one page.
pub fn layout_document(document: &Document, styles: &StyleResolver) -> Result<Layout, RenderError> {
    let page = styles.page().clone();
    let body = styles.body().clone();

    let mut flow = Flow {
        styles,
        page: page.clone(),
        pages: vec![PageContent::default()],
        y: page.margin.top,
        pending_margin: 0.0,
        fresh_page: false,
        page_has_content: false,
        markers: Vec::new(),
    };

    let root = Area {
        left: page.margin.left,
        width: page.content_width(),
    };
    if root.inset(&body).width <= 0.0 {
        return Err(RenderError::invalid_style(
            "body",
            "margins and padding leave no room for content",
        ));
    }

    let inner = flow.open_box(&body, root);
    flow.blocks(document.blocks(), &body, inner, false)?;
    flow.close_box(&body, root);

    Ok(Layout {
        page,
        pages: flow.pages,
    })
}

impl<'a> Flow<'a> {
    fn blocks(
        &mut self,
        blocks: &[Block],
        parent: &ComputedStyle,
        area: Area,
        in_list: bool,
    ) -> Result<(), RenderError> {
        for block in blocks {
            self.block(block, parent, area, in_list)?;
        }
        Ok(())
    }

    fn block(
        &mut self,
        block: &Block,
        parent: &ComputedStyle,
        area: Area,
        in_list: bool,
    ) -> Result<(), RenderError> {
        match block {
            Block::Heading { level, content } => {
                let style = self.styles.resolve(Element::Heading(*level), parent)?;
                // Following block: one line plus a typical 1em top margin.
                let next = parent.line_height_pt() + parent.font_size;
                self.text_block(content, &style, area, Some(next))
            }
            Block::Paragraph(content) => {
                let style = self.styles.resolve(Element::Paragraph, parent)?;
                self.text_block(content, &style, area, None)
            }
            Block::Plain(content) => {
                let style = ComputedStyle::inherit(parent);
                self.text_block(content, &style, area, None)
            }
            Block::List { start, items } => self.list(*start, items, parent, area, in_list),
            Block::CodeBlock(code) => {
                let style = self.styles.resolve(Element::Pre, parent)?;
                self.preformatted(code, &style, area)
            }
            Block::BlockQuote(children) => {
                let style = self.styles.resolve(Element::BlockQuote, parent)?;
                let inner = self.open_box(&style, area);
                self.blocks(children, &style, inner, in_list)?;
                self.close_box(&style, area);
                Ok(())
            }
            Block::Rule => {
                let style = self.styles.resolve(Element::Rule, parent)?;
                self.open_box(&style, area);
                self.close_box(&style, area);
                Ok(())
            }
        }
    }

    // ── Boxes ───────────────────────────────────────────────────────────────

    /// Applies the top margin, border and padding of a block; returns the
    /// content area.
    fn open_box(&mut self, style: &ComputedStyle, area: Area) -> Area {
        self.pending_margin = self.pending_margin.max(style.margin.top);
        if let Some(border) = style.border_top {
            let top = self.reserve(border.width);
            let (x1, x2) = area.border_span(style);
            self.rule(x1, x2, top + border.width / 2.0, border.width, border.color);
        }
        if style.padding.top > 0.0 {
            self.reserve(style.padding.top);
        }
        area.inset(style)
    }

    fn close_box(&mut self, style: &ComputedStyle, area: Area) {
        if style.padding.bottom > 0.0 {
            self.reserve(style.padding.bottom);
        }
        if let Some(border) = style.border_bottom {
            let top = self.reserve(border.width);
            let (x1, x2) = area.border_span(style);
            self.rule(x1, x2, top + border.width / 2.0, border.width, border.color);
        }
        self.pending_margin = self.pending_margin.max(style.margin.bottom);
    }

    fn margin_before_next(&self) -> f32 {
        if self.fresh_page {
            0.0
        } else {
            self.pending_margin
        }
    }

    /// Claims `height` points of vertical space after the pending margin,
    /// breaking the page first if it would not fit. Returns the top of the
    /// claimed space.
    fn reserve(&mut self, height: f32) -> f32 {
        let needed = self.margin_before_next() + height;
        if self.page_has_content && self.y + needed > self.page.content_bottom() {
            self.new_page();
        }
        self.y += self.margin_before_next();
        self.pending_margin = 0.0;

        let top = self.y;
        self.y += height;
        self.fresh_page = false;
        self.page_has_content = true;
        top
    }

    fn new_page(&mut self) {
        self.pages.push(PageContent::default());
        self.y = self.page.margin.top;
        self.pending_margin = 0.0;
        self.fresh_page = true;
        self.page_has_content = false;
    }

    fn current_page(&mut self) -> &mut PageContent {
        // `pages` starts non-empty and only grows.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32, thickness: f32, color: Rgb) {
        self.current_page().items.push(DrawItem::Rule(RuleItem {
            x1,
            x2,
            y,
            thickness,
            color,
        }));
    }

    // ── Text ────────────────────────────────────────────────────────────────

    /// Lays out a block of inline content. `keep_with` is the space the
    /// following content needs when the block must not end a page (headings).
    fn text_block(
        &mut self,
        content: &[Inline],
        style: &ComputedStyle,
        area: Area,
        keep_with: Option<f32>,
    ) -> Result<(), RenderError> {
        let inner = area.inset(style);
        let runs = self.runs(content, style)?;
        let lines = break_lines(&runs, inner.width);
        let strut = style.line_height_pt();

        if let Some(next_line) = keep_with {
            let lines_height: f32 = lines.iter().map(|l| l.height(strut)).sum();
            let borders = style.border_top.map_or(0.0, |b| b.width)
                + style.border_bottom.map_or(0.0, |b| b.width);
            let needed = self.margin_before_next().max(style.margin.top)
                + style.padding.top
                + lines_height
                + style.padding.bottom
                + borders
                + style.margin.bottom
                + next_line;
            if self.page_has_content && self.y + needed > self.page.content_bottom() {
                self.new_page();
            }
        }

        self.open_box(style, area);
        for line in &lines {
            self.emit_line(line, style, inner);
        }
        if lines.is_empty() && !self.markers.is_empty() {
            self.emit_line(&Line::default(), style, inner);
        }
        self.close_box(style, area);
        Ok(())
    }

    fn preformatted(
        &mut self,
        code: &str,
        style: &ComputedStyle,
        area: Area,
    ) -> Result<(), RenderError> {
        let inner = area.inset(style);
        let lines = break_preformatted(code, &run_style(style, None), inner.width);
        self.open_box(style, area);
        for line in &lines {
            self.emit_line(line, style, inner);
        }
        self.close_box(style, area);
        Ok(())
    }

    /// Resolves inline marks into styled runs. Marks nest as
    /// `<a><strong><em><code>` would in the HTML.
    fn runs(&self, content: &[Inline], block: &ComputedStyle) -> Result<Vec<Run>, RenderError> {
        let mut runs = Vec::with_capacity(content.len());
        for inline in content {
            match inline {
                Inline::Text { text, marks, link } => {
                    let mut style = ComputedStyle::inherit(block);
                    if link.is_some() {
                        style = self.styles.resolve(Element::Link, &style)?;
                    }
                    if marks.strong {
                        style = self.keep_underline(Element::Strong, &style)?;
                    }
                    if marks.emphasis {
                        style = self.keep_underline(Element::Emphasis, &style)?;
                    }
                    if marks.code {
                        style = self.keep_underline(Element::Code, &style)?;
                    }
                    runs.push(Run::Text {
                        text: text.clone(),
                        style: run_style(&style, link.clone()),
                    });
                }
                Inline::LineBreak => runs.push(Run::Break),
            }
        }
        Ok(runs)
    }

    /// Text decoration propagates into nested inline boxes.
    fn keep_underline(
        &self,
        element: Element,
        parent: &ComputedStyle,
    ) -> Result<ComputedStyle, RenderError> {
        let mut style = self.styles.resolve(element, parent)?;
        style.underline |= parent.underline;
        Ok(style)
    }

    fn emit_line(&mut self, line: &Line, style: &ComputedStyle, inner: Area) {
        let strut = style.line_height_pt();
        let height = line.height(strut);
        let top = self.reserve(height);

        let strut_style = run_style(style, None);
        let baseline = top
            + line
                .fragments
                .iter()
                .map(|f| f.style.baseline_offset(height))
                .fold(strut_style.baseline_offset(height), f32::max);

        let slack = (inner.width - line.width).max(0.0);
        let x0 = inner.left
            + match style.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => slack / 2.0,
                TextAlign::Right => slack,
            };

        for marker in std::mem::take(&mut self.markers) {
            self.emit_marker(marker, baseline);
        }

        for fragment in &line.fragments {
            let x = x0 + fragment.x;
            let s = &fragment.style;
            self.current_page().items.push(DrawItem::Text(TextItem {
                x,
                baseline,
                face: s.face,
                size: s.size,
                color: s.color,
                text: fragment.text.clone(),
            }));
            if s.underline {
                let thickness = (s.size * 0.05).max(0.5);
                self.rule(x, x + fragment.width, baseline + s.size * 0.1, thickness, s.color);
            }
            if let Some(uri) = &s.link {
                self.current_page().links.push(LinkArea {
                    x,
                    top,
                    width: fragment.width,
                    height,
                    uri: uri.clone(),
                });
            }
        }
    }

    // ── Lists ───────────────────────────────────────────────────────────────

    fn list(
        &mut self,
        start: Option<u64>,
        items: &[Vec<Block>],
        parent: &ComputedStyle,
        area: Area,
        nested: bool,
    ) -> Result<(), RenderError> {
        let element = if start.is_some() {
            Element::OrderedList
        } else {
            Element::UnorderedList
        };
        let mut style = self.styles.resolve(element, parent)?;
        if nested {
            style.margin.top = 0.0;
            style.margin.bottom = 0.0;
        }
        let inner = self.open_box(&style, area);
        let item_style = self.styles.resolve(Element::ListItem, &style)?;

        let mut number = start.unwrap_or(1);
        for item in items {
            let item_area = self.open_box(&item_style, inner);
            if let Some(marker) = marker_for(&item_style, number, item_area.left) {
                self.markers.push(marker);
            }
            self.blocks(item, &item_style, item_area, true)?;
            if !self.markers.is_empty() {
                // Empty item: the marker still gets a line of its own.
                self.emit_line(&Line::default(), &item_style, item_area);
            }
            self.close_box(&item_style, inner);
            number += 1;
        }

        self.close_box(&style, area);
        Ok(())
    }

    fn emit_marker(&mut self, marker: PendingMarker, baseline: f32) {
        match marker.glyph {
            MarkerGlyph::Text(text) => {
                self.current_page().items.push(DrawItem::Text(TextItem {
                    x: marker.x,
                    baseline,
                    face: marker.face,
                    size: marker.size,
                    color: marker.color,
                    text,
                }));
            }
            MarkerGlyph::Square => {
                let side = marker.size * SQUARE_SIDE;
                self.rule(
                    marker.x,
                    marker.x + side,
                    baseline - marker.size * 0.3,
                    side,
                    marker.color,
                );
            }
        }
    }
}

/// Gap between a marker and its item text, in em.
const MARKER_GAP: f32 = 0.5;
const SQUARE_SIDE: f32 = 0.35;

fn marker_for(style: &ComputedStyle, number: u64, content_left: f32) -> Option<PendingMarker> {
    let glyph = match style.list_marker {
        ListMarker::None => return None,
        ListMarker::Disc => MarkerGlyph::Text("\u{2022}".to_string()),
        ListMarker::Circle => MarkerGlyph::Text("o".to_string()),
        ListMarker::Square => MarkerGlyph::Square,
        ListMarker::Decimal => MarkerGlyph::Text(format!("{number}.")),
    };
    let width = match &glyph {
        MarkerGlyph::Text(text) => style.face.metrics().measure_pt(text, style.font_size),
        MarkerGlyph::Square => style.font_size * SQUARE_SIDE,
    };
    Some(PendingMarker {
        glyph,
        x: content_left - MARKER_GAP * style.font_size - width,
        face: style.face,
        size: style.font_size,
        color: style.color,
    })
}

fn run_style(style: &ComputedStyle, link: Option<String>) -> RunStyle {
    RunStyle {
        face: style.face,
        size: style.font_size,
        color: style.color,
        underline: style.underline,
        link,
        line_height: style.line_height_pt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::FontFamily;
    use crate::style::StyleSheet;

    fn layout(markdown: &str) -> Layout {
        let styles = StyleResolver::new(&StyleSheet::resume()).unwrap();
        layout_document(&Document::parse(markdown), &styles).unwrap()
    }

    fn find<'l>(layout: &'l Layout, text: &str) -> &'l TextItem {
        layout
            .text_items()
            .map(|(_, t)| t)
            .find(|t| t.text.contains(text))
            .unwrap_or_else(|| panic!("no text item containing {text:?}"))
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let layout = layout("");
        assert_eq!(layout.pages.len(), 1);
        assert!(layout.pages[0].items.is_empty());
    }

    #[test]
    fn test_h1_is_styled_and_at_top() {
        let layout = layout("# Sample Name\n\nSome text.");
        let h1 = find(&layout, "Sample Name");
        assert_eq!(h1.color, Rgb(0x1a, 0x4d, 0x5c));
        assert!((h1.size - 13.5).abs() < 1e-4);
        assert!(h1.face.bold);
        assert_eq!(h1.face.family, FontFamily::Helvetica);
        assert!(h1.x >= 43.2 && h1.baseline > 36.0 && h1.baseline < 80.0);
        let body = find(&layout, "Some text.");
        assert!(body.baseline > h1.baseline);
        assert!((body.size - 7.875).abs() < 1e-4);
    }

    #[test]
    fn test_h2_gets_bottom_border() {
        let layout = layout("## Experience\n\ntext");
        let h2 = find(&layout, "Experience").clone();
        let rule = layout.pages[0]
            .items
            .iter()
            .find_map(|item| match item {
                DrawItem::Rule(r) if r.y > h2.baseline => Some(r.clone()),
                _ => None,
            })
            .expect("border under h2");
        assert_eq!(rule.color, Rgb(0x1a, 0x4d, 0x5c));
        assert!((rule.thickness - 0.75).abs() < 1e-4);
        assert!((rule.x2 - rule.x1 - (612.0 - 86.4 - 12.0)).abs() < 1e-2, "spans the body width");
    }

    #[test]
    fn test_links_are_coloured_underlined_and_clickable() {
        let layout = layout("See [my site](https://example.com) now.");
        let link = find(&layout, "my site");
        assert_eq!(link.color, Rgb(0x00, 0x56, 0xb3));
        let area = &layout.pages[0].links[0];
        assert_eq!(area.uri, "https://example.com");
        assert!((area.x - link.x).abs() < 1e-4);
        assert!(area.width > 0.0 && area.height > 0.0);
        let underline = layout.pages[0].items.iter().any(|item| {
            matches!(item, DrawItem::Rule(r) if r.y > link.baseline && r.color == link.color)
        });
        assert!(underline, "links are underlined");
    }

    #[test]
    fn test_bullets_sit_left_of_item_text() {
        let layout = layout("- first item\n- second item\n");
        let first = find(&layout, "first item").clone();
        let bullets: Vec<&TextItem> = layout
            .text_items()
            .map(|(_, t)| t)
            .filter(|t| t.text == "\u{2022}")
            .collect();
        assert_eq!(bullets.len(), 2);
        assert!(bullets[0].x < first.x);
        assert!((bullets[0].baseline - first.baseline).abs() < 1e-4);
    }

    #[test]
    fn test_ordered_list_numbers_from_start() {
        let layout = layout("3. three\n4. four\n");
        assert!(layout.text_items().any(|(_, t)| t.text == "3."));
        assert!(layout.text_items().any(|(_, t)| t.text == "4."));
    }

    #[test]
    fn test_long_document_paginates_without_overflow() {
        let mut md = String::from("# Name\n\n");
        for i in 0..40 {
            md.push_str(&format!("## Section {i}\n\n- bullet one for section {i}\n- bullet two\n\n"));
        }
        let layout = layout(&md);
        assert!(layout.pages.len() > 1, "got {} pages", layout.pages.len());
        let bottom = layout.page.content_bottom();
        for (_, item) in layout.text_items() {
            assert!(item.baseline <= bottom, "{:?} below content area", item.text);
        }
    }

    #[test]
    fn test_heading_never_ends_a_page() {
        let mut md = String::new();
        for i in 0..60 {
            md.push_str(&format!("## Heading {i}\n\nparagraph {i}\n\n"));
        }
        let layout = layout(&md);
        for page in &layout.pages {
            let last = page
                .items
                .iter()
                .rev()
                .find_map(|item| match item {
                    DrawItem::Text(t) => Some(t),
                    DrawItem::Rule(_) => None,
                })
                .unwrap();
            assert!(last.text.starts_with("paragraph"), "page ends with {:?}", last.text);
        }
    }

    #[test]
    fn test_code_block_uses_courier() {
        let layout = layout("```\nlet x = 1;\n```\n");
        let code = find(&layout, "let x = 1;");
        assert_eq!(code.face.family, FontFamily::Courier);
    }

    #[test]
    fn test_faces_lists_used_fonts() {
        let faces = layout("**bold** and *italic*").faces();
        assert!(faces.iter().any(|f| f.bold && !f.italic));
        assert!(faces.iter().any(|f| f.italic && !f.bold));
    }
}
