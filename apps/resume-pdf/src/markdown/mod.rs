//! Markdown document model.
//!
//! A `Document` owns the Markdown source and the block tree parsed from it.
//! The same pulldown-cmark event stream feeds both the HTML intermediate
//! (`html::fragment`) and the block tree the layout engine consumes, so the
//! two agree about structure. Raw HTML is interpreted the way a browser shows
//! it: comments vanish, `<br>` breaks the line and other tags are stripped.

pub mod html;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

use crate::errors::RenderError;

/// Parser options shared by the HTML and block-tree passes.
/// Plain CommonMark: no tables, footnotes or task lists.
pub(crate) fn parser_options() -> Options {
    Options::empty()
}

// ────────────────────────────────────────────────────────────────────────────
// Block tree
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// Inline content of a tight list item. Laid out like a paragraph without
    /// paragraph margins, matching `<li>text</li>`.
    Plain(Vec<Inline>),
    List {
        /// `Some(n)` for ordered lists starting at `n`.
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    CodeBlock(String),
    BlockQuote(Vec<Block>),
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text {
        text: String,
        marks: Marks,
        link: Option<String>,
    },
    LineBreak,
}

/// Inline formatting active on a run of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Marks {
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
}

impl Inline {
    fn plain_text(&self) -> &str {
        match self {
            Inline::Text { text, .. } => text,
            Inline::LineBreak => " ",
        }
    }
}

/// Concatenates the visible text of a run of inlines.
pub fn inline_text(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::plain_text).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

/// An immutable Markdown document, created fresh per render.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    blocks: Vec<Block>,
}

impl Document {
    pub fn parse(markdown: &str) -> Self {
        Document {
            source: markdown.to_string(),
            blocks: build_blocks(markdown),
        }
    }

    /// Builds a document from raw bytes. Input that is not UTF-8 cannot be
    /// mapped to HTML and is rejected as a conversion failure.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let markdown = String::from_utf8(bytes).map_err(|e| {
            RenderError::Conversion(format!(
                "input is not valid UTF-8 (invalid byte at offset {})",
                e.utf8_error().valid_up_to()
            ))
        })?;
        Ok(Self::parse(&markdown))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Text of the first level-1 heading, used as the PDF title.
    pub fn title(&self) -> Option<String> {
        self.blocks.iter().find_map(|b| match b {
            Block::Heading { level: 1, content } => {
                let text = inline_text(content).trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        })
    }

    /// Visible text of every heading in document order, `(level, text)`.
    pub fn headings(&self) -> Vec<(u8, String)> {
        let mut out = Vec::new();
        collect_headings(&self.blocks, &mut out);
        out
    }
}

fn collect_headings(blocks: &[Block], out: &mut Vec<(u8, String)>) {
    for block in blocks {
        match block {
            Block::Heading { level, content } => out.push((*level, inline_text(content))),
            Block::List { items, .. } => {
                for item in items {
                    collect_headings(item, out);
                }
            }
            Block::BlockQuote(children) => collect_headings(children, out),
            _ => {}
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event stream → block tree
// ────────────────────────────────────────────────────────────────────────────

enum Frame {
    Root(Vec<Block>),
    Paragraph(Vec<Inline>),
    Heading(u8, Vec<Inline>),
    List(Option<u64>, Vec<Vec<Block>>),
    /// Child blocks plus inline content not wrapped in a paragraph (tight items).
    Item(Vec<Block>, Vec<Inline>),
    BlockQuote(Vec<Block>),
    CodeBlock(String),
}

struct TreeBuilder {
    stack: Vec<Frame>,
    strong: usize,
    emphasis: usize,
    links: Vec<String>,
    /// Inside an HTML comment that spans several events.
    in_comment: bool,
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn build_blocks(markdown: &str) -> Vec<Block> {
    let mut builder = TreeBuilder {
        stack: vec![Frame::Root(Vec::new())],
        strong: 0,
        emphasis: 0,
        links: Vec::new(),
        in_comment: false,
    };

    for event in Parser::new_ext(markdown, parser_options()) {
        builder.handle(event);
    }

    // Unwind anything left open; pulldown-cmark balances its events, so this
    // only runs on the root frame in practice.
    while builder.stack.len() > 1 {
        builder.close_top();
    }
    match builder.stack.pop() {
        Some(Frame::Root(blocks)) => blocks,
        _ => Vec::new(),
    }
}

impl TreeBuilder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text, false),
            Event::Code(text) => self.text(&text, true),
            Event::Html(html) => self.html(&html),
            Event::SoftBreak => self.text(" ", false),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::FootnoteReference(label) => self.text(&format!("[{}]", &*label), false),
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }, false),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.stack.push(Frame::Paragraph(Vec::new())),
            Tag::Heading(level, _, _) => self
                .stack
                .push(Frame::Heading(heading_level(level), Vec::new())),
            Tag::List(start) => self.stack.push(Frame::List(start, Vec::new())),
            Tag::Item => self.stack.push(Frame::Item(Vec::new(), Vec::new())),
            Tag::BlockQuote => self.stack.push(Frame::BlockQuote(Vec::new())),
            Tag::CodeBlock(_) => self.stack.push(Frame::CodeBlock(String::new())),
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Link(_, dest, _) => self.links.push(dest.to_string()),
            // Image alt text arrives as ordinary text events.
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph
            | Tag::Heading(..)
            | Tag::List(_)
            | Tag::Item
            | Tag::BlockQuote
            | Tag::CodeBlock(_) => self.close_top(),
            Tag::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            Tag::Strong => self.strong = self.strong.saturating_sub(1),
            Tag::Link(..) => {
                self.links.pop();
            }
            _ => {}
        }
    }

    fn close_top(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Paragraph(content) => self.push_block(Block::Paragraph(content)),
            Frame::Heading(level, content) => self.push_block(Block::Heading { level, content }),
            Frame::List(start, items) => self.push_block(Block::List { start, items }),
            Frame::Item(mut blocks, pending) => {
                if !pending.is_empty() {
                    blocks.push(Block::Plain(pending));
                }
                match self.stack.last_mut() {
                    Some(Frame::List(_, items)) => items.push(blocks),
                    _ => {
                        for block in blocks {
                            self.push_block(block);
                        }
                    }
                }
            }
            Frame::BlockQuote(children) => self.push_block(Block::BlockQuote(children)),
            Frame::CodeBlock(code) => self.push_block(Block::CodeBlock(code)),
            Frame::Root(blocks) => {
                // Never popped by `end`; restore so the tree is not lost.
                self.stack.push(Frame::Root(blocks));
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Frame::Root(blocks)) | Some(Frame::BlockQuote(blocks)) => blocks.push(block),
            Some(Frame::Item(blocks, pending)) => {
                if !pending.is_empty() {
                    blocks.push(Block::Plain(std::mem::take(pending)));
                }
                blocks.push(block);
            }
            Some(Frame::List(_, items)) => items.push(vec![block]),
            // Block events never arrive inside inline containers.
            Some(Frame::Paragraph(_) | Frame::Heading(..) | Frame::CodeBlock(_)) | None => {}
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(Frame::Paragraph(content))
            | Some(Frame::Heading(_, content))
            | Some(Frame::Item(_, content)) => content.push(inline),
            Some(Frame::CodeBlock(code)) => code.push_str(inline.plain_text()),
            _ => self.push_block(Block::Paragraph(vec![inline])),
        }
    }

    fn text(&mut self, text: &str, code: bool) {
        if let Some(Frame::CodeBlock(buf)) = self.stack.last_mut() {
            buf.push_str(text);
            return;
        }
        let inline = self.styled(text, code);
        self.push_inline(inline);
    }

    fn styled(&self, text: &str, code: bool) -> Inline {
        Inline::Text {
            text: text.to_string(),
            marks: Marks {
                strong: self.strong > 0,
                emphasis: self.emphasis > 0,
                code,
            },
            link: self.links.last().cloned(),
        }
    }

    /// Raw HTML: comments and declarations are dropped, `<br>` becomes a line
    /// break and `<b>`/`<strong>`/`<i>`/`<em>` toggle marks. Other tags are
    /// stripped and only their text content is kept.
    fn html(&mut self, html: &str) {
        if let Some(Frame::CodeBlock(buf)) = self.stack.last_mut() {
            buf.push_str(html);
            return;
        }
        let mut inlines = Vec::new();
        let mut rest = html;
        while !rest.is_empty() {
            if self.in_comment {
                rest = match rest.find("-->") {
                    Some(end) => {
                        self.in_comment = false;
                        &rest[end + 3..]
                    }
                    None => "",
                };
                continue;
            }
            if let Some(after) = rest.strip_prefix("<!--") {
                self.in_comment = true;
                rest = after;
                continue;
            }
            if let Some(inner) = rest.strip_prefix('<') {
                if let Some(end) = inner.find('>') {
                    self.html_tag(&inner[..end], &mut inlines);
                    rest = &inner[end + 1..];
                    continue;
                }
            }
            // A '<' that opens no tag is ordinary text.
            let skip = usize::from(rest.starts_with('<'));
            let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
            inlines.push(self.styled(&decode_entities(&rest[..end]), false));
            rest = &rest[end..];
        }

        let inline_context = matches!(
            self.stack.last(),
            Some(Frame::Paragraph(_)) | Some(Frame::Heading(..)) | Some(Frame::Item(..))
        );
        if inline_context {
            for inline in inlines {
                self.push_inline(inline);
            }
        } else if let Some(block) = html_paragraph(inlines) {
            self.push_block(block);
        }
    }

    fn html_tag(&mut self, tag: &str, inlines: &mut Vec<Inline>) {
        // Declarations (`<!DOCTYPE …>`) and processing instructions.
        if tag.starts_with('!') || tag.starts_with('?') {
            return;
        }
        let (closing, body) = match tag.strip_prefix('/') {
            Some(body) => (true, body),
            None => (false, tag),
        };
        let name = body
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let self_closing = body.trim_end().ends_with('/');
        match (name.as_str(), closing) {
            ("br", _) => inlines.push(Inline::LineBreak),
            ("b" | "strong", false) if !self_closing => self.strong += 1,
            ("b" | "strong", true) => self.strong = self.strong.saturating_sub(1),
            ("i" | "em", false) if !self_closing => self.emphasis += 1,
            ("i" | "em", true) => self.emphasis = self.emphasis.saturating_sub(1),
            _ => {}
        }
    }
}

/// Wraps the visible content of an HTML block line in a paragraph, or `None`
/// when the line carries only markup and whitespace.
fn html_paragraph(inlines: Vec<Inline>) -> Option<Block> {
    let mut content: Vec<Inline> = inlines
        .into_iter()
        .filter(|inline| !matches!(inline, Inline::Text { text, .. } if text.trim().is_empty()))
        .collect();
    let has_text = content
        .iter()
        .any(|inline| matches!(inline, Inline::Text { .. }));
    if !has_text {
        return None;
    }
    if let Some(Inline::Text { text, .. }) = content.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(Inline::Text { text, .. }) = content.last_mut() {
        *text = text.trim_end().to_string();
    }
    Some(Block::Paragraph(content))
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
