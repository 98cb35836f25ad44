//! Serialises a [`Layout`] into PDF bytes with `lopdf`.
//!
//! Text uses the base-14 Type1 fonts with `WinAnsiEncoding`, so no font
//! program is embedded and every viewer draws the same glyph widths the
//! layout engine measured. The document carries no timestamps or random IDs:
//! identical layouts serialise to identical bytes.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::errors::RenderError;
use crate::layout::{DrawItem, FontFace, Layout, LinkArea, RuleItem, TextItem};

const PRODUCER: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Writes `layout` as a complete PDF document.
pub fn write_pdf(layout: &Layout, title: Option<&str>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    // One resource name per face, in face order so output is stable.
    let font_names: BTreeMap<FontFace, String> = layout
        .faces()
        .into_iter()
        .enumerate()
        .map(|(i, face)| (face, format!("F{}", i + 1)))
        .collect();

    let mut fonts = Dictionary::new();
    for (face, name) in &font_names {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.pdf_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(name.as_bytes().to_vec(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let height = layout.page.height;
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        layout.page.width.into(),
        height.into(),
    ];

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let mut operations = Vec::new();
        for item in &page.items {
            match item {
                DrawItem::Text(text) => push_text(&mut operations, text, &font_names, height),
                DrawItem::Rule(rule) => push_rule(&mut operations, rule, height),
            }
        }
        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if !page.links.is_empty() {
            let annots: Vec<Object> = page
                .links
                .iter()
                .map(|link| doc.add_object(link_annotation(link, height)).into())
                .collect();
            page_dict.set("Annots", annots);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! { "Producer" => Object::string_literal(PRODUCER) };
    if let Some(title) = title {
        info.set("Title", text_string(title));
    }
    let info_id: ObjectId = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Engine(format!("serialising PDF: {e}")))?;
    Ok(bytes)
}

fn push_text(
    ops: &mut Vec<Operation>,
    text: &TextItem,
    font_names: &BTreeMap<FontFace, String>,
    page_height: f32,
) {
    let Some(font) = font_names.get(&text.face) else {
        return;
    };
    let [r, g, b] = text.color.components();
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), text.size.into()],
    ));
    ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    ops.push(Operation::new(
        "Td",
        vec![text.x.into(), (page_height - text.baseline).into()],
    ));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(&text.text), StringFormat::Hexadecimal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn push_rule(ops: &mut Vec<Operation>, rule: &RuleItem, page_height: f32) {
    let [r, g, b] = rule.color.components();
    let y = page_height - rule.y;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
    ops.push(Operation::new("w", vec![rule.thickness.into()]));
    ops.push(Operation::new("m", vec![rule.x1.into(), y.into()]));
    ops.push(Operation::new("l", vec![rule.x2.into(), y.into()]));
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

fn link_annotation(link: &LinkArea, page_height: f32) -> Dictionary {
    let bottom = page_height - link.top - link.height;
    let top = page_height - link.top;
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![
            link.x.into(),
            bottom.into(),
            (link.x + link.width).into(),
            top.into(),
        ],
        "Border" => vec![0.into(), 0.into(), 0.into()],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(link.uri.as_str()),
        },
    }
}

/// PDF text string: literal when ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Encodes text for a `WinAnsiEncoding` font. Characters the encoding lacks
/// become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{00A0}'..='\u{00FF}' => c as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => b'?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::flow::PageContent;
    use crate::layout::font_metrics::FontFamily;
    use crate::style::css::Rgb;
    use crate::style::PageSetup;

    fn sample_layout() -> Layout {
        let text = TextItem {
            x: 50.0,
            baseline: 60.0,
            face: FontFace::regular(FontFamily::Helvetica),
            size: 12.0,
            color: Rgb(0x1a, 0x4d, 0x5c),
            text: "Sample Name".into(),
        };
        let rule = RuleItem {
            x1: 50.0,
            x2: 500.0,
            y: 70.0,
            thickness: 0.75,
            color: Rgb::BLACK,
        };
        let link = LinkArea {
            x: 50.0,
            top: 80.0,
            width: 40.0,
            height: 12.0,
            uri: "https://example.com".into(),
        };
        Layout {
            page: PageSetup::default(),
            pages: vec![
                PageContent {
                    items: vec![DrawItem::Text(text), DrawItem::Rule(rule)],
                    links: vec![link],
                },
                PageContent::default(),
            ],
        }
    }

    #[test]
    fn test_writes_loadable_document() {
        let bytes = write_pdf(&sample_layout(), Some("Resume")).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_page_has_letter_media_box_and_base14_font() {
        let bytes = write_pdf(&sample_layout(), None).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let (_, first) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(first).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 612.0);
        assert_eq!(media_box[3].as_float().unwrap(), 792.0);

        let resources = doc
            .get_dictionary(page.get(b"Resources").unwrap().as_reference().unwrap())
            .unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        let base_fonts: Vec<Vec<u8>> = fonts
            .iter()
            .map(|(_, font)| {
                let font = doc.get_dictionary(font.as_reference().unwrap()).unwrap();
                font.get(b"BaseFont").unwrap().as_name().unwrap().to_vec()
            })
            .collect();
        assert_eq!(base_fonts, vec![b"Helvetica".to_vec()]);
    }

    #[test]
    fn test_links_become_uri_annotations() {
        let bytes = write_pdf(&sample_layout(), None).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let (_, first) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(first).unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 1);
        let annot = doc
            .get_dictionary(annots[0].as_reference().unwrap())
            .unwrap();
        let action = annot.get(b"A").unwrap().as_dict().unwrap();
        assert_eq!(action.get(b"URI").unwrap().as_str().unwrap(), b"https://example.com");
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = write_pdf(&sample_layout(), Some("Resume")).unwrap();
        let b = write_pdf(&sample_layout(), Some("Resume")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_win_ansi_maps_typographic_characters() {
        assert_eq!(encode_win_ansi("A \u{2022} \u{2013} \u{201C}x\u{201D}"), vec![
            b'A', b' ', 0x95, b' ', 0x96, b' ', 0x93, b'x', 0x94
        ]);
        assert_eq!(encode_win_ansi("caf\u{e9}"), b"caf\xe9".to_vec());
        assert_eq!(encode_win_ansi("\u{4e2d}"), b"?".to_vec());
    }

    #[test]
    fn test_non_ascii_title_is_utf16() {
        match text_string("Ren\u{e9}") {
            Object::String(bytes, _) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
