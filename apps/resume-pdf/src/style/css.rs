//! CSS value parsers: lengths, colors, box shorthands, borders, page sizes.
//!
//! All absolute lengths are normalised to PDF points (1in = 72pt, 1px = 0.75pt).

pub const PT_PER_IN: f32 = 72.0;
pub const PT_PER_PX: f32 = 0.75;

// ────────────────────────────────────────────────────────────────────────────
// Lengths
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Pt(f32),
    /// Multiple of the reference font size.
    Em(f32),
    Percent(f32),
}

impl Length {
    /// Resolves to points; `em` is the reference font size for em and percent.
    pub fn to_pt(self, em: f32) -> f32 {
        match self {
            Length::Pt(v) => v,
            Length::Em(v) => v * em,
            Length::Percent(v) => v / 100.0 * em,
        }
    }

    pub fn is_absolute(self) -> bool {
        matches!(self, Length::Pt(_))
    }
}

pub fn parse_length(value: &str) -> Option<Length> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" || v == "auto" {
        return Some(Length::Pt(0.0));
    }
    // Longer suffixes first so "rem" is not read as "em".
    const UNITS: &[(&str, f32)] = &[
        ("rem", 12.0),
        ("in", PT_PER_IN),
        ("cm", PT_PER_IN / 2.54),
        ("mm", PT_PER_IN / 25.4),
        ("pt", 1.0),
        ("pc", 12.0),
        ("px", PT_PER_PX),
    ];
    for (unit, scale) in UNITS {
        if let Some(num) = v.strip_suffix(unit) {
            return parse_number(num).map(|n| Length::Pt(n * scale));
        }
    }
    if let Some(num) = v.strip_suffix("em") {
        return parse_number(num).map(Length::Em);
    }
    if let Some(num) = v.strip_suffix('%') {
        return parse_number(num).map(Length::Percent);
    }
    None
}

pub fn parse_number(value: &str) -> Option<f32> {
    let n: f32 = value.trim().parse().ok()?;
    n.is_finite().then_some(n)
}

/// Parses a 1–4 value box shorthand (`margin`, `padding`) into
/// `[top, right, bottom, left]`.
pub fn parse_edges(value: &str) -> Option<[Length; 4]> {
    let parts: Vec<Length> = value
        .split_whitespace()
        .map(parse_length)
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [all] => Some([*all; 4]),
        [v, h] => Some([*v, *h, *v, *h]),
        [t, h, b] => Some([*t, *h, *b, *h]),
        [t, r, b, l] => Some([*t, *r, *b, *l]),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Colors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Components scaled to 0.0..=1.0 for PDF color operators.
    pub fn components(self) -> [f32; 3] {
        [
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        ]
    }
}

pub fn parse_color(value: &str) -> Option<Rgb> {
    let v = value.trim().to_ascii_lowercase();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = v.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let channels: Vec<u8> = args
            .split(',')
            .map(|c| c.trim().parse::<u8>().ok())
            .collect::<Option<_>>()?;
        return match channels.as_slice() {
            [r, g, b] => Some(Rgb(*r, *g, *b)),
            _ => None,
        };
    }
    let named = match v.as_str() {
        "black" => Rgb(0, 0, 0),
        "white" => Rgb(255, 255, 255),
        "red" => Rgb(255, 0, 0),
        "green" => Rgb(0, 128, 0),
        "blue" => Rgb(0, 0, 255),
        "navy" => Rgb(0, 0, 128),
        "teal" => Rgb(0, 128, 128),
        "maroon" => Rgb(128, 0, 0),
        "purple" => Rgb(128, 0, 128),
        "olive" => Rgb(128, 128, 0),
        "gray" | "grey" => Rgb(128, 128, 128),
        "silver" => Rgb(192, 192, 192),
        "dimgray" | "dimgrey" => Rgb(105, 105, 105),
        "darkslategray" | "darkslategrey" => Rgb(47, 79, 79),
        _ => return None,
    };
    Some(named)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            Some(Rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        6 => Some(Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fonts
// ────────────────────────────────────────────────────────────────────────────

/// Splits a `font-family` list into unquoted names in priority order.
pub fn parse_font_family(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Absolute `font-size` keywords in points (16px medium).
pub fn font_size_keyword(value: &str) -> Option<f32> {
    let px = match value {
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        _ => return None,
    };
    Some(px * PT_PER_PX)
}

// ────────────────────────────────────────────────────────────────────────────
// Borders
// ────────────────────────────────────────────────────────────────────────────

/// A parsed `border-*` shorthand. `color: None` means `currentColor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSpec {
    pub width: f32,
    pub color: Option<Rgb>,
    pub visible: bool,
}

pub fn parse_border(value: &str) -> Option<BorderSpec> {
    let mut spec = BorderSpec {
        width: 3.0 * PT_PER_PX,
        color: None,
        visible: false,
    };
    for token in value.split_whitespace() {
        let token = token.to_ascii_lowercase();
        match token.as_str() {
            "none" | "hidden" => spec.visible = false,
            "solid" | "dashed" | "dotted" | "double" | "groove" | "ridge" | "inset" | "outset" => {
                spec.visible = true
            }
            "thin" => spec.width = PT_PER_PX,
            "medium" => spec.width = 3.0 * PT_PER_PX,
            "thick" => spec.width = 5.0 * PT_PER_PX,
            other => {
                if let Some(len) = parse_length(other).filter(|l| l.is_absolute()) {
                    spec.width = len.to_pt(0.0);
                } else {
                    spec.color = Some(parse_color(other)?);
                }
            }
        }
    }
    Some(spec)
}

// ────────────────────────────────────────────────────────────────────────────
// Page sizes
// ────────────────────────────────────────────────────────────────────────────

pub const LETTER: (f32, f32) = (612.0, 792.0);

/// Parses an `@page { size }` value into `(width, height)` in points.
pub fn parse_page_size(value: &str) -> Option<(f32, f32)> {
    let mut size: Option<(f32, f32)> = None;
    let mut lengths: Vec<f32> = Vec::new();
    let mut landscape = false;

    for token in value.split_whitespace() {
        match token.to_ascii_lowercase().as_str() {
            "auto" | "letter" => size = Some(LETTER),
            "legal" => size = Some((612.0, 1008.0)),
            "a4" => size = Some((595.28, 841.89)),
            "a5" => size = Some((419.53, 595.28)),
            "portrait" => landscape = false,
            "landscape" => landscape = true,
            other => {
                let len = parse_length(other).filter(|l| l.is_absolute())?;
                lengths.push(len.to_pt(0.0));
            }
        }
    }

    let (w, h) = match (size, lengths.as_slice()) {
        (Some(named), []) => named,
        (None, []) => LETTER,
        (None, [side]) => (*side, *side),
        (None, [w, h]) => (*w, *h),
        _ => return None,
    };
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(if landscape { (w.max(h), w.min(h)) } else { (w, h) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(l: Option<Length>) -> f32 {
        l.unwrap().to_pt(10.0)
    }

    #[test]
    fn test_parse_length_units() {
        assert!((pt(parse_length("0.5in")) - 36.0).abs() < 1e-4);
        assert!((pt(parse_length("10.5px")) - 7.875).abs() < 1e-4);
        assert!((pt(parse_length("12pt")) - 12.0).abs() < 1e-4);
        assert!((pt(parse_length("2.54cm")) - 72.0).abs() < 1e-3);
        assert!((pt(parse_length("1.5em")) - 15.0).abs() < 1e-4);
        assert!((pt(parse_length("150%")) - 15.0).abs() < 1e-4);
        assert_eq!(parse_length("0"), Some(Length::Pt(0.0)));
        assert_eq!(parse_length("1rem"), Some(Length::Pt(12.0)));
    }

    #[test]
    fn test_parse_length_rejects_garbage() {
        assert_eq!(parse_length("wide"), None);
        assert_eq!(parse_length("px"), None);
        assert_eq!(parse_length("NaNpx"), None);
    }

    #[test]
    fn test_parse_edges_shorthand() {
        let edges = parse_edges("0.5in 0.6in 0.5in 0.6in").unwrap();
        let pts: Vec<f32> = edges.iter().map(|l| l.to_pt(0.0)).collect();
        assert!((pts[0] - 36.0).abs() < 1e-3);
        assert!((pts[1] - 43.2).abs() < 1e-3);
        assert!((pts[2] - 36.0).abs() < 1e-3);
        assert!((pts[3] - 43.2).abs() < 1e-3);

        let two = parse_edges("1em 0").unwrap();
        assert_eq!(two[0], Length::Em(1.0));
        assert_eq!(two[1], Length::Pt(0.0));
        assert_eq!(two[3], Length::Pt(0.0));
        assert_eq!(parse_edges("1px 2px 3px 4px 5px"), None);
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#1a4d5c"), Some(Rgb(0x1a, 0x4d, 0x5c)));
        assert_eq!(parse_color("#FFF"), Some(Rgb(255, 255, 255)));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Some(Rgb(1, 2, 3)));
        assert_eq!(parse_color("Teal"), Some(Rgb(0, 128, 128)));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("tealish"), None);
    }

    #[test]
    fn test_parse_font_family_list() {
        assert_eq!(
            parse_font_family("Calibri, \"Times New Roman\", sans-serif"),
            vec!["Calibri", "Times New Roman", "sans-serif"]
        );
    }

    #[test]
    fn test_parse_border() {
        let b = parse_border("1px solid #1a4d5c").unwrap();
        assert!((b.width - 0.75).abs() < 1e-4);
        assert_eq!(b.color, Some(Rgb(0x1a, 0x4d, 0x5c)));
        assert!(b.visible);

        let none = parse_border("none").unwrap();
        assert!(!none.visible);

        assert_eq!(parse_border("2px wobbly"), None);
    }

    #[test]
    fn test_parse_page_size() {
        assert_eq!(parse_page_size("letter"), Some(LETTER));
        assert_eq!(parse_page_size("letter landscape"), Some((792.0, 612.0)));
        let a4 = parse_page_size("A4").unwrap();
        assert!((a4.0 - 595.28).abs() < 1e-2);
        assert_eq!(parse_page_size("8.5in 11in"), Some((612.0, 792.0)));
        assert_eq!(parse_page_size("3em 4em"), None);
    }
}
