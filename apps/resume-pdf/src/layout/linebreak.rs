//! Line breaking for styled inline runs.
//!
//! Greedy word wrap: words are placed left to right and a new line starts when
//! the next word (plus the space before it) would cross the available width.
//! A "word" may span several runs (`**Role**,` is one word in two styles) and
//! is never split between runs; only a word wider than a whole line is broken
//! by character. Whitespace collapses to single spaces, leading and trailing
//! spaces are dropped, as in CSS `white-space: normal`.

use crate::layout::font_metrics::FontFace;
use crate::style::css::Rgb;

/// Typographic style of one inline run, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub face: FontFace,
    pub size: f32,
    pub color: Rgb,
    pub underline: bool,
    pub link: Option<String>,
    /// Line height this run contributes to its line box, in points.
    pub line_height: f32,
}

impl RunStyle {
    pub fn measure(&self, text: &str) -> f32 {
        self.face.metrics().measure_pt(text, self.size)
    }

    fn ascent(&self) -> f32 {
        self.face.metrics().ascent * self.size
    }

    fn descent(&self) -> f32 {
        self.face.metrics().descent * self.size
    }

    /// Distance from the top of a line box of height `line_height` to the
    /// baseline, splitting the leading evenly above and below the glyphs.
    pub fn baseline_offset(&self, line_height: f32) -> f32 {
        (line_height - (self.ascent() + self.descent())) / 2.0 + self.ascent()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Run {
    Text { text: String, style: RunStyle },
    Break,
}

/// A same-styled stretch of text placed on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub style: RunStyle,
    /// Offset from the start of the line, in points.
    pub x: f32,
    pub width: f32,
    run: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: f32,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    /// Height of the line box: the tallest run, never less than the strut.
    pub fn height(&self, strut: f32) -> f32 {
        self.fragments
            .iter()
            .map(|f| f.style.line_height)
            .fold(strut, f32::max)
    }

    fn push(&mut self, run: usize, style: &RunStyle, text: &str) {
        let width = style.measure(text);
        match self.fragments.last_mut() {
            Some(last) if last.run == run => {
                last.text.push_str(text);
                last.width += width;
            }
            _ => self.fragments.push(Fragment {
                text: text.to_string(),
                style: style.clone(),
                x: self.width,
                width,
                run,
            }),
        }
        self.width += width;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ────────────────────────────────────────────────────────────────────────────

enum Token<'a> {
    /// (run index, text) pieces with no whitespace between them.
    Word(Vec<(usize, &'a str)>),
    Space(usize),
    Break,
}

fn is_collapsible(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn tokenize(runs: &[Run]) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word: Vec<(usize, &str)> = Vec::new();

    for (index, run) in runs.iter().enumerate() {
        let text = match run {
            Run::Text { text, .. } => text.as_str(),
            Run::Break => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                tokens.push(Token::Break);
                continue;
            }
        };

        let mut piece_start: Option<usize> = None;
        for (pos, c) in text.char_indices() {
            if is_collapsible(c) {
                if let Some(start) = piece_start.take() {
                    word.push((index, &text[start..pos]));
                }
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                if !matches!(tokens.last(), Some(Token::Space(_))) {
                    tokens.push(Token::Space(index));
                }
            } else if piece_start.is_none() {
                piece_start = Some(pos);
            }
        }
        if let Some(start) = piece_start {
            word.push((index, &text[start..]));
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

fn run_style(runs: &[Run], index: usize) -> Option<&RunStyle> {
    match runs.get(index) {
        Some(Run::Text { style, .. }) => Some(style),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Breaking
// ────────────────────────────────────────────────────────────────────────────

/// Breaks styled runs into lines no wider than `max_width` points.
pub fn break_lines(runs: &[Run], max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();
    let mut pending_space: Option<usize> = None;

    for token in tokenize(runs) {
        match token {
            Token::Space(run) => {
                if !current.is_empty() {
                    pending_space = Some(run);
                }
            }
            Token::Break => {
                lines.push(std::mem::take(&mut current));
                pending_space = None;
            }
            Token::Word(pieces) => {
                let word_width: f32 = pieces
                    .iter()
                    .filter_map(|(run, text)| run_style(runs, *run).map(|s| s.measure(text)))
                    .sum();
                let space_width = pending_space
                    .and_then(|run| run_style(runs, run))
                    .map(|s| s.measure(" "))
                    .unwrap_or(0.0);

                if !current.is_empty() && current.width + space_width + word_width > max_width {
                    lines.push(std::mem::take(&mut current));
                    pending_space = None;
                }
                if let Some(run) = pending_space.take() {
                    if let Some(style) = run_style(runs, run) {
                        current.push(run, style, " ");
                    }
                }

                if current.is_empty() && word_width > max_width {
                    split_oversized(runs, &pieces, max_width, &mut current, &mut lines);
                } else {
                    for (run, text) in &pieces {
                        if let Some(style) = run_style(runs, *run) {
                            current.push(*run, style, text);
                        }
                    }
                }
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Places a word wider than the line character by character.
fn split_oversized(
    runs: &[Run],
    pieces: &[(usize, &str)],
    max_width: f32,
    current: &mut Line,
    lines: &mut Vec<Line>,
) {
    let mut buf = [0u8; 4];
    for (run, text) in pieces {
        let Some(style) = run_style(runs, *run) else {
            continue;
        };
        for c in text.chars() {
            let s = c.encode_utf8(&mut buf);
            if !current.is_empty() && current.width + style.measure(s) > max_width {
                lines.push(std::mem::take(current));
            }
            current.push(*run, style, s);
        }
    }
}

/// Lays out preformatted text: one line per source line, spaces preserved,
/// lines wider than `max_width` wrapped by character.
pub fn break_preformatted(text: &str, style: &RunStyle, max_width: f32) -> Vec<Line> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut lines = Vec::new();
    let mut buf = [0u8; 4];

    for source_line in text.split('\n') {
        let expanded = source_line.trim_end_matches('\r').replace('\t', "    ");
        let mut line = Line::default();
        for c in expanded.chars() {
            let s = c.encode_utf8(&mut buf);
            if !line.is_empty() && line.width + style.measure(s) > max_width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(0, style, s);
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::FontFamily;

    fn style() -> RunStyle {
        RunStyle {
            face: FontFace::regular(FontFamily::Helvetica),
            size: 10.0,
            color: Rgb::BLACK,
            underline: false,
            link: None,
            line_height: 15.0,
        }
    }

    fn text(t: &str) -> Run {
        Run::Text {
            text: t.to_string(),
            style: style(),
        }
    }

    fn bold(t: &str) -> Run {
        let mut s = style();
        s.face.bold = true;
        Run::Text {
            text: t.to_string(),
            style: s,
        }
    }

    #[test]
    fn test_short_text_is_one_line() {
        let lines = break_lines(&[text("Rust systems engineer")], 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Rust systems engineer");
    }

    #[test]
    fn test_whitespace_collapses() {
        let lines = break_lines(&[text("  Rust \n\t engineer  ")], 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Rust engineer");
    }

    #[test]
    fn test_wraps_at_width_without_overflow() {
        let bullet = "Architected a distributed caching layer using Redis and consistent hashing, \
                      reducing p99 latency by 40% under 50k RPS peak load";
        let max = 150.0;
        let lines = break_lines(&[text(bullet)], max);
        assert!(lines.len() > 2, "expected wrapping, got {}", lines.len());
        for line in &lines {
            assert!(line.width <= max + 1e-3, "line too wide: {}", line.width);
            assert!(!line.text().starts_with(' ') && !line.text().ends_with(' '));
        }
        let rejoined: Vec<String> = lines.iter().map(Line::text).collect();
        assert_eq!(rejoined.join(" "), bullet.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_word_spanning_runs_stays_together() {
        // "Role," is one word: bold "Role" + regular ",".
        let runs = [bold("Role"), text(", City")];
        let mut bold_style = style();
        bold_style.face.bold = true;
        let word_width = bold_style.measure("Role") + style().measure(",");
        let lines = break_lines(&runs, word_width + 2.0);
        assert_eq!(lines[0].text(), "Role,");
        assert_eq!(lines[0].fragments.len(), 2);
        assert!(lines[0].fragments[0].style.face.bold);
        assert_eq!(lines[1].text(), "City");
    }

    #[test]
    fn test_fragments_carry_offsets() {
        let lines = break_lines(&[bold("Sample Role"), text(" | Sample City")], 500.0);
        let frags = &lines[0].fragments;
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].x, 0.0);
        assert!((frags[1].x - frags[0].width).abs() < 1e-4);
        assert_eq!(frags[1].text, " | Sample City");
    }

    #[test]
    fn test_hard_break_forces_new_line() {
        let lines = break_lines(&[text("one"), Run::Break, text("two")], 500.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text(), "two");
    }

    #[test]
    fn test_oversized_word_is_split() {
        let url = "https://example.com/a/very/long/path/that/cannot/fit";
        let lines = break_lines(&[text(url)], 60.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width <= 60.0 + 1e-3));
        assert_eq!(lines.iter().map(Line::text).collect::<String>(), url);
    }

    #[test]
    fn test_line_height_uses_tallest_run() {
        let mut big = style();
        big.line_height = 30.0;
        let runs = [
            text("small "),
            Run::Text {
                text: "BIG".into(),
                style: big,
            },
        ];
        let lines = break_lines(&runs, 500.0);
        assert_eq!(lines[0].height(15.0), 30.0);
        assert_eq!(Line::default().height(15.0), 15.0);
    }

    #[test]
    fn test_preformatted_keeps_spaces_and_lines() {
        let mut mono = style();
        mono.face = FontFace::regular(FontFamily::Courier);
        let lines = break_preformatted("fn main() {\n    run();\n}\n", &mono, 500.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text(), "    run();");
    }

    #[test]
    fn test_preformatted_wraps_long_lines() {
        let mut mono = style();
        mono.face = FontFace::regular(FontFamily::Courier);
        // 6pt per char at 10pt Courier: 20 chars = 120pt.
        let lines = break_preformatted(&"x".repeat(20), &mono, 63.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text().len(), 10);
    }

    #[test]
    fn test_baseline_sits_inside_line_box() {
        let s = style();
        let offset = s.baseline_offset(15.0);
        assert!(offset > 7.18 && offset < 15.0, "got {offset}");
    }
}
