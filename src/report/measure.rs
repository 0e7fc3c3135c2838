//! Text measurement and word wrapping.
//!
//! Widths come from the published AFM metrics of the two standard PDF faces
//! the backend draws with, so the wrap computed here is the wrap printed.
//! Every function is pure: the same text, font, size and width always give
//! the same lines.

use crate::error::LayoutError;

/// Millimetres per typographic point.
pub const PT_TO_MM: f64 = 25.4 / 72.0;

/// Baseline-to-baseline distance as a multiple of the font size.
pub const LINE_SPACING: f64 = 1.15;

/// Advance width for characters missing from the metric tables (1/1000 em).
const FALLBACK_WIDTH: u16 = 556;

/// The two faces used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// PDF base font name.
    pub fn base_name(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of one character in 1/1000 em.
    pub fn char_width(&self, c: char) -> u16 {
        let code = c as u32;
        if (32..=126).contains(&code) {
            self.widths()[(code - 32) as usize]
        } else {
            FALLBACK_WIDTH
        }
    }
}

/// Font selection for a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    /// Size in points.
    pub size: f64,
}

impl TextStyle {
    pub const fn regular(size: f64) -> Self {
        Self {
            font: Font::Regular,
            size,
        }
    }

    pub const fn bold(size: f64) -> Self {
        Self {
            font: Font::Bold,
            size,
        }
    }

    /// Height of one wrapped line in millimetres.
    pub fn line_height(&self) -> f64 {
        self.size * PT_TO_MM * LINE_SPACING
    }
}

/// Result of measuring a block of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Measured {
    pub lines: Vec<String>,
    /// `lines × line height + padding`, in millimetres.
    pub height: f64,
}

impl Measured {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Width of `text` in millimetres.
pub fn text_width(text: &str, style: TextStyle) -> f64 {
    let units: u64 = text.chars().map(|c| u64::from(style.font.char_width(c))).sum();
    units as f64 / 1000.0 * style.size * PT_TO_MM
}

/// Greedy word wrap.
///
/// Explicit newlines start a new line; an empty paragraph still occupies a
/// line. A word wider than `max_width` is broken between characters.
pub fn wrap_text(text: &str, style: TextStyle, max_width: f64) -> Result<Vec<String>, LayoutError> {
    if !max_width.is_finite() || max_width <= 0.0 {
        return Err(LayoutError::InvalidWidth(max_width));
    }

    let fits = |candidate: &str| text_width(candidate, style) <= max_width;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut line = String::new();
        let mut produced = false;

        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if fits(&candidate) {
                line = candidate;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                produced = true;
            }
            if fits(word) {
                line = word.to_string();
                continue;
            }

            for c in word.chars() {
                let mut next = line.clone();
                next.push(c);
                if !line.is_empty() && !fits(&next) {
                    lines.push(std::mem::take(&mut line));
                    produced = true;
                    line.push(c);
                } else {
                    line = next;
                }
            }
        }

        if !line.is_empty() || !produced {
            lines.push(line);
        }
    }

    Ok(lines)
}

/// Wrap `text` and compute its block height.
pub fn measure(
    text: &str,
    style: TextStyle,
    max_width: f64,
    padding: f64,
) -> Result<Measured, LayoutError> {
    let lines = wrap_text(text, style, max_width)?;
    let height = block_height(lines.len(), style, padding);
    Ok(Measured { lines, height })
}

/// `lines × line height + padding`.
pub fn block_height(lines: usize, style: TextStyle, padding: f64) -> f64 {
    lines as f64 * style.line_height() + padding
}

/// Helvetica advance widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
