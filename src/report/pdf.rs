//! PDF backend for laid-out documents.
//!
//! Emits an uncompressed PDF 1.4 file using the two standard Helvetica faces,
//! whose metrics `measure` wraps against. The backend makes no layout
//! decisions: every position comes from the `Document`.

use crate::report::layout::{
    Block, BlockKind, Document, Page, TitleRole, BODY_BOLD_STYLE, BODY_STYLE, CATEGORY_COLUMN,
    CELL_PADDING, CONTENT_WIDTH, FOOTER_STYLE, LIST_INDENT, MARGIN, PAGE_HEIGHT, PAGE_WIDTH,
    SCORE_BAR_HEIGHT, SCORE_COLUMN, SECTION_BAR_HEIGHT, SECTION_STYLE, TABLE_HEADER_HEIGHT,
};
use crate::report::measure::{text_width, Font, TextStyle, PT_TO_MM};

/// Points per millimetre.
const MM_TO_PT: f64 = 72.0 / 25.4;

type Rgb = (f64, f64, f64);

const TEXT: Rgb = (0.067, 0.067, 0.067);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const HEADER_BG: Rgb = (0.059, 0.102, 0.137);
const SECTION_BG: Rgb = (0.0, 0.749, 0.647);
const TABLE_BG: Rgb = (0.973, 0.976, 0.98);
const MUTED: Rgb = (0.4, 0.4, 0.4);

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const REGULAR_FONT_ID: usize = 3;
const BOLD_FONT_ID: usize = 4;
const INFO_ID: usize = 5;
const FIRST_PAGE_ID: usize = 6;

/// Serialize a document to PDF bytes.
pub fn render_pdf(doc: &Document) -> Vec<u8> {
    let mut writer = PdfWriter::new();

    let page_ids: Vec<usize> = (0..doc.page_count())
        .map(|i| FIRST_PAGE_ID + 2 * i)
        .collect();

    writer.object(
        CATALOG_ID,
        &format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
    );

    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
    writer.object(
        PAGES_ID,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_ids.len()
        ),
    );

    writer.object(REGULAR_FONT_ID, &font_dictionary(Font::Regular));
    writer.object(BOLD_FONT_ID, &font_dictionary(Font::Bold));
    writer.object(
        INFO_ID,
        &format!(
            "<< /Title ({}) /Producer (pregrant {}) >>",
            escape_text(&doc.title),
            env!("CARGO_PKG_VERSION")
        ),
    );

    for (page, page_id) in doc.pages.iter().zip(&page_ids) {
        let content_id = page_id + 1;
        writer.object(
            *page_id,
            &format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {REGULAR_FONT_ID} 0 R /F2 {BOLD_FONT_ID} 0 R >> >> \
                 /Contents {content_id} 0 R >>",
                num(PAGE_WIDTH * MM_TO_PT),
                num(PAGE_HEIGHT * MM_TO_PT)
            ),
        );

        let stream = page_content(page);
        writer.object(
            content_id,
            &format!(
                "<< /Length {} >>\nstream\n{}endstream",
                stream.len(),
                stream
            ),
        );
    }

    writer.finish(CATALOG_ID, INFO_ID)
}

fn font_dictionary(font: Font) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.base_name()
    )
}

/// Accumulates objects and their byte offsets for the xref table.
struct PdfWriter {
    out: String,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        Self {
            out: String::from("%PDF-1.4\n"),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets.push((id, self.out.len()));
        self.out.push_str(&format!("{id} 0 obj\n{body}\nendobj\n"));
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let size = self.offsets.len() + 1;
        let xref_offset = self.out.len();

        self.out.push_str(&format!("xref\n0 {size}\n0000000000 65535 f \n"));
        for (_, offset) in &self.offsets {
            self.out.push_str(&format!("{offset:010} 00000 n \n"));
        }
        self.out.push_str(&format!(
            "trailer\n<< /Size {size} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        ));

        self.out.into_bytes()
    }
}

/// Content stream for one page.
fn page_content(page: &Page) -> String {
    let mut ops = String::new();
    for block in &page.blocks {
        draw_block(&mut ops, block);
    }
    ops
}

fn draw_block(ops: &mut String, block: &Block) {
    match &block.kind {
        BlockKind::Title {
            role: TitleRole::Banner,
            lines,
            style,
        } => {
            fill_rect(ops, block.x, block.y, block.width, block.height, HEADER_BG);
            let first = block.y + (block.height - lines.len() as f64 * style.line_height()) / 2.0;
            for (i, line) in lines.iter().enumerate() {
                let baseline = first + ascent(*style) + i as f64 * style.line_height();
                text_centered(ops, line, PAGE_WIDTH / 2.0, baseline, *style, WHITE);
            }
        }
        BlockKind::Title {
            role: TitleRole::Identification,
            lines,
            style,
        } => {
            draw_lines(ops, lines, block.x, block.y, *style, TEXT);
        }
        BlockKind::Title {
            role: TitleRole::ScoreBanner,
            lines,
            style,
        } => {
            fill_rect(ops, block.x, block.y, block.width, SCORE_BAR_HEIGHT, TABLE_BG);
            let first = block.y + (SCORE_BAR_HEIGHT - lines.len() as f64 * style.line_height()) / 2.0;
            for (i, line) in lines.iter().enumerate() {
                let baseline = first + ascent(*style) + i as f64 * style.line_height();
                text_centered(ops, line, block.x + block.width / 2.0, baseline, *style, TEXT);
            }
        }
        BlockKind::SectionHeader { text: title } => {
            fill_rect(ops, block.x, block.y, block.width, SECTION_BAR_HEIGHT, SECTION_BG);
            let baseline = block.y + (SECTION_BAR_HEIGHT + ascent(SECTION_STYLE)) / 2.0;
            text(ops, title, block.x + CELL_PADDING, baseline, SECTION_STYLE, WHITE);
        }
        BlockKind::Paragraph { lines, style } => {
            draw_lines(ops, lines, block.x, block.y, *style, TEXT);
        }
        BlockKind::TableHeaderRow { columns } => {
            fill_rect(ops, block.x, block.y, block.width, TABLE_HEADER_HEIGHT, TABLE_BG);
            let baseline = block.y + (TABLE_HEADER_HEIGHT + ascent(BODY_BOLD_STYLE)) / 2.0;
            text(ops, columns[0], block.x + CELL_PADDING, baseline, BODY_BOLD_STYLE, TEXT);
            text_centered(
                ops,
                columns[1],
                block.x + CATEGORY_COLUMN + SCORE_COLUMN / 2.0,
                baseline,
                BODY_BOLD_STYLE,
                TEXT,
            );
            text(
                ops,
                columns[2],
                block.x + CATEGORY_COLUMN + SCORE_COLUMN + CELL_PADDING,
                baseline,
                BODY_BOLD_STYLE,
                TEXT,
            );
        }
        BlockKind::TableDataRow {
            criteria,
            score,
            comments,
            striped,
            ..
        } => {
            if *striped {
                fill_rect(ops, block.x, block.y, block.width, block.height, TABLE_BG);
            }
            let top = block.y + CELL_PADDING / 2.0;
            draw_lines(ops, criteria, block.x + CELL_PADDING, top, BODY_BOLD_STYLE, TEXT);
            text_centered(
                ops,
                score,
                block.x + CATEGORY_COLUMN + SCORE_COLUMN / 2.0,
                top + ascent(BODY_BOLD_STYLE),
                BODY_BOLD_STYLE,
                TEXT,
            );
            draw_lines(
                ops,
                comments,
                block.x + CATEGORY_COLUMN + SCORE_COLUMN + CELL_PADDING,
                top,
                BODY_STYLE,
                TEXT,
            );
        }
        BlockKind::ListItem { number, lines } => {
            text(
                ops,
                &format!("{number}."),
                block.x + 2.0,
                block.y + ascent(BODY_BOLD_STYLE),
                BODY_BOLD_STYLE,
                TEXT,
            );
            draw_lines(ops, lines, block.x + LIST_INDENT, block.y, BODY_STYLE, TEXT);
        }
        BlockKind::Footer { left, right } => {
            text(ops, left, block.x, block.y, FOOTER_STYLE, MUTED);
            let right_x = MARGIN + CONTENT_WIDTH - text_width(right, FOOTER_STYLE);
            text(ops, right, right_x, block.y, FOOTER_STYLE, MUTED);
        }
    }
}

/// Distance from a line's top to its baseline.
fn ascent(style: TextStyle) -> f64 {
    style.size * PT_TO_MM * 0.8
}

fn draw_lines(ops: &mut String, lines: &[String], x: f64, top: f64, style: TextStyle, color: Rgb) {
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let baseline = top + ascent(style) + i as f64 * style.line_height();
        text(ops, line, x, baseline, style, color);
    }
}

fn fill_rect(ops: &mut String, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
    ops.push_str(&format!(
        "{} {} {} rg\n{} {} {} {} re f\n",
        num(color.0),
        num(color.1),
        num(color.2),
        num(x * MM_TO_PT),
        num((PAGE_HEIGHT - y - height) * MM_TO_PT),
        num(width * MM_TO_PT),
        num(height * MM_TO_PT)
    ));
}

fn text(ops: &mut String, content: &str, x: f64, baseline: f64, style: TextStyle, color: Rgb) {
    let font = match style.font {
        Font::Regular => "F1",
        Font::Bold => "F2",
    };
    ops.push_str(&format!(
        "BT\n/{} {} Tf\n{} {} {} rg\n{} {} Td\n({}) Tj\nET\n",
        font,
        num(style.size),
        num(color.0),
        num(color.1),
        num(color.2),
        num(x * MM_TO_PT),
        num((PAGE_HEIGHT - baseline) * MM_TO_PT),
        escape_text(content)
    ));
}

fn text_centered(ops: &mut String, content: &str, center: f64, baseline: f64, style: TextStyle, color: Rgb) {
    let x = center - text_width(content, style) / 2.0;
    text(ops, content, x, baseline, style, color);
}

/// Fixed two-decimal number formatting.
fn num(value: f64) -> String {
    format!("{value:.2}")
}

/// Escape a string for a PDF literal under WinAnsiEncoding.
///
/// Latin-1 characters are written as octal escapes; anything else the
/// standard fonts cannot show becomes `?`.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            ' '..='~' => escaped.push(c),
            '\t' | '\r' | '\n' => escaped.push(' '),
            '\u{a0}'..='\u{ff}' => escaped.push_str(&format!("\\{:03o}", c as u32)),
            _ => escaped.push('?'),
        }
    }
    escaped
}
