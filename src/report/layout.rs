//! Paginated report layout.
//!
//! The engine walks the evaluation in a fixed section order, measures every
//! block before placing it, and starts a new page whenever the next block
//! would cross the bottom margin. Blocks are never split. Once all content is
//! placed, a second pass stamps a footer on every page, since the total page
//! count is only known then.
//!
//! All coordinates are millimetres from the top-left corner of an A4 page.

use crate::error::{LayoutError, ReportError};
use crate::models::{EvaluationRecord, ScoreEntry};
use crate::report::measure::{block_height, measure, wrap_text, Measured, TextStyle};
use chrono::{NaiveDate, Utc};
use tracing::debug;

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 20.0;
pub const TOP_MARGIN: f64 = 20.0;
pub const BOTTOM_MARGIN: f64 = 25.0;
/// Footer baseline distance from the bottom edge.
pub const FOOTER_OFFSET: f64 = 10.0;
pub const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;

pub const BANNER_HEIGHT: f64 = 35.0;
const BANNER_GAP: f64 = 8.0;
pub const SCORE_BAR_HEIGHT: f64 = 16.0;
const SCORE_BAR_GAP: f64 = 6.0;
pub const SECTION_BAR_HEIGHT: f64 = 8.0;
const SECTION_GAP: f64 = 4.0;
pub const TABLE_HEADER_HEIGHT: f64 = 8.0;
const TABLE_HEADER_GAP: f64 = 1.0;
const TABLE_HEADER_BLOCK: f64 = TABLE_HEADER_HEIGHT + TABLE_HEADER_GAP;
const IDENTIFICATION_PADDING: f64 = 4.0;
const PARAGRAPH_PADDING: f64 = 5.0;
const MIN_ROW_HEIGHT: f64 = 10.0;
const ROW_PADDING: f64 = 5.0;
const LIST_ITEM_PADDING: f64 = 3.0;

pub const CATEGORY_COLUMN: f64 = 60.0;
pub const SCORE_COLUMN: f64 = 25.0;
pub const COMMENTS_COLUMN: f64 = CONTENT_WIDTH - CATEGORY_COLUMN - SCORE_COLUMN;
pub const CELL_PADDING: f64 = 5.0;
pub const LIST_INDENT: f64 = 10.0;

pub const TITLE_STYLE: TextStyle = TextStyle::bold(24.0);
pub const IDENTIFICATION_STYLE: TextStyle = TextStyle::bold(12.0);
pub const SCORE_STYLE: TextStyle = TextStyle::bold(16.0);
pub const SECTION_STYLE: TextStyle = TextStyle::bold(12.0);
pub const BODY_STYLE: TextStyle = TextStyle::regular(11.0);
pub const BODY_BOLD_STYLE: TextStyle = TextStyle::bold(11.0);
pub const FOOTER_STYLE: TextStyle = TextStyle::regular(8.0);

/// Fixed tag prefixed to exported file names.
pub const REPORT_FILE_TAG: &str = "PreGrant_Evaluation";

pub const TABLE_COLUMNS: [&str; 3] = ["Category", "Score", "Assessment"];

/// Which of the three title-like blocks a `Title` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleRole {
    /// Full-bleed header banner at the top of the first page.
    Banner,
    /// Project and grant names.
    Identification,
    /// Overall score bar.
    ScoreBanner,
}

/// Content of one laid-out block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Title {
        role: TitleRole,
        lines: Vec<String>,
        style: TextStyle,
    },
    SectionHeader {
        text: String,
    },
    Paragraph {
        lines: Vec<String>,
        style: TextStyle,
    },
    TableHeaderRow {
        columns: [&'static str; 3],
    },
    TableDataRow {
        index: usize,
        criteria: Vec<String>,
        score: String,
        comments: Vec<String>,
        /// Background tint, alternating by row parity.
        striped: bool,
    },
    ListItem {
        number: usize,
        lines: Vec<String>,
    },
    Footer {
        left: String,
        right: String,
    },
}

/// A block placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

impl Block {
    /// Bottom edge of the block.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// One page of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub blocks: Vec<Block>,
    cursor: f64,
}

impl Page {
    fn new(number: usize) -> Self {
        Self {
            number,
            blocks: Vec::new(),
            cursor: TOP_MARGIN,
        }
    }

    fn is_fresh(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The footer stamped on this page, if the footer pass has run.
    pub fn footer(&self) -> Option<(&str, &str)> {
        self.blocks.iter().find_map(|b| match &b.kind {
            BlockKind::Footer { left, right } => Some((left.as_str(), right.as_str())),
            _ => None,
        })
    }
}

/// A fully laid-out report.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub pages: Vec<Page>,
    pub filename: String,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Suggested export file name.
    pub fn suggested_filename(&self) -> &str {
        &self.filename
    }

    /// Iterate over every placed block, in page order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }
}

/// Options for one render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub title: String,
    /// Date printed in every footer.
    pub generated_on: NaiveDate,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "PreGrant Evaluation Report".to_string(),
            generated_on: Utc::now().date_naive(),
        }
    }
}

/// `PreGrant_Evaluation_<lower-cased name, non [a-z0-9] as '_'>.pdf`
pub fn suggested_filename(project_name: &str) -> String {
    let sanitized: String = project_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect();
    format!("{REPORT_FILE_TAG}_{sanitized}.pdf")
}

/// Flow state for one render pass: the finished pages plus the page being
/// filled. A page break moves the current page to `pages` and resets the
/// cursor to the top margin of a new one.
struct PageFlow {
    pages: Vec<Page>,
    current: Page,
}

impl PageFlow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::new(1),
        }
    }

    fn limit() -> f64 {
        PAGE_HEIGHT - BOTTOM_MARGIN
    }

    /// Usable height of a page without the banner.
    fn printable_height() -> f64 {
        Self::limit() - TOP_MARGIN
    }

    /// Whether a block of `height` (plus `keep_with` of following content)
    /// would overflow the current page. A fresh page always accepts.
    fn needs_break(&self, height: f64, keep_with: f64) -> bool {
        !self.current.is_fresh() && self.current.cursor + height + keep_with > Self::limit()
    }

    fn break_page(&mut self) {
        let next = Page::new(self.current.number + 1);
        let finished = std::mem::replace(&mut self.current, next);
        debug!(
            page = finished.number,
            blocks = finished.blocks.len(),
            "Page break"
        );
        self.pages.push(finished);
    }

    /// Place a block at the cursor, breaking first if it would overflow.
    fn place(
        &mut self,
        kind: BlockKind,
        x: f64,
        width: f64,
        height: f64,
        line_count: usize,
        keep_with: f64,
    ) -> Result<(), LayoutError> {
        if !height.is_finite() || height < 0.0 {
            return Err(LayoutError::NonFiniteMeasurement(kind_name(&kind)));
        }

        if self.needs_break(height, keep_with) {
            self.break_page();
        }

        let block = Block {
            kind,
            x,
            y: self.current.cursor,
            width,
            height,
            line_count,
        };
        self.current.cursor = block.bottom();
        self.current.blocks.push(block);
        Ok(())
    }

    /// Place a full-bleed block at the very top of the current page.
    fn place_banner(&mut self, kind: BlockKind, height: f64, gap: f64, line_count: usize) {
        self.current.blocks.push(Block {
            kind,
            x: 0.0,
            y: 0.0,
            width: PAGE_WIDTH,
            height,
            line_count,
        });
        self.current.cursor = self.current.cursor.max(height + gap);
    }

    fn finish(mut self) -> Result<Vec<Page>, LayoutError> {
        self.pages.push(self.current);

        for page in &self.pages {
            if !page.cursor.is_finite() || page.cursor < 0.0 {
                return Err(LayoutError::Cursor {
                    page: page.number,
                    cursor: page.cursor,
                });
            }
        }
        Ok(self.pages)
    }
}

fn kind_name(kind: &BlockKind) -> &'static str {
    match kind {
        BlockKind::Title { .. } => "title",
        BlockKind::SectionHeader { .. } => "section header",
        BlockKind::Paragraph { .. } => "paragraph",
        BlockKind::TableHeaderRow { .. } => "table header row",
        BlockKind::TableDataRow { .. } => "table row",
        BlockKind::ListItem { .. } => "list item",
        BlockKind::Footer { .. } => "footer",
    }
}

/// The report layout engine. Holds no state between renders.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    options: RenderOptions,
}

impl LayoutEngine {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Lay out an evaluation into pages.
    ///
    /// The record is validated first; an invalid record never allocates a
    /// page. Any layout fault aborts the whole render.
    pub fn render(&self, record: &EvaluationRecord) -> Result<Document, ReportError> {
        record.validate()?;

        let mut flow = PageFlow::new();

        self.layout_banner(&mut flow)?;
        layout_identification(&mut flow, record)?;
        layout_score_banner(&mut flow, record)?;

        let summary = paragraph(&record.summary)?;
        layout_section_header(&mut flow, "Executive Summary", summary.height)?;
        place_paragraph(&mut flow, summary)?;

        layout_score_table(&mut flow, &record.scores)?;

        layout_narrative(&mut flow, "Innovation Analysis", &record.innovation_analysis)?;
        layout_narrative(&mut flow, "Reviewer Feedback", &record.reviewer_feedback)?;
        layout_recommendations(&mut flow, &record.recommendations)?;

        layout_narrative(&mut flow, "Final Assessment", &record.final_assessment)?;

        let mut pages = flow.finish()?;
        self.stamp_footers(&mut pages);

        debug!(
            pages = pages.len(),
            project = %record.project_name,
            "Report laid out"
        );

        Ok(Document {
            title: self.options.title.clone(),
            pages,
            filename: suggested_filename(&record.project_name),
        })
    }

    fn layout_banner(&self, flow: &mut PageFlow) -> Result<(), LayoutError> {
        let lines = wrap_text(&self.options.title, TITLE_STYLE, CONTENT_WIDTH)?;
        let line_count = lines.len();
        let height = BANNER_HEIGHT.max(block_height(line_count, TITLE_STYLE, 2.0 * CELL_PADDING));
        flow.place_banner(
            BlockKind::Title {
                role: TitleRole::Banner,
                lines,
                style: TITLE_STYLE,
            },
            height,
            BANNER_GAP,
            line_count,
        );
        Ok(())
    }

    /// Second pass: stamp page numbers once the page count is known.
    fn stamp_footers(&self, pages: &mut [Page]) {
        let total = pages.len();
        let date = self.options.generated_on.format("%B %-d, %Y").to_string();

        for page in pages.iter_mut() {
            page.blocks.push(Block {
                kind: BlockKind::Footer {
                    left: format!("{} - Page {} of {}", self.options.title, page.number, total),
                    right: date.clone(),
                },
                x: MARGIN,
                y: PAGE_HEIGHT - FOOTER_OFFSET,
                width: CONTENT_WIDTH,
                height: FOOTER_STYLE.line_height(),
                line_count: 1,
            });
        }
    }
}

fn layout_identification(flow: &mut PageFlow, record: &EvaluationRecord) -> Result<(), LayoutError> {
    let mut lines = wrap_text(
        &format!("Project: {}", record.project_name),
        IDENTIFICATION_STYLE,
        CONTENT_WIDTH,
    )?;
    lines.extend(wrap_text(
        &format!("Grant: {}", record.grant_name),
        IDENTIFICATION_STYLE,
        CONTENT_WIDTH,
    )?);

    let line_count = lines.len();
    let height = block_height(line_count, IDENTIFICATION_STYLE, IDENTIFICATION_PADDING);
    flow.place(
        BlockKind::Title {
            role: TitleRole::Identification,
            lines,
            style: IDENTIFICATION_STYLE,
        },
        MARGIN,
        CONTENT_WIDTH,
        height,
        line_count,
        0.0,
    )
}

fn layout_score_banner(flow: &mut PageFlow, record: &EvaluationRecord) -> Result<(), LayoutError> {
    let measured = measure(
        &format!("Overall Score: {}", record.display_total()),
        SCORE_STYLE,
        CONTENT_WIDTH - 2.0 * CELL_PADDING,
        SCORE_BAR_GAP,
    )?;
    let line_count = measured.line_count();
    let height = measured.height.max(SCORE_BAR_HEIGHT + SCORE_BAR_GAP);
    flow.place(
        BlockKind::Title {
            role: TitleRole::ScoreBanner,
            lines: measured.lines,
            style: SCORE_STYLE,
        },
        MARGIN,
        CONTENT_WIDTH,
        height,
        line_count,
        0.0,
    )
}

/// Space a header reserves so the block after it lands on the same page.
/// A block too tall to share a page with the header reserves one body line.
fn keep_with(own_height: f64, next_height: f64) -> f64 {
    if next_height <= PageFlow::printable_height() - own_height {
        next_height
    } else {
        BODY_STYLE.line_height()
    }
}

fn layout_section_header(flow: &mut PageFlow, text: &str, next_height: f64) -> Result<(), LayoutError> {
    let height = SECTION_BAR_HEIGHT + SECTION_GAP;
    flow.place(
        BlockKind::SectionHeader {
            text: text.to_string(),
        },
        MARGIN,
        CONTENT_WIDTH,
        height,
        1,
        keep_with(height, next_height),
    )
}

fn paragraph(text: &str) -> Result<Measured, LayoutError> {
    measure(text.trim(), BODY_STYLE, CONTENT_WIDTH, PARAGRAPH_PADDING)
}

fn place_paragraph(flow: &mut PageFlow, measured: Measured) -> Result<(), LayoutError> {
    let line_count = measured.line_count();
    flow.place(
        BlockKind::Paragraph {
            lines: measured.lines,
            style: BODY_STYLE,
        },
        MARGIN,
        CONTENT_WIDTH,
        measured.height,
        line_count,
        0.0,
    )
}

/// Header plus paragraph, skipped entirely when the text is blank.
fn layout_narrative(flow: &mut PageFlow, title: &str, text: &str) -> Result<(), LayoutError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let measured = paragraph(text)?;
    layout_section_header(flow, title, measured.height)?;
    place_paragraph(flow, measured)
}

fn table_header_row(flow: &mut PageFlow, next_height: f64) -> Result<(), LayoutError> {
    flow.place(
        BlockKind::TableHeaderRow {
            columns: TABLE_COLUMNS,
        },
        MARGIN,
        CONTENT_WIDTH,
        TABLE_HEADER_BLOCK,
        1,
        keep_with(TABLE_HEADER_BLOCK, next_height),
    )
}

struct MeasuredRow {
    criteria: Measured,
    comments: Measured,
    height: f64,
}

fn measure_rows(scores: &[ScoreEntry]) -> Result<Vec<MeasuredRow>, LayoutError> {
    scores
        .iter()
        .map(|entry| {
            let criteria = measure(
                &entry.criteria,
                BODY_BOLD_STYLE,
                CATEGORY_COLUMN - CELL_PADDING,
                ROW_PADDING,
            )?;
            let comments = measure(
                entry.comments.trim(),
                BODY_STYLE,
                COMMENTS_COLUMN - CELL_PADDING,
                ROW_PADDING,
            )?;
            let height = MIN_ROW_HEIGHT.max(comments.height).max(criteria.height);
            Ok(MeasuredRow {
                criteria,
                comments,
                height,
            })
        })
        .collect()
}

/// Section header plus one row per score, in input order. The header row
/// is repeated on every page the table continues onto, unless the row
/// opening that page is too tall to share it.
fn layout_score_table(flow: &mut PageFlow, scores: &[ScoreEntry]) -> Result<(), LayoutError> {
    let rows = measure_rows(scores)?;
    let first_row = rows.first().map_or(0.0, |row| row.height);

    layout_section_header(flow, "Category Score Breakdown", TABLE_HEADER_BLOCK + first_row)?;
    table_header_row(flow, first_row)?;

    for (index, (entry, row)) in scores.iter().zip(rows).enumerate() {
        if flow.needs_break(row.height, 0.0) {
            flow.break_page();
            if TABLE_HEADER_BLOCK + row.height <= PageFlow::printable_height() {
                table_header_row(flow, row.height)?;
            }
        }

        let line_count = row.criteria.line_count().max(row.comments.line_count());
        flow.place(
            BlockKind::TableDataRow {
                index,
                criteria: row.criteria.lines,
                score: entry.display_score(),
                comments: row.comments.lines,
                striped: index % 2 == 0,
            },
            MARGIN,
            CONTENT_WIDTH,
            row.height,
            line_count,
            0.0,
        )?;
    }

    Ok(())
}

/// Section header plus a 1-based numbered list; each item is checked for
/// overflow on its own.
fn layout_recommendations(flow: &mut PageFlow, recommendations: &[String]) -> Result<(), LayoutError> {
    let items = recommendations
        .iter()
        .map(|item| measure(item.trim(), BODY_STYLE, CONTENT_WIDTH - LIST_INDENT, LIST_ITEM_PADDING))
        .collect::<Result<Vec<_>, _>>()?;
    let Some(first) = items.first() else {
        return Ok(());
    };

    layout_section_header(flow, "Key Recommendations", first.height)?;

    for (i, measured) in items.into_iter().enumerate() {
        let line_count = measured.line_count();
        flow.place(
            BlockKind::ListItem {
                number: i + 1,
                lines: measured.lines,
            },
            MARGIN,
            CONTENT_WIDTH,
            measured.height,
            line_count,
            0.0,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::tests::sample_record;
    use pretty_assertions::assert_eq;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(RenderOptions {
            title: "PreGrant Evaluation Report".to_string(),
            generated_on: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
        })
    }

    fn section_headers(doc: &Document) -> Vec<String> {
        doc.blocks()
            .filter_map(|b| match &b.kind {
                BlockKind::SectionHeader { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn content_blocks(page: &Page) -> impl Iterator<Item = &Block> {
        page.blocks
            .iter()
            .filter(|b| !matches!(b.kind, BlockKind::Footer { .. }))
    }

    #[test]
    fn test_short_report_fits_one_page() {
        let doc = engine().render(&sample_record()).unwrap();

        assert_eq!(doc.page_count(), 1);
        let (left, right) = doc.pages[0].footer().unwrap();
        assert!(left.to_lowercase().contains("page 1 of 1"));
        assert_eq!(right, "October 14, 2026");
    }

    #[test]
    fn test_section_order_is_fixed() {
        let doc = engine().render(&sample_record()).unwrap();

        assert_eq!(
            section_headers(&doc),
            vec![
                "Executive Summary",
                "Category Score Breakdown",
                "Innovation Analysis",
                "Reviewer Feedback",
                "Key Recommendations",
                "Final Assessment",
            ]
        );

        let roles: Vec<_> = doc
            .blocks()
            .filter_map(|b| match &b.kind {
                BlockKind::Title { role, .. } => Some(*role),
                _ => None,
            })
            .collect();
        assert_eq!(
            roles,
            vec![TitleRole::Banner, TitleRole::Identification, TitleRole::ScoreBanner]
        );

        let last = doc.pages[0].blocks.last().unwrap();
        assert!(matches!(last.kind, BlockKind::Footer { .. }));
    }

    #[test]
    fn test_oversized_feedback_forces_second_page() {
        let mut record = sample_record();
        record.reviewer_feedback = vec!["Reviewer note on the work plan."; 60].join("\n");
        record.recommendations.clear();
        record.final_assessment.clear();

        let doc = engine().render(&record).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(doc.pages[0].footer().unwrap().0.to_lowercase().contains("page 1 of 2"));
        assert!(doc.pages[1].footer().unwrap().0.to_lowercase().contains("page 2 of 2"));

        // The feedback paragraph opens page 2, whole and untruncated.
        let first = content_blocks(&doc.pages[1]).next().unwrap();
        assert_eq!(first.y, TOP_MARGIN);
        assert_eq!(first.line_count, 60);
        assert!(first.height > PAGE_HEIGHT - BOTTOM_MARGIN - TOP_MARGIN);
        match &first.kind {
            BlockKind::Paragraph { lines, .. } => assert_eq!(lines.len(), 60),
            other => panic!("expected paragraph, got {other:?}"),
        }

        // Its header stayed on page 1.
        let last_on_first = content_blocks(&doc.pages[0]).last().unwrap();
        assert_eq!(
            last_on_first.kind,
            BlockKind::SectionHeader {
                text: "Reviewer Feedback".to_string()
            }
        );
    }

    #[test]
    fn test_content_after_oversized_block_starts_new_page() {
        let mut record = sample_record();
        record.reviewer_feedback = vec!["Reviewer note."; 60].join("\n");

        let doc = engine().render(&record).unwrap();

        assert_eq!(doc.page_count(), 3);
        let first_on_third = content_blocks(&doc.pages[2]).next().unwrap();
        assert_eq!(first_on_third.y, TOP_MARGIN);
    }

    #[test]
    fn test_blocks_stay_within_printable_area() {
        let mut record = sample_record();
        record.scores = (0..30)
            .map(|i| ScoreEntry {
                criteria: format!("Criterion {i}"),
                score: (i % 11) as f64,
                comments: "Adequate but could be more specific about milestones and owners.".repeat(1 + i % 3),
            })
            .collect();
        record.recommendations = (1..=25).map(|i| format!("Recommendation number {i}.")).collect();

        let doc = engine().render(&record).unwrap();
        assert!(doc.page_count() > 1);

        for page in &doc.pages {
            for block in content_blocks(page) {
                assert!(
                    block.bottom() <= PAGE_HEIGHT - BOTTOM_MARGIN + 1e-9,
                    "block on page {} overflows: {:?}",
                    page.number,
                    block.kind
                );
            }
        }
    }

    #[test]
    fn test_table_rows_keep_order_and_stripe_by_parity() {
        let mut record = sample_record();
        record.scores = (0..30)
            .map(|i| ScoreEntry {
                criteria: format!("Criterion {i}"),
                score: 5.0,
                comments: "Fine.".to_string(),
            })
            .collect();

        let doc = engine().render(&record).unwrap();

        let rows: Vec<(usize, bool)> = doc
            .blocks()
            .filter_map(|b| match &b.kind {
                BlockKind::TableDataRow { index, striped, .. } => Some((*index, *striped)),
                _ => None,
            })
            .collect();
        assert_eq!(rows.len(), 30);
        for (position, (index, striped)) in rows.iter().enumerate() {
            assert_eq!(*index, position);
            assert_eq!(*striped, position % 2 == 0);
        }

        // The table continues onto page 2 under a repeated header row.
        assert!(doc.page_count() >= 2);
        let first_on_second = content_blocks(&doc.pages[1]).next().unwrap();
        assert!(matches!(first_on_second.kind, BlockKind::TableHeaderRow { .. }));
    }

    fn assert_no_stranded_headers(doc: &Document) {
        for page in &doc.pages {
            if let Some(last) = content_blocks(page).last() {
                assert!(
                    !matches!(
                        last.kind,
                        BlockKind::SectionHeader { .. } | BlockKind::TableHeaderRow { .. }
                    ),
                    "page {} ends with {:?}",
                    page.number,
                    last.kind
                );
            }
        }
    }

    #[test]
    fn test_row_taller_than_a_page_skips_repeated_header() {
        let mut record = sample_record();
        record.scores[0].comments = vec!["Risk."; 70].join("\n");

        let doc = engine().render(&record).unwrap();

        // The tall row opens its own page with no header row above it.
        let (page, first) = doc
            .pages
            .iter()
            .find_map(|page| {
                let first = content_blocks(page).next()?;
                matches!(first.kind, BlockKind::TableDataRow { index: 0, .. }).then_some((page, first))
            })
            .unwrap();
        assert_eq!(first.y, TOP_MARGIN);
        assert!(first.height > PAGE_HEIGHT - BOTTOM_MARGIN - TOP_MARGIN);
        assert_eq!(content_blocks(page).count(), 1);

        for page in &doc.pages {
            let blocks: Vec<_> = content_blocks(page).collect();
            assert!(!blocks
                .iter()
                .all(|b| matches!(b.kind, BlockKind::TableHeaderRow { .. })));

            if page.number > 1 {
                for pair in blocks.windows(2) {
                    if matches!(pair[0].kind, BlockKind::TableHeaderRow { .. }) {
                        assert!(matches!(pair[1].kind, BlockKind::TableDataRow { .. }));
                    }
                }
            }
        }

        // The rest of the table continues under a repeated header row.
        let next = &doc.pages[page.number];
        let kinds: Vec<_> = content_blocks(next).take(2).map(|b| &b.kind).collect();
        assert!(matches!(kinds[0], BlockKind::TableHeaderRow { .. }));
        assert!(matches!(kinds[1], BlockKind::TableDataRow { index: 1, .. }));
    }

    #[test]
    fn test_header_moves_with_a_tall_paragraph() {
        let mut record = sample_record();
        record.summary = vec!["Summary line."; 44].join("\n");

        let doc = engine().render(&record).unwrap();

        let page = doc
            .pages
            .iter()
            .find(|page| {
                content_blocks(page).any(|b| {
                    b.kind
                        == BlockKind::SectionHeader {
                            text: "Executive Summary".to_string(),
                        }
                })
            })
            .unwrap();
        assert_eq!(page.number, 2);

        let blocks: Vec<_> = content_blocks(page).take(2).collect();
        assert_eq!(blocks[0].y, TOP_MARGIN);
        match &blocks[1].kind {
            BlockKind::Paragraph { lines, .. } => assert_eq!(lines.len(), 44),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_headers_never_end_a_page() {
        for summary_lines in 1..=50 {
            let mut record = sample_record();
            record.summary = vec!["Summary line."; summary_lines].join("\n");
            record.scores[0].comments = vec!["Milestone risk."; 6].join("\n");

            let doc = engine().render(&record).unwrap();
            assert_no_stranded_headers(&doc);
        }
    }

    #[test]
    fn test_row_height_uses_minimum_and_comments() {
        let mut record = sample_record();
        record.scores[0].comments = "Long commentary about delivery risk. ".repeat(10);

        let doc = engine().render(&record).unwrap();
        let heights: Vec<f64> = doc
            .blocks()
            .filter_map(|b| match &b.kind {
                BlockKind::TableDataRow { .. } => Some(b.height),
                _ => None,
            })
            .collect();

        assert!(heights[0] > MIN_ROW_HEIGHT);
        assert!(heights.iter().all(|h| *h >= MIN_ROW_HEIGHT));
    }

    #[test]
    fn test_score_and_total_formatting() {
        let doc = engine().render(&sample_record()).unwrap();

        let scores: Vec<String> = doc
            .blocks()
            .filter_map(|b| match &b.kind {
                BlockKind::TableDataRow { score, .. } => Some(score.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(scores, vec!["8/10", "7.5/10", "6/10", "9/10"]);

        let banner = doc
            .blocks()
            .find_map(|b| match &b.kind {
                BlockKind::Title {
                    role: TitleRole::ScoreBanner,
                    lines,
                    ..
                } => Some(lines.join(" ")),
                _ => None,
            })
            .unwrap();
        assert_eq!(banner, "Overall Score: 78%");
    }

    #[test]
    fn test_recommendations_are_numbered_in_order() {
        let doc = engine().render(&sample_record()).unwrap();
        let items: Vec<(usize, String)> = doc
            .blocks()
            .filter_map(|b| match &b.kind {
                BlockKind::ListItem { number, lines } => Some((*number, lines.join(" "))),
                _ => None,
            })
            .collect();

        assert_eq!(
            items,
            vec![
                (1, "Add a maintenance plan.".to_string()),
                (2, "Name the pilot schools.".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_optional_sections_are_omitted() {
        let mut record = sample_record();
        record.innovation_analysis.clear();
        record.recommendations.clear();

        let doc = engine().render(&record).unwrap();
        assert_eq!(
            section_headers(&doc),
            vec![
                "Executive Summary",
                "Category Score Breakdown",
                "Reviewer Feedback",
                "Final Assessment",
            ]
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut record = sample_record();
        record.summary = "A long and winding summary of the proposal. ".repeat(40);
        record.reviewer_feedback = "Feedback paragraph. ".repeat(120);

        let first = engine().render(&record).unwrap();
        let second = engine().render(&record).unwrap();

        assert_eq!(first.page_count(), second.page_count());
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_record_fails_before_layout() {
        let mut record = sample_record();
        record.scores.clear();
        assert_eq!(
            engine().render(&record),
            Err(ReportError::Validation(ValidationError::EmptyScores))
        );

        let mut record = sample_record();
        record.total_score = 101.0;
        assert!(matches!(
            engine().render(&record),
            Err(ReportError::Validation(ValidationError::TotalScoreOutOfRange(_)))
        ));
    }

    #[test]
    fn test_suggested_filename() {
        assert_eq!(
            suggested_filename("Solar Schools 2.0!"),
            "PreGrant_Evaluation_solar_schools_2_0_.pdf"
        );
        assert_eq!(suggested_filename("ÉCOLE"), "PreGrant_Evaluation__cole.pdf");

        let doc = engine().render(&sample_record()).unwrap();
        assert_eq!(doc.suggested_filename(), "PreGrant_Evaluation_solar_schools.pdf");
    }
}
