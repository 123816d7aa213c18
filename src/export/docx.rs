//! Word-processor encoder for proposal blocks, via `docx-rs`.

use std::io::Cursor;

use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, Paragraph, Run, Table, TableCell, TableRow,
    WidthType,
};

use super::template::{BRAND_COLOR, Block, Emphasis, score_color};
use crate::assessment::Assessment;
use crate::error::ExportError;

// Sizes are half-points; spacing is twentieths of a point.
const BODY_SIZE: usize = 22;
const COLUMN_WIDTHS: [usize; 3] = [3600, 1800, 3600];

/// Encode proposal blocks into `.docx` bytes.
pub fn encode(blocks: &[Block]) -> Result<Vec<u8>, ExportError> {
    let mut doc = Docx::new();
    for block in blocks {
        doc = match block {
            Block::AssessmentTable(assessments) => doc.add_table(assessment_table(assessments)),
            Block::Phase { title, activities } => {
                let bullets: Vec<String> = activities.iter().map(|a| format!("• {a}")).collect();
                doc.add_paragraph(spaced(
                    Paragraph::new().add_run(Run::new().add_text(title).bold().size(BODY_SIZE)),
                    0,
                    100,
                ))
                .add_paragraph(spaced(
                    Paragraph::new().add_run(multiline_run(&bullets, 20)),
                    0,
                    200,
                ))
            }
            Block::Numbered(steps) => {
                let numbered: Vec<String> = steps
                    .iter()
                    .enumerate()
                    .map(|(i, s)| format!("{}. {s}", i + 1))
                    .collect();
                doc.add_paragraph(spaced(
                    Paragraph::new().add_run(multiline_run(&numbered, BODY_SIZE)),
                    0,
                    300,
                ))
            }
            other => doc.add_paragraph(paragraph(other)),
        };
    }

    let mut buffer = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut buffer)
        .map_err(|e| ExportError::Encoding {
            format: "docx",
            reason: e.to_string(),
        })?;
    Ok(buffer.into_inner())
}

fn spaced(paragraph: Paragraph, before: u32, after: u32) -> Paragraph {
    paragraph.line_spacing(LineSpacing::new().before(before).after(after))
}

fn multiline_run(lines: &[String], size: usize) -> Run {
    let mut run = Run::new().size(size);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    run
}

fn paragraph(block: &Block) -> Paragraph {
    match block {
        Block::Title(text) => spaced(
            Paragraph::new()
                .add_run(Run::new().add_text(text).bold().size(32).color(BRAND_COLOR))
                .align(AlignmentType::Center),
            0,
            400,
        ),
        Block::Centered { text, emphasis } => {
            let (run, after) = match emphasis {
                Emphasis::Strong => (Run::new().add_text(text).bold().size(24), 200),
                Emphasis::Plain => (Run::new().add_text(text).size(20), 200),
                Emphasis::Muted => (Run::new().add_text(text).italic().size(16), 800),
            };
            spaced(
                Paragraph::new().add_run(run).align(AlignmentType::Center),
                0,
                after,
            )
        }
        Block::Heading(text) => spaced(
            Paragraph::new().add_run(Run::new().add_text(text).bold().size(24).color(BRAND_COLOR)),
            400,
            200,
        ),
        Block::Paragraph(text) => spaced(
            Paragraph::new().add_run(Run::new().add_text(text).size(BODY_SIZE)),
            0,
            300,
        ),
        Block::Field { label, value } => spaced(
            Paragraph::new()
                .add_run(Run::new().add_text(label).bold().size(BODY_SIZE))
                .add_run(Run::new().add_text(value).size(BODY_SIZE)),
            0,
            100,
        ),
        Block::Lines(lines) => spaced(
            Paragraph::new().add_run(multiline_run(lines, BODY_SIZE)),
            0,
            300,
        ),
        // Tables, phases, and lists are expanded by `encode`.
        Block::AssessmentTable(_) | Block::Phase { .. } | Block::Numbered(_) => Paragraph::new(),
    }
}

fn cell(paragraphs: Vec<Paragraph>, width: usize) -> TableCell {
    paragraphs
        .into_iter()
        .fold(TableCell::new(), |cell, p| cell.add_paragraph(p))
        .width(width, WidthType::Dxa)
}

fn header_cell(text: &str, width: usize) -> TableCell {
    cell(
        vec![Paragraph::new().add_run(Run::new().add_text(text).bold())],
        width,
    )
}

fn assessment_table(assessments: &[Assessment]) -> Table {
    let [category_w, score_w, insights_w] = COLUMN_WIDTHS;
    let mut rows = vec![TableRow::new(vec![
        header_cell("Assessment Category", category_w),
        header_cell("Score", score_w),
        header_cell("Key Insights", insights_w),
    ])];

    rows.extend(assessments.iter().map(|a| {
        let insights: Vec<Paragraph> = if a.insights.is_empty() {
            vec![Paragraph::new()]
        } else {
            a.insights
                .iter()
                .map(|i| spaced(Paragraph::new().add_run(Run::new().add_text(format!("• {i}"))), 0, 100))
                .collect()
        };
        TableRow::new(vec![
            cell(
                vec![Paragraph::new().add_run(Run::new().add_text(&a.category))],
                category_w,
            ),
            cell(
                vec![Paragraph::new().add_run(
                    Run::new()
                        .add_text(format!("{}/100", a.score))
                        .color(score_color(a.score)),
                )],
                score_w,
            ),
            cell(insights, insights_w),
        ])
    }));

    Table::new(rows).set_grid(COLUMN_WIDTHS.to_vec())
}
