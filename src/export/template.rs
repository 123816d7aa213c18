//! Declarative proposal content shared by the document and slide encoders.
//!
//! The encoders only decide presentation; every piece of text in an exported
//! proposal comes from here.

use chrono::NaiveDate;

use super::model::ProposalData;
use crate::assessment::Assessment;

pub const BRAND_COLOR: &str = "2563eb";
pub const PROPOSAL_TITLE: &str = "MARKETING & PR STRATEGY PROPOSAL";
pub const CONSULTANT_NAME: &str = "AI Marketing & PR Consultant";
const CONSULTANT_EMAIL: &str = "consultant@yourcompany.com";
const CONSULTANT_PHONE: &str = "(555) 123-4567";
const RECOMMENDATIONS_PLACEHOLDER: &str =
    "Based on our analysis, detailed recommendations will be provided in the implementation phase.";

/// Hex colour for a score: green from 70, amber from 40, red below.
pub fn score_color(score: u8) -> &'static str {
    match score {
        70.. => "22c55e",
        40.. => "f59e0b",
        _ => "ef4444",
    }
}

/// Status label for a score, same bands as `score_color`.
pub fn score_status(score: u8) -> &'static str {
    match score {
        70.. => "Strong",
        40.. => "Moderate",
        _ => "Needs Attention",
    }
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

// ── Document ────────────────────────────────────────────────────────

/// How a centered title-page line is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Strong,
    Plain,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Centered { text: String, emphasis: Emphasis },
    Heading(String),
    Paragraph(String),
    Field { label: String, value: String },
    AssessmentTable(Vec<Assessment>),
    Phase { title: String, activities: Vec<String> },
    Numbered(Vec<String>),
    /// One paragraph, one line per entry; empty entries are blank lines.
    Lines(Vec<String>),
}

const PHASES: [(&str, [&str; 3]); 3] = [
    (
        "Phase 1 (Weeks 1-2): Strategy Refinement & Planning",
        [
            "Detailed market research and competitive analysis",
            "Brand positioning and messaging framework",
            "Target audience persona development",
        ],
    ),
    (
        "Phase 2 (Weeks 3-6): Content & Campaign Development",
        [
            "Content strategy and editorial calendar",
            "Marketing materials and collateral creation",
            "PR campaign planning and media outreach",
        ],
    ),
    (
        "Phase 3 (Weeks 7-12): Execution & Optimization",
        [
            "Campaign launch and monitoring",
            "Performance tracking and analytics",
            "Continuous optimization and refinement",
        ],
    ),
];

const NEXT_STEPS: [&str; 4] = [
    "Review and approve this proposal",
    "Schedule kick-off meeting to finalize strategy details",
    "Begin Phase 1 implementation",
    "Establish regular progress review meetings",
];

/// Content of the word-processor proposal, top to bottom.
pub fn proposal_document(data: &ProposalData, date: NaiveDate) -> Vec<Block> {
    let context = &data.business_context;
    let centered = |text: String, emphasis| Block::Centered { text, emphasis };
    let field = |label: &str, value: &str, fallback: &str| Block::Field {
        label: format!("{label}: "),
        value: or_fallback(value, fallback).to_string(),
    };

    let summary = if context.industry.trim().is_empty() {
        format!(
            "This proposal outlines a comprehensive marketing and PR strategy for {}.",
            data.company_name
        )
    } else {
        format!(
            "This proposal outlines a comprehensive marketing and PR strategy for {} in the {} industry.",
            data.company_name, context.industry
        )
    };

    let mut blocks = vec![
        Block::Title(PROPOSAL_TITLE.to_string()),
        centered(format!("Prepared for: {}", data.company_name), Emphasis::Strong),
        centered(format!("Contact: {}", data.contact_name), Emphasis::Plain),
        centered(format!("Date: {}", display_date(date)), Emphasis::Plain),
        centered(format!("Prepared by: {CONSULTANT_NAME}"), Emphasis::Muted),
        Block::Heading("EXECUTIVE SUMMARY".to_string()),
        Block::Paragraph(format!(
            "{summary} Based on our consultation analysis, we have identified key opportunities \
             and challenges that require strategic attention to maximize business growth and \
             market presence."
        )),
        Block::Heading("BUSINESS CONTEXT ANALYSIS".to_string()),
        field("Industry", &context.industry, "Not specified"),
        field("Company Size", &context.size, "Not specified"),
        field("Primary Goals", &context.goals, "To be defined during implementation"),
        field(
            "Key Challenges",
            &context.challenges,
            "To be identified during strategy development",
        ),
    ];

    if !data.assessments.is_empty() {
        blocks.push(Block::Heading("STRATEGIC ASSESSMENT RESULTS".to_string()));
        blocks.push(Block::AssessmentTable(data.assessments.clone()));
    }

    blocks.push(Block::Heading("STRATEGIC RECOMMENDATIONS".to_string()));
    blocks.push(Block::Paragraph(
        or_fallback(&data.recommendations, RECOMMENDATIONS_PLACEHOLDER).to_string(),
    ));

    blocks.push(Block::Heading("IMPLEMENTATION TIMELINE".to_string()));
    blocks.extend(PHASES.iter().map(|(title, activities)| Block::Phase {
        title: title.to_string(),
        activities: activities.iter().map(|a| a.to_string()).collect(),
    }));

    blocks.push(Block::Heading("NEXT STEPS".to_string()));
    blocks.push(Block::Numbered(
        NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
    ));

    blocks.push(Block::Heading("CONTACT INFORMATION".to_string()));
    blocks.push(Block::Lines(
        [
            "For questions or to proceed with this proposal, please contact:",
            "",
            CONSULTANT_NAME,
            format!("Email: {CONSULTANT_EMAIL}").as_str(),
            format!("Phone: {CONSULTANT_PHONE}").as_str(),
            "",
            "Thank you for choosing our services. We look forward to helping you achieve your \
             marketing and PR objectives.",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    ));

    blocks
}

// ── Slides ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineItem {
    Header(String),
    Point(String),
    Spacer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledLine {
    pub text: String,
    pub size_pt: u32,
    pub bold: bool,
    pub italic: bool,
}

impl StyledLine {
    fn new(text: &str, size_pt: u32) -> Self {
        Self {
            text: text.to_string(),
            size_pt,
            bold: false,
            italic: false,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideBody {
    /// Title slide lines under the big title.
    Cover(Vec<StyledLine>),
    Outline(Vec<OutlineItem>),
    /// First row is the header.
    Table { rows: Vec<Vec<String>>, shaded: bool },
    /// Centered contact card.
    Card(Vec<StyledLine>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub title: String,
    pub body: SlideBody,
}

/// Bulleted slide text: bold group headers with indented points.
#[derive(Default)]
struct Outline(Vec<OutlineItem>);

impl Outline {
    fn group(mut self, header: &str, points: &[&str]) -> Self {
        if !self.0.is_empty() {
            self.0.push(OutlineItem::Spacer);
        }
        self.0.push(OutlineItem::Header(header.to_string()));
        self.0
            .extend(points.iter().map(|p| OutlineItem::Point(p.to_string())));
        self
    }

    fn build(self) -> SlideBody {
        SlideBody::Outline(self.0)
    }
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// Content of the slide deck, in order.
pub fn proposal_deck(data: &ProposalData, date: NaiveDate) -> Vec<Slide> {
    let context = &data.business_context;
    let mut slides = vec![
        Slide {
            title: PROPOSAL_TITLE.to_string(),
            body: SlideBody::Cover(vec![
                StyledLine::new(&format!("Prepared for: {}", data.company_name), 24).bold(),
                StyledLine::new(&format!("Date: {}", display_date(date)), 18),
                StyledLine::new(CONSULTANT_NAME, 16).italic(),
            ]),
        },
        Slide {
            title: "Executive Summary".to_string(),
            body: Outline::default()
                .group(
                    "Strategic Overview",
                    &[
                        format!(
                            "Comprehensive marketing and PR strategy for {}",
                            data.company_name
                        )
                        .as_str(),
                        format!(
                            "Industry focus: {}",
                            or_fallback(&context.industry, "Multi-sector approach")
                        )
                        .as_str(),
                    ],
                )
                .group(
                    "Key Opportunities Identified",
                    &[
                        "Brand positioning enhancement",
                        "Digital marketing optimization",
                        "PR and media relations improvement",
                    ],
                )
                .build(),
        },
        Slide {
            title: "Business Context Analysis".to_string(),
            body: SlideBody::Table {
                rows: vec![
                    row(&["Category", "Details"]),
                    row(&["Industry", or_fallback(&context.industry, "Not specified")]),
                    row(&["Company Size", or_fallback(&context.size, "Not specified")]),
                    row(&["Primary Goals", or_fallback(&context.goals, "To be defined")]),
                    row(&[
                        "Key Challenges",
                        or_fallback(&context.challenges, "To be identified"),
                    ]),
                ],
                shaded: true,
            },
        },
    ];

    if !data.assessments.is_empty() {
        let mut rows = vec![row(&["Category", "Score", "Status"])];
        rows.extend(data.assessments.iter().map(|a| {
            vec![
                a.category.clone(),
                format!("{}/100", a.score),
                score_status(a.score).to_string(),
            ]
        }));
        slides.push(Slide {
            title: "Strategic Assessment Results".to_string(),
            body: SlideBody::Table {
                rows,
                shaded: false,
            },
        });
    }

    slides.push(Slide {
        title: "Strategic Recommendations".to_string(),
        body: Outline::default()
            .group(
                "Immediate Actions (0-30 days)",
                &[
                    "Brand audit and competitive analysis",
                    "Target audience research and persona development",
                ],
            )
            .group(
                "Short-term Goals (1-3 months)",
                &[
                    "Content strategy development",
                    "PR campaign planning and media outreach",
                ],
            )
            .group(
                "Long-term Strategy (3-12 months)",
                &[
                    "Brand positioning and market expansion",
                    "Performance optimization and scaling",
                ],
            )
            .build(),
    });

    slides.push(Slide {
        title: "Implementation Timeline".to_string(),
        body: SlideBody::Table {
            rows: vec![
                row(&["Phase", "Duration", "Key Activities"]),
                row(&[
                    "Strategy & Planning",
                    "Weeks 1-2",
                    "Research, analysis, framework development",
                ]),
                row(&[
                    "Content Development",
                    "Weeks 3-6",
                    "Content creation, campaign planning",
                ]),
                row(&[
                    "Execution & Launch",
                    "Weeks 7-12",
                    "Campaign launch, monitoring, optimization",
                ]),
            ],
            shaded: true,
        },
    });

    slides.push(Slide {
        title: "Next Steps".to_string(),
        body: Outline::default()
            .group(
                "1. Proposal Review & Approval",
                &["Review proposal details and provide feedback"],
            )
            .group(
                "2. Project Kick-off Meeting",
                &["Schedule initial strategy session"],
            )
            .group(
                "3. Implementation Begin",
                &["Start Phase 1 activities and establish regular check-ins"],
            )
            .build(),
    });

    slides.push(Slide {
        title: "Contact Information".to_string(),
        body: SlideBody::Card(vec![
            StyledLine::new(CONSULTANT_NAME, 24).bold(),
            StyledLine::new("", 12),
            StyledLine::new(&format!("Email: {CONSULTANT_EMAIL}"), 18),
            StyledLine::new(&format!("Phone: {CONSULTANT_PHONE}"), 18),
            StyledLine::new("", 16),
            StyledLine::new("Thank you for choosing our services!", 20).italic(),
            StyledLine::new(
                "We look forward to helping you achieve your marketing and PR objectives.",
                16,
            ),
        ]),
    });

    slides
}
