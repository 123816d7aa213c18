//! Export data types and filename rules.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use crate::assessment::Assessment;
use crate::error::ExportError;
use crate::session::{BusinessContext, Message};

pub const DEFAULT_COMPANY_NAME: &str = "Your Company";
pub const DEFAULT_CONTACT_NAME: &str = "Client";

/// Everything an export needs, assembled at export time.
#[derive(Debug, Clone)]
pub struct ProposalData {
    pub messages: Vec<Message>,
    pub assessments: Vec<Assessment>,
    pub business_context: BusinessContext,
    pub recommendations: String,
    pub company_name: String,
    pub contact_name: String,
}

impl ProposalData {
    /// Blank names fall back to the placeholders.
    pub fn new(
        messages: Vec<Message>,
        assessments: Vec<Assessment>,
        business_context: BusinessContext,
        company_name: &str,
        contact_name: &str,
    ) -> Self {
        let or_default = |value: &str, default: &str| {
            let value = value.trim();
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            messages,
            assessments,
            business_context,
            recommendations: String::new(),
            company_name: or_default(company_name, DEFAULT_COMPANY_NAME),
            contact_name: or_default(contact_name, DEFAULT_CONTACT_NAME),
        }
    }
}

/// Optional name overrides sent with an export request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
}

/// The three artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Plain-text requirements report.
    Report,
    /// Word-processor proposal.
    Docx,
    /// Slide-deck proposal.
    Pptx,
}

impl ExportKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Report => "txt",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Report => "text/plain; charset=utf-8",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    pub fn filename_prefix(&self) -> &'static str {
        match self {
            Self::Report => "Marketing-PR-Requirements-Report",
            Self::Docx | Self::Pptx => "Marketing-PR-Proposal",
        }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Report => "report",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ExportKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" | "txt" | "text" => Ok(Self::Report),
            "docx" | "word" => Ok(Self::Docx),
            "pptx" | "powerpoint" | "slides" => Ok(Self::Pptx),
            _ => Err(ExportError::UnknownKind(s.to_string())),
        }
    }
}

/// A finished, downloadable export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// `<prefix>-<company, whitespace runs as '-'>-<YYYY-MM-DD>.<ext>`
pub fn export_filename(kind: ExportKind, company_name: &str, date: NaiveDate) -> String {
    format!(
        "{}-{}-{}.{}",
        kind.filename_prefix(),
        WHITESPACE_RUN.replace_all(company_name, "-"),
        date.format("%Y-%m-%d"),
        kind.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn filenames_follow_prefix_company_date() {
        assert_eq!(
            export_filename(ExportKind::Docx, "Acme  Coffee\tRoasters", date()),
            "Marketing-PR-Proposal-Acme-Coffee-Roasters-2025-03-07.docx"
        );
        assert_eq!(
            export_filename(ExportKind::Pptx, "Acme", date()),
            "Marketing-PR-Proposal-Acme-2025-03-07.pptx"
        );
        assert_eq!(
            export_filename(ExportKind::Report, "Your Company", date()),
            "Marketing-PR-Requirements-Report-Your-Company-2025-03-07.txt"
        );
    }

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("report".parse::<ExportKind>().unwrap(), ExportKind::Report);
        assert_eq!("DOCX".parse::<ExportKind>().unwrap(), ExportKind::Docx);
        assert_eq!("slides".parse::<ExportKind>().unwrap(), ExportKind::Pptx);
        assert!(matches!(
            "pdf".parse::<ExportKind>(),
            Err(ExportError::UnknownKind(_))
        ));
    }

    #[test]
    fn blank_names_use_placeholders() {
        let data = ProposalData::new(vec![], vec![], BusinessContext::default(), " ", "");
        assert_eq!(data.company_name, DEFAULT_COMPANY_NAME);
        assert_eq!(data.contact_name, DEFAULT_CONTACT_NAME);

        let data = ProposalData::new(vec![], vec![], BusinessContext::default(), "Acme", "Dana");
        assert_eq!(data.company_name, "Acme");
        assert_eq!(data.contact_name, "Dana");
    }
}
