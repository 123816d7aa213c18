//! Proposal export: text report, word-processor document, and slide deck.

pub mod docx;
pub mod exporter;
pub mod model;
pub mod pptx;
pub mod prompts;
pub mod routes;
pub mod template;

pub use exporter::ProposalExporter;
pub use model::{ExportArtifact, ExportKind, ExportOptions, ProposalData};
