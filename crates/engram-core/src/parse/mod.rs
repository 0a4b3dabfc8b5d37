//! Export Parsing
//!
//! Turns an uploaded HTML export into a list of [`ParsedConversation`]s.
//! Format detection and parsing are separate steps so the ingest pipeline
//! can distinguish "not a chat export" from "a chat export with nothing in
//! it". Vendor-specific export dialects plug in behind [`detect_format`];
//! the generic transcript shape (role-annotated message elements inside
//! conversation containers) is handled here.

mod export;

pub use export::parse_all;

use scraper::{Html, Selector};

/// Recognised export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Role-annotated transcript markup (`data-role` message elements).
    Transcript,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Transcript => "transcript",
        }
    }
}

/// Detect whether the document is a chat export we can parse.
///
/// Returns `None` for HTML that carries no recognisable message markup;
/// the caller maps that to an unsupported-format error.
pub fn detect_format(html: &str) -> Option<ExportFormat> {
    let document = Html::parse_document(html);
    let message_selector =
        Selector::parse("[data-role]").expect("static selector");

    if document.select(&message_selector).next().is_some() {
        Some(ExportFormat::Transcript)
    } else {
        None
    }
}
