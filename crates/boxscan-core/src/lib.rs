pub mod batch;
pub mod config;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod region;
pub mod session;
pub mod template;

use std::path::Path;

use error::BoxscanError;
use extraction::poppler::PopplerDocument;
use extraction::{DocumentSession, PageExtraction};

/// Main API entry point: extract every templated field from a PDF.
///
/// Loads the template, opens the document with the poppler backend and runs
/// the extraction at `zoom` over every page the template covers.
pub fn extract_pdf(
    pdf_path: &Path,
    template_path: &Path,
    zoom: f64,
) -> Result<Vec<PageExtraction>, BoxscanError> {
    let template = template::load_template(template_path)?;
    let document = PopplerDocument::open(pdf_path)?;
    extract_document(&document, &template, zoom)
}

/// Extract every templated field from an already opened document.
pub fn extract_document(
    document: &dyn DocumentSession,
    template: &region::Template,
    zoom: f64,
) -> Result<Vec<PageExtraction>, BoxscanError> {
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(BoxscanError::InvalidZoom(zoom));
    }
    if template.is_empty() {
        tracing::warn!("template has no regions, nothing to extract");
    }
    extraction::extract_template(document, template, zoom)
}
