pub mod poppler;
pub mod text_layer;

use serde::{Deserialize, Serialize};

use crate::error::BoxscanError;
use crate::geometry::{PageSize, RasterGeometry, RasterScale, Rect};
use crate::region::{Region, Template};

/// A rendered page: its raster geometry and packed RGB8 pixels, row-major.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub geometry: RasterGeometry,
    pub pixels: Vec<u8>,
}

/// An open document, as the engine sees it.
///
/// Page indices are 0-based here; templates use 1-based page numbers.
pub trait DocumentSession {
    fn page_count(&self) -> usize;

    fn page_native_size(&self, page_index: usize) -> Result<PageSize, BoxscanError>;

    fn render_page(&self, page_index: usize, zoom: f64) -> Result<RenderedPage, BoxscanError>;

    /// Raster geometry the page has at `zoom`. Backends that can compute
    /// this without rendering should override it.
    fn raster_geometry(
        &self,
        page_index: usize,
        zoom: f64,
    ) -> Result<RasterGeometry, BoxscanError> {
        Ok(self.render_page(page_index, zoom)?.geometry)
    }

    /// Text of the page that falls inside `doc_rect` (document points).
    fn text_in_region(&self, page_index: usize, doc_rect: &Rect) -> Result<String, BoxscanError>;
}

/// One extracted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub text: String,
}

/// Extracted fields of one page, in region order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: u32,
    pub fields: Vec<FieldValue>,
}

/// Convert a 1-based page number into a checked 0-based index.
pub fn page_index(
    document: &dyn DocumentSession,
    page_number: u32,
) -> Result<usize, BoxscanError> {
    let page_count = document.page_count();
    let page = page_number as usize;
    if page == 0 || page > page_count {
        return Err(BoxscanError::PageOutOfRange { page, page_count });
    }
    Ok(page - 1)
}

/// Extract the text under each region of one page.
///
/// `raster` is the geometry of the rendering the regions are interpreted
/// against. Output follows region order exactly; duplicate names give
/// duplicate entries and empty areas give empty text.
pub fn extract(
    document: &dyn DocumentSession,
    page_number: u32,
    regions: &[Region],
    raster: RasterGeometry,
) -> Result<Vec<FieldValue>, BoxscanError> {
    let index = page_index(document, page_number)?;
    let page_size = document.page_native_size(index)?;
    let scale = RasterScale::derive(page_size, raster);

    let mut fields = Vec::with_capacity(regions.len());
    for region in regions {
        let doc_rect = scale.to_document(region.rect);
        let text = document.text_in_region(index, &doc_rect)?;
        tracing::debug!(
            page = page_number,
            name = %region.name,
            ?doc_rect,
            chars = text.len(),
            "extracted field"
        );
        fields.push(FieldValue {
            name: region.name.clone(),
            text,
        });
    }
    Ok(fields)
}

/// Extract one page, taking the raster geometry the document has at `zoom`.
pub fn extract_page(
    document: &dyn DocumentSession,
    page_number: u32,
    regions: &[Region],
    zoom: f64,
) -> Result<Vec<FieldValue>, BoxscanError> {
    let index = page_index(document, page_number)?;
    let raster = document.raster_geometry(index, zoom)?;
    extract(document, page_number, regions, raster)
}

/// Extract every page of a template, in ascending page order.
///
/// Template pages the document does not have are skipped.
pub fn extract_template(
    document: &dyn DocumentSession,
    template: &Template,
    zoom: f64,
) -> Result<Vec<PageExtraction>, BoxscanError> {
    let page_count = document.page_count();
    let mut out = Vec::new();

    for page_number in template.pages() {
        if page_number as usize > page_count {
            tracing::warn!(
                page = page_number,
                page_count,
                "template page not present in document, skipping"
            );
            continue;
        }
        let fields = extract_page(document, page_number, template.regions(page_number), zoom)?;
        out.push(PageExtraction {
            page_number,
            fields,
        });
    }

    Ok(out)
}

/// Plain-text report, one `name: text` line per field.
pub fn format_fields(fields: &[FieldValue]) -> String {
    let mut out = String::from("field name: field value\n");
    for f in fields {
        out.push_str(&f.name);
        out.push_str(": ");
        out.push_str(&f.text);
        out.push('\n');
    }
    out
}
