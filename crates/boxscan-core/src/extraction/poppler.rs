use image::{ImageFormat, RgbImage};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::BoxscanError;
use crate::extraction::text_layer::{TextLine, TextPage, TextWord};
use crate::extraction::{DocumentSession, RenderedPage};
use crate::geometry::{PageSize, RasterGeometry, Rect};

/// Document session backed by the poppler command-line tools.
///
/// The text layer of the whole document is read once on open with
/// `pdftotext -bbox-layout`; pages are rendered on demand with `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerDocument {
    path: PathBuf,
    pages: Vec<TextPage>,
}

impl PopplerDocument {
    pub fn open(path: &Path) -> Result<Self, BoxscanError> {
        let output = Command::new("pdftotext")
            .arg("-bbox-layout")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BoxscanError::PdftotextNotFound
                } else {
                    BoxscanError::DocumentOpen {
                        path: path.to_path_buf(),
                        reason: format!("pdftotext failed: {e}"),
                    }
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BoxscanError::DocumentOpen {
                path: path.to_path_buf(),
                reason: format!("pdftotext exited with code {code}: {stderr}"),
            });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        Self::from_bbox_xml(path, &xml)
    }

    /// Build a session from already captured `pdftotext -bbox-layout` output.
    pub fn from_bbox_xml(path: &Path, xml: &str) -> Result<Self, BoxscanError> {
        let pages = parse_bbox_xml(xml).map_err(|reason| BoxscanError::DocumentOpen {
            path: path.to_path_buf(),
            reason,
        })?;
        if pages.is_empty() {
            return Err(BoxscanError::DocumentOpen {
                path: path.to_path_buf(),
                reason: "document has no pages".into(),
            });
        }
        tracing::info!(path = %path.display(), pages = pages.len(), "document opened");
        Ok(PopplerDocument {
            path: path.to_path_buf(),
            pages,
        })
    }

    pub fn text_page(&self, page_index: usize) -> Result<&TextPage, BoxscanError> {
        self.pages
            .get(page_index)
            .ok_or(BoxscanError::PageOutOfRange {
                page: page_index + 1,
                page_count: self.pages.len(),
            })
    }

    /// Check if pdftoppm is available on the system.
    pub fn can_render() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl DocumentSession for PopplerDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_native_size(&self, page_index: usize) -> Result<PageSize, BoxscanError> {
        Ok(self.text_page(page_index)?.size)
    }

    fn render_page(&self, page_index: usize, zoom: f64) -> Result<RenderedPage, BoxscanError> {
        // Bounds check before spawning anything.
        self.text_page(page_index)?;
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(BoxscanError::InvalidZoom(zoom));
        }

        let page = (page_index + 1).to_string();
        let dpi = format!("{}", 72.0 * zoom);
        let output = Command::new("pdftoppm")
            .args(["-r", &dpi, "-f", &page, "-l", &page])
            .arg(&self.path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BoxscanError::PdftoppmNotFound
                } else {
                    BoxscanError::Render(format!("pdftoppm failed: {e}"))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(BoxscanError::ToolFailed {
                tool: "pdftoppm",
                code,
                stderr,
            });
        }

        let image = decode_pnm(&output.stdout)?;
        let (width, height) = image.dimensions();
        let geometry = RasterGeometry::new(width, height, zoom)?;
        tracing::debug!(page = page_index + 1, zoom, width, height, "page rendered");
        Ok(RenderedPage {
            geometry,
            pixels: image.into_raw(),
        })
    }

    /// pdftoppm rounds partial pixels up, so the size is known without
    /// rendering.
    fn raster_geometry(
        &self,
        page_index: usize,
        zoom: f64,
    ) -> Result<RasterGeometry, BoxscanError> {
        let size = self.text_page(page_index)?.size;
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(BoxscanError::InvalidZoom(zoom));
        }
        let width = (size.width_pt * zoom).ceil() as u32;
        let height = (size.height_pt * zoom).ceil() as u32;
        RasterGeometry::new(width, height, zoom)
    }

    fn text_in_region(&self, page_index: usize, doc_rect: &Rect) -> Result<String, BoxscanError> {
        Ok(self.text_page(page_index)?.text_in_rect(doc_rect))
    }
}

/// Parse `pdftotext -bbox-layout` XHTML into per-page text layers.
fn parse_bbox_xml(xml: &str) -> Result<Vec<TextPage>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages = Vec::new();
    let mut current_page: Option<TextPage> = None;
    let mut current_line: Option<TextLine> = None;
    let mut current_word: Option<TextWord> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => current_page = Some(TextPage::new(parse_page_size(&e)?)),
                b"line" => current_line = Some(TextLine::default()),
                b"word" => {
                    current_word = Some(TextWord {
                        text: String::new(),
                        bbox: parse_bbox(&e)?,
                    })
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => {
                pages.push(TextPage::new(parse_page_size(&e)?));
            }
            Ok(Event::Text(t)) => {
                if let Some(word) = current_word.as_mut() {
                    let text = t.unescape().map_err(|e| e.to_string())?;
                    word.text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"word" => {
                    if let (Some(word), Some(line)) = (current_word.take(), current_line.as_mut()) {
                        if !word.text.trim().is_empty() {
                            line.words.push(word);
                        }
                    }
                }
                b"line" => {
                    if let (Some(line), Some(page)) = (current_line.take(), current_page.as_mut()) {
                        if !line.words.is_empty() {
                            page.lines.push(line);
                        }
                    }
                }
                b"page" => {
                    if let Some(page) = current_page.take() {
                        pages.push(page);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed pdftotext output at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
        }
    }

    Ok(pages)
}

fn attr_f64(tag: &BytesStart<'_>, name: &str) -> Result<f64, String> {
    let tag_name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("<{tag_name}> attribute {name}='{value}' is not a number"));
        }
    }
    Err(format!("<{tag_name}> is missing attribute {name}"))
}

fn parse_page_size(tag: &BytesStart<'_>) -> Result<PageSize, String> {
    Ok(PageSize::new(attr_f64(tag, "width")?, attr_f64(tag, "height")?))
}

fn parse_bbox(tag: &BytesStart<'_>) -> Result<Rect, String> {
    Ok(Rect::new(
        attr_f64(tag, "xMin")?,
        attr_f64(tag, "yMin")?,
        attr_f64(tag, "xMax")?,
        attr_f64(tag, "yMax")?,
    ))
}

/// Decode the PNM image pdftoppm writes to stdout into RGB8.
fn decode_pnm(data: &[u8]) -> Result<RgbImage, BoxscanError> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Pnm)
        .map_err(|e| BoxscanError::Render(format!("unreadable pdftoppm output: {e}")))?;
    Ok(image.to_rgb8())
}
