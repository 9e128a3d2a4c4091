//! Viewing session: which page is shown, at what zoom and scroll, and the
//! template being edited on top of it.

use crate::config::ViewerConfig;
use crate::error::BoxscanError;
use crate::extraction::{self, DocumentSession, FieldValue, RenderedPage};
use crate::geometry::{
    rect_to_viewport, to_raster_space, Point, RasterGeometry, Rect, ScrollState,
};
use crate::region::{CommitOutcome, Region, RegionModel, Template};

/// Tolerance when comparing a zoom against its floor, so that stepping in
/// and back out lands exactly on the floor.
const ZOOM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    scale: f64,
    min_scale: f64,
    step: f64,
}

impl ZoomState {
    pub fn new(scale: f64, min_scale: f64, step: f64) -> Result<Self, BoxscanError> {
        ViewerConfig {
            initial_zoom: scale,
            min_zoom: min_scale,
            zoom_step: step,
        }
        .validate()?;
        Ok(ZoomState {
            scale,
            min_scale,
            step,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn zoom_in(&mut self) {
        self.scale *= self.step;
    }

    /// Step out unless that would drop below the floor. Returns whether the
    /// zoom changed.
    pub fn zoom_out(&mut self) -> bool {
        let next = self.scale / self.step;
        if next < self.min_scale - ZOOM_EPSILON {
            return false;
        }
        self.scale = if next - self.min_scale <= ZOOM_EPSILON {
            self.min_scale
        } else {
            next
        };
        true
    }
}

/// Result of a page navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(usize),
    NoMorePages,
    NoPreviousPages,
}

/// 0-based page index bounded by the document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    index: usize,
    page_count: usize,
}

impl PageCursor {
    pub fn new(page_count: usize) -> Result<Self, BoxscanError> {
        if page_count == 0 {
            return Err(BoxscanError::PageOutOfRange {
                page: 1,
                page_count,
            });
        }
        Ok(PageCursor {
            index: 0,
            page_count,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// 1-based page number, as used by templates.
    pub fn page_number(&self) -> u32 {
        (self.index + 1) as u32
    }

    pub fn next(&mut self) -> Navigation {
        if self.index + 1 >= self.page_count {
            return Navigation::NoMorePages;
        }
        self.index += 1;
        Navigation::Moved(self.index)
    }

    pub fn prev(&mut self) -> Navigation {
        if self.index == 0 {
            return Navigation::NoPreviousPages;
        }
        self.index -= 1;
        Navigation::Moved(self.index)
    }

    pub fn goto(&mut self, index: usize) -> Result<(), BoxscanError> {
        if index >= self.page_count {
            return Err(BoxscanError::PageOutOfRange {
                page: index + 1,
                page_count: self.page_count,
            });
        }
        self.index = index;
        Ok(())
    }
}

/// Everything one open viewer owns. Passed explicitly to whoever needs it.
#[derive(Debug, Clone)]
pub struct ViewerSession {
    model: RegionModel,
    zoom: ZoomState,
    scroll: ScrollState,
    cursor: PageCursor,
    raster: Option<RasterGeometry>,
}

impl ViewerSession {
    pub fn open(
        document: &dyn DocumentSession,
        config: &ViewerConfig,
    ) -> Result<Self, BoxscanError> {
        Ok(ViewerSession {
            model: RegionModel::new(),
            zoom: ZoomState::new(config.initial_zoom, config.min_zoom, config.zoom_step)?,
            scroll: ScrollState::default(),
            cursor: PageCursor::new(document.page_count())?,
            raster: None,
        })
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.model.replace_template(template);
        self
    }

    pub fn template(&self) -> &Template {
        self.model.template()
    }

    pub fn replace_template(&mut self, template: Template) {
        self.model.replace_template(template);
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.scale()
    }

    pub fn scroll(&self) -> ScrollState {
        self.scroll
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn page_number(&self) -> u32 {
        self.cursor.page_number()
    }

    pub fn next_page(&mut self) -> Navigation {
        let nav = self.cursor.next();
        if let Navigation::Moved(_) = nav {
            self.page_changed();
        }
        nav
    }

    pub fn prev_page(&mut self) -> Navigation {
        let nav = self.cursor.prev();
        if let Navigation::Moved(_) = nav {
            self.page_changed();
        }
        nav
    }

    /// Jump to a 1-based page number.
    pub fn goto_page(&mut self, page_number: u32) -> Result<(), BoxscanError> {
        let index = (page_number as usize)
            .checked_sub(1)
            .ok_or(BoxscanError::PageOutOfRange {
                page: 0,
                page_count: self.cursor.page_count(),
            })?;
        self.cursor.goto(index)?;
        self.page_changed();
        Ok(())
    }

    fn page_changed(&mut self) {
        self.model.cancel_pending();
        self.scroll = ScrollState::default();
        self.raster = None;
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
        self.raster = None;
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.zoom.zoom_out();
        if changed {
            self.raster = None;
        }
        changed
    }

    /// Mouse wheel: positive delta zooms in, anything else zooms out.
    pub fn zoom_by_wheel(&mut self, delta: f64) {
        if delta > 0.0 {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll = ScrollState::new(x, y);
    }

    fn to_raster(&self, viewport: Point) -> Point {
        to_raster_space(viewport, self.scroll, self.zoom.scale())
    }

    pub fn begin_drag(&mut self, viewport: Point) {
        let start = self.to_raster(viewport);
        self.model.begin_region(self.page_number(), start);
    }

    pub fn update_drag(&mut self, viewport: Point) {
        let current = self.to_raster(viewport);
        self.model.update_pending_region(current);
    }

    /// Release the drag and name the region. `None` means the naming prompt
    /// was cancelled.
    pub fn finish_drag(&mut self, viewport: Point, name: Option<&str>) -> CommitOutcome {
        let end = self.to_raster(viewport);
        self.model.commit_region(self.page_number(), end, name)
    }

    pub fn remove_last_region(&mut self) -> Option<Region> {
        self.model.remove_last(self.page_number())
    }

    pub fn clear_current_page(&mut self) {
        self.model.clear_page(self.page_number());
    }

    pub fn current_regions(&self) -> &[Region] {
        self.model.template().regions(self.page_number())
    }

    /// Regions of the current page in viewport coordinates, for drawing.
    pub fn overlay_rects(&self) -> Vec<(&str, Rect)> {
        self.current_regions()
            .iter()
            .map(|r| {
                (
                    r.name.as_str(),
                    rect_to_viewport(r.rect, self.scroll, self.zoom.scale()),
                )
            })
            .collect()
    }

    /// The rubber-band rectangle of an in-progress drag, in viewport
    /// coordinates.
    pub fn pending_overlay(&self) -> Option<Rect> {
        self.model
            .pending_rect()
            .map(|r| rect_to_viewport(r, self.scroll, self.zoom.scale()))
    }

    /// Render the current page at the current zoom and remember its geometry
    /// for extraction.
    pub fn render_current(
        &mut self,
        document: &dyn DocumentSession,
    ) -> Result<RenderedPage, BoxscanError> {
        let rendered = document.render_page(self.cursor.index(), self.zoom.scale())?;
        self.raster = Some(rendered.geometry);
        Ok(rendered)
    }

    /// Extract the current page against the last rendering, or against the
    /// geometry the page has at the current zoom when nothing was rendered.
    pub fn extract_current(
        &mut self,
        document: &dyn DocumentSession,
    ) -> Result<Vec<FieldValue>, BoxscanError> {
        let raster = match self.raster {
            Some(raster) => raster,
            None => {
                let raster = document.raster_geometry(self.cursor.index(), self.zoom.scale())?;
                self.raster = Some(raster);
                raster
            }
        };
        extraction::extract(document, self.page_number(), self.current_regions(), raster)
    }
}
