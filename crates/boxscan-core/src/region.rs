use serde::Serialize;
use std::collections::BTreeMap;

use crate::geometry::{Point, Rect};

/// A named rectangle over one page, in canonical (zoom 1.0) raster pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    pub rect: Rect,
}

impl Region {
    /// Create a region, trimming the name and normalizing the rectangle.
    /// Returns `None` for an empty name or a degenerate rectangle.
    pub fn new(name: impl AsRef<str>, rect: Rect) -> Option<Region> {
        let name = name.as_ref().trim();
        let rect = rect.normalized();
        if name.is_empty() || rect.is_degenerate() {
            return None;
        }
        Some(Region {
            name: name.to_string(),
            rect,
        })
    }
}

/// Regions of one document layout, keyed by 1-based page number.
///
/// Order within a page is creation order. A page whose list is empty is
/// equivalent to a page that is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pages: BTreeMap<u32, Vec<Region>>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page_number: u32, region: Region) {
        self.pages.entry(page_number).or_default().push(region);
    }

    /// Regions of a page in creation order; empty for unknown pages.
    pub fn regions(&self, page_number: u32) -> &[Region] {
        self.pages
            .get(&page_number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Page numbers that hold at least one region, ascending.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages
            .iter()
            .filter(|(_, regions)| !regions.is_empty())
            .map(|(page, _)| *page)
    }

    pub fn region_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.region_count() == 0
    }

    pub fn without_empty_pages(&self) -> Template {
        Template {
            pages: self
                .pages
                .iter()
                .filter(|(_, regions)| !regions.is_empty())
                .map(|(page, regions)| (*page, regions.clone()))
                .collect(),
        }
    }

    pub fn remove_last(&mut self, page_number: u32) -> Option<Region> {
        self.pages.get_mut(&page_number).and_then(Vec::pop)
    }

    pub fn clear_page(&mut self, page_number: u32) {
        if let Some(regions) = self.pages.get_mut(&page_number) {
            regions.clear();
        }
    }

    /// Delete every region on the page carrying `name`. Returns how many
    /// were removed.
    pub fn remove_named(&mut self, page_number: u32, name: &str) -> usize {
        let Some(regions) = self.pages.get_mut(&page_number) else {
            return 0;
        };
        let before = regions.len();
        regions.retain(|r| r.name != name);
        before - regions.len()
    }

    /// Replace the rectangle of the first region named `name`, keeping its
    /// position in the page order. Degenerate rectangles are refused.
    pub fn replace_named(&mut self, page_number: u32, name: &str, rect: Rect) -> bool {
        let rect = rect.normalized();
        if rect.is_degenerate() {
            return false;
        }
        match self
            .pages
            .get_mut(&page_number)
            .and_then(|regions| regions.iter_mut().find(|r| r.name == name))
        {
            Some(region) => {
                region.rect = rect;
                true
            }
            None => false,
        }
    }

    pub(crate) fn iter_pages(&self) -> impl Iterator<Item = (u32, &[Region])> {
        self.pages
            .iter()
            .filter(|(_, regions)| !regions.is_empty())
            .map(|(page, regions)| (*page, regions.as_slice()))
    }
}

/// Rectangle being dragged out but not yet committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRegion {
    pub page_number: u32,
    pub anchor: Point,
    pub current: Point,
}

impl PendingRegion {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.anchor, self.current)
    }
}

/// What happened to a drag on commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Added(Region),
    /// Drag did not span an area.
    Degenerate,
    /// Name was empty or the naming prompt was cancelled.
    Unnamed,
    /// No drag was in progress on that page.
    NoPending,
}

/// The template being edited plus the in-flight drag gesture.
///
/// Points handed to the gesture methods are canonical raster points; the
/// caller converts from the viewport first.
#[derive(Debug, Clone, Default)]
pub struct RegionModel {
    template: Template,
    pending: Option<PendingRegion>,
}

impl RegionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_template(template: Template) -> Self {
        RegionModel {
            template,
            pending: None,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Swap in a freshly loaded template, dropping any in-flight drag.
    pub fn replace_template(&mut self, template: Template) {
        self.template = template;
        self.pending = None;
    }

    pub fn begin_region(&mut self, page_number: u32, start: Point) {
        self.pending = Some(PendingRegion {
            page_number,
            anchor: start,
            current: start,
        });
    }

    pub fn update_pending_region(&mut self, current: Point) {
        if let Some(pending) = self.pending.as_mut() {
            pending.current = current;
        }
    }

    pub fn pending_rect(&self) -> Option<Rect> {
        self.pending.as_ref().map(PendingRegion::rect)
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Finish the drag at `end`. The pending rectangle is consumed whatever
    /// the outcome; only [`CommitOutcome::Added`] mutates the template.
    pub fn commit_region(
        &mut self,
        page_number: u32,
        end: Point,
        name: Option<&str>,
    ) -> CommitOutcome {
        let pending = match self.pending.take() {
            Some(p) if p.page_number == page_number => p,
            _ => return CommitOutcome::NoPending,
        };

        let rect = Rect::from_corners(pending.anchor, end);
        if rect.is_degenerate() {
            tracing::debug!(page = page_number, "discarding degenerate drag");
            return CommitOutcome::Degenerate;
        }

        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => {
                tracing::debug!(page = page_number, "discarding unnamed region");
                return CommitOutcome::Unnamed;
            }
        };

        let region = Region {
            name: name.to_string(),
            rect,
        };
        tracing::debug!(page = page_number, name, ?rect, "region added");
        self.template.insert(page_number, region.clone());
        CommitOutcome::Added(region)
    }

    pub fn remove_last(&mut self, page_number: u32) -> Option<Region> {
        self.template.remove_last(page_number)
    }

    pub fn clear_page(&mut self, page_number: u32) {
        self.template.clear_page(page_number);
    }

    pub fn remove_named(&mut self, page_number: u32, name: &str) -> usize {
        self.template.remove_named(page_number, name)
    }

    pub fn replace_named(&mut self, page_number: u32, name: &str, rect: Rect) -> bool {
        self.template.replace_named(page_number, name, rect)
    }

    pub fn list_regions(&self, page_number: u32) -> Vec<Region> {
        self.template.regions(page_number).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(
        model: &mut RegionModel,
        page: u32,
        from: (f64, f64),
        to: (f64, f64),
        name: Option<&str>,
    ) -> CommitOutcome {
        model.begin_region(page, Point::new(from.0, from.1));
        model.update_pending_region(Point::new((from.0 + to.0) / 2.0, to.1));
        model.commit_region(page, Point::new(to.0, to.1), name)
    }

    #[test]
    fn test_commit_normalizes_every_drag_direction() {
        let mut model = RegionModel::new();
        let corners = [
            ((100.0, 100.0), (200.0, 150.0)),
            ((200.0, 150.0), (100.0, 100.0)),
            ((200.0, 100.0), (100.0, 150.0)),
            ((100.0, 150.0), (200.0, 100.0)),
        ];
        for (i, (from, to)) in corners.iter().enumerate() {
            let outcome = drag(&mut model, 1, *from, *to, Some("total"));
            assert!(matches!(outcome, CommitOutcome::Added(_)));
            assert_eq!(model.list_regions(1).len(), i + 1);
        }
        for region in model.list_regions(1) {
            assert_eq!(region.rect, Rect::new(100.0, 100.0, 200.0, 150.0));
        }
    }

    #[test]
    fn test_degenerate_drag_is_ignored() {
        let mut model = RegionModel::new();
        assert_eq!(
            drag(&mut model, 1, (10.0, 10.0), (10.0, 80.0), Some("a")),
            CommitOutcome::Degenerate
        );
        assert_eq!(
            drag(&mut model, 1, (10.0, 10.0), (90.0, 10.0), Some("a")),
            CommitOutcome::Degenerate
        );
        assert!(model.template().is_empty());
        assert!(model.pending_rect().is_none());
    }

    #[test]
    fn test_empty_or_cancelled_name_is_ignored() {
        let mut model = RegionModel::new();
        assert_eq!(
            drag(&mut model, 1, (0.0, 0.0), (5.0, 5.0), Some("")),
            CommitOutcome::Unnamed
        );
        assert_eq!(
            drag(&mut model, 1, (0.0, 0.0), (5.0, 5.0), Some("   ")),
            CommitOutcome::Unnamed
        );
        assert_eq!(
            drag(&mut model, 1, (0.0, 0.0), (5.0, 5.0), None),
            CommitOutcome::Unnamed
        );
        assert_eq!(model.template().region_count(), 0);
    }

    #[test]
    fn test_commit_without_begin_is_noop() {
        let mut model = RegionModel::new();
        let outcome = model.commit_region(1, Point::new(5.0, 5.0), Some("x"));
        assert_eq!(outcome, CommitOutcome::NoPending);

        model.begin_region(2, Point::new(0.0, 0.0));
        let outcome = model.commit_region(1, Point::new(5.0, 5.0), Some("x"));
        assert_eq!(outcome, CommitOutcome::NoPending);
        assert!(model.template().is_empty());
    }

    #[test]
    fn test_pending_rect_tracks_updates() {
        let mut model = RegionModel::new();
        model.begin_region(1, Point::new(50.0, 50.0));
        model.update_pending_region(Point::new(10.0, 70.0));
        assert_eq!(model.pending_rect(), Some(Rect::new(10.0, 50.0, 50.0, 70.0)));
        assert!(model.template().is_empty());
        model.cancel_pending();
        assert!(model.pending_rect().is_none());
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let mut model = RegionModel::new();
        drag(&mut model, 3, (0.0, 0.0), (5.0, 5.0), Some("item"));
        drag(&mut model, 3, (0.0, 10.0), (5.0, 15.0), Some("item"));
        assert_eq!(model.list_regions(3).len(), 2);
    }

    #[test]
    fn test_remove_last_and_clear() {
        let mut model = RegionModel::new();
        drag(&mut model, 1, (0.0, 0.0), (5.0, 5.0), Some("first"));
        drag(&mut model, 1, (0.0, 10.0), (5.0, 15.0), Some("second"));

        let removed = model.remove_last(1).unwrap();
        assert_eq!(removed.name, "second");
        assert_eq!(model.list_regions(1)[0].name, "first");

        assert!(model.remove_last(9).is_none());

        model.clear_page(1);
        assert!(model.list_regions(1).is_empty());
        assert!(model.remove_last(1).is_none());
        assert_eq!(model.template().pages().count(), 0);
    }

    #[test]
    fn test_remove_and_replace_by_name() {
        let mut t = Template::new();
        t.insert(1, Region::new("a", Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap());
        t.insert(1, Region::new("b", Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap());
        t.insert(1, Region::new("a", Rect::new(0.0, 0.0, 3.0, 3.0)).unwrap());

        assert!(t.replace_named(1, "b", Rect::new(9.0, 9.0, 4.0, 4.0)));
        assert_eq!(t.regions(1)[1].rect, Rect::new(4.0, 4.0, 9.0, 9.0));
        assert!(!t.replace_named(1, "b", Rect::new(1.0, 1.0, 1.0, 5.0)));
        assert!(!t.replace_named(1, "zzz", Rect::new(0.0, 0.0, 1.0, 1.0)));

        assert_eq!(t.remove_named(1, "a"), 2);
        assert_eq!(t.regions(1).len(), 1);
        assert_eq!(t.remove_named(4, "a"), 0);
    }

    #[test]
    fn test_without_empty_pages() {
        let mut t = Template::new();
        t.insert(1, Region::new("a", Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap());
        t.insert(2, Region::new("b", Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap());
        t.clear_page(2);
        let filtered = t.without_empty_pages();
        assert_eq!(filtered.pages().collect::<Vec<_>>(), vec![1]);
        assert_ne!(filtered, t);
    }

    #[test]
    fn test_region_new_validates() {
        assert!(Region::new("", Rect::new(0.0, 0.0, 1.0, 1.0)).is_none());
        assert!(Region::new("x", Rect::new(0.0, 0.0, 0.0, 1.0)).is_none());
        let r = Region::new("x", Rect::new(5.0, 5.0, 1.0, 1.0)).unwrap();
        assert_eq!(r.rect, Rect::new(1.0, 1.0, 5.0, 5.0));
        assert!(Region::new("   ", Rect::new(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_region_names_are_trimmed_like_drags() {
        let mut model = RegionModel::new();
        model.begin_region(1, Point::new(0.0, 0.0));
        model.commit_region(1, Point::new(10.0, 10.0), Some(" total "));

        let loaded = Region::new(" total ", Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(loaded.name, "total");
        assert_eq!(model.list_regions(1), vec![loaded]);
        assert_eq!(model.remove_named(1, "total"), 1);
    }
}
