use boxscan_core::error::BoxscanError;
use boxscan_core::geometry::{to_raster_space, Point, ScrollState};
use boxscan_core::region::{CommitOutcome, RegionModel, Template};
use boxscan_core::template::{load_template, save_template};
use std::collections::BTreeMap;
use std::path::Path;

use crate::output::table::format_template;

pub fn show(file: &Path) -> Result<(), BoxscanError> {
    let template = load_template(file)?;
    print!("{}", format_template(&template));
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), BoxscanError> {
    let template = load_template(file)?;

    println!("Template '{}' is valid.", file.display());
    println!(
        "  {} region(s) on {} page(s)",
        template.region_count(),
        template.pages().count()
    );

    for (page, name) in duplicate_names(&template) {
        println!(
            "  warning: page {page} has more than one region named '{name}', each is extracted separately"
        );
    }
    Ok(())
}

/// Names that occur more than once on the same page, in page order.
fn duplicate_names(template: &Template) -> Vec<(u32, String)> {
    let mut out = Vec::new();
    for page in template.pages() {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for region in template.regions(page) {
            *counts.entry(region.name.as_str()).or_default() += 1;
        }
        out.extend(
            counts
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|(name, _)| (page, name.to_string())),
        );
    }
    out
}

/// Load a template for editing. A missing file starts an empty template.
fn load_or_new(file: &Path) -> Result<Template, BoxscanError> {
    if file.exists() {
        load_template(file)
    } else {
        tracing::info!(path = %file.display(), "template not found, starting a new one");
        Ok(Template::new())
    }
}

pub fn add(
    file: &Path,
    page: u32,
    name: &str,
    from: Point,
    to: Point,
    zoom: f64,
    scroll: Point,
) -> Result<(), BoxscanError> {
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(BoxscanError::InvalidZoom(zoom));
    }
    if page == 0 {
        return Err(BoxscanError::PageOutOfRange {
            page: 0,
            page_count: 0,
        });
    }

    let mut model = RegionModel::from_template(load_or_new(file)?);
    let scroll = ScrollState::new(scroll.x, scroll.y);
    model.begin_region(page, to_raster_space(from, scroll, zoom));
    let outcome = model.commit_region(page, to_raster_space(to, scroll, zoom), Some(name));

    match outcome {
        CommitOutcome::Added(region) => {
            save_template(model.template(), file)?;
            let [x1, y1, x2, y2] = region.rect.as_array();
            println!(
                "Added '{}' to page {} at [{:.2}, {:.2}, {:.2}, {:.2}]",
                region.name, page, x1, y1, x2, y2
            );
        }
        CommitOutcome::Degenerate => {
            eprintln!("Region spans no area, nothing added.");
        }
        CommitOutcome::Unnamed => {
            eprintln!("Region name is empty, nothing added.");
        }
        CommitOutcome::NoPending => {
            eprintln!("No region in progress, nothing added.");
        }
    }
    Ok(())
}

pub fn remove_last(file: &Path, page: u32) -> Result<(), BoxscanError> {
    let mut template = load_template(file)?;
    match template.remove_last(page) {
        Some(region) => {
            save_template(&template, file)?;
            println!("Removed '{}' from page {}", region.name, page);
        }
        None => println!("Page {page} has no regions."),
    }
    Ok(())
}

pub fn clear(file: &Path, page: u32) -> Result<(), BoxscanError> {
    let mut template = load_template(file)?;
    let count = template.regions(page).len();
    template.clear_page(page);
    save_template(&template, file)?;
    println!("Cleared {count} region(s) from page {page}");
    Ok(())
}

pub fn remove(file: &Path, page: u32, name: &str) -> Result<(), BoxscanError> {
    let mut template = load_template(file)?;
    let removed = template.remove_named(page, name);
    if removed == 0 {
        println!("No region named '{name}' on page {page}.");
        return Ok(());
    }
    save_template(&template, file)?;
    println!("Removed {removed} region(s) named '{name}' from page {page}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxscan_core::geometry::Rect;
    use boxscan_core::region::Region;

    #[test]
    fn test_duplicate_names() {
        let mut template = Template::new();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        template.insert(1, Region::new("a", rect).unwrap());
        template.insert(1, Region::new("b", rect).unwrap());
        template.insert(1, Region::new("a", rect).unwrap());
        template.insert(2, Region::new("b", rect).unwrap());
        assert_eq!(duplicate_names(&template), vec![(1, "a".to_string())]);
    }

    #[test]
    fn test_add_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("invoice.json");

        add(
            &file,
            1,
            "invoice_no",
            Point::new(200.0, 200.0),
            Point::new(400.0, 300.0),
            2.0,
            Point::new(0.0, 0.0),
        )
        .unwrap();
        add(
            &file,
            1,
            "total",
            Point::new(10.0, 10.0),
            Point::new(10.0, 50.0),
            1.0,
            Point::new(0.0, 0.0),
        )
        .unwrap();

        let template = load_template(&file).unwrap();
        assert_eq!(template.regions(1).len(), 1);
        assert_eq!(template.regions(1)[0].rect, Rect::new(100.0, 100.0, 200.0, 150.0));

        remove_last(&file, 1).unwrap();
        assert!(load_template(&file).unwrap().is_empty());
    }
}
