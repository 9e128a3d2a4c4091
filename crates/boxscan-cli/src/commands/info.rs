use boxscan_core::error::BoxscanError;
use boxscan_core::extraction::poppler::PopplerDocument;
use boxscan_core::extraction::DocumentSession;
use std::path::Path;

pub fn run(pdf_file: &Path) -> Result<(), BoxscanError> {
    let document = PopplerDocument::open(pdf_file)?;

    println!("{}", pdf_file.display());
    println!("  Pages: {}", document.page_count());
    for index in 0..document.page_count() {
        let size = document.page_native_size(index)?;
        println!(
            "  Page {:<4} {:.1} x {:.1} pt",
            index + 1,
            size.width_pt,
            size.height_pt
        );
    }
    if !PopplerDocument::can_render() {
        println!("\n  note: pdftoppm not found, page rendering is unavailable");
    }
    Ok(())
}
