use boxscan_core::batch::{collect_pdfs, extract_batch, move_into};
use boxscan_core::config::{load_config, ViewerConfig};
use boxscan_core::error::BoxscanError;
use boxscan_core::extraction::poppler::PopplerDocument;
use boxscan_core::template::load_template;
use std::path::{Path, PathBuf};

use crate::output;

#[allow(clippy::too_many_arguments)]
pub fn run(
    inputs: &[PathBuf],
    template_file: &Path,
    page: Option<u32>,
    zoom: Option<f64>,
    config_file: Option<&Path>,
    output_format: &str,
    output_file: Option<PathBuf>,
    move_to: Option<&Path>,
) -> Result<(), BoxscanError> {
    let config = match config_file {
        Some(path) => load_config(path)?,
        None => ViewerConfig::default(),
    };
    let zoom = zoom.unwrap_or(config.initial_zoom);

    let template = load_template(template_file)?;
    let pdfs = collect_pdfs(inputs)?;
    let documents = extract_batch(&pdfs, &template, page, zoom, PopplerDocument::open)?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&documents)?;
            std::fs::write(&path, json)?;
            let count: usize = documents.iter().map(|d| d.field_count()).sum();
            eprintln!(
                "Extracted {} field(s) from {} document(s), written to {}",
                count,
                documents.len(),
                path.display()
            );
        }
        None => match output_format {
            "json" => output::json::print(&documents)?,
            _ => output::table::print(&documents),
        },
    }

    if let Some(dir) = move_to {
        for doc in documents.iter().filter(|d| d.is_ok()) {
            let moved = move_into(&doc.path, dir)?;
            eprintln!("Moved {} to {}", doc.path.display(), moved.display());
        }
    }

    let failed = documents.iter().filter(|d| !d.is_ok()).count();
    if failed > 0 {
        return Err(BoxscanError::BatchIncomplete {
            failed,
            total: documents.len(),
        });
    }
    Ok(())
}
