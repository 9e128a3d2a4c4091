//! Running one template over many documents.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BoxscanError;
use crate::extraction::{extract_page, DocumentSession, PageExtraction};
use crate::region::Template;

/// Result for one document of a batch. A document that could not be opened
/// or extracted carries `error` and no pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentExtraction {
    pub path: PathBuf,
    pub pages: Vec<PageExtraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentExtraction {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn field_count(&self) -> usize {
        self.pages.iter().map(|p| p.fields.len()).sum()
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Expand the inputs into the list of documents to scan.
///
/// Files are taken as given. A directory contributes the `.pdf` files
/// directly inside it, sorted by name; subdirectories are not entered.
pub fn collect_pdfs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, BoxscanError> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && is_pdf(&path) {
                    found.push(path);
                }
            }
            found.sort();
            if found.is_empty() {
                tracing::warn!(dir = %input.display(), "no PDF files in directory");
            }
            out.extend(found);
        } else if input.is_file() {
            out.push(input.clone());
        } else {
            return Err(BoxscanError::DocumentOpen {
                path: input.clone(),
                reason: "no such file or directory".into(),
            });
        }
    }
    Ok(out)
}

fn extract_one(
    document: &dyn DocumentSession,
    template: &Template,
    page: Option<u32>,
    zoom: f64,
) -> Result<Vec<PageExtraction>, BoxscanError> {
    match page {
        Some(page_number) => {
            let fields = extract_page(document, page_number, template.regions(page_number), zoom)?;
            Ok(vec![PageExtraction {
                page_number,
                fields,
            }])
        }
        None => crate::extract_document(document, template, zoom),
    }
}

/// Extract `template` from every document in `paths`, in order.
///
/// `open` turns a path into a document session. A failure on one document
/// is recorded in its [`DocumentExtraction`] and the batch moves on. With
/// `page` set only that page of each document is extracted.
pub fn extract_batch<D, F>(
    paths: &[PathBuf],
    template: &Template,
    page: Option<u32>,
    zoom: f64,
    mut open: F,
) -> Result<Vec<DocumentExtraction>, BoxscanError>
where
    D: DocumentSession,
    F: FnMut(&Path) -> Result<D, BoxscanError>,
{
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(BoxscanError::InvalidZoom(zoom));
    }

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let result = open(path).and_then(|doc| extract_one(&doc, template, page, zoom));
        let entry = match result {
            Ok(pages) => DocumentExtraction {
                path: path.clone(),
                pages,
                error: None,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "document skipped");
                DocumentExtraction {
                    path: path.clone(),
                    pages: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        out.push(entry);
    }

    tracing::info!(
        documents = out.len(),
        failed = out.iter().filter(|d| !d.is_ok()).count(),
        "batch finished"
    );
    Ok(out)
}

/// Move a scanned document into `dir`, creating it when missing. Refuses to
/// overwrite a file of the same name.
pub fn move_into(path: &Path, dir: &Path) -> Result<PathBuf, BoxscanError> {
    let file_name = path.file_name().ok_or_else(|| BoxscanError::DocumentOpen {
        path: path.to_path_buf(),
        reason: "not a file path".into(),
    })?;
    std::fs::create_dir_all(dir)?;
    let target = dir.join(file_name);
    if target.exists() {
        return Err(BoxscanError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        )));
    }
    std::fs::rename(path, &target)?;
    tracing::debug!(from = %path.display(), to = %target.display(), "document moved");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_pdfs_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        let single = dir.path().join("notes.txt");

        let found = collect_pdfs(&[dir.path().to_path_buf(), single.clone()]).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a.PDF"), dir.path().join("b.pdf"), single]
        );
    }

    #[test]
    fn test_collect_pdfs_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.pdf");
        assert!(matches!(
            collect_pdfs(&[missing]),
            Err(BoxscanError::DocumentOpen { .. })
        ));
        assert!(collect_pdfs(&[dir.path().to_path_buf()]).unwrap().is_empty());
    }

    #[test]
    fn test_move_into() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("form.pdf");
        std::fs::write(&src, b"%PDF").unwrap();
        let scanned = dir.path().join("Scanned");

        let moved = move_into(&src, &scanned).unwrap();
        assert_eq!(moved, scanned.join("form.pdf"));
        assert!(!src.exists());

        std::fs::write(&src, b"%PDF").unwrap();
        assert!(move_into(&src, &scanned).is_err());
        assert!(src.exists());
    }

    #[test]
    fn test_serialized_error_field_is_optional() {
        let ok = DocumentExtraction {
            path: PathBuf::from("a.pdf"),
            pages: Vec::new(),
            error: None,
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(!json.contains("error"));
        let back: DocumentExtraction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ok);
    }
}
