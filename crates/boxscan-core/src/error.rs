use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BoxscanError {
    #[error("failed to open document {path}: {reason}")]
    DocumentOpen { path: PathBuf, reason: String },

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftoppm not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftoppmNotFound,

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("invalid template: {0}")]
    TemplateFormat(String),

    #[error("failed to load template from {path}: {reason}")]
    TemplateLoad { path: PathBuf, reason: String },

    #[error("failed to save template to {path}: {source}")]
    TemplateSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("invalid zoom factor {0} (must be a finite number above zero)")]
    InvalidZoom(f64),

    #[error("{failed} of {total} documents could not be extracted")]
    BatchIncomplete { failed: usize, total: usize },

    #[error("failed to load config from {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
