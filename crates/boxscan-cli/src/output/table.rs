use boxscan_core::batch::DocumentExtraction;
use boxscan_core::extraction::{format_fields, FieldValue, PageExtraction};
use boxscan_core::region::Template;

pub fn print(documents: &[DocumentExtraction]) {
    print!("{}", format_documents(documents));
}

pub fn format_documents(documents: &[DocumentExtraction]) -> String {
    let mut out = String::new();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("##### {} #####\n\n", doc.path.display()));
        match &doc.error {
            Some(err) => out.push_str(&format!("Error: {err}\n")),
            None => out.push_str(&format_extraction(&doc.pages)),
        }
    }
    if documents.is_empty() {
        out.push_str("No documents to scan.\n");
    }
    out
}

pub fn format_extraction(pages: &[PageExtraction]) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("=== Page {} ===\n\n", page.page_number));
        // Multi-line values are indented under their field name.
        let fields: Vec<FieldValue> = page
            .fields
            .iter()
            .map(|f| FieldValue {
                name: f.name.clone(),
                text: f.text.replace('\n', "\n    "),
            })
            .collect();
        out.push_str(&format_fields(&fields));
    }
    if pages.is_empty() {
        out.push_str("No fields extracted.\n");
    }
    out
}

pub fn format_template(template: &Template) -> String {
    let mut out = String::new();
    for page in template.pages() {
        let regions = template.regions(page);
        out.push_str(&format!("Page {} ({} regions)\n", page, regions.len()));

        let width = regions.iter().map(|r| r.name.len()).max().unwrap_or(4);
        for r in regions {
            out.push_str(&format!(
                "  {:<width$}  ({:.1}, {:.1}) - ({:.1}, {:.1})  {:.1} x {:.1}\n",
                r.name,
                r.rect.x1,
                r.rect.y1,
                r.rect.x2,
                r.rect.y2,
                r.rect.width(),
                r.rect.height(),
                width = width
            ));
        }
    }
    if out.is_empty() {
        out.push_str("Template has no regions.\n");
    }
    out
}
