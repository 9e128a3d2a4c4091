//! On-disk template format.
//!
//! A template file is a JSON object keyed by `"page number: <n>"` (1-based),
//! each value a list of `{ "name": ..., "coords": [x1, y1, x2, y2] }` entries
//! in canonical raster pixels. Pages without regions are never written.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::error::BoxscanError;
use crate::geometry::Rect;
use crate::region::{Region, Template};

const PAGE_KEY_PREFIX: &str = "page number: ";

pub fn page_key(page_number: u32) -> String {
    format!("{PAGE_KEY_PREFIX}{page_number}")
}

/// Parse a `"page number: <n>"` key. Only positive decimal integers are
/// accepted.
pub fn parse_page_key(key: &str) -> Option<u32> {
    let digits = key.strip_prefix(PAGE_KEY_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

#[derive(Serialize)]
struct RegionEntry<'a> {
    name: &'a str,
    coords: [f64; 4],
}

struct TemplateFile<'a>(&'a Template);

impl Serialize for TemplateFile<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (page, regions) in self.0.iter_pages() {
            let entries: Vec<RegionEntry<'_>> = regions
                .iter()
                .map(|r| RegionEntry {
                    name: &r.name,
                    coords: r.rect.as_array(),
                })
                .collect();
            map.serialize_entry(&page_key(page), &entries)?;
        }
        map.end()
    }
}

/// Serialize a template to pretty JSON (4-space indent), pages in ascending
/// numeric order, empty pages dropped.
pub fn template_to_string(template: &Template) -> Result<String, BoxscanError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    TemplateFile(template).serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| BoxscanError::TemplateFormat(e.to_string()))
}

/// Write a template atomically: the JSON goes to a temporary file next to
/// `path` which is then renamed over it.
pub fn save_template(template: &Template, path: &Path) -> Result<(), BoxscanError> {
    let json = template_to_string(template)?;
    let save_err = |source: std::io::Error| BoxscanError::TemplateSave {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmpfile = tempfile::NamedTempFile::new_in(dir).map_err(save_err)?;
    tmpfile.write_all(json.as_bytes()).map_err(save_err)?;
    tmpfile.write_all(b"\n").map_err(save_err)?;
    tmpfile.as_file().sync_all().map_err(save_err)?;
    tmpfile.persist(path).map_err(|e| save_err(e.error))?;

    tracing::info!(
        path = %path.display(),
        regions = template.region_count(),
        "template saved"
    );
    Ok(())
}

/// Load a template from a JSON file.
pub fn load_template(path: &Path) -> Result<Template, BoxscanError> {
    let content = std::fs::read_to_string(path).map_err(|e| BoxscanError::TemplateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let template = parse_template_str(&content).map_err(|e| match e {
        BoxscanError::TemplateFormat(reason) => {
            BoxscanError::TemplateFormat(format!("{}: {reason}", path.display()))
        }
        other => other,
    })?;
    tracing::info!(
        path = %path.display(),
        regions = template.region_count(),
        "template loaded"
    );
    Ok(template)
}

/// Parse and validate a template from a JSON string.
pub fn parse_template_str(json: &str) -> Result<Template, BoxscanError> {
    let RawPages(pages) = serde_json::from_str(json).map_err(|e| {
        if e.is_data() {
            BoxscanError::TemplateFormat(e.to_string())
        } else {
            BoxscanError::TemplateFormat(format!("not valid JSON: {e}"))
        }
    })?;
    template_from_entries(&pages)
}

/// Top-level entries in file order. Repeated keys are all kept, unlike a
/// `serde_json::Map`.
struct RawPages(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawPages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawPagesVisitor;

        impl<'de> Visitor<'de> for RawPagesVisitor {
            type Value = RawPages;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a top-level object keyed by 'page number: <n>'")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawPages, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(RawPages(entries))
            }
        }

        deserializer.deserialize_map(RawPagesVisitor)
    }
}

fn template_from_entries(pages: &[(String, Value)]) -> Result<Template, BoxscanError> {
    let mut template = Template::new();
    let mut seen = std::collections::BTreeSet::new();

    for (key, entries) in pages {
        let page = parse_page_key(key).ok_or_else(|| {
            BoxscanError::TemplateFormat(format!(
                "key '{key}' does not match 'page number: <n>' with n >= 1"
            ))
        })?;
        if !seen.insert(page) {
            return Err(BoxscanError::TemplateFormat(format!(
                "page {page} appears more than once (key '{key}')"
            )));
        }

        let Value::Array(entries) = entries else {
            return Err(BoxscanError::TemplateFormat(format!(
                "'{key}' must be an array of regions, found {}",
                json_kind(entries)
            )));
        };

        for (idx, entry) in entries.iter().enumerate() {
            let region = region_from_value(entry)
                .map_err(|reason| BoxscanError::TemplateFormat(format!("'{key}'[{idx}]: {reason}")))?;
            template.insert(page, region);
        }
    }

    Ok(template)
}

fn region_from_value(entry: &Value) -> Result<Region, String> {
    let Value::Object(fields) = entry else {
        return Err(format!("region must be an object, found {}", json_kind(entry)));
    };

    let name = match fields.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err("'name' must not be empty".into()),
        Some(other) => return Err(format!("'name' must be a string, found {}", json_kind(other))),
        None => return Err("missing field 'name'".into()),
    };

    let coords = match fields.get("coords") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(format!(
                "'coords' must be an array of 4 numbers, found {}",
                json_kind(other)
            ))
        }
        None => return Err("missing field 'coords'".into()),
    };
    if coords.len() != 4 {
        return Err(format!(
            "'coords' must have exactly 4 numbers, found {}",
            coords.len()
        ));
    }

    let mut c = [0.0_f64; 4];
    for (slot, item) in c.iter_mut().zip(coords) {
        *slot = item
            .as_f64()
            .ok_or_else(|| format!("'coords' must contain only numbers, found {}", json_kind(item)))?;
    }

    let rect = Rect::new(c[0], c[1], c[2], c[3]);
    Region::new(name, rect).ok_or_else(|| format!("'coords' {c:?} describe an empty rectangle"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Template {
        let mut t = Template::new();
        t.insert(
            2,
            Region::new("invoice_no", Rect::new(100.0, 100.0, 200.0, 150.0)).unwrap(),
        );
        t.insert(
            2,
            Region::new("total", Rect::new(300.5, 700.25, 420.0, 720.0)).unwrap(),
        );
        t.insert(
            10,
            Region::new("signature", Rect::new(50.0, 600.0, 250.0, 650.0)).unwrap(),
        );
        t
    }

    #[test]
    fn test_page_key_parsing() {
        assert_eq!(parse_page_key("page number: 1"), Some(1));
        assert_eq!(parse_page_key("page number: 42"), Some(42));
        assert_eq!(parse_page_key("page number: 0"), None);
        assert_eq!(parse_page_key("page number: -1"), None);
        assert_eq!(parse_page_key("page number: 1.5"), None);
        assert_eq!(parse_page_key("page number: "), None);
        assert_eq!(parse_page_key("page 1"), None);
        assert_eq!(parse_page_key("Page number: 1"), None);
    }

    #[test]
    fn test_string_round_trip_drops_empty_pages() {
        let mut t = sample();
        t.insert(5, Region::new("x", Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap());
        t.clear_page(5);

        let json = template_to_string(&t).unwrap();
        assert!(!json.contains("page number: 5"));
        let back = parse_template_str(&json).unwrap();
        assert_eq!(back, t.without_empty_pages());
    }

    #[test]
    fn test_pages_written_in_numeric_order() {
        let json = template_to_string(&sample()).unwrap();
        let p2 = json.find("page number: 2").unwrap();
        let p10 = json.find("page number: 10").unwrap();
        assert!(p2 < p10);
        assert!(json.contains("\n    \"page number: 2\": ["));
    }

    #[test]
    fn test_parses_integer_coords_in_any_corner_order() {
        let json = r#"{
    "page number: 1": [
        {
            "name": "Customer",
            "coords": [
                412,
                96.5,
                130,
                80
            ]
        }
    ]
}"#;
        let t = parse_template_str(json).unwrap();
        let r = &t.regions(1)[0];
        assert_eq!(r.name, "Customer");
        assert_eq!(r.rect, Rect::new(130.0, 80.0, 412.0, 96.5));
    }

    #[test]
    fn test_loaded_names_are_trimmed() {
        let json = r#"{"page number: 1": [{"name": " total ", "coords": [0, 0, 1, 1]}]}"#;
        let t = parse_template_str(json).unwrap();
        assert_eq!(t.regions(1)[0].name, "total");
    }

    #[test]
    fn test_unknown_region_keys_ignored() {
        let json = r#"{"page number: 3": [{"name": "a", "coords": [0, 0, 1, 1], "color": "red"}]}"#;
        let t = parse_template_str(json).unwrap();
        assert_eq!(t.regions(3).len(), 1);
    }

    #[test]
    fn test_empty_page_array_loads_as_absent() {
        let t = parse_template_str(r#"{"page number: 1": []}"#).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.pages().count(), 0);
    }

    fn format_error(json: &str) -> String {
        match parse_template_str(json) {
            Err(BoxscanError::TemplateFormat(msg)) => msg,
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_object_top_level() {
        assert!(format_error("[]").contains("top-level"));
        assert!(format_error("null").contains("top-level"));
        assert!(format_error("{not json").contains("not valid JSON"));
    }

    #[test]
    fn test_rejects_bad_page_keys() {
        assert!(format_error(r#"{"page 1": []}"#).contains("page 1"));
        assert!(format_error(r#"{"page number: 0": []}"#).contains("page number: 0"));
        let msg = format_error(r#"{"page number: 1": [], "page number: 01": []}"#);
        assert!(msg.contains("more than once"));
    }

    #[test]
    fn test_rejects_repeated_identical_page_key() {
        let json = r#"{
            "page number: 1": [{"name": "a", "coords": [0, 0, 1, 1]}],
            "page number: 1": [{"name": "b", "coords": [0, 0, 2, 2]}]
        }"#;
        let msg = format_error(json);
        assert!(msg.contains("page 1 appears more than once"), "{msg}");
    }

    #[test]
    fn test_rejects_malformed_regions_with_location() {
        let msg = format_error(r#"{"page number: 2": [{"name": "a", "coords": [0, 0, 1, 1]}, {"coords": [0, 0, 1, 1]}]}"#);
        assert!(msg.contains("'page number: 2'[1]"), "{msg}");
        assert!(msg.contains("missing field 'name'"), "{msg}");

        let msg = format_error(r#"{"page number: 1": [{"name": "a"}]}"#);
        assert!(msg.contains("missing field 'coords'"), "{msg}");

        let msg = format_error(r#"{"page number: 1": [{"name": "a", "coords": [0, 0, 1]}]}"#);
        assert!(msg.contains("exactly 4"), "{msg}");

        let msg = format_error(r#"{"page number: 1": [{"name": "a", "coords": [0, "0", 1, 1]}]}"#);
        assert!(msg.contains("only numbers"), "{msg}");

        let msg = format_error(r#"{"page number: 1": [{"name": 7, "coords": [0, 0, 1, 1]}]}"#);
        assert!(msg.contains("'name' must be a string"), "{msg}");

        let msg = format_error(r#"{"page number: 1": {"name": "a"}}"#);
        assert!(msg.contains("must be an array"), "{msg}");

        let msg = format_error(r#"{"page number: 1": [{"name": "a", "coords": [5, 0, 5, 9]}]}"#);
        assert!(msg.contains("empty rectangle"), "{msg}");
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.json");
        let t = sample();

        save_template(&t, &path).unwrap();
        let loaded = load_template(&path).unwrap();
        assert_eq!(loaded, t);

        // Saving again overwrites in place and leaves no stray temp files.
        save_template(&Template::new(), &path).unwrap();
        assert!(load_template(&path).unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_to_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("t.json");
        let err = save_template(&sample(), &path).unwrap_err();
        assert!(matches!(err, BoxscanError::TemplateSave { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_keeps_format_and_read_errors_apart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        match load_template(&path) {
            Err(BoxscanError::TemplateFormat(msg)) => {
                assert!(msg.contains("bad.json"), "{msg}");
                assert!(msg.contains("top-level"), "{msg}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            load_template(&dir.path().join("nope.json")),
            Err(BoxscanError::TemplateLoad { .. })
        ));
    }
}
