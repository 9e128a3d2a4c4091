use crate::geometry::{PageSize, Rect};

/// A positioned word of the document's text layer, in document points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextWord {
    pub text: String,
    pub bbox: Rect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub words: Vec<TextWord>,
}

/// Text layer of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPage {
    pub size: PageSize,
    pub lines: Vec<TextLine>,
}

impl TextPage {
    pub fn new(size: PageSize) -> Self {
        TextPage {
            size,
            lines: Vec::new(),
        }
    }

    /// Text of every word whose box overlaps `clip`.
    ///
    /// Words are kept whole even when only partly inside. Kept words of one
    /// line are joined with a space, lines with a newline; lines with no kept
    /// word are dropped.
    pub fn text_in_rect(&self, clip: &Rect) -> String {
        self.lines
            .iter()
            .filter_map(|line| {
                let kept: Vec<&str> = line
                    .words
                    .iter()
                    .filter(|w| w.bbox.overlaps(clip))
                    .map(|w| w.text.as_str())
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(kept.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
