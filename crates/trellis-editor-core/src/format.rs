//! Format records attached to model nodes.
//!
//! Every field is optional: `None` means "inherit". CSS-like values are kept
//! as strings so the records stay hashable and round-trip through serde.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Character-level format of a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentFormat {
    pub font_family: Option<SmolStr>,
    pub font_size: Option<SmolStr>,
    pub font_weight: Option<SmolStr>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub superscript: Option<bool>,
    pub subscript: Option<bool>,
    pub text_color: Option<SmolStr>,
    pub background_color: Option<SmolStr>,
}

impl SegmentFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// CSS declarations for this format, in a stable order.
    pub fn css_declarations(&self) -> Vec<(&'static str, SmolStr)> {
        let mut out = Vec::new();
        if let Some(v) = &self.font_family {
            out.push(("font-family", v.clone()));
        }
        if let Some(v) = &self.font_size {
            out.push(("font-size", v.clone()));
        }
        if let Some(v) = &self.font_weight {
            out.push(("font-weight", v.clone()));
        }
        if let Some(italic) = self.italic {
            let v = if italic { "italic" } else { "normal" };
            out.push(("font-style", SmolStr::new_static(v)));
        }
        let mut decorations = Vec::new();
        if self.underline == Some(true) {
            decorations.push("underline");
        }
        if self.strikethrough == Some(true) {
            decorations.push("line-through");
        }
        if !decorations.is_empty() {
            out.push(("text-decoration", SmolStr::new(decorations.join(" "))));
        }
        if self.superscript == Some(true) {
            out.push(("vertical-align", SmolStr::new_static("super")));
        } else if self.subscript == Some(true) {
            out.push(("vertical-align", SmolStr::new_static("sub")));
        }
        if let Some(v) = &self.text_color {
            out.push(("color", v.clone()));
        }
        if let Some(v) = &self.background_color {
            out.push(("background-color", v.clone()));
        }
        out
    }
}

/// Block-level format of a paragraph or block group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParagraphFormat {
    pub direction: Option<SmolStr>,
    pub text_align: Option<SmolStr>,
    pub line_height: Option<SmolStr>,
    pub margin_top: Option<SmolStr>,
    pub margin_bottom: Option<SmolStr>,
    pub margin_left: Option<SmolStr>,
    pub margin_right: Option<SmolStr>,
    pub padding_left: Option<SmolStr>,
    pub text_indent: Option<SmolStr>,
    pub white_space: Option<SmolStr>,
    pub background_color: Option<SmolStr>,
}

impl ParagraphFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn css_declarations(&self) -> Vec<(&'static str, SmolStr)> {
        let fields: [(&'static str, &Option<SmolStr>); 11] = [
            ("direction", &self.direction),
            ("text-align", &self.text_align),
            ("line-height", &self.line_height),
            ("margin-top", &self.margin_top),
            ("margin-bottom", &self.margin_bottom),
            ("margin-left", &self.margin_left),
            ("margin-right", &self.margin_right),
            ("padding-left", &self.padding_left),
            ("text-indent", &self.text_indent),
            ("white-space", &self.white_space),
            ("background-color", &self.background_color),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone())))
            .collect()
    }
}

/// Heading or other tag that overrides the default paragraph element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphDecorator {
    pub tag_name: SmolStr,
    pub format: SegmentFormat,
}

impl ParagraphDecorator {
    pub fn new(tag_name: impl Into<SmolStr>) -> Self {
        Self {
            tag_name: tag_name.into(),
            format: SegmentFormat::default(),
        }
    }
}

/// Ordered or unordered marker of a single list level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListType {
    #[serde(rename = "OL")]
    Ordered,
    #[serde(rename = "UL")]
    Unordered,
}

impl ListType {
    pub fn tag_name(self) -> &'static str {
        match self {
            ListType::Ordered => "ol",
            ListType::Unordered => "ul",
        }
    }
}

/// One nesting level of a list item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLevel {
    pub list_type: ListType,
    #[serde(default)]
    pub start_number: Option<u32>,
    #[serde(default)]
    pub list_style_type: Option<SmolStr>,
    #[serde(default)]
    pub margin_left: Option<SmolStr>,
}

impl ListLevel {
    pub fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            start_number: None,
            list_style_type: None,
            margin_left: None,
        }
    }
}

/// Table-level format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableFormat {
    pub use_border_box: Option<bool>,
    pub border_collapse: Option<bool>,
    pub width: Option<SmolStr>,
    pub background_color: Option<SmolStr>,
    pub margin_left: Option<SmolStr>,
}

impl TableFormat {
    /// Format a table is reset to when its whole content is cleared.
    pub fn cleared() -> Self {
        Self {
            use_border_box: Some(true),
            border_collapse: Some(true),
            ..Default::default()
        }
    }

    pub fn css_declarations(&self) -> Vec<(&'static str, SmolStr)> {
        let mut out = Vec::new();
        if self.use_border_box == Some(true) {
            out.push(("box-sizing", SmolStr::new_static("border-box")));
        }
        if self.border_collapse == Some(true) {
            out.push(("border-collapse", SmolStr::new_static("collapse")));
        }
        if let Some(v) = &self.width {
            out.push(("width", v.clone()));
        }
        if let Some(v) = &self.background_color {
            out.push(("background-color", v.clone()));
        }
        if let Some(v) = &self.margin_left {
            out.push(("margin-left", v.clone()));
        }
        out
    }
}

/// Table cell format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableCellFormat {
    pub use_border_box: Option<bool>,
    pub background_color: Option<SmolStr>,
    pub text_align: Option<SmolStr>,
    pub vertical_align: Option<SmolStr>,
    pub border_top: Option<SmolStr>,
    pub border_bottom: Option<SmolStr>,
    pub border_left: Option<SmolStr>,
    pub border_right: Option<SmolStr>,
    pub width: Option<SmolStr>,
}

impl TableCellFormat {
    pub fn cleared() -> Self {
        Self {
            use_border_box: Some(true),
            ..Default::default()
        }
    }

    pub fn css_declarations(&self) -> Vec<(&'static str, SmolStr)> {
        let mut out = Vec::new();
        if self.use_border_box == Some(true) {
            out.push(("box-sizing", SmolStr::new_static("border-box")));
        }
        let fields: [(&'static str, &Option<SmolStr>); 8] = [
            ("background-color", &self.background_color),
            ("text-align", &self.text_align),
            ("vertical-align", &self.vertical_align),
            ("border-top", &self.border_top),
            ("border-bottom", &self.border_bottom),
            ("border-left", &self.border_left),
            ("border-right", &self.border_right),
            ("width", &self.width),
        ];
        out.extend(
            fields
                .into_iter()
                .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone()))),
        );
        out
    }
}

/// Hyperlink associated with a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub href: SmolStr,
    #[serde(default)]
    pub target: Option<SmolStr>,
    #[serde(default)]
    pub title: Option<SmolStr>,
}

impl Link {
    pub fn new(href: impl Into<SmolStr>) -> Self {
        Self {
            href: href.into(),
            target: None,
            title: None,
        }
    }
}
