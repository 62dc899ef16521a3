//! Inline segments: the children of a paragraph.

use smol_str::SmolStr;

use super::RenderNodeId;
use crate::format::{Link, SegmentFormat};

/// Zero-width space used to hold a caret next to an entity.
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// An opaque, host-managed object embedded in the document.
///
/// The model never looks inside the wrapper; it only moves, deletes and
/// re-parents the entity as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    pub id: SmolStr,
    pub entity_type: SmolStr,
    pub is_readonly: bool,
    /// Render node owned by the host. The model holds a reference only.
    pub wrapper: RenderNodeId,
}

impl Entity {
    pub fn new(
        id: impl Into<SmolStr>,
        entity_type: impl Into<SmolStr>,
        is_readonly: bool,
        wrapper: RenderNodeId,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            is_readonly,
            wrapper,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Image {
    pub src: SmolStr,
    pub alt: Option<SmolStr>,
    /// Set when the image is the target of an image selection rather than
    /// being covered by a text range.
    pub is_selected_as_image_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text(String),
    Br,
    Image(Image),
    Entity(Entity),
    /// Host element the model does not understand, kept verbatim.
    General(RenderNodeId),
    /// Zero-width caret placeholder. At most one per paragraph.
    SelectionMarker,
}

/// One inline child of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub kind: SegmentKind,
    pub format: SegmentFormat,
    pub is_selected: bool,
    pub link: Option<Link>,
}

impl Segment {
    pub fn new(kind: SegmentKind) -> Self {
        Self {
            kind,
            format: SegmentFormat::default(),
            is_selected: false,
            link: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Text(text.into()))
    }

    pub fn br() -> Self {
        Self::new(SegmentKind::Br)
    }

    /// A selected caret marker.
    pub fn marker() -> Self {
        Self {
            is_selected: true,
            ..Self::new(SegmentKind::SelectionMarker)
        }
    }

    pub fn image(src: impl Into<SmolStr>) -> Self {
        Self::new(SegmentKind::Image(Image {
            src: src.into(),
            alt: None,
            is_selected_as_image_selection: false,
        }))
    }

    pub fn entity(entity: Entity) -> Self {
        Self::new(SegmentKind::Entity(entity))
    }

    pub fn general(element: RenderNodeId) -> Self {
        Self::new(SegmentKind::General(element))
    }

    pub fn with_format(mut self, format: SegmentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.link = Some(link);
        self
    }

    pub fn selected(mut self) -> Self {
        self.is_selected = true;
        self
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.kind, SegmentKind::SelectionMarker)
    }

    pub fn is_br(&self) -> bool {
        matches!(self.kind, SegmentKind::Br)
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match &self.kind {
            SegmentKind::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Number of caret positions inside this segment. Text counts chars,
    /// everything else is a single atomic unit or (for a marker) nothing.
    pub fn len(&self) -> usize {
        match &self.kind {
            SegmentKind::Text(t) => t.chars().count(),
            SegmentKind::SelectionMarker => 0,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two neighbouring text segments can be merged into one.
    pub fn can_merge_with(&self, other: &Segment) -> bool {
        matches!(
            (&self.kind, &other.kind),
            (SegmentKind::Text(_), SegmentKind::Text(_))
        ) && self.format == other.format
            && self.link == other.link
            && self.is_selected == other.is_selected
    }
}

/// Split the text segment at `char_offset`, returning the right half.
///
/// The left half stays in `segment`. Returns `None` when the segment is not
/// text or the offset is at either end.
pub(crate) fn split_text_segment(segment: &mut Segment, char_offset: usize) -> Option<Segment> {
    let SegmentKind::Text(text) = &mut segment.kind else {
        return None;
    };
    let len = text.chars().count();
    if char_offset == 0 || char_offset >= len {
        return None;
    }
    let byte = text
        .char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    let right = text.split_off(byte);
    Some(Segment {
        kind: SegmentKind::Text(right),
        format: segment.format.clone(),
        is_selected: segment.is_selected,
        link: segment.link.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_text_segment() {
        let mut seg = Segment::text("héllo").selected();
        let right = split_text_segment(&mut seg, 2).unwrap();
        assert_eq!(seg.as_text(), Some("hé"));
        assert_eq!(right.as_text(), Some("llo"));
        assert!(right.is_selected);
    }

    #[test]
    fn test_split_at_edges_is_noop() {
        let mut seg = Segment::text("ab");
        assert!(split_text_segment(&mut seg, 0).is_none());
        assert!(split_text_segment(&mut seg, 2).is_none());
        assert_eq!(seg.as_text(), Some("ab"));
    }

    #[test]
    fn test_atomic_lengths() {
        assert_eq!(Segment::marker().len(), 0);
        assert_eq!(Segment::br().len(), 1);
        assert_eq!(Segment::image("a.png").len(), 1);
        assert_eq!(Segment::text("abc").len(), 3);
    }
}
