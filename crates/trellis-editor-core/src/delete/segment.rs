//! Segment-level helpers shared by the delete steps.

use unicode_segmentation::UnicodeSegmentation;

use crate::execute::{DeletedEntity, EntityRemoval, FormatContext};
use crate::model::{Paragraph, Segment, SegmentKind};

/// Record `segment` in the context if it is an entity.
pub(super) fn record_removed(
    context: &mut FormatContext,
    segment: &Segment,
    removal: EntityRemoval,
) {
    if let Some(entity) = segment.as_entity() {
        tracing::debug!(
            target: "trellis::delete",
            id = %entity.id,
            entity_type = %entity.entity_type,
            ?removal,
            "entity deleted"
        );
        context.deleted_entities.push(DeletedEntity {
            entity: entity.clone(),
            removal,
        });
    }
}

/// Remove one grapheme cluster from the start or end of `text`.
pub(super) fn remove_grapheme(text: &mut String, from_start: bool) -> bool {
    let range = if from_start {
        text.grapheme_indices(true)
            .next()
            .map(|(i, g)| i..i + g.len())
    } else {
        text.grapheme_indices(true)
            .next_back()
            .map(|(i, g)| i..i + g.len())
    };
    match range {
        Some(range) => {
            text.replace_range(range, "");
            true
        }
        None => false,
    }
}

/// A trailing `Br` that only keeps the last line open: the paragraph ends in
/// `Br` and the visible segment before it is not another `Br`.
pub(super) fn has_invisible_trailing_br(paragraph: &Paragraph) -> bool {
    if !paragraph.segments.last().is_some_and(Segment::is_br) {
        return false;
    }
    let visible: Vec<&Segment> = paragraph
        .segments
        .iter()
        .filter(|s| !s.is_marker())
        .collect();
    !(visible.len() >= 2 && visible[visible.len() - 2].is_br())
}

pub(super) fn pop_invisible_trailing_br(paragraph: &mut Paragraph) {
    if has_invisible_trailing_br(paragraph) {
        paragraph.segments.pop();
    }
}

/// Delete a single unit of the segment at `index`: one grapheme of text, or
/// the whole segment otherwise. When text runs out, the caret marker at
/// `marker_index` inherits its format.
pub(super) fn delete_unit(
    paragraph: &mut Paragraph,
    index: usize,
    marker_index: usize,
    forward: bool,
    context: &mut FormatContext,
) -> bool {
    let Some(segment) = paragraph.segments.get_mut(index) else {
        return false;
    };
    match &mut segment.kind {
        SegmentKind::SelectionMarker => false,
        SegmentKind::Text(text) => {
            if !remove_grapheme(text, forward) {
                return false;
            }
            if text.is_empty() {
                let removed = paragraph.segments.remove(index);
                let marker_index = if index < marker_index {
                    marker_index - 1
                } else {
                    marker_index
                };
                if let Some(marker) = paragraph.segments.get_mut(marker_index) {
                    marker.format = removed.format;
                }
            }
            true
        }
        _ => {
            let removed = paragraph.segments.remove(index);
            let removal = if forward {
                EntityRemoval::RemoveFromStart
            } else {
                EntityRemoval::RemoveFromEnd
            };
            record_removed(context, &removed, removal);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_grapheme_keeps_clusters_whole() {
        let mut text = String::from("ae\u{301}");
        assert!(remove_grapheme(&mut text, false));
        assert_eq!(text, "a");

        let mut flag = String::from("🇫🇷x");
        assert!(remove_grapheme(&mut flag, true));
        assert_eq!(flag, "x");

        let mut empty = String::new();
        assert!(!remove_grapheme(&mut empty, true));
    }

    #[test]
    fn test_invisible_trailing_br() {
        let p = Paragraph::with_segments(vec![
            Segment::text("a"),
            Segment::marker(),
            Segment::br(),
        ]);
        assert!(has_invisible_trailing_br(&p));

        let p = Paragraph::with_segments(vec![
            Segment::text("a"),
            Segment::br(),
            Segment::marker(),
            Segment::br(),
        ]);
        assert!(!has_invisible_trailing_br(&p));

        let p = Paragraph::with_segments(vec![Segment::marker(), Segment::br()]);
        assert!(has_invisible_trailing_br(&p));
    }
}
