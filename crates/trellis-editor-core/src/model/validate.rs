//! Structural invariant checks.

use super::block::Block;
use super::group::{BlockGroup, BlockGroupKind};
use super::path::BlockLocation;
use super::segment::SegmentKind;
use crate::error::{ModelError, Result};

/// Check the structural invariants of a document.
///
/// * the root is a `Document` group and no other `Document` is nested in it
/// * each paragraph holds at most one selection marker
/// * every table row has the same number of cells
/// * an image selection is the only selected content
pub fn validate(doc: &BlockGroup) -> Result<()> {
    if !doc.is_document() {
        return Err(ModelError::InvalidRoot(doc.kind.name()));
    }

    let mut error = None;
    let mut image_selected = false;
    let mut other_selected = false;

    doc.walk(&mut |loc: &BlockLocation, block: &Block| {
        if error.is_some() {
            return;
        }
        match block {
            Block::Paragraph(p) => {
                let count = p.segments.iter().filter(|s| s.is_marker()).count();
                if count > 1 {
                    error = Some(ModelError::DuplicateMarker {
                        location: loc.clone(),
                        count,
                    });
                }
                for segment in p.segments.iter().filter(|s| s.is_selected) {
                    match &segment.kind {
                        SegmentKind::Image(img) if img.is_selected_as_image_selection => {
                            image_selected = true
                        }
                        _ => other_selected = true,
                    }
                }
            }
            Block::Table(t) => {
                let cols = t.rows.first().map(|r| r.cells.len()).unwrap_or(0);
                if t.rows.iter().any(|r| r.cells.len() != cols) {
                    error = Some(ModelError::RaggedTable(loc.clone()));
                }
                if t.cell_selection_state().0 {
                    other_selected = true;
                }
            }
            Block::Group(g) => {
                if matches!(g.kind, BlockGroupKind::Document { .. }) {
                    error = Some(ModelError::NestedDocument(loc.as_group_path()));
                }
            }
            Block::Entity(e) => other_selected |= e.is_selected,
            Block::Divider(d) => other_selected |= d.is_selected,
        }
    });

    if let Some(err) = error {
        return Err(err);
    }
    if image_selected && other_selected {
        return Err(ModelError::ConflictingSelection);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, Table};

    #[test]
    fn test_valid_document() {
        let doc = BlockGroup::document().with_blocks(vec![
            Block::paragraph(vec![Segment::text("a"), Segment::marker()]),
            Block::Table(Table::new(2, 2)),
        ]);
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_two_markers_rejected() {
        let doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::marker(),
            Segment::text("a"),
            Segment::marker(),
        ])]);
        assert!(matches!(
            validate(&doc),
            Err(ModelError::DuplicateMarker { count: 2, .. })
        ));
    }

    #[test]
    fn test_nested_document_rejected() {
        let doc = BlockGroup::document().with_blocks(vec![Block::Group(BlockGroup::document())]);
        assert!(matches!(validate(&doc), Err(ModelError::NestedDocument(_))));
    }

    #[test]
    fn test_ragged_table_rejected() {
        let mut table = Table::new(2, 2);
        table.rows[0].cells.pop();
        let doc = BlockGroup::document().with_blocks(vec![Block::Table(table)]);
        assert!(matches!(validate(&doc), Err(ModelError::RaggedTable(_))));
    }

    #[test]
    fn test_non_document_root_rejected() {
        assert!(matches!(
            validate(&BlockGroup::quote()),
            Err(ModelError::InvalidRoot("FormatContainer"))
        ));
    }
}
