use proptest::prelude::*;
use proptest::sample::Index;
use trellis_editor_core::model::normalize_paragraph;
use trellis_editor_core::{
    Block, BlockGroup, BlockLocation, Document, InsertPoint, ModelPosition, Paragraph, Segment,
    SegmentFormat, SelectionContext, merge_paragraphs, normalize, set_selection,
    split_paragraph,
};

fn text_segment() -> impl Strategy<Value = Segment> {
    ("[a-z ]{1,6}", any::<bool>()).prop_map(|(text, bold)| {
        let segment = Segment::text(text);
        if bold {
            segment.with_format(SegmentFormat {
                font_weight: Some("bold".into()),
                ..Default::default()
            })
        } else {
            segment
        }
    })
}

fn inline_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![4 => text_segment(), 1 => Just(Segment::br())]
}

fn document() -> impl Strategy<Value = Document> {
    prop::collection::vec(prop::collection::vec(text_segment(), 1..5), 1..5).prop_map(|paras| {
        BlockGroup::document().with_blocks(paras.into_iter().map(Block::paragraph).collect())
    })
}

fn count_markers(doc: &Document) -> usize {
    doc.blocks
        .iter()
        .filter_map(Block::as_paragraph)
        .map(|p| p.segments.iter().filter(|s| s.is_marker()).count())
        .sum()
}

fn caret_in(doc: &Document, para: Index, segment: Index, offset: Index) -> SelectionContext {
    let block = para.index(doc.blocks.len());
    let p = doc.blocks[block].as_paragraph().expect("generated paragraphs only");
    let index = segment.index(p.segments.len() + 1);
    let offset = p
        .segments
        .get(index)
        .and_then(Segment::as_text)
        .map(|t| offset.index(t.chars().count() + 1))
        .unwrap_or(0);
    SelectionContext::caret(ModelPosition::in_text(
        BlockLocation::top(block),
        index,
        offset,
    ))
}

proptest! {
    #[test]
    fn test_caret_leaves_exactly_one_marker(
        mut doc in document(),
        first in any::<(Index, Index, Index)>(),
        second in any::<(Index, Index, Index)>(),
    ) {
        let caret = caret_in(&doc, first.0, first.1, first.2);
        set_selection(&mut doc, Some(&caret)).expect("caret inside the document");
        prop_assert_eq!(count_markers(&doc), 1);

        let caret = caret_in(&doc, second.0, second.1, second.2);
        set_selection(&mut doc, Some(&caret)).expect("caret inside the document");
        prop_assert_eq!(count_markers(&doc), 1);
    }

    #[test]
    fn test_normalize_is_idempotent(
        paras in prop::collection::vec(
            (prop::collection::vec(inline_segment(), 0..6), any::<Option<Index>>()),
            0..5,
        ),
    ) {
        let blocks = paras
            .into_iter()
            .map(|(mut segments, marker)| {
                if let Some(at) = marker {
                    let at = at.index(segments.len() + 1);
                    segments.insert(at, Segment::marker());
                }
                Block::paragraph(segments)
            })
            .collect();
        let mut doc = BlockGroup::document().with_blocks(blocks);
        normalize(&mut doc);
        let once = doc.clone();
        normalize(&mut doc);
        prop_assert_eq!(doc, once);
    }

    #[test]
    fn test_split_then_merge_restores_paragraph(
        segments in prop::collection::vec(text_segment(), 1..6),
        at in any::<Index>(),
    ) {
        let marker_index = 1 + at.index(segments.len());
        let mut segments = segments;
        segments.insert(marker_index, Segment::marker());
        let mut expected = Paragraph::with_segments(segments.clone());
        normalize_paragraph(&mut expected);

        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(segments)]);
        let insert_point = InsertPoint {
            paragraph: BlockLocation::top(0),
            marker_index,
        };
        let second = split_paragraph(&mut doc, &insert_point).expect("split");
        prop_assert_eq!(doc.blocks.len(), 2);
        merge_paragraphs(&mut doc, &BlockLocation::top(0), &second).expect("merge");

        prop_assert_eq!(doc.blocks.len(), 1);
        let mut merged = doc.blocks[0].as_paragraph().expect("paragraph").clone();
        normalize_paragraph(&mut merged);
        prop_assert_eq!(merged.segments, expected.segments);
    }
}
