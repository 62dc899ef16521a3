use trellis_editor_dom::telemetry::{default_level, init_tracing};
use trellis_editor_dom::{
    Block, BlockGroup, ChangeSource, Editor, EditorOptions, Entity, EntityOperation,
    ExperimentalFeature, InputEvent, InputType, Key, KeyboardEvent, KeydownResult, MemoryTree,
    Notification, RenderNodeId, RenderTree, Segment, TreePosition, TreeSelection,
};

fn editor_with(build: impl FnOnce(&mut MemoryTree) -> Vec<Block>) -> Editor<MemoryTree> {
    editor_with_options(EditorOptions::default(), build)
}

fn editor_with_options(
    options: EditorOptions,
    build: impl FnOnce(&mut MemoryTree) -> Vec<Block>,
) -> Editor<MemoryTree> {
    init_tracing(default_level());
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let blocks = build(&mut tree);
    Editor::new(
        tree,
        root,
        BlockGroup::document().with_blocks(blocks),
        options,
    )
    .expect("valid document")
}

/// `[p "a", block entity, p "b"]` with the host caret inside one of the
/// entity's delimiters.
fn block_entity_with_caret_in_delimiter(before: bool) -> (Editor<MemoryTree>, RenderNodeId) {
    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with(|tree| {
        wrapper = tree.create_element("div");
        vec![
            Block::paragraph(vec![Segment::text("a")]),
            Block::entity(mention(wrapper)),
            Block::paragraph(vec![Segment::marker(), Segment::text("b")]),
        ]
    });
    let delimiter = if before {
        editor.tree().previous_sibling(wrapper)
    } else {
        editor.tree().next_sibling(wrapper)
    }
    .expect("delimiter beside block entity");
    let text = editor.tree().first_child(delimiter).expect("delimiter text");
    editor
        .tree_mut()
        .set_selection(Some(TreeSelection::caret(TreePosition::new(text, 1))));
    (editor, wrapper)
}

fn assert_new_line_at(editor: &Editor<MemoryTree>, index: usize) {
    let paragraph = editor.model().blocks[index]
        .as_paragraph()
        .expect("new paragraph beside the entity");
    assert!(!paragraph.is_implicit);
    assert!(paragraph.segments[0].is_br());
    assert!(paragraph.segments[1].is_marker());
}

fn html(editor: &Editor<MemoryTree>) -> String {
    editor.tree().inner_html(editor.root())
}

fn mention(wrapper: RenderNodeId) -> Entity {
    Entity::new("m1", "mention", true, wrapper)
}

#[test]
fn test_backspace_inside_text_is_left_to_host() {
    let mut editor = editor_with(|_| {
        vec![Block::paragraph(vec![
            Segment::text("hello"),
            Segment::marker(),
        ])]
    });
    let result = editor
        .handle_keydown(&KeyboardEvent::new(Key::Backspace))
        .unwrap();
    assert_eq!(result, KeydownResult::PassThrough);
    assert!(editor.sink().notifications.is_empty());
}

#[test]
fn test_backspace_at_paragraph_start_merges() {
    let mut editor = editor_with(|_| {
        vec![
            Block::paragraph(vec![Segment::text("ab")]),
            Block::paragraph(vec![Segment::marker(), Segment::text("cd")]),
        ]
    });
    let result = editor
        .handle_keydown(&KeyboardEvent::new(Key::Backspace))
        .unwrap();

    assert_eq!(result, KeydownResult::Handled);
    assert_eq!(editor.model().blocks.len(), 1);
    insta::assert_snapshot!(html(&editor), @"<div><span>ab</span><span>cd</span></div>");
    assert_eq!(editor.sink().count_before_keyboard_editing(), 1);
    assert!(matches!(
        editor.sink().notifications.last(),
        Some(Notification::ContentChanged {
            source: ChangeSource::Keyboard,
            ..
        })
    ));
    assert!(editor.tree().selection().is_some_and(|s| s.is_collapsed()));
}

#[test]
fn test_backspace_at_document_start_is_swallowed() {
    let mut editor = editor_with(|_| {
        vec![Block::paragraph(vec![Segment::marker(), Segment::text("ab")])]
    });
    let result = editor
        .handle_keydown(&KeyboardEvent::new(Key::Backspace))
        .unwrap();

    assert_eq!(result, KeydownResult::Handled);
    let paragraph = editor.model().blocks[0].as_paragraph().unwrap();
    assert!(paragraph.segments.iter().any(|s| s.as_text() == Some("ab")));
    assert!(editor.sink().notifications.is_empty());
}

#[test]
fn test_forward_delete_input_merges_next_paragraph() {
    let mut editor = editor_with(|_| {
        vec![
            Block::paragraph(vec![Segment::text("ab"), Segment::marker()]),
            Block::paragraph(vec![Segment::text("cd")]),
        ]
    });
    let typing = InputEvent::new(InputType::InsertText);
    assert_eq!(
        editor.handle_beforeinput(&typing).unwrap(),
        KeydownResult::NotHandled
    );

    let delete = InputEvent::new(InputType::DeleteContentForward);
    let result = editor.handle_beforeinput(&delete).unwrap();
    assert_eq!(result, KeydownResult::Handled);
    assert_eq!(editor.model().blocks.len(), 1);
    assert_eq!(editor.sink().count_before_keyboard_editing(), 1);
}

#[test]
fn test_delimiters_removed_with_their_block_entity() {
    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with(|tree| {
        wrapper = tree.create_element("div");
        vec![
            Block::paragraph(vec![Segment::text("a")]),
            Block::entity(mention(wrapper)),
        ]
    });
    let container = editor.tree().parent(wrapper).expect("entity container");
    assert_eq!(editor.tree().children(container).len(), 3);

    editor.tree_mut().detach(wrapper).unwrap();
    let scan = editor.on_content_changed().unwrap();

    assert_eq!(scan.removed.len(), 2);
    assert!(scan.added.is_empty());
    assert!(editor.tree().children(container).is_empty());
}

#[test]
fn test_text_typed_into_delimiter_moves_into_model() {
    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with(|tree| {
        wrapper = tree.create_element("span");
        vec![Block::paragraph(vec![
            Segment::text("hi"),
            Segment::entity(mention(wrapper)),
        ])]
    });
    let after = editor.tree().next_sibling(wrapper).expect("after delimiter");
    let text = editor.tree().first_child(after).expect("delimiter text");
    editor.tree_mut().set_text(text, "\u{200B}x").unwrap();

    let scan = editor.on_content_changed().unwrap();
    assert_eq!(scan.excised.len(), 1);

    let paragraph = editor.model().blocks[0].as_paragraph().unwrap();
    assert_eq!(paragraph.segments.len(), 3);
    assert_eq!(paragraph.segments[2].as_text(), Some("x"));
    insta::assert_snapshot!(
        html(&editor),
        @r#"<div><span>hi</span><span class="entityDelimiterBefore">&#8203;</span><span class="_Entity _EType_mention _EId_m1 _EReadonly_1" contenteditable="false"></span><span class="entityDelimiterAfter">&#8203;</span><span>x</span></div>"#
    );
    assert!(matches!(
        editor.sink().notifications.last(),
        Some(Notification::ContentChanged {
            source: ChangeSource::EntityDelimiter,
            ..
        })
    ));
}

#[test]
fn test_enter_on_selected_entity_clicks_it() {
    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with(|tree| {
        wrapper = tree.create_element("span");
        vec![Block::paragraph(vec![
            Segment::text("hi"),
            Segment::entity(mention(wrapper)),
        ])]
    });
    let paragraph = editor.tree().parent(wrapper).unwrap();
    let index = editor.tree().child_index(wrapper).unwrap();
    editor.tree_mut().set_selection(Some(TreeSelection::Range {
        start: TreePosition::new(paragraph, index),
        end: TreePosition::new(paragraph, index + 1),
        is_reverted: false,
    }));

    let result = editor.handle_keydown(&KeyboardEvent::new(Key::Enter)).unwrap();
    assert_eq!(result, KeydownResult::Handled);
    let operations: Vec<_> = editor.sink().entity_operations().collect();
    assert_eq!(operations.len(), 1);
    assert_eq!(*operations[0].0, EntityOperation::Click);
    assert_eq!(operations[0].1.id, "m1");
}

#[test]
fn test_arrow_jumps_over_entity_then_typing_leaves_delimiter() {
    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with(|tree| {
        wrapper = tree.create_element("span");
        vec![Block::paragraph(vec![
            Segment::text("hi"),
            Segment::marker(),
            Segment::entity(mention(wrapper)),
        ])]
    });

    let result = editor
        .handle_keydown(&KeyboardEvent::new(Key::ArrowRight))
        .unwrap();
    assert_eq!(result, KeydownResult::Handled);
    let paragraph = editor.model().blocks[0].as_paragraph().unwrap();
    assert_eq!(paragraph.marker_index(), Some(2));

    let after = editor.tree().next_sibling(wrapper).unwrap();
    let after_text = editor.tree().first_child(after).unwrap();
    assert_eq!(
        editor.tree().selection(),
        Some(TreeSelection::caret(TreePosition::new(after_text, 1)))
    );

    let result = editor
        .handle_keydown(&KeyboardEvent::new(Key::character("x")))
        .unwrap();
    assert_eq!(result, KeydownResult::PassThrough);
    assert_eq!(editor.undo().snapshots, 1);
    let paragraph_node = editor.tree().parent(after).unwrap();
    let after_index = editor.tree().child_index(after).unwrap();
    assert_eq!(
        editor.tree().selection(),
        Some(TreeSelection::caret(TreePosition::new(
            paragraph_node,
            after_index + 1
        )))
    );
}

#[test]
fn test_composing_keys_pass_through() {
    let mut editor = editor_with(|_| vec![Block::paragraph(vec![Segment::text("a")])]);
    let mut event = KeyboardEvent::new(Key::Backspace);
    event.is_composing = true;
    assert_eq!(
        editor.handle_keydown(&event).unwrap(),
        KeydownResult::PassThrough
    );
}

#[test]
fn test_enter_after_block_entity_adds_line() {
    let (mut editor, _) = block_entity_with_caret_in_delimiter(false);
    let result = editor.handle_keydown(&KeyboardEvent::new(Key::Enter)).unwrap();

    assert_eq!(result, KeydownResult::Handled);
    assert_eq!(editor.model().blocks.len(), 4);
    assert!(matches!(editor.model().blocks[1], Block::Entity(_)));
    assert_new_line_at(&editor, 2);
    let last = editor.model().blocks[3].as_paragraph().unwrap();
    assert_eq!(last.segments, vec![Segment::text("b")]);
    assert!(matches!(
        editor.sink().notifications.last(),
        Some(Notification::ContentChanged {
            source: ChangeSource::EntityDelimiter,
            ..
        })
    ));
    assert!(editor.tree().selection().is_some_and(|s| s.is_collapsed()));
}

#[test]
fn test_enter_before_block_entity_adds_line() {
    let (mut editor, _) = block_entity_with_caret_in_delimiter(true);
    let result = editor.handle_keydown(&KeyboardEvent::new(Key::Enter)).unwrap();

    assert_eq!(result, KeydownResult::Handled);
    assert_eq!(editor.model().blocks.len(), 4);
    assert_new_line_at(&editor, 1);
    assert!(matches!(editor.model().blocks[2], Block::Entity(_)));
}

#[test]
fn test_backspace_in_block_delimiter_removes_entity() {
    let (mut editor, _) = block_entity_with_caret_in_delimiter(false);
    let result = editor
        .handle_keydown(&KeyboardEvent::new(Key::Backspace))
        .unwrap();

    assert_eq!(result, KeydownResult::Handled);
    assert!(
        !editor
            .model()
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Entity(_)))
    );
    let operations: Vec<_> = editor.sink().entity_operations().collect();
    assert_eq!(operations.len(), 1);
    assert_eq!(*operations[0].0, EntityOperation::RemoveFromEnd);
}

#[test]
fn test_enter_in_inline_delimiter_splits_when_enabled() {
    let build = |wrapper: &mut RenderNodeId, tree: &mut MemoryTree| {
        *wrapper = tree.create_element("span");
        vec![Block::paragraph(vec![
            Segment::text("hi"),
            Segment::entity(mention(*wrapper)),
        ])]
    };
    let press_enter_after_entity = |editor: &mut Editor<MemoryTree>, wrapper: RenderNodeId| {
        let after = editor.tree().next_sibling(wrapper).unwrap();
        let text = editor.tree().first_child(after).unwrap();
        editor
            .tree_mut()
            .set_selection(Some(TreeSelection::caret(TreePosition::new(text, 1))));
        editor.handle_keydown(&KeyboardEvent::new(Key::Enter)).unwrap()
    };

    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with(|tree| build(&mut wrapper, tree));
    assert_eq!(
        press_enter_after_entity(&mut editor, wrapper),
        KeydownResult::PassThrough
    );
    assert_eq!(editor.model().blocks.len(), 1);

    let options = EditorOptions {
        experimental_features: vec![
            ExperimentalFeature::PersistCache,
            ExperimentalFeature::HandleEnterKey,
        ],
        ..Default::default()
    };
    let mut wrapper = RenderNodeId(0);
    let mut editor = editor_with_options(options, |tree| build(&mut wrapper, tree));
    assert_eq!(
        press_enter_after_entity(&mut editor, wrapper),
        KeydownResult::Handled
    );
    assert_eq!(editor.model().blocks.len(), 2);
    let first = editor.model().blocks[0].as_paragraph().unwrap();
    assert!(first.segments.iter().any(|s| s.as_entity().is_some()));
    let second = editor.model().blocks[1].as_paragraph().unwrap();
    assert!(second.marker_index().is_some());
}
