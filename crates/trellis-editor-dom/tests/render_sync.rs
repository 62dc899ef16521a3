use trellis_editor_dom::{
    Block, BlockGroup, ChangeSource, Document, Editor, EditorOptions, Entity, FormatContext,
    ListLevel, ListType, MemoryTree, ModelError, Notification, RenderNodeId, RenderTree, Segment,
    content_model_to_tree, content_model_to_tree_async, export_html_async,
};

fn editor(tree: MemoryTree, root: RenderNodeId, blocks: Vec<Block>) -> Editor<MemoryTree> {
    Editor::new(
        tree,
        root,
        BlockGroup::document().with_blocks(blocks),
        EditorOptions::default(),
    )
    .expect("valid document")
}

fn html(editor: &Editor<MemoryTree>) -> String {
    editor.tree().inner_html(editor.root())
}

#[test]
fn test_readonly_entity_gets_delimiters() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let wrapper = tree.create_element("span");
    let editor = editor(
        tree,
        root,
        vec![Block::paragraph(vec![
            Segment::text("hi"),
            Segment::entity(Entity::new("m1", "mention", true, wrapper)),
        ])],
    );
    insta::assert_snapshot!(
        html(&editor),
        @r#"<div><span>hi</span><span class="entityDelimiterBefore">&#8203;</span><span class="_Entity _EType_mention _EId_m1 _EReadonly_1" contenteditable="false"></span><span class="entityDelimiterAfter">&#8203;</span></div>"#
    );
}

#[test]
fn test_editable_entity_has_no_delimiters() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let wrapper = tree.create_element("span");
    let editor = editor(
        tree,
        root,
        vec![Block::paragraph(vec![Segment::entity(Entity::new(
            "c1", "card", false, wrapper,
        ))])],
    );
    insta::assert_snapshot!(
        html(&editor),
        @r#"<div><span class="_Entity _EType_card _EId_c1"></span></div>"#
    );
}

#[test]
fn test_consecutive_list_items_share_one_list() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let item = |text: &str| {
        Block::Group(
            BlockGroup::list_item(vec![ListLevel::new(ListType::Ordered)])
                .with_blocks(vec![Block::paragraph(vec![Segment::text(text)])]),
        )
    };
    let editor = editor(tree, root, vec![item("a"), item("b")]);
    insta::assert_snapshot!(
        html(&editor),
        @"<ol><li><span>a</span></li><li><span>b</span></li></ol>"
    );
}

#[test]
fn test_unchanged_paragraph_keeps_its_element() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let mut editor = editor(
        tree,
        root,
        vec![
            Block::paragraph(vec![Segment::text("one")]),
            Block::paragraph(vec![Segment::text("two")]),
        ],
    );
    let before = editor.tree().children(root);

    let changed = editor
        .format_content_model(
            &mut |doc: &mut Document, _: &mut FormatContext| -> Result<bool, ModelError> {
                let paragraph = doc.blocks[1].as_paragraph_mut().expect("paragraph");
                paragraph.segments.push(Segment::text("!"));
                Ok(true)
            },
            Default::default(),
        )
        .unwrap();
    assert!(changed);

    let after = editor.tree().children(root);
    assert_eq!(after[0], before[0]);
    assert_ne!(after[1], before[1]);
    assert!(!editor.tree().contains(root, before[1]));

    let Some(Notification::ContentChanged { ledger, .. }) = editor.sink().notifications.last()
    else {
        panic!("expected a content change");
    };
    assert_eq!(ledger.added_block_elements, vec![after[1]]);
    assert_eq!(ledger.removed_block_elements, vec![before[1]]);
    insta::assert_snapshot!(
        html(&editor),
        @"<div><span>one</span></div><div><span>two!</span></div>"
    );
}

#[test]
fn test_set_content_replaces_document() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let mut editor = editor(
        tree,
        root,
        vec![Block::paragraph(vec![Segment::text("old")])],
    );
    editor
        .set_content(BlockGroup::document().with_blocks(vec![
            Block::paragraph(vec![Segment::text("new")]),
            Block::divider(),
        ]))
        .unwrap();

    assert!(matches!(
        editor.sink().notifications.last(),
        Some(Notification::ContentChanged {
            source: ChangeSource::SetContent,
            ..
        })
    ));
    insta::assert_snapshot!(html(&editor), @"<div><span>new</span></div><hr>");
}

#[test]
fn test_cache_off_rebuilds_everything() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let options = EditorOptions {
        experimental_features: Vec::new(),
        ..Default::default()
    };
    let mut doc = BlockGroup::document()
        .with_blocks(vec![Block::paragraph(vec![Segment::text("same")])]);

    content_model_to_tree(&mut tree, root, &mut doc, &options).unwrap();
    let first = tree.children(root);
    let result = content_model_to_tree(&mut tree, root, &mut doc, &options).unwrap();
    let second = tree.children(root);

    assert_ne!(first, second);
    assert_eq!(result.ledger.removed_block_elements, first);
}

#[test]
fn test_externally_removed_element_is_rebuilt() {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let mut doc = BlockGroup::document().with_blocks(vec![
        Block::paragraph(vec![Segment::text("a")]),
        Block::paragraph(vec![Segment::text("b")]),
    ]);
    let options = EditorOptions::default();

    content_model_to_tree(&mut tree, root, &mut doc, &options).unwrap();
    let first = tree.children(root);
    tree.detach(first[1]).unwrap();

    let result = content_model_to_tree(&mut tree, root, &mut doc, &options).unwrap();
    let second = tree.children(root);
    assert_eq!(second[0], first[0]);
    assert_ne!(second[1], first[1]);
    assert_eq!(result.ledger.added_block_elements, vec![second[1]]);
    assert_eq!(
        tree.inner_html(root),
        "<div><span>a</span></div><div><span>b</span></div>"
    );
}

#[tokio::test]
async fn test_chunked_render_matches_single_pass() {
    let blocks: Vec<Block> = (0..37)
        .map(|i| Block::paragraph(vec![Segment::text(format!("line {i}"))]))
        .collect();
    let options = EditorOptions {
        async_chunk_size: 4,
        ..Default::default()
    };

    let mut sync_tree = MemoryTree::new();
    let sync_root = sync_tree.create_element("div");
    let mut sync_doc = BlockGroup::document().with_blocks(blocks.clone());
    content_model_to_tree(&mut sync_tree, sync_root, &mut sync_doc, &options).unwrap();

    let mut async_tree = MemoryTree::new();
    let async_root = async_tree.create_element("div");
    let mut async_doc = BlockGroup::document().with_blocks(blocks);
    let result = content_model_to_tree_async(&mut async_tree, async_root, &mut async_doc, &options)
        .await
        .unwrap();

    assert_eq!(async_tree.children(async_root).len(), 37);
    assert_eq!(result.ledger.added_block_elements.len(), 37);
    assert_eq!(
        async_tree.inner_html(async_root),
        sync_tree.inner_html(sync_root)
    );
}

#[tokio::test]
async fn test_export_html() {
    let doc = BlockGroup::document().with_blocks(vec![
        Block::paragraph(vec![Segment::text("a < b")]),
        Block::divider(),
    ]);
    let html = export_html_async(&doc, &EditorOptions::default()).await.unwrap();
    insta::assert_snapshot!(html, @"<div><span>a &lt; b</span></div><hr>");
}
