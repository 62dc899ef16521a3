//! Asynchronous rendering and HTML export.
//!
//! Both drive a [`ChunkedConversion`] and yield to the tokio scheduler between
//! chunks, so a large document never blocks the executor for longer than one
//! chunk.

use trellis_editor_core::{
    Block, BlockGroup, BlockGroupKind, ChunkedConversion, Document, EditorOptions, RenderNodeId,
    RenderResult, RenderTree, SegmentKind,
};

use crate::error::Result;
use crate::tree::MemoryTree;

/// Attribute naming the host node a placeholder stands in for.
pub const PLACEHOLDER_ATTRIBUTE: &str = "data-trellis-node";

/// Chunked version of [`trellis_editor_core::content_model_to_tree`].
pub async fn content_model_to_tree_async<T: RenderTree + ?Sized>(
    tree: &mut T,
    root: RenderNodeId,
    doc: &mut Document,
    options: &EditorOptions,
) -> Result<RenderResult> {
    let mut conversion = ChunkedConversion::new(tree, root, doc, options);
    while conversion.step()? {
        tokio::task::yield_now().await;
    }
    Ok(conversion.finish()?)
}

/// Render a document into fresh HTML.
///
/// Host-owned nodes (entity wrappers, unknown elements) do not exist in the
/// export tree; each is replaced by an empty placeholder element carrying
/// [`PLACEHOLDER_ATTRIBUTE`].
pub async fn export_html_async(doc: &Document, options: &EditorOptions) -> Result<String> {
    let mut tree = MemoryTree::new();
    let root = tree.create_element("div");
    let mut doc = doc.clone();
    doc.clear_cached_elements();
    replace_host_nodes(&mut tree, &mut doc)?;
    content_model_to_tree_async(&mut tree, root, &mut doc, options).await?;
    tracing::debug!(target: "trellis::render", nodes = tree.node_count(), "exported html");
    Ok(tree.inner_html(root))
}

fn placeholder(tree: &mut MemoryTree, tag: &str, original: RenderNodeId) -> Result<RenderNodeId> {
    let node = tree.create_element(tag);
    tree.set_attribute(node, PLACEHOLDER_ATTRIBUTE, &original.0.to_string())?;
    Ok(node)
}

fn replace_host_nodes(tree: &mut MemoryTree, group: &mut BlockGroup) -> Result<()> {
    if let BlockGroupKind::General { element, .. } = &mut group.kind {
        *element = placeholder(tree, "div", *element)?;
    }
    for block in &mut group.blocks {
        match block {
            Block::Paragraph(paragraph) => {
                for segment in &mut paragraph.segments {
                    match &mut segment.kind {
                        SegmentKind::Entity(entity) => {
                            entity.wrapper = placeholder(tree, "span", entity.wrapper)?;
                        }
                        SegmentKind::General(node) => *node = placeholder(tree, "span", *node)?,
                        _ => {}
                    }
                }
            }
            Block::Entity(block) => {
                block.entity.wrapper = placeholder(tree, "div", block.entity.wrapper)?;
            }
            Block::Group(group) => replace_host_nodes(tree, group)?,
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    replace_host_nodes(tree, cell)?;
                }
            }
            Block::Divider(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_editor_core::{Entity, Segment};

    #[tokio::test]
    async fn test_export_replaces_entity_wrappers() {
        let doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("hi "),
            Segment::entity(Entity::new("e1", "mention", false, RenderNodeId(42))),
        ])]);
        let html = export_html_async(&doc, &EditorOptions::default()).await.unwrap();
        assert!(html.contains(r#"data-trellis-node="42""#), "{html}");
        assert!(html.contains("_EType_mention"), "{html}");
    }
}
