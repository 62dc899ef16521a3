//! Model to render-tree synchronization.
//!
//! Children of each group are reconciled against the nodes already in the
//! tree with a moving cursor: a node that is already at the cursor is kept in
//! place, anything else is inserted before the cursor, and whatever is left
//! after the last child once a group is done gets detached. Cached elements
//! whose content hash still matches are moved rather than rebuilt.

use std::collections::HashMap;

use crate::error::Result;
use crate::format::ListType;
use crate::model::{
    Block, BlockGroup, BlockGroupKind, BlockLocation, CachedElement, Divider, Document, Entity,
    EntityBlock, GroupPath, Paragraph, RenderNodeId, Segment, SegmentKind, SegmentLocation, Table,
    ZERO_WIDTH_SPACE,
};
use crate::options::EditorOptions;
use crate::platform::{RenderTree, TreePosition, TreeSelection};
use crate::render_cache::{
    DelimiterOwner, IndexEntry, RenderIndex, RewriteLedger, hash_divider, hash_group_shell,
    hash_paragraph, hash_table_shell,
};
use crate::selection::{ModelPosition, SelectionContext, get_selection};

pub const ENTITY_CLASS: &str = "_Entity";
pub const ENTITY_TYPE_PREFIX: &str = "_EType_";
pub const ENTITY_ID_PREFIX: &str = "_EId_";
pub const ENTITY_READONLY_CLASS: &str = "_EReadonly_1";
pub const DELIMITER_BEFORE_CLASS: &str = "entityDelimiterBefore";
pub const DELIMITER_AFTER_CLASS: &str = "entityDelimiterAfter";
pub const BLOCK_ENTITY_CONTAINER_CLASS: &str = "_E_EBlockEntityContainer";

/// Tags the ledger treats as block elements.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "div"
            | "p"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "blockquote"
            | "ol"
            | "ul"
            | "li"
            | "table"
            | "hr"
    )
}

/// Outcome of a full sync.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub ledger: RewriteLedger,
    pub index: RenderIndex,
    /// The model selection expressed against the new tree.
    pub selection: Option<TreeSelection>,
}

/// Render `doc` into the children of `root`.
pub fn content_model_to_tree<T: RenderTree + ?Sized>(
    tree: &mut T,
    root: RenderNodeId,
    doc: &mut Document,
    options: &EditorOptions,
) -> Result<RenderResult> {
    ChunkedConversion::new(tree, root, doc, options).finish()
}

/// Nodes produced for one segment.
#[derive(Debug, Clone, Copy)]
struct SegmentNodes {
    /// First top-level node (the delimiter before an entity, if any).
    first: RenderNodeId,
    /// Last top-level node.
    last: RenderNodeId,
    text: Option<(RenderNodeId, usize)>,
    /// Text nodes of the delimiters around an entity.
    delimiters: Option<(RenderNodeId, RenderNodeId)>,
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    Before(RenderNodeId),
    After(RenderNodeId),
    End(RenderNodeId),
    Text(RenderNodeId, usize),
    /// Between children of `parent`, right after `after` (or at the start).
    Gap {
        parent: RenderNodeId,
        after: Option<RenderNodeId>,
    },
}

#[derive(Debug, Clone)]
struct ParagraphLayout {
    segments: Vec<Option<SegmentNodes>>,
    end: Anchor,
}

struct OpenList {
    node: RenderNodeId,
    list_type: ListType,
    cursor: Option<RenderNodeId>,
}

struct Renderer<'a, T: RenderTree + ?Sized> {
    tree: &'a mut T,
    root: RenderNodeId,
    with_delimiters: bool,
    persist_cache: bool,
    ledger: RewriteLedger,
    index: RenderIndex,
    paragraphs: HashMap<BlockLocation, ParagraphLayout>,
}

impl<'a, T: RenderTree + ?Sized> Renderer<'a, T> {
    fn is_attached(&self, node: RenderNodeId) -> bool {
        self.tree.contains(self.root, node)
    }

    fn reusable(&self, cached: Option<CachedElement>, hash: u64) -> Option<RenderNodeId> {
        cached
            .filter(|c| self.persist_cache && c.content_hash == hash && self.is_attached(c.node))
            .map(|c| c.node)
    }

    /// Put `node` at the cursor.
    fn place(
        &mut self,
        parent: RenderNodeId,
        node: RenderNodeId,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<()> {
        if *cursor == Some(node) {
            *cursor = self.tree.next_sibling(node);
        } else {
            self.tree.insert_before(parent, node, *cursor)?;
        }
        Ok(())
    }

    fn create_block_element(&mut self, tag: &str) -> RenderNodeId {
        let node = self.tree.create_element(tag);
        self.ledger.added_block_elements.push(node);
        node
    }

    /// Detach `cursor` and every sibling after it.
    fn remove_from(&mut self, mut cursor: Option<RenderNodeId>) -> Result<()> {
        while let Some(node) = cursor {
            cursor = self.tree.next_sibling(node);
            self.tree.detach(node)?;
            if self.tree.tag_name(node).is_some_and(|t| is_block_tag(&t)) {
                self.ledger.removed_block_elements.push(node);
            }
        }
        Ok(())
    }

    fn apply_styles(
        &mut self,
        node: RenderNodeId,
        declarations: Vec<(&'static str, smol_str::SmolStr)>,
    ) -> Result<()> {
        for (name, value) in declarations {
            self.tree.set_style(node, name, &value)?;
        }
        Ok(())
    }

    fn render_children(
        &mut self,
        parent: RenderNodeId,
        group: &mut BlockGroup,
        path: &GroupPath,
    ) -> Result<()> {
        let mut cursor = self.tree.first_child(parent);
        let mut lists = Vec::new();
        for index in 0..group.blocks.len() {
            let location = BlockLocation::new(path.clone(), index);
            self.render_block(
                parent,
                &mut group.blocks[index],
                &location,
                &mut cursor,
                &mut lists,
            )?;
        }
        self.close_lists(&mut lists, 0)?;
        self.remove_from(cursor)
    }

    fn render_block(
        &mut self,
        parent: RenderNodeId,
        block: &mut Block,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
        lists: &mut Vec<OpenList>,
    ) -> Result<()> {
        let is_list_item = matches!(
            block,
            Block::Group(g) if g.list_levels().is_some_and(|levels| !levels.is_empty())
        );
        if !is_list_item {
            self.close_lists(lists, 0)?;
        }
        match block {
            Block::Paragraph(p) => self.render_paragraph(parent, p, location, cursor),
            Block::Table(t) => self.render_table(parent, t, location, cursor),
            Block::Divider(d) => self.render_divider(parent, d, location, cursor),
            Block::Entity(e) => self.render_block_entity(parent, e, location, cursor),
            Block::Group(g) if is_list_item => {
                self.render_list_item(parent, g, location, cursor, lists)
            }
            Block::Group(g) => self.render_group_block(parent, g, location, cursor),
        }
    }

    fn render_paragraph(
        &mut self,
        parent: RenderNodeId,
        paragraph: &mut Paragraph,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<()> {
        if paragraph.renders_without_wrapper() {
            paragraph.cached_element = None;
            let mut layout = self.render_segments(parent, &paragraph.segments, location, cursor)?;
            let after = match *cursor {
                Some(next) => self.tree.previous_sibling(next),
                None => self.tree.children(parent).last().copied(),
            };
            layout.end = Anchor::Gap { parent, after };
            self.paragraphs.insert(location.clone(), layout);
            return Ok(());
        }

        let hash = hash_paragraph(paragraph, self.with_delimiters);
        if let Some(node) = self.reusable(paragraph.cached_element, hash) {
            if let Some(layout) = self.index_reused_paragraph(node, &paragraph.segments, location) {
                tracing::trace!(target: "trellis::render", %node, ?location, "reused paragraph");
                self.place(parent, node, cursor)?;
                self.index.insert(node, IndexEntry::Block(location.clone()));
                self.paragraphs.insert(location.clone(), layout);
                return Ok(());
            }
        }

        let tag = paragraph
            .decorator
            .as_ref()
            .map(|d| d.tag_name.clone())
            .unwrap_or_else(|| "div".into());
        let node = self.create_block_element(&tag);
        self.apply_styles(node, paragraph.format.css_declarations())?;
        if let Some(format) = &paragraph.segment_format {
            self.apply_styles(node, format.css_declarations())?;
        }
        if let Some(decorator) = &paragraph.decorator {
            self.apply_styles(node, decorator.format.css_declarations())?;
        }
        let mut inner = None;
        let mut layout = self.render_segments(node, &paragraph.segments, location, &mut inner)?;
        layout.end = Anchor::End(node);
        self.place(parent, node, cursor)?;
        paragraph.cached_element = Some(CachedElement {
            node,
            content_hash: hash,
        });
        self.index.insert(node, IndexEntry::Block(location.clone()));
        self.paragraphs.insert(location.clone(), layout);
        Ok(())
    }

    fn render_segments(
        &mut self,
        container: RenderNodeId,
        segments: &[Segment],
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<ParagraphLayout> {
        let mut nodes = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let segment_location = SegmentLocation::new(location.clone(), index);
            let rendered = match &segment.kind {
                SegmentKind::SelectionMarker => None,
                SegmentKind::Text(text) => {
                    let span = self.tree.create_element("span");
                    self.apply_styles(span, segment.format.css_declarations())?;
                    let holder = match &segment.link {
                        Some(link) => {
                            let a = self.tree.create_element("a");
                            self.tree.set_attribute(a, "href", &link.href)?;
                            if let Some(target) = &link.target {
                                self.tree.set_attribute(a, "target", target)?;
                            }
                            if let Some(title) = &link.title {
                                self.tree.set_attribute(a, "title", title)?;
                            }
                            self.tree.append_child(span, a)?;
                            a
                        }
                        None => span,
                    };
                    let text_node = self.tree.create_text(text);
                    self.tree.append_child(holder, text_node)?;
                    self.place(container, span, cursor)?;
                    self.index
                        .insert(text_node, IndexEntry::Text(segment_location.clone()));
                    self.index
                        .insert(span, IndexEntry::Segment(segment_location));
                    Some(SegmentNodes {
                        first: span,
                        last: span,
                        text: Some((text_node, text.chars().count())),
                        delimiters: None,
                    })
                }
                SegmentKind::Br => {
                    let br = self.tree.create_element("br");
                    self.place(container, br, cursor)?;
                    self.index.insert(br, IndexEntry::Segment(segment_location));
                    Some(single(br))
                }
                SegmentKind::Image(image) => {
                    let img = self.tree.create_element("img");
                    self.tree.set_attribute(img, "src", &image.src)?;
                    if let Some(alt) = &image.alt {
                        self.tree.set_attribute(img, "alt", alt)?;
                    }
                    self.apply_styles(img, segment.format.css_declarations())?;
                    self.place(container, img, cursor)?;
                    self.index.insert(img, IndexEntry::Segment(segment_location));
                    Some(single(img))
                }
                SegmentKind::General(node) => {
                    self.place(container, *node, cursor)?;
                    self.index
                        .insert(*node, IndexEntry::Segment(segment_location));
                    Some(single(*node))
                }
                SegmentKind::Entity(entity) => Some(self.render_inline_entity(
                    container,
                    entity,
                    segment_location,
                    cursor,
                )?),
            };
            nodes.push(rendered);
        }
        Ok(ParagraphLayout {
            segments: nodes,
            end: Anchor::End(container),
        })
    }

    fn decorate_entity_wrapper(&mut self, entity: &Entity) -> Result<()> {
        let wrapper = entity.wrapper;
        self.tree.add_class(wrapper, ENTITY_CLASS)?;
        self.tree
            .add_class(wrapper, &format!("{ENTITY_TYPE_PREFIX}{}", entity.entity_type))?;
        self.tree
            .add_class(wrapper, &format!("{ENTITY_ID_PREFIX}{}", entity.id))?;
        if entity.is_readonly {
            self.tree.add_class(wrapper, ENTITY_READONLY_CLASS)?;
            self.tree.set_attribute(wrapper, "contenteditable", "false")?;
        }
        Ok(())
    }

    /// Reuse the delimiter at the cursor if it is the right one, or create it.
    fn place_delimiter(
        &mut self,
        container: RenderNodeId,
        owner: DelimiterOwner,
        before: bool,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<RenderNodeId> {
        let class = if before {
            DELIMITER_BEFORE_CLASS
        } else {
            DELIMITER_AFTER_CLASS
        };
        let zws = ZERO_WIDTH_SPACE.to_string();
        let existing = cursor.filter(|c| self.tree.has_class(*c, class));
        let span = match existing {
            Some(span) => span,
            None => {
                let span = self.tree.create_element("span");
                self.tree.add_class(span, class)?;
                span
            }
        };
        let text = match self.tree.first_child(span) {
            Some(text)
                if self.tree.is_text(text)
                    && self.tree.children(span).len() == 1
                    && self.tree.text_content(text).as_deref() == Some(zws.as_str()) =>
            {
                text
            }
            _ => {
                for child in self.tree.children(span) {
                    self.tree.detach(child)?;
                }
                let text = self.tree.create_text(&zws);
                self.tree.append_child(span, text)?;
                text
            }
        };
        self.place(container, span, cursor)?;
        let entry = IndexEntry::Delimiter { owner, before };
        self.index.insert(text, entry.clone());
        self.index.insert(span, entry);
        Ok(text)
    }

    fn render_inline_entity(
        &mut self,
        container: RenderNodeId,
        entity: &Entity,
        location: SegmentLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<SegmentNodes> {
        self.decorate_entity_wrapper(entity)?;
        let wrapper = entity.wrapper;
        if !(self.with_delimiters && entity.is_readonly) {
            self.place(container, wrapper, cursor)?;
            self.index.insert(wrapper, IndexEntry::Segment(location));
            return Ok(single(wrapper));
        }
        let owner = DelimiterOwner::Inline(location.clone());
        let before = self.place_delimiter(container, owner.clone(), true, cursor)?;
        self.place(container, wrapper, cursor)?;
        let after = self.place_delimiter(container, owner, false, cursor)?;
        self.index.insert(wrapper, IndexEntry::Segment(location));
        Ok(SegmentNodes {
            first: self.tree.parent(before).unwrap_or(wrapper),
            last: self.tree.parent(after).unwrap_or(wrapper),
            text: None,
            delimiters: Some((before, after)),
        })
    }

    /// Rebuild the layout of a reused paragraph element from its children.
    /// `None` when the children no longer line up with the segments.
    fn index_reused_paragraph(
        &mut self,
        element: RenderNodeId,
        segments: &[Segment],
        location: &BlockLocation,
    ) -> Option<ParagraphLayout> {
        let children = self.tree.children(element);
        let mut entries: Vec<(RenderNodeId, IndexEntry)> = Vec::new();
        let mut nodes = Vec::with_capacity(segments.len());
        let mut next = 0;
        for (index, segment) in segments.iter().enumerate() {
            let segment_location = SegmentLocation::new(location.clone(), index);
            let rendered = match &segment.kind {
                SegmentKind::SelectionMarker => None,
                SegmentKind::Entity(entity) if self.with_delimiters && entity.is_readonly => {
                    let (before, wrapper, after) = (
                        *children.get(next)?,
                        *children.get(next + 1)?,
                        *children.get(next + 2)?,
                    );
                    next += 3;
                    if wrapper != entity.wrapper
                        || !self.tree.has_class(before, DELIMITER_BEFORE_CLASS)
                        || !self.tree.has_class(after, DELIMITER_AFTER_CLASS)
                    {
                        return None;
                    }
                    let before_text = self.tree.first_child(before)?;
                    let after_text = self.tree.first_child(after)?;
                    let owner = DelimiterOwner::Inline(segment_location.clone());
                    for (node, is_before) in [
                        (before, true),
                        (before_text, true),
                        (after, false),
                        (after_text, false),
                    ] {
                        entries.push((
                            node,
                            IndexEntry::Delimiter {
                                owner: owner.clone(),
                                before: is_before,
                            },
                        ));
                    }
                    entries.push((wrapper, IndexEntry::Segment(segment_location)));
                    Some(SegmentNodes {
                        first: before,
                        last: after,
                        text: None,
                        delimiters: Some((before_text, after_text)),
                    })
                }
                SegmentKind::Text(text) => {
                    let span = *children.get(next)?;
                    next += 1;
                    let holder = self.tree.first_child(span)?;
                    let text_node = if self.tree.is_text(holder) {
                        holder
                    } else {
                        self.tree.first_child(holder)?
                    };
                    if !self.tree.is_text(text_node) {
                        return None;
                    }
                    entries.push((text_node, IndexEntry::Text(segment_location.clone())));
                    entries.push((span, IndexEntry::Segment(segment_location)));
                    Some(SegmentNodes {
                        first: span,
                        last: span,
                        text: Some((text_node, text.chars().count())),
                        delimiters: None,
                    })
                }
                _ => {
                    let node = *children.get(next)?;
                    next += 1;
                    entries.push((node, IndexEntry::Segment(segment_location)));
                    Some(single(node))
                }
            };
            nodes.push(rendered);
        }
        if next != children.len() {
            return None;
        }
        for (node, entry) in entries {
            self.index.insert(node, entry);
        }
        Some(ParagraphLayout {
            segments: nodes,
            end: Anchor::End(element),
        })
    }

    fn render_table(
        &mut self,
        parent: RenderNodeId,
        table: &mut Table,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<()> {
        let spans = cell_spans(table);
        let hash = hash_table_shell(table);
        let reused = self.reusable(table.cached_element, hash).filter(|_| {
            table.rows.iter().enumerate().all(|(r, row)| {
                row.cells.iter().enumerate().all(|(c, cell)| {
                    spans[r][c].is_none()
                        || cell
                            .cached_element
                            .is_some_and(|cached| self.is_attached(cached.node))
                })
            })
        });

        let node = match reused {
            Some(node) => node,
            None => self.build_table_shell(table, &spans, hash)?,
        };
        self.place(parent, node, cursor)?;
        self.index.insert(node, IndexEntry::Block(location.clone()));

        for (r, row) in table.rows.iter_mut().enumerate() {
            for (c, cell) in row.cells.iter_mut().enumerate() {
                let Some(cached) = cell.cached_element else {
                    continue;
                };
                let path = location.cell_path(r, c);
                self.index.insert(cached.node, IndexEntry::Group(path.clone()));
                self.render_children(cached.node, cell, &path)?;
            }
        }
        Ok(())
    }

    fn build_table_shell(
        &mut self,
        table: &mut Table,
        spans: &[Vec<Option<(usize, usize)>>],
        hash: u64,
    ) -> Result<RenderNodeId> {
        let node = self.create_block_element("table");
        self.apply_styles(node, table.format.css_declarations())?;
        for (key, value) in &table.dataset {
            self.tree.set_attribute(node, &format!("data-{key}"), value)?;
        }
        let tbody = self.tree.create_element("tbody");
        self.tree.append_child(node, tbody)?;
        let widths = table.widths.clone();

        for (r, row) in table.rows.iter_mut().enumerate() {
            let tr = self.tree.create_element("tr");
            if let Some(height) = row.height {
                self.tree.set_style(tr, "height", &format!("{height}px"))?;
            }
            self.tree.append_child(tbody, tr)?;
            for (c, cell) in row.cells.iter_mut().enumerate() {
                let Some((col_span, row_span)) = spans[r][c] else {
                    cell.cached_element = None;
                    continue;
                };
                let BlockGroupKind::TableCell(props) = &cell.kind else {
                    cell.cached_element = None;
                    continue;
                };
                let td = self
                    .tree
                    .create_element(if props.is_header { "th" } else { "td" });
                if col_span > 1 {
                    self.tree
                        .set_attribute(td, "colspan", &col_span.to_string())?;
                }
                if row_span > 1 {
                    self.tree
                        .set_attribute(td, "rowspan", &row_span.to_string())?;
                }
                self.apply_styles(td, props.format.css_declarations())?;
                if r == 0 {
                    if let Some(width) = widths.get(c) {
                        self.tree.set_style(td, "width", &format!("{width}px"))?;
                    }
                }
                for (key, value) in &props.dataset {
                    self.tree.set_attribute(td, &format!("data-{key}"), value)?;
                }
                self.tree.append_child(tr, td)?;
                cell.cached_element = Some(CachedElement {
                    node: td,
                    content_hash: hash_group_shell(cell),
                });
            }
        }
        table.cached_element = Some(CachedElement {
            node,
            content_hash: hash,
        });
        Ok(node)
    }

    fn render_divider(
        &mut self,
        parent: RenderNodeId,
        divider: &mut Divider,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<()> {
        let hash = hash_divider(divider);
        let node = match self.reusable(divider.cached_element, hash) {
            Some(node) => node,
            None => {
                let node = self.create_block_element(&divider.tag_name);
                self.apply_styles(node, divider.format.css_declarations())?;
                divider.cached_element = Some(CachedElement {
                    node,
                    content_hash: hash,
                });
                node
            }
        };
        self.place(parent, node, cursor)?;
        self.index.insert(node, IndexEntry::Block(location.clone()));
        Ok(())
    }

    fn render_block_entity(
        &mut self,
        parent: RenderNodeId,
        block: &EntityBlock,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<()> {
        let entity = &block.entity;
        self.decorate_entity_wrapper(entity)?;
        let container = match self.tree.parent(entity.wrapper) {
            Some(p) if self.tree.has_class(p, BLOCK_ENTITY_CONTAINER_CLASS) => p,
            _ => {
                let div = self.create_block_element("div");
                self.tree.add_class(div, BLOCK_ENTITY_CONTAINER_CLASS)?;
                div
            }
        };
        self.apply_styles(container, block.format.css_declarations())?;

        let mut inner = self.tree.first_child(container);
        if self.with_delimiters && entity.is_readonly {
            let owner = DelimiterOwner::Block(location.clone());
            self.place_delimiter(container, owner.clone(), true, &mut inner)?;
            self.place(container, entity.wrapper, &mut inner)?;
            self.place_delimiter(container, owner, false, &mut inner)?;
        } else {
            self.place(container, entity.wrapper, &mut inner)?;
        }
        self.remove_from(inner)?;

        self.place(parent, container, cursor)?;
        self.index
            .insert(entity.wrapper, IndexEntry::Block(location.clone()));
        self.index
            .insert(container, IndexEntry::Block(location.clone()));
        Ok(())
    }

    fn render_group_block(
        &mut self,
        parent: RenderNodeId,
        group: &mut BlockGroup,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
    ) -> Result<()> {
        let hash = hash_group_shell(group);
        let node = match &group.kind {
            BlockGroupKind::General { element, .. } => *element,
            _ => match self.reusable(group.cached_element, hash) {
                Some(node) => node,
                None => {
                    let node = match &group.kind {
                        BlockGroupKind::FormatContainer(container) => {
                            let node = self.create_block_element(&container.tag_name);
                            self.apply_styles(node, container.format.css_declarations())?;
                            node
                        }
                        BlockGroupKind::ListItem(item) => {
                            let node = self.create_block_element("div");
                            self.apply_styles(node, item.format.css_declarations())?;
                            node
                        }
                        _ => self.create_block_element("div"),
                    };
                    group.cached_element = Some(CachedElement {
                        node,
                        content_hash: hash,
                    });
                    node
                }
            },
        };
        self.place(parent, node, cursor)?;
        let path = location.as_group_path();
        self.index.insert(node, IndexEntry::Group(path.clone()));
        self.render_children(node, group, &path)
    }

    fn render_list_item(
        &mut self,
        parent: RenderNodeId,
        group: &mut BlockGroup,
        location: &BlockLocation,
        cursor: &mut Option<RenderNodeId>,
        lists: &mut Vec<OpenList>,
    ) -> Result<()> {
        let BlockGroupKind::ListItem(item) = &group.kind else {
            return self.render_group_block(parent, group, location, cursor);
        };
        let levels = item.levels.clone();
        let keep = lists
            .iter()
            .zip(levels.iter())
            .take_while(|(open, level)| {
                open.list_type == level.list_type && level.start_number.is_none()
            })
            .count();
        self.close_lists(lists, keep)?;

        for level in &levels[lists.len()..] {
            let tag = level.list_type.tag_name();
            let (container, mut list_cursor) = match lists.last() {
                Some(open) => (open.node, open.cursor),
                None => (parent, *cursor),
            };
            let node = match list_cursor {
                Some(existing) if self.tree.tag_name(existing).as_deref() == Some(tag) => {
                    list_cursor = self.tree.next_sibling(existing);
                    existing
                }
                _ => {
                    let node = self.create_block_element(tag);
                    self.tree.insert_before(container, node, list_cursor)?;
                    node
                }
            };
            match lists.last_mut() {
                Some(open) => open.cursor = list_cursor,
                None => *cursor = list_cursor,
            }
            match level.start_number {
                Some(start) => self.tree.set_attribute(node, "start", &start.to_string())?,
                None => self.tree.remove_attribute(node, "start")?,
            }
            if let Some(style) = &level.list_style_type {
                self.tree.set_style(node, "list-style-type", style)?;
            }
            if let Some(margin) = &level.margin_left {
                self.tree.set_style(node, "margin-left", margin)?;
            }
            lists.push(OpenList {
                node,
                list_type: level.list_type,
                cursor: self.tree.first_child(node),
            });
        }

        let hash = hash_group_shell(group);
        let li = match self.reusable(group.cached_element, hash) {
            Some(li) => li,
            None => {
                let li = self.create_block_element("li");
                if let BlockGroupKind::ListItem(item) = &group.kind {
                    self.apply_styles(li, item.format.css_declarations())?;
                    self.apply_styles(li, item.format_holder.format.css_declarations())?;
                }
                group.cached_element = Some(CachedElement {
                    node: li,
                    content_hash: hash,
                });
                li
            }
        };
        if let Some(open) = lists.last_mut() {
            let (list_node, mut list_cursor) = (open.node, open.cursor);
            self.place(list_node, li, &mut list_cursor)?;
            open.cursor = list_cursor;
        }
        let path = location.as_group_path();
        self.index.insert(li, IndexEntry::Group(path.clone()));
        self.render_children(li, group, &path)
    }

    /// Close open lists down to `keep` levels, dropping their leftover children.
    fn close_lists(&mut self, lists: &mut Vec<OpenList>, keep: usize) -> Result<()> {
        while lists.len() > keep {
            if let Some(open) = lists.pop() {
                self.remove_from(open.cursor)?;
            }
        }
        Ok(())
    }

    fn anchor_for(&self, position: &ModelPosition) -> Option<Anchor> {
        match position {
            ModelPosition::Segment { location, offset } => {
                let layout = self.paragraphs.get(&location.block)?;
                if let Some(Some(nodes)) = layout.segments.get(location.index) {
                    return Some(if *offset == 0 {
                        anchor_before(nodes)
                    } else {
                        match nodes.text {
                            Some((text, len)) => Anchor::Text(text, (*offset).min(len)),
                            None => anchor_after(nodes),
                        }
                    });
                }
                let split = location.index.min(layout.segments.len());
                let previous = layout.segments[..split].iter().rev().flatten().next();
                let next = layout
                    .segments
                    .get(split + 1..)
                    .unwrap_or(&[])
                    .iter()
                    .flatten()
                    .next();
                Some(match (previous, next) {
                    (Some(prev), _) if prev.text.is_some() => anchor_after(prev),
                    (_, Some(next)) => anchor_before(next),
                    (Some(prev), None) => anchor_after(prev),
                    (None, None) => layout.end,
                })
            }
            ModelPosition::BlockBoundary { location } => {
                if let Some(node) = self.index.block_node(location) {
                    return Some(Anchor::Before(node));
                }
                if self.paragraphs.contains_key(location) {
                    return self.anchor_for(&ModelPosition::at(location.clone(), 0));
                }
                self.index.group_node(&location.group).map(Anchor::End)
            }
        }
    }

    fn resolve(&self, anchor: Anchor) -> Option<TreePosition> {
        match anchor {
            Anchor::Before(node) => Some(TreePosition::new(
                self.tree.parent(node)?,
                self.tree.child_index(node)?,
            )),
            Anchor::After(node) => Some(TreePosition::new(
                self.tree.parent(node)?,
                self.tree.child_index(node)? + 1,
            )),
            Anchor::End(container) => Some(TreePosition::new(
                container,
                self.tree.children(container).len(),
            )),
            Anchor::Text(node, offset) => Some(TreePosition::new(node, offset)),
            Anchor::Gap { parent, after } => {
                let offset = match after {
                    Some(node) if self.tree.parent(node) == Some(parent) => {
                        self.tree.child_index(node)? + 1
                    }
                    _ => 0,
                };
                Some(TreePosition::new(parent, offset))
            }
        }
    }

    fn compute_selection(&self, doc: &Document) -> Option<TreeSelection> {
        match get_selection(doc)? {
            SelectionContext::Image { image } => Some(TreeSelection::Image {
                image: self.index.segment_node(&image)?,
            }),
            SelectionContext::Table {
                table,
                first_cell,
                last_cell,
            } => Some(TreeSelection::Table {
                table: self.index.block_node(&table)?,
                first_row: first_cell.row,
                first_column: first_cell.col,
                last_row: last_cell.row,
                last_column: last_cell.col,
            }),
            SelectionContext::Range { start, end } => {
                let start = self.resolve(self.anchor_for(&start)?)?;
                let end = self.resolve(self.anchor_for(&end)?)?;
                Some(TreeSelection::Range {
                    start,
                    end,
                    is_reverted: false,
                })
            }
        }
    }
}

fn single(node: RenderNodeId) -> SegmentNodes {
    SegmentNodes {
        first: node,
        last: node,
        text: None,
        delimiters: None,
    }
}

fn anchor_before(nodes: &SegmentNodes) -> Anchor {
    match (nodes.text, nodes.delimiters) {
        (Some((text, _)), _) => Anchor::Text(text, 0),
        (None, Some((before, _))) => Anchor::Text(before, 1),
        (None, None) => Anchor::Before(nodes.first),
    }
}

fn anchor_after(nodes: &SegmentNodes) -> Anchor {
    match (nodes.text, nodes.delimiters) {
        (Some((text, len)), _) => Anchor::Text(text, len),
        (None, Some((_, after))) => Anchor::Text(after, 1),
        (None, None) => Anchor::After(nodes.last),
    }
}

/// Column and row span of every rendered cell; `None` for cells merged into
/// a neighbour.
fn cell_spans(table: &Table) -> Vec<Vec<Option<(usize, usize)>>> {
    let spans_left = |r: usize, c: usize| {
        matches!(
            table.cell(r, c).map(|cell| &cell.kind),
            Some(BlockGroupKind::TableCell(p)) if p.span_left
        )
    };
    let spans_above = |r: usize, c: usize| {
        matches!(
            table.cell(r, c).map(|cell| &cell.kind),
            Some(BlockGroupKind::TableCell(p)) if p.span_above
        )
    };
    table
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            (0..row.cells.len())
                .map(|c| {
                    if spans_left(r, c) || spans_above(r, c) {
                        return None;
                    }
                    let col_span = 1 + (c + 1..row.cells.len())
                        .take_while(|&next| spans_left(r, next))
                        .count();
                    let row_span = 1 + (r + 1..table.rows.len())
                        .take_while(|&next| spans_above(next, c))
                        .count();
                    Some((col_span, row_span))
                })
                .collect()
        })
        .collect()
}

/// Incremental rendering of the document's top-level blocks.
///
/// Each step renders at most `async_chunk_size` top-level blocks. The model is
/// left consistent between steps, so a host can yield to its scheduler
/// between them.
pub struct ChunkedConversion<'a, T: RenderTree + ?Sized> {
    renderer: Renderer<'a, T>,
    doc: &'a mut Document,
    cursor: Option<RenderNodeId>,
    lists: Vec<OpenList>,
    next_block: usize,
    chunk_size: usize,
}

impl<'a, T: RenderTree + ?Sized> ChunkedConversion<'a, T> {
    pub fn new(
        tree: &'a mut T,
        root: RenderNodeId,
        doc: &'a mut Document,
        options: &EditorOptions,
    ) -> Self {
        if !options.persist_cache() {
            doc.clear_cached_elements();
        }
        let cursor = tree.first_child(root);
        let mut index = RenderIndex::default();
        index.insert(root, IndexEntry::Group(GroupPath::root()));
        Self {
            renderer: Renderer {
                tree,
                root,
                with_delimiters: options.add_delimiter_for_entity,
                persist_cache: options.persist_cache(),
                ledger: RewriteLedger::default(),
                index,
                paragraphs: HashMap::new(),
            },
            doc,
            cursor,
            lists: Vec::new(),
            next_block: 0,
            chunk_size: options.async_chunk_size.max(1),
        }
    }

    pub fn total_blocks(&self) -> usize {
        self.doc.blocks.len()
    }

    pub fn rendered_blocks(&self) -> usize {
        self.next_block
    }

    pub fn is_done(&self) -> bool {
        self.next_block >= self.doc.blocks.len()
    }

    /// Render the next chunk. Returns whether blocks remain.
    pub fn step(&mut self) -> Result<bool> {
        let root = self.renderer.root;
        let end = (self.next_block + self.chunk_size).min(self.doc.blocks.len());
        for index in self.next_block..end {
            let location = BlockLocation::top(index);
            self.renderer.render_block(
                root,
                &mut self.doc.blocks[index],
                &location,
                &mut self.cursor,
                &mut self.lists,
            )?;
        }
        tracing::trace!(
            target: "trellis::render",
            from = self.next_block,
            to = end,
            total = self.doc.blocks.len(),
            "rendered chunk"
        );
        self.next_block = end;
        Ok(!self.is_done())
    }

    /// Render whatever is left, drop stale nodes and compute the selection.
    pub fn finish(mut self) -> Result<RenderResult> {
        while self.step()? {}
        self.renderer.close_lists(&mut self.lists, 0)?;
        self.renderer.remove_from(self.cursor)?;
        let selection = self.renderer.compute_selection(self.doc);
        let renderer = self.renderer;
        tracing::debug!(
            target: "trellis::render",
            added = renderer.ledger.added_block_elements.len(),
            removed = renderer.ledger.removed_block_elements.len(),
            indexed = renderer.index.len(),
            has_selection = selection.is_some(),
            "content model synced"
        );
        if tracing::enabled!(target: "trellis::render", tracing::Level::TRACE) {
            tracing::trace!(
                target: "trellis::render",
                added = ?renderer.ledger.added_block_elements,
                removed = ?renderer.ledger.removed_block_elements,
                "rewrite ledger"
            );
        }
        Ok(RenderResult {
            ledger: renderer.ledger,
            index: renderer.index,
            selection,
        })
    }
}

impl<T: RenderTree + ?Sized> Iterator for ChunkedConversion<'_, T> {
    /// Number of top-level blocks rendered so far.
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done() {
            return None;
        }
        Some(self.step().map(|_| self.next_block))
    }
}
