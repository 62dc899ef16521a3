//! In-memory render tree.
//!
//! A small arena-backed element/text tree implementing [`RenderTree`]. It is
//! the reference host for the synchronizer: tests render into it and
//! snapshot its HTML, and async export renders documents with it.

use std::collections::BTreeMap;

use smol_str::SmolStr;
use trellis_editor_core::{NodeKind, PlatformError, RenderNodeId, RenderTree, TreeSelection};

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: SmolStr,
        classes: Vec<SmolStr>,
        styles: Vec<(SmolStr, SmolStr)>,
        attributes: BTreeMap<SmolStr, SmolStr>,
        children: Vec<RenderNodeId>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<RenderNodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    nodes: Vec<Node>,
    selection: Option<TreeSelection>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: RenderNodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: RenderNodeId) -> Result<&mut Node, PlatformError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| PlatformError(format!("unknown node {id}")))
    }

    fn children_mut(&mut self, id: RenderNodeId) -> Result<&mut Vec<RenderNodeId>, PlatformError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { children, .. } => Ok(children),
            NodeData::Text(_) => Err(PlatformError(format!("{id} is a text node"))),
        }
    }

    fn push(&mut self, data: NodeData) -> RenderNodeId {
        let id = RenderNodeId(self.nodes.len() as u32);
        self.nodes.push(Node { data, parent: None });
        id
    }

    /// Descendants of `root` carrying `class`, in document order.
    pub fn elements_with_class(&self, root: RenderNodeId, class: &str) -> Vec<RenderNodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node != root && self.has_class(node, class) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: RenderNodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialized `node`, including its own tag.
    pub fn outer_html(&self, node: RenderNodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, id: RenderNodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => escape_into(text, out),
            NodeData::Element {
                tag,
                classes,
                styles,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                if !classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&classes.join(" "));
                    out.push('"');
                }
                if !styles.is_empty() {
                    let css: Vec<String> =
                        styles.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                    out.push_str(" style=\"");
                    out.push_str(&css.join("; "));
                    out.push('"');
                }
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\u{200B}' => out.push_str("&#8203;"),
            c => out.push(c),
        }
    }
}

impl RenderTree for MemoryTree {
    fn create_element(&mut self, tag: &str) -> RenderNodeId {
        self.push(NodeData::Element {
            tag: tag.into(),
            classes: Vec::new(),
            styles: Vec::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> RenderNodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn node_kind(&self, node: RenderNodeId) -> Option<NodeKind> {
        Some(match &self.node(node)?.data {
            NodeData::Element { tag, .. } => NodeKind::Element(tag.clone()),
            NodeData::Text(_) => NodeKind::Text,
        })
    }

    fn text_content(&self, node: RenderNodeId) -> Option<String> {
        match &self.node(node)?.data {
            NodeData::Text(text) => Some(text.clone()),
            NodeData::Element { children, .. } => Some(
                children
                    .iter()
                    .filter_map(|c| self.text_content(*c))
                    .collect(),
            ),
        }
    }

    fn set_text(&mut self, node: RenderNodeId, text: &str) -> Result<(), PlatformError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(own) => {
                *own = text.to_string();
                Ok(())
            }
            NodeData::Element { .. } => Err(PlatformError(format!("{node} is not a text node"))),
        }
    }

    fn attribute(&self, node: RenderNodeId, name: &str) -> Option<SmolStr> {
        match &self.node(node)?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
            NodeData::Text(_) => None,
        }
    }

    fn set_attribute(
        &mut self,
        node: RenderNodeId,
        name: &str,
        value: &str,
    ) -> Result<(), PlatformError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { attributes, .. } => {
                attributes.insert(name.into(), value.into());
                Ok(())
            }
            NodeData::Text(_) => Err(PlatformError(format!("{node} is a text node"))),
        }
    }

    fn remove_attribute(&mut self, node: RenderNodeId, name: &str) -> Result<(), PlatformError> {
        if let NodeData::Element { attributes, .. } = &mut self.node_mut(node)?.data {
            attributes.remove(name);
        }
        Ok(())
    }

    fn set_style(
        &mut self,
        node: RenderNodeId,
        name: &str,
        value: &str,
    ) -> Result<(), PlatformError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { styles, .. } => {
                match styles.iter_mut().find(|(k, _)| k.as_str() == name) {
                    Some((_, v)) => *v = value.into(),
                    None => styles.push((name.into(), value.into())),
                }
                Ok(())
            }
            NodeData::Text(_) => Err(PlatformError(format!("{node} is a text node"))),
        }
    }

    fn classes(&self, node: RenderNodeId) -> Vec<SmolStr> {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes.clone(),
            _ => Vec::new(),
        }
    }

    fn has_class(&self, node: RenderNodeId, class: &str) -> bool {
        matches!(
            self.node(node).map(|n| &n.data),
            Some(NodeData::Element { classes, .. }) if classes.iter().any(|c| c == class)
        )
    }

    fn add_class(&mut self, node: RenderNodeId, class: &str) -> Result<(), PlatformError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { classes, .. } => {
                if !classes.iter().any(|c| c == class) {
                    classes.push(class.into());
                }
                Ok(())
            }
            NodeData::Text(_) => Err(PlatformError(format!("{node} is a text node"))),
        }
    }

    fn remove_class(&mut self, node: RenderNodeId, class: &str) -> Result<(), PlatformError> {
        if let NodeData::Element { classes, .. } = &mut self.node_mut(node)?.data {
            classes.retain(|c| c != class);
        }
        Ok(())
    }

    fn parent(&self, node: RenderNodeId) -> Option<RenderNodeId> {
        self.node(node)?.parent
    }

    fn children(&self, node: RenderNodeId) -> Vec<RenderNodeId> {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    fn insert_before(
        &mut self,
        parent: RenderNodeId,
        child: RenderNodeId,
        reference: Option<RenderNodeId>,
    ) -> Result<(), PlatformError> {
        if reference == Some(child) {
            return Ok(());
        }
        if self.contains(child, parent) {
            return Err(PlatformError(format!(
                "inserting {child} into {parent} would create a cycle"
            )));
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(PlatformError(format!(
                    "{reference} is not a child of {parent}"
                )));
            }
        }
        self.node_mut(child)?;
        self.detach(child)?;
        let children = self.children_mut(parent)?;
        let at = match reference {
            Some(reference) => children
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(children.len()),
            None => children.len(),
        };
        children.insert(at, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, node: RenderNodeId) -> Result<(), PlatformError> {
        let Some(parent) = self.node_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.children_mut(parent)?.retain(|c| *c != node);
        Ok(())
    }

    fn selection(&self) -> Option<TreeSelection> {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: Option<TreeSelection>) {
        self.selection = selection;
    }
}
