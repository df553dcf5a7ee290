//! Live scene tree.
//!
//! The scene is an arena of nodes. Every node knows its parent and its ordered
//! children; nodes produced by a factory additionally carry the kind that
//! produced them and the depth they were created at. Untagged nodes (resize
//! handles, plain paragraphs) are presentation detail and never serialized on
//! their own.
//!
//! Freed slots are reused. Each slot carries a generation that is bumped when
//! its node is dropped, so an id kept past the node's lifetime never resolves
//! to the node that took its place.

use crate::editor::RichTextEditor;
use crate::kind::Kind;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0} has no serialization depth")]
    MissingDepth(NodeId),
    #[error("no factory attached to serializable node {0}")]
    MissingFactory(NodeId),
    #[error("edited node {0} does not record the factory it was created from")]
    MissingOrigin(NodeId),
    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),
    #[error("node {0} is not attached to a parent")]
    NotAttached(NodeId),
    #[error("attaching node {child} below {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// Absolute placement and size of a block, as CSS lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub left: String,
    pub top: String,
    pub width: String,
    pub height: String,
}

/// Holder for the rich text engine instantiated inside an editor container.
#[derive(Default)]
pub struct EditorSlot(Option<Box<dyn RichTextEditor>>);

impl EditorSlot {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn attach(&mut self, editor: Box<dyn RichTextEditor>) {
        self.0 = Some(editor);
    }

    pub fn get(&self) -> Option<&dyn RichTextEditor> {
        self.0.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for EditorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EditorSlot")
            .field(&if self.is_attached() {
                "attached"
            } else {
                "empty"
            })
            .finish()
    }
}

#[derive(Debug)]
pub enum Visual {
    Body,
    Panel(Panel),
    Heading(String),
    TextInput(String),
    ContentBox,
    Element {
        tag: String,
        class: String,
        text: String,
    },
    Editor(EditorSlot),
}

impl Visual {
    pub fn element(tag: &str, class: &str, text: &str) -> Self {
        Visual::Element {
            tag: tag.to_string(),
            class: class.to_string(),
            text: text.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub visual: Visual,
    kind: Option<Kind>,
    depth: Option<usize>,
    edited_from: Option<Kind>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(visual: Visual) -> Self {
        Self {
            visual,
            kind: None,
            depth: None,
            edited_from: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn edited_from(&self) -> Option<Kind> {
        self.edited_from
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn stamp(&mut self, kind: Kind, depth: usize) {
        self.kind = Some(kind);
        self.depth = Some(depth);
    }

    pub(crate) fn set_edited_from(&mut self, origin: Option<Kind>) {
        self.edited_from = origin;
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug)]
pub struct Scene {
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    root: NodeId,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(Visual::Body)),
            }],
            vacant: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a detached node to the arena, reusing a freed slot if there is one.
    pub fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.vacant.pop()
            && let Some(slot) = self.slots.get_mut(index)
        {
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.get(id).ok_or(SceneError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, including the root and detached nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Number of arena slots, live or waiting for reuse.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Direct children tagged with `depth`, in document order.
    pub fn own_children(&self, id: NodeId, depth: usize) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.get(*child).and_then(Node::depth) == Some(depth))
            .collect()
    }

    /// Top level serializable nodes.
    pub fn top_level(&self) -> Vec<NodeId> {
        self.own_children(self.root, 0)
    }

    pub fn depth_of(&self, id: NodeId) -> Result<usize, SceneError> {
        self.node(id)?.depth.ok_or(SceneError::MissingDepth(id))
    }

    pub fn kind_of(&self, id: NodeId) -> Result<Kind, SceneError> {
        self.node(id)?.kind.ok_or(SceneError::MissingFactory(id))
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.check_attachable(parent, child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Puts `new` at the position of `old` in its parent and drops `old` with
    /// its whole subtree.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), SceneError> {
        let parent = self.node(old)?.parent.ok_or(SceneError::NotAttached(old))?;
        self.check_attachable(parent, new)?;
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|child| *child == old)
            .ok_or(SceneError::NotAttached(old))?;
        self.node_mut(parent)?.children[position] = new;
        self.node_mut(new)?.parent = Some(parent);
        self.node_mut(old)?.parent = None;
        self.free(old);
        Ok(())
    }

    /// Detaches `id` from its parent and drops its subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return self.clear(id);
        }
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        self.free(id);
        Ok(())
    }

    /// Drops every child of `id`.
    pub fn clear(&mut self, id: NodeId) -> Result<(), SceneError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.free(child);
        }
        Ok(())
    }

    /// Editor nodes currently in the tree, in document order.
    pub fn open_editors(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_editors(self.root, &mut found);
        found
    }

    fn collect_editors(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(id) {
            if self.get(*child).and_then(Node::edited_from).is_some() {
                out.push(*child);
            }
            self.collect_editors(*child, out);
        }
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.node(parent)?;
        if self.node(child)?.parent.is_some() {
            return Err(SceneError::AlreadyAttached(child));
        }
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(SceneError::Cycle { parent, child });
            }
            cursor = self.parent(current);
        }
        Ok(())
    }

    fn free(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(current.index)
                .filter(|slot| slot.generation == current.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.vacant.push(current.index);
                stack.extend(node.children);
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
