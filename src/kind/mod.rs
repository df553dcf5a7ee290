//! Node kinds and their factories.
//!
//! Every serializable node is produced by a [`Factory`]. The [`Registry`]
//! maps kinds to factories and wraps the factory calls so that produced nodes
//! are always stamped with their kind and depth, and serialized fields always
//! carry their `type` tag.

use crate::config::BlockDefaults;
use crate::document::{Fields, TYPE_FIELD};
use crate::editor::{EditorHost, MemoryEditorHost};
use crate::report::DocumentError;
use crate::scene::{NodeId, Scene, SceneError};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

pub mod block;
pub mod content;
pub mod header;

pub use block::BlockFactory;
pub use content::{BlockContentEditorFactory, BlockContentFactory};
pub use header::{BlockHeaderEditorFactory, BlockHeaderFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Block,
    BlockHeader,
    BlockHeaderEditor,
    BlockContent,
    BlockContentEditor,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::Block,
        Kind::BlockHeader,
        Kind::BlockHeaderEditor,
        Kind::BlockContent,
        Kind::BlockContentEditor,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Kind::Block => "block",
            Kind::BlockHeader => "blockHeader",
            Kind::BlockHeaderEditor => "blockHeaderEditor",
            Kind::BlockContent => "blockContent",
            Kind::BlockContentEditor => "blockContentEditor",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Kind {
    type Err = DocumentError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::from_tag(tag).ok_or_else(|| DocumentError::UnknownKind(tag.to_string()))
    }
}

/// Whether a node is built for a user action or as a shell for saved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Restore,
}

/// Click position, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Delete,
}

pub type PendingFields = LocalBoxFuture<'static, Result<Fields, DocumentError>>;

/// Result of serializing a single node.
pub enum Serialized {
    Ready(Fields),
    Pending(PendingFields),
}

impl fmt::Debug for Serialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serialized::Ready(fields) => f.debug_tuple("Ready").field(fields).finish(),
            Serialized::Pending(_) => f.write_str("Pending"),
        }
    }
}

pub trait Factory {
    fn kind(&self) -> Kind;

    /// Builds a detached node (with default children in [`Mode::Create`]).
    /// `None` means no node exists for this kind here.
    fn create(
        &self,
        registry: &Registry,
        scene: &mut Scene,
        at: Point,
        depth: usize,
        mode: Mode,
    ) -> Option<NodeId>;

    /// Extracts the node's own fields; children are handled by the walker.
    fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError>;

    /// Applies saved fields to a node built in [`Mode::Restore`].
    fn restore(&self, scene: &mut Scene, node: NodeId, fields: &Fields)
    -> Result<(), DocumentError>;

    fn editor_kind(&self) -> Option<Kind> {
        None
    }

    /// Loads `fields` into an editor node once it is part of the tree.
    fn enter_edit(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        self.restore(scene, node, fields)
    }

    fn menu(&self) -> Vec<MenuAction> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    factories: BTreeMap<Kind, Box<dyn Factory>>,
}

impl RegistryBuilder {
    pub fn register(mut self, factory: impl Factory + 'static) -> Self {
        self.factories.insert(factory.kind(), Box::new(factory));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            factories: self.factories,
        }
    }
}

pub struct Registry {
    factories: BTreeMap<Kind, Box<dyn Factory>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// All block kinds, with editors backed by an in-memory editor engine.
    pub fn standard() -> Self {
        Self::with_host(&BlockDefaults::default(), Rc::new(MemoryEditorHost::new()))
    }

    pub fn with_host(defaults: &BlockDefaults, host: Rc<dyn EditorHost>) -> Self {
        Self::builder()
            .register(BlockFactory::new(defaults))
            .register(BlockHeaderFactory::new(defaults))
            .register(BlockHeaderEditorFactory)
            .register(BlockContentFactory::new(defaults))
            .register(BlockContentEditorFactory::new(host))
            .build()
    }

    pub fn get(&self, kind: Kind) -> Option<&dyn Factory> {
        self.factories.get(&kind).map(|factory| factory.as_ref())
    }

    /// Registered kind for a document `type` tag.
    pub fn lookup(&self, tag: &str) -> Option<Kind> {
        Kind::from_tag(tag).filter(|kind| self.factories.contains_key(kind))
    }

    pub fn factory(&self, kind: Kind) -> Result<&dyn Factory, DocumentError> {
        self.get(kind)
            .ok_or_else(|| DocumentError::UnknownKind(kind.tag().to_string()))
    }

    /// Kind whose editor is `editor`.
    pub fn origin_of(&self, editor: Kind) -> Option<Kind> {
        self.factories
            .values()
            .find(|factory| factory.editor_kind() == Some(editor))
            .map(|factory| factory.kind())
    }

    pub fn create(
        &self,
        scene: &mut Scene,
        kind: Kind,
        at: Point,
        depth: usize,
        mode: Mode,
    ) -> Option<NodeId> {
        let factory = self.get(kind)?;
        let node = factory.create(self, scene, at, depth, mode)?;
        match scene.node_mut(node) {
            Ok(created) => {
                created.stamp(kind, depth);
                Some(node)
            }
            Err(err) => {
                tracing::error!(%err, %kind, "factory returned a node outside the scene");
                None
            }
        }
    }

    pub fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError> {
        let kind = scene.kind_of(node)?;
        let tag = kind.tag();
        Ok(match self.factory(kind)?.serialize(scene, node)? {
            Serialized::Ready(fields) => Serialized::Ready(stamp_type(fields, tag)),
            Serialized::Pending(pending) => Serialized::Pending(
                pending
                    .map(move |result| result.map(|fields| stamp_type(fields, tag)))
                    .boxed_local(),
            ),
        })
    }

    pub fn restore(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        let kind = scene.kind_of(node)?;
        self.factory(kind)?.restore(scene, node, fields)
    }

    pub fn enter_edit(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        let kind = scene.kind_of(node)?;
        self.factory(kind)?.enter_edit(scene, node, fields)
    }

    pub fn menu(&self, scene: &Scene, node: NodeId) -> Result<Vec<MenuAction>, SceneError> {
        let kind = scene.kind_of(node)?;
        Ok(self.get(kind).map(|factory| factory.menu()).unwrap_or_default())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

fn stamp_type(mut fields: Fields, tag: &'static str) -> Fields {
    fields
        .entry(TYPE_FIELD)
        .or_insert_with(|| Value::from(tag));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(kind.tag().parse::<Kind>().unwrap(), kind);
        }
        assert_eq!(
            "bogus".parse::<Kind>(),
            Err(DocumentError::UnknownKind("bogus".into()))
        );
    }

    #[test]
    fn test_create_stamps_kind_and_depth() {
        let registry = Registry::standard();
        let mut scene = Scene::new();
        let block = registry
            .create(&mut scene, Kind::Block, Point::new(4, 8), 2, Mode::Create)
            .unwrap();
        let node = scene.node(block).unwrap();
        assert_eq!(node.kind(), Some(Kind::Block));
        assert_eq!(node.depth(), Some(2));
        for child in scene.own_children(block, 3) {
            assert_eq!(scene.depth_of(child), Ok(3));
        }
        assert_eq!(scene.own_children(block, 3).len(), 2);
    }

    #[test]
    fn test_serialize_stamps_type() {
        let registry = Registry::standard();
        let mut scene = Scene::new();
        let header = registry
            .create(&mut scene, Kind::BlockHeader, Point::ORIGIN, 0, Mode::Create)
            .unwrap();
        let Serialized::Ready(fields) = registry.serialize(&scene, header).unwrap() else {
            panic!("header serializes synchronously");
        };
        assert_eq!(fields.get("type"), Some(&Value::from("blockHeader")));
        assert_eq!(fields.get("text"), Some(&Value::from("Title")));
    }

    #[test]
    fn test_pending_serialize_keeps_factory_type() {
        let registry = Registry::standard();
        let mut scene = Scene::new();
        let editor = registry
            .create(
                &mut scene,
                Kind::BlockContentEditor,
                Point::ORIGIN,
                1,
                Mode::Restore,
            )
            .unwrap();
        scene
            .node_mut(editor)
            .unwrap()
            .set_edited_from(Some(Kind::BlockContent));
        let mut fields = Fields::new();
        fields.insert("data".into(), crate::editor::paragraphs_payload(["x"]));
        registry.enter_edit(&mut scene, editor, &fields).unwrap();

        let Serialized::Pending(pending) = registry.serialize(&scene, editor).unwrap() else {
            panic!("editor content serializes asynchronously");
        };
        let fields = block_on(pending).unwrap();
        assert_eq!(fields.get("type"), Some(&Value::from("blockContent")));
    }

    #[test]
    fn test_lookup_only_finds_registered_kinds() {
        let registry = Registry::builder()
            .register(BlockHeaderFactory::new(&BlockDefaults::default()))
            .build();
        assert_eq!(registry.lookup("blockHeader"), Some(Kind::BlockHeader));
        assert_eq!(registry.lookup("block"), None);
        assert_eq!(registry.lookup("bogus"), None);
        assert!(
            registry
                .create(&mut Scene::new(), Kind::Block, Point::ORIGIN, 0, Mode::Create)
                .is_none()
        );
    }

    #[test]
    fn test_origin_of_editor_kinds() {
        let registry = Registry::standard();
        assert_eq!(
            registry.origin_of(Kind::BlockHeaderEditor),
            Some(Kind::BlockHeader)
        );
        assert_eq!(
            registry.origin_of(Kind::BlockContentEditor),
            Some(Kind::BlockContent)
        );
        assert_eq!(registry.origin_of(Kind::Block), None);
    }
}
