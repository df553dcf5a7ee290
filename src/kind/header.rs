//! Block captions and their single line editor.

use super::{Factory, Kind, Mode, Point, Registry, Serialized};
use crate::config::BlockDefaults;
use crate::document::{Fields, text_field};
use crate::report::DocumentError;
use crate::scene::{Node, NodeId, Scene, Visual};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct BlockHeaderFactory {
    heading: String,
}

impl BlockHeaderFactory {
    pub fn new(defaults: &BlockDefaults) -> Self {
        Self {
            heading: defaults.heading.clone(),
        }
    }
}

impl Factory for BlockHeaderFactory {
    fn kind(&self) -> Kind {
        Kind::BlockHeader
    }

    fn create(
        &self,
        _registry: &Registry,
        scene: &mut Scene,
        _at: Point,
        _depth: usize,
        _mode: Mode,
    ) -> Option<NodeId> {
        Some(scene.insert(Node::new(Visual::Heading(self.heading.clone()))))
    }

    fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError> {
        match &scene.node(node)?.visual {
            Visual::Heading(text) => Ok(Serialized::Ready(text_fields(text))),
            _ => Err(DocumentError::UnsupportedElement("non-heading header".into())),
        }
    }

    fn restore(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        match &mut scene.node_mut(node)?.visual {
            Visual::Heading(text) => {
                *text = text_field(fields, "text").unwrap_or_default();
                Ok(())
            }
            _ => Err(DocumentError::UnsupportedElement("non-heading header".into())),
        }
    }

    fn editor_kind(&self) -> Option<Kind> {
        Some(Kind::BlockHeaderEditor)
    }
}

/// Text input replacing a caption while it is edited.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHeaderEditorFactory;

impl Factory for BlockHeaderEditorFactory {
    fn kind(&self) -> Kind {
        Kind::BlockHeaderEditor
    }

    fn create(
        &self,
        _registry: &Registry,
        scene: &mut Scene,
        _at: Point,
        _depth: usize,
        _mode: Mode,
    ) -> Option<NodeId> {
        Some(scene.insert(Node::new(Visual::TextInput(String::new()))))
    }

    fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError> {
        match &scene.node(node)?.visual {
            Visual::TextInput(value) => Ok(Serialized::Ready(text_fields(value))),
            _ => Err(DocumentError::UnsupportedElement("non-input header editor".into())),
        }
    }

    fn restore(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        match &mut scene.node_mut(node)?.visual {
            Visual::TextInput(value) => {
                *value = text_field(fields, "text").unwrap_or_default();
                Ok(())
            }
            _ => Err(DocumentError::UnsupportedElement("non-input header editor".into())),
        }
    }
}

fn text_fields(text: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("text".into(), Value::from(text));
    fields
}
