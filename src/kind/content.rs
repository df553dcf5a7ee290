//! Block bodies: rendered paragraphs, and the rich text editor replacing them
//! while they are edited.
//!
//! Both kinds persist the editor's native payload under `data`, so a body can
//! be handed to the editor and back without conversion.

use super::{Factory, Kind, Mode, Point, Registry, Serialized};
use crate::config::BlockDefaults;
use crate::document::{Fields, TYPE_FIELD, json_type_name};
use crate::editor::{EditorHost, paragraphs_payload};
use crate::report::DocumentError;
use crate::scene::{EditorSlot, Node, NodeId, Scene, Visual};
use futures::FutureExt;
use serde_json::{Value, json};
use std::fmt;
use std::rc::Rc;

const PARAGRAPH: &str = "paragraph";

#[derive(Debug, Clone)]
pub struct BlockContentFactory {
    placeholder: String,
}

impl BlockContentFactory {
    pub fn new(defaults: &BlockDefaults) -> Self {
        Self {
            placeholder: defaults.placeholder_text.clone(),
        }
    }
}

impl Factory for BlockContentFactory {
    fn kind(&self) -> Kind {
        Kind::BlockContent
    }

    fn create(
        &self,
        _registry: &Registry,
        scene: &mut Scene,
        _at: Point,
        _depth: usize,
        mode: Mode,
    ) -> Option<NodeId> {
        let content = scene.insert(Node::new(Visual::ContentBox));
        if mode == Mode::Create {
            let paragraph = scene.insert(Node::new(Visual::element("p", "", &self.placeholder)));
            scene.append(content, paragraph).ok()?;
        }
        Some(content)
    }

    fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError> {
        let mut paragraphs = Vec::new();
        for child in scene.children(node) {
            match &scene.node(*child)?.visual {
                Visual::Element { tag, text, .. } if tag == "p" => paragraphs.push(text.as_str()),
                other => return Err(DocumentError::UnsupportedElement(tag_name(other))),
            }
        }
        let mut fields = Fields::new();
        fields.insert("data".into(), paragraphs_payload(paragraphs));
        Ok(Serialized::Ready(fields))
    }

    fn restore(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        let paragraphs = match fields.get("data") {
            None | Some(Value::Null) => Vec::new(),
            Some(payload) => paragraph_texts(payload)?,
        };
        scene.clear(node)?;
        for text in paragraphs {
            let paragraph = scene.insert(Node::new(Visual::element("p", "", &text)));
            scene.append(node, paragraph)?;
        }
        Ok(())
    }

    fn editor_kind(&self) -> Option<Kind> {
        Some(Kind::BlockContentEditor)
    }
}

/// Container for the rich text editor. The editor itself is only attached once
/// the container is part of the tree.
#[derive(Clone)]
pub struct BlockContentEditorFactory {
    host: Rc<dyn EditorHost>,
}

impl BlockContentEditorFactory {
    pub fn new(host: Rc<dyn EditorHost>) -> Self {
        Self { host }
    }

    fn attach(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        let editor = self.host.attach(fields.get("data"));
        match &mut scene.node_mut(node)?.visual {
            Visual::Editor(slot) => {
                slot.attach(editor);
                Ok(())
            }
            other => Err(DocumentError::UnsupportedElement(tag_name(other))),
        }
    }
}

impl fmt::Debug for BlockContentEditorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockContentEditorFactory").finish_non_exhaustive()
    }
}

impl Factory for BlockContentEditorFactory {
    fn kind(&self) -> Kind {
        Kind::BlockContentEditor
    }

    fn create(
        &self,
        _registry: &Registry,
        scene: &mut Scene,
        _at: Point,
        _depth: usize,
        _mode: Mode,
    ) -> Option<NodeId> {
        Some(scene.insert(Node::new(Visual::Editor(EditorSlot::empty()))))
    }

    fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError> {
        let node_ref = scene.node(node)?;
        let Visual::Editor(slot) = &node_ref.visual else {
            return Err(DocumentError::UnsupportedElement(tag_name(&node_ref.visual)));
        };
        let editor = slot.get().ok_or(DocumentError::EditorDetached)?;
        // Saved under the edited kind, since the editor cannot be restored
        // mid-edit.
        let origin = node_ref.edited_from();
        let save = editor.save();
        Ok(Serialized::Pending(
            async move {
                let payload = save.await?;
                let mut fields = Fields::new();
                fields.insert("data".into(), payload);
                if let Some(origin) = origin {
                    fields.insert(TYPE_FIELD.into(), Value::from(origin.tag()));
                }
                Ok::<_, DocumentError>(fields)
            }
            .boxed_local(),
        ))
    }

    fn restore(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        let attached = match &scene.node(node)?.visual {
            Visual::Editor(slot) => slot.get().is_some(),
            other => return Err(DocumentError::UnsupportedElement(tag_name(other))),
        };
        match fields.get("data") {
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(DocumentError::UnexpectedField {
                    field: "data",
                    expected: "object",
                });
            }
        }
        if !attached {
            return self.attach(scene, node, fields);
        }
        let payload = fields
            .get("data")
            .cloned()
            .unwrap_or_else(|| json!({ "blocks": [] }));
        if let Visual::Editor(slot) = &scene.node(node)?.visual
            && let Some(editor) = slot.get()
        {
            editor.render(&payload)?;
        }
        Ok(())
    }

    fn enter_edit(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        self.attach(scene, node, fields)
    }
}

/// Paragraph texts of an editor payload; only paragraphs are rendered.
fn paragraph_texts(payload: &Value) -> Result<Vec<String>, DocumentError> {
    let Value::Object(payload) = payload else {
        return Err(DocumentError::UnexpectedField {
            field: "data",
            expected: "object",
        });
    };
    let blocks = match payload.get("blocks") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(blocks)) => blocks,
        Some(_) => {
            return Err(DocumentError::UnexpectedField {
                field: "blocks",
                expected: "array",
            });
        }
    };
    blocks
        .iter()
        .map(|block| {
            let block_type = block.get("type").unwrap_or(&Value::Null);
            if block_type.as_str() != Some(PARAGRAPH) {
                return Err(DocumentError::UnexpectedBlockType(match block_type {
                    Value::String(name) => name.clone(),
                    other => json_type_name(other).to_string(),
                }));
            }
            Ok(block
                .get("data")
                .and_then(|data| data.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string())
        })
        .collect()
}

fn tag_name(visual: &Visual) -> String {
    match visual {
        Visual::Body => "body".into(),
        Visual::Panel(_) | Visual::ContentBox | Visual::Editor(_) => "div".into(),
        Visual::Heading(_) => "h3".into(),
        Visual::TextInput(_) => "input".into(),
        Visual::Element { tag, .. } => tag.clone(),
    }
}
