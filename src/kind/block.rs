//! Top level blocks: absolutely positioned, resizable panels.

use super::{Factory, Kind, MenuAction, Mode, Point, Registry, Serialized};
use crate::config::BlockDefaults;
use crate::document::{Fields, text_field};
use crate::report::DocumentError;
use crate::scene::{Node, NodeId, Panel, Scene, Visual};
use serde_json::Value;

const RESIZE_HANDLES: [&str; 3] = ["ui-resizable-e", "ui-resizable-s", "ui-resizable-se"];

#[derive(Debug, Clone)]
pub struct BlockFactory {
    width: String,
    height: String,
}

impl BlockFactory {
    pub fn new(defaults: &BlockDefaults) -> Self {
        Self {
            width: defaults.width.clone(),
            height: defaults.height.clone(),
        }
    }
}

impl Factory for BlockFactory {
    fn kind(&self) -> Kind {
        Kind::Block
    }

    fn create(
        &self,
        registry: &Registry,
        scene: &mut Scene,
        at: Point,
        depth: usize,
        mode: Mode,
    ) -> Option<NodeId> {
        let block = scene.insert(Node::new(Visual::Panel(Panel {
            left: px(at.x),
            top: px(at.y),
            width: self.width.clone(),
            height: self.height.clone(),
        })));
        for handle in RESIZE_HANDLES {
            let chrome = scene.insert(Node::new(Visual::element(
                "div",
                &format!("ui-resizable-handle {handle}"),
                "",
            )));
            scene.append(block, chrome).ok()?;
        }
        if mode == Mode::Create {
            for kind in [Kind::BlockHeader, Kind::BlockContent] {
                if let Some(child) = registry.create(scene, kind, Point::ORIGIN, depth + 1, mode) {
                    scene.append(block, child).ok()?;
                }
            }
        }
        Some(block)
    }

    fn serialize(&self, scene: &Scene, node: NodeId) -> Result<Serialized, DocumentError> {
        let Visual::Panel(panel) = &scene.node(node)?.visual else {
            return Err(DocumentError::UnsupportedElement("non-panel block".into()));
        };
        let mut fields = Fields::new();
        fields.insert("width".into(), Value::from(panel.width.as_str()));
        fields.insert("height".into(), Value::from(panel.height.as_str()));
        fields.insert("top".into(), Value::from(panel.top.as_str()));
        fields.insert("left".into(), Value::from(panel.left.as_str()));
        Ok(Serialized::Ready(fields))
    }

    fn restore(
        &self,
        scene: &mut Scene,
        node: NodeId,
        fields: &Fields,
    ) -> Result<(), DocumentError> {
        let Visual::Panel(panel) = &mut scene.node_mut(node)?.visual else {
            return Err(DocumentError::UnsupportedElement("non-panel block".into()));
        };
        if let Some(width) = css_length(fields, "width") {
            panel.width = width;
        }
        if let Some(height) = css_length(fields, "height") {
            panel.height = height;
        }
        if let Some(top) = css_length(fields, "top") {
            panel.top = top;
        }
        if let Some(left) = css_length(fields, "left") {
            panel.left = left;
        }
        Ok(())
    }

    fn menu(&self) -> Vec<MenuAction> {
        vec![MenuAction::Delete]
    }
}

fn px(value: i32) -> String {
    format!("{value}px")
}

/// Bare numbers are pixel lengths.
fn css_length(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::Number(number)) => Some(format!("{number}px")),
        _ => text_field(fields, key),
    }
}
