//! Scene materialization from document nodes.
//!
//! Restoration is lenient: entries that are not objects or carry no `type` are
//! skipped silently, everything else that cannot be restored is handed to the
//! [`Reporter`] and skipped together with its subtree. Structural errors in the
//! live scene still abort.

use crate::document::{CHILDREN_FIELD, Fields, SceneDocument, TYPE_FIELD, json_type_name};
use crate::kind::{Mode, Point, Registry};
use crate::report::{DocumentError, Reporter};
use crate::scene::{NodeId, Scene};
use serde_json::Value;

/// Builds `entries` below `parent`, tagged with `depth`, in order. Returns the
/// nodes that were restored.
pub fn restore_children(
    scene: &mut Scene,
    registry: &Registry,
    parent: NodeId,
    depth: usize,
    entries: &[Value],
    reporter: &mut dyn Reporter,
) -> Result<Vec<NodeId>, DocumentError> {
    let mut restored = Vec::new();
    for entry in entries {
        if let Some(node) = restore_entry(scene, registry, parent, depth, entry, reporter)? {
            restored.push(node);
        }
    }
    Ok(restored)
}

/// Builds a fresh scene from `document`. The caller's scene is only replaced
/// once this succeeded.
pub fn load_scene(
    registry: &Registry,
    document: &SceneDocument,
    reporter: &mut dyn Reporter,
) -> Result<Scene, DocumentError> {
    let mut scene = Scene::new();
    let root = scene.root();
    let restored = restore_children(&mut scene, registry, root, 0, &document.data, reporter)?;
    tracing::debug!(entries = document.data.len(), restored = restored.len(), "loaded scene");
    Ok(scene)
}

fn restore_entry(
    scene: &mut Scene,
    registry: &Registry,
    parent: NodeId,
    depth: usize,
    entry: &Value,
    reporter: &mut dyn Reporter,
) -> Result<Option<NodeId>, DocumentError> {
    let Some(fields) = entry.as_object() else {
        return Ok(None);
    };
    let Some(tag) = fields.get(TYPE_FIELD) else {
        return Ok(None);
    };
    let Some(kind) = tag.as_str().and_then(|tag| registry.lookup(tag)) else {
        let tag = match tag {
            Value::String(tag) => tag.clone(),
            other => other.to_string(),
        };
        reporter.report(DocumentError::UnknownKind(tag))?;
        return Ok(None);
    };

    let Some(node) = registry.create(scene, kind, Point::ORIGIN, depth, Mode::Restore) else {
        reporter.report(DocumentError::NotCreated(kind))?;
        return Ok(None);
    };
    if let Err(err) = scene.append(parent, node) {
        scene.remove(node)?;
        return Err(err.into());
    }
    if let Some(origin) = registry.origin_of(kind) {
        scene.node_mut(node)?.set_edited_from(Some(origin));
    }
    if let Err(err) = registry.restore(scene, node, fields) {
        scene.remove(node)?;
        return match err {
            DocumentError::Structure(err) => Err(err.into()),
            other => {
                reporter.report(other)?;
                Ok(None)
            }
        };
    }

    restore_nested(scene, registry, node, depth, fields, reporter)?;
    Ok(Some(node))
}

fn restore_nested(
    scene: &mut Scene,
    registry: &Registry,
    node: NodeId,
    depth: usize,
    fields: &Fields,
    reporter: &mut dyn Reporter,
) -> Result<(), DocumentError> {
    match fields.get(CHILDREN_FIELD) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(children)) => {
            restore_children(scene, registry, node, depth + 1, children, reporter)?;
            Ok(())
        }
        Some(other) => reporter.report(DocumentError::MalformedChildren(json_type_name(other))),
    }
}
