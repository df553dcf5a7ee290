//! Edit sessions.
//!
//! Editing swaps a display node for an editor node of the corresponding kind,
//! in place, and back again on completion. At most one session is tracked as
//! active; starting a new one closes every open editor first.

use crate::document::Fields;
use crate::kind::{Kind, Mode, Point, Registry};
use crate::persist::Persister;
use crate::report::{DocumentError, Strict};
use crate::scene::{NodeId, Scene, SceneError};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSession {
    pub editor: NodeId,
    pub origin: Kind,
    pub editor_kind: Kind,
}

#[derive(Debug, Default)]
pub struct EditSessions {
    active: Option<EditSession>,
}

impl EditSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&EditSession> {
        self.active.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.active.is_some()
    }

    /// Forgets the active session without touching the scene.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Replaces `display` with an editor holding its current state and
    /// returns the editor node.
    pub async fn start_edit(
        &mut self,
        scene: &mut Scene,
        registry: &Registry,
        display: NodeId,
    ) -> Result<NodeId, DocumentError> {
        self.close_all(scene, registry).await;

        let origin = scene.kind_of(display)?;
        let editor_kind = registry
            .factory(origin)?
            .editor_kind()
            .ok_or(DocumentError::NotEditable(origin))?;
        let depth = scene.depth_of(display)?;
        let snapshot = Persister::new(scene, registry).snapshot(display, depth, &mut Strict)?;
        let fields = into_fields(snapshot);

        let editor = registry
            .create(scene, editor_kind, Point::ORIGIN, depth, Mode::Restore)
            .ok_or(DocumentError::NotCreated(editor_kind))?;
        if let Err(err) = scene.replace(display, editor) {
            scene.remove(editor)?;
            return Err(err.into());
        }
        scene.node_mut(editor)?.set_edited_from(Some(origin));
        registry.enter_edit(scene, editor, &fields)?;

        tracing::debug!(%editor, %origin, "edit session started");
        self.active = Some(EditSession {
            editor,
            origin,
            editor_kind,
        });
        Ok(editor)
    }

    /// Completes the active session, returning the new display node.
    ///
    /// The session is no longer tracked afterwards, even if completion failed;
    /// the editor then stays in the scene.
    pub async fn complete_edit(
        &mut self,
        scene: &mut Scene,
        registry: &Registry,
    ) -> Result<Option<NodeId>, DocumentError> {
        let Some(session) = self.active.take() else {
            return Ok(None);
        };
        complete_editor(scene, registry, session.editor).await.map(Some)
    }

    /// Completes the active session and every other editor in the scene.
    /// Failures are logged; returns how many editors were closed.
    pub async fn close_all(&mut self, scene: &mut Scene, registry: &Registry) -> usize {
        let mut closed = 0;
        let mut failed = None;
        if let Some(session) = self.active.take() {
            match complete_editor(scene, registry, session.editor).await {
                Ok(_) => closed += 1,
                Err(err) => {
                    tracing::error!(
                        %err,
                        editor = %session.editor,
                        "failed to complete edit session"
                    );
                    failed = Some(session.editor);
                }
            }
        }
        for editor in scene.open_editors() {
            if Some(editor) == failed || !scene.contains(editor) {
                continue;
            }
            match complete_editor(scene, registry, editor).await {
                Ok(_) => closed += 1,
                Err(err) => tracing::error!(%err, %editor, "failed to close editor"),
            }
        }
        closed
    }
}

/// Swaps `editor` back for a display node of the kind it was created from.
/// The scene is only modified once the editor's state has been saved.
pub async fn complete_editor(
    scene: &mut Scene,
    registry: &Registry,
    editor: NodeId,
) -> Result<NodeId, DocumentError> {
    let origin = scene
        .node(editor)?
        .edited_from()
        .ok_or(SceneError::MissingOrigin(editor))?;
    let depth = scene.depth_of(editor)?;
    let pending = Persister::new(scene, registry).begin_node(editor, depth, &mut Strict)?;
    let fields = into_fields(pending.resolve(&mut Strict).await?.pop());

    let shown = registry
        .create(scene, origin, Point::ORIGIN, depth, Mode::Restore)
        .ok_or(DocumentError::NotCreated(origin))?;
    if let Err(err) = registry.restore(scene, shown, &fields) {
        scene.remove(shown)?;
        return Err(err);
    }
    if let Err(err) = scene.replace(editor, shown) {
        scene.remove(shown)?;
        return Err(err.into());
    }
    tracing::debug!(%editor, %shown, %origin, "edit session completed");
    Ok(shown)
}

fn into_fields(value: Option<Value>) -> Fields {
    match value {
        Some(Value::Object(fields)) => fields,
        _ => Fields::new(),
    }
}
