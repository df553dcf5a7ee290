//! Scene serialization.
//!
//! Persisting happens in two phases. [`Persister`] walks the live tree
//! synchronously, depth first, reserving one slot per serialized node in
//! document order; kinds whose state is only available asynchronously leave a
//! pending future behind. [`PendingDocument::resolve`] then awaits every
//! pending part together and assembles the nested document. Because slots are
//! reserved up front, the output order never depends on completion order.

use crate::document::{CHILDREN_FIELD, Fields};
use crate::kind::{PendingFields, Registry, Serialized};
use crate::report::{DocumentError, Reporter};
use crate::scene::{NodeId, Scene};
use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Counts persist operations still waiting for asynchronous parts.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    in_flight: Rc<Cell<usize>>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub fn begin(&self) -> InFlight {
        self.in_flight.set(self.in_flight.get() + 1);
        InFlight {
            counter: Rc::clone(&self.in_flight),
        }
    }
}

/// Marks one outstanding save; released on drop.
#[derive(Debug)]
pub struct InFlight {
    counter: Rc<Cell<usize>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.set(self.counter.get().saturating_sub(1));
    }
}

#[derive(Debug, Default)]
struct Draft {
    fields: Option<Fields>,
    children: Vec<usize>,
}

/// Result of the synchronous walk; owns no borrow of the scene.
pub struct PendingDocument {
    drafts: Vec<Draft>,
    roots: Vec<usize>,
    pending: Vec<(usize, PendingFields)>,
    _in_flight: Option<InFlight>,
}

impl fmt::Debug for PendingDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDocument")
            .field("nodes", &self.drafts.len())
            .field("roots", &self.roots)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl PendingDocument {
    pub fn is_ready(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Awaits every pending part, whether it succeeds or not, then assembles
    /// the document nodes in document order. Failed parts are reported and
    /// left out together with their subtree.
    pub async fn resolve(
        mut self,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<Value>, DocumentError> {
        let pending = std::mem::take(&mut self.pending);
        let settled = join_all(
            pending
                .into_iter()
                .map(|(slot, part)| async move { (slot, part.await) }),
        )
        .await;
        for (slot, result) in settled {
            match result {
                Ok(fields) => self.drafts[slot].fields = Some(fields),
                Err(err) => reporter.report(err)?,
            }
        }
        Ok(self.assemble())
    }

    /// Assembles the document without waiting; fails if any part is pending.
    pub fn resolve_now(self, reporter: &mut dyn Reporter) -> Result<Vec<Value>, DocumentError> {
        if !self.is_ready() {
            return Err(DocumentError::WouldBlock);
        }
        self.resolve(reporter)
            .now_or_never()
            .unwrap_or(Err(DocumentError::WouldBlock))
    }

    fn assemble(&mut self) -> Vec<Value> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .filter_map(|slot| self.assemble_slot(slot))
            .collect()
    }

    fn assemble_slot(&mut self, slot: usize) -> Option<Value> {
        let draft = self.drafts.get_mut(slot)?;
        let mut fields = draft.fields.take()?;
        let children = std::mem::take(&mut draft.children);
        if !children.is_empty() {
            let assembled: Vec<Value> = children
                .into_iter()
                .filter_map(|child| self.assemble_slot(child))
                .collect();
            fields.insert(CHILDREN_FIELD.into(), Value::Array(assembled));
        }
        Some(Value::Object(fields))
    }
}

pub struct Persister<'a> {
    scene: &'a Scene,
    registry: &'a Registry,
    tracker: Option<&'a SaveTracker>,
}

impl<'a> Persister<'a> {
    pub fn new(scene: &'a Scene, registry: &'a Registry) -> Self {
        Self {
            scene,
            registry,
            tracker: None,
        }
    }

    /// Counts the resulting document in `tracker` while it has pending parts.
    pub fn with_tracker(mut self, tracker: &'a SaveTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Walks `node`, created at `depth`, and its own descendants.
    pub fn begin_node(
        &self,
        node: NodeId,
        depth: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<PendingDocument, DocumentError> {
        self.begin(&[node], depth, reporter)
    }

    /// Walks the children of `parent` tagged with `depth`.
    pub fn begin_children(
        &self,
        parent: NodeId,
        depth: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<PendingDocument, DocumentError> {
        self.begin(&self.scene.own_children(parent, depth), depth, reporter)
    }

    /// Walks every top level node of the scene.
    pub fn begin_scene(
        &self,
        reporter: &mut dyn Reporter,
    ) -> Result<PendingDocument, DocumentError> {
        self.begin_children(self.scene.root(), 0, reporter)
    }

    /// Serializes `node` synchronously. Fails with
    /// [`DocumentError::WouldBlock`] if part of the subtree is asynchronous.
    pub fn snapshot(
        &self,
        node: NodeId,
        depth: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<Option<Value>, DocumentError> {
        let mut nodes = self.begin_node(node, depth, reporter)?.resolve_now(reporter)?;
        Ok(nodes.pop())
    }

    fn begin(
        &self,
        nodes: &[NodeId],
        depth: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<PendingDocument, DocumentError> {
        let mut drafts = Vec::new();
        let mut pending = Vec::new();
        let mut roots = Vec::with_capacity(nodes.len());
        for node in nodes {
            roots.push(self.walk(*node, depth, &mut drafts, &mut pending, reporter)?);
        }
        let in_flight = if pending.is_empty() {
            None
        } else {
            self.tracker.map(SaveTracker::begin)
        };
        Ok(PendingDocument {
            drafts,
            roots,
            pending,
            _in_flight: in_flight,
        })
    }

    fn walk(
        &self,
        node: NodeId,
        depth: usize,
        drafts: &mut Vec<Draft>,
        pending: &mut Vec<(usize, PendingFields)>,
        reporter: &mut dyn Reporter,
    ) -> Result<usize, DocumentError> {
        let kind = self.scene.kind_of(node)?;
        self.registry.factory(kind)?;

        let slot = drafts.len();
        drafts.push(Draft::default());
        let mut children = Vec::new();
        for child in self.scene.own_children(node, depth + 1) {
            children.push(self.walk(child, depth + 1, drafts, pending, reporter)?);
        }
        drafts[slot].children = children;

        match self.registry.serialize(self.scene, node) {
            Ok(Serialized::Ready(fields)) => drafts[slot].fields = Some(fields),
            Ok(Serialized::Pending(part)) => pending.push((slot, part)),
            Err(DocumentError::Structure(err)) => return Err(err.into()),
            Err(err) => reporter.report(err)?,
        }
        Ok(slot)
    }
}
