//! Rich text editor collaborator.
//!
//! Editor nodes host an external block editor. The scene only relies on the
//! narrow `save`/`render` contract below; the payload is the editor's own
//! document format and stays opaque apart from its `blocks` sequence.

use futures::future::{self, LocalBoxFuture};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("editor save rejected: {0}")]
    Rejected(String),
    #[error("editor cannot render payload: {0}")]
    Render(String),
}

pub trait RichTextEditor {
    /// Resolves to the editor's current document payload.
    fn save(&self) -> LocalBoxFuture<'static, Result<Value, EditorError>>;

    /// Replaces the editor's content.
    fn render(&self, payload: &Value) -> Result<(), EditorError>;
}

/// Instantiates editors inside a live container.
pub trait EditorHost {
    fn attach(&self, initial: Option<&Value>) -> Box<dyn RichTextEditor>;
}

/// Builds the editor payload for plain paragraphs.
pub fn paragraphs_payload<'a>(paragraphs: impl IntoIterator<Item = &'a str>) -> Value {
    let blocks: Vec<Value> = paragraphs
        .into_iter()
        .map(|text| json!({ "type": "paragraph", "data": { "text": text } }))
        .collect();
    json!({ "blocks": blocks })
}

/// Editor engine keeping its document in memory; saves resolve immediately.
#[derive(Debug, Clone, Default)]
pub struct MemoryEditor {
    payload: Rc<RefCell<Value>>,
}

impl MemoryEditor {
    pub fn new(initial: Option<&Value>) -> Self {
        Self {
            payload: Rc::new(RefCell::new(
                initial.cloned().unwrap_or_else(|| json!({ "blocks": [] })),
            )),
        }
    }

    pub fn payload(&self) -> Value {
        self.payload.borrow().clone()
    }

    /// Simulates the user replacing the whole text with `paragraphs`.
    pub fn type_paragraphs(&self, paragraphs: &[&str]) {
        *self.payload.borrow_mut() = paragraphs_payload(paragraphs.iter().copied());
    }

    #[cfg(test)]
    pub(crate) fn handles(&self) -> usize {
        Rc::strong_count(&self.payload)
    }
}

impl RichTextEditor for MemoryEditor {
    fn save(&self) -> LocalBoxFuture<'static, Result<Value, EditorError>> {
        Box::pin(future::ready(Ok(self.payload())))
    }

    fn render(&self, payload: &Value) -> Result<(), EditorError> {
        if !payload.is_object() {
            return Err(EditorError::Render(format!(
                "expected an object, found {payload}"
            )));
        }
        *self.payload.borrow_mut() = payload.clone();
        Ok(())
    }
}

/// Host creating [`MemoryEditor`]s. Only the most recent editor is kept so
/// callers can drive it like a user would.
#[derive(Debug, Clone, Default)]
pub struct MemoryEditorHost {
    last: Rc<RefCell<Option<MemoryEditor>>>,
    created: Rc<Cell<usize>>,
}

impl MemoryEditorHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently attached editor.
    pub fn last(&self) -> Option<MemoryEditor> {
        self.last.borrow().clone()
    }

    /// How many editors were attached so far.
    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl EditorHost for MemoryEditorHost {
    fn attach(&self, initial: Option<&Value>) -> Box<dyn RichTextEditor> {
        let editor = MemoryEditor::new(initial);
        *self.last.borrow_mut() = Some(editor.clone());
        self.created.set(self.created.get() + 1);
        Box::new(editor)
    }
}
