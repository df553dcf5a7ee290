//! Document errors and the reporters that decide what to do with them.
//!
//! Recursive walkers never decide on their own whether a content problem is
//! fatal. They hand it to a [`Reporter`]: [`Strict`] turns it back into an
//! error, [`Lenient`] logs and continues, and a `Vec<DocumentError>` collects.

use crate::editor::EditorError;
use crate::kind::Kind;
use crate::scene::SceneError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Structure(#[from] SceneError),
    #[error("factory type '{0}' is unknown; ignoring data element")]
    UnknownKind(String),
    #[error("non-array type {0} found as children data element")]
    MalformedChildren(&'static str),
    #[error("serialization not supported for <{0}> element")]
    UnsupportedElement(String),
    #[error("unexpected editor block type '{0}'")]
    UnexpectedBlockType(String),
    #[error("unexpected shape for field '{field}': expected {expected}")]
    UnexpectedField {
        field: &'static str,
        expected: &'static str,
    },
    #[error("kind '{0}' cannot be edited in place")]
    NotEditable(Kind),
    #[error("factory '{0}' produced no node")]
    NotCreated(Kind),
    #[error("no rich text editor attached to the node")]
    EditorDetached,
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("serialization did not complete synchronously")]
    WouldBlock,
}

pub trait Reporter {
    /// Returns `Err` to abort the operation, `Ok` to skip the offending part.
    fn report(&mut self, error: DocumentError) -> Result<(), DocumentError>;
}

/// Propagates every reported error.
#[derive(Debug, Default, Clone, Copy)]
pub struct Strict;

impl Reporter for Strict {
    fn report(&mut self, error: DocumentError) -> Result<(), DocumentError> {
        Err(error)
    }
}

/// Logs reported errors and keeps going.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lenient;

impl Reporter for Lenient {
    fn report(&mut self, error: DocumentError) -> Result<(), DocumentError> {
        tracing::warn!(%error, "skipping document element");
        Ok(())
    }
}

impl Reporter for Vec<DocumentError> {
    fn report(&mut self, error: DocumentError) -> Result<(), DocumentError> {
        self.push(error);
        Ok(())
    }
}
