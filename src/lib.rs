//! gm-screen: scene persistence for a block-based screen editor.
//!
//! A screen is a tree of resizable blocks, each holding a heading and rich
//! text. This crate maps the live tree to a nested JSON document and back,
//! and swaps display nodes for editors while they are edited. It includes:
//!
//! - **Scene** - node arena with kind and depth tags on every serializable node
//! - **Kinds** - the factory registry for blocks, headers, content and editors
//! - **Persist / restore** - depth-first tree walkers with async fan-in and
//!   lenient decoding
//! - **Edit sessions** - at most one display node is edited at a time
//! - **Screen** - datasets in a key/value store, file export and import
//! - **File store** - checksummed file-per-key storage (optional)
//!
//! # Quick Start
//!
//! ```rust
//! use futures::executor::block_on;
//! use gm_screen::{MemoryStore, Point, Screen, ScreenConfig};
//!
//! let mut screen = Screen::new(MemoryStore::new(), ScreenConfig::default());
//! screen.create_block(Point::new(40, 60)).unwrap();
//!
//! let document = block_on(screen.save()).unwrap();
//! assert_eq!(document.data.len(), 1);
//! ```
//!
//! # Features
//!
//! - `file-store` - Enables the file-backed [`FileStore`]
//! - `cli` - Builds the `gm-screen` command-line tool (requires `file-store`)

// Live node tree
pub mod scene;

// Node kinds and their factories
pub mod kind;

// JSON document model
pub mod document;

// Error reporting for the tree walkers
pub mod report;

// Tree walkers
pub mod persist;
pub mod restore;

// Edit-session controller
pub mod session;

// Rich text editor collaborator
pub mod editor;

// Counter widget model
pub mod counter;

pub mod config;
pub mod screen;
pub mod storage;

// Re-export scene types
pub use scene::{EditorSlot, Node, NodeId, Panel, Scene, SceneError, Visual};

// Re-export kind types
pub use kind::{Factory, Kind, MenuAction, Mode, Point, Registry, RegistryBuilder, Serialized};

// Re-export document and reporting types
pub use document::{Fields, FormatError, SceneDocument};
pub use report::{DocumentError, Lenient, Reporter, Strict};

// Re-export walker and session types
pub use persist::{InFlight, PendingDocument, Persister, SaveTracker};
pub use restore::{load_scene, restore_children};
pub use session::{EditSession, EditSessions, complete_editor};

pub use config::{BlockDefaults, ConfigError, ScreenConfig};
pub use counter::{Columns, Counter, CounterStyle, MAX_TOKENS};
pub use editor::{EditorError, EditorHost, MemoryEditor, MemoryEditorHost, RichTextEditor};
pub use screen::{DeferredSave, RestoreOutcome, Screen, ScreenAction, ScreenError, Unload};
pub use storage::{KeyValueStore, MemoryStore, StorageError};

// Re-export the file store (feature-gated)
#[cfg(feature = "file-store")]
pub use storage::FileStore;
