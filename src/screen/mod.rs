//! Application context tying the scene, its editors and a dataset store
//! together.
//!
//! A screen always works on one named dataset. Its document lives in the
//! store under the configured dataset key; the name of the active dataset is
//! kept in the store as well so that the next session resumes it.

use crate::config::ScreenConfig;
use crate::document::{FormatError, SceneDocument};
use crate::editor::MemoryEditorHost;
use crate::kind::{Kind, MenuAction, Mode, Point, Registry};
use crate::persist::{PendingDocument, Persister, SaveTracker};
use crate::report::{DocumentError, Lenient, Reporter};
use crate::restore::{load_scene, restore_children};
use crate::scene::{NodeId, Scene};
use crate::session::EditSessions;
use crate::storage::{KeyValueStore, StorageError};
use futures::FutureExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const JSON_EXTENSION: &str = ".json";

#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("error parsing document: {0}")]
    Parse(String),
    #[error("document does not contain an array property 'data'")]
    MissingData,
    #[error("'{0}' is not a .json file")]
    NotJson(String),
    #[error("a dataset name is required")]
    Unnamed,
}

impl From<FormatError> for ScreenError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Json(message) => ScreenError::Parse(message),
            FormatError::MissingData => ScreenError::MissingData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The store holds no document for the active dataset.
    Empty,
    /// Number of top level nodes restored.
    Restored(usize),
}

/// Entries of the context menu opened on the empty scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenAction {
    Save,
    SaveAs,
    ClearAllMemory,
}

impl ScreenAction {
    pub const ALL: [ScreenAction; 3] = [
        ScreenAction::Save,
        ScreenAction::SaveAs,
        ScreenAction::ClearAllMemory,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScreenAction::Save => "Save",
            ScreenAction::SaveAs => "Save As...",
            ScreenAction::ClearAllMemory => "Clear All Memory",
        }
    }
}

/// Result of preparing for shutdown.
#[derive(Debug)]
pub enum Unload {
    /// Everything was saved synchronously.
    Proceed,
    /// Parts of the document are still being saved.
    SavePending(DeferredSave),
}

/// Autosave that could not complete synchronously. Hand it to
/// [`Screen::finish_deferred`] to wait for it, or discard it to leave without
/// saving.
#[derive(Debug)]
pub struct DeferredSave {
    pending: PendingDocument,
}

impl DeferredSave {
    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    pub fn discard(self) {
        tracing::info!(
            pending = self.pending.pending(),
            "discarding unsaved changes on exit"
        );
    }
}

pub struct Screen<S: KeyValueStore> {
    scene: Scene,
    registry: Registry,
    sessions: EditSessions,
    tracker: SaveTracker,
    store: S,
    config: ScreenConfig,
    dataset: String,
}

impl<S: KeyValueStore> Screen<S> {
    /// Screen with editors backed by the in-memory editor engine.
    pub fn new(store: S, config: ScreenConfig) -> Self {
        let registry = Registry::with_host(&config.block, Rc::new(MemoryEditorHost::new()));
        Self::with_registry(store, config, registry)
    }

    pub fn with_registry(store: S, config: ScreenConfig, registry: Registry) -> Self {
        let dataset = config.default_dataset.clone();
        Self {
            scene: Scene::new(),
            registry,
            sessions: EditSessions::new(),
            tracker: SaveTracker::new(),
            store,
            config,
            dataset,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sessions(&self) -> &EditSessions {
        &self.sessions
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn set_dataset(&mut self, name: impl Into<String>) {
        self.dataset = name.into();
    }

    pub fn title(&self) -> String {
        format!("{}({})", self.config.title_prefix, self.dataset)
    }

    /// Number of saves still waiting for editor content.
    pub fn saves_in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    /// Adds a new block with default content at `at`.
    pub fn create_block(&mut self, at: Point) -> Result<NodeId, ScreenError> {
        let block = self
            .registry
            .create(&mut self.scene, Kind::Block, at, 0, Mode::Create)
            .ok_or(DocumentError::NotCreated(Kind::Block))?;
        let root = self.scene.root();
        self.scene.append(root, block).map_err(DocumentError::from)?;
        tracing::debug!(%block, x = at.x, y = at.y, "created block");
        Ok(block)
    }

    /// Removes `node` with its subtree, dropping an edit session inside it.
    pub fn delete(&mut self, node: NodeId) -> Result<(), ScreenError> {
        self.scene.remove(node).map_err(DocumentError::from)?;
        if let Some(session) = self.sessions.active()
            && !self.scene.contains(session.editor)
        {
            self.sessions.reset();
        }
        Ok(())
    }

    pub fn context_menu(&self, node: NodeId) -> Result<Vec<MenuAction>, ScreenError> {
        Ok(self
            .registry
            .menu(&self.scene, node)
            .map_err(DocumentError::from)?)
    }

    pub fn apply(&mut self, node: NodeId, action: MenuAction) -> Result<(), ScreenError> {
        match action {
            MenuAction::Delete => self.delete(node),
        }
    }

    pub fn top_menu(&self) -> &'static [ScreenAction] {
        &ScreenAction::ALL
    }

    pub async fn start_edit(&mut self, node: NodeId) -> Result<NodeId, ScreenError> {
        Ok(self
            .sessions
            .start_edit(&mut self.scene, &self.registry, node)
            .await?)
    }

    pub async fn complete_edit(&mut self) -> Result<Option<NodeId>, ScreenError> {
        Ok(self
            .sessions
            .complete_edit(&mut self.scene, &self.registry)
            .await?)
    }

    pub async fn close_all_editors(&mut self) -> usize {
        self.sessions.close_all(&mut self.scene, &self.registry).await
    }

    /// Loads the dataset last marked active in the store.
    pub fn restore_state(&mut self) -> Result<RestoreOutcome, ScreenError> {
        let name = match self.store.get(&self.config.active_dataset_key)? {
            Some(name) => name,
            None => self.dataset.clone(),
        };
        self.open_dataset(&name)
    }

    /// Switches to dataset `name` and loads its document. The scene is only
    /// replaced when the stored document could be read.
    pub fn open_dataset(&mut self, name: &str) -> Result<RestoreOutcome, ScreenError> {
        self.dataset = name.to_string();
        let key = self.config.dataset_key(name);
        let Some(text) = self.store.get(&key)? else {
            tracing::info!(dataset = name, "no data found for dataset");
            return Ok(RestoreOutcome::Empty);
        };
        let document = SceneDocument::from_json(&text)
            .map_err(ScreenError::from)
            .inspect_err(|err| tracing::error!(dataset = name, %err, "error in dataset"))?;
        let scene = load_scene(&self.registry, &document, &mut Lenient)
            .inspect_err(|err| tracing::error!(%err, "error restoring the data"))?;
        self.replace_scene(scene);
        Ok(RestoreOutcome::Restored(self.scene.top_level().len()))
    }

    /// Serializes the whole scene, waiting for editor content.
    pub async fn persist_document(
        &self,
        reporter: &mut dyn Reporter,
    ) -> Result<SceneDocument, ScreenError> {
        let pending = Persister::new(&self.scene, &self.registry)
            .with_tracker(&self.tracker)
            .begin_scene(reporter)?;
        Ok(SceneDocument::new(pending.resolve(reporter).await?))
    }

    /// Writes the scene to the store under the active dataset.
    pub async fn persist_to_local_storage(&mut self) -> Result<(), ScreenError> {
        let document = self.persist_document(&mut Lenient).await?;
        self.store_document(&document)
    }

    /// Closes all editors and saves the scene to the store.
    pub async fn save(&mut self) -> Result<SceneDocument, ScreenError> {
        self.close_all_editors().await;
        let document = self.persist_document(&mut Lenient).await?;
        self.store_document(&document)?;
        Ok(document)
    }

    /// Saves and writes `<dataset>.json` into `dir`. Fails while the dataset
    /// has no name; use [`Screen::save_as`] then.
    pub async fn export_to_file(&mut self, dir: &Path) -> Result<PathBuf, ScreenError> {
        if self.config.is_unnamed(&self.dataset) || self.dataset.is_empty() {
            return Err(ScreenError::Unnamed);
        }
        let document = self.save().await?;
        let path = dir.join(format!("{}{JSON_EXTENSION}", self.dataset));
        fs::write(&path, document.to_json())?;
        tracing::info!(path = %path.display(), "exported dataset");
        Ok(path)
    }

    /// Renames the dataset to `name` (without a trailing `.json`) and exports
    /// it.
    pub async fn save_as(&mut self, dir: &Path, name: &str) -> Result<PathBuf, ScreenError> {
        let name = name.strip_suffix(JSON_EXTENSION).unwrap_or(name);
        if name.is_empty() {
            return Err(ScreenError::Unnamed);
        }
        self.dataset = name.to_string();
        self.export_to_file(dir).await
    }

    /// Replaces the scene with a dropped document file and switches to the
    /// dataset named after it.
    ///
    /// The scene is cleared before the document is restored, so a document
    /// that fails half way leaves a partial scene.
    pub fn import_dropped_file(
        &mut self,
        file_name: &str,
        contents: &str,
    ) -> Result<usize, ScreenError> {
        let name = dataset_from_file_name(file_name)
            .ok_or_else(|| ScreenError::NotJson(file_name.to_string()))?;
        let document = SceneDocument::from_json(contents)
            .map_err(ScreenError::from)
            .inspect_err(|err| tracing::error!(file_name, %err, "error loading dropped file"))?;

        self.dataset = name.to_string();
        self.sessions.reset();
        let root = self.scene.root();
        self.scene.clear(root).map_err(DocumentError::from)?;
        let restored = restore_children(
            &mut self.scene,
            &self.registry,
            root,
            0,
            &document.data,
            &mut Lenient,
        )
        .inspect_err(|err| tracing::error!(file_name, %err, "error restoring dropped file"))?;
        tracing::info!(dataset = %self.dataset, nodes = restored.len(), "imported dataset");
        Ok(restored.len())
    }

    pub fn import_file(&mut self, path: &Path) -> Result<usize, ScreenError> {
        let contents = fs::read_to_string(path)?;
        self.import_dropped_file(&path.to_string_lossy(), &contents)
    }

    /// Names of the datasets held by the store.
    pub fn list_datasets(&self) -> Result<Vec<String>, ScreenError> {
        Ok(self
            .store
            .keys()?
            .iter()
            .filter_map(|key| self.config.dataset_name(key))
            .map(str::to_string)
            .collect())
    }

    pub fn clear_memory(&mut self) -> Result<(), ScreenError> {
        self.store.clear()?;
        tracing::info!("cleared all stored datasets");
        Ok(())
    }

    /// Saves what can be saved without waiting. Editors are closed if that
    /// completes immediately; otherwise their current content is saved in
    /// place.
    ///
    /// The save is deferred while parts of it are pending or while an earlier
    /// save is still in flight, since that one would land after this one.
    pub fn before_unload(&mut self) -> Result<Unload, ScreenError> {
        if self.close_all_editors().now_or_never().is_none() {
            tracing::warn!("edit in progress; editors could not be closed synchronously");
        }
        let earlier = self.saves_in_flight();
        let pending = Persister::new(&self.scene, &self.registry)
            .with_tracker(&self.tracker)
            .begin_scene(&mut Lenient)?;
        if !pending.is_ready() || earlier > 0 {
            tracing::warn!(
                pending = pending.pending(),
                in_flight = self.saves_in_flight(),
                "unable to save the data synchronously"
            );
            return Ok(Unload::SavePending(DeferredSave { pending }));
        }
        let document = SceneDocument::new(pending.resolve_now(&mut Lenient)?);
        self.store_document(&document)?;
        Ok(Unload::Proceed)
    }

    /// Waits for a deferred autosave and stores it.
    pub async fn finish_deferred(&mut self, deferred: DeferredSave) -> Result<(), ScreenError> {
        let document = SceneDocument::new(deferred.pending.resolve(&mut Lenient).await?);
        self.store_document(&document)
    }

    fn store_document(&mut self, document: &SceneDocument) -> Result<(), ScreenError> {
        let key = self.config.dataset_key(&self.dataset);
        self.store.set(&key, &document.to_json())?;
        self.store.set(&self.config.active_dataset_key, &self.dataset)?;
        tracing::debug!(dataset = %self.dataset, nodes = document.data.len(), "stored dataset");
        Ok(())
    }

    fn replace_scene(&mut self, scene: Scene) {
        self.sessions.reset();
        self.scene = scene;
    }
}

/// Dataset name for an imported file: the file stem of a `.json` path,
/// matched case-insensitively.
pub fn dataset_from_file_name(file_name: &str) -> Option<&str> {
    let base = file_name
        .rfind(['/', '\\'])
        .map_or(file_name, |index| &file_name[index + 1..]);
    let stem_len = base.len().checked_sub(JSON_EXTENSION.len())?;
    if !base.is_char_boundary(stem_len) {
        return None;
    }
    let (stem, extension) = base.split_at(stem_len);
    extension
        .eq_ignore_ascii_case(JSON_EXTENSION)
        .then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn screen() -> Screen<MemoryStore> {
        Screen::new(MemoryStore::new(), ScreenConfig::default())
    }

    #[test]
    fn test_dataset_from_file_name() {
        assert_eq!(dataset_from_file_name("dungeon.json"), Some("dungeon"));
        assert_eq!(dataset_from_file_name("C:\\maps\\Keep.JSON"), Some("Keep"));
        assert_eq!(dataset_from_file_name("/tmp/a.b.json"), Some("a.b"));
        assert_eq!(dataset_from_file_name("notes.txt"), None);
        assert_eq!(dataset_from_file_name("json"), None);
    }

    #[test]
    fn test_title_follows_dataset() {
        let mut screen = screen();
        assert_eq!(screen.title(), "GM Screen(unspecified)");
        screen.set_dataset("Crypt");
        assert_eq!(screen.title(), "GM Screen(Crypt)");
    }

    #[test]
    fn test_delete_through_context_menu() {
        let mut screen = screen();
        let block = screen.create_block(Point::new(3, 4)).unwrap();
        let actions = screen.context_menu(block).unwrap();
        assert_eq!(actions, vec![MenuAction::Delete]);
        screen.apply(block, actions[0]).unwrap();
        assert!(screen.scene().is_empty());
    }

    #[test]
    fn test_top_menu_labels() {
        let labels: Vec<_> = screen().top_menu().iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["Save", "Save As...", "Clear All Memory"]);
    }

    #[test]
    fn test_restore_state_without_data_is_empty() {
        let mut screen = screen();
        assert_eq!(screen.restore_state().unwrap(), RestoreOutcome::Empty);
    }

    #[test]
    fn test_before_unload_saves_synchronously() {
        let mut screen = screen();
        screen.set_dataset("tavern");
        screen.create_block(Point::ORIGIN).unwrap();
        assert!(matches!(screen.before_unload().unwrap(), Unload::Proceed));
        assert_eq!(
            screen.store().get("dataset").unwrap().as_deref(),
            Some("tavern")
        );
        assert!(screen.store().get("dataset-tavern").unwrap().is_some());
    }
}
