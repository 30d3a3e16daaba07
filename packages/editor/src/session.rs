//! # Editor Session
//!
//! Owns everything one editing session needs: the document, its history,
//! the id generator, the drag reconciler, the autosave timer and the
//! storage backend.
//!
//! All state changes go through `&mut self`; readers get shared borrows.
//! Every change bumps [`EditorSession::version`] and re-arms the autosave
//! timer, so a host only has to call [`EditorSession::tick`] periodically.

use crate::autosave::{Autosave, Clock, SystemClock};
use crate::block::{Block, BlockContent, BlockType};
use crate::config::EditorConfig;
use crate::dnd::{DragSource, DropTarget, Droppable, Point, Rect, Reconciler};
use crate::document::{ContainerSetting, Document, MetaUpdate, PreviewArticle};
use crate::errors::EditorError;
use crate::history::History;
use crate::id_generator::IdGenerator;
use crate::mutations::{find_block, Direction, Mutation, MutationError};
use crate::serializer::{export_document, export_filename, import_document};
use crate::shortcuts::{KeyChord, Shortcut};
use crate::storage::{
    clear_persisted, load_persisted, read_preview, save_persisted, write_preview, DirectoryStorage,
    MemoryStorage, Storage,
};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};

/// Selected block and style panel visibility
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub block_id: Option<String>,
    pub show_style_panel: bool,
}

/// An exported article ready to be written out
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

/// Everything a host can ask the session to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mutate(Mutation),
    Undo,
    Redo,
    Select(String),
    Deselect,
    SetStylePanel(bool),
    UpdateMeta(MetaUpdate),
    AddTag(String),
    RemoveTag(String),
    UpdateContainer {
        setting: ContainerSetting,
        value: String,
    },
    Import(String),
    Export,
    Preview,
    ClearAll,
    Key(KeyChord),
}

/// Result of a dispatched command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// State changed; carries the id of a newly created block, if any
    Changed { created_id: Option<String> },

    /// Nothing to do (no-op mutation, empty history, unbound key)
    Unchanged,

    Exported(ExportFile),

    Preview(PreviewArticle),
}

impl Outcome {
    fn changed() -> Self {
        Outcome::Changed { created_id: None }
    }

    fn from_flag(changed: bool) -> Self {
        if changed {
            Outcome::changed()
        } else {
            Outcome::Unchanged
        }
    }
}

pub struct EditorSession {
    document: Document,
    history: History,
    ids: IdGenerator,
    reconciler: Reconciler,
    autosave: Autosave,
    storage: Box<dyn Storage>,
    clock: Box<dyn Clock>,
    selection: Selection,

    /// Bumped on every state change
    version: u64,

    /// Mutations that left the tree unchanged (stale ids, boundaries)
    noop_count: u64,
}

impl EditorSession {
    /// Start a session, restoring whatever `storage` holds
    pub fn open(config: &EditorConfig, storage: Box<dyn Storage>, clock: Box<dyn Clock>) -> Self {
        let mut ids = IdGenerator::for_session();
        let persisted = load_persisted(storage.as_ref(), &mut ids);
        let document = persisted.into_document(Document::new(Utc::now()));

        info!(
            blocks = document.blocks.len(),
            title = %document.article_meta.title,
            seed = ids.seed(),
            "Opened editor session"
        );

        Self {
            history: History::with_capacity(document.blocks.clone(), config.history_capacity),
            document,
            ids,
            reconciler: Reconciler::new(config.drag_activation_distance),
            autosave: Autosave::new(config.autosave_delay()),
            storage,
            clock,
            selection: Selection::default(),
            version: 0,
            noop_count: 0,
        }
    }

    /// Load the config from `dir` and keep the article in the same directory
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let dir = dir.as_ref();
        let config = EditorConfig::load(dir)?;
        let storage = DirectoryStorage::open(dir)?;
        debug!(dir = %dir.display(), "Using directory storage");
        Ok(Self::open(&config, Box::new(storage), Box::new(SystemClock)))
    }

    /// Default config, in-memory storage and the wall clock
    pub fn in_memory() -> Self {
        Self::open(
            &EditorConfig::default(),
            Box::new(MemoryStorage::new()),
            Box::new(SystemClock),
        )
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn blocks(&self) -> &[Block] {
        &self.document.blocks
    }

    pub fn find_block(&self, id: &str) -> Option<&Block> {
        find_block(&self.document.blocks, id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The selected block, if it still exists
    pub fn selected_block(&self) -> Option<&Block> {
        self.selection
            .block_id
            .as_deref()
            .and_then(|id| self.find_block(id))
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn noop_count(&self) -> u64 {
        self.noop_count
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    // ------------------------------------------------------------------
    // Block mutations
    // ------------------------------------------------------------------

    /// Apply a tree mutation and record it. Returns the created block id for
    /// Insert/AddChild/Duplicate.
    pub fn apply(&mut self, mutation: Mutation) -> Result<Option<String>, MutationError> {
        match mutation.apply(&self.document.blocks, &mut self.ids) {
            Ok(applied) => {
                self.document.blocks = applied.blocks;
                self.history
                    .record_with_description(&self.document.blocks, mutation.name());

                // Deleting a container takes any selected descendant with it
                self.prune_selection();
                self.changed();
                debug!(
                    mutation = mutation.name(),
                    target = ?mutation.target_id(),
                    created = ?applied.created_id,
                    version = self.version,
                    "Applied mutation"
                );
                Ok(applied.created_id)
            }
            Err(error) => {
                self.noop_count += 1;
                warn!(mutation = mutation.name(), %error, "Mutation had no effect");
                Err(error)
            }
        }
    }

    /// Insert a default block at root level; `None` appends
    pub fn add_block(&mut self, block_type: BlockType, position: Option<usize>) -> Option<String> {
        self.apply(Mutation::Insert {
            block_type,
            position,
        })
        .ok()
        .flatten()
    }

    pub fn add_child_block(&mut self, parent_id: &str, block_type: BlockType) -> Option<String> {
        self.apply(Mutation::AddChild {
            parent_id: parent_id.to_string(),
            block_type,
        })
        .ok()
        .flatten()
    }

    pub fn update_block_content(&mut self, id: &str, content: Option<BlockContent>) -> bool {
        self.apply(Mutation::UpdateContent {
            id: id.to_string(),
            content,
        })
        .is_ok()
    }

    pub fn update_block_style(&mut self, id: &str, key: &str, value: &str) -> bool {
        self.apply(Mutation::UpdateStyle {
            id: id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
        .is_ok()
    }

    pub fn delete_block(&mut self, id: &str) -> bool {
        self.apply(Mutation::Delete { id: id.to_string() }).is_ok()
    }

    pub fn move_block(&mut self, id: &str, direction: Direction) -> bool {
        self.apply(Mutation::Move {
            id: id.to_string(),
            direction,
        })
        .is_ok()
    }

    pub fn reorder_blocks(&mut self, active_id: &str, over_id: &str) -> bool {
        self.apply(Mutation::Reorder {
            active_id: active_id.to_string(),
            over_id: over_id.to_string(),
        })
        .is_ok()
    }

    pub fn duplicate_block(&mut self, id: &str) -> Option<String> {
        self.apply(Mutation::Duplicate { id: id.to_string() })
            .ok()
            .flatten()
    }

    pub fn change_block_type(&mut self, id: &str, new_type: BlockType) -> bool {
        self.apply(Mutation::ChangeType {
            id: id.to_string(),
            new_type,
        })
        .is_ok()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let description = self.history.undo_description().map(str::to_string);
        let Some(blocks) = self.history.undo() else {
            return false;
        };
        self.restore(blocks);
        debug!(?description, cursor = self.history.cursor(), "Undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let description = self.history.redo_description().map(str::to_string);
        let Some(blocks) = self.history.redo() else {
            return false;
        };
        self.restore(blocks);
        debug!(?description, cursor = self.history.cursor(), "Redo");
        true
    }

    fn restore(&mut self, blocks: Vec<Block>) {
        self.document.blocks = blocks;
        self.prune_selection();
        self.changed();
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select a block and open the style panel
    pub fn select(&mut self, id: &str) {
        self.selection = Selection {
            block_id: Some(id.to_string()),
            show_style_panel: true,
        };
    }

    pub fn deselect(&mut self) {
        self.selection = Selection::default();
    }

    pub fn set_style_panel(&mut self, visible: bool) {
        self.selection.show_style_panel = visible;
    }

    fn prune_selection(&mut self) {
        let stale = match &self.selection.block_id {
            Some(id) => find_block(&self.document.blocks, id).is_none(),
            None => false,
        };
        if stale {
            self.selection = Selection::default();
        }
    }

    // ------------------------------------------------------------------
    // Metadata and container settings
    // ------------------------------------------------------------------

    pub fn update_meta(&mut self, update: MetaUpdate) {
        self.document.article_meta.apply(update, Utc::now());
        self.changed();
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        let added = self.document.article_meta.add_tag(tag, Utc::now());
        if added {
            self.changed();
        }
        added
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let removed = self.document.article_meta.remove_tag(tag, Utc::now());
        if removed {
            self.changed();
        }
        removed
    }

    pub fn update_container(&mut self, setting: ContainerSetting, value: impl Into<String>) {
        self.document.container_settings.set(setting, value);
        self.changed();
    }

    // ------------------------------------------------------------------
    // Import / export / preview
    // ------------------------------------------------------------------

    pub fn export(&self) -> Result<ExportFile, EditorError> {
        let now = Utc::now();
        let contents = export_document(&self.document, now)?;
        let filename = export_filename(&self.document.article_meta.title, now.timestamp_millis());

        info!(
            %filename,
            blocks = self.document.blocks.len(),
            bytes = contents.len(),
            "Exported article"
        );
        Ok(ExportFile { filename, contents })
    }

    /// Replace the document with an imported one. The previous state stays
    /// reachable through undo.
    pub fn import(&mut self, json: &str) -> Result<(), EditorError> {
        let document = match import_document(json, &self.document, &mut self.ids) {
            Ok(document) => document,
            Err(error) => {
                warn!(%error, "Import rejected");
                return Err(error.into());
            }
        };

        self.document = document;
        self.history
            .record_with_description(&self.document.blocks, "import");
        self.prune_selection();
        self.changed();

        info!(
            blocks = self.document.blocks.len(),
            title = %self.document.article_meta.title,
            "Imported article"
        );
        Ok(())
    }

    /// Snapshot for the preview renderer, also written to storage
    pub fn preview(&mut self) -> PreviewArticle {
        let preview = PreviewArticle::from(&self.document);
        if let Err(error) = write_preview(self.storage.as_mut(), &preview) {
            warn!(%error, "Failed to store preview");
        }
        preview
    }

    /// The last stored preview
    pub fn load_preview(&self) -> Result<Option<PreviewArticle>, EditorError> {
        Ok(read_preview(self.storage.as_ref())?)
    }

    /// Reset blocks, history, metadata and settings, and forget the saved article
    pub fn clear_all(&mut self) {
        self.document = Document::new(Utc::now());
        self.history.reset(Vec::new());
        self.selection = Selection::default();
        self.reconciler.cancel();
        self.autosave.cancel();
        self.version += 1;

        if let Err(error) = clear_persisted(self.storage.as_mut()) {
            warn!(%error, "Failed to clear saved article");
        }
        info!("Cleared article");
    }

    // ------------------------------------------------------------------
    // Drag and drop
    // ------------------------------------------------------------------

    pub fn begin_drag(&mut self, source: DragSource, origin: Option<Point>) {
        self.reconciler.begin(source, origin);
    }

    pub fn drag_moved(&mut self, pointer: Point) {
        self.reconciler.pointer_moved(pointer);
    }

    /// Drop over `over` and apply the resulting mutation
    pub fn end_drag(&mut self, over: Option<&DropTarget>) -> Outcome {
        let mutation = self.reconciler.end(over, &self.document.blocks);
        self.apply_drop(mutation)
    }

    /// Drop, resolving the target by collision detection
    pub fn end_drag_at(&mut self, droppables: &[Droppable], active: Rect, pointer: Option<Point>) -> Outcome {
        let mutation = self
            .reconciler
            .end_at(droppables, active, pointer, &self.document.blocks);
        self.apply_drop(mutation)
    }

    pub fn cancel_drag(&mut self) {
        self.reconciler.cancel();
    }

    fn apply_drop(&mut self, mutation: Option<Mutation>) -> Outcome {
        match mutation.map(|m| self.apply(m)) {
            Some(Ok(created_id)) => Outcome::Changed { created_id },
            _ => Outcome::Unchanged,
        }
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    pub fn handle_key(&mut self, chord: KeyChord) -> Result<Outcome, EditorError> {
        match chord.shortcut() {
            Some(Shortcut::Undo) => Ok(Outcome::from_flag(self.undo())),
            Some(Shortcut::Redo) => Ok(Outcome::from_flag(self.redo())),
            Some(Shortcut::Save) => self.export().map(Outcome::Exported),
            None => Ok(Outcome::Unchanged),
        }
    }

    // ------------------------------------------------------------------
    // Autosave
    // ------------------------------------------------------------------

    /// Save if the autosave deadline has passed. Returns true if a save ran.
    pub fn tick(&mut self) -> bool {
        if !self.autosave.poll(self.clock.now()) {
            return false;
        }
        if let Err(error) = self.flush() {
            warn!(%error, "Autosave failed");
        }
        true
    }

    /// Save now and disarm the autosave timer
    pub fn flush(&mut self) -> Result<(), EditorError> {
        self.autosave.cancel();
        save_persisted(self.storage.as_mut(), &self.document)?;
        Ok(())
    }

    fn changed(&mut self) {
        self.version += 1;
        self.autosave.schedule(self.clock.now());
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, EditorError> {
        let outcome = match command {
            Command::Mutate(mutation) => match self.apply(mutation) {
                Ok(created_id) => Outcome::Changed { created_id },
                Err(_) => Outcome::Unchanged,
            },
            Command::Undo => Outcome::from_flag(self.undo()),
            Command::Redo => Outcome::from_flag(self.redo()),
            Command::Select(id) => {
                self.select(&id);
                Outcome::changed()
            }
            Command::Deselect => {
                self.deselect();
                Outcome::changed()
            }
            Command::SetStylePanel(visible) => {
                self.set_style_panel(visible);
                Outcome::changed()
            }
            Command::UpdateMeta(update) => {
                self.update_meta(update);
                Outcome::changed()
            }
            Command::AddTag(tag) => Outcome::from_flag(self.add_tag(&tag)),
            Command::RemoveTag(tag) => Outcome::from_flag(self.remove_tag(&tag)),
            Command::UpdateContainer { setting, value } => {
                self.update_container(setting, value);
                Outcome::changed()
            }
            Command::Import(json) => {
                self.import(&json)?;
                Outcome::changed()
            }
            Command::Export => Outcome::Exported(self.export()?),
            Command::Preview => Outcome::Preview(self.preview()),
            Command::ClearAll => {
                self.clear_all();
                Outcome::changed()
            }
            Command::Key(chord) => self.handle_key(chord)?,
        };
        Ok(outcome)
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("document", &self.document)
            .field("selection", &self.selection)
            .field("version", &self.version)
            .field("noop_count", &self.noop_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::ManualClock;
    use crate::config::{ConfigError, DEFAULT_CONFIG_NAME};
    use crate::storage::{StorageError, CONTENT_KEY};
    use std::time::Duration;

    fn session_with_clock() -> (EditorSession, ManualClock) {
        let clock = ManualClock::new();
        let session = EditorSession::open(
            &EditorConfig::default(),
            Box::new(MemoryStorage::new()),
            Box::new(clock.clone()),
        );
        (session, clock)
    }

    #[test]
    fn test_apply_records_history_and_version() {
        let mut session = EditorSession::in_memory();
        let id = session.add_block(BlockType::Paragraph, None).unwrap();

        assert_eq!(session.version(), 1);
        assert_eq!(session.blocks().len(), 1);
        assert_eq!(session.blocks()[0].id, id);
        assert_eq!(session.history().undo_description(), Some("insert"));
        assert!(session.can_undo());
    }

    #[test]
    fn test_noop_is_counted_not_recorded() {
        let mut session = EditorSession::in_memory();
        assert!(!session.delete_block("missing"));
        assert_eq!(session.noop_count(), 1);
        assert_eq!(session.version(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut session = EditorSession::in_memory();
        let a = session.add_block(BlockType::Paragraph, None).unwrap();
        let b = session.add_block(BlockType::Quote, None).unwrap();

        session.select(&b);
        session.delete_block(&a);
        assert_eq!(session.selection().block_id.as_deref(), Some(b.as_str()));

        session.delete_block(&b);
        assert_eq!(session.selection(), &Selection::default());
    }

    #[test]
    fn test_deleting_container_clears_selected_descendant() {
        let mut session = EditorSession::in_memory();
        let section = session.add_block(BlockType::Section, None).unwrap();
        let child = session.add_child_block(&section, BlockType::Paragraph).unwrap();

        session.select(&child);
        session.delete_block(&section);

        assert_eq!(session.selection(), &Selection::default());
        assert!(session.selected_block().is_none());
    }

    #[test]
    fn test_undo_prunes_selection() {
        let mut session = EditorSession::in_memory();
        let id = session.add_block(BlockType::H1, None).unwrap();
        session.select(&id);
        assert!(session.selection().show_style_panel);

        assert!(session.undo());
        assert!(session.selection().block_id.is_none());
        assert!(session.selected_block().is_none());
    }

    #[test]
    fn test_open_dir_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"historyCapacity": 2}"#).unwrap();

        let mut session = EditorSession::open_dir(dir.path()).unwrap();
        for _ in 0..4 {
            session.add_block(BlockType::Paragraph, None);
        }
        session.flush().unwrap();

        assert_eq!(session.history().undo_levels(), 1);
        assert!(dir.path().join("article-editor-content.json").exists());
    }

    #[test]
    fn test_open_dir_rejects_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{not json").unwrap();

        let err = EditorSession::open_dir(dir.path()).err().unwrap();
        assert!(matches!(err, EditorError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_flush_reports_storage_error() {
        let mut session = EditorSession::open(
            &EditorConfig::default(),
            Box::new(MemoryStorage::with_quota(8)),
            Box::new(ManualClock::new()),
        );
        session.add_block(BlockType::Paragraph, None);

        let err = session.flush().unwrap_err();
        assert!(matches!(
            err,
            EditorError::Storage(StorageError::QuotaExceeded { .. })
        ));
        assert!(!session.autosave_pending());
    }

    #[test]
    fn test_autosave_debounce() {
        let (mut session, clock) = session_with_clock();
        session.add_block(BlockType::Paragraph, None);
        assert!(session.autosave_pending());

        clock.advance(Duration::from_millis(1000));
        session.add_block(BlockType::Paragraph, None);
        clock.advance(Duration::from_millis(1500));
        assert!(!session.tick());
        assert!(session.storage().get(CONTENT_KEY).unwrap().is_none());

        clock.advance(Duration::from_millis(500));
        assert!(session.tick());
        assert!(!session.autosave_pending());
        assert!(session.storage().get(CONTENT_KEY).unwrap().is_some());
    }

    #[test]
    fn test_dispatch_key() {
        let mut session = EditorSession::in_memory();
        session.add_block(BlockType::Divider, None);

        let outcome = session.dispatch(Command::Key(KeyChord::modified('z'))).unwrap();
        assert_eq!(outcome, Outcome::changed());
        assert!(session.blocks().is_empty());

        let outcome = session.dispatch(Command::Key(KeyChord::modified('y'))).unwrap();
        assert_eq!(outcome, Outcome::changed());
        assert_eq!(session.blocks().len(), 1);

        let outcome = session.dispatch(Command::Key(KeyChord::modified('q'))).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);

        let outcome = session.dispatch(Command::Key(KeyChord::modified('s'))).unwrap();
        assert!(matches!(outcome, Outcome::Exported(file) if file.filename.starts_with("untitled-article-")));
    }

    #[test]
    fn test_tags_and_container() {
        let mut session = EditorSession::in_memory();
        assert!(session.add_tag("rust"));
        assert!(!session.add_tag(" rust "));
        session.update_container(ContainerSetting::MaxWidth, "2xl");

        assert_eq!(session.document().article_meta.tags, vec!["rust"]);
        assert_eq!(session.document().container_settings.max_width, "2xl");
        assert_eq!(session.version(), 2);
    }
}
