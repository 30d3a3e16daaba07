//! # Article Editor
//!
//! Document editing core for block-based articles.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: palette, canvas, style panel, keys    │
//! └─────────────────────────────────────────────┘
//!                     ↓ Command / drag gestures
//! ┌─────────────────────────────────────────────┐
//! │ session: EditorSession                      │
//! │  - Reconcile drops into mutations           │
//! │  - Apply mutations to the block tree        │
//! │  - Record undo/redo snapshots               │
//! │  - Debounced autosave to Storage            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer: export envelope / import        │
//! │ storage: content, meta, container, preview  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Blocks own their subtrees**: a tree, never a graph
//! 2. **Pure operations**: mutations build a new tree, the input is untouched
//! 3. **Ids are unique**: across the whole tree, including nested children
//! 4. **Snapshots, not inverses**: history stores whole trees
//!
//! ## Usage
//!
//! ```rust
//! use article_editor::{BlockType, Direction, EditorSession};
//!
//! let mut session = EditorSession::in_memory();
//!
//! let intro = session.add_block(BlockType::H1, None).unwrap();
//! let body = session.add_block(BlockType::Paragraph, None).unwrap();
//! assert!(session.move_block(&body, Direction::Up));
//! assert_eq!(session.blocks()[1].id, intro);
//!
//! session.undo();
//! assert_eq!(session.blocks()[0].id, intro);
//! ```

mod autosave;
mod block;
mod config;
mod dnd;
mod document;
mod errors;
mod history;
mod id_generator;
mod mutations;
mod registry;
mod serializer;
mod session;
mod shortcuts;
mod storage;

pub use autosave::{Autosave, Clock, ManualClock, SystemClock, DEFAULT_AUTOSAVE_DELAY};
pub use block::{
    Block, BlockContent, BlockType, CodeContent, ContentShape, Styles, UnknownBlockType,
    DEFAULT_CODE_LANGUAGE, DEFAULT_LIST_ITEM,
};
pub use config::{ConfigError, EditorConfig, DEFAULT_CONFIG_NAME};
pub use dnd::{
    closest_center, detect_collisions, pointer_within, rect_intersection, resolve_drop, Collision,
    DragSource, DragState, DropTarget, Droppable, Point, Rect, Reconciler, CANVAS_DROPPABLE_ID,
    DEFAULT_ACTIVATION_DISTANCE,
};
pub use document::{
    ArticleMeta, ContainerSetting, ContainerSettings, Document, MetaUpdate, PreviewArticle,
    DEFAULT_TITLE,
};
pub use errors::EditorError;
pub use history::{History, HistoryEntry, DEFAULT_HISTORY_CAPACITY};
pub use id_generator::{get_session_seed, IdGenerator};
pub use mutations::{
    add_child, block_count, change_type, collect_ids, delete_block, duplicate_block, find_block,
    insert_block, move_block, reorder_blocks, root_index, text_style_preset, update_content,
    update_style, Applied, Direction, Mutation, MutationError,
};
pub use registry::{
    block_types_by_category, create_default_block, info, registry_entry, search_block_types,
    BlockTypeInfo, Category, PROGRAMMING_LANGUAGES,
};
pub use serializer::{
    blocks_from_value, export_document, export_filename, import_document, normalize_blocks,
    ExportEnvelope, ImportError, FORMAT_VERSION,
};
pub use session::{Command, EditorSession, ExportFile, Outcome, Selection};
pub use shortcuts::{KeyChord, Shortcut};
pub use storage::{
    clear_persisted, load_persisted, read_preview, save_persisted, write_preview,
    DirectoryStorage, MemoryStorage, PersistedState, Storage, StorageError, CONTAINER_KEY,
    CONTENT_KEY, META_KEY, PREVIEW_KEY,
};
