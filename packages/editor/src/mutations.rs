//! # Tree Mutations
//!
//! Semantic operations on the block tree.
//!
//! ## Design Principles
//!
//! 1. **Pure**: every operation borrows the input tree and returns a new one;
//!    the input is never touched, so history snapshots stay valid
//! 2. **Total**: an operation that cannot resolve its target leaves the tree
//!    unchanged instead of failing the caller
//! 3. **Depth-first lookup**: ids are found anywhere in the tree, including
//!    inside container children
//!
//! Each operation exists twice: a plain function returning the (possibly
//! unchanged) tree, and a [`Mutation`] variant whose `apply` reports *why*
//! nothing happened, so the session can log and count unresolved commands.
//!
//! ## Mutation Semantics
//!
//! ### Insert / AddChild
//! - Insert works at root level only; an index past the end appends
//! - AddChild appends to a flex/section container
//!
//! ### Move vs Reorder
//! - Move swaps with the adjacent sibling inside the same parent list
//! - Reorder splices a root block out and back in at another root index
//!
//! ### Duplicate
//! - Deep copy inserted right after the original; every copied node gets a
//!   fresh id

use crate::block::{Block, BlockContent, BlockType};
use crate::id_generator::IdGenerator;
use crate::registry::create_default_block;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Semantic mutations on the block tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a new default block at root level (append when `position` is
    /// absent or out of range)
    Insert {
        block_type: BlockType,
        position: Option<usize>,
    },

    /// Append a new default block to a container's children
    AddChild {
        parent_id: String,
        block_type: BlockType,
    },

    /// Replace a block's content (atomic replacement)
    UpdateContent {
        id: String,
        content: Option<BlockContent>,
    },

    /// Set a single style property (last write wins)
    UpdateStyle {
        id: String,
        key: String,
        value: String,
    },

    /// Remove a block and its subtree
    Delete { id: String },

    /// Swap with the adjacent sibling
    Move { id: String, direction: Direction },

    /// Root-level splice of `active_id` to the index of `over_id`
    Reorder { active_id: String, over_id: String },

    /// Copy a block (and subtree) right after itself
    Duplicate { id: String },

    /// Retype a text block and apply the new type's style preset
    ChangeType { id: String, new_type: BlockType },
}

/// Why a mutation left the tree unchanged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Block not found at root level: {0}")]
    NotAtRoot(String),

    #[error("Block is not a container: {0}")]
    NotAContainer(String),

    #[error("Block is already at the {direction:?} boundary: {id}")]
    AtBoundary { id: String, direction: Direction },

    #[error("Cannot change {from} into {to}: only text blocks can be retyped")]
    NotRetypable { from: BlockType, to: BlockType },
}

/// Tree produced by a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub blocks: Vec<Block>,

    /// Id of the block created by Insert/AddChild/Duplicate
    pub created_id: Option<String>,
}

impl Applied {
    fn tree(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            created_id: None,
        }
    }

    fn created(blocks: Vec<Block>, id: String) -> Self {
        Self {
            blocks,
            created_id: Some(id),
        }
    }
}

impl Mutation {
    /// Apply to `blocks`, returning the new tree. `blocks` is not modified.
    pub fn apply(&self, blocks: &[Block], ids: &mut IdGenerator) -> Result<Applied, MutationError> {
        match self {
            Mutation::Insert {
                block_type,
                position,
            } => {
                let (tree, id) = insert_block(blocks, *block_type, *position, ids);
                Ok(Applied::created(tree, id))
            }

            Mutation::AddChild {
                parent_id,
                block_type,
            } => {
                let (tree, id) = try_add_child(blocks, parent_id, *block_type, ids)?;
                Ok(Applied::created(tree, id))
            }

            Mutation::UpdateContent { id, content } => {
                try_update_content(blocks, id, content.clone()).map(Applied::tree)
            }

            Mutation::UpdateStyle { id, key, value } => {
                try_update_style(blocks, id, key, value).map(Applied::tree)
            }

            Mutation::Delete { id } => try_delete(blocks, id).map(Applied::tree),

            Mutation::Move { id, direction } => try_move(blocks, id, *direction).map(Applied::tree),

            Mutation::Reorder { active_id, over_id } => {
                try_reorder(blocks, active_id, over_id).map(Applied::tree)
            }

            Mutation::Duplicate { id } => {
                let (tree, copy_id) = try_duplicate(blocks, id, ids)?;
                Ok(Applied::created(tree, copy_id))
            }

            Mutation::ChangeType { id, new_type } => {
                try_change_type(blocks, id, *new_type).map(Applied::tree)
            }
        }
    }

    /// Get a debug name for this mutation
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Insert { .. } => "insert",
            Mutation::AddChild { .. } => "add-child",
            Mutation::UpdateContent { .. } => "update-content",
            Mutation::UpdateStyle { .. } => "update-style",
            Mutation::Delete { .. } => "delete",
            Mutation::Move { .. } => "move",
            Mutation::Reorder { .. } => "reorder",
            Mutation::Duplicate { .. } => "duplicate",
            Mutation::ChangeType { .. } => "change-type",
        }
    }

    /// Id of the block this mutation addresses, if any
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Mutation::Insert { .. } => None,
            Mutation::AddChild { parent_id, .. } => Some(parent_id.as_str()),
            Mutation::Reorder { active_id, .. } => Some(active_id.as_str()),
            Mutation::UpdateContent { id, .. }
            | Mutation::UpdateStyle { id, .. }
            | Mutation::Delete { id }
            | Mutation::Move { id, .. }
            | Mutation::Duplicate { id }
            | Mutation::ChangeType { id, .. } => Some(id.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Depth-first search for a block anywhere in the tree
pub fn find_block<'a>(blocks: &'a [Block], id: &str) -> Option<&'a Block> {
    for block in blocks {
        if block.id == id {
            return Some(block);
        }
        if let Some(found) = find_block(block.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_block_mut<'a>(blocks: &'a mut [Block], id: &str) -> Option<&'a mut Block> {
    for block in blocks.iter_mut() {
        if block.id == id {
            return Some(block);
        }
        if let Some(children) = block.children.as_mut() {
            if let Some(found) = find_block_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Find the list that directly holds `id`, with the block's index in it
fn locate_mut<'a>(list: &'a mut Vec<Block>, id: &str) -> Option<(&'a mut Vec<Block>, usize)> {
    if let Some(index) = list.iter().position(|b| b.id == id) {
        return Some((list, index));
    }
    for block in list.iter_mut() {
        if let Some(children) = block.children.as_mut() {
            if let Some(found) = locate_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Every id in the tree
pub fn collect_ids(blocks: &[Block]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for block in blocks {
        block.walk(&mut |b| {
            ids.insert(b.id.clone());
        });
    }
    ids
}

/// Number of blocks in the tree, descendants included
pub fn block_count(blocks: &[Block]) -> usize {
    blocks.iter().map(|b| 1 + block_count(b.children())).sum()
}

/// Root-level index of `id`
pub fn root_index(blocks: &[Block], id: &str) -> Option<usize> {
    blocks.iter().position(|b| b.id == id)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Insert a default block at root level; returns the new tree and block id
pub fn insert_block(
    blocks: &[Block],
    block_type: BlockType,
    position: Option<usize>,
    ids: &mut IdGenerator,
) -> (Vec<Block>, String) {
    let block = create_default_block(block_type, blocks, ids);
    let id = block.id.clone();

    let mut next = blocks.to_vec();
    match position {
        Some(index) if index < next.len() => next.insert(index, block),
        _ => next.push(block),
    }
    (next, id)
}

fn try_add_child(
    blocks: &[Block],
    parent_id: &str,
    block_type: BlockType,
    ids: &mut IdGenerator,
) -> Result<(Vec<Block>, String), MutationError> {
    let mut next = blocks.to_vec();
    let parent = find_block_mut(&mut next, parent_id)
        .ok_or_else(|| MutationError::BlockNotFound(parent_id.to_string()))?;

    if !parent.is_container() {
        return Err(MutationError::NotAContainer(parent_id.to_string()));
    }

    let child = create_default_block(block_type, blocks, ids);
    let id = child.id.clone();
    parent.children.get_or_insert_with(Vec::new).push(child);
    Ok((next, id))
}

/// Append a default block to a container; unchanged if `parent_id` is
/// missing or not a container
pub fn add_child(
    blocks: &[Block],
    parent_id: &str,
    block_type: BlockType,
    ids: &mut IdGenerator,
) -> Vec<Block> {
    try_add_child(blocks, parent_id, block_type, ids)
        .map(|(tree, _)| tree)
        .unwrap_or_else(|_| blocks.to_vec())
}

fn try_update_content(
    blocks: &[Block],
    id: &str,
    content: Option<BlockContent>,
) -> Result<Vec<Block>, MutationError> {
    let mut next = blocks.to_vec();
    let block =
        find_block_mut(&mut next, id).ok_or_else(|| MutationError::BlockNotFound(id.to_string()))?;
    block.content = content;
    Ok(next)
}

/// Replace a block's content. The caller supplies a shape matching the type.
pub fn update_content(blocks: &[Block], id: &str, content: Option<BlockContent>) -> Vec<Block> {
    try_update_content(blocks, id, content).unwrap_or_else(|_| blocks.to_vec())
}

fn try_update_style(
    blocks: &[Block],
    id: &str,
    key: &str,
    value: &str,
) -> Result<Vec<Block>, MutationError> {
    let mut next = blocks.to_vec();
    let block =
        find_block_mut(&mut next, id).ok_or_else(|| MutationError::BlockNotFound(id.to_string()))?;
    block.styles.insert(key.to_string(), value.to_string());
    Ok(next)
}

/// Merge one style property into a block
pub fn update_style(blocks: &[Block], id: &str, key: &str, value: &str) -> Vec<Block> {
    try_update_style(blocks, id, key, value).unwrap_or_else(|_| blocks.to_vec())
}

/// Filter `id` out of `list` and every nested child list
fn remove_recursive(list: &mut Vec<Block>, id: &str) -> bool {
    let before = list.len();
    list.retain(|b| b.id != id);
    let mut removed = list.len() != before;
    for block in list.iter_mut() {
        if let Some(children) = block.children.as_mut() {
            removed |= remove_recursive(children, id);
        }
    }
    removed
}

fn try_delete(blocks: &[Block], id: &str) -> Result<Vec<Block>, MutationError> {
    let mut next = blocks.to_vec();
    if remove_recursive(&mut next, id) {
        Ok(next)
    } else {
        Err(MutationError::BlockNotFound(id.to_string()))
    }
}

/// Remove a block (and its subtree) from wherever it resides
pub fn delete_block(blocks: &[Block], id: &str) -> Vec<Block> {
    try_delete(blocks, id).unwrap_or_else(|_| blocks.to_vec())
}

fn try_move(blocks: &[Block], id: &str, direction: Direction) -> Result<Vec<Block>, MutationError> {
    let mut next = blocks.to_vec();
    let (list, index) =
        locate_mut(&mut next, id).ok_or_else(|| MutationError::BlockNotFound(id.to_string()))?;

    let target = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|&i| i < list.len()),
    };
    let target = target.ok_or_else(|| MutationError::AtBoundary {
        id: id.to_string(),
        direction,
    })?;

    list.swap(index, target);
    Ok(next)
}

/// Swap a block with its sibling in `direction`, within the same parent
pub fn move_block(blocks: &[Block], id: &str, direction: Direction) -> Vec<Block> {
    try_move(blocks, id, direction).unwrap_or_else(|_| blocks.to_vec())
}

fn try_reorder(blocks: &[Block], active_id: &str, over_id: &str) -> Result<Vec<Block>, MutationError> {
    let old_index =
        root_index(blocks, active_id).ok_or_else(|| MutationError::NotAtRoot(active_id.to_string()))?;
    let new_index =
        root_index(blocks, over_id).ok_or_else(|| MutationError::NotAtRoot(over_id.to_string()))?;

    let mut next = blocks.to_vec();
    let removed = next.remove(old_index);
    next.insert(new_index, removed);
    Ok(next)
}

/// Splice the root block `active_id` out and back in at the index of `over_id`
pub fn reorder_blocks(blocks: &[Block], active_id: &str, over_id: &str) -> Vec<Block> {
    try_reorder(blocks, active_id, over_id).unwrap_or_else(|_| blocks.to_vec())
}

/// Give `block` and every descendant a fresh id
fn regenerate_ids(block: &mut Block, ids: &mut IdGenerator, taken: &mut HashSet<String>) {
    block.id = ids.fresh_id(taken);
    if let Some(children) = block.children.as_mut() {
        for child in children {
            regenerate_ids(child, ids, taken);
        }
    }
}

fn try_duplicate(
    blocks: &[Block],
    id: &str,
    ids: &mut IdGenerator,
) -> Result<(Vec<Block>, String), MutationError> {
    let mut taken = collect_ids(blocks);
    let mut next = blocks.to_vec();
    let (list, index) =
        locate_mut(&mut next, id).ok_or_else(|| MutationError::BlockNotFound(id.to_string()))?;

    let mut copy = list[index].clone();
    regenerate_ids(&mut copy, ids, &mut taken);
    let copy_id = copy.id.clone();
    list.insert(index + 1, copy);
    Ok((next, copy_id))
}

/// Deep-copy a block right after itself, with fresh ids throughout the copy
pub fn duplicate_block(blocks: &[Block], id: &str, ids: &mut IdGenerator) -> Vec<Block> {
    try_duplicate(blocks, id, ids)
        .map(|(tree, _)| tree)
        .unwrap_or_else(|_| blocks.to_vec())
}

/// Style preset applied when a text block changes type: (fontSize, fontWeight, marginBottom)
pub fn text_style_preset(block_type: BlockType) -> (&'static str, &'static str, &'static str) {
    let font_size = match block_type {
        BlockType::H1 => "2.5rem",
        BlockType::H2 => "2rem",
        BlockType::H3 => "1.75rem",
        BlockType::H4 => "1.5rem",
        BlockType::H5 => "1.25rem",
        BlockType::H6 => "1.1rem",
        BlockType::Caption => "0.875rem",
        _ => "1rem",
    };
    if block_type.is_heading() {
        (font_size, "700", "1rem")
    } else {
        (font_size, "400", "0.5rem")
    }
}

fn try_change_type(blocks: &[Block], id: &str, new_type: BlockType) -> Result<Vec<Block>, MutationError> {
    let mut next = blocks.to_vec();
    let block =
        find_block_mut(&mut next, id).ok_or_else(|| MutationError::BlockNotFound(id.to_string()))?;

    if !block.block_type.is_text() || !new_type.is_text() {
        return Err(MutationError::NotRetypable {
            from: block.block_type,
            to: new_type,
        });
    }

    let (font_size, font_weight, margin_bottom) = text_style_preset(new_type);
    block.block_type = new_type;
    block.styles.insert("fontSize".to_string(), font_size.to_string());
    block.styles.insert("fontWeight".to_string(), font_weight.to_string());
    block.styles.insert("marginBottom".to_string(), margin_bottom.to_string());
    Ok(next)
}

/// Retype a text block, refreshing its font preset and keeping everything else
pub fn change_type(blocks: &[Block], id: &str, new_type: BlockType) -> Vec<Block> {
    try_change_type(blocks, id, new_type).unwrap_or_else(|_| blocks.to_vec())
}
