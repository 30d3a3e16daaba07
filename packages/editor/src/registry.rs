//! # Block Type Registry
//!
//! Static catalog of block types shown in the palette. Lookups never fail:
//! tags are also matched against free-form search input, so an unknown tag
//! resolves to the first catalog entry.

use crate::block::{Block, BlockType};
use crate::id_generator::IdGenerator;
use crate::mutations::collect_ids;

/// Palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Text,
    Code,
    Layout,
    Media,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Code => "code",
            Category::Layout => "layout",
            Category::Media => "media",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Text => "Text Elements",
            Category::Code => "Code",
            Category::Layout => "Layout",
            Category::Media => "Media",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTypeInfo {
    pub block_type: BlockType,
    pub label: &'static str,
    pub category: Category,
}

const fn entry(block_type: BlockType, label: &'static str, category: Category) -> BlockTypeInfo {
    BlockTypeInfo {
        block_type,
        label,
        category,
    }
}

pub static BLOCK_TYPES: [BlockTypeInfo; 19] = [
    entry(BlockType::H1, "Heading 1", Category::Text),
    entry(BlockType::H2, "Heading 2", Category::Text),
    entry(BlockType::H3, "Heading 3", Category::Text),
    entry(BlockType::H4, "Heading 4", Category::Text),
    entry(BlockType::H5, "Heading 5", Category::Text),
    entry(BlockType::H6, "Heading 6", Category::Text),
    entry(BlockType::Paragraph, "Paragraph", Category::Text),
    entry(BlockType::Caption, "Caption", Category::Text),
    entry(BlockType::Quote, "Quote", Category::Text),
    entry(BlockType::List, "Bullet List", Category::Text),
    entry(BlockType::NumberedList, "Numbered List", Category::Text),
    entry(BlockType::Code, "Code Block", Category::Code),
    entry(BlockType::Divider, "Divider", Category::Layout),
    entry(BlockType::Image, "Image", Category::Media),
    entry(BlockType::Video, "Video", Category::Media),
    entry(BlockType::Pdf, "PDF", Category::Media),
    entry(BlockType::File, "File", Category::Media),
    entry(BlockType::Section, "Section", Category::Layout),
    entry(BlockType::Flex, "Flex Container", Category::Layout),
];

/// Look up a type tag, falling back to the first entry for unknown tags
pub fn registry_entry(tag: &str) -> &'static BlockTypeInfo {
    BLOCK_TYPES
        .iter()
        .find(|info| info.block_type.as_str() == tag)
        .unwrap_or(&BLOCK_TYPES[0])
}

/// Typed lookup; every `BlockType` has an entry
pub fn info(block_type: BlockType) -> &'static BlockTypeInfo {
    registry_entry(block_type.as_str())
}

/// Categories in order of first appearance, each with its entries
pub fn block_types_by_category() -> Vec<(Category, Vec<&'static BlockTypeInfo>)> {
    group(BLOCK_TYPES.iter())
}

/// Palette search: case-insensitive match against label or tag.
/// Empty categories are omitted.
pub fn search_block_types(query: &str) -> Vec<(Category, Vec<&'static BlockTypeInfo>)> {
    let needle = query.to_lowercase();
    group(BLOCK_TYPES.iter().filter(|info| {
        info.label.to_lowercase().contains(&needle) || info.block_type.as_str().contains(&needle)
    }))
}

fn group<'a>(
    entries: impl Iterator<Item = &'a BlockTypeInfo>,
) -> Vec<(Category, Vec<&'a BlockTypeInfo>)> {
    let mut groups: Vec<(Category, Vec<&BlockTypeInfo>)> = Vec::new();
    for info in entries {
        match groups.iter_mut().find(|(category, _)| *category == info.category) {
            Some((_, members)) => members.push(info),
            None => groups.push((info.category, vec![info])),
        }
    }
    groups
}

/// Create a block with the type's default content and an id not used anywhere
/// in `tree`
pub fn create_default_block(block_type: BlockType, tree: &[Block], ids: &mut IdGenerator) -> Block {
    let mut taken = collect_ids(tree);
    Block::new_default(ids.fresh_id(&mut taken), block_type)
}

/// Languages offered by the code block picker (value, label)
pub const PROGRAMMING_LANGUAGES: [(&str, &str); 22] = [
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("python", "Python"),
    ("java", "Java"),
    ("cpp", "C++"),
    ("csharp", "C#"),
    ("go", "Go"),
    ("rust", "Rust"),
    ("php", "PHP"),
    ("ruby", "Ruby"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("sql", "SQL"),
    ("bash", "Bash"),
    ("json", "JSON"),
    ("yaml", "YAML"),
    ("markdown", "Markdown"),
    ("jsx", "JSX"),
    ("tsx", "TSX"),
];
