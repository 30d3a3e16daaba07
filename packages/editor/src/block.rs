//! # Block Model
//!
//! A [`Block`] is one node of the article tree. Its `content` shape is
//! determined by its [`BlockType`]:
//!
//! | Types                                   | Content                    |
//! |-----------------------------------------|----------------------------|
//! | h1-h6, paragraph, caption, quote, media | `Text(String)`             |
//! | list, numbered-list                     | `Items(Vec<String>)`       |
//! | code                                    | `Code { code, language }`  |
//! | divider, flex, section                  | none                       |
//!
//! Only containers (flex, section) carry `children`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Free-form CSS-like style properties
pub type Styles = HashMap<String, String>;

/// Language assigned to freshly created code blocks
pub const DEFAULT_CODE_LANGUAGE: &str = "javascript";

/// First entry of a freshly created list block
pub const DEFAULT_LIST_ITEM: &str = "Item 1";

/// Closed set of block type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Paragraph,
    Caption,
    Quote,
    List,
    NumberedList,
    Code,
    Divider,
    Image,
    Video,
    Pdf,
    File,
    Flex,
    Section,
}

/// Shape a block's `content` must take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Text,
    Items,
    Code,
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown block type: {0}")]
pub struct UnknownBlockType(pub String);

impl BlockType {
    /// Every block type, in palette order
    pub const ALL: [BlockType; 19] = [
        BlockType::H1,
        BlockType::H2,
        BlockType::H3,
        BlockType::H4,
        BlockType::H5,
        BlockType::H6,
        BlockType::Paragraph,
        BlockType::Caption,
        BlockType::Quote,
        BlockType::List,
        BlockType::NumberedList,
        BlockType::Code,
        BlockType::Divider,
        BlockType::Image,
        BlockType::Video,
        BlockType::Pdf,
        BlockType::File,
        BlockType::Section,
        BlockType::Flex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::H1 => "h1",
            BlockType::H2 => "h2",
            BlockType::H3 => "h3",
            BlockType::H4 => "h4",
            BlockType::H5 => "h5",
            BlockType::H6 => "h6",
            BlockType::Paragraph => "paragraph",
            BlockType::Caption => "caption",
            BlockType::Quote => "quote",
            BlockType::List => "list",
            BlockType::NumberedList => "numbered-list",
            BlockType::Code => "code",
            BlockType::Divider => "divider",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::Pdf => "pdf",
            BlockType::File => "file",
            BlockType::Flex => "flex",
            BlockType::Section => "section",
        }
    }

    /// Containers own an ordered list of child blocks
    pub fn is_container(&self) -> bool {
        matches!(self, BlockType::Flex | BlockType::Section)
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            BlockType::H1
                | BlockType::H2
                | BlockType::H3
                | BlockType::H4
                | BlockType::H5
                | BlockType::H6
        )
    }

    /// Text blocks can be retyped into one another
    pub fn is_text(&self) -> bool {
        self.is_heading() || matches!(self, BlockType::Paragraph | BlockType::Caption)
    }

    pub fn content_shape(&self) -> ContentShape {
        match self {
            BlockType::List | BlockType::NumberedList => ContentShape::Items,
            BlockType::Code => ContentShape::Code,
            BlockType::Divider | BlockType::Flex | BlockType::Section => ContentShape::Empty,
            _ => ContentShape::Text,
        }
    }

    /// Content a freshly created block of this type starts with
    pub fn default_content(&self) -> Option<BlockContent> {
        match self.content_shape() {
            ContentShape::Text => Some(BlockContent::Text(String::new())),
            ContentShape::Items => Some(BlockContent::Items(vec![DEFAULT_LIST_ITEM.to_string()])),
            ContentShape::Code => Some(BlockContent::Code(CodeContent::default())),
            ContentShape::Empty => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

/// Payload of a code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeContent {
    pub code: String,
    pub language: String,
}

impl Default for CodeContent {
    fn default() -> Self {
        Self {
            code: String::new(),
            language: DEFAULT_CODE_LANGUAGE.to_string(),
        }
    }
}

/// Polymorphic block payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(String),
    Items(Vec<String>),
    Code(CodeContent),
}

impl BlockContent {
    pub fn shape(&self) -> ContentShape {
        match self {
            BlockContent::Text(_) => ContentShape::Text,
            BlockContent::Items(_) => ContentShape::Items,
            BlockContent::Code(_) => ContentShape::Code,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BlockContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for BlockContent {
    fn from(text: &str) -> Self {
        BlockContent::Text(text.to_string())
    }
}

impl From<String> for BlockContent {
    fn from(text: String) -> Self {
        BlockContent::Text(text)
    }
}

impl From<Vec<String>> for BlockContent {
    fn from(items: Vec<String>) -> Self {
        BlockContent::Items(items)
    }
}

impl From<CodeContent> for BlockContent {
    fn from(code: CodeContent) -> Self {
        BlockContent::Code(code)
    }
}

/// A node in the article tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<BlockContent>,

    #[serde(default)]
    pub styles: Styles,

    /// Present only on container types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
}

impl Block {
    /// Create a block with the type's default content and no styles
    pub fn new_default(id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            id: id.into(),
            block_type,
            content: block_type.default_content(),
            styles: Styles::new(),
            children: block_type.is_container().then(Vec::new),
        }
    }

    pub fn with_content(mut self, content: impl Into<BlockContent>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(key.into(), value.into());
        self
    }

    /// Append a child; ignored on leaf blocks
    pub fn with_child(mut self, child: Block) -> Self {
        if let Some(children) = self.children.as_mut() {
            children.push(child);
        }
        self
    }

    pub fn is_container(&self) -> bool {
        self.block_type.is_container()
    }

    /// Children of this block (empty for leaves)
    pub fn children(&self) -> &[Block] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        self.children.as_mut()
    }

    /// Whether `content` matches the shape the type expects
    pub fn content_matches_type(&self) -> bool {
        match (&self.content, self.block_type.content_shape()) {
            (None, ContentShape::Empty) => true,
            (Some(content), shape) => content.shape() == shape,
            (None, _) => false,
        }
    }

    /// Visit this block and all descendants, depth-first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}
