//! # Article Document
//!
//! Root aggregate of an editing session: article metadata, page-level
//! container settings and the root block list.
//!
//! ```text
//! Document
//!  ├─ article_meta        title, author, tags, timestamps
//!  ├─ container_settings  presentation only (width, padding, fonts)
//!  └─ blocks              Vec<Block>, each owning its subtree
//! ```

use crate::block::Block;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_TITLE: &str = "Untitled Article";

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// Descriptive metadata of the article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMeta {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    /// Insertion-ordered, duplicate-free
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Keep the first occurrence of each tag
fn dedupe_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(dedupe_tags)
}

/// A single metadata edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaUpdate {
    Title(String),
    Description(String),
    Author(String),
    Tags(Vec<String>),
}

impl ArticleMeta {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            title: default_title(),
            description: String::new(),
            author: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an edit and bump `updated_at`
    pub fn apply(&mut self, update: MetaUpdate, now: DateTime<Utc>) {
        match update {
            MetaUpdate::Title(title) => self.title = title,
            MetaUpdate::Description(description) => self.description = description,
            MetaUpdate::Author(author) => self.author = author,
            MetaUpdate::Tags(tags) => self.tags = dedupe_tags(tags),
        }
        self.updated_at = now;
    }

    /// Add a trimmed, non-empty tag unless already present
    pub fn add_tag(&mut self, tag: &str, now: DateTime<Utc>) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        self.updated_at = now;
        true
    }

    pub fn remove_tag(&mut self, tag: &str, now: DateTime<Utc>) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() == before {
            return false;
        }
        self.updated_at = now;
        true
    }
}

impl Default for ArticleMeta {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

/// Page-level presentation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerSettings {
    pub max_width: String,
    pub padding: String,
    pub background_color: String,
    pub font_family: String,
    pub font_size: String,
    pub line_height: String,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            max_width: "4xl".to_string(),
            padding: "8".to_string(),
            background_color: "#ffffff".to_string(),
            font_family: "inherit".to_string(),
            font_size: "16px".to_string(),
            line_height: "1.6".to_string(),
        }
    }
}

/// Keys of [`ContainerSettings`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerSetting {
    MaxWidth,
    Padding,
    BackgroundColor,
    FontFamily,
    FontSize,
    LineHeight,
}

impl ContainerSettings {
    pub fn get(&self, setting: ContainerSetting) -> &str {
        match setting {
            ContainerSetting::MaxWidth => &self.max_width,
            ContainerSetting::Padding => &self.padding,
            ContainerSetting::BackgroundColor => &self.background_color,
            ContainerSetting::FontFamily => &self.font_family,
            ContainerSetting::FontSize => &self.font_size,
            ContainerSetting::LineHeight => &self.line_height,
        }
    }

    pub fn set(&mut self, setting: ContainerSetting, value: impl Into<String>) {
        let slot = match setting {
            ContainerSetting::MaxWidth => &mut self.max_width,
            ContainerSetting::Padding => &mut self.padding,
            ContainerSetting::BackgroundColor => &mut self.background_color,
            ContainerSetting::FontFamily => &mut self.font_family,
            ContainerSetting::FontSize => &mut self.font_size,
            ContainerSetting::LineHeight => &mut self.line_height,
        };
        *slot = value.into();
    }
}

/// Editable article
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub article_meta: ArticleMeta,
    pub container_settings: ContainerSettings,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Empty article created at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            article_meta: ArticleMeta::new(now),
            container_settings: ContainerSettings::default(),
            blocks: Vec::new(),
        }
    }
}

/// Snapshot handed to the read-only preview renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewArticle {
    pub metadata: ArticleMeta,
    pub container_settings: ContainerSettings,
    pub blocks: Vec<Block>,
}

impl From<&Document> for PreviewArticle {
    fn from(doc: &Document) -> Self {
        Self {
            metadata: doc.article_meta.clone(),
            container_settings: doc.container_settings.clone(),
            blocks: doc.blocks.clone(),
        }
    }
}

impl From<PreviewArticle> for Document {
    fn from(preview: PreviewArticle) -> Self {
        Self {
            article_meta: preview.metadata,
            container_settings: preview.container_settings,
            blocks: preview.blocks,
        }
    }
}
