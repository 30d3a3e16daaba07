//! # Article Serialization
//!
//! Export wraps the document in a versioned envelope:
//!
//! ```json
//! {
//!   "metadata": { "title": "...", "tags": [], "createdAt": "...", ... },
//!   "containerSettings": { "maxWidth": "4xl", ... },
//!   "blocks": [ { "id": "...", "type": "paragraph", "content": "", "styles": {} } ],
//!   "version": "2.0.0",
//!   "exportedAt": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! Import accepts that envelope or the legacy format (a bare block array).
//! Imported blocks are normalized rather than trusted: missing or duplicate
//! ids are regenerated, content is coerced to the shape its type expects,
//! and `children` only survives on containers.

use crate::block::{Block, BlockContent, BlockType, CodeContent, ContentShape, Styles};
use crate::block::{DEFAULT_CODE_LANGUAGE, DEFAULT_LIST_ITEM};
use crate::document::{ArticleMeta, ContainerSettings, Document};
use crate::id_generator::IdGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Envelope format version written on export
pub const FORMAT_VERSION: &str = "2.0.0";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("Invalid article format: {0}")]
    InvalidFormat(String),
}

impl ImportError {
    fn invalid(reason: impl Into<String>) -> Self {
        ImportError::InvalidFormat(reason.into())
    }
}

/// Versioned export wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub metadata: ArticleMeta,
    pub container_settings: ContainerSettings,
    pub blocks: Vec<Block>,
    pub version: String,
    pub exported_at: DateTime<Utc>,
}

impl ExportEnvelope {
    pub fn new(doc: &Document, exported_at: DateTime<Utc>) -> Self {
        Self {
            metadata: doc.article_meta.clone(),
            container_settings: doc.container_settings.clone(),
            blocks: doc.blocks.clone(),
            version: FORMAT_VERSION.to_string(),
            exported_at,
        }
    }
}

/// Serialize `doc` as a pretty-printed export envelope
pub fn export_document(doc: &Document, exported_at: DateTime<Utc>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ExportEnvelope::new(doc, exported_at))
}

/// Download filename: title with non-alphanumerics replaced, lower-cased,
/// plus a millisecond timestamp
pub fn export_filename(title: &str, timestamp_millis: i64) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("{stem}-{timestamp_millis}.json")
}

/// Parse an export envelope or legacy block array into a new document.
///
/// Legacy arrays keep `current`'s metadata and container settings; an
/// envelope without `containerSettings` keeps `current`'s settings.
pub fn import_document(
    json: &str,
    current: &Document,
    ids: &mut IdGenerator,
) -> Result<Document, ImportError> {
    let parsed: Value =
        serde_json::from_str(json).map_err(|e| ImportError::invalid(format!("malformed JSON: {e}")))?;

    match parsed {
        Value::Object(mut envelope) if is_present(&envelope, "metadata") && is_present(&envelope, "blocks") => {
            let metadata = envelope.remove("metadata").unwrap_or(Value::Null);
            let article_meta: ArticleMeta = serde_json::from_value(metadata)
                .map_err(|e| ImportError::invalid(format!("metadata: {e}")))?;

            let container_settings = match envelope.remove("containerSettings") {
                Some(settings) if !settings.is_null() => serde_json::from_value(settings)
                    .map_err(|e| ImportError::invalid(format!("containerSettings: {e}")))?,
                _ => current.container_settings.clone(),
            };

            let blocks = blocks_from_value(envelope.remove("blocks").unwrap_or(Value::Null), ids)?;
            debug!(blocks = blocks.len(), "Imported article envelope");

            Ok(Document {
                article_meta,
                container_settings,
                blocks,
            })
        }

        Value::Array(items) => {
            let blocks = normalize_blocks(items, ids)?;
            debug!(blocks = blocks.len(), "Imported legacy block array");

            Ok(Document {
                article_meta: current.article_meta.clone(),
                container_settings: current.container_settings.clone(),
                blocks,
            })
        }

        _ => Err(ImportError::invalid(
            "expected an export envelope with metadata and blocks, or a block array",
        )),
    }
}

fn is_present(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).is_some_and(|v| !v.is_null())
}

/// Normalize a JSON block array (import, storage) into a valid tree
pub fn blocks_from_value(value: Value, ids: &mut IdGenerator) -> Result<Vec<Block>, ImportError> {
    match value {
        Value::Array(items) => normalize_blocks(items, ids),
        other => Err(ImportError::invalid(format!(
            "blocks must be an array, found {}",
            json_kind(&other)
        ))),
    }
}

/// Normalize raw block values, keeping every id unique across the result
pub fn normalize_blocks(items: Vec<Value>, ids: &mut IdGenerator) -> Result<Vec<Block>, ImportError> {
    // Reserve every id present in the input so regenerated ids never collide
    let mut taken = HashSet::new();
    collect_raw_ids(&items, &mut taken);

    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| normalize_block(item, ids, &mut taken, &mut seen))
        .collect()
}

fn collect_raw_ids(items: &[Value], taken: &mut HashSet<String>) {
    for item in items {
        if let Some(id) = item.get("id").and_then(raw_id) {
            taken.insert(id);
        }
        if let Some(Value::Array(children)) = item.get("children") {
            collect_raw_ids(children, taken);
        }
    }
}

fn raw_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_block(
    value: Value,
    ids: &mut IdGenerator,
    taken: &mut HashSet<String>,
    seen: &mut HashSet<String>,
) -> Result<Block, ImportError> {
    let mut raw = match value {
        Value::Object(raw) => raw,
        other => {
            return Err(ImportError::invalid(format!(
                "block must be an object, found {}",
                json_kind(&other)
            )))
        }
    };

    let block_type: BlockType = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ImportError::invalid("block is missing its type"))?
        .parse()
        .map_err(|e: crate::block::UnknownBlockType| ImportError::invalid(e.to_string()))?;

    let id = match raw.get("id").and_then(raw_id) {
        Some(id) if !seen.contains(&id) => id,
        _ => ids.fresh_id(taken),
    };
    seen.insert(id.clone());

    let content = normalize_content(block_type, raw.remove("content"));
    let styles = normalize_styles(raw.remove("styles"));

    let children = if block_type.is_container() {
        let children = match raw.remove("children") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| normalize_block(item, ids, taken, seen))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        Some(children)
    } else {
        None
    };

    Ok(Block {
        id,
        block_type,
        content,
        styles,
        children,
    })
}

/// Coerce raw content into the shape `block_type` expects
fn normalize_content(block_type: BlockType, raw: Option<Value>) -> Option<BlockContent> {
    match block_type.content_shape() {
        ContentShape::Text => Some(BlockContent::Text(match raw {
            Some(Value::String(text)) => text,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        })),

        ContentShape::Items => Some(BlockContent::Items(match raw {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
            _ => vec![DEFAULT_LIST_ITEM.to_string()],
        })),

        ContentShape::Code => Some(BlockContent::Code(match raw {
            Some(Value::Object(code)) => CodeContent {
                code: code.get("code").and_then(scalar_to_string).unwrap_or_default(),
                language: code
                    .get("language")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_CODE_LANGUAGE)
                    .to_string(),
            },
            _ => CodeContent::default(),
        })),

        ContentShape::Empty => None,
    }
}

fn normalize_styles(raw: Option<Value>) -> Styles {
    match raw {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(&value).map(|v| (key, v)))
            .collect(),
        _ => Styles::new(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ids() -> IdGenerator {
        IdGenerator::from_seed("imp".to_string())
    }

    fn sample_document() -> Document {
        let mut doc = Document::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        doc.article_meta.title = "Hello World".to_string();
        doc.article_meta.tags = vec!["rust".to_string()];
        doc.blocks = vec![
            Block::new_default("h", BlockType::H2).with_content("Intro"),
            Block::new_default("l", BlockType::List)
                .with_content(vec!["one".to_string(), "two".to_string()]),
            Block::new_default("c", BlockType::Code).with_content(CodeContent {
                code: "fn main() {}".to_string(),
                language: "rust".to_string(),
            }),
            Block::new_default("d", BlockType::Divider),
            Block::new_default("s", BlockType::Section)
                .with_style("padding", "1rem")
                .with_child(Block::new_default("i", BlockType::Image).with_content("a.png")),
        ];
        doc
    }

    #[test]
    fn test_export_envelope_keys() {
        let doc = sample_document();
        let json = export_document(&doc, Utc::now()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        for key in ["metadata", "containerSettings", "blocks", "version", "exportedAt"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["version"], "2.0.0");
        assert_eq!(value["blocks"][2]["content"]["language"], "rust");
    }

    #[test]
    fn test_round_trip_preserves_blocks() {
        let doc = sample_document();
        let json = export_document(&doc, Utc::now()).unwrap();

        let imported = import_document(&json, &Document::default(), &mut ids()).unwrap();
        assert_eq!(imported.blocks, doc.blocks);
        assert_eq!(imported.article_meta, doc.article_meta);
        assert_eq!(imported.container_settings, doc.container_settings);
    }

    #[test]
    fn test_legacy_array_keeps_current_meta() {
        let mut current = Document::default();
        current.article_meta.title = "Keep me".to_string();

        let imported = import_document(
            r#"[{"id":"a","type":"paragraph","content":"hi"}]"#,
            &current,
            &mut ids(),
        )
        .unwrap();

        assert_eq!(imported.blocks.len(), 1);
        assert_eq!(imported.blocks[0].id, "a");
        assert_eq!(imported.blocks[0].content, Some(BlockContent::Text("hi".to_string())));
        assert_eq!(imported.article_meta.title, "Keep me");
    }

    #[test]
    fn test_import_drops_duplicate_tags() {
        let imported = import_document(
            r#"{"metadata":{"tags":["a","a"]},"blocks":[]}"#,
            &Document::default(),
            &mut ids(),
        )
        .unwrap();
        assert_eq!(imported.article_meta.tags, vec!["a"]);
    }

    #[test]
    fn test_envelope_without_settings_keeps_current() {
        let mut current = Document::default();
        current.container_settings.padding = "2".to_string();

        let json = json!({
            "metadata": { "title": "New" },
            "blocks": []
        })
        .to_string();
        let imported = import_document(&json, &current, &mut ids()).unwrap();
        assert_eq!(imported.article_meta.title, "New");
        assert_eq!(imported.container_settings.padding, "2");
    }

    #[test]
    fn test_rejects_malformed_and_unrecognized() {
        let current = Document::default();
        for input in ["{not json", r#"{"title":"x"}"#, "42", r#""blocks""#, r#"{"metadata":{},"blocks":{}}"#] {
            let err = import_document(input, &current, &mut ids()).unwrap_err();
            assert!(matches!(err, ImportError::InvalidFormat(_)), "{input}");
        }

        let err = import_document(r#"[{"id":"a","type":"marquee"}]"#, &current, &mut ids()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid article format: Unknown block type: marquee");
    }

    #[test]
    fn test_normalizes_ids() {
        let blocks = normalize_blocks(
            vec![
                json!({"id": "a", "type": "paragraph"}),
                json!({"id": "a", "type": "paragraph"}),
                json!({"type": "flex", "children": [{"id": "imp-1", "type": "quote"}]}),
                json!({"id": 7, "type": "divider"}),
            ],
            &mut ids(),
        )
        .unwrap();

        let mut all = HashSet::new();
        for block in &blocks {
            block.walk(&mut |b| assert!(all.insert(b.id.clone()), "duplicate {}", b.id));
        }
        assert_eq!(all.len(), 5);
        assert_eq!(blocks[0].id, "a");
        assert_ne!(blocks[1].id, "a");
        // Generated ids avoid ids that appear later in the input
        assert_ne!(blocks[1].id, "imp-1");
        assert_eq!(blocks[2].children()[0].id, "imp-1");
        assert_eq!(blocks[3].id, "7");
    }

    #[test]
    fn test_normalizes_content_shapes() {
        let blocks = normalize_blocks(
            vec![
                json!({"id": "p", "type": "paragraph"}),
                json!({"id": "l", "type": "list", "content": "oops"}),
                json!({"id": "c", "type": "code", "content": {"code": "x"}}),
                json!({"id": "d", "type": "divider", "content": "ignored", "children": []}),
                json!({"id": "s", "type": "section", "styles": {"gap": 4, "bad": {}}}),
            ],
            &mut ids(),
        )
        .unwrap();

        assert_eq!(blocks[0].content, Some(BlockContent::Text(String::new())));
        assert_eq!(blocks[1].content, Some(BlockContent::Items(vec!["Item 1".to_string()])));
        assert_eq!(
            blocks[2].content,
            Some(BlockContent::Code(CodeContent {
                code: "x".to_string(),
                language: "javascript".to_string()
            }))
        );
        assert_eq!(blocks[3].content, None);
        assert_eq!(blocks[3].children, None);
        assert_eq!(blocks[4].children, Some(vec![]));
        assert_eq!(blocks[4].styles.get("gap").map(String::as_str), Some("4"));
        assert!(!blocks[4].styles.contains_key("bad"));
        assert!(blocks.iter().all(Block::content_matches_type));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("My First Article!", 1700000000000),
            "my-first-article--1700000000000.json"
        );
        assert_eq!(export_filename("Café", 5), "caf--5.json");
    }
}
