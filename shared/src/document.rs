//! Article body documents.
//!
//! Two shapes live here: the API block format stored in `currentPageBody`
//! ([`ContentBlock`]) and the rich-text editor's native block format
//! ([`EditorBlock`]). [`to_api`] and [`from_api`] translate between them and
//! never fail; anything they cannot represent is dropped or downgraded to a
//! plain paragraph.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Alt text used when an image block has none.
pub const DEFAULT_IMAGE_ALT: &str = "Image";
/// Preview width handed to the editor when the stored image has none.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 500;

const EDITOR_PARAGRAPH: &str = "paragraph";
const EDITOR_HEADING: &str = "heading";
const EDITOR_IMAGE: &str = "image";
const EDITOR_QUOTE: &str = "blockquote";
const EDITOR_DIVIDER: &str = "horizontalRule";
const INLINE_TEXT: &str = "text";
const INLINE_LINK: &str = "link";
const NO_CONTENT_MARKER: &str = "none";

/// Horizontal alignment of a text-bearing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Alignment {
    /// Default alignment; omitted from stored documents.
    #[default]
    Left,
    /// Centered text.
    Center,
    /// Right-aligned text.
    Right,
}

impl From<String> for Alignment {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "center" => Self::Center,
            "right" => Self::Right,
            // "justify" and anything unknown fall back to the default.
            _ => Self::Left,
        }
    }
}

/// Heading level, always within `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Value", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Clamps any integer into the supported range.
    pub fn new(level: i64) -> Self {
        Self(level.clamp(1, 3) as u8)
    }

    /// Numeric level.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for HeadingLevel {
    fn default() -> Self {
        Self(1)
    }
}

impl From<Value> for HeadingLevel {
    fn from(value: Value) -> Self {
        let level = value
            .as_i64()
            .or_else(|| value.as_f64().map(|level| level.round() as i64))
            .or_else(|| value.as_str().and_then(|level| level.trim().parse().ok()))
            .unwrap_or(1);
        Self::new(level)
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

/// A styled span of text inside a paragraph, heading or quote.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "WireInlineRun", into = "WireInlineRun")]
pub struct InlineRun {
    /// Plain text of the run.
    pub text: String,
    /// Style flags such as `bold` or `italic`.
    pub styles: BTreeMap<String, bool>,
}

impl InlineRun {
    /// An unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: BTreeMap::new(),
        }
    }

    /// Adds a style flag.
    pub fn with_style(mut self, style: &str) -> Self {
        self.styles.insert(style.to_string(), true);
        self
    }
}

#[derive(Serialize, Deserialize)]
struct WireInlineRun {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    styles: Option<Map<String, Value>>,
}

impl From<WireInlineRun> for InlineRun {
    fn from(wire: WireInlineRun) -> Self {
        Self {
            text: wire.text.unwrap_or_default(),
            styles: boolean_styles(wire.styles.iter().flatten()),
        }
    }
}

impl From<InlineRun> for WireInlineRun {
    fn from(run: InlineRun) -> Self {
        Self {
            kind: Some(INLINE_TEXT.to_string()),
            text: Some(run.text),
            styles: Some(
                run.styles
                    .into_iter()
                    .map(|(name, enabled)| (name, Value::Bool(enabled)))
                    .collect(),
            ),
        }
    }
}

fn boolean_styles<'a>(styles: impl Iterator<Item = (&'a String, &'a Value)>) -> BTreeMap<String, bool> {
    styles
        .filter_map(|(name, value)| value.as_bool().map(|enabled| (name.clone(), enabled)))
        .collect()
}

/// Body of a paragraph or quote block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    /// Alignment; `None` means left.
    #[serde(
        rename = "align",
        alias = "alignment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alignment: Option<Alignment>,
    /// Inline runs. Legacy documents store a bare string here.
    #[serde(default, alias = "text", deserialize_with = "deserialize_runs")]
    pub content: Vec<InlineRun>,
}

/// Body of a heading block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeadingBlock {
    /// Alignment; `None` means left.
    #[serde(
        rename = "align",
        alias = "alignment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alignment: Option<Alignment>,
    /// Heading level.
    #[serde(default)]
    pub level: HeadingLevel,
    /// Inline runs.
    #[serde(default, alias = "text", deserialize_with = "deserialize_runs")]
    pub content: Vec<InlineRun>,
}

/// An uploaded image placed in the body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    /// Public URL of the uploaded image.
    #[serde(default)]
    pub url: String,
    /// Alternative text.
    #[serde(default)]
    pub alt_text: String,
    /// Caption shown under the image.
    #[serde(default)]
    pub caption: String,
    /// Width of the editor preview in pixels.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_dimension"
    )]
    pub preview_width: Option<u32>,
    /// Height of the editor preview in pixels.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_dimension"
    )]
    pub preview_height: Option<u32>,
}

/// One structural unit of an article body as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Body text.
    Paragraph(TextBlock),
    /// Section heading.
    Heading(HeadingBlock),
    /// Image with caption.
    Image(ImageBlock),
    /// Block quote.
    Quote(TextBlock),
    /// Horizontal rule.
    Divider,
}

impl ContentBlock {
    /// A left-aligned paragraph holding one unstyled run.
    pub fn plain_paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph(TextBlock {
            alignment: None,
            content: vec![InlineRun::plain(text)],
        })
    }
}

fn deserialize_runs<'de, D>(deserializer: D) -> Result<Vec<InlineRun>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(runs_from_value(value.as_ref()))
}

fn deserialize_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| value.as_f64())
        .filter(|dimension| dimension.is_finite() && *dimension >= 0.0)
        .map(|dimension| dimension.round().min(u32::MAX as f64) as u32))
}

fn runs_from_value(value: Option<&Value>) -> Vec<InlineRun> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => vec![InlineRun::plain(text.as_str())],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(InlineRun::plain(text.as_str())),
                Value::Object(_) => serde_json::from_value(item.clone()).ok(),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// A block read from a stored document, before it is upgraded to a
/// [`ContentBlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredBlock {
    /// A block in the current format.
    Block(ContentBlock),
    /// The old `{"type": "text", "content": "..."}` shape.
    LegacyText(String),
    /// A block whose type is unknown or whose payload did not parse.
    Unrecognized {
        /// The `type` tag as found.
        kind: String,
        /// Any text that could be salvaged from it.
        text: Option<String>,
    },
}

impl StoredBlock {
    /// Classifies one JSON value. Non-objects are not blocks.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let block = match kind {
            "text" => Self::LegacyText(salvage_text(object).unwrap_or_default()),
            "paragraph" | "heading" | "image" | "quote" | "divider" => {
                match serde_json::from_value::<ContentBlock>(value.clone()) {
                    Ok(block) => Self::Block(block),
                    Err(err) => {
                        tracing::debug!("stored {kind} block did not parse: {err}");
                        Self::Unrecognized {
                            kind: kind.to_string(),
                            text: salvage_text(object),
                        }
                    },
                }
            },
            _ => Self::Unrecognized {
                kind: kind.to_string(),
                text: salvage_text(object),
            },
        };
        Some(block)
    }

    /// Upgrades to the canonical block shape. Legacy and unrecognized blocks
    /// become plain paragraphs when they carry text and are dropped otherwise.
    pub fn upgrade(&self) -> Option<ContentBlock> {
        match self {
            Self::Block(block) => Some(block.clone()),
            Self::LegacyText(text) if !text.is_empty() => Some(ContentBlock::plain_paragraph(text)),
            Self::LegacyText(_) => None,
            Self::Unrecognized {
                text: Some(text),
                ..
            } => Some(ContentBlock::plain_paragraph(text)),
            Self::Unrecognized {
                ..
            } => None,
        }
    }
}

impl From<ContentBlock> for StoredBlock {
    fn from(block: ContentBlock) -> Self {
        Self::Block(block)
    }
}

fn salvage_text(object: &Map<String, Value>) -> Option<String> {
    ["content", "text"]
        .iter()
        .filter_map(|key| object.get(*key))
        .map(|value| match value {
            Value::String(text) => text.clone(),
            Value::Array(_) => runs_from_value(Some(value))
                .into_iter()
                .map(|run| run.text)
                .collect(),
            _ => String::new(),
        })
        .find(|text| !text.trim().is_empty())
}

/// Decodes a `currentPageBody` value.
///
/// The API returns either a JSON array or a JSON-encoded string of one. A
/// string that does not parse degrades to an empty document.
pub fn decode_body(value: &Value) -> Vec<StoredBlock> {
    match value {
        Value::Array(items) => items.iter().filter_map(StoredBlock::from_value).collect(),
        Value::String(raw) if raw.trim().is_empty() => Vec::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ Value::Array(_)) => decode_body(&parsed),
            Ok(other) => {
                tracing::warn!("currentPageBody string holds {} instead of an array", kind_of(&other));
                Vec::new()
            },
            Err(err) => {
                tracing::warn!("currentPageBody is a string but not JSON; using empty body: {err}");
                Vec::new()
            },
        },
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("currentPageBody has unexpected shape {}; using empty body", kind_of(other));
            Vec::new()
        },
    }
}

/// Decodes and upgrades a `currentPageBody` value in one step.
pub fn normalize_body(value: &Value) -> Vec<ContentBlock> {
    decode_body(value)
        .iter()
        .filter_map(StoredBlock::upgrade)
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Inline node of the editor document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorInline {
    /// `text` or `link`.
    #[serde(rename = "type", default = "inline_text_kind")]
    pub kind: String,
    /// Text of a `text` node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Style map; the editor also stores colors here.
    #[serde(default)]
    pub styles: BTreeMap<String, Value>,
    /// Target of a `link` node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Children of a `link` node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<EditorInline>,
}

fn inline_text_kind() -> String {
    INLINE_TEXT.to_string()
}

impl EditorInline {
    fn from_run(run: &InlineRun) -> Self {
        Self {
            kind: INLINE_TEXT.to_string(),
            text: Some(run.text.clone()),
            styles: run
                .styles
                .iter()
                .map(|(name, enabled)| (name.clone(), Value::Bool(*enabled)))
                .collect(),
            href: None,
            content: Vec::new(),
        }
    }

    fn push_runs(&self, runs: &mut Vec<InlineRun>) {
        if self.kind == INLINE_LINK {
            for child in &self.content {
                child.push_runs(runs);
            }
            return;
        }
        runs.push(InlineRun {
            text: self.text.clone().unwrap_or_default(),
            styles: boolean_styles(self.styles.iter()),
        });
    }
}

/// Content slot of an editor block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum EditorContent {
    /// The block has no `content` key.
    #[default]
    Absent,
    /// The editor's `"none"` marker for blocks that cannot hold text.
    NoContent,
    /// Inline nodes.
    Inline(Vec<EditorInline>),
}

impl EditorContent {
    /// Whether the slot is missing entirely.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Flattens the slot into API runs; the `"none"` marker yields nothing.
    pub fn to_runs(&self) -> Vec<InlineRun> {
        let mut runs = Vec::new();
        if let Self::Inline(nodes) = self {
            for node in nodes {
                node.push_runs(&mut runs);
            }
        }
        runs
    }

    fn from_runs(runs: &[InlineRun]) -> Self {
        Self::Inline(runs.iter().map(EditorInline::from_run).collect())
    }
}

impl From<Value> for EditorContent {
    fn from(value: Value) -> Self {
        match value {
            Value::String(marker) if marker == NO_CONTENT_MARKER => Self::NoContent,
            Value::String(text) => Self::Inline(vec![EditorInline {
                kind: INLINE_TEXT.to_string(),
                text: Some(text),
                ..EditorInline::default()
            }]),
            Value::Array(items) => Self::Inline(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => Self::Absent,
        }
    }
}

impl From<EditorContent> for Value {
    fn from(content: EditorContent) -> Self {
        match content {
            EditorContent::Absent => Value::Null,
            EditorContent::NoContent => Value::String(NO_CONTENT_MARKER.to_string()),
            EditorContent::Inline(nodes) => Value::Array(
                nodes
                    .into_iter()
                    .map(|node| serde_json::to_value(node).unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }
}

/// Props of an editor block. Only the keys the translator reads are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorProps {
    /// Block alignment; absent means left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_alignment: Option<Alignment>,
    /// Heading level, 1 to 3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<HeadingLevel>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image alt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    /// Image caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Image preview width in pixels.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_dimension"
    )]
    pub preview_width: Option<u32>,
    /// Image preview height in pixels.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_dimension"
    )]
    pub preview_height: Option<u32>,
}

impl EditorProps {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn aligned(alignment: Option<Alignment>) -> Self {
        Self {
            text_alignment: Some(alignment.unwrap_or_default()),
            ..Self::default()
        }
    }
}

/// One block of the editor's native document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorBlock {
    /// Editor-assigned block id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Editor block type, e.g. `paragraph` or `horizontalRule`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Block props.
    #[serde(default, skip_serializing_if = "EditorProps::is_empty")]
    pub props: EditorProps,
    /// Inline content slot.
    #[serde(default, skip_serializing_if = "EditorContent::is_absent")]
    pub content: EditorContent,
}

impl EditorBlock {
    /// The empty left-aligned paragraph the editor needs as a starting state.
    pub fn empty_paragraph() -> Self {
        Self {
            id: None,
            kind: EDITOR_PARAGRAPH.to_string(),
            props: EditorProps::aligned(None),
            content: EditorContent::Inline(Vec::new()),
        }
    }

    /// Whether this block is an empty paragraph, as produced for blank
    /// documents.
    pub fn is_blank_paragraph(&self) -> bool {
        self.kind == EDITOR_PARAGRAPH && self.content.to_runs().iter().all(|run| run.text.is_empty())
    }
}

/// Converts an editor document into the API block sequence.
///
/// Unsupported editor blocks and images without an uploaded URL are dropped.
pub fn to_api(blocks: &[EditorBlock]) -> Vec<ContentBlock> {
    blocks.iter().filter_map(editor_block_to_api).collect()
}

fn editor_block_to_api(block: &EditorBlock) -> Option<ContentBlock> {
    let alignment = block
        .props
        .text_alignment
        .filter(|alignment| *alignment != Alignment::Left);

    match block.kind.as_str() {
        EDITOR_PARAGRAPH => Some(ContentBlock::Paragraph(TextBlock {
            alignment,
            content: block.content.to_runs(),
        })),
        EDITOR_HEADING => Some(ContentBlock::Heading(HeadingBlock {
            alignment,
            level: block.props.level.unwrap_or_default(),
            content: block.content.to_runs(),
        })),
        EDITOR_IMAGE => {
            let url = block
                .props
                .url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())?;
            Some(ContentBlock::Image(ImageBlock {
                url: url.to_string(),
                alt_text: block
                    .props
                    .alt_text
                    .clone()
                    .filter(|alt| !alt.is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_ALT.to_string()),
                caption: block.props.caption.clone().unwrap_or_default(),
                preview_width: block.props.preview_width,
                preview_height: block.props.preview_height,
            }))
        },
        EDITOR_QUOTE => Some(ContentBlock::Quote(TextBlock {
            alignment,
            content: block.content.to_runs(),
        })),
        EDITOR_DIVIDER => Some(ContentBlock::Divider),
        other => {
            tracing::trace!("dropping unsupported editor block `{other}`");
            None
        },
    }
}

/// Converts a stored document into an editor document.
///
/// Never returns an empty document: blank input yields one empty
/// left-aligned paragraph.
pub fn from_api(blocks: Option<&[StoredBlock]>) -> Vec<EditorBlock> {
    let converted: Vec<EditorBlock> = blocks
        .unwrap_or_default()
        .iter()
        .filter_map(StoredBlock::upgrade)
        .map(|block| content_block_to_editor(&block))
        .collect();

    if converted.is_empty() {
        vec![EditorBlock::empty_paragraph()]
    } else {
        converted
    }
}

/// [`from_api`] over already-upgraded blocks.
pub fn editor_document(blocks: &[ContentBlock]) -> Vec<EditorBlock> {
    let stored: Vec<StoredBlock> = blocks.iter().cloned().map(StoredBlock::from).collect();
    from_api(Some(&stored))
}

fn content_block_to_editor(block: &ContentBlock) -> EditorBlock {
    match block {
        ContentBlock::Paragraph(text) => EditorBlock {
            id: None,
            kind: EDITOR_PARAGRAPH.to_string(),
            props: EditorProps::aligned(text.alignment),
            content: EditorContent::from_runs(&text.content),
        },
        ContentBlock::Heading(heading) => EditorBlock {
            id: None,
            kind: EDITOR_HEADING.to_string(),
            props: EditorProps {
                level: Some(heading.level),
                ..EditorProps::aligned(heading.alignment)
            },
            content: EditorContent::from_runs(&heading.content),
        },
        ContentBlock::Image(image) => EditorBlock {
            id: None,
            kind: EDITOR_IMAGE.to_string(),
            props: EditorProps {
                url: Some(image.url.clone()).filter(|url| !url.is_empty()),
                alt_text: Some(if image.alt_text.is_empty() {
                    DEFAULT_IMAGE_ALT.to_string()
                } else {
                    image.alt_text.clone()
                }),
                caption: Some(image.caption.clone()),
                preview_width: Some(image.preview_width.unwrap_or(DEFAULT_PREVIEW_WIDTH)),
                preview_height: image.preview_height,
                ..EditorProps::default()
            },
            content: EditorContent::Absent,
        },
        ContentBlock::Quote(text) => EditorBlock {
            id: None,
            kind: EDITOR_QUOTE.to_string(),
            props: EditorProps::aligned(text.alignment),
            content: EditorContent::from_runs(&text.content),
        },
        ContentBlock::Divider => EditorBlock {
            id: None,
            kind: EDITOR_DIVIDER.to_string(),
            props: EditorProps::default(),
            content: EditorContent::Absent,
        },
    }
}

/// Parses an editor document from JSON text, tolerating a single block
/// object in place of an array.
pub fn parse_editor_document(raw: &str) -> Result<Vec<EditorBlock>, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(_) => serde_json::from_value(value),
        Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
        _ => Ok(Vec::new()),
    }
}

/// Serializes an API document in the wire shape used by `currentPageBody`.
pub fn body_to_value(blocks: &[ContentBlock]) -> Value {
    serde_json::to_value(blocks).unwrap_or_else(|_| json!([]))
}
