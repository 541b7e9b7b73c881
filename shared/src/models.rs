//! Wire records exchanged with the content API.

use std::{fmt, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    category::{resolve_slug, CategoryRef},
    document::ContentBlock,
};

/// Alt text for the feature image when the article has no title yet.
pub const DEFAULT_FEATURE_IMAGE_ALT: &str = "Feature image";

// 超过这个值的时间戳按毫秒处理
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ArticleState {
    /// Not publicly visible.
    #[default]
    Draft,
    /// Publicly visible.
    Published,
}

impl ArticleState {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl From<String> for ArticleState {
    fn from(raw: String) -> Self {
        if raw.trim().eq_ignore_ascii_case("published") {
            Self::Published
        } else {
            Self::Draft
        }
    }
}

impl FromStr for ArticleState {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" | "publish" => Ok(Self::Published),
            other => Err(format!("unknown article state `{other}` (expected draft|published)")),
        }
    }
}

impl fmt::Display for ArticleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement class of an article on the public site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlogType {
    /// Regular article.
    #[default]
    Normal,
    /// Editor's pick.
    EditorsPick,
    /// Home page hero.
    HeroSection,
    /// Featured story slot.
    FeaturedStory,
}

impl BlogType {
    /// All variants in display order.
    pub const ALL: [BlogType; 4] = [Self::Normal, Self::EditorsPick, Self::HeroSection, Self::FeaturedStory];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::EditorsPick => "editors pick",
            Self::HeroSection => "hero section",
            Self::FeaturedStory => "featured story",
        }
    }
}

impl From<String> for BlogType {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl From<BlogType> for String {
    fn from(kind: BlogType) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for BlogType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|ch| if ch == '-' || ch == '_' { ' ' } else { ch })
            .collect();
        match normalized.as_str() {
            "normal" => Ok(Self::Normal),
            "editors pick" | "editor's pick" => Ok(Self::EditorsPick),
            "hero section" | "hero" => Ok(Self::HeroSection),
            "featured story" | "featured" => Ok(Self::FeaturedStory),
            other => Err(format!(
                "unknown blog type `{other}` (expected normal|editors-pick|hero-section|featured-story)"
            )),
        }
    }
}

impl fmt::Display for BlogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in time as the API reports it: epoch seconds, epoch milliseconds
/// or an RFC 3339 string. Stored as epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Timestamp from epoch seconds.
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Epoch seconds.
    pub fn secs(self) -> i64 {
        self.0
    }

    /// UTC date-time, `None` when out of range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => {
                let raw = number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|float| float as i64))?;
                Some(Self::from_number(raw))
            },
            Value::String(raw) => {
                let raw = raw.trim();
                if let Ok(number) = raw.parse::<i64>() {
                    return Some(Self::from_number(number));
                }
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|parsed| Self(parsed.timestamp()))
            },
            _ => None,
        }
    }

    fn from_number(raw: i64) -> Self {
        if raw.unsigned_abs() >= MILLIS_THRESHOLD {
            Self(raw / 1000)
        } else {
            Self(raw)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(datetime) => write!(f, "{}", datetime.format("%b %-d, %Y")),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {value}")))
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Timestamp::from_value))
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Option<CategoryRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(slug)) if !slug.trim().is_empty() => Some(CategoryRef::new(slug.trim(), slug.trim())),
        Some(object @ Value::Object(_)) => serde_json::from_value::<CategoryRef>(object)
            .ok()
            .filter(|category| !category.slug.is_empty()),
        _ => None,
    })
}

/// Article author block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Avatar image URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar_url: String,
    /// Affiliation line under the name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub affiliation: String,
}

/// Feature (hero) image of an article.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImage {
    /// Image URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Image alt text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub alt_text: String,
}

/// An article as returned by the API.
///
/// `body` is kept as raw JSON: the server may send `currentPageBody` either
/// as an array or as a JSON-encoded string. Use
/// [`crate::document::normalize_body`] to read it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Server id.
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Title.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Author block.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    /// Category, if set.
    #[serde(default, deserialize_with = "lenient_category", skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    /// Feature image.
    #[serde(rename = "featureImage", default, deserialize_with = "null_as_default")]
    pub feature_image: FeatureImage,
    /// Publication state.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: ArticleState,
    /// Placement on the public site.
    #[serde(rename = "blogType", default, deserialize_with = "null_as_default")]
    pub blog_type: BlogType,
    /// Raw `currentPageBody`.
    #[serde(rename = "currentPageBody", default)]
    pub body: Value,
    /// Last modification time.
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
    /// Creation time.
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub date_created: Option<Timestamp>,
    /// Short summary, when the server sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Create and update request body for articles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    /// Title.
    pub title: String,
    /// Author block.
    pub author: Author,
    /// Category, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    /// Feature image.
    pub feature_image: FeatureImage,
    /// Publication state.
    pub state: ArticleState,
    /// Placement on the public site.
    pub blog_type: BlogType,
    /// Body blocks.
    pub current_page_body: Vec<ContentBlock>,
}

/// Media kind as reported by the media service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Still image.
    #[default]
    Image,
    /// Video clip.
    Video,
}

impl MediaType {
    /// Wire name of the media type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown media type `{other}` (expected image|video)")),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a media item: the service returns either a reference object
/// or a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaCategory {
    /// Category reference object.
    Ref(CategoryRef),
    /// Category name or slug as plain text.
    Name(String),
}

/// A media library entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Server id.
    #[serde(alias = "_id")]
    pub id: String,
    /// Public URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// File name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Image or video.
    #[serde(default, deserialize_with = "null_as_default")]
    pub media_type: MediaType,
    /// Category, in whichever shape the service sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MediaCategory>,
    /// Upload time.
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
}

impl MediaItem {
    /// Category slug of this item, resolving names through `canonical`.
    pub fn category_slug(&self, canonical: &[CategoryRef]) -> String {
        match &self.category {
            Some(MediaCategory::Ref(category)) if !category.slug.is_empty() => category.slug.clone(),
            Some(MediaCategory::Ref(category)) => resolve_slug(Some(&category.name), canonical),
            Some(MediaCategory::Name(raw)) => resolve_slug(Some(raw), canonical),
            None => resolve_slug(None, canonical),
        }
    }
}

/// Access/refresh token pair returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token exchanged for a new pair when the access token expires.
    pub refresh_token: String,
}

/// Signed-in administrator as returned by `v1/admins/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    /// Admin id.
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    /// Login email.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Any other fields the server returns.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
