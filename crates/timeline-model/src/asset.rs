//! Asset descriptors.
//!
//! A descriptor is the caller's declaration of one media file and where it
//! belongs: which kind of media it is, which mixing/placement layer it
//! joins, and which scheduling group it is chained in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Kind of media a descriptor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Video,
    Image,
    Vocal,
    Music,
    Sfx,
    Text,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::Video,
        MediaType::Image,
        MediaType::Vocal,
        MediaType::Music,
        MediaType::Sfx,
        MediaType::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Video => "Video",
            MediaType::Image => "Image",
            MediaType::Vocal => "Vocal",
            MediaType::Music => "Music",
            MediaType::Sfx => "Sfx",
            MediaType::Text => "Text",
        }
    }

    /// Media that lands on the visual layer.
    pub fn is_visual(self) -> bool {
        matches!(self, MediaType::Video | MediaType::Image | MediaType::Text)
    }

    /// Media that lands on the audio layer.
    pub fn is_audio(self) -> bool {
        matches!(self, MediaType::Vocal | MediaType::Music | MediaType::Sfx)
    }

    /// Media with no intrinsic duration.
    pub fn is_still(self) -> bool {
        matches!(self, MediaType::Image | MediaType::Text)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::UnsupportedMediaType { tag: s.to_string() })
    }
}

/// Placement/mixing tag carried by a descriptor.
///
/// Only a handful of tags drive behavior; anything else is preserved
/// verbatim so it survives a round trip through the plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum PositionLayer {
    Thumbnail,
    Narrator,
    BackgroundMusic,
    #[default]
    Unspecified,
    Other(String),
}

impl PositionLayer {
    pub fn as_str(&self) -> &str {
        match self {
            PositionLayer::Thumbnail => "Thumbnail",
            PositionLayer::Narrator => "Narrator",
            PositionLayer::BackgroundMusic => "BackgroundMusic",
            PositionLayer::Unspecified => "",
            PositionLayer::Other(tag) => tag,
        }
    }
}

impl From<String> for PositionLayer {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "Thumbnail" => PositionLayer::Thumbnail,
            "Narrator" => PositionLayer::Narrator,
            "BackgroundMusic" => PositionLayer::BackgroundMusic,
            "" => PositionLayer::Unspecified,
            _ => PositionLayer::Other(tag),
        }
    }
}

impl From<&str> for PositionLayer {
    fn from(tag: &str) -> Self {
        PositionLayer::from(tag.to_string())
    }
}

impl From<PositionLayer> for String {
    fn from(layer: PositionLayer) -> Self {
        layer.as_str().to_string()
    }
}

impl fmt::Display for PositionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One caller-supplied media reference plus placement metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAssetDescriptor", rename_all = "PascalCase")]
pub struct AssetDescriptor {
    /// Kind of media.
    pub media_type: MediaType,

    /// Mixing/placement tag.
    pub position_layer: PositionLayer,

    /// Scheduling group. Groups chain on `N - 1`; gaps are allowed.
    pub render_sequence: u32,

    /// Path fragment appended to the job's filepath prefix.
    #[serde(rename = "ContentLookupKey")]
    pub content_key: String,
}

impl AssetDescriptor {
    pub fn new(
        media_type: MediaType,
        position_layer: impl Into<PositionLayer>,
        render_sequence: u32,
        content_key: impl Into<String>,
    ) -> Self {
        Self {
            media_type,
            position_layer: position_layer.into(),
            render_sequence,
            content_key: content_key.into(),
        }
    }
}

/// Descriptor as it appears on the wire, before the media tag is checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAssetDescriptor {
    pub media_type: String,

    #[serde(default)]
    pub position_layer: String,

    pub render_sequence: u32,

    pub content_lookup_key: String,
}

impl TryFrom<RawAssetDescriptor> for AssetDescriptor {
    type Error = ModelError;

    fn try_from(raw: RawAssetDescriptor) -> Result<Self, Self::Error> {
        Ok(Self {
            media_type: raw.media_type.parse()?,
            position_layer: PositionLayer::from(raw.position_layer),
            render_sequence: raw.render_sequence,
            content_key: raw.content_lookup_key,
        })
    }
}

/// Descriptor list as accepted in job documents: either an inline JSON
/// array or a string holding the encoded array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorList {
    Inline(Vec<RawAssetDescriptor>),
    Encoded(String),
}

impl DescriptorList {
    /// Parse and check every descriptor. The first unsupported media tag
    /// fails the whole list.
    pub fn resolve(&self) -> Result<Vec<AssetDescriptor>, ModelError> {
        match self {
            DescriptorList::Inline(raw) => raw
                .iter()
                .cloned()
                .map(AssetDescriptor::try_from)
                .collect(),
            DescriptorList::Encoded(json) => parse_descriptors(json),
        }
    }
}

impl From<Vec<AssetDescriptor>> for DescriptorList {
    fn from(descriptors: Vec<AssetDescriptor>) -> Self {
        DescriptorList::Inline(
            descriptors
                .into_iter()
                .map(|d| RawAssetDescriptor {
                    media_type: d.media_type.as_str().to_string(),
                    position_layer: d.position_layer.into(),
                    render_sequence: d.render_sequence,
                    content_lookup_key: d.content_key,
                })
                .collect(),
        )
    }
}

/// Parse a JSON array of descriptors.
pub fn parse_descriptors(json: &str) -> Result<Vec<AssetDescriptor>, ModelError> {
    let raw: Vec<RawAssetDescriptor> = serde_json::from_str(json)?;
    raw.into_iter().map(AssetDescriptor::try_from).collect()
}
