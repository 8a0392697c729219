//! Derivation settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named maximum dimensions, one resized variant per entry.
pub type Breakpoints = BTreeMap<String, u32>;

/// Default thumbnail bounding box.
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 245;
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 156;

/// How a resized image relates to its target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Preserve aspect ratio, fit within the box.
    #[default]
    Inside,
    /// Preserve aspect ratio, cover the box and crop the overflow.
    Cover,
    /// Stretch to the exact box.
    Fill,
}

/// Thumbnail target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailOptions {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fit: FitMode,
}

impl ThumbnailOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fit: FitMode::Inside,
        }
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = fit;
        self
    }
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_WIDTH, DEFAULT_THUMBNAIL_HEIGHT)
    }
}

/// The default breakpoints: large=1000, medium=750, small=500.
pub fn default_breakpoints() -> Breakpoints {
    [("large", 1000), ("medium", 750), ("small", 500)]
        .into_iter()
        .map(|(key, bound)| (key.to_string(), bound))
        .collect()
}

/// Settings of the image plugin.
///
/// `None` disables a step. The thumbnail and the breakpoint variants can be
/// turned off independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManipulationOptions {
    pub thumbnail: Option<ThumbnailOptions>,
    pub breakpoints: Option<Breakpoints>,
}

impl ImageManipulationOptions {
    /// Use a custom thumbnail target.
    pub fn with_thumbnail(mut self, thumbnail: ThumbnailOptions) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Skip thumbnail generation.
    pub fn without_thumbnail(mut self) -> Self {
        self.thumbnail = None;
        self
    }

    /// Replace the breakpoints.
    pub fn with_breakpoints<K, I>(mut self, breakpoints: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, u32)>,
    {
        self.breakpoints = Some(
            breakpoints
                .into_iter()
                .map(|(key, bound)| (key.into(), bound))
                .collect(),
        );
        self
    }

    /// Skip breakpoint variants.
    pub fn without_breakpoints(mut self) -> Self {
        self.breakpoints = None;
        self
    }
}

impl Default for ImageManipulationOptions {
    fn default() -> Self {
        Self {
            thumbnail: Some(ThumbnailOptions::default()),
            breakpoints: Some(default_breakpoints()),
        }
    }
}
