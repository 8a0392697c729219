//! Thumbnail and breakpoint variant generation.
//!
//! The source is decoded once per upload; every variant is resized from that
//! decoded image on a single blocking task. A variant that cannot be encoded
//! or described is dropped without affecting the others.

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::{debug, warn};

use filestorage_common::{Error, Result, StoragePath};

use crate::config::{FitMode, ImageManipulationOptions, ThumbnailOptions};
use crate::stats::{detect_format, image_error, ImageStats};

/// Formats variants are generated for.
pub const PROCESSABLE_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

/// Prefix of thumbnail file names, also its key in the plugin output.
pub const THUMBNAIL_PREFIX: &str = "thumbnail";

/// Format of `buffer` if variants can be generated for it.
pub fn processable_format(buffer: &[u8]) -> Option<ImageFormat> {
    detect_format(buffer).filter(|format| PROCESSABLE_FORMATS.contains(format))
}

/// Whether a thumbnail is needed for an image of `width` x `height`.
pub fn needs_thumbnail(options: &ThumbnailOptions, width: u32, height: u32) -> bool {
    width > options.width || height > options.height
}

/// Whether a breakpoint produces a variant: only when it is strictly smaller
/// than one of the dimensions, so images are never upscaled.
pub fn breakpoint_applies(bound: u32, width: u32, height: u32) -> bool {
    bound < width || bound < height
}

/// One variant to produce: stored as `<key>_<name>` and reported under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTarget {
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
}

/// Variants needed for an image of `width` x `height`: the thumbnail first,
/// then one per applicable breakpoint in key order.
pub fn plan_variants(
    options: &ImageManipulationOptions,
    width: u32,
    height: u32,
) -> Vec<VariantTarget> {
    let thumbnail = options
        .thumbnail
        .filter(|thumbnail| needs_thumbnail(thumbnail, width, height))
        .map(|thumbnail| VariantTarget {
            key: THUMBNAIL_PREFIX.to_string(),
            width: thumbnail.width,
            height: thumbnail.height,
            fit: thumbnail.fit,
        });

    let breakpoints = options
        .breakpoints
        .iter()
        .flatten()
        .filter(|(_, bound)| breakpoint_applies(**bound, width, height))
        .map(|(key, bound)| VariantTarget {
            key: key.clone(),
            width: *bound,
            height: *bound,
            fit: FitMode::Inside,
        });

    thumbnail.into_iter().chain(breakpoints).collect()
}

fn resize_image(source: &DynamicImage, width: u32, height: u32, fit: FitMode) -> DynamicImage {
    match fit {
        FitMode::Inside => source.resize(width, height, FilterType::Lanczos3),
        FitMode::Cover => source.resize_to_fill(width, height, FilterType::Lanczos3),
        FitMode::Fill => source.resize_exact(width, height, FilterType::Lanczos3),
    }
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), format)
        .map_err(image_error)?;
    Ok(out)
}

/// Decode `buffer` once and encode every target from it, in order.
///
/// Only one resized image is alive at a time next to the decoded source.
///
/// # Errors
/// - Decoding failures; per-target encoding failures are returned in place
pub fn render_variants(
    buffer: &[u8],
    format: ImageFormat,
    targets: &[VariantTarget],
) -> Result<Vec<Result<Vec<u8>>>> {
    let source = image::load_from_memory_with_format(buffer, format).map_err(image_error)?;

    Ok(targets
        .iter()
        .map(|target| {
            let resized = resize_image(&source, target.width, target.height, target.fit);
            encode(&resized, format)
        })
        .collect())
}

/// Describe an encoded variant stored as `<key>_<name>` next to `source`.
fn describe(source: &ImageStats, key: &str, encoded: Vec<u8>) -> Result<ImageStats> {
    let name = format!("{}_{}", key, source.name);
    let path = StoragePath::parse(&source.path)?.with_name(&name)?;
    ImageStats::from_buffer(&path, Bytes::from(encoded), true)
}

/// Thumbnail and breakpoint variants of `source`, keyed like the plugin
/// output.
///
/// Images that already fit get no thumbnail; breakpoints at or above both
/// dimensions are skipped. An undecodable source yields nothing, and a
/// variant that fails on its own is left out.
pub async fn generate_variants(
    source: &ImageStats,
    options: &ImageManipulationOptions,
) -> Vec<(String, ImageStats)> {
    let Some(buffer) = source.buffer.clone() else {
        return Vec::new();
    };
    let Some(format) = processable_format(&buffer) else {
        return Vec::new();
    };
    let (Some(width), Some(height)) = (source.width, source.height) else {
        return Vec::new();
    };

    let targets = plan_variants(options, width, height);
    if targets.is_empty() {
        return Vec::new();
    }
    debug!(path = %source.path, variants = targets.len(), "generating variants");

    let jobs = targets.clone();
    let rendered = tokio::task::spawn_blocking(move || render_variants(&buffer, format, &jobs))
        .await
        .map_err(|e| Error::Image(format!("Resize task failed: {}", e)))
        .and_then(|rendered| rendered);

    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!(path = %source.path, error = %e, "variant generation failed");
            return Vec::new();
        }
    };

    targets
        .into_iter()
        .zip(rendered)
        .filter_map(|(target, encoded)| {
            match encoded.and_then(|encoded| describe(source, &target.key, encoded)) {
                Ok(stats) => Some((target.key, stats)),
                Err(e) => {
                    warn!(
                        path = %source.path,
                        variant = %target.key,
                        error = %e,
                        "variant dropped"
                    );
                    None
                }
            }
        })
        .collect()
}
