//! Image metadata as reported in put results.

use bytes::Bytes;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use filestorage_common::{Error, Result, StoragePath};
use filestorage_storage::{read_to_end, Driver};

/// Description of a stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    pub name: String,
    pub path: String,
    /// Extension without the dot.
    pub ext: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Size in kilobytes, two decimals.
    pub size: f64,
    pub hash: Option<String>,
    /// Encoded image, only kept while variants are being written.
    #[serde(skip)]
    pub buffer: Option<Bytes>,
}

impl ImageStats {
    /// Stats of an encoded image held in memory.
    ///
    /// # Errors
    /// - `Image` if the data is not in a recognized image format
    pub fn from_buffer(path: &StoragePath, buffer: Bytes, keep_buffer: bool) -> Result<Self> {
        let format = image::guess_format(&buffer).map_err(image_error)?;
        let (width, height) = image::ImageReader::with_format(Cursor::new(&buffer[..]), format)
            .into_dimensions()
            .map_err(image_error)?;

        Ok(Self {
            name: path.name().unwrap_or_default().to_string(),
            path: path.as_key(),
            ext: path.extension().unwrap_or_default().to_string(),
            mime: format.to_mime_type().to_string(),
            width: Some(width),
            height: Some(height),
            size: bytes_to_kbytes(buffer.len()),
            hash: None,
            buffer: keep_buffer.then_some(buffer),
        })
    }

    /// Drop the in-memory image.
    pub fn without_buffer(mut self) -> Self {
        self.buffer = None;
        self
    }
}

/// Read a stored file and describe it as an image.
///
/// # Errors
/// - `FileNotFound` and other driver errors
/// - `Image` if the file is not an image
pub async fn image_stats(
    driver: &dyn Driver,
    path: &StoragePath,
    keep_buffer: bool,
) -> Result<ImageStats> {
    let buffer = read_to_end(driver, path).await?;
    ImageStats::from_buffer(path, buffer, keep_buffer)
}

/// Bytes to kilobytes, rounded to two decimals.
pub fn bytes_to_kbytes(bytes: usize) -> f64 {
    (bytes as f64 / 1000.0 * 100.0).round() / 100.0
}

pub(crate) fn image_error(e: image::ImageError) -> Error {
    Error::Image(e.to_string())
}

/// Format of an encoded image, if it is one.
pub(crate) fn detect_format(buffer: &[u8]) -> Option<ImageFormat> {
    image::guess_format(buffer).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filestorage_storage::{MemoryDriver, PutData};
    use image::{DynamicImage, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_bytes_to_kbytes() {
        assert_eq!(bytes_to_kbytes(0), 0.0);
        assert_eq!(bytes_to_kbytes(1000), 1.0);
        assert_eq!(bytes_to_kbytes(12340), 12.34);
        assert_eq!(bytes_to_kbytes(999), 1.0);
        assert_eq!(bytes_to_kbytes(4), 0.0);
    }

    #[tokio::test]
    async fn test_image_stats() {
        let driver = MemoryDriver::new();
        let path = StoragePath::parse("pics/dot.png").unwrap();
        let data = png(40, 30);
        driver.put(&path, PutData::from(data.clone())).await.unwrap();

        let stats = image_stats(&driver, &path, false).await.unwrap();
        assert_eq!(stats.name, "dot.png");
        assert_eq!(stats.path, "pics/dot.png");
        assert_eq!(stats.ext, "png");
        assert_eq!(stats.mime, "image/png");
        assert_eq!((stats.width, stats.height), (Some(40), Some(30)));
        assert_eq!(stats.size, bytes_to_kbytes(data.len()));
        assert!(stats.buffer.is_none());

        let stats = image_stats(&driver, &path, true).await.unwrap();
        assert_eq!(stats.buffer.unwrap().len(), data.len());
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let driver = MemoryDriver::new();
        let path = StoragePath::parse("notes.txt").unwrap();
        driver.put(&path, PutData::from("plain text")).await.unwrap();

        assert!(matches!(
            image_stats(&driver, &path, true).await,
            Err(Error::Image(_))
        ));
    }

    #[test]
    fn test_serialized_shape() {
        let stats = ImageStats {
            name: "a.png".to_string(),
            path: "a.png".to_string(),
            ext: "png".to_string(),
            mime: "image/png".to_string(),
            width: Some(1),
            height: None,
            size: 0.5,
            hash: None,
            buffer: Some(Bytes::from_static(b"x")),
        };

        let value = serde_json::to_value(&stats).unwrap();
        assert!(value["hash"].is_null());
        assert!(value.get("buffer").is_none());
        assert!(value.get("height").is_none());
        assert_eq!(value["width"], 1);
    }
}
