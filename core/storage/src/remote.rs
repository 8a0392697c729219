//! Ingestion of images published at a remote URI.

use futures::TryStreamExt;
use reqwest::{header, Client};
use tracing::debug;

use filestorage_common::{Error, Result};

use crate::driver::{PutData, PutResult};
use crate::facade::Storage;

impl Storage {
    /// Download the resource at `uri` and store it at `path`.
    ///
    /// A HEAD request checks the advertised content type first and anything
    /// that is not an image is rejected before the body is fetched. With
    /// `ignore_content_type` set the check, and the HEAD request with it,
    /// is skipped, so servers that refuse HEAD still work. The body then
    /// goes through [`Storage::put`], so unique names and plugins apply.
    ///
    /// # Errors
    /// - `InvalidInput` if the resource is not an image
    /// - `Network` if either request fails
    pub async fn upload_image_from_uri(
        &self,
        uri: &str,
        path: &str,
        ignore_content_type: bool,
    ) -> Result<PutResult> {
        let http = Client::new();

        if !ignore_content_type {
            let content_type = content_type(&http, uri).await?;
            debug!(uri, content_type = %content_type, "remote resource inspected");

            if !is_image_content_type(&content_type) {
                return Err(Error::InvalidInput(format!("Not an image: {}", uri)));
            }
        }

        let response = http
            .get(uri)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to download {}: {}", uri, e)))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "Failed to download {}: {}",
                uri,
                response.status()
            )));
        }

        let body = response
            .bytes_stream()
            .map_err(|e| Error::Network(format!("Download interrupted: {}", e)));

        self.put(path, PutData::stream(body)).await
    }
}

/// Advertised `Content-Type` of `uri`, empty when the header is missing.
async fn content_type(http: &Client, uri: &str) -> Result<String> {
    let head = http
        .head(uri)
        .send()
        .await
        .map_err(|e| Error::Network(format!("Failed to reach {}: {}", uri, e)))?;

    if !head.status().is_success() {
        return Err(Error::Network(format!(
            "Failed to reach {}: {}",
            uri,
            head.status()
        )));
    }

    Ok(head
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string())
}

/// Whether a `Content-Type` header value announces an image.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("image")
}
