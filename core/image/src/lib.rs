//! Responsive image derivation for uploaded files.
//!
//! The [`ImageManipulation`] plugin inspects every file written through a
//! [`filestorage_storage::Storage`] façade. JPEG, PNG, WebP and TIFF images
//! get a thumbnail and one resized variant per breakpoint, written next to the
//! original; the stats of each variant are reported under the `formats` key
//! of the put result.

pub mod config;
pub mod derive;
pub mod plugin;
pub mod stats;

pub use config::{Breakpoints, FitMode, ImageManipulationOptions, ThumbnailOptions};
pub use plugin::ImageManipulation;
pub use stats::{bytes_to_kbytes, image_stats, ImageStats};
