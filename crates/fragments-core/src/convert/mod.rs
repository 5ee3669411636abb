// ABOUTME: Conversion engine: resolves a requested extension and produces an alternate representation.
// ABOUTME: Text runs inline; image transcodes run on a bounded blocking pool so they cannot starve I/O.

pub mod raster;
pub mod text;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::error::{FragmentError, Result};
use crate::media::{Format, MediaType};

/// Converted content and the format it is now in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub data: Bytes,
    pub format: Format,
}

impl Converted {
    pub fn content_type(&self) -> &'static str {
        self.format.essence()
    }
}

/// Resolve `extension` to a target reachable from `source` in one hop.
pub fn resolve_target(source: Format, extension: &str) -> Result<Format> {
    Format::from_extension(extension)
        .filter(|target| source.can_convert_to(*target))
        .ok_or_else(|| FragmentError::UnsupportedConversion {
            from: source.essence().to_string(),
            extension: extension.to_string(),
        })
}

/// Performs conversions, holding the permits that bound concurrent image jobs.
///
/// Cloning is cheap and clones share the same pool.
#[derive(Debug, Clone)]
pub struct Converter {
    image_jobs: Arc<Semaphore>,
}

impl Converter {
    /// Create a converter allowing at most `max_image_jobs` transcodes at once,
    /// clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(max_image_jobs: usize) -> Self {
        let permits = max_image_jobs.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            image_jobs: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn resolve(&self, source: &MediaType, extension: &str) -> Result<Format> {
        resolve_target(source.format(), extension)
    }

    /// Convert `data` (in `source` format) to the type named by `extension`.
    ///
    /// Unknown or unreachable targets fail with `UnsupportedConversion` before
    /// any work is done. The input bytes are never modified.
    pub async fn convert(
        &self,
        source: &MediaType,
        data: Bytes,
        extension: &str,
    ) -> Result<Converted> {
        let from = source.format();
        let target = resolve_target(from, extension)?;

        if from == target {
            return Ok(Converted {
                data,
                format: target,
            });
        }

        let data = if target.is_image() {
            self.transcode_image(from, target, data).await?
        } else {
            text::convert_text(from, target, &data)?
        };

        tracing::debug!(%from, %target, size = data.len(), "converted fragment content");
        Ok(Converted {
            data,
            format: target,
        })
    }

    async fn transcode_image(&self, from: Format, target: Format, data: Bytes) -> Result<Bytes> {
        let permit = Arc::clone(&self.image_jobs)
            .acquire_owned()
            .await
            .map_err(|_| {
                FragmentError::ConversionFailed("image worker pool is closed".to_string())
            })?;

        let output = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            raster::transcode(from, target, &data)
        })
        .await
        .map_err(|e| FragmentError::ConversionFailed(format!("image worker failed: {e}")))??;

        Ok(Bytes::from(output))
    }
}

impl Default for Converter {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map_or(2, |n| n.get());
        Self::new(workers)
    }
}
