//! Downscale-and-re-encode step for images over the pixel budget.
//!
//! The target size is computed once with a two-pass clamp (width first, then
//! height) so a single resize always lands inside both bounds. The result is
//! re-encoded once at a fixed quality; there is no quality search.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use inkjob_logging::{ink_info, ink_warn};

use crate::admission::AdmissionPolicy;
use crate::{CandidateImage, Dimensions, ImageKind, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSettings {
    /// When false, oversize images are rejected instead of resized.
    pub enabled: bool,
    /// Encoder quality in `0.0..=1.0`; only JPEG uses it.
    pub quality: f32,
    pub filter: FilterType,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            quality: 0.92,
            filter: FilterType::Lanczos3,
        }
    }
}

/// Largest size within `max_width`×`max_height` keeping the aspect ratio.
///
/// Sizes already inside the bounds are returned as-is.
pub fn fit_within(source: Dimensions, max_width: u32, max_height: u32) -> Dimensions {
    if source.width <= max_width && source.height <= max_height {
        return source;
    }

    let aspect = source.width as f64 / source.height as f64;
    let mut width = source.width.min(max_width);
    let mut height = (width as f64 / aspect).round() as u32;
    if height > max_height {
        height = max_height;
        width = (height as f64 * aspect).round() as u32;
    }

    Dimensions {
        width: width.max(1),
        height: height.max(1),
    }
}

/// Produces a new candidate that fits the policy's pixel and byte budgets.
///
/// An image already within the pixel bounds comes back untouched, byte for
/// byte, even if it is over the byte budget.
pub async fn resize_to_fit(
    policy: &AdmissionPolicy,
    settings: &ResizeSettings,
    candidate: CandidateImage,
) -> Result<CandidateImage, PipelineError> {
    let kind = ImageKind::from_mime(candidate.mime()).ok_or_else(|| {
        PipelineError::UnsupportedType {
            mime: candidate.mime().to_string(),
        }
    })?;
    let source = match candidate.dimensions() {
        Some(dimensions) => dimensions,
        None => probe_dimensions(&candidate, kind)?,
    };
    if policy.fits_dimensions(source) {
        return Ok(candidate);
    }

    let target = fit_within(source, policy.max_width, policy.max_height);
    let bytes = candidate.bytes().clone();
    let settings = *settings;
    let encoded = tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory_with_format(&bytes, kind.format())
            .map_err(|err| PipelineError::DecodeError(err.to_string()))?;
        let resized = decoded.resize_exact(target.width, target.height, settings.filter);
        drop(decoded);
        encode(&resized, kind, settings.quality)
    })
    .await
    .map_err(|err| PipelineError::DecodeError(format!("resize task failed: {err}")))??;

    let actual = encoded.len() as u64;
    if !policy.fits_bytes(actual) {
        ink_warn!(
            "Resized {} to {} but it is still {} bytes (limit {})",
            candidate.file_name(),
            target,
            actual,
            policy.max_bytes
        );
        return Err(PipelineError::ResizeInsufficient {
            actual,
            max_bytes: policy.max_bytes,
        });
    }

    ink_info!(
        "Resized {} from {} to {} ({} -> {} bytes)",
        candidate.file_name(),
        source,
        target,
        candidate.byte_len(),
        actual
    );
    Ok(candidate.reencoded(encoded, target))
}

fn probe_dimensions(candidate: &CandidateImage, kind: ImageKind) -> Result<Dimensions, PipelineError> {
    let (width, height) = image::ImageReader::with_format(Cursor::new(candidate.bytes()), kind.format())
        .into_dimensions()
        .map_err(|err| PipelineError::DecodeError(err.to_string()))?;
    Ok(Dimensions { width, height })
}

fn encode(image: &DynamicImage, kind: ImageKind, quality: f32) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    let result = match kind {
        ImageKind::Jpeg => {
            let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))
        }
        ImageKind::Png => image.write_with_encoder(PngEncoder::new(&mut buffer)),
    };
    result.map_err(|err| PipelineError::DecodeError(format!("re-encode failed: {err}")))?;
    Ok(buffer)
}
