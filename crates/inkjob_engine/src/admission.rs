use bytes::Bytes;
use inkjob_logging::{ink_debug, ink_info};

use crate::resize::{resize_to_fit, ResizeSettings};
use crate::{CandidateImage, Dimensions, ImageKind, PipelineError};

/// Intake contract of the processing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub allowed_types: Vec<ImageKind>,
    pub max_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            allowed_types: vec![ImageKind::Jpeg, ImageKind::Png],
            max_bytes: 10_000_000,
            max_width: 3840,
            max_height: 2160,
        }
    }
}

impl AdmissionPolicy {
    pub fn fits_dimensions(&self, dimensions: Dimensions) -> bool {
        dimensions.width <= self.max_width && dimensions.height <= self.max_height
    }

    pub fn fits_bytes(&self, byte_len: u64) -> bool {
        byte_len <= self.max_bytes
    }
}

/// Result of checking a decodable image of an allowed type against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub kind: ImageKind,
    pub dimensions: Dimensions,
    pub byte_len: u64,
    pub within_bytes: bool,
    pub within_dimensions: bool,
}

impl Verdict {
    pub fn is_admissible(&self) -> bool {
        self.within_bytes && self.within_dimensions
    }

    /// The error to report when no resize will be attempted.
    pub fn rejection(&self, policy: &AdmissionPolicy) -> Option<PipelineError> {
        if !self.within_dimensions {
            Some(PipelineError::OversizeDimensions {
                actual: self.dimensions,
                max_width: policy.max_width,
                max_height: policy.max_height,
            })
        } else if !self.within_bytes {
            Some(PipelineError::OversizeBytes {
                actual: self.byte_len,
                max_bytes: policy.max_bytes,
            })
        } else {
            None
        }
    }
}

/// Checks type, decodes to learn the dimensions, and grades size against the policy.
///
/// Oversize images are not an error here; see [`admit`].
pub async fn validate(
    policy: &AdmissionPolicy,
    candidate: CandidateImage,
) -> Result<(CandidateImage, Verdict), PipelineError> {
    let kind = ImageKind::from_mime(candidate.mime())
        .filter(|kind| policy.allowed_types.contains(kind))
        .ok_or_else(|| PipelineError::UnsupportedType {
            mime: candidate.mime().to_string(),
        })?;

    let bytes = candidate.bytes().clone();
    let dimensions = tokio::task::spawn_blocking(move || decode_dimensions(&bytes, kind))
        .await
        .map_err(|err| PipelineError::DecodeError(format!("decoder task failed: {err}")))??;

    let verdict = Verdict {
        kind,
        dimensions,
        byte_len: candidate.byte_len(),
        within_bytes: policy.fits_bytes(candidate.byte_len()),
        within_dimensions: policy.fits_dimensions(dimensions),
    };
    ink_debug!(
        "Validated {} ({}, {} bytes): within_bytes={} within_dimensions={}",
        candidate.file_name(),
        dimensions,
        verdict.byte_len,
        verdict.within_bytes,
        verdict.within_dimensions
    );
    Ok((candidate.with_dimensions(dimensions), verdict))
}

/// Runs validation and, when allowed, the resize, yielding an image the
/// service will accept.
pub async fn admit(
    policy: &AdmissionPolicy,
    resize: &ResizeSettings,
    candidate: CandidateImage,
) -> Result<CandidateImage, PipelineError> {
    let (candidate, verdict) = validate(policy, candidate).await?;
    if verdict.is_admissible() {
        return Ok(candidate);
    }
    // Shrinking pixels is the only remedy; an in-bounds image that is too
    // heavy cannot be helped by a resize.
    if !resize.enabled || verdict.within_dimensions {
        return Err(verdict
            .rejection(policy)
            .unwrap_or_else(|| PipelineError::DecodeError("inconsistent verdict".to_string())));
    }

    ink_info!(
        "{} is {}, over the {}×{} limit; resizing",
        candidate.file_name(),
        verdict.dimensions,
        policy.max_width,
        policy.max_height
    );
    resize_to_fit(policy, resize, candidate).await
}

/// Fully decodes the image and keeps only its size; the raster is dropped on return.
fn decode_dimensions(bytes: &Bytes, kind: ImageKind) -> Result<Dimensions, PipelineError> {
    let decoded = image::load_from_memory_with_format(bytes, kind.format())
        .map_err(|err| PipelineError::DecodeError(err.to_string()))?;
    Ok(Dimensions {
        width: decoded.width(),
        height: decoded.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(within_bytes: bool, within_dimensions: bool) -> Verdict {
        Verdict {
            kind: ImageKind::Png,
            dimensions: Dimensions {
                width: 5000,
                height: 3000,
            },
            byte_len: 12_000_000,
            within_bytes,
            within_dimensions,
        }
    }

    #[test]
    fn dimension_rejection_wins_over_bytes() {
        let policy = AdmissionPolicy::default();
        assert!(matches!(
            verdict(false, false).rejection(&policy),
            Some(PipelineError::OversizeDimensions { .. })
        ));
        assert_eq!(
            verdict(false, true).rejection(&policy),
            Some(PipelineError::OversizeBytes {
                actual: 12_000_000,
                max_bytes: 10_000_000
            })
        );
        assert_eq!(verdict(true, true).rejection(&policy), None);
    }

    #[test]
    fn policy_bounds_are_inclusive() {
        let policy = AdmissionPolicy::default();
        assert!(policy.fits_dimensions(Dimensions {
            width: 3840,
            height: 2160
        }));
        assert!(!policy.fits_dimensions(Dimensions {
            width: 3841,
            height: 10
        }));
        assert!(policy.fits_bytes(10_000_000));
        assert!(!policy.fits_bytes(10_000_001));
    }
}
