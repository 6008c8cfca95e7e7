//! Transformation parameters submitted with a job.
//!
//! Parameter values are immutable once built; a new submission always
//! carries a new [`TransformParameters`]. Ranges mirror what the editing
//! service accepts so bad values are caught before any network call.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::media::MediaKind;
use crate::types::Dimensions;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Enhancer factor that leaves the image unchanged.
pub const ENHANCER_NEUTRAL: f64 = 1.0;

/// Inclusive enhancer range accepted by the service.
pub const ENHANCER_MIN: f64 = 0.0;
pub const ENHANCER_MAX: f64 = 2.0;

/// Maximum width or height for any resize.
pub const MAX_DIMENSION: u32 = 7680;

/// Default target size for file-size based video resizing.
pub const DEFAULT_TARGET_MB: f64 = 50.0;

/* --------------------------------------------------------------------------
Photo parameters
-------------------------------------------------------------------------- */

/// Convolution filters offered by the photo editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhotoFilter {
    Blur,
    Contour,
    Detail,
    EdgeEnhance,
    EdgeEnhanceMore,
    FindEdges,
    Emboss,
    Sharpen,
    Smooth,
    SmoothMore,
}

impl PhotoFilter {
    pub const ALL: [PhotoFilter; 10] = [
        Self::Blur,
        Self::Contour,
        Self::Detail,
        Self::EdgeEnhance,
        Self::EdgeEnhanceMore,
        Self::FindEdges,
        Self::Emboss,
        Self::Sharpen,
        Self::Smooth,
        Self::SmoothMore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blur => "BLUR",
            Self::Contour => "CONTOUR",
            Self::Detail => "DETAIL",
            Self::EdgeEnhance => "EDGE_ENHANCE",
            Self::EdgeEnhanceMore => "EDGE_ENHANCE_MORE",
            Self::FindEdges => "FIND_EDGES",
            Self::Emboss => "EMBOSS",
            Self::Sharpen => "SHARPEN",
            Self::Smooth => "SMOOTH",
            Self::SmoothMore => "SMOOTH_MORE",
        }
    }
}

impl FromStr for PhotoFilter {
    type Err = CoreError;

    /// Case-insensitive; `-` is accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown filter '{s}'. Valid filters: {}",
                    Self::ALL.map(|f| f.as_str()).join(", ")
                ))
            })
    }
}

/// Effects applied to a photo in one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoEffects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PhotoFilter>,
    pub brightness: f64,
    pub contrast: f64,
    pub color: f64,
    pub sharpness: f64,
    /// Counter-clockwise rotation in degrees.
    pub rotate: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<Dimensions>,
}

impl Default for PhotoEffects {
    fn default() -> Self {
        Self {
            filter: None,
            brightness: ENHANCER_NEUTRAL,
            contrast: ENHANCER_NEUTRAL,
            color: ENHANCER_NEUTRAL,
            sharpness: ENHANCER_NEUTRAL,
            rotate: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            resize: None,
        }
    }
}

impl PhotoEffects {
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("color", self.color),
            ("sharpness", self.sharpness),
        ] {
            validate_enhancer(name, value)?;
        }
        if !self.rotate.is_finite() {
            return Err(CoreError::Validation(
                "Rotation must be a finite number of degrees".to_string(),
            ));
        }
        if let Some(size) = self.resize {
            validate_dimensions(size.width, size.height)?;
        }
        Ok(())
    }

    /// True when submitting these effects would return the input unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Validate a single enhancer factor.
pub fn validate_enhancer(name: &str, value: f64) -> Result<(), CoreError> {
    if !(ENHANCER_MIN..=ENHANCER_MAX).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between {ENHANCER_MIN} and {ENHANCER_MAX} (got {value})"
        )));
    }
    Ok(())
}

/// Validate that width and height are positive and within bounds.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), CoreError> {
    if width == 0 || height == 0 {
        return Err(CoreError::Validation(
            "Width and height must be greater than 0".to_string(),
        ));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(CoreError::Validation(format!(
            "Dimensions must not exceed {MAX_DIMENSION}px (got {width}x{height})"
        )));
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Video parameters
-------------------------------------------------------------------------- */

/// Upscale targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "4k")]
    Uhd4k,
    #[serde(rename = "8k")]
    Uhd8k,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Self::Hd1080, Self::Uhd4k, Self::Uhd8k];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hd1080 => "1080p",
            Self::Uhd4k => "4k",
            Self::Uhd8k => "8k",
        }
    }

    pub fn dimensions(self) -> Dimensions {
        let (width, height) = match self {
            Self::Hd1080 => (1920, 1080),
            Self::Uhd4k => (3840, 2160),
            Self::Uhd8k => (7680, 4320),
        };
        Dimensions { width, height }
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid resolution '{s}'. Must be one of: 1080p, 4k, 8k"
                ))
            })
    }
}

/// Encoder quality/speed trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    Medium,
    Fast,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 3] = [Self::High, Self::Medium, Self::Fast];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Fast => "fast",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == wanted)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid quality '{s}'. Must be one of: high, medium, fast"
                ))
            })
    }
}

/// One video transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoTransform {
    Upscale {
        resolution: Resolution,
        quality: QualityPreset,
    },
    /// Re-encode at the bitrate that hits roughly `target_mb`.
    ResizeFileSize { target_mb: f64 },
    /// Cut from `start_time` seconds, to the end when `duration` is `None`.
    Trim {
        start_time: f64,
        duration: Option<f64>,
    },
    ResizeDimensions {
        width: u32,
        height: u32,
        maintain_aspect: bool,
        quality: QualityPreset,
    },
}

impl Default for VideoTransform {
    fn default() -> Self {
        Self::Upscale {
            resolution: Resolution::Hd1080,
            quality: QualityPreset::High,
        }
    }
}

impl VideoTransform {
    /// Dimension resize with the service defaults (1280x720, keep aspect).
    pub fn resize_dimensions_default() -> Self {
        Self::ResizeDimensions {
            width: 1280,
            height: 720,
            maintain_aspect: true,
            quality: QualityPreset::Medium,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            Self::Upscale { .. } => Ok(()),
            Self::ResizeFileSize { target_mb } => {
                if !target_mb.is_finite() || target_mb <= 0.0 {
                    return Err(CoreError::Validation(format!(
                        "Target size must be greater than 0 MB (got {target_mb})"
                    )));
                }
                Ok(())
            }
            Self::Trim {
                start_time,
                duration,
            } => {
                if !start_time.is_finite() || start_time < 0.0 {
                    return Err(CoreError::Validation(format!(
                        "Trim start must be >= 0 seconds (got {start_time})"
                    )));
                }
                if let Some(d) = duration {
                    if !d.is_finite() || d <= 0.0 {
                        return Err(CoreError::Validation(format!(
                            "Trim duration must be greater than 0 seconds (got {d})"
                        )));
                    }
                }
                Ok(())
            }
            Self::ResizeDimensions { width, height, .. } => validate_dimensions(width, height),
        }
    }

    /// Short operation name used in logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Upscale { .. } => "upscale",
            Self::ResizeFileSize { .. } => "resize_filesize",
            Self::Trim { .. } => "trim",
            Self::ResizeDimensions { .. } => "resize_dimensions",
        }
    }
}

/* --------------------------------------------------------------------------
TransformParameters
-------------------------------------------------------------------------- */

/// The parameter set for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformParameters {
    Photo(PhotoEffects),
    Video(VideoTransform),
}

impl TransformParameters {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Photo(_) => MediaKind::Photo,
            Self::Video(_) => MediaKind::Video,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Photo(effects) => effects.validate(),
            Self::Video(transform) => transform.validate(),
        }
    }

    /// Validate the values and check they target `kind`.
    pub fn validate_for(&self, kind: MediaKind) -> Result<(), CoreError> {
        if self.kind() != kind {
            return Err(CoreError::Validation(format!(
                "{} parameters cannot be applied to a {kind} upload",
                self.kind()
            )));
        }
        self.validate()
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::Photo(_) => "photo_effects",
            Self::Video(t) => t.operation(),
        }
    }
}

impl From<PhotoEffects> for TransformParameters {
    fn from(effects: PhotoEffects) -> Self {
        Self::Photo(effects)
    }
}

impl From<VideoTransform> for TransformParameters {
    fn from(transform: VideoTransform) -> Self {
        Self::Video(transform)
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
