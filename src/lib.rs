//! photorank: capture verification and pairwise rating for photo pools
//!
//! Two independent halves:
//! - Verification: FrameSignals → QualityVector → stabilizer → state machine,
//!   with a liveness check before a capture is accepted
//! - Rating: uniform pair selection and ELO updates keyed on idempotency keys

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{Error, Result};

// =============================================================================
// QUALITY CRITERIA [C] - all must hold on the averaged vector
// =============================================================================

/// Smallest face bounding box area as a fraction of the frame
pub const FACE_AREA_MIN: f64 = 0.15;

/// Largest face bounding box area as a fraction of the frame
pub const FACE_AREA_MAX: f64 = 0.60;

/// Sharpness must be strictly above this
pub const SHARPNESS_MIN: f64 = 0.6;

/// Acceptable exposure level band
pub const BRIGHTNESS_MIN: f64 = 0.3;
pub const BRIGHTNESS_MAX: f64 = 0.8;

/// Contrast must be strictly above this
pub const CONTRAST_MIN: f64 = 0.4;

/// Maximum head rotation from frontal (degrees, inclusive)
pub const POSE_DEVIATION_MAX_DEG: f64 = 30.0;

/// Eye openness must be strictly above this
pub const EYE_OPENNESS_MIN: f64 = 0.7;

// =============================================================================
// STABILIZER + CAPTURE
// =============================================================================

/// Weight given to each new sample in the moving average
pub const EMA_WEIGHT: f64 = 0.3;

/// Consecutive passing averaged vectors before ReadyToCapture
pub const READY_PASS_COUNT: u32 = 3;

/// Minimum spacing between analyzed frames (milliseconds)
pub const ANALYSIS_INTERVAL_MS: u64 = 100;

// =============================================================================
// PIXEL STATISTIC MAPPING
// =============================================================================

/// Laplacian variance at which sharpness reaches 1 - 1/e
pub const SHARPNESS_SCALE: f64 = 100.0;

/// Luma standard deviation treated as full contrast
pub const CONTRAST_FULL_STD_DEV: f64 = 64.0;

// =============================================================================
// LIVENESS BANDS
// =============================================================================

/// isLive threshold on combined confidence
pub const LIVE_THRESHOLD: f64 = 0.7;

/// Confidence above this is a clean accept
pub const ACCEPT_CONFIDENCE: f64 = 0.8;

/// Confidence above this (and not above ACCEPT_CONFIDENCE) is a low-confidence accept
pub const LOW_CONFIDENCE_FLOOR: f64 = 0.6;

// =============================================================================
// RATING
// =============================================================================

/// ELO K factor, same for every photo
pub const ELO_K_FACTOR: f64 = 32.0;

/// Rating assigned to a newly registered photo
pub const INITIAL_ELO: i32 = 1000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.1.0";
