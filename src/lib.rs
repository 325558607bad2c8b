//! Multi-object tracking-by-detection.
//!
//! Feed per-frame detections into a [`ByteTracker`] and it keeps stable
//! track identities across frames, recovering objects through missed or
//! low-confidence detections.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::TrackerError;
pub use integration::{
    DetectionBuilder, DetectionSource, Frames, IntoDetections, PipelineError, TrackerPipeline,
};
pub use tracker::{ByteTracker, Detection, Rect, Track, TrackState, TrackerConfig};
