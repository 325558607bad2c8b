//! Integration module for connecting an external object detector to the
//! tracker.
//!
//! The detector itself lives outside this crate; implement
//! [`DetectionSource`] over its per-frame output (or wrap an iterator of
//! outputs in [`Frames`]) and hand it to a [`TrackerPipeline`].

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, Frames, IntoDetections};
pub use pipeline::{PipelineError, TrackerPipeline};
