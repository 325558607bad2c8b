//! TrackerPipeline for combining a detection stream with tracking.

use thiserror::Error;

use crate::error::TrackerError;
use crate::tracker::{ByteTracker, Track, TrackerConfig};

use super::DetectionSource;

/// Failure of one pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError<E: std::error::Error + 'static> {
    #[error("detection failed: {0}")]
    Detection(#[source] E),
    #[error(transparent)]
    Tracking(#[from] TrackerError),
}

/// Feeds every frame of a `DetectionSource` through a `ByteTracker`.
///
/// Iterating the pipeline yields the tracked set after each frame.
pub struct TrackerPipeline<D: DetectionSource> {
    source: D,
    tracker: ByteTracker,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    pub fn new(source: D, config: TrackerConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            source,
            tracker: ByteTracker::new(config)?,
        })
    }

    pub fn with_default_config(source: D) -> Result<Self, TrackerError> {
        Self::new(source, TrackerConfig::default())
    }

    /// Track the next frame, or `None` once the source is exhausted.
    ///
    /// A detector failure leaves the tracker untouched.
    pub fn process_next(&mut self) -> Option<Result<Vec<Track>, PipelineError<D::Error>>> {
        let detections = match self.source.next_frame()? {
            Ok(detections) => detections,
            Err(e) => return Some(Err(PipelineError::Detection(e))),
        };
        Some(self.tracker.update(&detections).map_err(PipelineError::from))
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn tracker(&self) -> &ByteTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ByteTracker {
        &mut self.tracker
    }
}

impl<D: DetectionSource> Iterator for TrackerPipeline<D> {
    type Item = Result<Vec<Track>, PipelineError<D::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.process_next()
    }
}
