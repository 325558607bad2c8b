//! Boundary between an external detector and the tracker.

use std::convert::Infallible;

use crate::tracker::{Detection, Rect};

/// A stream of per-frame detections produced outside this crate.
///
/// Each call yields the detections of the next frame, or `None` once the
/// stream is exhausted. Detector failures surface as `Some(Err(_))`.
pub trait DetectionSource {
    type Error: std::error::Error + 'static;

    fn next_frame(&mut self) -> Option<Result<Vec<Detection>, Self::Error>>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Boxes in TLWH format paired with their confidence.
impl IntoDetections for Vec<(Rect, f32)> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|(bbox, score)| Detection::new(bbox, score))
            .collect()
    }
}

/// Adapts any iterator of per-frame detector outputs into a
/// [`DetectionSource`] that never fails.
#[derive(Debug, Clone)]
pub struct Frames<I> {
    inner: I,
}

impl<I> Frames<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I, T> DetectionSource for Frames<I>
where
    I: Iterator<Item = T>,
    T: IntoDetections,
{
    type Error = Infallible;

    fn next_frame(&mut self) -> Option<Result<Vec<Detection>, Self::Error>> {
        self.inner.next().map(|output| Ok(output.into_detections()))
    }
}
