//! Single object track for multi-object tracking.

use ndarray::{Array1, Array2};

use crate::error::TrackerError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Kalman state owned by a single track.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    /// State mean `[cx, cy, w, h, vcx, vcy, vw, vh]`
    pub mean: Array1<f64>,
    /// State covariance (8x8)
    pub covariance: Array2<f64>,
}

/// One tracked identity.
///
/// A track is built from a detection in the `New` state and carries no
/// identity or motion state until [`Track::activate`] is called.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    state: TrackState,
    score: f32,
    /// Last frame in which the track was matched
    frame_id: u32,
    start_frame: u32,
    tracklet_len: u32,
    motion: Option<MotionState>,
    /// Current box in TLWH format: the last observation, or the prediction
    /// written back by the tracker
    tlwh: Rect,
}

fn measurement(rect: &Rect) -> [f64; 4] {
    rect.to_cxcywh().map(f64::from)
}

impl Track {
    /// Create a new, not yet activated track from a detection.
    pub fn new(detection: &Detection) -> Self {
        Self {
            id: 0,
            state: TrackState::New,
            score: detection.score,
            frame_id: 0,
            start_frame: 0,
            tracklet_len: 0,
            motion: None,
            tlwh: detection.bbox,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TrackState) {
        self.state = state;
    }

    /// Confidence of the last matched detection.
    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn start_frame(&self) -> u32 {
        self.start_frame
    }

    pub fn tracklet_len(&self) -> u32 {
        self.tracklet_len
    }

    pub fn increment_tracklet_len(&mut self) {
        self.tracklet_len += 1;
    }

    pub fn tlwh(&self) -> Rect {
        self.tlwh
    }

    pub fn set_tlwh(&mut self, tlwh: Rect) {
        self.tlwh = tlwh;
    }

    pub fn tlbr(&self) -> [f32; 4] {
        self.tlwh.to_tlbr()
    }

    /// Filter state mean, if the track has been activated.
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.motion.as_ref().map(|m| &m.mean)
    }

    #[cfg(test)]
    pub(crate) fn motion_mut(&mut self) -> Option<&mut MotionState> {
        self.motion.as_mut()
    }

    /// Start a new track: assign its identity and initialize the motion filter
    /// from the current box.
    pub fn activate(&mut self, kalman_filter: &KalmanFilter, frame_id: u32, id: u64) {
        debug_assert_eq!(self.state, TrackState::New, "only new tracks can be activated");

        let (mean, covariance) = kalman_filter.initiate(measurement(&self.tlwh));
        self.motion = Some(MotionState { mean, covariance });

        self.id = id;
        self.tracklet_len = 0;
        self.state = TrackState::Tracked;
        self.frame_id = frame_id;
        self.start_frame = frame_id;
    }

    /// Advance the motion filter by one frame and return the predicted state.
    ///
    /// The track's box and state are left untouched; the caller writes the
    /// prediction back with [`Track::set_tlwh`].
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) -> Option<Array1<f64>> {
        let motion = self.motion.as_mut()?;
        let mut mean = motion.mean.clone();
        if self.state != TrackState::Tracked {
            // Freeze size drift while the object is not observed
            mean[6] = 0.0;
            mean[7] = 0.0;
        }
        let (mean, covariance) = kalman_filter.predict(&mean, &motion.covariance);
        motion.mean = mean;
        motion.covariance = covariance;
        Some(motion.mean.clone())
    }

    fn correct(
        &mut self,
        kalman_filter: &KalmanFilter,
        detection: &Detection,
    ) -> Result<(), TrackerError> {
        debug_assert!(self.motion.is_some(), "correcting a track that was never activated");

        if let Some(motion) = self.motion.as_mut() {
            let (mean, covariance) =
                kalman_filter.update(&motion.mean, &motion.covariance, measurement(&detection.bbox))?;
            motion.mean = mean;
            motion.covariance = covariance;
        }
        self.tlwh = detection.bbox;
        self.score = detection.score;
        self.tracklet_len = 0;
        Ok(())
    }

    /// Correct a tracked track with its matched detection.
    pub fn update(
        &mut self,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        frame_id: u32,
    ) -> Result<(), TrackerError> {
        self.correct(kalman_filter, detection)?;
        self.frame_id = frame_id;
        self.state = TrackState::Tracked;
        Ok(())
    }

    /// Bring a lost track back with its matched detection.
    pub fn reactivate(
        &mut self,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        frame_id: u32,
    ) -> Result<(), TrackerError> {
        debug_assert_eq!(self.state, TrackState::Lost, "only lost tracks are reactivated");

        self.correct(kalman_filter, detection)?;
        self.frame_id = frame_id;
        self.state = TrackState::Tracked;
        Ok(())
    }
}
