//! Main ByteTrack association loop.

use std::collections::BTreeMap;

use crate::error::TrackerError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackState;

/// Configuration for the [`ByteTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Frame rate of the stream, scales how long lost tracks are kept
    pub frame_rate: f32,
    /// Frames at 30 fps a lost track is kept before it expires
    pub frame_buffer: u32,
    /// Detections at or above this confidence are high-confidence
    pub track_thresh: f32,
    /// Largest `1 - IoU` accepted as a match
    pub match_thresh: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            frame_buffer: 30,
            track_thresh: 0.5,
            match_thresh: 0.7,
        }
    }
}

impl TrackerConfig {
    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_frame_buffer(mut self, frame_buffer: u32) -> Self {
        self.frame_buffer = frame_buffer;
        self
    }

    pub fn with_track_thresh(mut self, track_thresh: f32) -> Self {
        self.track_thresh = track_thresh;
        self
    }

    pub fn with_match_thresh(mut self, match_thresh: f32) -> Self {
        self.match_thresh = match_thresh;
        self
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.frame_buffer == 0 {
            return Err(TrackerError::InvalidConfig(
                "frame_buffer must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.track_thresh) {
            return Err(TrackerError::InvalidConfig(format!(
                "track_thresh must lie in [0, 1], got {}",
                self.track_thresh
            )));
        }
        if !(self.match_thresh > 0.0 && self.match_thresh <= 1.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "match_thresh must lie in (0, 1], got {}",
                self.match_thresh
            )));
        }
        Ok(())
    }

    /// Frames a lost track survives: `round(frame_rate / 30 * frame_buffer)`.
    pub fn max_time_lost(&self) -> u32 {
        (self.frame_rate / 30.0 * self.frame_buffer as f32).round() as u32
    }
}

/// Two-round IoU tracker.
///
/// Each call to [`ByteTracker::update`] first matches every tracked and lost
/// track against the high-confidence detections, then gives the leftovers a
/// second chance against the low-confidence ones. Only high-confidence
/// detections start new tracks.
#[derive(Debug)]
pub struct ByteTracker {
    tracked_tracks: BTreeMap<u64, Track>,
    lost_tracks: BTreeMap<u64, Track>,
    frame_id: u32,
    next_id: u64,
    config: TrackerConfig,
    max_time_lost: u32,
    kalman_filter: KalmanFilter,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        if let Err(e) = config.validate() {
            log::warn!("Rejecting tracker configuration {:?}: {}", config, e);
            return Err(e);
        }
        let max_time_lost = config.max_time_lost();
        log::debug!(
            "Creating ByteTracker: track_thresh={:.3}, match_thresh={:.3}, max_time_lost={}",
            config.track_thresh,
            config.match_thresh,
            max_time_lost
        );

        Ok(Self {
            tracked_tracks: BTreeMap::new(),
            lost_tracks: BTreeMap::new(),
            frame_id: 0,
            next_id: 0,
            config,
            max_time_lost,
            kalman_filter: KalmanFilter::default(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn max_time_lost(&self) -> u32 {
        self.max_time_lost
    }

    /// Number of frames processed so far.
    pub fn frame(&self) -> u32 {
        self.frame_id
    }

    pub fn tracked_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracked_tracks.values()
    }

    pub fn lost_tracks(&self) -> impl Iterator<Item = &Track> {
        self.lost_tracks.values()
    }

    /// Drop all tracks and restart the frame count.
    ///
    /// The id counter keeps running so an id is never handed out twice by
    /// the same tracker.
    pub fn reset(&mut self) {
        self.tracked_tracks.clear();
        self.lost_tracks.clear();
        self.frame_id = 0;
    }

    /// Process one frame of detections and return the currently tracked set.
    ///
    /// Tracks are copied out of the pools, revised, and written back only once
    /// the whole frame has been processed. On error the tracker is left exactly
    /// as it was before the call.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<Track>, TrackerError> {
        let frame_id = self.frame_id + 1;
        let mut next_id = self.next_id;

        // Step 1: Split detections into high-score and low-score
        let (detections_high, detections_low): (Vec<Detection>, Vec<Detection>) = detections
            .iter()
            .copied()
            .partition(|d| d.score >= self.config.track_thresh);

        // Step 2: Tracks that need prediction vs. ones that don't
        let mut inactive = Vec::new();
        let mut active = Vec::new();
        for track in self.tracked_tracks.values() {
            if track.state() == TrackState::Tracked {
                active.push(track.clone());
            } else {
                inactive.push(track.clone());
            }
        }

        // Lost tracks take part in the first association too
        let mut track_pool = joint_tracks(active, self.lost_tracks.values().cloned());

        for track in track_pool.iter_mut() {
            if let Some(mean) = track.predict(&self.kalman_filter) {
                track.set_tlwh(Rect::from_cxcywh(
                    mean[0] as f32,
                    mean[1] as f32,
                    mean[2] as f32,
                    mean[3] as f32,
                ));
            }
        }

        // Step 3: First association, with high score detections
        let mut activated_tracks = Vec::new();
        let (remain_tracks, unmatched_high, first_matches) = self.associate(
            track_pool,
            &detections_high,
            frame_id,
            &mut activated_tracks,
        )?;

        // Step 4: Second association, with low score detections
        let (re_remain_tracks, _, second_matches) = self.associate(
            remain_tracks,
            &detections_low,
            frame_id,
            &mut activated_tracks,
        )?;

        // Step 5: Init new tracks from unmatched high score detections
        let spawned = unmatched_high.len();
        for idet in unmatched_high {
            let mut track = Track::new(&detections_high[idet]);
            track.activate(&self.kalman_filter, frame_id, next_id);
            log::trace!("frame {}: new track {}", frame_id, next_id);
            next_id += 1;
            activated_tracks.push(track);
        }

        // Step 6: Rebuild the pools
        let mut tracked_tracks = BTreeMap::new();
        for track in inactive.into_iter().chain(activated_tracks) {
            let previous = tracked_tracks.insert(track.id(), track);
            debug_assert!(previous.is_none());
        }
        let newly_lost = re_remain_tracks
            .iter()
            .filter(|t| t.state() == TrackState::Tracked)
            .count();
        let mut lost_tracks = BTreeMap::new();
        for track in re_remain_tracks {
            debug_assert!(!tracked_tracks.contains_key(&track.id()));
            lost_tracks.insert(track.id(), track);
        }

        // Step 7: Age lost tracks, expiring the ones gone for too long
        let max_time_lost = self.max_time_lost;
        let before = lost_tracks.len();
        lost_tracks.retain(|_, track: &mut Track| {
            track.increment_tracklet_len();
            if track.tracklet_len() > max_time_lost {
                false
            } else {
                track.set_state(TrackState::Lost);
                true
            }
        });
        let expired = before - lost_tracks.len();

        log::debug!(
            "frame {}: {} high / {} low detections, {} + {} matched, {} new, {} lost, {} expired, {} tracked",
            frame_id,
            detections_high.len(),
            detections_low.len(),
            first_matches,
            second_matches,
            spawned,
            newly_lost,
            expired,
            tracked_tracks.len()
        );

        self.tracked_tracks = tracked_tracks;
        self.lost_tracks = lost_tracks;
        self.frame_id = frame_id;
        self.next_id = next_id;

        Ok(self.tracked_tracks.values().cloned().collect())
    }

    /// Match `tracks` against `detections`, correcting every matched track and
    /// pushing it onto `activated`.
    ///
    /// Returns the unmatched tracks, the indices of unmatched detections and
    /// the number of matches.
    fn associate(
        &self,
        tracks: Vec<Track>,
        detections: &[Detection],
        frame_id: u32,
        activated: &mut Vec<Track>,
    ) -> Result<(Vec<Track>, Vec<usize>, usize), TrackerError> {
        let track_rects: Vec<Rect> = tracks.iter().map(|t| t.tlwh()).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let dists = matching::iou_distance(&track_rects, &det_rects);
        let assignment = matching::linear_assignment(&dists, self.config.match_thresh)?;

        let mut slots: Vec<Option<Track>> = tracks.into_iter().map(Some).collect();
        for (itrack, idet) in assignment.iter() {
            let Some(mut track) = slots[itrack].take() else {
                continue;
            };
            let det = &detections[idet];
            if track.state() == TrackState::Tracked {
                track.update(det, &self.kalman_filter, frame_id)?;
            } else {
                track.reactivate(det, &self.kalman_filter, frame_id)?;
                log::trace!("frame {}: track {} re-found", frame_id, track.id());
            }
            activated.push(track);
        }

        let unmatched_tracks = slots.into_iter().flatten().collect();
        let unmatched_detections = assignment.unmatched_cols(detections.len());
        Ok((unmatched_tracks, unmatched_detections, assignment.len()))
    }
}

/// Union of two track sets keyed by id. Ids are unique across pools, so a
/// collision means a pool was corrupted.
pub fn joint_tracks(
    tracks_a: Vec<Track>,
    tracks_b: impl IntoIterator<Item = Track>,
) -> Vec<Track> {
    let mut joined = BTreeMap::new();
    for track in tracks_a.into_iter().chain(tracks_b) {
        let previous = joined.insert(track.id(), track);
        debug_assert!(previous.is_none(), "track id present in both pools");
    }
    joined.into_values().collect()
}
