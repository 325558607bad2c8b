mod byte_tracker;
mod kalman_filter;
mod matching;
mod rect;
mod track;
mod track_state;

pub use byte_tracker::{ByteTracker, TrackerConfig};
pub use kalman_filter::KalmanFilter;
pub use matching::{Assignment, Detection, iou_distance, linear_assignment};
pub use rect::{Rect, iou_batch};
pub use track::{MotionState, Track};
pub use track_state::TrackState;
