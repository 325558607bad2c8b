/// Track state enumeration for object tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Built from a detection, not yet activated
    #[default]
    New,
    /// Matched in the most recent frame
    Tracked,
    /// Missed at least one frame, kept around in case the object reappears
    Lost,
}
