/// Track lifecycle stage, controlling when an identity is externally visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Newly created track, not yet reported
    #[default]
    Tentative,
    /// Track with enough consecutive hits to be reported
    Confirmed,
    /// Track that went unmatched for longer than `max_age`; removed in the same step
    Dead,
}
