/// Independent change flags produced by a chart mutation. Each flag gates
/// one persistence step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartChanges {
    /// Name, handle, config, lifecycle markers or backfilled nested IDs.
    pub core: bool,
    pub labels: bool,
}

impl ChartChanges {
    pub const UNCHANGED: ChartChanges = ChartChanges { core: false, labels: false };
    pub const CORE: ChartChanges = ChartChanges { core: true, labels: false };

    pub fn is_unchanged(&self) -> bool { !self.core && !self.labels }
}
