use std::collections::HashSet;
use tessera_common::WorldSectorCoord;

/// Work needed to move the resident set onto a new target set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPlan {
    /// Centre first, then ring by ring.
    pub to_load: Vec<WorldSectorCoord>,
    /// Sorted.
    pub to_evict: Vec<WorldSectorCoord>,
}

impl StreamPlan {
    pub fn is_empty(&self) -> bool {
        self.to_load.is_empty() && self.to_evict.is_empty()
    }
}

/// The sectors that should be resident around `center`.
pub fn target_set(center: WorldSectorCoord, radius: u32) -> Vec<WorldSectorCoord> {
    center.neighborhood(radius)
}

/// Diff the target set against what is resident. Only resident sectors are
/// ever planned for eviction.
pub fn plan(
    center: WorldSectorCoord,
    radius: u32,
    resident: impl IntoIterator<Item = WorldSectorCoord>,
) -> StreamPlan {
    let target = target_set(center, radius);
    let resident: HashSet<WorldSectorCoord> = resident.into_iter().collect();
    let wanted: HashSet<WorldSectorCoord> = target.iter().copied().collect();

    let to_load = target.into_iter().filter(|c| !resident.contains(c)).collect();
    let mut to_evict: Vec<_> = resident.into_iter().filter(|c| !wanted.contains(c)).collect();
    to_evict.sort();

    StreamPlan { to_load, to_evict }
}
