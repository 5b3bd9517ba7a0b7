//! Graph counters.

use serde::{Deserialize, Serialize};

use super::DependencyManager;

/// Size of the graph at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub tracked_packages: usize,
    pub tracked_assets: usize,
    pub resolved_links: usize,
    pub broken_links: usize,
    /// Distinct untracked ids referenced by at least one tracked asset.
    pub missing_targets: usize,
    pub assets_with_missing_references: usize,
}

impl DependencyManager {
    pub fn statistics(&self) -> GraphStatistics {
        self.read(|state| GraphStatistics {
            tracked_packages: state.packages.len(),
            tracked_assets: state.records.len(),
            resolved_links: state.records.values().map(|r| r.links_out.len()).sum(),
            broken_links: state.records.values().map(|r| r.broken_links_out.len()).sum(),
            missing_targets: state.missing.len(),
            assets_with_missing_references: state.missing.assets_with_missing_references().count(),
        })
    }
}
