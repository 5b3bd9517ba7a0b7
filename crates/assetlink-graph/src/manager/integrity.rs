//! Graph invariant checking.

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use assetlink_session::AssetId;

use super::{DependencyManager, GraphState};
use crate::error::{GraphError, Result};

impl GraphState {
    /// Check reciprocity and the derivation of the missing-reference index.
    pub(crate) fn verify(&self) -> Result<()> {
        let mut expected_parents: HashMap<AssetId, HashSet<AssetId>> = HashMap::default();
        let mut expected_incomplete: HashSet<AssetId> = HashSet::default();

        for (id, record) in &self.records {
            if record.id() != *id {
                return Err(invariant(format!("record {} is stored under id {}", record.id(), id)));
            }

            for (target, link_type) in &record.links_out {
                let Some(target_record) = self.records.get(target) else {
                    return Err(invariant(format!("{id} links to untracked asset {target}")));
                };
                match target_record.links_in.get(id) {
                    Some(back) if back.contains(*link_type) => {}
                    _ => {
                        return Err(invariant(format!(
                            "{target} is missing the incoming link from {id}"
                        )));
                    }
                }
            }

            for (source, link_type) in &record.links_in {
                let reciprocal = self
                    .records
                    .get(source)
                    .and_then(|source_record| source_record.links_out.get(id));
                match reciprocal {
                    Some(forward) if forward.contains(*link_type) => {}
                    _ => {
                        return Err(invariant(format!(
                            "{id} records an incoming link from {source} that does not exist"
                        )));
                    }
                }
            }

            for target in record.broken_links_out.keys() {
                if self.records.contains_key(target) {
                    return Err(invariant(format!(
                        "{id} has a broken link to tracked asset {target}"
                    )));
                }
                if record.links_out.contains_key(target) {
                    return Err(invariant(format!(
                        "{id} links to {target} as both resolved and broken"
                    )));
                }
                expected_parents.entry(*target).or_default().insert(*id);
            }
            if record.has_broken_links() {
                expected_incomplete.insert(*id);
            }
        }

        if let Some(package) = self.watched.keys().find(|p| self.packages.contains_key(*p)) {
            return Err(invariant(format!("package {package} is both tracked and watched")));
        }

        if self.missing.parents() != &expected_parents {
            return Err(invariant(
                "missing-reference index does not match the records' broken links".to_string(),
            ));
        }
        let incomplete: HashSet<AssetId> = self.missing.assets_with_missing_references().copied().collect();
        if incomplete != expected_incomplete {
            return Err(invariant(
                "set of assets with missing references is out of date".to_string(),
            ));
        }
        Ok(())
    }
}

fn invariant(message: String) -> GraphError {
    GraphError::Invariant(message)
}

impl DependencyManager {
    /// Verify every graph invariant, reporting the first violation found.
    ///
    /// A disposed manager has nothing to check and always passes.
    pub fn verify_integrity(&self) -> Result<()> {
        let guard = self.initialize();
        if self.is_inert() {
            return Ok(());
        }
        let state = guard.state();
        state.verify()
    }
}
