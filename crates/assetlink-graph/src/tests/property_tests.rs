//! Property-based tests for assetlink-graph using proptest.
//!
//! Random sequences of session edits are applied to a small pool of assets
//! that reference each other (and ids that never exist). After every step
//! the graph must satisfy its invariants, and after a whole sequence it must
//! agree with a graph built from scratch over the final session.
//!
//! Run with: cargo test --features proptest --package assetlink-graph property_tests

#![cfg(feature = "proptest")]

use std::sync::Arc;

use assetlink_session::{AssetId, AssetItem, AssetReference, Content, Package, PackageId, Session};
use proptest::prelude::*;

use super::test_settings;
use crate::DependencyManager;

const POOL: usize = 8;

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    Retarget(usize, Vec<usize>),
    Touch(usize),
    Untrack(usize),
}

fn targets_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..POOL, 0..4)
}

fn op_strategy(allow_untrack: bool) -> impl Strategy<Value = Op> {
    let edits = prop_oneof![
        (0..POOL).prop_map(Op::Add),
        (0..POOL).prop_map(Op::Remove),
        (0..POOL, targets_strategy()).prop_map(|(i, targets)| Op::Retarget(i, targets)),
        (0..POOL).prop_map(Op::Touch),
    ];
    if allow_untrack {
        prop_oneof![4 => edits, 1 => (0..POOL).prop_map(Op::Untrack)].boxed()
    } else {
        edits.boxed()
    }
}

/// Ids and current reference targets of the pool, present or not.
struct World {
    ids: Vec<AssetId>,
    targets: Vec<Vec<usize>>,
    session: Arc<Session>,
    package: PackageId,
}

impl World {
    fn new(present: &[bool], targets: Vec<Vec<usize>>) -> Self {
        let ids: Vec<AssetId> = (0..POOL).map(|_| AssetId::new()).collect();
        let session = Arc::new(Session::new());
        let package = Package::new("pool");
        let package_id = package.id;
        session.add_package(package).unwrap();
        let world = Self {
            ids,
            targets,
            session,
            package: package_id,
        };
        for (index, present) in present.iter().enumerate() {
            if *present {
                world.session.add_asset(&world.package, world.item(index)).unwrap();
            }
        }
        world
    }

    fn content(&self, index: usize) -> Content {
        let mut content = Content::object();
        for (slot, target) in self.targets[index].iter().enumerate() {
            let reference = AssetReference::new(self.ids[*target], format!("asset{target}"));
            content.set(format!("ref{slot}"), reference);
        }
        content
    }

    fn item(&self, index: usize) -> AssetItem {
        AssetItem::builder_with_id(self.ids[index], format!("asset{index}"))
            .content(self.content(index))
            .build()
    }

    fn exists(&self, index: usize) -> bool {
        self.session.find_asset(&self.ids[index]).is_some()
    }

    fn apply(&mut self, manager: &DependencyManager, op: &Op) {
        match op {
            Op::Add(i) => {
                if !self.exists(*i) {
                    self.session.add_asset(&self.package, self.item(*i)).unwrap();
                }
            }
            Op::Remove(i) => {
                if self.exists(*i) {
                    self.session.remove_asset(&self.ids[*i]).unwrap();
                }
            }
            Op::Retarget(i, targets) => {
                self.targets[*i] = targets.clone();
                if self.exists(*i) {
                    let content = self.content(*i);
                    self.session
                        .edit_asset(&self.ids[*i], |asset| asset.content = content)
                        .unwrap();
                }
            }
            Op::Touch(i) => {
                if self.exists(*i) {
                    self.session.set_dirty(&self.ids[*i], true).unwrap();
                }
            }
            Op::Untrack(i) => {
                manager.untrack_asset(&self.ids[*i]);
            }
        }
    }
}

/// (tracked ids, per tracked id: outputs and missing)
fn graph_shape(manager: &DependencyManager) -> (Vec<AssetId>, Vec<(Vec<AssetId>, Vec<AssetId>)>) {
    let tracked = manager.tracked_asset_ids();
    let edges = tracked
        .iter()
        .map(|id| {
            let deps = manager.find_dependency_record(id).unwrap();
            (deps.output_ids(), deps.missing_ids())
        })
        .collect();
    (tracked, edges)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: reciprocity and index derivation hold after every mutation.
    #[test]
    fn prop_invariants_hold_after_every_mutation(
        present in prop::collection::vec(any::<bool>(), POOL),
        targets in prop::collection::vec(targets_strategy(), POOL),
        ops in prop::collection::vec(op_strategy(true), 0..40),
    ) {
        let mut world = World::new(&present, targets);
        let manager = DependencyManager::new(Arc::clone(&world.session), test_settings());
        drop(manager.initialize());
        prop_assert!(manager.verify_integrity().is_ok());

        for op in &ops {
            world.apply(&manager, op);
            if let Err(err) = manager.verify_integrity() {
                return Err(TestCaseError::fail(format!("after {op:?}: {err}")));
            }
        }
    }

    /// Property: incremental maintenance equals a full rebuild.
    #[test]
    fn prop_incremental_matches_rebuild(
        present in prop::collection::vec(any::<bool>(), POOL),
        targets in prop::collection::vec(targets_strategy(), POOL),
        ops in prop::collection::vec(op_strategy(false), 0..40),
    ) {
        let mut world = World::new(&present, targets);
        let incremental = DependencyManager::new(Arc::clone(&world.session), test_settings());
        drop(incremental.initialize());

        for op in &ops {
            world.apply(&incremental, op);
        }

        let rebuilt = DependencyManager::new(Arc::clone(&world.session), test_settings());
        prop_assert_eq!(graph_shape(&incremental), graph_shape(&rebuilt));
    }

    /// Property: a recursive outgoing query reaches exactly the assets
    /// reachable through present assets.
    #[test]
    fn prop_recursive_out_matches_reachability(
        targets in prop::collection::vec(targets_strategy(), POOL),
        root in 0..POOL,
    ) {
        let world = World::new(&[true; POOL], targets.clone());
        let manager = DependencyManager::new(Arc::clone(&world.session), test_settings());

        let mut reachable = std::collections::BTreeSet::new();
        let mut stack = vec![root];
        let mut seen = vec![false; POOL];
        seen[root] = true;
        while let Some(current) = stack.pop() {
            for target in &targets[current] {
                if *target == current {
                    continue;
                }
                reachable.insert(world.ids[*target]);
                if !seen[*target] {
                    seen[*target] = true;
                    stack.push(*target);
                }
            }
        }

        let deps = manager
            .compute_dependencies(
                &world.ids[root],
                crate::SearchOptions::OUT | crate::SearchOptions::RECURSIVE,
                crate::LinkType::ALL,
            )
            .unwrap();
        let expected: Vec<AssetId> = reachable.into_iter().collect();
        prop_assert_eq!(deps.output_ids(), expected);
    }
}
