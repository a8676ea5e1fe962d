//! Dependency ordering.
//!
//! Activation order is a topological sort of manifest `dependencies`,
//! ties broken by manifest `priority` then id. Any cycle is fatal and
//! reported with every participating id, ascending.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PluginError, PluginResult};
use crate::manifest::PluginManifest;

/// Compute the activation order for a set of manifests.
///
/// Dependencies on ids outside the set are ignored here (the loader
/// fails those plugins individually).
///
/// # Errors
///
/// Returns [`PluginError::DependencyCycle`] listing every id that sits
/// on a cycle, sorted ascending.
pub fn activation_order(manifests: &[PluginManifest]) -> PluginResult<Vec<String>> {
    let ids: BTreeSet<&str> = manifests.iter().map(|m| m.id.as_str()).collect();

    // plugin -> in-set dependencies
    let mut deps: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for manifest in manifests {
        let in_set: Vec<&str> = manifest
            .dependencies
            .iter()
            .map(String::as_str)
            .filter(|d| ids.contains(d))
            .collect();
        deps.insert(&manifest.id, in_set);
    }

    let cycle_ids = find_cycle_members(&deps);
    if !cycle_ids.is_empty() {
        return Err(PluginError::DependencyCycle {
            ids: cycle_ids.into_iter().map(String::from).collect(),
        });
    }

    // Kahn's algorithm; among ready nodes pick the lowest
    // (priority, id) so the order is fully deterministic.
    let priority: BTreeMap<&str, i32> = manifests
        .iter()
        .map(|m| (m.id.as_str(), m.priority))
        .collect();
    let mut remaining: BTreeMap<&str, BTreeSet<&str>> = deps
        .iter()
        .map(|(id, dep_list)| (*id, dep_list.iter().copied().collect()))
        .collect();

    let mut order = Vec::with_capacity(manifests.len());
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .filter(|(_, dep_set)| dep_set.is_empty())
            .map(|(id, _)| *id)
            .min_by_key(|id| (priority.get(id).copied().unwrap_or(100), *id))
            .expect("acyclic graph always has a ready node");

        remaining.remove(next);
        for dep_set in remaining.values_mut() {
            dep_set.remove(next);
        }
        order.push(next.to_string());
    }
    Ok(order)
}

/// Every node that sits on some cycle, via iterative removal of nodes
/// with no in-set dependencies (what remains after the graph stops
/// shrinking is exactly the cyclic core and its internal dependents).
fn find_cycle_members<'a>(deps: &BTreeMap<&'a str, Vec<&'a str>>) -> Vec<&'a str> {
    let mut remaining: BTreeMap<&str, BTreeSet<&str>> = deps
        .iter()
        .map(|(id, dep_list)| (*id, dep_list.iter().copied().collect()))
        .collect();

    loop {
        let ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, dep_set)| dep_set.is_empty())
            .map(|(id, _)| *id)
            .collect();
        if ready.is_empty() {
            break;
        }
        for id in ready {
            remaining.remove(id);
            for dep_set in remaining.values_mut() {
                dep_set.remove(id);
            }
        }
    }

    remaining.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str, deps: &[&str], priority: i32) -> PluginManifest {
        PluginManifest::builtin(id, id, "1.0.0")
            .with_dependencies(deps.iter().map(|s| (*s).to_string()).collect())
            .with_priority(priority)
    }

    #[test]
    fn dependencies_activate_before_dependents() {
        let manifests = vec![
            manifest("wallet", &["telegram"], 100),
            manifest("telegram", &[], 100),
        ];
        let order = activation_order(&manifests).unwrap();
        assert_eq!(order, vec!["telegram", "wallet"]);
    }

    #[test]
    fn ties_break_by_priority_then_id() {
        let manifests = vec![
            manifest("zeta", &[], 10),
            manifest("alpha", &[], 100),
            manifest("beta", &[], 100),
        ];
        let order = activation_order(&manifests).unwrap();
        assert_eq!(order, vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn cycle_is_fatal_with_sorted_members() {
        let manifests = vec![
            manifest("c", &["a"], 100),
            manifest("a", &["b"], 100),
            manifest("b", &["c"], 100),
            manifest("standalone", &[], 100),
        ];
        let err = activation_order(&manifests).unwrap_err();
        match err {
            PluginError::DependencyCycle { ids } => {
                assert_eq!(ids, vec!["a", "b", "c"]);
            },
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let manifests = vec![manifest("selfish", &["selfish"], 100)];
        assert!(matches!(
            activation_order(&manifests),
            Err(PluginError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn out_of_set_dependencies_are_ignored_by_ordering() {
        let manifests = vec![manifest("solo", &["not-installed"], 100)];
        let order = activation_order(&manifests).unwrap();
        assert_eq!(order, vec!["solo"]);
    }
}
