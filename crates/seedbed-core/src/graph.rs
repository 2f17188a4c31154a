use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::error::{CoreError, Result};
use crate::registry::Registry;

/// Walking direction over the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Parents before children (generation order).
    Forward,
    /// Children before parents (deletion order).
    Reverse,
}

/// Summary of the registry's dependency structure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DependencyReport {
    pub nodes: usize,
    pub edges: usize,
    pub generation_order: Vec<String>,
    pub deletion_order: Vec<String>,
    pub externally_owned: Vec<String>,
}

/// Order `targets` and the types they reach in `direction`.
///
/// Forward closes over transitive parents, reverse over transitive children.
/// Ties break by declaration order, so output is deterministic.
pub fn resolve_order<'r>(
    registry: &'r Registry,
    targets: &[&str],
    direction: Direction,
) -> Result<Vec<&'r EntityType>> {
    let mut closure = BTreeSet::new();
    let mut stack = Vec::new();

    for target in targets {
        let position = registry
            .position(target)
            .ok_or_else(|| CoreError::UnknownEntityType(target.to_string()))?;
        if closure.insert(position) {
            stack.push(position);
        }
    }

    while let Some(position) = stack.pop() {
        for next in predecessors(registry, position, direction) {
            if closure.insert(next) {
                stack.push(next);
            }
        }
    }

    let order = toposort(registry, &closure, direction).map_err(|member| {
        CoreError::CyclicDependency(registry.entity_at(member).name().to_string())
    })?;

    Ok(order
        .into_iter()
        .map(|position| registry.entity_at(position))
        .collect())
}

/// Build a deterministic dependency report for the whole registry.
pub fn dependency_report(registry: &Registry) -> Result<DependencyReport> {
    let all: Vec<&str> = registry.names().collect();
    let names = |order: Vec<&EntityType>| -> Vec<String> {
        order.into_iter().map(|entity| entity.name().to_string()).collect()
    };

    Ok(DependencyReport {
        nodes: registry.len(),
        edges: registry.iter().map(|entity| entity.parents().len()).sum(),
        generation_order: names(resolve_order(registry, &all, Direction::Forward)?),
        deletion_order: names(resolve_order(registry, &all, Direction::Reverse)?),
        externally_owned: registry
            .iter()
            .filter(|entity| entity.is_externally_owned())
            .map(|entity| entity.name().to_string())
            .collect(),
    })
}

/// Nodes that must be emitted before `position` in `direction`.
fn predecessors(registry: &Registry, position: usize, direction: Direction) -> Vec<usize> {
    match direction {
        Direction::Forward => registry.parent_positions(position),
        Direction::Reverse => registry.child_positions(position),
    }
}

/// Nodes unblocked once `position` has been emitted in `direction`.
fn successors(registry: &Registry, position: usize, direction: Direction) -> Vec<usize> {
    match direction {
        Direction::Forward => registry.child_positions(position),
        Direction::Reverse => registry.parent_positions(position),
    }
}

fn toposort(
    registry: &Registry,
    nodes: &BTreeSet<usize>,
    direction: Direction,
) -> std::result::Result<Vec<usize>, usize> {
    let mut indegree: BTreeMap<usize, usize> = nodes
        .iter()
        .map(|node| {
            let count = predecessors(registry, *node, direction)
                .into_iter()
                .filter(|pred| nodes.contains(pred))
                .count();
            (*node, count)
        })
        .collect();

    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .filter_map(|(node, count)| if *count == 0 { Some(*node) } else { None })
        .collect();

    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);

        for next in successors(registry, node, direction) {
            if let Some(count) = indegree.get_mut(&next) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    let blocked: BTreeSet<usize> = indegree
        .into_iter()
        .filter_map(|(node, count)| if count > 0 { Some(node) } else { None })
        .collect();
    Err(cycle_member(registry, &blocked, direction))
}

/// Every blocked node has a blocked predecessor, so walking predecessors
/// from any blocked node must revisit a node on a cycle.
fn cycle_member(registry: &Registry, blocked: &BTreeSet<usize>, direction: Direction) -> usize {
    let Some(mut current) = blocked.first().copied() else {
        return 0;
    };
    let mut visited = BTreeSet::new();

    while visited.insert(current) {
        match predecessors(registry, current, direction)
            .into_iter()
            .find(|pred| blocked.contains(pred))
        {
            Some(next) => current = next,
            None => break,
        }
    }

    current
}
