use std::collections::{HashMap, HashSet};

use crate::analysis::EventStat;
use crate::error::ValidationError;
use crate::events::{Dependencies, Dependency, RiskEvent};

/// Split events into (independent, dependent), preserving input order.
pub fn partition<'a>(
    events: &'a [RiskEvent],
    dependencies: &Dependencies,
) -> (Vec<&'a RiskEvent>, Vec<&'a RiskEvent>) {
    events.iter().partition(|e| !dependencies.contains_key(&e.name))
}

/// Reject any scenario the engine cannot simulate faithfully: bad events,
/// duplicate names, dangling or self-referencing edges.
pub fn validate(events: &[RiskEvent], dependencies: &Dependencies) -> Result<(), ValidationError> {
    let mut names = HashSet::with_capacity(events.len());
    for event in events {
        event.validate()?;
        if !names.insert(event.name.as_str()) {
            return Err(ValidationError::DuplicateEvent(event.name.clone()));
        }
    }

    // Sorted so the reported error does not depend on map iteration order.
    let mut dependents: Vec<&String> = dependencies.keys().collect();
    dependents.sort();
    for dependent in dependents {
        if !names.contains(dependent.as_str()) {
            return Err(ValidationError::UnknownDependent(dependent.clone()));
        }
        for edge in &dependencies[dependent] {
            if edge.event_name == *dependent {
                return Err(ValidationError::SelfDependency(dependent.clone()));
            }
            if !names.contains(edge.event_name.as_str()) {
                return Err(ValidationError::UnknownPrerequisite {
                    dependent: dependent.clone(),
                    prerequisite: edge.event_name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Group event indices into layers by dependency depth. Layer `k` may only
/// depend on layers `< k`. Within a layer, input order is kept.
///
/// Events absent from the map are layer 0; an event in the map sits one layer
/// above its deepest prerequisite. A single-level map gives exactly the
/// independent/dependent split.
///
/// Expects a scenario that already passed [`validate`]; cycles are reported
/// here.
pub fn layers(events: &[RiskEvent], dependencies: &Dependencies) -> Result<Vec<Vec<usize>>, ValidationError> {
    let index: HashMap<&str, usize> =
        events.iter().enumerate().map(|(i, e)| (e.name.as_str(), i)).collect();

    let mut resolver = DepthResolver {
        events,
        dependencies,
        index: &index,
        depth: vec![None; events.len()],
        stack: Vec::new(),
    };
    for i in 0..events.len() {
        resolver.depth_of(i)?;
    }

    let max_depth = resolver.depth.iter().flatten().copied().max().unwrap_or(0);
    let mut out = vec![Vec::new(); if events.is_empty() { 0 } else { max_depth + 1 }];
    for (i, d) in resolver.depth.iter().enumerate() {
        if let Some(d) = d {
            out[*d].push(i);
        }
    }
    Ok(out)
}

struct DepthResolver<'a> {
    events: &'a [RiskEvent],
    dependencies: &'a Dependencies,
    index: &'a HashMap<&'a str, usize>,
    depth: Vec<Option<usize>>,
    stack: Vec<usize>,
}

impl DepthResolver<'_> {
    fn depth_of(&mut self, i: usize) -> Result<usize, ValidationError> {
        if let Some(d) = self.depth[i] {
            return Ok(d);
        }
        if let Some(pos) = self.stack.iter().position(|&s| s == i) {
            let cycle = self.stack[pos..].iter().map(|&s| self.events[s].name.clone()).collect();
            return Err(ValidationError::DependencyCycle(cycle));
        }

        let (events, dependencies, index) = (self.events, self.dependencies, self.index);
        let name = events[i].name.as_str();
        let Some(edges) = dependencies.get(name) else {
            self.depth[i] = Some(0);
            return Ok(0);
        };

        self.stack.push(i);
        let mut deepest = 0;
        for edge in edges {
            let Some(&j) = index.get(edge.event_name.as_str()) else {
                return Err(ValidationError::UnknownPrerequisite {
                    dependent: name.to_string(),
                    prerequisite: edge.event_name.clone(),
                });
            };
            deepest = deepest.max(self.depth_of(j)?);
        }
        self.stack.pop();

        let d = deepest + 1;
        self.depth[i] = Some(d);
        Ok(d)
    }
}

/// Product of the per-edge conditional factors for one dependent event, using
/// the prerequisites' finalised probabilities.
///
/// Layering guarantees every prerequisite already has a stat.
pub fn conditional_factor(edges: &[Dependency], stats: &HashMap<String, EventStat>) -> f64 {
    edges
        .iter()
        .map(|edge| {
            let stat = stats.get(&edge.event_name);
            debug_assert!(stat.is_some(), "prerequisite {} not finalised", edge.event_name);
            edge.condition.factor(stat.map_or(0.0, |s| s.probability))
        })
        .product()
}
