//! Immutable traversal-plan data: one `Step` per transition attempt, a
//! `Path` as a complete replayable recipe from the initial state to a
//! target, and a `Plan` as all kept paths to one target key.
//!
//! Values are produced once per generation call and never mutated
//! afterward; execution only produces separate result records that
//! reference them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use statewalk_behavior::{Behavior, EventTagged, StateKey};

/// One transition attempt: the state *before* the event, and the event.
#[derive(Debug, Clone, Serialize)]
pub struct Step<S, E> {
    pub state: S,
    pub event: E,
}

/// An ordered sequence of steps ending at `state`.
///
/// `weight` is the edge count. Replaying `steps` through the behavior's
/// transition function from the initial state yields exactly `state`.
#[derive(Debug, Clone, Serialize)]
pub struct Path<S, E> {
    pub steps: Vec<Step<S, E>>,
    pub state: S,
    pub weight: usize,
    pub description: String,
}

impl<S, E: EventTagged> Path<S, E> {
    /// The ordered sequence of event tags, used to deduplicate paths whose
    /// route repeats.
    pub fn signature(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|step| step.event.tag().to_string())
            .collect()
    }
}

/// A target state plus all kept independent paths reaching it.
///
/// Every path in a plan terminates at a state whose serialized key equals
/// `key`.
#[derive(Debug, Clone, Serialize)]
pub struct Plan<S, E> {
    pub state: S,
    pub key: StateKey,
    pub description: String,
    pub paths: Vec<Path<S, E>>,
}

/// Human-readable route description from a path's event tags.
pub(crate) fn describe_route(tags: &[&str]) -> String {
    if tags.is_empty() {
        "initial state".to_string()
    } else {
        format!("via {}", tags.join(", "))
    }
}

pub(crate) fn describe_target(key: &StateKey) -> String {
    format!("reaches '{key}'")
}

/// Group candidate paths by target key into plans, preserving first-seen
/// target order, and drop any path whose event-tag signature repeats an
/// already-kept path to the same target.
pub fn group_into_plans<S, E>(candidates: Vec<(StateKey, Path<S, E>)>) -> Vec<Plan<S, E>>
where
    S: Clone,
    E: Clone + EventTagged,
{
    let mut order: Vec<StateKey> = Vec::new();
    let mut plans: HashMap<StateKey, Plan<S, E>> = HashMap::new();
    let mut signatures: HashMap<StateKey, HashSet<Vec<String>>> = HashMap::new();

    for (key, path) in candidates {
        let plan = plans.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Plan {
                state: path.state.clone(),
                key: key.clone(),
                description: describe_target(&key),
                paths: Vec::new(),
            }
        });

        if signatures
            .entry(key)
            .or_default()
            .insert(path.signature())
        {
            plan.paths.push(path);
        }
    }

    order.iter().filter_map(|key| plans.remove(key)).collect()
}

/// Replay a path's steps through the behavior's transition function,
/// starting from the initial state. Used to check the generator's soundness
/// invariant: the result must equal the path's recorded target.
pub fn replay<B: Behavior>(behavior: &B, path: &Path<B::State, B::Event>) -> B::State {
    let mut state = behavior.initial_state();
    for step in &path.steps {
        state = behavior.transition(&state, &step.event);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct S(u32);

    #[derive(Debug, Clone)]
    struct E(&'static str);

    impl EventTagged for E {
        fn tag(&self) -> &str {
            self.0
        }
    }

    fn path(target: u32, tags: &[&'static str]) -> Path<S, E> {
        Path {
            steps: tags
                .iter()
                .map(|t| Step {
                    state: S(0),
                    event: E(t),
                })
                .collect(),
            state: S(target),
            weight: tags.len(),
            description: describe_route(tags),
        }
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let plans = group_into_plans(vec![
            (StateKey::new("b"), path(1, &["GO"])),
            (StateKey::new("a"), path(0, &[])),
            (StateKey::new("b"), path(1, &["BACK", "GO"])),
        ]);

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].key, StateKey::new("b"));
        assert_eq!(plans[0].paths.len(), 2);
        assert_eq!(plans[1].key, StateKey::new("a"));
    }

    #[test]
    fn test_duplicate_signature_dropped_within_plan() {
        let plans = group_into_plans(vec![
            (StateKey::new("b"), path(1, &["GO"])),
            (StateKey::new("b"), path(1, &["GO"])),
        ]);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].paths.len(), 1);
    }

    #[test]
    fn test_same_signature_different_target_both_kept() {
        let plans = group_into_plans(vec![
            (StateKey::new("b"), path(1, &["GO"])),
            (StateKey::new("c"), path(2, &["GO"])),
        ]);

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].paths.len(), 1);
        assert_eq!(plans[1].paths.len(), 1);
    }

    #[test]
    fn test_route_descriptions() {
        assert_eq!(describe_route(&[]), "initial state");
        assert_eq!(describe_route(&["A", "B"]), "via A, B");
    }
}
