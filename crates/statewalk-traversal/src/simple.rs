//! Simple-plan generation: bounded depth-first search.
//!
//! A path is extended only while the successor's key does not already
//! appear earlier in the same path, so every produced path is acyclic even
//! on cyclic graphs. Each reached state emits a candidate path, so one
//! target may accumulate several simple paths, one per distinct route.

use statewalk_behavior::{Behavior, EventTagged, StateKey};

use crate::plan::{describe_route, group_into_plans, Path, Plan, Step};
use crate::{TraversalError, TraversalOptions};

pub fn simple_plans<B: Behavior>(
    behavior: &B,
    options: &TraversalOptions<B::State, B::Event>,
) -> Result<Vec<Plan<B::State, B::Event>>, TraversalError> {
    let initial = behavior.initial_state();
    let initial_key = options.serializer.serialize(&initial, None);

    let mut candidates: Vec<(StateKey, Path<B::State, B::Event>)> = vec![(
        initial_key.clone(),
        Path {
            steps: Vec::new(),
            state: initial.clone(),
            weight: 0,
            description: describe_route(&[]),
        },
    )];

    let mut walk = Walk {
        behavior,
        options,
        path_keys: vec![initial_key],
        steps: Vec::new(),
        candidates: &mut candidates,
        visit_count: 0,
    };
    walk.explore(&initial)?;

    Ok(group_into_plans(candidates))
}

/// Simple plans whose target state satisfies `predicate`. Zero matches
/// yields an empty vec, not an error.
pub fn simple_plans_to<B: Behavior>(
    behavior: &B,
    predicate: impl Fn(&B::State) -> bool,
    options: &TraversalOptions<B::State, B::Event>,
) -> Result<Vec<Plan<B::State, B::Event>>, TraversalError> {
    let plans = simple_plans(behavior, options)?;
    Ok(plans
        .into_iter()
        .filter(|plan| predicate(&plan.state))
        .collect())
}

/// Mutable walk state threaded through the recursion; local to one
/// generation call so calls stay independent.
struct Walk<'a, B: Behavior> {
    behavior: &'a B,
    options: &'a TraversalOptions<B::State, B::Event>,
    /// Keys of the states already on the current path, in order.
    path_keys: Vec<StateKey>,
    steps: Vec<Step<B::State, B::Event>>,
    candidates: &'a mut Vec<(StateKey, Path<B::State, B::Event>)>,
    visit_count: usize,
}

impl<B: Behavior> Walk<'_, B> {
    fn explore(&mut self, state: &B::State) -> Result<(), TraversalError> {
        self.visit_count += 1;
        if self.visit_count > self.options.traversal_limit {
            return Err(TraversalError::LimitExceeded {
                limit: self.options.traversal_limit,
            });
        }

        for event in self.behavior.events(state)? {
            let next = self.behavior.transition(state, &event);

            if let Some(filter) = &self.options.filter {
                if !filter(&next) {
                    continue;
                }
            }

            let next_key = self.options.serializer.serialize(&next, Some(&event));
            if self.path_keys.contains(&next_key) {
                continue;
            }

            self.steps.push(Step {
                state: state.clone(),
                event,
            });
            let tags: Vec<&str> = self.steps.iter().map(|s| s.event.tag()).collect();
            self.candidates.push((
                next_key.clone(),
                Path {
                    steps: self.steps.clone(),
                    state: next.clone(),
                    weight: self.steps.len(),
                    description: describe_route(&tags),
                },
            ));

            self.path_keys.push(next_key);
            self.explore(&next)?;
            self.path_keys.pop();
            self.steps.pop();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use statewalk_behavior::{Behavior, BehaviorError, EventTagged};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Named(&'static str);

    #[derive(Debug, Clone)]
    struct Ev(&'static str);

    impl EventTagged for Ev {
        fn tag(&self) -> &str {
            self.0
        }
    }

    /// a <--> b cycle plus a --FINISH--> c.
    struct Cyclic;

    impl Behavior for Cyclic {
        type State = Named;
        type Event = Ev;

        fn initial_state(&self) -> Named {
            Named("a")
        }

        fn transition(&self, state: &Named, event: &Ev) -> Named {
            match (state.0, event.0) {
                ("a", "TOGGLE") => Named("b"),
                ("b", "TOGGLE") => Named("a"),
                ("a", "FINISH") => Named("c"),
                _ => state.clone(),
            }
        }

        fn events(&self, state: &Named) -> Result<Vec<Ev>, BehaviorError> {
            Ok(match state.0 {
                "a" => vec![Ev("TOGGLE"), Ev("FINISH")],
                "b" => vec![Ev("TOGGLE")],
                _ => vec![],
            })
        }
    }

    #[test]
    fn test_cycle_terminates_and_paths_are_acyclic() {
        let plans = simple_plans(&Cyclic, &TraversalOptions::default()).unwrap();

        // Targets a, b, c.
        assert_eq!(plans.len(), 3);
        for plan in &plans {
            for path in &plan.paths {
                let mut seen = vec![];
                for step in &path.steps {
                    assert!(!seen.contains(&step.state.0));
                    seen.push(step.state.0);
                }
            }
        }
    }

    /// Two routes into d: a -> b -> d and a -> c -> d.
    struct Diamond;

    impl Behavior for Diamond {
        type State = Named;
        type Event = Ev;

        fn initial_state(&self) -> Named {
            Named("a")
        }

        fn transition(&self, state: &Named, event: &Ev) -> Named {
            match (state.0, event.0) {
                ("a", "LEFT") => Named("b"),
                ("a", "RIGHT") => Named("c"),
                ("b", "DOWN") | ("c", "DOWN") => Named("d"),
                _ => state.clone(),
            }
        }

        fn events(&self, state: &Named) -> Result<Vec<Ev>, BehaviorError> {
            Ok(match state.0 {
                "a" => vec![Ev("LEFT"), Ev("RIGHT")],
                "b" | "c" => vec![Ev("DOWN")],
                _ => vec![],
            })
        }
    }

    #[test]
    fn test_multiple_routes_to_one_target() {
        let plans = simple_plans(&Diamond, &TraversalOptions::default()).unwrap();

        let d = plans.iter().find(|p| p.state.0 == "d").unwrap();
        assert_eq!(d.paths.len(), 2);

        // No two paths within one plan share a signature.
        for plan in &plans {
            let mut sigs: Vec<Vec<String>> =
                plan.paths.iter().map(|p| p.signature()).collect();
            let before = sigs.len();
            sigs.sort();
            sigs.dedup();
            assert_eq!(sigs.len(), before);
        }
    }

    #[test]
    fn test_all_paths_in_plan_share_target_key() {
        let plans = simple_plans(&Diamond, &TraversalOptions::default()).unwrap();
        let options = TraversalOptions::<Named, Ev>::default();

        for plan in &plans {
            for path in &plan.paths {
                let last_event = path.steps.last().map(|s| &s.event);
                let key = options.serializer.serialize(&path.state, last_event);
                assert_eq!(key, plan.key);
            }
        }
    }

    #[test]
    fn test_limit_applies_to_dfs() {
        let options = TraversalOptions {
            traversal_limit: 2,
            ..TraversalOptions::default()
        };

        let err = simple_plans(&Diamond, &options).unwrap_err();
        assert!(matches!(err, TraversalError::LimitExceeded { limit: 2 }));
    }
}
