//! Shortest-plan generation: breadth-first search over the behavior graph.
//!
//! Works over a conceptually infinite graph bounded by the traversal limit.
//! BFS pops the frontier in FIFO order, so the first path to reach a key is
//! shortest by construction; the result holds exactly one plan per distinct
//! reachable (and filter-surviving) serialized state.

use std::collections::{HashMap, HashSet, VecDeque};

use statewalk_behavior::{Behavior, EventTagged, StateKey};

use crate::plan::{describe_route, describe_target, Path, Plan, Step};
use crate::{TraversalError, TraversalOptions};

pub fn shortest_plans<B: Behavior>(
    behavior: &B,
    options: &TraversalOptions<B::State, B::Event>,
) -> Result<Vec<Plan<B::State, B::Event>>, TraversalError> {
    let initial = behavior.initial_state();
    let initial_key = options.serializer.serialize(&initial, None);

    let mut visited: HashSet<StateKey> = HashSet::new();
    visited.insert(initial_key.clone());
    let mut visit_count: usize = 1;

    let mut order: Vec<StateKey> = vec![initial_key.clone()];
    let mut plans: HashMap<StateKey, Plan<B::State, B::Event>> = HashMap::new();
    plans.insert(
        initial_key.clone(),
        Plan {
            state: initial.clone(),
            key: initial_key.clone(),
            description: describe_target(&initial_key),
            paths: vec![Path {
                steps: Vec::new(),
                state: initial.clone(),
                weight: 0,
                description: describe_route(&[]),
            }],
        },
    );

    let mut frontier: VecDeque<(B::State, Path<B::State, B::Event>)> = VecDeque::new();
    frontier.push_back((
        initial.clone(),
        Path {
            steps: Vec::new(),
            state: initial,
            weight: 0,
            description: describe_route(&[]),
        },
    ));

    while let Some((state, path)) = frontier.pop_front() {
        for event in behavior.events(&state)? {
            let next = behavior.transition(&state, &event);

            if let Some(filter) = &options.filter {
                if !filter(&next) {
                    continue;
                }
            }

            let key = options.serializer.serialize(&next, Some(&event));

            let mut steps = path.steps.clone();
            steps.push(Step {
                state: state.clone(),
                event: event.clone(),
            });
            let weight = steps.len();
            let tags: Vec<&str> = steps.iter().map(|s| s.event.tag()).collect();
            let extended = Path {
                description: describe_route(&tags),
                steps,
                state: next.clone(),
                weight,
            };

            if visited.insert(key.clone()) {
                visit_count += 1;
                if visit_count > options.traversal_limit {
                    return Err(TraversalError::LimitExceeded {
                        limit: options.traversal_limit,
                    });
                }

                plans.insert(
                    key.clone(),
                    Plan {
                        state: next.clone(),
                        key: key.clone(),
                        description: describe_target(&key),
                        paths: vec![extended.clone()],
                    },
                );
                order.push(key);
                frontier.push_back((next, extended));
            } else if options.keep_equal_shortest {
                // A later path at the same BFS depth is an equally short
                // alternative; anything longer is discarded.
                if let Some(plan) = plans.get_mut(&key) {
                    let shortest = plan.paths.first().map(|p| p.weight);
                    let repeat = plan
                        .paths
                        .iter()
                        .any(|p| p.signature() == extended.signature());
                    if shortest == Some(weight) && !repeat {
                        plan.paths.push(extended);
                    }
                }
            }
        }
    }

    Ok(order.iter().filter_map(|key| plans.remove(key)).collect())
}

/// Shortest plans whose target state satisfies `predicate`. Zero matches
/// yields an empty vec, not an error.
pub fn shortest_plans_to<B: Behavior>(
    behavior: &B,
    predicate: impl Fn(&B::State) -> bool,
    options: &TraversalOptions<B::State, B::Event>,
) -> Result<Vec<Plan<B::State, B::Event>>, TraversalError> {
    let plans = shortest_plans(behavior, options)?;
    Ok(plans
        .into_iter()
        .filter(|plan| predicate(&plan.state))
        .collect())
}
