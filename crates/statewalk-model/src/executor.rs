//! The test model: replays generated plans against a live system-under-test.
//!
//! Generation is pure and synchronous; execution is async because the
//! caller's callbacks represent real SUT interaction. Within one path,
//! steps run strictly in sequence — step N's exec and verification fully
//! resolve before step N+1 begins, because every step mutates the same SUT
//! instance through the caller-owned context. The engine never runs paths
//! or plans concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use statewalk_behavior::{Behavior, CasedBehavior, EventTagged, StateKey};
use statewalk_traversal::{
    shortest_plans, simple_plans, Path, Plan, TraversalError, TraversalOptions,
};

use crate::config::{
    Effective, EventCases, EventOf, RunOptions, StateOf, StateTestFn, TestModelOptions,
};
use crate::coverage::{
    evaluate, CoverageError, CoverageReportEntry, CoverageStatus, Criterion, TestModelCoverage,
};

/// Outcome of one executed step. Errors are captured, never swallowed; a
/// populated field means that callback failed and the rest of the path was
/// not attempted.
#[derive(Debug, Clone, Default)]
pub struct StepResult {
    /// Failure of the event executor or the transition hook.
    pub event_error: Option<String>,
    /// Failure of the resulting state's verification callback.
    pub state_error: Option<String>,
}

/// Outcome of one replayed path.
#[derive(Debug, Clone)]
pub struct PathResult {
    pub description: String,
    pub steps: Vec<StepResult>,
    /// Failure of the target state's postcondition test.
    pub state_error: Option<String>,
}

impl PathResult {
    /// First recorded failure as (step index, message); the target
    /// postcondition reports at index `steps.len()`.
    pub fn first_failure(&self) -> Option<(usize, &str)> {
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(err) = step.event_error.as_deref().or(step.state_error.as_deref()) {
                return Some((index, err));
            }
        }
        self.state_error
            .as_deref()
            .map(|err| (self.steps.len(), err))
    }
}

/// Outcome of one fully executed plan.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub description: String,
    pub key: StateKey,
    pub paths: Vec<PathResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("path '{description}' failed at step {step_index}: {message}")]
    PathFailed {
        description: String,
        step_index: usize,
        message: String,
        result: PathResult,
    },

    #[error("plan '{description}': {source}")]
    PlanFailed {
        description: String,
        #[source]
        source: Box<ExecError>,
    },

    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

/// A behavior plus the configuration needed to generate plans from it and
/// drive a SUT through them.
pub struct TestModel<B: Behavior, C> {
    behavior: B,
    options: TestModelOptions<B, C>,
    coverage: Mutex<TestModelCoverage<StateOf<B>, EventOf<B>>>,
}

impl<B, C> TestModel<B, C>
where
    B: Behavior,
{
    pub fn new(behavior: B, options: TestModelOptions<B, C>) -> Self {
        Self {
            behavior,
            options,
            coverage: Mutex::new(TestModelCoverage::new()),
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    fn traversal_options(
        eff: &Effective<'_, B, C>,
    ) -> TraversalOptions<StateOf<B>, EventOf<B>> {
        TraversalOptions {
            serializer: Arc::clone(eff.serializer),
            filter: eff.filter.cloned(),
            traversal_limit: eff.traversal_limit,
            keep_equal_shortest: false,
        }
    }

    /// Raw generation: the configured `plan_generator` if any, otherwise
    /// shortest-plan search. Does not execute anything.
    pub fn get_plans(
        &self,
        run: &RunOptions<B, C>,
    ) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError> {
        let eff = run.merged(&self.options);
        let traversal = Self::traversal_options(&eff);
        let cases = EventCases(eff.events);
        let cased = CasedBehavior::new(&self.behavior, &cases);
        let plans = match eff.plan_generator {
            Some(generator) => (generator.as_ref())(&cased, &traversal)?,
            None => shortest_plans(&cased, &traversal)?,
        };
        self.record_plans(&eff, &plans);
        Ok(plans)
    }

    pub fn get_shortest_plans(
        &self,
        run: &RunOptions<B, C>,
    ) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError> {
        let eff = run.merged(&self.options);
        let traversal = Self::traversal_options(&eff);
        let cases = EventCases(eff.events);
        let cased = CasedBehavior::new(&self.behavior, &cases);
        let plans = shortest_plans(&cased, &traversal)?;
        self.record_plans(&eff, &plans);
        Ok(plans)
    }

    pub fn get_simple_plans(
        &self,
        run: &RunOptions<B, C>,
    ) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError> {
        let eff = run.merged(&self.options);
        let traversal = Self::traversal_options(&eff);
        let cases = EventCases(eff.events);
        let cased = CasedBehavior::new(&self.behavior, &cases);
        let plans = simple_plans(&cased, &traversal)?;
        self.record_plans(&eff, &plans);
        Ok(plans)
    }

    /// Shortest plans whose target satisfies `predicate`; zero matches is an
    /// empty vec, not an error.
    pub fn get_shortest_plans_to(
        &self,
        predicate: impl Fn(&StateOf<B>) -> bool,
        run: &RunOptions<B, C>,
    ) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError> {
        let plans = self.get_shortest_plans(run)?;
        Ok(plans
            .into_iter()
            .filter(|plan| predicate(&plan.state))
            .collect())
    }

    pub fn get_simple_plans_to(
        &self,
        predicate: impl Fn(&StateOf<B>) -> bool,
        run: &RunOptions<B, C>,
    ) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError> {
        let plans = self.get_simple_plans(run)?;
        Ok(plans
            .into_iter()
            .filter(|plan| predicate(&plan.state))
            .collect())
    }

    /// Replay one path against the SUT with the model-level options.
    pub async fn test_path(
        &self,
        path: &Path<StateOf<B>, EventOf<B>>,
        context: &mut C,
    ) -> Result<PathResult, ExecError> {
        let run = RunOptions::default();
        let eff = run.merged(&self.options);
        let result = self.run_path(&eff, path, context).await;
        path_outcome(result)
    }

    /// Run every path in the plan sequentially; the first failing path's
    /// error is surfaced annotated with the plan's description.
    pub async fn test_plan(
        &self,
        plan: &Plan<StateOf<B>, EventOf<B>>,
        context: &mut C,
    ) -> Result<Vec<PathResult>, ExecError> {
        let run = RunOptions::default();
        let eff = run.merged(&self.options);
        self.run_plan(&eff, plan, context).await
    }

    /// Generate via [`get_plans`](Self::get_plans), then execute every
    /// resulting plan sequentially.
    pub async fn test_plans(
        &self,
        run: &RunOptions<B, C>,
        context: &mut C,
    ) -> Result<Vec<PlanReport>, ExecError> {
        let plans = self.get_plans(run)?;
        self.execute_plans(run, &plans, context).await
    }

    /// Generate shortest plans, then execute them all.
    pub async fn test_shortest_plans(
        &self,
        run: &RunOptions<B, C>,
        context: &mut C,
    ) -> Result<Vec<PlanReport>, ExecError> {
        let plans = self.get_shortest_plans(run)?;
        self.execute_plans(run, &plans, context).await
    }

    /// Generate simple plans, then execute them all.
    pub async fn test_simple_plans(
        &self,
        run: &RunOptions<B, C>,
        context: &mut C,
    ) -> Result<Vec<PlanReport>, ExecError> {
        let plans = self.get_simple_plans(run)?;
        self.execute_plans(run, &plans, context).await
    }

    async fn execute_plans(
        &self,
        run: &RunOptions<B, C>,
        plans: &[Plan<StateOf<B>, EventOf<B>>],
        context: &mut C,
    ) -> Result<Vec<PlanReport>, ExecError> {
        let eff = run.merged(&self.options);
        let mut reports = Vec::new();
        for plan in plans {
            let paths = self.run_plan(&eff, plan, context).await?;
            reports.push(PlanReport {
                description: plan.description.clone(),
                key: plan.key.clone(),
                paths,
            });
        }
        Ok(reports)
    }

    async fn run_plan(
        &self,
        eff: &Effective<'_, B, C>,
        plan: &Plan<StateOf<B>, EventOf<B>>,
        context: &mut C,
    ) -> Result<Vec<PathResult>, ExecError> {
        let mut results = Vec::new();
        for path in &plan.paths {
            let result = self.run_path(eff, path, context).await;
            match path_outcome(result) {
                Ok(result) => results.push(result),
                Err(err) => {
                    eff.logger
                        .error(&format!("plan '{}' failed: {err}", plan.description));
                    return Err(ExecError::PlanFailed {
                        description: plan.description.clone(),
                        source: Box::new(err),
                    });
                }
            }
        }
        Ok(results)
    }

    async fn run_path(
        &self,
        eff: &Effective<'_, B, C>,
        path: &Path<StateOf<B>, EventOf<B>>,
        context: &mut C,
    ) -> PathResult {
        eff.logger
            .log(&format!("testing path: {}", path.description));

        let mut result = PathResult {
            description: path.description.clone(),
            steps: Vec::new(),
            state_error: None,
        };
        let mut aborted = false;
        let mut prev_event: Option<&EventOf<B>> = None;

        for step in &path.steps {
            let mut step_result = StepResult::default();

            let pre_key = eff.serializer.serialize(&step.state, prev_event);
            {
                let mut coverage = self.coverage.lock().unwrap();
                coverage.record_state(pre_key.clone(), &step.state);
                coverage.record_transition(
                    &pre_key,
                    step.event.tag(),
                    &step.state,
                    &step.event,
                );
            }

            // (a) event executor: exact tag, then the "*" fallback.
            let exec = eff
                .events
                .get(step.event.tag())
                .and_then(|config| config.exec.as_ref())
                .or_else(|| eff.events.get("*").and_then(|config| config.exec.as_ref()));
            if let Some(exec) = exec {
                if let Err(err) = (exec.as_ref())(step, context).await {
                    eff.logger
                        .error(&format!("event '{}' failed: {err}", step.event.tag()));
                    step_result.event_error = Some(err.to_string());
                    aborted = true;
                }
            }

            if !aborted {
                // (b) verify the state the step lands in.
                let next = self.behavior.transition(&step.state, &step.event);
                let next_key = eff.serializer.serialize(&next, Some(&step.event));
                self.coverage
                    .lock()
                    .unwrap()
                    .record_state(next_key.clone(), &next);

                if let Some(test) = resolve_state_test(eff.states, &next_key) {
                    if let Err(err) = (test.as_ref())(context).await {
                        eff.logger
                            .error(&format!("state '{next_key}' failed: {err}"));
                        step_result.state_error = Some(err.to_string());
                        aborted = true;
                    }
                }
            }

            // (c) global transition hook.
            if !aborted {
                if let Some(hook) = eff.test_transition {
                    if let Err(err) = (hook.as_ref())(step, context).await {
                        step_result.event_error = Some(err.to_string());
                        aborted = true;
                    }
                }
            }

            result.steps.push(step_result);
            if aborted {
                break;
            }
            prev_event = Some(&step.event);
        }

        // The target postcondition runs once, after the last attempted step.
        let target_key = eff
            .serializer
            .serialize(&path.state, path.steps.last().map(|step| &step.event));
        if let Some(test) = resolve_state_test(eff.states, &target_key) {
            if let Err(err) = (test.as_ref())(context).await {
                eff.logger
                    .error(&format!("target '{target_key}' failed: {err}"));
                result.state_error = Some(err.to_string());
            }
        }

        result
    }

    fn record_plans(
        &self,
        eff: &Effective<'_, B, C>,
        plans: &[Plan<StateOf<B>, EventOf<B>>],
    ) {
        let mut coverage = self.coverage.lock().unwrap();
        for plan in plans {
            coverage.record_state(plan.key.clone(), &plan.state);
            for path in &plan.paths {
                let mut prev_event: Option<&EventOf<B>> = None;
                for step in &path.steps {
                    let key = eff.serializer.serialize(&step.state, prev_event);
                    coverage.record_transition(
                        &key,
                        step.event.tag(),
                        &step.state,
                        &step.event,
                    );
                    coverage.record_state(key, &step.state);
                    prev_event = Some(&step.event);
                }
            }
        }
    }

    /// Snapshot of the accumulated coverage.
    pub fn coverage(&self) -> TestModelCoverage<StateOf<B>, EventOf<B>> {
        self.coverage.lock().unwrap().clone()
    }

    /// One criterion per discoverable state, derived from a full
    /// shortest-plan traversal. Derivation does not touch the accumulated
    /// coverage.
    pub fn covers_all_states(
        &self,
    ) -> Result<Vec<Criterion<StateOf<B>, EventOf<B>>>, TraversalError> {
        let plans = self.discover()?;
        Ok(plans
            .into_iter()
            .map(|plan| {
                let key = plan.key.clone();
                let description = format!("covers state '{key}'");
                Criterion::new(description, move |coverage: &TestModelCoverage<_, _>| {
                    coverage.state_count(&key) > 0
                })
            })
            .collect())
    }

    /// One criterion per discoverable (state, event) transition.
    pub fn covers_all_transitions(
        &self,
    ) -> Result<Vec<Criterion<StateOf<B>, EventOf<B>>>, TraversalError> {
        let run = RunOptions::default();
        let eff = run.merged(&self.options);
        let plans = self.discover()?;

        let mut seen: HashSet<(StateKey, String)> = HashSet::new();
        let mut criteria = Vec::new();
        for plan in &plans {
            for path in &plan.paths {
                let mut prev_event: Option<&EventOf<B>> = None;
                for step in &path.steps {
                    let key = eff.serializer.serialize(&step.state, prev_event);
                    let tag = step.event.tag().to_string();
                    if seen.insert((key.clone(), tag.clone())) {
                        let description = format!("covers transition '{tag}' from '{key}'");
                        criteria.push(Criterion::new(
                            description,
                            move |coverage: &TestModelCoverage<_, _>| {
                                coverage.transition_count(&key, &tag) > 0
                            },
                        ));
                    }
                    prev_event = Some(&step.event);
                }
            }
        }
        Ok(criteria)
    }

    /// Map each criterion to covered / uncovered / skipped against the
    /// accumulated coverage.
    pub fn get_coverage(
        &self,
        criteria: Vec<Criterion<StateOf<B>, EventOf<B>>>,
    ) -> Vec<CoverageReportEntry<StateOf<B>, EventOf<B>>> {
        let coverage = self.coverage.lock().unwrap();
        evaluate(&coverage, criteria)
    }

    /// Fails listing every uncovered, non-skipped criterion; the caller
    /// decides whether that is fatal.
    pub fn test_coverage(
        &self,
        criteria: Vec<Criterion<StateOf<B>, EventOf<B>>>,
    ) -> Result<(), CoverageError> {
        let entries = self.get_coverage(criteria);
        let uncovered: Vec<String> = entries
            .iter()
            .filter(|entry| entry.status == CoverageStatus::Uncovered)
            .map(|entry| entry.criterion.description.clone())
            .collect();
        if uncovered.is_empty() {
            Ok(())
        } else {
            self.options
                .logger
                .error(&format!("{} coverage criteria uncovered", uncovered.len()));
            Err(CoverageError::CriteriaNotMet { uncovered })
        }
    }

    fn discover(&self) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError> {
        let run = RunOptions::default();
        let eff = run.merged(&self.options);
        let traversal = Self::traversal_options(&eff);
        let cases = EventCases(eff.events);
        let cased = CasedBehavior::new(&self.behavior, &cases);
        shortest_plans(&cased, &traversal)
    }
}

fn path_outcome(result: PathResult) -> Result<PathResult, ExecError> {
    match result.first_failure() {
        Some((step_index, message)) => {
            let message = message.to_string();
            Err(ExecError::PathFailed {
                description: result.description.clone(),
                step_index,
                message,
                result,
            })
        }
        None => Ok(result),
    }
}

/// State-test lookup: exact key, then each dot-joined ancestor prefix
/// (longest first), then the `"*"` wildcard. A state matching none is
/// simply not tested.
fn resolve_state_test<'a, C>(
    states: &'a HashMap<String, StateTestFn<C>>,
    key: &StateKey,
) -> Option<&'a StateTestFn<C>> {
    if let Some(test) = states.get(key.as_str()) {
        return Some(test);
    }
    let full = key.as_str();
    let mut end = full.len();
    while let Some(dot) = full[..end].rfind('.') {
        if let Some(test) = states.get(&full[..dot]) {
            return Some(test);
        }
        end = dot;
    }
    states.get("*")
}
