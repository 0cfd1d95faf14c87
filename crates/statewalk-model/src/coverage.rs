//! Coverage accumulation and criteria evaluation.
//!
//! Every generation and execution call folds visited states and visited
//! (state, event) transitions into one [`TestModelCoverage`] record. Caller
//! supplied criteria are predicates over that record; built-in factories on
//! the test model derive one criterion per discoverable state or transition.

use std::collections::HashMap;

use statewalk_behavior::StateKey;

/// A visited value plus how often it was seen.
#[derive(Debug, Clone)]
pub struct VisitCount<T> {
    pub value: T,
    pub count: u64,
}

/// Visit counts keyed by serialized identity.
#[derive(Debug, Clone)]
pub struct TestModelCoverage<S, E> {
    states: HashMap<StateKey, VisitCount<S>>,
    transitions: HashMap<String, VisitCount<(S, E)>>,
}

/// Composite identity of one (state, event) edge.
pub(crate) fn transition_key(state_key: &StateKey, tag: &str) -> String {
    format!("{state_key} -> {tag}")
}

impl<S: Clone, E: Clone> TestModelCoverage<S, E> {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            transitions: HashMap::new(),
        }
    }

    pub(crate) fn record_state(&mut self, key: StateKey, state: &S) {
        self.states
            .entry(key)
            .and_modify(|visit| visit.count += 1)
            .or_insert_with(|| VisitCount {
                value: state.clone(),
                count: 1,
            });
    }

    pub(crate) fn record_transition(
        &mut self,
        state_key: &StateKey,
        tag: &str,
        state: &S,
        event: &E,
    ) {
        self.transitions
            .entry(transition_key(state_key, tag))
            .and_modify(|visit| visit.count += 1)
            .or_insert_with(|| VisitCount {
                value: (state.clone(), event.clone()),
                count: 1,
            });
    }

    pub fn state_count(&self, key: &StateKey) -> u64 {
        self.states.get(key).map(|visit| visit.count).unwrap_or(0)
    }

    pub fn transition_count(&self, state_key: &StateKey, tag: &str) -> u64 {
        self.transitions
            .get(&transition_key(state_key, tag))
            .map(|visit| visit.count)
            .unwrap_or(0)
    }

    pub fn distinct_states(&self) -> usize {
        self.states.len()
    }

    pub fn distinct_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn states(&self) -> &HashMap<StateKey, VisitCount<S>> {
        &self.states
    }

    pub fn transitions(&self) -> &HashMap<String, VisitCount<(S, E)>> {
        &self.transitions
    }
}

impl<S: Clone, E: Clone> Default for TestModelCoverage<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A named predicate over accumulated visit counts.
pub struct Criterion<S, E> {
    pub predicate: Box<dyn Fn(&TestModelCoverage<S, E>) -> bool + Send + Sync>,
    pub description: String,
    pub skip: bool,
}

impl<S, E> Criterion<S, E> {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&TestModelCoverage<S, E>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            description: description.into(),
            skip: false,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageStatus {
    Covered,
    Uncovered,
    Skipped,
}

pub struct CoverageReportEntry<S, E> {
    pub criterion: Criterion<S, E>,
    pub status: CoverageStatus,
}

/// Evaluate each criterion against the accumulated coverage.
pub(crate) fn evaluate<S, E>(
    coverage: &TestModelCoverage<S, E>,
    criteria: Vec<Criterion<S, E>>,
) -> Vec<CoverageReportEntry<S, E>> {
    criteria
        .into_iter()
        .map(|criterion| {
            let status = if criterion.skip {
                CoverageStatus::Skipped
            } else if (criterion.predicate)(coverage) {
                CoverageStatus::Covered
            } else {
                CoverageStatus::Uncovered
            };
            CoverageReportEntry { criterion, status }
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("coverage criteria not met: {}", .uncovered.join("; "))]
    CriteriaNotMet { uncovered: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate_per_key() {
        let mut coverage: TestModelCoverage<&str, &str> = TestModelCoverage::new();
        coverage.record_state(StateKey::new("a"), &"a");
        coverage.record_state(StateKey::new("a"), &"a");
        coverage.record_state(StateKey::new("b"), &"b");

        assert_eq!(coverage.state_count(&StateKey::new("a")), 2);
        assert_eq!(coverage.state_count(&StateKey::new("b")), 1);
        assert_eq!(coverage.state_count(&StateKey::new("c")), 0);
        assert_eq!(coverage.distinct_states(), 2);
    }

    #[test]
    fn test_transition_counts_keyed_by_state_and_tag() {
        let mut coverage: TestModelCoverage<&str, &str> = TestModelCoverage::new();
        coverage.record_transition(&StateKey::new("a"), "GO", &"a", &"GO");
        coverage.record_transition(&StateKey::new("a"), "GO", &"a", &"GO");
        coverage.record_transition(&StateKey::new("a"), "STOP", &"a", &"STOP");

        assert_eq!(coverage.transition_count(&StateKey::new("a"), "GO"), 2);
        assert_eq!(coverage.transition_count(&StateKey::new("a"), "STOP"), 1);
        assert_eq!(coverage.distinct_transitions(), 2);
    }

    #[test]
    fn test_evaluate_statuses() {
        let mut coverage: TestModelCoverage<&str, &str> = TestModelCoverage::new();
        coverage.record_state(StateKey::new("a"), &"a");

        let entries = evaluate(
            &coverage,
            vec![
                Criterion::new("a visited", |cov: &TestModelCoverage<&str, &str>| {
                    cov.state_count(&StateKey::new("a")) > 0
                }),
                Criterion::new("b visited", |cov: &TestModelCoverage<&str, &str>| {
                    cov.state_count(&StateKey::new("b")) > 0
                }),
                Criterion::new("ignored", |_: &TestModelCoverage<&str, &str>| false)
                    .skipped(),
            ],
        );

        assert_eq!(entries[0].status, CoverageStatus::Covered);
        assert_eq!(entries[1].status, CoverageStatus::Uncovered);
        assert_eq!(entries[2].status, CoverageStatus::Skipped);
    }

    #[test]
    fn test_coverage_error_lists_descriptions() {
        let err = CoverageError::CriteriaNotMet {
            uncovered: vec!["covers state 'a'".to_string(), "covers state 'b'".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("covers state 'a'"));
        assert!(message.contains("covers state 'b'"));
    }
}
