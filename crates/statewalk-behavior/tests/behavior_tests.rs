use std::collections::HashMap;

use serde::Serialize;
use statewalk_behavior::{
    Behavior, BehaviorError, CanonicalSerializer, CaseSource, CasedBehavior, EventTagged,
    StateSerializer,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Counter {
    count: i64,
}

#[derive(Debug, Clone, PartialEq)]
enum CounterEvent {
    Increment { by: i64 },
    Reset,
}

impl EventTagged for CounterEvent {
    fn tag(&self) -> &str {
        match self {
            CounterEvent::Increment { .. } => "INCREMENT",
            CounterEvent::Reset => "RESET",
        }
    }
}

struct CounterBehavior;

impl Behavior for CounterBehavior {
    type State = Counter;
    type Event = CounterEvent;

    fn initial_state(&self) -> Counter {
        Counter { count: 0 }
    }

    fn transition(&self, state: &Counter, event: &CounterEvent) -> Counter {
        match event {
            CounterEvent::Increment { by } => Counter {
                count: state.count + by,
            },
            CounterEvent::Reset => Counter { count: 0 },
        }
    }

    fn events(&self, _state: &Counter) -> Result<Vec<CounterEvent>, BehaviorError> {
        Ok(vec![
            CounterEvent::Increment { by: 1 },
            CounterEvent::Reset,
        ])
    }
}

#[test]
fn test_transition_is_deterministic_by_key() {
    // The purity contract: same (state, event) always yields the same
    // serialized key across repeated calls.
    let behavior = CounterBehavior;
    let serializer = CanonicalSerializer::new();
    let state = Counter { count: 3 };
    let event = CounterEvent::Increment { by: 2 };

    let first = behavior.transition(&state, &event);
    let second = behavior.transition(&state, &event);
    assert_eq!(
        serializer.serialize(&first, Some(&event)),
        serializer.serialize(&second, Some(&event)),
    );
}

#[test]
fn test_cases_replace_tagged_event() {
    let mut cases: HashMap<String, CaseSource<CounterBehavior>> = HashMap::new();
    cases.insert(
        "INCREMENT".to_string(),
        CaseSource::Fixed(vec![
            CounterEvent::Increment { by: 1 },
            CounterEvent::Increment { by: 5 },
            CounterEvent::Increment { by: 10 },
        ]),
    );

    let behavior = CounterBehavior;
    let cased = CasedBehavior::new(&behavior, &cases);
    let events = cased.events(&Counter { count: 0 }).unwrap();

    // Three INCREMENT variants plus the untouched RESET.
    assert_eq!(events.len(), 4);
    assert_eq!(
        events
            .iter()
            .filter(|e| e.tag() == "INCREMENT")
            .count(),
        3
    );
    assert!(events.contains(&CounterEvent::Reset));
}

#[test]
fn test_case_generator_sees_current_state() {
    let mut cases: HashMap<String, CaseSource<CounterBehavior>> = HashMap::new();
    cases.insert(
        "INCREMENT".to_string(),
        CaseSource::generate(|state: &Counter| {
            Ok(vec![CounterEvent::Increment { by: state.count + 1 }])
        }),
    );

    let behavior = CounterBehavior;
    let cased = CasedBehavior::new(&behavior, &cases);

    let events = cased.events(&Counter { count: 7 }).unwrap();
    assert!(events.contains(&CounterEvent::Increment { by: 8 }));
}

#[test]
fn test_case_generator_failure_propagates() {
    let mut cases: HashMap<String, CaseSource<CounterBehavior>> = HashMap::new();
    cases.insert(
        "INCREMENT".to_string(),
        CaseSource::generate(|_state: &Counter| {
            Err(BehaviorError::CaseGenerator {
                event: "INCREMENT".to_string(),
                reason: "no cases available".to_string(),
            })
        }),
    );

    let behavior = CounterBehavior;
    let cased = CasedBehavior::new(&behavior, &cases);

    let err = cased.events(&Counter { count: 0 }).unwrap_err();
    assert!(matches!(err, BehaviorError::CaseGenerator { .. }));
}

#[test]
fn test_custom_serializer_closure() {
    let serializer = |state: &Counter, _event: Option<&CounterEvent>| {
        statewalk_behavior::StateKey::new(format!("count={}", state.count))
    };

    let key = serializer.serialize(&Counter { count: 4 }, None);
    assert_eq!(key.as_str(), "count=4");
}
