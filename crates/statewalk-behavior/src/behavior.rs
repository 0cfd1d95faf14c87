//! The behavior contract — an abstract, pure state-transition system.
//!
//! The traversal and execution layers never interpret a state machine
//! themselves; everything they know about the system comes through this
//! trait: an initial state, a pure transition function, and an enumeration
//! of candidate events per state.

#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    #[error("case generator for event '{event}' failed: {reason}")]
    CaseGenerator { event: String, reason: String },

    #[error("event enumeration failed: {0}")]
    Enumeration(String),
}

/// Events carry a type tag used for executor dispatch and for path
/// signatures. Payload fields are opaque to the engine.
pub trait EventTagged {
    fn tag(&self) -> &str;
}

/// An abstract, pure transition system.
///
/// `transition` must be deterministic and side-effect-free for a fixed
/// (state, event) pair: it is called repeatedly during search, and the same
/// inputs must always yield the same successor. The engine does not guard
/// against violations; non-determinism shows up as unstable serialized keys
/// and should be asserted against in the behavior's own tests.
pub trait Behavior {
    type State: Clone;
    type Event: Clone + EventTagged;

    fn initial_state(&self) -> Self::State;

    /// Compute the successor of `state` under `event`. Pure.
    fn transition(&self, state: &Self::State, event: &Self::Event) -> Self::State;

    /// Enumerate candidate events to try from `state`.
    ///
    /// Fallible because a per-state dynamic case generator may fail; such a
    /// failure aborts the whole generation call with no partial result.
    fn events(&self, state: &Self::State) -> Result<Vec<Self::Event>, BehaviorError>;
}

impl<B: Behavior + ?Sized> Behavior for &B {
    type State = B::State;
    type Event = B::Event;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn transition(&self, state: &Self::State, event: &Self::Event) -> Self::State {
        (**self).transition(state, event)
    }

    fn events(&self, state: &Self::State) -> Result<Vec<Self::Event>, BehaviorError> {
        (**self).events(state)
    }
}

impl EventTagged for String {
    fn tag(&self) -> &str {
        self
    }
}

impl EventTagged for &str {
    fn tag(&self) -> &str {
        self
    }
}
