//! Event case expansion.
//!
//! A behavior enumerates one candidate event per type; callers often want to
//! try several payload variants of the same event type, either a static list
//! or variants derived from the current state (e.g. numeric ranges read from
//! the state's data). `CasedBehavior` wraps a base behavior and expands
//! events through a per-tag case table.

use std::collections::{HashMap, HashSet};

use crate::behavior::{Behavior, BehaviorError, EventTagged};

type CaseGenFn<B> = Box<
    dyn Fn(&<B as Behavior>::State) -> Result<Vec<<B as Behavior>::Event>, BehaviorError>
        + Send
        + Sync,
>;

/// Where the payload variants for one event tag come from.
pub enum CaseSource<B: Behavior> {
    /// A fixed list of event instances, tried from every state.
    Fixed(Vec<B::Event>),
    /// A generator invoked with the exact current state.
    Generate(CaseGenFn<B>),
}

impl<B: Behavior> CaseSource<B> {
    pub fn generate<F>(gen: F) -> Self
    where
        F: Fn(&B::State) -> Result<Vec<B::Event>, BehaviorError> + Send + Sync + 'static,
    {
        Self::Generate(Box::new(gen))
    }

    fn expand(&self, state: &B::State) -> Result<Vec<B::Event>, BehaviorError> {
        match self {
            CaseSource::Fixed(events) => Ok(events.clone()),
            CaseSource::Generate(gen) => gen(state),
        }
    }
}

/// Resolves the case source for an event tag. Implemented for a plain tag
/// table and, downstream, for richer per-event configuration tables.
pub trait CaseLookup<B: Behavior> {
    fn case_for(&self, tag: &str) -> Option<&CaseSource<B>>;
}

impl<B: Behavior> CaseLookup<B> for HashMap<String, CaseSource<B>> {
    fn case_for(&self, tag: &str) -> Option<&CaseSource<B>> {
        self.get(tag)
    }
}

/// A behavior whose event enumeration is expanded through a case table.
///
/// Events whose tag has no entry in the table pass through unchanged. An
/// event whose tag has an entry is replaced by that source's expansion for
/// the current state; each expanded tag is applied once even if the base
/// behavior enumerates it multiple times.
pub struct CasedBehavior<'a, B: Behavior, M: CaseLookup<B>> {
    base: &'a B,
    cases: &'a M,
}

impl<'a, B: Behavior, M: CaseLookup<B>> CasedBehavior<'a, B, M> {
    pub fn new(base: &'a B, cases: &'a M) -> Self {
        Self { base, cases }
    }
}

impl<B: Behavior, M: CaseLookup<B>> Behavior for CasedBehavior<'_, B, M> {
    type State = B::State;
    type Event = B::Event;

    fn initial_state(&self) -> Self::State {
        self.base.initial_state()
    }

    fn transition(&self, state: &Self::State, event: &Self::Event) -> Self::State {
        self.base.transition(state, event)
    }

    fn events(&self, state: &Self::State) -> Result<Vec<Self::Event>, BehaviorError> {
        let mut out = Vec::new();
        let mut expanded: HashSet<String> = HashSet::new();

        for event in self.base.events(state)? {
            match self.cases.case_for(event.tag()) {
                Some(source) => {
                    if expanded.insert(event.tag().to_string()) {
                        out.extend(source.expand(state)?);
                    }
                }
                None => out.push(event),
            }
        }

        Ok(out)
    }
}
