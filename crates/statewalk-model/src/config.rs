//! Test-model configuration.
//!
//! Model-level defaults live in [`TestModelOptions`]; every execution or
//! generation call accepts a [`RunOptions`] whose populated fields override
//! the defaults via shallow merge.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use statewalk_behavior::{
    Behavior, CanonicalSerializer, CaseLookup, CaseSource, EventTagged, StateSerializer,
};
use statewalk_traversal::{
    Plan, Step, TraversalError, TraversalOptions, DEFAULT_TRAVERSAL_LIMIT,
};

pub type StateOf<B> = <B as Behavior>::State;
pub type EventOf<B> = <B as Behavior>::Event;

/// Error produced by SUT callbacks. Carries a rendered message; callbacks
/// interacting with a real system wrap whatever failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TestError {
    message: String,
}

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: impl fmt::Display) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<String> for TestError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for TestError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Per-step executor callback: drives the SUT for one event, mutating the
/// caller-owned context.
pub type ExecFn<B, C> = Arc<
    dyn for<'a> Fn(
            &'a Step<StateOf<B>, EventOf<B>>,
            &'a mut C,
        ) -> BoxFuture<'a, Result<(), TestError>>
        + Send
        + Sync,
>;

/// Per-state verification callback.
pub type StateTestFn<C> =
    Arc<dyn for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<(), TestError>> + Send + Sync>;

pub type FilterFn<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Replaces the built-in generation algorithm wholesale while reusing the
/// same plan shapes.
pub type PlanGeneratorFn<B> = Arc<
    dyn Fn(
            &dyn Behavior<State = StateOf<B>, Event = EventOf<B>>,
            &TraversalOptions<StateOf<B>, EventOf<B>>,
        ) -> Result<Vec<Plan<StateOf<B>, EventOf<B>>>, TraversalError>
        + Send
        + Sync,
>;

/// Wrap a closure as an [`ExecFn`]; pins down the higher-ranked signature
/// so closure inference works at call sites.
pub fn exec_fn<B, C, F>(f: F) -> ExecFn<B, C>
where
    B: Behavior,
    F: for<'a> Fn(
            &'a Step<StateOf<B>, EventOf<B>>,
            &'a mut C,
        ) -> BoxFuture<'a, Result<(), TestError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`StateTestFn`].
pub fn state_test_fn<C, F>(f: F) -> StateTestFn<C>
where
    F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<(), TestError>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-event-type configuration: an exec binding for execution and/or a
/// case source for generation. The `"*"` tag is the generic exec fallback.
pub struct EventConfig<B: Behavior, C> {
    pub exec: Option<ExecFn<B, C>>,
    pub cases: Option<CaseSource<B>>,
}

impl<B: Behavior, C> EventConfig<B, C> {
    pub fn new() -> Self {
        Self {
            exec: None,
            cases: None,
        }
    }

    pub fn with_exec(mut self, exec: ExecFn<B, C>) -> Self {
        self.exec = Some(exec);
        self
    }

    pub fn with_cases(mut self, cases: CaseSource<B>) -> Self {
        self.cases = Some(cases);
        self
    }
}

impl<B: Behavior, C> Default for EventConfig<B, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing adapter so the event-config table can serve as a
/// [`CaseLookup`]; the orphan rule forbids implementing the trait for
/// `HashMap` directly.
pub(crate) struct EventCases<'a, B: Behavior, C>(pub &'a HashMap<String, EventConfig<B, C>>);

impl<B: Behavior, C> CaseLookup<B> for EventCases<'_, B, C> {
    fn case_for(&self, tag: &str) -> Option<&CaseSource<B>> {
        self.0.get(tag).and_then(|config| config.cases.as_ref())
    }
}

/// Diagnostic sinks. The default forwards to `tracing`, so embedders get
/// structured output without configuring anything.
#[derive(Clone)]
pub struct Logger {
    log: Arc<dyn Fn(&str) + Send + Sync>,
    error: Arc<dyn Fn(&str) + Send + Sync>,
}

impl Logger {
    pub fn new(
        log: impl Fn(&str) + Send + Sync + 'static,
        error: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            log: Arc::new(log),
            error: Arc::new(error),
        }
    }

    pub fn log(&self, message: &str) {
        (self.log)(message);
    }

    pub fn error(&self, message: &str) {
        (self.error)(message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            log: Arc::new(|message| tracing::debug!("{message}")),
            error: Arc::new(|message| tracing::error!("{message}")),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}

/// Model-level defaults for generation and execution.
pub struct TestModelOptions<B: Behavior, C> {
    /// Event tag -> exec binding and/or case source. `"*"` is the exec
    /// fallback for tags without their own binding.
    pub events: HashMap<String, EventConfig<B, C>>,
    /// Serialized-state key (or `"*"` wildcard) -> verification callback.
    pub states: HashMap<String, StateTestFn<C>>,
    /// Global hook invoked once per executed step.
    pub test_transition: Option<ExecFn<B, C>>,
    pub serializer: Arc<dyn StateSerializer<StateOf<B>, EventOf<B>>>,
    pub filter: Option<FilterFn<StateOf<B>>>,
    pub traversal_limit: usize,
    pub logger: Logger,
    pub plan_generator: Option<PlanGeneratorFn<B>>,
}

impl<B, C> TestModelOptions<B, C>
where
    B: Behavior,
{
    pub fn with_serializer(
        serializer: Arc<dyn StateSerializer<StateOf<B>, EventOf<B>>>,
    ) -> Self {
        Self {
            events: HashMap::new(),
            states: HashMap::new(),
            test_transition: None,
            serializer,
            filter: None,
            traversal_limit: DEFAULT_TRAVERSAL_LIMIT,
            logger: Logger::default(),
            plan_generator: None,
        }
    }
}

impl<B, C> Default for TestModelOptions<B, C>
where
    B: Behavior,
    StateOf<B>: Serialize + 'static,
    EventOf<B>: EventTagged + 'static,
{
    fn default() -> Self {
        Self::with_serializer(Arc::new(CanonicalSerializer::new()))
    }
}

/// Per-call overrides; populated fields win over the model defaults.
pub struct RunOptions<B: Behavior, C> {
    pub events: Option<HashMap<String, EventConfig<B, C>>>,
    pub states: Option<HashMap<String, StateTestFn<C>>>,
    pub test_transition: Option<ExecFn<B, C>>,
    pub serializer: Option<Arc<dyn StateSerializer<StateOf<B>, EventOf<B>>>>,
    pub filter: Option<FilterFn<StateOf<B>>>,
    pub traversal_limit: Option<usize>,
    pub logger: Option<Logger>,
    pub plan_generator: Option<PlanGeneratorFn<B>>,
}

impl<B: Behavior, C> Default for RunOptions<B, C> {
    fn default() -> Self {
        Self {
            events: None,
            states: None,
            test_transition: None,
            serializer: None,
            filter: None,
            traversal_limit: None,
            logger: None,
            plan_generator: None,
        }
    }
}

/// The merged view of one call's options; borrows from the run overrides
/// where present, the model defaults otherwise.
pub(crate) struct Effective<'a, B: Behavior, C> {
    pub events: &'a HashMap<String, EventConfig<B, C>>,
    pub states: &'a HashMap<String, StateTestFn<C>>,
    pub test_transition: Option<&'a ExecFn<B, C>>,
    pub serializer: &'a Arc<dyn StateSerializer<StateOf<B>, EventOf<B>>>,
    pub filter: Option<&'a FilterFn<StateOf<B>>>,
    pub traversal_limit: usize,
    pub logger: &'a Logger,
    pub plan_generator: Option<&'a PlanGeneratorFn<B>>,
}

impl<B: Behavior, C> RunOptions<B, C> {
    pub(crate) fn merged<'a>(
        &'a self,
        model: &'a TestModelOptions<B, C>,
    ) -> Effective<'a, B, C> {
        Effective {
            events: self.events.as_ref().unwrap_or(&model.events),
            states: self.states.as_ref().unwrap_or(&model.states),
            test_transition: self
                .test_transition
                .as_ref()
                .or(model.test_transition.as_ref()),
            serializer: self.serializer.as_ref().unwrap_or(&model.serializer),
            filter: self.filter.as_ref().or(model.filter.as_ref()),
            traversal_limit: self.traversal_limit.unwrap_or(model.traversal_limit),
            logger: self.logger.as_ref().unwrap_or(&model.logger),
            plan_generator: self
                .plan_generator
                .as_ref()
                .or(model.plan_generator.as_ref()),
        }
    }
}
