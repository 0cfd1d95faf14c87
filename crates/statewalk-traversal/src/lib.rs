pub mod plan;
pub mod shortest;
pub mod simple;

use std::sync::Arc;

use serde::Serialize;
use statewalk_behavior::{BehaviorError, CanonicalSerializer, EventTagged, StateSerializer};

pub use plan::{group_into_plans, replay, Path, Plan, Step};
pub use shortest::{shortest_plans, shortest_plans_to};
pub use simple::{simple_plans, simple_plans_to};

/// Default cap on visited/enqueued nodes before generation aborts.
pub const DEFAULT_TRAVERSAL_LIMIT: usize = 10_000;

/// Options shared by both traversal algorithms.
pub struct TraversalOptions<S, E> {
    /// Identity function for graph nodes; also used for keyed test lookup.
    pub serializer: Arc<dyn StateSerializer<S, E>>,
    /// Prunes a candidate successor state before it is ever enqueued or
    /// recursed into; `false` removes it from traversal.
    pub filter: Option<Arc<dyn Fn(&S) -> bool + Send + Sync>>,
    /// Max visited nodes before the whole generation call aborts.
    pub traversal_limit: usize,
    /// Shortest-plan generation only: keep additional equally-short paths to
    /// an already-planned target instead of discarding them.
    pub keep_equal_shortest: bool,
}

impl<S, E> TraversalOptions<S, E> {
    pub fn with_serializer(serializer: Arc<dyn StateSerializer<S, E>>) -> Self {
        Self {
            serializer,
            filter: None,
            traversal_limit: DEFAULT_TRAVERSAL_LIMIT,
            keep_equal_shortest: false,
        }
    }
}

impl<S, E> Default for TraversalOptions<S, E>
where
    S: Serialize + 'static,
    E: EventTagged + 'static,
{
    fn default() -> Self {
        Self::with_serializer(Arc::new(CanonicalSerializer::new()))
    }
}

impl<S, E> Clone for TraversalOptions<S, E> {
    fn clone(&self) -> Self {
        Self {
            serializer: Arc::clone(&self.serializer),
            filter: self.filter.clone(),
            traversal_limit: self.traversal_limit,
            keep_equal_shortest: self.keep_equal_shortest,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// The visited-node cap ran out. Protects against unbounded or cyclic
    /// state spaces; no partial result is returned.
    #[error("traversal limit of {limit} nodes exceeded")]
    LimitExceeded { limit: usize },

    #[error(transparent)]
    Behavior(#[from] BehaviorError),
}
